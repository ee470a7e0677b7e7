use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dto::RankingItem;

pub struct ExportReport {
    pub rows: usize,
}

/// Writes a competition's ranking to an xlsx workbook: one sheet, a heading
/// row, then competitor/wins/points per row.
pub fn write_ranking(
    path: impl AsRef<Path>,
    competition_name: &str,
    items: &[RankingItem],
) -> Result<ExportReport> {
    let mut rows = vec![vec![
        "Competitor".to_string(),
        "Wins".to_string(),
        "Points".to_string(),
    ]];
    for item in items {
        rows.push(vec![
            item.competitor.name.clone(),
            item.wins.to_string(),
            item.points.to_string(),
        ]);
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(competition_name))?;
    write_rows(sheet, &rows)?;
    workbook
        .save(path.as_ref())
        .with_context(|| format!("save workbook {}", path.as_ref().display()))?;

    Ok(ExportReport {
        rows: rows.len().saturating_sub(1),
    })
}

/// Sheet names are capped at 31 chars and cannot hold a handful of
/// punctuation characters.
fn sheet_name(competition_name: &str) -> String {
    let cleaned: String = competition_name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => ' ',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return "Ranking".to_string();
    }
    trimmed.chars().take(31).collect()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
