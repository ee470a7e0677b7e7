use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dto::UserRole;

const SESSION_DIR: &str = "arena_terminal";
const SESSION_FILE: &str = "session.json";

const ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";
const PLAYER_ID_CLAIM: &str = "PlayerId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClaims {
    pub role: UserRole,
    pub player_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserClaims,
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let user = decode_claims(&token)?;
        Ok(Self { token, user })
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == UserRole::Administrator
    }

    pub fn player_id(&self) -> Option<&str> {
        self.user.player_id.as_deref()
    }
}

/// Claims come straight out of the JWT payload; the token is never verified
/// client-side, the service is the authority.
pub fn decode_claims(token: &str) -> Result<UserClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("malformed token"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("token payload is not base64url")?;
    let claims: Value = serde_json::from_slice(&bytes).context("token payload is not json")?;

    let role = match claims.get(ROLE_CLAIM).and_then(Value::as_str) {
        Some("Administrator") => UserRole::Administrator,
        Some("User") => UserRole::User,
        other => return Err(anyhow!("unknown role claim: {other:?}")),
    };
    let player_id = claims
        .get(PLAYER_ID_CLAIM)
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(UserClaims { role, player_id })
}

// ----- persistence (the localStorage analog) -----

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    token: String,
}

pub fn load_session() -> Option<Session> {
    let path = session_path()?;
    let raw = fs::read_to_string(path).ok()?;
    let file = serde_json::from_str::<SessionFile>(&raw).ok()?;
    // A token whose claims no longer decode is as good as no token.
    Session::from_token(file.token).ok()
}

pub fn save_token(token: &str) -> Result<()> {
    let Some(path) = session_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(&SessionFile {
        token: token.to_string(),
    })
    .context("serialize session")?;
    fs::write(&tmp, json).context("write session")?;
    fs::rename(&tmp, &path).context("swap session")?;
    Ok(())
}

pub fn clear_session() {
    if let Some(path) = session_path() {
        let _ = fs::remove_file(path);
    }
}

fn session_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(SESSION_DIR).join(SESSION_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(SESSION_DIR)
            .join(SESSION_FILE),
    )
}
