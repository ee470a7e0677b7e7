use std::env;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const PAGE_SIZE_CHOICES: [usize; 2] = [5, 10];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: Option<String>,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub tick_millis: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let api_base = env::var("ARENA_API_BASE")
            .ok()
            .map(|val| val.trim().trim_end_matches('/').to_string())
            .filter(|val| !val.is_empty());
        let request_timeout = Duration::from_secs(
            env::var("ARENA_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(10)
                .clamp(1, 120),
        );
        let page_size = env::var("ARENA_PAGE_SIZE")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .filter(|size| PAGE_SIZE_CHOICES.contains(size))
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let tick_millis = env::var("ARENA_TICK_MILLIS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(250)
            .clamp(50, 2000);
        Self {
            api_base,
            request_timeout,
            page_size,
            tick_millis,
        }
    }

    /// Demo mode is explicit (`ARENA_DEMO=1`) or implied by a missing base URL.
    pub fn demo_mode(&self) -> bool {
        let forced = env::var("ARENA_DEMO")
            .map(|val| matches!(val.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);
        forced || self.api_base.is_none()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: None,
            request_timeout: Duration::from_secs(10),
            page_size: DEFAULT_PAGE_SIZE,
            tick_millis: 250,
        }
    }
}
