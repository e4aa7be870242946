pub const LOG_ENV: &str = "GRADECALCD_LOG";
pub const LOG_JSON_ENV: &str = "GRADECALCD_LOG_JSON";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_filter: String,
    pub log_json: bool,
    /// Problems found while reading the environment. Reported once logging is up.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Config::default();

        if let Some(filter) = lookup(LOG_ENV) {
            let t = filter.trim();
            if !t.is_empty() {
                cfg.log_filter = t.to_string();
            }
        }

        if let Some(raw) = lookup(LOG_JSON_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => cfg.log_json = true,
                "" | "0" | "false" | "no" | "off" => cfg.log_json = false,
                other => cfg
                    .warnings
                    .push(format!("ignoring {LOG_JSON_ENV}={other:?}; expected true or false")),
            }
        }

        cfg
    }
}
