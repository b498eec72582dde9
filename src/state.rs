use sqlx::SqlitePool;
use std::env;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sms: SmsConfig,
    pub cron_secret: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub api_key: String,
    pub api_secret: String,
    pub from_number: String,
    pub api_base: String,
}

impl SmsConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("SOLAPI_API_KEY").unwrap_or_default(),
            api_secret: env::var("SOLAPI_API_SECRET").unwrap_or_default(),
            from_number: env::var("SOLAPI_FROM_NUMBER").unwrap_or_default(),
            api_base: env::var("SOLAPI_API_BASE")
                .unwrap_or_else(|_| "https://api.solapi.com".to_string()),
        }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            from_number: String::new(),
            api_base: String::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        !(self.api_key.trim().is_empty() || self.api_secret.trim().is_empty())
    }
}
