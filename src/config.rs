use std::env;
use std::time::Duration;

use anyhow::Context;

use crate::detector::DEFAULT_MATCH_THRESHOLD;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub recognizer_url: String,
    pub file_base_url: String,
    pub match_threshold: f64,
    pub io_timeout: Duration,
    pub gateway_jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let recognizer_url =
            env::var("RECOGNIZER_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        let file_base_url = env::var("FILE_BASE_URL").context("FILE_BASE_URL is not set")?;
        let match_threshold = match env::var("MATCH_THRESHOLD") {
            Ok(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite() && *t >= 0.0)
                .with_context(|| format!("MATCH_THRESHOLD '{raw}' is not a non-negative number"))?,
            Err(_) => DEFAULT_MATCH_THRESHOLD,
        };
        let io_timeout = env::var("IO_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        let gateway_jwt_secret =
            env::var("GATEWAY_JWT_SECRET").context("GATEWAY_JWT_SECRET is not set")?;
        Ok(Self {
            database_url,
            host,
            port,
            recognizer_url,
            file_base_url,
            match_threshold,
            io_timeout,
            gateway_jwt_secret,
        })
    }
}
