use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_SESSION_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub sqlite_path: String,
    pub db_pool_size: u32,
    pub db_connect_timeout: Duration,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub static_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .context("SERVER_PORT must be a valid port number")?;
        let db_pool_size: u32 = env::var("DB_POOL_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DB_POOL_SIZE must be a positive integer")?;
        let connect_timeout_secs: u64 = env::var("DB_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("DB_CONNECT_TIMEOUT_SECS must be a number of seconds")?;
        anyhow::ensure!(db_pool_size > 0, "DB_POOL_SIZE must be at least 1");
        anyhow::ensure!(connect_timeout_secs > 0, "DB_CONNECT_TIMEOUT_SECS must be at least 1");

        let session_secret =
            env::var("SESSION_SECRET").unwrap_or_else(|_| DEFAULT_SESSION_SECRET.to_string());

        let secure_cookies = match env::var("SECURE_COOKIES") {
            Ok(raw) => parse_flag(&raw)
                .with_context(|| format!("SECURE_COOKIES must be a boolean, got {raw:?}"))?,
            Err(_) => false,
        };

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port,
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./data/invoicing.db".to_string()),
            db_pool_size,
            db_connect_timeout: Duration::from_secs(connect_timeout_secs),
            session_secret,
            secure_cookies,
            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "./static".to_string())
                .into(),
            log_format,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.session_secret == DEFAULT_SESSION_SECRET
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
