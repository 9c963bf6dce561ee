use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id: String,
    pub sheets_access_token: String,
    pub listings_sheet: String,
    pub alerts_sheet: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub konecte_api_url: String,
    pub listings_api_path: String,
    pub whatsapp_gateway_url: String,
    pub whatsapp_gateway_token: Option<String>,
    pub gazetteer_path: Option<PathBuf>,
    pub idle_minutes: i64,
    pub http_timeout: Duration,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            spreadsheet_id: env::var("SPREADSHEET_ID").context("SPREADSHEET_ID must be set")?,
            sheets_access_token: env::var("GOOGLE_SHEETS_ACCESS_TOKEN")
                .context("GOOGLE_SHEETS_ACCESS_TOKEN must be set")?,
            listings_sheet: var_or("LISTINGS_SHEET", "konecte"),
            alerts_sheet: var_or("ALERTS_SHEET", "AlertasBusquedas"),
            gemini_api_key: optional("GEMINI_API_KEY"),
            gemini_model: var_or("GEMINI_MODEL", "gemini-2.0-flash"),
            konecte_api_url: var_or("KONECTE_API_URL", "https://konecte.vercel.app"),
            listings_api_path: var_or("LISTINGS_API_PATH", "/api/properties"),
            whatsapp_gateway_url: env::var("WHATSAPP_GATEWAY_URL")
                .context("WHATSAPP_GATEWAY_URL must be set")?,
            whatsapp_gateway_token: optional("WHATSAPP_GATEWAY_TOKEN"),
            gazetteer_path: optional("GAZETTEER_PATH").map(PathBuf::from),
            idle_minutes: var_or("CONVERSATION_IDLE_MINUTES", "30")
                .parse()
                .context("CONVERSATION_IDLE_MINUTES must be a whole number")?,
            http_timeout: Duration::from_secs(
                var_or("HTTP_TIMEOUT_SECS", "30")
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a whole number")?,
            ),
        })
    }
}
