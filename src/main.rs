use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use classifieds_bot::bot::{Bot, BotDeps, BotSettings};
use classifieds_bot::classifier::Classifier;
use classifieds_bot::clients::{GeminiClient, KonecteClient, WhatsAppGateway};
use classifieds_bot::clock::SystemClock;
use classifieds_bot::config::Config;
use classifieds_bot::location::LocationNormalizer;
use classifieds_bot::models::InboundMessage;
use classifieds_bot::store::GoogleSheetsStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🏠 Classifieds Bot");
    info!("==================");

    let config = Config::from_env()?;

    let classifier = match &config.gemini_api_key {
        Some(key) => {
            let gemini = GeminiClient::new(key.clone(), config.gemini_model.clone(), config.http_timeout)?;
            info!(model = %config.gemini_model, "🧠 Classification enabled");
            Classifier::new(Arc::new(gemini))
        }
        None => {
            warn!("GEMINI_API_KEY not set, messages will not be classified");
            Classifier::disabled()
        }
    };

    let normalizer = match &config.gazetteer_path {
        Some(path) => LocationNormalizer::from_path(path),
        None => LocationNormalizer::builtin(),
    };

    let konecte = Arc::new(KonecteClient::new(
        &config.konecte_api_url,
        config.listings_api_path.clone(),
        config.http_timeout,
    )?);

    let deps = BotDeps {
        transport: Arc::new(WhatsAppGateway::new(
            config.whatsapp_gateway_url.clone(),
            config.whatsapp_gateway_token.clone(),
            config.http_timeout,
        )?),
        classifier: Arc::new(classifier),
        entitlement: konecte.clone(),
        listings_service: konecte,
        store: Arc::new(GoogleSheetsStore::new(config.sheets_access_token.clone(), config.http_timeout)?),
        normalizer: Arc::new(normalizer),
        clock: Arc::new(SystemClock),
    };
    let bot = Bot::new(deps, BotSettings::from_config(&config));

    info!(
        spreadsheet = %config.spreadsheet_id,
        listings = %config.listings_sheet,
        alerts = %config.alerts_sheet,
        "📡 Reading inbound messages from stdin (one JSON object per line)"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut processed = 0usize;

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            line = lines.next_line() => line.context("Failed to read from stdin")?,
        };

        let Some(line) = line else {
            info!("End of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: InboundMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping malformed message line: {}", e);
                continue;
            }
        };

        if let Err(e) = bot.handle_inbound(&message).await {
            error!(sender = %message.sender_id, "Failed to handle message: {:#}", e);
        }
        processed += 1;
    }

    info!("✅ Processed {} messages", processed);
    Ok(())
}
