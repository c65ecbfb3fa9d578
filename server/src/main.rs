//! Zufall Server – Einstiegspunkt
//!
//! Liest die Konfiguration, richtet das Logging ein und uebergibt an
//! [`zufall_server::Server`].

use anyhow::Result;
use zufall_server::{
    config::{LoggingEinstellungen, ServerConfig},
    Server,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ZUFALL_CONFIG zeigt auf die TOML-Datei; ohne die Variable wird
    // ./config.toml probiert (und darf fehlen)
    let config_pfad = std::env::var("ZUFALL_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = ServerConfig::laden(&config_pfad)?;

    logging_einrichten(&config.logging);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Zufall Server wird initialisiert"
    );

    Server::neu(config).starten().await
}

/// Richtet tracing-subscriber ein
///
/// Der Level kommt aus der Konfiguration; `ZUFALL_LOG` ueberstimmt ihn
/// zur Laufzeit mit voller EnvFilter-Syntax (etwa
/// `ZUFALL_LOG=zufall_matching=trace`). Das Format ist nicht per
/// Umgebung umschaltbar – Betriebsumgebungen die JSON wollen, setzen es
/// in der Konfigurationsdatei.
fn logging_einrichten(logging: &LoggingEinstellungen) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("ZUFALL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
