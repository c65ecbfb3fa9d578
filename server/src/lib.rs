//! zufall-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den Einstiegspunkt fuer
//! Integrationstests bereit. Alle Singletons (Kern, Stores, Zustand)
//! werden hier genau einmal konstruiert und explizit durchgereicht.

pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use config::ServerConfig;

use zufall_matching::MatchKern;
use zufall_signaling::{SignalConfig, SignalServer, SignalZustand};
use zufall_stores::{MemoryBlockStore, MemoryIdentityStore, WortlistenModerator};

/// Intervall der Uebersichts-Zeile im Log
const UEBERSICHT_INTERVALL: Duration = Duration::from_secs(60);

/// Buendelt die geladene Konfiguration mit der Startlogik
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Nimmt die geladene Konfiguration in Besitz
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Faehrt den Kern hoch und blockiert bis zum Stopp
    ///
    /// Konstruiert alle Singletons genau einmal (Vermittlungskern,
    /// Store-Fassaden, Signal-Zustand) und reicht sie explizit weiter,
    /// haengt den Uebersichts-Task daneben und wartet dann auf Ctrl-C
    /// waehrend der Listener Verbindungen annimmt.
    pub async fn starten(self) -> Result<()> {
        let bind_addr: SocketAddr = self.config.tcp_bind_adresse().parse().map_err(|e| {
            anyhow::anyhow!(
                "Ungueltige Bind-Adresse '{}': {e}",
                self.config.tcp_bind_adresse()
            )
        })?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            max_sitzungen = self.config.server.max_sitzungen,
            "Zufall-Kern faehrt hoch"
        );

        // --- 1. Vermittlungskern ---
        let kern = MatchKern::neu();

        // --- 2. Externe Kollaborateure ---
        let identitaet = Arc::new(MemoryIdentityStore::neu());
        let blockliste = Arc::new(MemoryBlockStore::neu());
        let moderator = Arc::new(WortlistenModerator::neu(
            self.config.moderation.begriffe.clone(),
        ));

        let zustand = SignalZustand::neu(
            SignalConfig {
                server_name: self.config.server.name.clone(),
                max_sitzungen: self.config.server.max_sitzungen,
            },
            Arc::clone(&kern),
            identitaet,
            blockliste,
            moderator,
        );

        // --- 3. Uebersichts-Task ---
        let kern_fuer_uebersicht = Arc::clone(&kern);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(UEBERSICHT_INTERVALL).await;
                let uebersicht = kern_fuer_uebersicht.uebersicht();
                tracing::info!(
                    verbunden = uebersicht.verbunden,
                    wartend = uebersicht.schlange.gesamt,
                    suchend = uebersicht.suchende,
                    paarungen = uebersicht.paarungen,
                    "Vermittlungs-Uebersicht"
                );
            }
        });

        // --- 4. TCP-Listener + Shutdown ---
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let signal_server = SignalServer::neu(zustand, bind_addr);

        let server_task = signal_server.starten(shutdown_rx);
        tokio::pin!(server_task);

        tokio::select! {
            ergebnis = &mut server_task => {
                ergebnis?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopp angefordert, Server faehrt herunter");
                let _ = shutdown_tx.send(true);
                server_task.await?;
            }
        }

        Ok(())
    }
}
