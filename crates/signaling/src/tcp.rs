//! TCP-Annahme – nimmt Verbindungen an und startet Sitzungs-Tasks
//!
//! Der `SignalServer` haelt den lauschenden Socket. Pro angenommener
//! Verbindung entsteht genau eine [`ClientVerbindung`] in einem eigenen
//! Task; alles Weitere (Registrierung, Dispatch, Aufraeumen) passiert
//! dort.
//!
//! ## Warum eine LocalSet
//! Die Store-Traits deklarieren `async fn` ohne Send-Garantie. Ihre
//! Futures duerfen deshalb den Thread nicht wechseln – die Sitzungs-Tasks
//! laufen gesammelt in einer `tokio::task::LocalSet`. Der Vermittlungskern
//! ist davon nicht betroffen: seine Such-Tasks beruehren keine Stores und
//! laufen als gewoehnliche tokio-Tasks auf dem Pool.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::LocalSet;
use zufall_stores::{BlockStore, IdentityStore, Moderator};

use crate::verbindung::ClientVerbindung;
use crate::zustand::SignalZustand;

/// Atempause nach einem fehlgeschlagenen accept
///
/// accept schlaegt praktisch nur in Serie fehl (etwa bei ausgeschoepften
/// File-Deskriptoren). Eine Viertelsekunde verhindert, dass die Schleife
/// dann heiss dreht, und ist kurz genug um nach Erholung sofort wieder
/// anzunehmen.
const ANNAHME_PAUSE: Duration = Duration::from_millis(250);

/// TCP-Server der Signaling-Schicht
pub struct SignalServer<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    zustand: Arc<SignalZustand<I, B, M>>,
    bind_addr: SocketAddr,
}

impl<I, B, M> SignalServer<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    /// Erstellt einen neuen SignalServer
    pub fn neu(zustand: Arc<SignalZustand<I, B, M>>, bind_addr: SocketAddr) -> Self {
        Self { zustand, bind_addr }
    }

    /// Bindet den Socket und nimmt Verbindungen an bis zum Shutdown
    ///
    /// Spannt die LocalSet auf in der alle Sitzungs-Tasks leben.
    pub async fn starten(
        self,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> io::Result<()> {
        let sitzungs_tasks = LocalSet::new();
        sitzungs_tasks
            .run_until(self.annahme_schleife(shutdown_rx))
            .await
    }

    async fn annahme_schleife(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        tracing::info!(
            adresse = %listener.local_addr()?,
            max_sitzungen = self.zustand.config.max_sitzungen,
            "Signal-Server lauscht"
        );

        while !*shutdown_rx.borrow() {
            let annahme = tokio::select! {
                annahme = listener.accept() => annahme,
                aenderung = shutdown_rx.changed() => {
                    // Verschwundener Sender zaehlt wie ein Stopp-Signal
                    if aenderung.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let (stream, gegenstelle) = match annahme {
                Ok(paar) => paar,
                Err(fehler) => {
                    tracing::error!(fehler = %fehler, "accept fehlgeschlagen");
                    tokio::time::sleep(ANNAHME_PAUSE).await;
                    continue;
                }
            };

            // Limit gegen den Register-Stand pruefen; der Socket faellt
            // beim continue aus dem Scope und schliesst damit sofort
            let belegt = self.zustand.kern.register.anzahl() as u32;
            if belegt >= self.zustand.config.max_sitzungen {
                tracing::warn!(
                    gegenstelle = %gegenstelle,
                    belegt,
                    "Sitzungs-Limit erreicht, Verbindung abgewiesen"
                );
                continue;
            }

            let verbindung = ClientVerbindung::neu(Arc::clone(&self.zustand), gegenstelle);
            tokio::task::spawn_local(verbindung.verarbeiten(stream, shutdown_rx.clone()));
        }

        tracing::info!("Signal-Server nimmt keine Verbindungen mehr an");
        Ok(())
    }

    /// Gibt die konfigurierte Bind-Adresse zurueck
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
