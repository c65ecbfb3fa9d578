//! Client-Verbindung – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientVerbindung` in einem eigenen Task.
//! Beim Aufbau wird die Sitzung im Verbindungs-Register angelegt; der
//! Task liest Frames vom Socket, dispatcht sie und schreibt gleichzeitig
//! die Send-Queue der Sitzung auf den Socket.
//!
//! ## Fehlerverhalten
//! - Ungueltige Frames (kaputtes JSON, unbekannter Ereignistyp) werden
//!   geloggt und verworfen – die Verbindung lebt weiter
//! - Transportfehler und Stream-Ende beenden den Task; das Trennungs-
//!   Protokoll des Kerns raeumt Suche, Paarung und Schlange auf bevor
//!   die Sitzung aus dem Register verschwindet

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use zufall_protocol::wire::ServerCodec;
use zufall_stores::{BlockStore, IdentityStore, Moderator};

use crate::dispatcher::EreignisDispatcher;
use crate::zustand::SignalZustand;

/// Eine einzelne Client-Verbindung und ihre Sitzung
pub struct ClientVerbindung<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    zustand: Arc<SignalZustand<I, B, M>>,
    peer_addr: SocketAddr,
}

impl<I, B, M> ClientVerbindung<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    /// Erstellt eine neue ClientVerbindung
    pub fn neu(zustand: Arc<SignalZustand<I, B, M>>, peer_addr: SocketAddr) -> Self {
        Self { zustand, peer_addr }
    }

    /// Treibt die Sitzung bis zum Verbindungsende
    ///
    /// Kehrt erst zurueck wenn Gegenstelle oder Server die Verbindung
    /// beendet haben und das Trennungs-Protokoll gelaufen ist.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let (sitzung, mut ausgang) = self.zustand.kern.register.registrieren();
        let mut framed = Framed::new(stream, ServerCodec::new());
        let dispatcher = EreignisDispatcher::neu(Arc::clone(&self.zustand));

        tracing::info!(peer = %peer_addr, sitzung = %sitzung, "Sitzung eroeffnet");

        loop {
            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(ereignis)) => {
                            dispatcher.dispatch(sitzung, ereignis).await;
                        }
                        Some(Err(fehler)) if fehler.kind() == io::ErrorKind::InvalidData => {
                            // Kaputtes Ereignis verwerfen, Verbindung lebt weiter
                            tracing::warn!(
                                peer = %peer_addr,
                                sitzung = %sitzung,
                                fehler = %fehler,
                                "Ungueltiges Ereignis verworfen"
                            );
                        }
                        Some(Err(fehler)) => {
                            tracing::warn!(
                                peer = %peer_addr,
                                sitzung = %sitzung,
                                fehler = %fehler,
                                "Lesefehler, Sitzung wird beendet"
                            );
                            break;
                        }
                        None => {
                            tracing::info!(
                                peer = %peer_addr,
                                sitzung = %sitzung,
                                "Gegenstelle hat die Verbindung geschlossen"
                            );
                            break;
                        }
                    }
                }

                // Ausgehendes Ereignis aus der Send-Queue der Sitzung
                Some(ereignis) = ausgang.recv() => {
                    if let Err(fehler) = framed.send(ereignis).await {
                        tracing::warn!(
                            peer = %peer_addr,
                            sitzung = %sitzung,
                            fehler = %fehler,
                            "Ereignis nicht schreibbar, Sitzung wird beendet"
                        );
                        break;
                    }
                }

                // Shutdown-Signal des Servers
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(
                            peer = %peer_addr,
                            sitzung = %sitzung,
                            "Server faehrt herunter, Sitzung wird geschlossen"
                        );
                        break;
                    }
                }
            }
        }

        // Trennungs-Protokoll: Suche, Paarung und Schlange aufraeumen,
        // danach die Sitzung aus dem Register entfernen
        self.zustand.kern.abmelden(sitzung);

        tracing::debug!(peer = %peer_addr, sitzung = %sitzung, "Verbindungs-Schleife zu Ende");
    }
}
