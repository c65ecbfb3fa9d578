//! Gemeinsamer Zustand der Signaling-Schicht
//!
//! Haelt den Vermittlungskern und die externen Kollaborateure als
//! Arc-Referenzen, die sicher zwischen Tasks geteilt werden koennen.
//! Alles wird einmal beim Start konstruiert und explizit durchgereicht.

use std::sync::Arc;
use std::time::Instant;

use zufall_matching::MatchKern;
use zufall_stores::{BlockStore, IdentityStore, Moderator};

/// Konfiguration der Signaling-Schicht
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Name unter dem sich der Server meldet
    pub server_name: String,
    /// Obergrenze gleichzeitiger Sitzungen
    pub max_sitzungen: u32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            server_name: "Zufall Server".to_string(),
            max_sitzungen: 4096,
        }
    }
}

/// Gemeinsamer Zustand (thread-safe, Arc-geteilt)
pub struct SignalZustand<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    /// Konfiguration
    pub config: Arc<SignalConfig>,
    /// Vermittlungskern (Register, Schlange, Paarungen, Such-Dienst)
    pub kern: Arc<MatchKern>,
    /// Identitaets-Aufloesung
    pub identitaet: Arc<I>,
    /// Blocklisten-Abruf (best effort)
    pub blockliste: Arc<B>,
    /// Chat-Moderation
    pub moderator: Arc<M>,
    /// Startzeitpunkt (fuer Uptime-Logging)
    pub start_zeit: Instant,
}

impl<I, B, M> SignalZustand<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    /// Erstellt einen neuen SignalZustand
    pub fn neu(
        config: SignalConfig,
        kern: Arc<MatchKern>,
        identitaet: Arc<I>,
        blockliste: Arc<B>,
        moderator: Arc<M>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            kern,
            identitaet,
            blockliste,
            moderator,
            start_zeit: Instant::now(),
        })
    }

    /// Sekunden seit dem Start
    pub fn uptime_sek(&self) -> u64 {
        self.start_zeit.elapsed().as_secs()
    }
}
