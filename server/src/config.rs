//! Betriebskonfiguration des Servers
//!
//! TOML-Datei mit vier Abschnitten (server, netzwerk, moderation,
//! logging), jeder Wert mit eingebautem Standard. Vermittlungs-Konstanten
//! (Scoring, Poll-Intervalle, Requeue-Verzoegerung) sind bewusst nicht
//! konfigurierbar – sie gehoeren zur Semantik des Kerns, nicht zum
//! Betrieb.

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Wurzel der TOML-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Abschnitt `[server]`
    pub server: ServerEinstellungen,
    /// Abschnitt `[netzwerk]`
    pub netzwerk: NetzwerkEinstellungen,
    /// Abschnitt `[moderation]`
    pub moderation: ModerationsEinstellungen,
    /// Abschnitt `[logging]`
    pub logging: LoggingEinstellungen,
}

/// Abschnitt `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Name unter dem sich der Server meldet
    pub name: String,
    /// Obergrenze gleichzeitiger Sitzungen
    pub max_sitzungen: u32,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Zufall Server".into(),
            max_sitzungen: 4096,
        }
    }
}

/// Abschnitt `[netzwerk]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den Ereignisstrom
    pub bind_adresse: String,
    /// Port fuer den Ereignisstrom
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 9400,
        }
    }
}

/// Abschnitt `[moderation]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationsEinstellungen {
    /// Begriffe die zum Veto fuehren (case-insensitive Teilstrings)
    pub begriffe: Vec<String>,
}

/// Abschnitt `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Mindest-Level: trace, debug, info, warn oder error
    pub level: String,
    /// Ausgabeformat: text (Konsole) oder json (Log-Aggregation)
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Liest die Konfiguration vom angegebenen Pfad
    ///
    /// Eine fehlende Datei ist kein Fehler: der Server startet dann mit
    /// den eingebauten Standardwerten und meldet das im Log. Eine
    /// vorhandene aber unlesbare oder syntaktisch kaputte Datei bricht
    /// den Start dagegen ab – ein stillschweigend ignorierter Tippfehler
    /// in der Konfiguration ist schlimmer als ein frueher Abbruch.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let inhalt = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => inhalt,
            Err(fehler) if fehler.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(pfad, "Keine Konfigurationsdatei, Start mit Standardwerten");
                return Ok(Self::default());
            }
            Err(fehler) => {
                return Err(fehler)
                    .with_context(|| format!("Konfigurationsdatei '{pfad}' nicht lesbar"));
            }
        };

        toml::from_str(&inhalt)
            .with_context(|| format!("Konfigurationsdatei '{pfad}' enthaelt ungueltiges TOML"))
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }
}
