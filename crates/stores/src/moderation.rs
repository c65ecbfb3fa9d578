//! Moderations-Fassade
//!
//! Entscheidet ueber Chat-Inhalte bevor sie weitergeleitet werden.
//! Ein Veto unterdrueckt die Zustellung; nur der Absender erfaehrt davon.

use std::sync::Arc;

use crate::error::StoreResult;

/// Moderations-Entscheidung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Urteil {
    /// Inhalt darf zugestellt werden
    Erlaubt,
    /// Inhalt wird unterdrueckt; `grund` geht nur an den Absender
    Veto { grund: String },
}

impl Urteil {
    /// Prueft ob der Inhalt zugestellt werden darf
    pub fn ist_erlaubt(&self) -> bool {
        matches!(self, Urteil::Erlaubt)
    }
}

/// Fassade zum externen Moderationsdienst
#[allow(async_fn_in_trait)]
pub trait Moderator {
    /// Prueft einen Chat-Text
    async fn pruefen(&self, text: &str) -> StoreResult<Urteil>;
}

// ---------------------------------------------------------------------------
// WortlistenModerator
// ---------------------------------------------------------------------------

/// Einfacher Moderator auf Basis einer Begriffs-Liste
///
/// Vergleicht case-insensitiv auf Teilstrings. Eine leere Liste erlaubt
/// alles.
#[derive(Clone)]
pub struct WortlistenModerator {
    begriffe: Arc<Vec<String>>,
}

impl WortlistenModerator {
    /// Erstellt einen Moderator mit der gegebenen Begriffs-Liste
    pub fn neu(begriffe: Vec<String>) -> Self {
        Self {
            begriffe: Arc::new(
                begriffe
                    .into_iter()
                    .map(|b| b.to_lowercase())
                    .filter(|b| !b.is_empty())
                    .collect(),
            ),
        }
    }

    /// Erstellt einen Moderator der alles erlaubt
    pub fn leer() -> Self {
        Self::neu(Vec::new())
    }
}

impl Moderator for WortlistenModerator {
    async fn pruefen(&self, text: &str) -> StoreResult<Urteil> {
        let klein = text.to_lowercase();
        for begriff in self.begriffe.iter() {
            if klein.contains(begriff) {
                tracing::debug!(begriff = %begriff, "Moderations-Veto");
                return Ok(Urteil::Veto {
                    grund: "Nachricht verstoesst gegen die Regeln".to_string(),
                });
            }
        }
        Ok(Urteil::Erlaubt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn leere_liste_erlaubt_alles() {
        let moderator = WortlistenModerator::leer();
        let urteil = moderator.pruefen("voellig harmlos").await.unwrap();
        assert!(urteil.ist_erlaubt());
    }

    #[tokio::test]
    async fn begriff_fuehrt_zu_veto() {
        let moderator = WortlistenModerator::neu(vec!["verboten".into()]);

        let urteil = moderator.pruefen("das ist VERBOTEN hier").await.unwrap();
        assert!(!urteil.ist_erlaubt());

        let urteil = moderator.pruefen("alles in ordnung").await.unwrap();
        assert!(urteil.ist_erlaubt());
    }

    #[tokio::test]
    async fn leere_begriffe_werden_ignoriert() {
        let moderator = WortlistenModerator::neu(vec!["".into(), "boese".into()]);
        let urteil = moderator.pruefen("ganz normal").await.unwrap();
        assert!(urteil.ist_erlaubt());
    }
}
