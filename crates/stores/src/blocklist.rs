//! Blocklisten-Fassade
//!
//! Liefert zu einem Benutzer die Menge der von ihm blockierten Benutzer.
//! Der Abruf passiert genau einmal beim Einreihen in die Warteschlange;
//! bei Ausfall wird ohne Filter vermittelt und eine Warnung geloggt
//! (best effort, niemals blockierend fuer die Vermittlung).
//!
//! Blockpruefungen laufen ausschliesslich ueber UserIds – niemals ueber
//! SessionIds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use zufall_core::UserId;

use crate::error::{StoreError, StoreResult};

/// Fassade zum externen Blocklisten-Dienst
#[allow(async_fn_in_trait)]
pub trait BlockStore {
    /// Gibt die Menge der von `user` blockierten Benutzer zurueck
    async fn blockierte_von(&self, user: &UserId) -> StoreResult<HashSet<UserId>>;
}

// ---------------------------------------------------------------------------
// MemoryBlockStore
// ---------------------------------------------------------------------------

/// In-Memory Blocklisten-Dienst fuer Entwicklung und Tests
#[derive(Clone, Default)]
pub struct MemoryBlockStore {
    inner: Arc<MemoryBlockInner>,
}

#[derive(Default)]
struct MemoryBlockInner {
    blockiert: RwLock<HashMap<UserId, HashSet<UserId>>>,
    /// Simulierter Ausfall fuer Tests des Best-Effort-Pfads
    ausfall: RwLock<bool>,
}

impl MemoryBlockStore {
    /// Erstellt einen leeren Blocklisten-Dienst
    pub fn neu() -> Self {
        Self::default()
    }

    /// Traegt eine Blockierung ein: `von` blockiert `wen`
    pub async fn blockieren(&self, von: UserId, wen: UserId) {
        self.inner
            .blockiert
            .write()
            .await
            .entry(von)
            .or_default()
            .insert(wen);
    }

    /// Schaltet den simulierten Ausfall um (nur fuer Tests sinnvoll)
    pub async fn ausfall_setzen(&self, ausfall: bool) {
        *self.inner.ausfall.write().await = ausfall;
    }
}

impl BlockStore for MemoryBlockStore {
    async fn blockierte_von(&self, user: &UserId) -> StoreResult<HashSet<UserId>> {
        if *self.inner.ausfall.read().await {
            return Err(StoreError::NichtVerfuegbar("Blockliste offline".into()));
        }

        Ok(self
            .inner
            .blockiert
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blockierung_eintragen_und_abfragen() {
        let store = MemoryBlockStore::neu();
        let a = UserId::new();
        let b = UserId::new();

        store.blockieren(a, b).await;

        let blockierte = store.blockierte_von(&a).await.unwrap();
        assert!(blockierte.contains(&b));

        // Blockierung ist nicht automatisch gegenseitig
        let rueckrichtung = store.blockierte_von(&b).await.unwrap();
        assert!(rueckrichtung.is_empty());
    }

    #[tokio::test]
    async fn unbekannter_benutzer_hat_leere_liste() {
        let store = MemoryBlockStore::neu();
        let blockierte = store.blockierte_von(&UserId::new()).await.unwrap();
        assert!(blockierte.is_empty());
    }

    #[tokio::test]
    async fn ausfall_liefert_fehler() {
        let store = MemoryBlockStore::neu();
        store.ausfall_setzen(true).await;
        assert!(store.blockierte_von(&UserId::new()).await.is_err());

        store.ausfall_setzen(false).await;
        assert!(store.blockierte_von(&UserId::new()).await.is_ok());
    }
}
