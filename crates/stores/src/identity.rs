//! Identitaets-Fassade
//!
//! Loest das vom Client deklarierte Token zu einer stabilen Benutzer-
//! Identitaet auf. Der anonyme Dienst kennt keine Registrierungspflicht:
//! unbekannte Tokens erhalten eine deterministisch abgeleitete UserId,
//! damit Blocklisten und Wiedererkennung ueber Verbindungen hinweg greifen.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;
use zufall_core::{Stufe, UserId};

use crate::error::{StoreError, StoreResult};

/// Aufgeloeste Benutzer-Identitaet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identitaet {
    pub user_id: UserId,
    pub stufe: Stufe,
}

/// Fassade zum externen Identitaetsdienst
#[allow(async_fn_in_trait)]
pub trait IdentityStore {
    /// Loest ein Client-Token zu einer Identitaet auf
    async fn authentifizieren(&self, token: &str) -> StoreResult<Identitaet>;
}

// ---------------------------------------------------------------------------
// MemoryIdentityStore
// ---------------------------------------------------------------------------

/// In-Memory Identitaetsdienst fuer Entwicklung und Tests
///
/// Registrierte Tokens liefern ihre hinterlegte Identitaet; unbekannte
/// Tokens werden deterministisch auf eine UserId abgebildet (UUIDv5 ueber
/// das Token) und erhalten die Standard-Stufe.
#[derive(Clone)]
pub struct MemoryIdentityStore {
    inner: Arc<MemoryIdentityInner>,
}

struct MemoryIdentityInner {
    bekannte: RwLock<HashMap<String, Identitaet>>,
    standard_stufe: Stufe,
}

impl MemoryIdentityStore {
    /// Erstellt einen leeren Identitaetsdienst (Standard-Stufe: free)
    pub fn neu() -> Self {
        Self::mit_standard_stufe(Stufe::Free)
    }

    /// Erstellt einen Identitaetsdienst mit abweichender Standard-Stufe
    pub fn mit_standard_stufe(standard_stufe: Stufe) -> Self {
        Self {
            inner: Arc::new(MemoryIdentityInner {
                bekannte: RwLock::new(HashMap::new()),
                standard_stufe,
            }),
        }
    }

    /// Hinterlegt eine bekannte Identitaet fuer ein Token
    pub async fn registrieren(&self, token: impl Into<String>, identitaet: Identitaet) {
        self.inner
            .bekannte
            .write()
            .await
            .insert(token.into(), identitaet);
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::neu()
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn authentifizieren(&self, token: &str) -> StoreResult<Identitaet> {
        if token.is_empty() {
            return Err(StoreError::UngueltigesToken("leeres Token".into()));
        }

        if let Some(identitaet) = self.inner.bekannte.read().await.get(token) {
            return Ok(*identitaet);
        }

        // Anonyme Identitaet: stabil ableitbar, ueber Verbindungen hinweg gleich
        let user_id = UserId(Uuid::new_v5(&Uuid::NAMESPACE_OID, token.as_bytes()));
        tracing::debug!(user_id = %user_id, "Anonyme Identitaet abgeleitet");
        Ok(Identitaet {
            user_id,
            stufe: self.inner.standard_stufe,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbekanntes_token_ist_stabil() {
        let store = MemoryIdentityStore::neu();
        let a = store.authentifizieren("anon-42").await.unwrap();
        let b = store.authentifizieren("anon-42").await.unwrap();
        assert_eq!(a.user_id, b.user_id);
        assert_eq!(a.stufe, Stufe::Free);

        let c = store.authentifizieren("anon-43").await.unwrap();
        assert_ne!(a.user_id, c.user_id);
    }

    #[tokio::test]
    async fn registriertes_token_gewinnt() {
        let store = MemoryIdentityStore::neu();
        let identitaet = Identitaet {
            user_id: UserId::new(),
            stufe: Stufe::Pro,
        };
        store.registrieren("vip", identitaet).await;

        let aufgeloest = store.authentifizieren("vip").await.unwrap();
        assert_eq!(aufgeloest, identitaet);
    }

    #[tokio::test]
    async fn leeres_token_wird_abgelehnt() {
        let store = MemoryIdentityStore::neu();
        assert!(store.authentifizieren("").await.is_err());
    }
}
