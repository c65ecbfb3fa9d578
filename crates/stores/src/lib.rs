//! zufall-stores – Fassaden zu den externen Kollaborateuren
//!
//! Der Kern konsumiert drei externe Dienste ueber schmale Traits:
//!
//! - [`IdentityStore`]: loest ein Client-Token zu einer stabilen
//!   Benutzer-Identitaet (UserId + Stufe) auf
//! - [`BlockStore`]: liefert die Menge der von einem Benutzer blockierten
//!   Benutzer (best effort – bei Ausfall wird ohne Filter vermittelt)
//! - [`Moderator`]: entscheidet ueber Chat-Inhalte (Erlaubt/Veto)
//!
//! Die Traits verwenden `async fn` ohne Send-Garantie (async_fn_in_trait);
//! Aufrufer laufen deshalb in einer `tokio::task::LocalSet`.
//! Mitgeliefert sind In-Memory-Implementierungen fuer Entwicklung und Tests.

pub mod blocklist;
pub mod error;
pub mod identity;
pub mod moderation;

// Bequeme Re-Exporte
pub use blocklist::{BlockStore, MemoryBlockStore};
pub use error::{StoreError, StoreResult};
pub use identity::{Identitaet, IdentityStore, MemoryIdentityStore};
pub use moderation::{Moderator, Urteil, WortlistenModerator};
