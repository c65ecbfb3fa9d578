//! zufall-protocol – Client-Ereignisprotokoll und Wire-Format
//!
//! Definiert alle Ereignisse die ueber den bidirektionalen Ereignisstrom
//! zwischen Client und Kern ausgetauscht werden, sowie den Frame-Codec
//! fuer die TCP-Verbindung.
//!
//! ## Design
//! - Tagged Enums (`type`-Feld, kebab-case) fuer typsichere Ereignisse
//! - Payload-Felder in camelCase (Client-Konvention)
//! - JSON-Serialisierung via serde; Signaling-Blobs bleiben opak
//! - Kein Request/Response-Umschlag: der Strom ist geordnet, Ereignisse
//!   stehen fuer sich

pub mod events;
pub mod wire;

// Bequeme Re-Exporte
pub use events::{
    BeendigungsGrund, ClientEvent, Geschlecht, Praeferenzen, ServerEvent, REGION_BELIEBIG,
};
pub use wire::{ClientCodec, FrameCodec, ServerCodec};
