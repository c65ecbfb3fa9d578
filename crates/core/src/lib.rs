//! zufall-core – Gemeinsame Typen und Fehlertypen
//!
//! Der kleinste gemeinsame Nenner aller Zufall-Crates:
//! Identifikationstypen, die Stufen-Einteilung und der zentrale
//! Fehler-Enum. Hier liegt bewusst keine Logik.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, ZufallError};
pub use types::{SessionId, Stufe, UserId};
