//! Fehlertypen fuer Zufall
//!
//! Zentraler Fehler-Enum der die Zustandsfehler des Vermittlungskerns
//! abdeckt. Untermodule definieren eigene Fehler und konvertieren via
//! `#[from]` wo noetig.

use thiserror::Error;

/// Globaler Result-Alias fuer Zufall
pub type Result<T> = std::result::Result<T, ZufallError>;

/// Alle moeglichen Fehler im Zufall-System
#[derive(Debug, Error)]
pub enum ZufallError {
    /// Sitzung ist nicht (mehr) im Verbindungs-Register
    #[error("Sitzung nicht verbunden: {0}")]
    NichtVerbunden(String),

    /// Operation verlangt eine ungepaarte Sitzung
    #[error("Sitzung ist bereits gepaart: {0}")]
    BereitsGepaart(String),

    /// Operation verlangt eine gepaarte Sitzung
    #[error("Sitzung ist nicht gepaart: {0}")]
    NichtGepaart(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ZufallError {
    /// Kurzform fuer einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}
