//! Fehlertypen fuer die externen Kollaborateure

use thiserror::Error;

/// Fehlertyp der Store-Fassaden
#[derive(Debug, Error)]
pub enum StoreError {
    /// Dienst nicht erreichbar (Netzwerk, Timeout)
    #[error("Dienst nicht verfuegbar: {0}")]
    NichtVerfuegbar(String),

    /// Token konnte keiner Identitaet zugeordnet werden
    #[error("Ungueltiges Token: {0}")]
    UngueltigesToken(String),

    /// Interner Fehler des Dienstes
    #[error("Interner Dienstfehler: {0}")]
    Intern(String),
}

/// Result-Typ der Store-Fassaden
pub type StoreResult<T> = Result<T, StoreError>;
