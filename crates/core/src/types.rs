//! Gemeinsame Identifikationstypen fuer Zufall
//!
//! Sitzung und Benutzer sind getrennte Begriffe mit getrennten
//! Newtypes, damit der Compiler Verwechslungen ausschliesst: eine
//! SessionId lebt genau eine Verbindung lang, eine UserId ueberdauert
//! sie. Blocklisten arbeiten ausschliesslich ueber UserIds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Sitzungs-ID – gueltig fuer die Lebensdauer einer Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erzeugt eine frische zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Entpackt die rohe UUID
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitzung:{}", self.0)
    }
}

/// Eindeutige Benutzer-ID – stabil ueber Verbindungen hinweg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erzeugt eine frische zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Entpackt die rohe UUID
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Mitglieds-Stufe eines Benutzers
///
/// Beeinflusst die Partnerwahl (gleiche Stufe wird bevorzugt gepaart);
/// Kontingente und Bezahlung liegen ausserhalb des Kerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stufe {
    Free,
    Premium,
    Pro,
}

impl Stufe {
    /// Alle Stufen in fester Reihenfolge (fuer Bucket-Iteration)
    pub const ALLE: [Stufe; 3] = [Stufe::Free, Stufe::Premium, Stufe::Pro];
}

impl Default for Stufe {
    fn default() -> Self {
        Stufe::Free
    }
}

impl std::fmt::Display for Stufe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stufe::Free => "free",
            Stufe::Premium => "premium",
            Stufe::Pro => "pro",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
    }

    #[test]
    fn user_id_display() {
        let id = UserId(Uuid::nil());
        assert!(id.to_string().starts_with("user:"));
    }

    #[test]
    fn stufe_wire_format() {
        assert_eq!(serde_json::to_string(&Stufe::Premium).unwrap(), "\"premium\"");
        let s: Stufe = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(s, Stufe::Pro);
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let sid = SessionId::new();
        let json = serde_json::to_string(&sid).unwrap();
        let sid2: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(sid, sid2);
    }
}
