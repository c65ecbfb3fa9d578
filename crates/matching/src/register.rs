//! Verbindungs-Register – Verwaltet alle lebenden Sitzungen
//!
//! Jede Verbindung erhaelt beim Aufbau eine frische [`zufall_core::SessionId`]
//! und eine begrenzte Send-Queue. Der Verbindungs-Task liest aus der Queue
//! und schreibt auf den Socket; alle anderen Komponenten stellen Ereignisse
//! ueber [`VerbindungsRegister::senden`] zu.
//!
//! ## Zustell-Garantien
//! - Hoechstens einmal: `try_send`, kein Retry. Volle oder geschlossene
//!   Queue heisst Verlust.
//! - Geordnet pro Sitzung: genau eine Queue pro Sitzung, genau ein Leser.
//!
//! Das Register haelt ausserdem das Sitzungs-Profil (Benutzer, Stufe,
//! Praeferenzen, gecachte Blockliste) fuer das automatische Wiedereinreihen
//! nach einem Skip.

use std::collections::HashSet;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use zufall_core::{SessionId, Stufe, UserId};
use zufall_protocol::{Praeferenzen, ServerEvent};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Sitzung
const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// SitzungsProfil
// ---------------------------------------------------------------------------

/// Vermittlungs-Profil einer Sitzung
///
/// Wird beim ersten `find-match` gefuellt und bei jedem Skip mit neuen
/// Angaben aktualisiert. Die Blockliste ist der beim Einreihen geholte
/// Stand – das Wiedereinreihen ruft den externen Dienst nicht erneut.
#[derive(Debug, Clone)]
pub struct SitzungsProfil {
    pub user_id: Option<UserId>,
    pub stufe: Stufe,
    pub praeferenzen: Praeferenzen,
    pub blockierte: HashSet<UserId>,
}

impl Default for SitzungsProfil {
    fn default() -> Self {
        Self {
            user_id: None,
            stufe: Stufe::Free,
            praeferenzen: Praeferenzen::default(),
            blockierte: HashSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// VerbindungsRegister
// ---------------------------------------------------------------------------

struct Sitzung {
    tx: mpsc::Sender<ServerEvent>,
    profil: SitzungsProfil,
}

/// Register aller lebenden Sitzungen
///
/// Klone sind billig und zeigen auf dasselbe Register (innere Arc).
#[derive(Clone)]
pub struct VerbindungsRegister {
    inner: Arc<DashMap<SessionId, Sitzung>>,
}

impl VerbindungsRegister {
    /// Erstellt ein leeres Register
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Registriert eine neue Sitzung und gibt ihre Empfangs-Queue zurueck
    ///
    /// Der Verbindungs-Task liest aus der Queue und sendet an den Client.
    pub fn registrieren(&self) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let session_id = SessionId::new();
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.insert(
            session_id,
            Sitzung {
                tx,
                profil: SitzungsProfil::default(),
            },
        );
        tracing::debug!(sitzung = %session_id, "Sitzung registriert");
        (session_id, rx)
    }

    /// Entfernt eine Sitzung aus dem Register
    ///
    /// Nur der letzte Schritt des Trennungs-Protokolls – Such-Task,
    /// Paarung und Warteschlange raeumt [`crate::MatchKern::abmelden`]
    /// vorher auf.
    pub fn abmelden(&self, session_id: &SessionId) -> bool {
        let entfernt = self.inner.remove(session_id).is_some();
        if entfernt {
            tracing::debug!(sitzung = %session_id, "Sitzung abgemeldet");
        }
        entfernt
    }

    /// Stellt ein Ereignis an eine Sitzung zu (hoechstens einmal)
    ///
    /// Gibt `false` zurueck wenn die Sitzung unbekannt ist oder die Queue
    /// voll/geschlossen ist. Es wird nie erneut versucht.
    pub fn senden(&self, session_id: &SessionId, ereignis: ServerEvent) -> bool {
        let Some(sitzung) = self.inner.get(session_id) else {
            tracing::debug!(sitzung = %session_id, "Zustellung an unbekannte Sitzung");
            return false;
        };

        match sitzung.tx.try_send(ereignis) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(sitzung = %session_id, "Send-Queue der Sitzung voll, Ereignis geht verloren");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(sitzung = %session_id, "Send-Queue bereits geschlossen, Sitzung im Abbau");
                false
            }
        }
    }

    /// Prueft ob eine Sitzung verbunden ist
    pub fn ist_verbunden(&self, session_id: &SessionId) -> bool {
        self.inner.contains_key(session_id)
    }

    /// Gibt die Anzahl der verbundenen Sitzungen zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }

    /// Schreibt das Vermittlungs-Profil einer Sitzung
    pub fn profil_setzen(
        &self,
        session_id: &SessionId,
        user_id: UserId,
        stufe: Stufe,
        praeferenzen: Praeferenzen,
        blockierte: HashSet<UserId>,
    ) -> bool {
        match self.inner.get_mut(session_id) {
            Some(mut sitzung) => {
                sitzung.profil = SitzungsProfil {
                    user_id: Some(user_id),
                    stufe,
                    praeferenzen,
                    blockierte,
                };
                true
            }
            None => false,
        }
    }

    /// Gibt eine Kopie des Profils zurueck
    pub fn profil_von(&self, session_id: &SessionId) -> Option<SitzungsProfil> {
        self.inner.get(session_id).map(|s| s.profil.clone())
    }
}

impl Default for VerbindungsRegister {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registrieren_und_senden() {
        let register = VerbindungsRegister::neu();
        let (sitzung, mut rx) = register.registrieren();

        assert!(register.ist_verbunden(&sitzung));
        assert!(register.senden(&sitzung, ServerEvent::MatchCancelled));

        let ereignis = rx.try_recv().expect("Ereignis muss vorhanden sein");
        assert!(matches!(ereignis, ServerEvent::MatchCancelled));
    }

    #[tokio::test]
    async fn zustellung_bleibt_geordnet() {
        let register = VerbindungsRegister::neu();
        let (sitzung, mut rx) = register.registrieren();

        for i in 0..5 {
            register.senden(&sitzung, ServerEvent::suche_laeuft(None, i, i as u32));
        }

        for i in 0..5 {
            match rx.try_recv().expect("Ereignis erwartet") {
                ServerEvent::Searching(f) => assert_eq!(f.wait_time, i),
                andere => panic!("Falsches Ereignis: {:?}", andere),
            }
        }
    }

    #[tokio::test]
    async fn senden_an_unbekannte_sitzung_schlaegt_fehl() {
        let register = VerbindungsRegister::neu();
        assert!(!register.senden(&SessionId::new(), ServerEvent::MatchCancelled));
    }

    #[tokio::test]
    async fn senden_nach_abmeldung_schlaegt_fehl() {
        let register = VerbindungsRegister::neu();
        let (sitzung, _rx) = register.registrieren();

        assert!(register.abmelden(&sitzung));
        assert!(!register.ist_verbunden(&sitzung));
        assert!(!register.senden(&sitzung, ServerEvent::MatchCancelled));
    }

    #[tokio::test]
    async fn volle_queue_verwirft() {
        let register = VerbindungsRegister::neu();
        let (sitzung, _rx) = register.registrieren();

        // Queue fuellen ohne zu lesen
        for _ in 0..SEND_QUEUE_GROESSE {
            assert!(register.senden(&sitzung, ServerEvent::UserTyping));
        }
        assert!(!register.senden(&sitzung, ServerEvent::UserTyping));
    }

    #[tokio::test]
    async fn profil_schreiben_und_lesen() {
        let register = VerbindungsRegister::neu();
        let (sitzung, _rx) = register.registrieren();
        let user = UserId::new();

        assert!(register.profil_setzen(
            &sitzung,
            user,
            Stufe::Premium,
            Praeferenzen::default(),
            HashSet::new(),
        ));

        let profil = register.profil_von(&sitzung).expect("Profil erwartet");
        assert_eq!(profil.user_id, Some(user));
        assert_eq!(profil.stufe, Stufe::Premium);
    }

    #[tokio::test]
    async fn session_ids_sind_eindeutig() {
        let register = VerbindungsRegister::neu();
        let (a, _rx_a) = register.registrieren();
        let (b, _rx_b) = register.registrieren();
        assert_ne!(a, b);
        assert_eq!(register.anzahl(), 2);
    }
}
