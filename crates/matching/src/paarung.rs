//! Paarungs-Manager – Die symmetrische Sitzung<->Sitzung Relation
//!
//! Besitzt die Paarungs-Tabelle und ist der Serialisierungspunkt der
//! Vermittlung: `paaren_versuchen` und `trennen` laufen unter demselben
//! Lock, wodurch eine Sitzung nie gleichzeitig in zwei Paarungen stehen
//! kann und genau einer von zwei rennenden Paarungs-Versuchen gewinnt.
//!
//! `paaren_versuchen` entfernt beide Sitzungen noch unter dem Lock aus
//! der Warteschlange (Lock-Reihenfolge stets Paarung -> Schlange; die
//! Schlange nimmt nie das Paarungs-Lock).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use zufall_core::SessionId;

use crate::schlange::WarteSchlange;

// ---------------------------------------------------------------------------
// Paarung
// ---------------------------------------------------------------------------

/// Eine Haelfte der symmetrischen Paarungs-Relation
#[derive(Debug, Clone)]
pub struct Paarung {
    pub partner: SessionId,
    pub raum_tag: String,
    pub erstellt_um: Instant,
}

/// Leitet den Raum-Tag aus dem geordneten Sitzungs-Paar ab
fn raum_tag(a: &SessionId, b: &SessionId) -> String {
    let (klein, gross) = if a <= b { (a, b) } else { (b, a) };
    format!("raum:{}:{}", klein.inner(), gross.inner())
}

// ---------------------------------------------------------------------------
// PaarungsManager
// ---------------------------------------------------------------------------

/// Verwaltet alle aktiven Paarungen
///
/// Ein Mutex schuetzt die Tabelle; Klone teilen ihn. Beide Richtungen
/// einer Paarung werden atomar eingetragen und entfernt.
#[derive(Clone)]
pub struct PaarungsManager {
    innen: Arc<Mutex<HashMap<SessionId, Paarung>>>,
}

impl PaarungsManager {
    /// Erstellt einen leeren PaarungsManager
    pub fn neu() -> Self {
        Self {
            innen: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Versucht zwei Sitzungen zu paaren
    ///
    /// Schlaegt fehl wenn eine der beiden bereits gepaart ist oder beide
    /// identisch sind. Bei Erfolg werden beide Sitzungen noch unter dem
    /// Paarungs-Lock aus der Schlange entfernt.
    pub fn paaren_versuchen(
        &self,
        a: SessionId,
        b: SessionId,
        schlange: &WarteSchlange,
    ) -> bool {
        if a == b {
            return false;
        }

        let mut innen = self.innen.lock();
        if innen.contains_key(&a) || innen.contains_key(&b) {
            tracing::debug!(a = %a, b = %b, "Paarungs-Versuch abgelehnt (bereits gepaart)");
            return false;
        }

        let tag = raum_tag(&a, &b);
        let jetzt = Instant::now();
        innen.insert(
            a,
            Paarung {
                partner: b,
                raum_tag: tag.clone(),
                erstellt_um: jetzt,
            },
        );
        innen.insert(
            b,
            Paarung {
                partner: a,
                raum_tag: tag.clone(),
                erstellt_um: jetzt,
            },
        );

        schlange.entfernen(&a);
        schlange.entfernen(&b);

        tracing::info!(a = %a, b = %b, raum = %tag, "Paarung erstellt");
        true
    }

    /// Gibt den Partner einer Sitzung zurueck
    pub fn partner_von(&self, session_id: &SessionId) -> Option<SessionId> {
        self.innen.lock().get(session_id).map(|p| p.partner)
    }

    /// Prueft ob eine Sitzung gepaart ist
    pub fn ist_gepaart(&self, session_id: &SessionId) -> bool {
        self.innen.lock().contains_key(session_id)
    }

    /// Gibt den Raum-Tag einer Sitzung zurueck
    pub fn raum_tag_von(&self, session_id: &SessionId) -> Option<String> {
        self.innen.lock().get(session_id).map(|p| p.raum_tag.clone())
    }

    /// Loest die Paarung einer Sitzung atomar auf (No-Op wenn ungepaart)
    ///
    /// Gibt den bisherigen Partner zurueck.
    pub fn trennen(&self, session_id: &SessionId) -> Option<SessionId> {
        self.trennen_mit(session_id, |_| {})
    }

    /// Loest die Paarung auf und benachrichtigt vor dem Loeschen
    ///
    /// Der Callback laeuft unter dem Paarungs-Lock waehrend der Eintrag
    /// noch existiert: beide Seiten koennen ihr `match-ended` erhalten
    /// bevor die Relation verschwindet, und ein nebenlaeufiger zweiter
    /// Skip sieht die Paarung bereits nicht mehr.
    pub fn trennen_mit(
        &self,
        session_id: &SessionId,
        benachrichtigen: impl FnOnce(SessionId),
    ) -> Option<SessionId> {
        let mut innen = self.innen.lock();
        let paarung = innen.get(session_id)?.clone();

        benachrichtigen(paarung.partner);

        innen.remove(session_id);
        innen.remove(&paarung.partner);

        tracing::info!(
            sitzung = %session_id,
            partner = %paarung.partner,
            raum = %paarung.raum_tag,
            "Paarung aufgeloest"
        );
        Some(paarung.partner)
    }

    /// Gibt die Anzahl der aktiven Paarungen zurueck
    pub fn anzahl(&self) -> usize {
        self.innen.lock().len() / 2
    }
}

impl Default for PaarungsManager {
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
    use std::collections::HashSet;
    use zufall_core::{Stufe, UserId};
    use zufall_protocol::Praeferenzen;

    fn eingereihte_sitzung(schlange: &WarteSchlange) -> SessionId {
        let sitzung = SessionId::new();
        schlange.einreihen(
            sitzung,
            UserId::new(),
            Stufe::Free,
            Praeferenzen::default(),
            HashSet::new(),
        );
        sitzung
    }

    #[test]
    fn paaren_ist_symmetrisch() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        let b = eingereihte_sitzung(&schlange);

        assert!(manager.paaren_versuchen(a, b, &schlange));

        assert_eq!(manager.partner_von(&a), Some(b));
        assert_eq!(manager.partner_von(&b), Some(a));
        assert_eq!(manager.raum_tag_von(&a), manager.raum_tag_von(&b));
        assert_eq!(manager.anzahl(), 1);
    }

    #[test]
    fn paaren_entfernt_beide_aus_der_schlange() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        let b = eingereihte_sitzung(&schlange);
        assert_eq!(schlange.anzahl(), 2);

        assert!(manager.paaren_versuchen(a, b, &schlange));
        assert_eq!(schlange.anzahl(), 0);
    }

    #[test]
    fn keine_doppel_paarung() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        let b = eingereihte_sitzung(&schlange);
        let c = eingereihte_sitzung(&schlange);

        assert!(manager.paaren_versuchen(a, b, &schlange));
        assert!(!manager.paaren_versuchen(a, c, &schlange));
        assert!(!manager.paaren_versuchen(c, b, &schlange));

        // c ist weiterhin frei und eingereiht
        assert!(!manager.ist_gepaart(&c));
        assert!(schlange.enthaelt(&c));
    }

    #[test]
    fn selbst_paarung_abgelehnt() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        assert!(!manager.paaren_versuchen(a, a, &schlange));
    }

    #[test]
    fn trennen_loescht_beide_haelften() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        let b = eingereihte_sitzung(&schlange);
        manager.paaren_versuchen(a, b, &schlange);

        assert_eq!(manager.trennen(&a), Some(b));
        assert!(!manager.ist_gepaart(&a));
        assert!(!manager.ist_gepaart(&b));
        assert_eq!(manager.anzahl(), 0);

        // Wiederholtes Trennen ist ein No-Op
        assert_eq!(manager.trennen(&a), None);
        assert_eq!(manager.trennen(&b), None);
    }

    #[test]
    fn trennen_mit_benachrichtigt_vor_dem_loeschen() {
        let schlange = WarteSchlange::neu();
        let manager = PaarungsManager::neu();
        let a = eingereihte_sitzung(&schlange);
        let b = eingereihte_sitzung(&schlange);
        manager.paaren_versuchen(a, b, &schlange);

        let mut gesehen = None;
        manager.trennen_mit(&a, |partner| {
            gesehen = Some(partner);
        });
        assert_eq!(gesehen, Some(b));
    }

    #[test]
    fn raum_tag_ist_reihenfolge_unabhaengig() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_eq!(raum_tag(&a, &b), raum_tag(&b, &a));
        assert!(raum_tag(&a, &b).starts_with("raum:"));
    }

    #[test]
    fn rennen_um_dieselbe_sitzung_hat_genau_einen_gewinner() {
        let schlange = Arc::new(WarteSchlange::neu());
        let manager = PaarungsManager::neu();
        let ziel = eingereihte_sitzung(&schlange);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let schlange = Arc::clone(&schlange);
            let anwaerter = eingereihte_sitzung(&schlange);
            handles.push(std::thread::spawn(move || {
                manager.paaren_versuchen(anwaerter, ziel, &schlange)
            }));
        }

        let gewinner = handles
            .into_iter()
            .map(|h| h.join().expect("Thread darf nicht panicken"))
            .filter(|erfolg| *erfolg)
            .count();

        assert_eq!(gewinner, 1, "genau ein Paarungs-Versuch gewinnt");
        assert!(manager.ist_gepaart(&ziel));
        assert_eq!(manager.anzahl(), 1);
        assert!(!schlange.enthaelt(&ziel));
    }
}
