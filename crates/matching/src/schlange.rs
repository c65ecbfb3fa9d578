//! Warte-Schlange – Wartende Sitzungen und Kandidaten-Auswahl
//!
//! Haelt alle suchenden Sitzungen samt Stufen-Index und waehlt fuer einen
//! Suchenden einen kompatiblen Partner aus.
//!
//! ## Auswahl in drei Phasen
//! 1. Gleiche Stufe (bevorzugt)
//! 2. Andere Stufen – erst wenn Phase 1 leer ist oder der Suchende laenger
//!    als [`CROSS_STUFEN_WARTE_MS`] wartet
//! 3. Gelockerte Filter (Region/Geschlecht ignoriert) – erst wenn beides
//!    leer blieb; die gegenseitige Blockpruefung bleibt immer bestehen
//!
//! Aus den kompatiblen Kandidaten werden die besten fuenf nach Score
//! genommen und gewichtet zufaellig ausgewaehlt: ein einzelner gleich-
//! verteilter Zug ueber die Praefix-Summe der Scores.
//!
//! `partner_suchen` veraendert die Mitgliedschaft nie – die Befoerderung
//! zur Paarung ist ein separater Schritt des PaarungsManagers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::Notify;
use zufall_core::{SessionId, Stufe, UserId};
use zufall_protocol::Praeferenzen;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Wartezeit ab der auch stufenfremde Kandidaten betrachtet werden
pub const CROSS_STUFEN_WARTE_MS: u64 = 10_000;

/// Anzahl der Top-Kandidaten fuer die gewichtete Auswahl
const TOP_K: usize = 5;

/// Score-Anteil fuer gleiche Stufe
const SCORE_STUFE_GLEICH: f64 = 100.0;
/// Score-Anteil fuer fremde Stufe
const SCORE_STUFE_FREMD: f64 = 50.0;
/// Obergrenze des Fairness-Bonus (laengere Wartezeit, hoeherer Score)
const SCORE_WARTE_MAX: f64 = 50.0;
/// Teiler der Wartezeit in Millisekunden fuer den Fairness-Bonus
const SCORE_WARTE_TEILER: f64 = 600.0;
/// Obergrenze des Versuchs-Abschlags
const SCORE_VERSUCHE_MAX: f64 = 20.0;
/// Abschlag pro erfolglosem Suchversuch des Kandidaten
const SCORE_VERSUCHE_FAKTOR: f64 = 2.0;
/// Obergrenze des Zufalls-Jitters
const SCORE_JITTER_MAX: f64 = 10.0;

// ---------------------------------------------------------------------------
// WarteEintrag
// ---------------------------------------------------------------------------

/// Eine wartende Sitzung in der Schlange
#[derive(Debug, Clone)]
pub struct WarteEintrag {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub stufe: Stufe,
    pub praeferenzen: Praeferenzen,
    /// Vom Benutzer blockierte Benutzer (UserIds, nie SessionIds)
    pub blockierte: HashSet<UserId>,
    pub eingereiht_um: Instant,
    pub suchversuche: u32,
}

impl WarteEintrag {
    /// Bisherige Wartezeit in Millisekunden
    pub fn wartezeit_ms(&self) -> u64 {
        self.eingereiht_um.elapsed().as_millis() as u64
    }
}

// ---------------------------------------------------------------------------
// Momentaufnahme
// ---------------------------------------------------------------------------

/// Zaehler-Momentaufnahme der Schlange (fuer Logging und Poll-Intervalle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Momentaufnahme {
    pub gesamt: usize,
    pub free: usize,
    pub premium: usize,
    pub pro: usize,
}

// ---------------------------------------------------------------------------
// WarteSchlange
// ---------------------------------------------------------------------------

struct SchlangenInnen {
    eintraege: HashMap<SessionId, WarteEintrag>,
    /// Stufen-Index; stets die disjunkte Zerlegung von `eintraege`
    buckets: HashMap<Stufe, HashSet<SessionId>>,
}

/// Warteschlange der Vermittlung
///
/// Saemtliche Operationen laufen unter einem Mutex; Klone teilen ihn.
#[derive(Clone)]
pub struct WarteSchlange {
    innen: Arc<Mutex<SchlangenInnen>>,
    /// Weckt beim Einreihen einen wartenden Such-Task
    wecker: Arc<Notify>,
}

impl WarteSchlange {
    /// Erstellt eine leere Schlange
    pub fn neu() -> Self {
        Self {
            innen: Arc::new(Mutex::new(SchlangenInnen {
                eintraege: HashMap::new(),
                buckets: HashMap::new(),
            })),
            wecker: Arc::new(Notify::new()),
        }
    }

    /// Reiht eine Sitzung ein (idempotent)
    ///
    /// Ein bestehender Eintrag derselben Sitzung wird vorher entfernt;
    /// Wartezeit und Suchversuche beginnen dann von vorn.
    /// Vorbedingung des Aufrufers: die Sitzung ist nicht gepaart.
    pub fn einreihen(
        &self,
        session_id: SessionId,
        user_id: UserId,
        stufe: Stufe,
        praeferenzen: Praeferenzen,
        blockierte: HashSet<UserId>,
    ) {
        {
            let mut innen = self.innen.lock();
            Self::entfernen_intern(&mut innen, &session_id);
            innen.buckets.entry(stufe).or_default().insert(session_id);
            innen.eintraege.insert(
                session_id,
                WarteEintrag {
                    session_id,
                    user_id,
                    stufe,
                    praeferenzen,
                    blockierte,
                    eingereiht_um: Instant::now(),
                    suchversuche: 0,
                },
            );
        }

        tracing::debug!(sitzung = %session_id, stufe = %stufe, "Sitzung eingereiht");
        // Mindestens einen wartenden Such-Task sofort wecken
        self.wecker.notify_one();
    }

    /// Entfernt eine Sitzung aus Schlange und Stufen-Index (No-Op wenn absent)
    pub fn entfernen(&self, session_id: &SessionId) -> bool {
        let mut innen = self.innen.lock();
        Self::entfernen_intern(&mut innen, session_id)
    }

    fn entfernen_intern(innen: &mut SchlangenInnen, session_id: &SessionId) -> bool {
        match innen.eintraege.remove(session_id) {
            Some(eintrag) => {
                if let Some(bucket) = innen.buckets.get_mut(&eintrag.stufe) {
                    bucket.remove(session_id);
                    if bucket.is_empty() {
                        innen.buckets.remove(&eintrag.stufe);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Prueft ob eine Sitzung eingereiht ist
    pub fn enthaelt(&self, session_id: &SessionId) -> bool {
        self.innen.lock().eintraege.contains_key(session_id)
    }

    /// Gibt die Anzahl der wartenden Sitzungen zurueck
    pub fn anzahl(&self) -> usize {
        self.innen.lock().eintraege.len()
    }

    /// Gibt eine Kopie des Eintrags zurueck
    pub fn eintrag_von(&self, session_id: &SessionId) -> Option<WarteEintrag> {
        self.innen.lock().eintraege.get(session_id).cloned()
    }

    /// 1-basierte Position nach Einreihungs-Zeitpunkt
    pub fn position_von(&self, session_id: &SessionId) -> Option<usize> {
        let innen = self.innen.lock();
        let eintrag = innen.eintraege.get(session_id)?;
        let aeltere = innen
            .eintraege
            .values()
            .filter(|e| e.eingereiht_um < eintrag.eingereiht_um)
            .count();
        Some(aeltere + 1)
    }

    /// Zaehler-Momentaufnahme
    pub fn momentaufnahme(&self) -> Momentaufnahme {
        let innen = self.innen.lock();
        let zaehle = |stufe: Stufe| {
            innen
                .buckets
                .get(&stufe)
                .map(|b| b.len())
                .unwrap_or_default()
        };
        Momentaufnahme {
            gesamt: innen.eintraege.len(),
            free: zaehle(Stufe::Free),
            premium: zaehle(Stufe::Premium),
            pro: zaehle(Stufe::Pro),
        }
    }

    /// Gibt den Wecker zurueck auf den Such-Tasks warten
    pub fn wecker(&self) -> &Notify {
        &self.wecker
    }

    // -----------------------------------------------------------------------
    // Kandidaten-Suche
    // -----------------------------------------------------------------------

    /// Sucht einen kompatiblen Partner fuer die gegebene Sitzung
    ///
    /// Zaehlt den Suchversuch des Rufers hoch und gibt eine Kopie des
    /// ausgewaehlten Eintrags zurueck. Die Mitgliedschaft der Schlange
    /// bleibt unveraendert.
    pub fn partner_suchen(&self, session_id: &SessionId) -> Option<WarteEintrag> {
        let mut innen = self.innen.lock();

        let rufer = {
            let eintrag = innen.eintraege.get_mut(session_id)?;
            eintrag.suchversuche += 1;
            eintrag.clone()
        };
        let warte_ms = rufer.wartezeit_ms();

        // Phase 1: gleiche Stufe
        let mut kandidaten = Self::kandidaten_aus_bucket(&innen, &rufer, rufer.stufe, false);

        // Phase 2: andere Stufen – bei leerer Phase 1 oder langer Wartezeit
        if kandidaten.is_empty() || warte_ms > CROSS_STUFEN_WARTE_MS {
            for stufe in Stufe::ALLE {
                if stufe == rufer.stufe {
                    continue;
                }
                kandidaten.extend(Self::kandidaten_aus_bucket(&innen, &rufer, stufe, false));
            }
        }

        // Phase 3: gelockerte Filter – nur die Blockpruefung bleibt
        if kandidaten.is_empty() {
            kandidaten = innen
                .eintraege
                .values()
                .filter(|k| Self::kompatibel(&rufer, k, true))
                .map(|k| (k.session_id, k.stufe == rufer.stufe))
                .collect();
        }

        if kandidaten.is_empty() {
            return None;
        }

        // Scoring ausserhalb der Kompatibilitaets-Schleife
        let mut rng = rand::thread_rng();
        let mut bewertet: Vec<(SessionId, f64)> = kandidaten
            .into_iter()
            .filter_map(|(id, stufe_gleich)| {
                let kandidat = innen.eintraege.get(&id)?;
                Some((id, Self::score(kandidat, stufe_gleich, &mut rng)))
            })
            .collect();

        bewertet.sort_by(|a, b| b.1.total_cmp(&a.1));
        bewertet.truncate(TOP_K);

        let gewaehlt = Self::gewichtete_auswahl(&bewertet, &mut rng)?;
        innen.eintraege.get(&gewaehlt).cloned()
    }

    /// Sammelt kompatible Kandidaten eines Stufen-Buckets
    fn kandidaten_aus_bucket(
        innen: &SchlangenInnen,
        rufer: &WarteEintrag,
        stufe: Stufe,
        filter_gelockert: bool,
    ) -> Vec<(SessionId, bool)> {
        let Some(bucket) = innen.buckets.get(&stufe) else {
            return Vec::new();
        };
        let stufe_gleich = stufe == rufer.stufe;
        bucket
            .iter()
            .filter_map(|id| innen.eintraege.get(id))
            .filter(|k| Self::kompatibel(rufer, k, filter_gelockert))
            .map(|k| (k.session_id, stufe_gleich))
            .collect()
    }

    /// Kompatibilitaet aus Sicht des Rufers
    ///
    /// Region und Geschlecht filtern nur einseitig – der Kandidat prueft
    /// reziprok sobald er selbst sucht. Die Blockpruefung ist immer
    /// gegenseitig und laeuft ueber UserIds.
    fn kompatibel(rufer: &WarteEintrag, kandidat: &WarteEintrag, filter_gelockert: bool) -> bool {
        if kandidat.session_id == rufer.session_id {
            return false;
        }
        if rufer.blockierte.contains(&kandidat.user_id)
            || kandidat.blockierte.contains(&rufer.user_id)
        {
            return false;
        }
        if filter_gelockert {
            return true;
        }
        if !rufer.praeferenzen.region_beliebig()
            && kandidat.praeferenzen.region != rufer.praeferenzen.region
        {
            return false;
        }
        if !rufer.praeferenzen.geschlecht_beliebig()
            && kandidat.praeferenzen.geschlecht != rufer.praeferenzen.geschlecht
        {
            return false;
        }
        true
    }

    /// Score eines Kandidaten
    fn score(kandidat: &WarteEintrag, stufe_gleich: bool, rng: &mut impl Rng) -> f64 {
        let basis = if stufe_gleich {
            SCORE_STUFE_GLEICH
        } else {
            SCORE_STUFE_FREMD
        };
        let fairness =
            (kandidat.wartezeit_ms() as f64 / SCORE_WARTE_TEILER).min(SCORE_WARTE_MAX);
        let abschlag =
            (kandidat.suchversuche as f64 * SCORE_VERSUCHE_FAKTOR).min(SCORE_VERSUCHE_MAX);
        let jitter = rng.gen_range(0.0..SCORE_JITTER_MAX);
        basis + fairness - abschlag + jitter
    }

    /// Gewichtete Zufallsauswahl: ein Zug ueber die Praefix-Summe der Scores
    fn gewichtete_auswahl(bewertet: &[(SessionId, f64)], rng: &mut impl Rng) -> Option<SessionId> {
        let summe: f64 = bewertet.iter().map(|(_, s)| s.max(0.0)).sum();
        if summe <= 0.0 {
            return bewertet.first().map(|(id, _)| *id);
        }

        let mut ziel = rng.gen_range(0.0..summe);
        for (id, score) in bewertet {
            ziel -= score.max(0.0);
            if ziel <= 0.0 {
                return Some(*id);
            }
        }
        bewertet.last().map(|(id, _)| *id)
    }
}

impl Default for WarteSchlange {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
