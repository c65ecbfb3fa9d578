//! Such-Dienst – Ein abbrechbarer Such-Task pro suchender Sitzung
//!
//! Jede suchende Sitzung bekommt genau einen langlebigen tokio-Task der
//! die Schlange pollt bis ein Partner gefunden, die Suche abgebrochen
//! oder die Verbindung getrennt wurde.
//!
//! ## Abbruch-Semantik
//! Kooperativ ueber einen watch-Kanal: das Abbruch-Flag wird vor jeder
//! Partnersuche und vor jedem Paarungs-Versuch geprueft. Ein Task der
//! bereits erfolgreich gepaart hat laesst sich nachtraeglich nicht mehr
//! abbrechen – die Paarung bleibt bestehen.
//!
//! ## Poll-Intervall
//! Adaptiv anhand von Schlangen-Groesse und Versuchszahl; ein frisches
//! Einreihen weckt wartende Tasks sofort ueber den Schlangen-Wecker.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use zufall_core::SessionId;
use zufall_protocol::ServerEvent;

use crate::kern::MatchKern;

// ---------------------------------------------------------------------------
// Poll-Intervall
// ---------------------------------------------------------------------------

/// Obergrenze des exponentiellen Backoffs bei leerer Gegenseite
const BACKOFF_MAX_SEK: u64 = 10;

/// Berechnet das adaptive Poll-Intervall
///
/// | Lage                                  | Intervall                  |
/// |---------------------------------------|----------------------------|
/// | allein in der Schlange                | 2^(versuche/5) s, max 10 s |
/// | hoechstens zwei Wartende              | 500 ms                     |
/// | weniger als 5 Versuche                | 1 s                        |
/// | weniger als 15 Versuche               | 2 s                        |
/// | sonst                                 | 3 s                        |
pub fn poll_intervall(schlangen_groesse: usize, versuche: u32) -> Duration {
    if schlangen_groesse == 1 {
        let stufe = (versuche / 5).min(6);
        return Duration::from_secs((1u64 << stufe).min(BACKOFF_MAX_SEK));
    }
    if schlangen_groesse <= 2 {
        return Duration::from_millis(500);
    }
    match versuche {
        0..=4 => Duration::from_secs(1),
        5..=14 => Duration::from_secs(2),
        _ => Duration::from_secs(3),
    }
}

// ---------------------------------------------------------------------------
// SuchDienst
// ---------------------------------------------------------------------------

/// Verwaltet die Such-Tasks aller suchenden Sitzungen
///
/// Clone-faehig; alle Klone arbeiten auf derselben Task-Tabelle.
#[derive(Clone)]
pub struct SuchDienst {
    laeufer: Arc<DashMap<SessionId, watch::Sender<bool>>>,
}

impl SuchDienst {
    /// Erstellt einen leeren SuchDienst
    pub fn neu() -> Self {
        Self {
            laeufer: Arc::new(DashMap::new()),
        }
    }

    /// Startet den Such-Task einer Sitzung
    ///
    /// Ein bereits laufender Task derselben Sitzung wird stillschweigend
    /// ersetzt (passend zum idempotenten Wiedereinreihen der Schlange).
    pub fn starten(&self, kern: Arc<MatchKern>, session_id: SessionId) {
        let (abbruch_tx, abbruch_rx) = watch::channel(false);
        if let Some(alter) = self.laeufer.insert(session_id, abbruch_tx) {
            let _ = alter.send(true);
            tracing::debug!(sitzung = %session_id, "Bestehender Such-Task ersetzt");
        }

        tokio::spawn(suchschleife(kern, session_id, abbruch_rx));
        tracing::debug!(sitzung = %session_id, "Such-Task gestartet");
    }

    /// Bricht den Such-Task einer Sitzung ab
    ///
    /// Gibt `true` zurueck wenn ein Task lief. Der Abbruch ist kooperativ:
    /// der Task beendet sich vor seinem naechsten Paarungs-Versuch.
    pub fn stoppen(&self, session_id: &SessionId) -> bool {
        match self.laeufer.remove(session_id) {
            Some((_, abbruch_tx)) => {
                let _ = abbruch_tx.send(true);
                tracing::debug!(sitzung = %session_id, "Such-Task abgebrochen");
                true
            }
            None => false,
        }
    }

    /// Raeumt nach erfolgreicher Paarung beide Task-Griffe auf
    fn beenden_nach_erfolg(&self, selbst: &SessionId, partner: &SessionId) {
        self.laeufer.remove(selbst);
        self.stoppen(partner);
    }

    /// Prueft ob fuer die Sitzung ein Such-Task laeuft
    pub fn laeuft(&self, session_id: &SessionId) -> bool {
        self.laeufer.contains_key(session_id)
    }

    /// Gibt die Anzahl der laufenden Such-Tasks zurueck
    pub fn anzahl(&self) -> usize {
        self.laeufer.len()
    }
}

impl Default for SuchDienst {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Such-Schleife
// ---------------------------------------------------------------------------

/// Poll-Schleife eines einzelnen Such-Tasks
async fn suchschleife(
    kern: Arc<MatchKern>,
    sitzung: SessionId,
    mut abbruch: watch::Receiver<bool>,
) {
    loop {
        // Abbruch vor jeder Partnersuche beobachten
        if *abbruch.borrow() {
            break;
        }

        match kern.schlange.partner_suchen(&sitzung) {
            Some(kandidat) => {
                // Eigener Eintrag vor dem Paarungs-Versuch sichern – bei
                // Erfolg verschwindet er aus der Schlange
                let Some(eigener) = kern.schlange.eintrag_von(&sitzung) else {
                    break;
                };

                // Abbruch vor jedem Paarungs-Versuch beobachten
                if *abbruch.borrow() {
                    break;
                }

                if kern
                    .paarungen
                    .paaren_versuchen(sitzung, kandidat.session_id, &kern.schlange)
                {
                    // Beide Seiten erfahren vom Match bevor irgendein
                    // Relay-Ereignis fliessen kann
                    kern.register.senden(
                        &sitzung,
                        ServerEvent::match_gefunden(
                            kandidat.session_id,
                            kandidat.user_id,
                            eigener.wartezeit_ms(),
                        ),
                    );
                    kern.register.senden(
                        &kandidat.session_id,
                        ServerEvent::match_gefunden(
                            sitzung,
                            eigener.user_id,
                            kandidat.wartezeit_ms(),
                        ),
                    );
                    kern.suche.beenden_nach_erfolg(&sitzung, &kandidat.session_id);
                    break;
                }

                if kern.paarungen.ist_gepaart(&sitzung) {
                    // Ein anderer Task hat diese Sitzung gepaart – leise enden
                    tracing::debug!(sitzung = %sitzung, "Such-Task endet (anderweitig gepaart)");
                    break;
                }

                // Der Kandidat war schneller vergeben – sofort weiter suchen
                tracing::debug!(
                    sitzung = %sitzung,
                    kandidat = %kandidat.session_id,
                    "Paarungs-Rennen verloren, Suche geht weiter"
                );
            }
            None => {
                let Some(eintrag) = kern.schlange.eintrag_von(&sitzung) else {
                    // Nicht mehr eingereiht (Abbruch oder Trennung)
                    break;
                };

                kern.register.senden(
                    &sitzung,
                    ServerEvent::suche_laeuft(
                        kern.schlange.position_von(&sitzung),
                        eintrag.wartezeit_ms(),
                        eintrag.suchversuche,
                    ),
                );

                let intervall = poll_intervall(kern.schlange.anzahl(), eintrag.suchversuche);
                tokio::select! {
                    geaendert = abbruch.changed() => {
                        if geaendert.is_err() || *abbruch.borrow() {
                            break;
                        }
                    }
                    _ = kern.schlange.wecker().notified() => {}
                    _ = tokio::time::sleep(intervall) => {}
                }
            }
        }
    }

    tracing::trace!(sitzung = %sitzung, "Such-Task beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervall_allein_waechst_exponentiell() {
        assert_eq!(poll_intervall(1, 0), Duration::from_secs(1));
        assert_eq!(poll_intervall(1, 4), Duration::from_secs(1));
        assert_eq!(poll_intervall(1, 5), Duration::from_secs(2));
        assert_eq!(poll_intervall(1, 10), Duration::from_secs(4));
        assert_eq!(poll_intervall(1, 15), Duration::from_secs(8));
        // Obergrenze 10 Sekunden
        assert_eq!(poll_intervall(1, 20), Duration::from_secs(10));
        assert_eq!(poll_intervall(1, 100), Duration::from_secs(10));
    }

    #[test]
    fn intervall_zu_zweit_ist_kurz() {
        assert_eq!(poll_intervall(2, 0), Duration::from_millis(500));
        assert_eq!(poll_intervall(2, 50), Duration::from_millis(500));
    }

    #[test]
    fn intervall_nach_versuchen_gestaffelt() {
        assert_eq!(poll_intervall(5, 0), Duration::from_secs(1));
        assert_eq!(poll_intervall(5, 4), Duration::from_secs(1));
        assert_eq!(poll_intervall(5, 5), Duration::from_secs(2));
        assert_eq!(poll_intervall(5, 14), Duration::from_secs(2));
        assert_eq!(poll_intervall(5, 15), Duration::from_secs(3));
    }
}
