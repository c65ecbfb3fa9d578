//! Match-Kern – Verdrahtet Register, Schlange, Paarungen und Such-Dienst
//!
//! Implementiert die komponenten-uebergreifenden Ablaeufe:
//!
//! - Einreihen mit Such-Task-Start
//! - Such-Abbruch
//! - Skip mit automatischem Wiedereinreihen (beide Seiten symmetrisch)
//! - Das Trennungs-Protokoll beim Verbindungsende
//!
//! Der Kern greift nie auf externe Dienste zu – Blocklisten werden beim
//! Einreihen vom Aufrufer mitgegeben und im Sitzungs-Profil gecacht.
//! Dadurch bleiben alle Hintergrund-Tasks `Send` und laufen als normale
//! tokio-Tasks.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use zufall_core::{SessionId, Stufe, UserId, ZufallError};
use zufall_protocol::{BeendigungsGrund, Praeferenzen, ServerEvent};

use crate::paarung::PaarungsManager;
use crate::register::VerbindungsRegister;
use crate::schlange::{Momentaufnahme, WarteSchlange};
use crate::treiber::SuchDienst;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Verzoegerung vor dem Wiedereinreihen nach einem Skip – gibt den Clients
/// Zeit ihre WebRTC-Verbindung abzubauen
pub const REQUEUE_VERZOEGERUNG: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Uebersicht
// ---------------------------------------------------------------------------

/// Zaehler-Uebersicht des gesamten Kerns
#[derive(Debug, Clone, Copy)]
pub struct Uebersicht {
    pub schlange: Momentaufnahme,
    pub paarungen: usize,
    pub verbunden: usize,
    pub suchende: usize,
}

// ---------------------------------------------------------------------------
// MatchKern
// ---------------------------------------------------------------------------

/// Der Vermittlungskern: alle Singletons des Dienstes
///
/// Wird einmal beim Start konstruiert und explizit an die Handler
/// gereicht – kein globaler veraenderlicher Zustand nach der
/// Initialisierung.
pub struct MatchKern {
    pub register: VerbindungsRegister,
    pub schlange: WarteSchlange,
    pub paarungen: PaarungsManager,
    pub suche: SuchDienst,
}

impl MatchKern {
    /// Erstellt einen frischen Kern
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            register: VerbindungsRegister::neu(),
            schlange: WarteSchlange::neu(),
            paarungen: PaarungsManager::neu(),
            suche: SuchDienst::neu(),
        })
    }

    /// Reiht eine Sitzung ein und startet ihren Such-Task
    ///
    /// Vorbedingung: die Sitzung ist verbunden und nicht gepaart
    /// (Aufrufer raeumen Paarungen vorher auf). Das Profil wird fuer
    /// spaeteres Wiedereinreihen gemerkt; das Einreihen selbst ist
    /// idempotent.
    pub fn einreihen_und_suchen(
        self: &Arc<Self>,
        sitzung: SessionId,
        user_id: UserId,
        stufe: Stufe,
        praeferenzen: Praeferenzen,
        blockierte: HashSet<UserId>,
    ) -> zufall_core::Result<()> {
        if !self.register.ist_verbunden(&sitzung) {
            return Err(ZufallError::NichtVerbunden(sitzung.to_string()));
        }
        if self.paarungen.ist_gepaart(&sitzung) {
            return Err(ZufallError::BereitsGepaart(sitzung.to_string()));
        }

        self.register.profil_setzen(
            &sitzung,
            user_id,
            stufe,
            praeferenzen.clone(),
            blockierte.clone(),
        );
        self.schlange
            .einreihen(sitzung, user_id, stufe, praeferenzen, blockierte);
        self.suche.starten(Arc::clone(self), sitzung);
        Ok(())
    }

    /// Bricht die Suche einer Sitzung ab
    ///
    /// Gibt `true` zurueck wenn ein Such-Task oder ein Schlangen-Eintrag
    /// existierte.
    pub fn suche_abbrechen(&self, sitzung: &SessionId) -> bool {
        let task_lief = self.suche.stoppen(sitzung);
        let war_eingereiht = self.schlange.entfernen(sitzung);
        task_lief || war_eingereiht
    }

    /// Fuehrt das Skip-Protokoll einer gepaarten Sitzung aus
    ///
    /// Beide Seiten erhalten `match-ended` solange die Paarung noch
    /// existiert; der uebersprungene Partner wird immer wieder
    /// eingereiht, der Ausloeser nur mit gesetztem Flag. Gibt den
    /// Partner zurueck, `None` wenn keine Paarung bestand.
    pub fn skip(self: &Arc<Self>, sitzung: SessionId, auto_requeue: bool) -> Option<SessionId> {
        let partner = self.paarungen.trennen_mit(&sitzung, |partner| {
            self.register.senden(
                &partner,
                ServerEvent::match_beendet(BeendigungsGrund::Skipped, sitzung, true),
            );
            self.register.senden(
                &sitzung,
                ServerEvent::match_beendet(BeendigungsGrund::Skipped, sitzung, auto_requeue),
            );
        })?;

        // Restliche Such-Tasks beenden (normalerweise laengst gestoppt)
        if self.suche.stoppen(&sitzung) {
            self.register.senden(&sitzung, ServerEvent::MatchmakingStopped);
        }
        if self.suche.stoppen(&partner) {
            self.register.senden(&partner, ServerEvent::MatchmakingStopped);
        }

        self.wieder_einreihen_nach(partner, REQUEUE_VERZOEGERUNG);
        if auto_requeue {
            self.wieder_einreihen_nach(sitzung, REQUEUE_VERZOEGERUNG);
        }

        Some(partner)
    }

    /// Reiht eine Sitzung nach einer Verzoegerung erneut ein
    ///
    /// Prueft vorher dass die Sitzung noch verbunden und nicht als
    /// gepaart markiert ist; ein uebrig gebliebener Paarungs-Eintrag
    /// wird vor dem Einreihen repariert.
    pub fn wieder_einreihen_nach(self: &Arc<Self>, sitzung: SessionId, verzoegerung: Duration) {
        let kern = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(verzoegerung).await;

            if !kern.register.ist_verbunden(&sitzung) {
                return;
            }
            if kern.paarungen.ist_gepaart(&sitzung) {
                tracing::warn!(
                    sitzung = %sitzung,
                    "Sitzung beim Wiedereinreihen noch als gepaart markiert – Zustand wird repariert"
                );
                kern.paarungen.trennen(&sitzung);
            }

            let Some(profil) = kern.register.profil_von(&sitzung) else {
                return;
            };
            let Some(user_id) = profil.user_id else {
                tracing::warn!(sitzung = %sitzung, "Wiedereinreihen ohne Benutzer-Profil");
                return;
            };

            tracing::debug!(sitzung = %sitzung, "Sitzung wird wieder eingereiht");
            if let Err(fehler) = kern.einreihen_und_suchen(
                sitzung,
                user_id,
                profil.stufe,
                profil.praeferenzen,
                profil.blockierte,
            ) {
                tracing::warn!(sitzung = %sitzung, fehler = %fehler, "Wiedereinreihen fehlgeschlagen");
            }
        });
    }

    /// Trennungs-Protokoll beim Verbindungsende
    ///
    /// Reihenfolge: Such-Task beenden, Paarung aufloesen (Partner erhaelt
    /// `match-ended`), Schlangen-Eintrag entfernen, Register-Eintrag
    /// loeschen. Alles passiert bevor dieser Aufruf zurueckkehrt; der
    /// Partner wird beim Verbindungsabbruch nicht wieder eingereiht.
    pub fn abmelden(self: &Arc<Self>, sitzung: SessionId) {
        self.suche.stoppen(&sitzung);

        let partner = self.paarungen.trennen_mit(&sitzung, |partner| {
            self.register.senden(
                &partner,
                ServerEvent::match_beendet(BeendigungsGrund::Disconnected, sitzung, false),
            );
        });
        if let Some(partner) = partner {
            if self.suche.stoppen(&partner) {
                self.register.senden(&partner, ServerEvent::MatchmakingStopped);
            }
        }

        self.schlange.entfernen(&sitzung);
        self.register.abmelden(&sitzung);

        tracing::info!(sitzung = %sitzung, "Sitzung getrennt und aufgeraeumt");
    }

    /// Zaehler-Uebersicht fuer Logging und Diagnose
    pub fn uebersicht(&self) -> Uebersicht {
        Uebersicht {
            schlange: self.schlange.momentaufnahme(),
            paarungen: self.paarungen.anzahl(),
            verbunden: self.register.anzahl(),
            suchende: self.suche.anzahl(),
        }
    }
}
