//! Vermittlungs-Handler – find-match, cancel-match, skip
//!
//! Der einzige Ort an dem externe Dienste auf dem Ereignis-Pfad
//! aufgerufen werden: Identitaets-Aufloesung und Blocklisten-Abruf beim
//! Einreihen. Der Blocklisten-Abruf ist best effort – bei Ausfall wird
//! ohne Filter eingereiht.

use std::collections::HashSet;
use std::sync::Arc;

use zufall_core::SessionId;
use zufall_protocol::{events::FindMatchAuftrag, events::SkipAuftrag, ServerEvent};
use zufall_stores::{BlockStore, IdentityStore, Moderator};

use crate::zustand::SignalZustand;

/// Verarbeitet `find-match`: einreihen und Such-Task starten
pub async fn handle_find_match<I, B, M>(
    auftrag: FindMatchAuftrag,
    sitzung: SessionId,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let identitaet = match zustand.identitaet.authentifizieren(&auftrag.user_id).await {
        Ok(identitaet) => identitaet,
        Err(fehler) => {
            tracing::warn!(sitzung = %sitzung, fehler = %fehler, "find-match ohne Identitaet verworfen");
            return;
        }
    };

    // Blockliste best effort: bei Ausfall ohne Filter einreihen
    let blockierte = match zustand.blockliste.blockierte_von(&identitaet.user_id).await {
        Ok(blockierte) => blockierte,
        Err(fehler) => {
            tracing::warn!(
                user_id = %identitaet.user_id,
                fehler = %fehler,
                "Blockliste nicht verfuegbar – Einreihen ohne Blockfilter"
            );
            HashSet::new()
        }
    };

    // Vorbedingung des Einreihens (nicht gepaart, verbunden) prueft der Kern
    match zustand.kern.einreihen_und_suchen(
        sitzung,
        identitaet.user_id,
        identitaet.stufe,
        auftrag.preferences,
        blockierte,
    ) {
        Ok(()) => {
            tracing::debug!(
                sitzung = %sitzung,
                user_id = %identitaet.user_id,
                stufe = %identitaet.stufe,
                "Partnersuche beginnt"
            );
        }
        Err(fehler) => {
            tracing::warn!(sitzung = %sitzung, fehler = %fehler, "find-match verworfen");
        }
    }
}

/// Verarbeitet `cancel-match`: Suche beenden und bestaetigen
pub fn handle_cancel_match<I, B, M>(sitzung: SessionId, zustand: &Arc<SignalZustand<I, B, M>>)
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    zustand.kern.suche_abbrechen(&sitzung);
    zustand
        .kern
        .register
        .senden(&sitzung, ServerEvent::MatchCancelled);
    tracing::debug!(sitzung = %sitzung, "Suche abgebrochen");
}

/// Verarbeitet `skip`
///
/// Mit Paarung laeuft das volle Skip-Protokoll des Kerns. Ohne Paarung
/// gilt: ohne `autoRequeue` verhaelt sich skip wie `cancel-match`, mit
/// `autoRequeue` wie ein erneutes Einreihen aus dem Sitzungs-Profil.
pub fn handle_skip<I, B, M>(
    auftrag: SkipAuftrag,
    sitzung: SessionId,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let kern = &zustand.kern;

    // Mitgeschickte Praeferenzen fuer das Wiedereinreihen uebernehmen
    if let Some(praeferenzen) = auftrag.preferences {
        if let Some(profil) = kern.register.profil_von(&sitzung) {
            if let Some(user_id) = profil.user_id {
                kern.register.profil_setzen(
                    &sitzung,
                    user_id,
                    profil.stufe,
                    praeferenzen,
                    profil.blockierte,
                );
            }
        }
    }

    kern.register
        .senden(&sitzung, ServerEvent::skip_bestaetigt(auftrag.auto_requeue));

    if kern.skip(sitzung, auftrag.auto_requeue).is_some() {
        return;
    }

    // Keine Paarung vorhanden
    if auftrag.auto_requeue {
        let Some(profil) = kern.register.profil_von(&sitzung) else {
            return;
        };
        let Some(user_id) = profil.user_id else {
            tracing::debug!(sitzung = %sitzung, "skip ohne Profil – nichts einzureihen");
            return;
        };
        if let Err(fehler) = kern.einreihen_und_suchen(
            sitzung,
            user_id,
            profil.stufe,
            profil.praeferenzen,
            profil.blockierte,
        ) {
            tracing::warn!(sitzung = %sitzung, fehler = %fehler, "skip-Einreihen fehlgeschlagen");
        }
    } else {
        kern.suche_abbrechen(&sitzung);
        kern.register.senden(&sitzung, ServerEvent::MatchCancelled);
    }
}
