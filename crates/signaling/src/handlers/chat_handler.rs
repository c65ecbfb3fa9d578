//! Chat-Handler – send-message mit Moderation
//!
//! Jede Nachricht laeuft durch den Moderator bevor sie zugestellt wird.
//! Bei einem Veto erfaehrt nur der Absender davon; der Partner sieht die
//! Nachricht nie. Erlaubte Nachrichten gehen an beide Seiten mit einem
//! einzigen autoritativen Zeitstempel – das Echo an den Absender legt
//! die Reihenfolge fest.

use std::sync::Arc;

use zufall_core::SessionId;
use zufall_protocol::{events::NachrichtAuftrag, ServerEvent};
use zufall_stores::{BlockStore, IdentityStore, Moderator, Urteil};

use crate::zustand::SignalZustand;

/// Verarbeitet `send-message`
pub async fn handle_send_message<I, B, M>(
    auftrag: NachrichtAuftrag,
    sitzung: SessionId,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let kern = &zustand.kern;

    let Some(partner) = kern.paarungen.partner_von(&sitzung) else {
        tracing::debug!(sitzung = %sitzung, "Nachricht ohne Partner verworfen");
        return;
    };

    let urteil = match zustand.moderator.pruefen(&auftrag.message).await {
        Ok(urteil) => urteil,
        Err(fehler) => {
            // Moderations-Ausfall blockiert den Chat nicht
            tracing::warn!(fehler = %fehler, "Moderator nicht verfuegbar – Nachricht passiert");
            Urteil::Erlaubt
        }
    };

    if let Urteil::Veto { grund } = urteil {
        tracing::debug!(sitzung = %sitzung, "Nachricht blockiert");
        kern.register
            .senden(&sitzung, ServerEvent::nachricht_blockiert(grund));
        return;
    }

    // Waehrend der Pruefung kann die Paarung zerfallen sein
    if kern.paarungen.partner_von(&sitzung) != Some(partner) {
        tracing::debug!(sitzung = %sitzung, "Paarung waehrend der Moderation beendet");
        return;
    }

    let zeitstempel = chrono::Utc::now().timestamp_millis() as u64;
    let ereignis = ServerEvent::nachricht(auftrag.message, zeitstempel, sitzung);

    kern.register.senden(&sitzung, ereignis.clone());
    kern.register.senden(&partner, ereignis);
}
