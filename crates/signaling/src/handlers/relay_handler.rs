//! Relay-Handler – Signaling, Tipp-Status und Medien-Umschalter
//!
//! Leitet Ereignisse strikt zwischen den beiden Seiten einer Paarung
//! weiter. Signaling-Ereignisse tragen ein deklariertes Ziel und werden
//! nur zugestellt wenn das Ziel der aktuelle Partner des Absenders ist –
//! alles andere wird stillschweigend verworfen (ein spaetes Signal nach
//! einem Skip ist kein Fehler).

use std::sync::Arc;

use zufall_core::SessionId;
use zufall_protocol::{
    events::{SignalAuftrag, SignalWeiterleitung, ToggleWeiterleitung},
    ServerEvent,
};
use zufall_stores::{BlockStore, IdentityStore, Moderator};

use crate::zustand::SignalZustand;

/// Art eines Signaling-Ereignisses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalArt {
    Offer,
    Answer,
    IceCandidate,
}

/// Leitet ein Signaling-Ereignis an den Partner weiter
pub fn handle_signal<I, B, M>(
    art: SignalArt,
    auftrag: SignalAuftrag,
    sitzung: SessionId,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let kern = &zustand.kern;

    // Nur zustellen wenn das deklarierte Ziel der aktuelle Partner ist
    if kern.paarungen.partner_von(&sitzung) != Some(auftrag.to) {
        tracing::debug!(
            sitzung = %sitzung,
            ziel = %auftrag.to,
            art = ?art,
            "Signal an fremdes Ziel verworfen"
        );
        return;
    }

    let weiterleitung = SignalWeiterleitung {
        from: sitzung,
        daten: auftrag.daten,
    };
    let ereignis = match art {
        SignalArt::Offer => ServerEvent::Offer(weiterleitung),
        SignalArt::Answer => ServerEvent::Answer(weiterleitung),
        SignalArt::IceCandidate => ServerEvent::IceCandidate(weiterleitung),
    };

    kern.register.senden(&auftrag.to, ereignis);
}

/// Leitet den Tipp-Status an den Partner weiter
pub fn handle_typing<I, B, M>(
    sitzung: SessionId,
    tippt: bool,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let kern = &zustand.kern;
    let Some(partner) = kern.paarungen.partner_von(&sitzung) else {
        return;
    };

    let ereignis = if tippt {
        ServerEvent::UserTyping
    } else {
        ServerEvent::UserStoppedTyping
    };
    kern.register.senden(&partner, ereignis);
}

/// Leitet einen Medien-Umschalter an den Partner weiter
pub fn handle_toggle<I, B, M>(
    sitzung: SessionId,
    video: bool,
    enabled: bool,
    zustand: &Arc<SignalZustand<I, B, M>>,
) where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    let kern = &zustand.kern;
    let Some(partner) = kern.paarungen.partner_von(&sitzung) else {
        return;
    };

    let weiterleitung = ToggleWeiterleitung { enabled };
    let ereignis = if video {
        ServerEvent::PeerVideoToggle(weiterleitung)
    } else {
        ServerEvent::PeerAudioToggle(weiterleitung)
    };
    kern.register.senden(&partner, ereignis);
}
