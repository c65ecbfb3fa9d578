//! Ereignis-Dispatcher – Routet Client-Ereignisse an die Handler
//!
//! Der Dispatcher empfaengt dekodierte `ClientEvent`s einer Verbindung
//! und ruft den passenden Handler auf. Antworten fliessen nie hier
//! zurueck – alles Ausgehende laeuft ueber die Send-Queue der Sitzung
//! im Verbindungs-Register.

use std::sync::Arc;

use zufall_core::SessionId;
use zufall_protocol::ClientEvent;
use zufall_stores::{BlockStore, IdentityStore, Moderator};

use crate::handlers::{chat_handler, match_handler, relay_handler};
use crate::handlers::relay_handler::SignalArt;
use crate::zustand::SignalZustand;

/// Zentraler Ereignis-Dispatcher
pub struct EreignisDispatcher<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    zustand: Arc<SignalZustand<I, B, M>>,
}

impl<I, B, M> EreignisDispatcher<I, B, M>
where
    I: IdentityStore + 'static,
    B: BlockStore + 'static,
    M: Moderator + 'static,
{
    /// Erstellt einen neuen Dispatcher
    pub fn neu(zustand: Arc<SignalZustand<I, B, M>>) -> Self {
        Self { zustand }
    }

    /// Verarbeitet ein eingehendes Client-Ereignis
    ///
    /// Ereignisse ohne gueltigen Kontext (kein Partner, falsches Ziel)
    /// werden von den Handlern stillschweigend verworfen – ein spaetes
    /// Signal nach einem Skip ist kein Fehler.
    pub async fn dispatch(&self, sitzung: SessionId, ereignis: ClientEvent) {
        match ereignis {
            // ---------------------------------------------------------------
            // Vermittlung
            // ---------------------------------------------------------------
            ClientEvent::FindMatch(auftrag) => {
                match_handler::handle_find_match(auftrag, sitzung, &self.zustand).await;
            }
            ClientEvent::CancelMatch => {
                match_handler::handle_cancel_match(sitzung, &self.zustand);
            }
            ClientEvent::Skip(auftrag) => {
                match_handler::handle_skip(auftrag, sitzung, &self.zustand);
            }

            // ---------------------------------------------------------------
            // Chat
            // ---------------------------------------------------------------
            ClientEvent::SendMessage(auftrag) => {
                chat_handler::handle_send_message(auftrag, sitzung, &self.zustand).await;
            }
            ClientEvent::Typing => {
                relay_handler::handle_typing(sitzung, true, &self.zustand);
            }
            ClientEvent::StopTyping => {
                relay_handler::handle_typing(sitzung, false, &self.zustand);
            }

            // ---------------------------------------------------------------
            // WebRTC-Signaling
            // ---------------------------------------------------------------
            ClientEvent::Offer(auftrag) => {
                relay_handler::handle_signal(SignalArt::Offer, auftrag, sitzung, &self.zustand);
            }
            ClientEvent::Answer(auftrag) => {
                relay_handler::handle_signal(SignalArt::Answer, auftrag, sitzung, &self.zustand);
            }
            ClientEvent::IceCandidate(auftrag) => {
                relay_handler::handle_signal(
                    SignalArt::IceCandidate,
                    auftrag,
                    sitzung,
                    &self.zustand,
                );
            }

            // ---------------------------------------------------------------
            // Medien-Status
            // ---------------------------------------------------------------
            ClientEvent::VideoToggle(auftrag) => {
                relay_handler::handle_toggle(sitzung, true, auftrag.enabled, &self.zustand);
            }
            ClientEvent::AudioToggle(auftrag) => {
                relay_handler::handle_toggle(sitzung, false, auftrag.enabled, &self.zustand);
            }
        }
    }
}
