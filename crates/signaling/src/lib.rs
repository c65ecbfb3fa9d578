//! zufall-signaling – Verbindungs- und Relay-Schicht
//!
//! Nimmt TCP-Verbindungen an, uebersetzt Frames in Client-Ereignisse und
//! routet sie an die Handler. Vermittlungs-Zustand lebt im
//! `zufall-matching`-Kern; hier passiert nur Transport, Dispatch und das
//! Weiterleiten zwischen gepaarten Sitzungen.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalServer, LocalSet)
//!     |
//!     v
//! ClientVerbindung (pro Verbindung ein Task)
//!     |  registriert die Sitzung, liest Frames, schreibt die Send-Queue
//!     v
//! EreignisDispatcher
//!     |
//!     +-- match_handler  (find-match, cancel-match, skip)
//!     +-- chat_handler   (send-message + Moderation)
//!     +-- relay_handler  (offer/answer/ice, typing, Medien-Umschalter)
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod tcp;
pub mod verbindung;
pub mod zustand;

// Bequeme Re-Exporte
pub use dispatcher::EreignisDispatcher;
pub use tcp::SignalServer;
pub use verbindung::ClientVerbindung;
pub use zustand::{SignalConfig, SignalZustand};
