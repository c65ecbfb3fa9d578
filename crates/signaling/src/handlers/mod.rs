//! Ereignis-Handler der Signaling-Schicht

pub mod chat_handler;
pub mod match_handler;
pub mod relay_handler;
