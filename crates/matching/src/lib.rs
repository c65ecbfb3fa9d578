//! zufall-matching – Vermittlungskern
//!
//! Dieses Crate implementiert den zustandsbehafteten Kern des Dienstes:
//!
//! ```text
//! VerbindungsRegister – wer ist verbunden, Zustellung an Sitzungen
//! WarteSchlange       – wartende Sitzungen, Kandidaten-Suche, Scoring
//! PaarungsManager     – die symmetrische Sitzung<->Sitzung Relation
//! SuchDienst          – ein abbrechbarer Such-Task pro suchender Sitzung
//! MatchKern           – verdrahtet alles; Skip-, Requeue- und
//!                       Trennungs-Protokoll
//! ```
//!
//! Lebenszyklus einer Sitzung:
//!
//! ```text
//!  IDLE --einreihen--> SUCHEND --paaren--> GEPAART --trennen--> IDLE
//!    ^                    |                    |
//!    +---- Abbruch / Verbindungsende ----------+
//! ```
//!
//! Alle geteilten Tabellen liegen hinter gegenseitigem Ausschluss; der
//! PaarungsManager ist der Serialisierungspunkt der Doppel-Paarungen
//! unmoeglich macht.

pub mod kern;
pub mod paarung;
pub mod register;
pub mod schlange;
pub mod treiber;

// Bequeme Re-Exporte
pub use kern::{MatchKern, Uebersicht};
pub use paarung::PaarungsManager;
pub use register::{SitzungsProfil, VerbindungsRegister};
pub use schlange::{Momentaufnahme, WarteEintrag, WarteSchlange};
pub use treiber::SuchDienst;
