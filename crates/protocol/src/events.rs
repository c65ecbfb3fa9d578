//! Client-Ereignisprotokoll
//!
//! Alle Ereignisse die der Kern empfaengt (`ClientEvent`) oder versendet
//! (`ServerEvent`). Die Ereignisnamen und Payload-Felder sind Teil des
//! Client-Vertrags und duerfen nicht umbenannt werden.
//!
//! Signaling-Payloads (Offer/Answer/ICE) sind fuer den Kern opak: neben
//! der Adressierung (`to` bzw. `from`) werden alle weiteren Felder als
//! unveraenderter JSON-Blob durchgereicht.

use serde::{Deserialize, Serialize};
use zufall_core::{SessionId, Stufe, UserId};

// ---------------------------------------------------------------------------
// Praeferenzen
// ---------------------------------------------------------------------------

/// Platzhalter-Wert fuer "beliebige Region"
pub const REGION_BELIEBIG: &str = "any";

/// Gewuenschtes Geschlecht des Partners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Geschlecht {
    #[serde(rename = "male")]
    Maennlich,
    #[serde(rename = "female")]
    Weiblich,
    #[serde(rename = "any")]
    Beliebig,
}

impl Default for Geschlecht {
    fn default() -> Self {
        Geschlecht::Beliebig
    }
}

/// Such-Praeferenzen einer Sitzung
///
/// Region und Geschlecht filtern Kandidaten nur aus Sicht des Suchenden;
/// der Kandidat filtert reziprok sobald er selbst an der Reihe ist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Praeferenzen {
    #[serde(rename = "tier")]
    pub stufe: Stufe,
    #[serde(rename = "gender")]
    pub geschlecht: Geschlecht,
    pub region: String,
}

impl Praeferenzen {
    /// Prueft ob die Regions-Praeferenz beliebig ist
    pub fn region_beliebig(&self) -> bool {
        self.region == REGION_BELIEBIG
    }

    /// Prueft ob die Geschlechts-Praeferenz beliebig ist
    pub fn geschlecht_beliebig(&self) -> bool {
        self.geschlecht == Geschlecht::Beliebig
    }
}

impl Default for Praeferenzen {
    fn default() -> Self {
        Self {
            stufe: Stufe::Free,
            geschlecht: Geschlecht::Beliebig,
            region: REGION_BELIEBIG.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Eingehende Ereignisse (Client -> Kern)
// ---------------------------------------------------------------------------

/// Auftrag zur Partnersuche
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMatchAuftrag {
    /// Vom Client deklarierte Benutzerkennung (wird als Token an den
    /// IdentityStore gereicht)
    pub user_id: String,
    #[serde(default)]
    pub preferences: Praeferenzen,
}

/// Skip-Auftrag einer gepaarten (oder ungepaarten) Sitzung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipAuftrag {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub preferences: Option<Praeferenzen>,
    pub auto_requeue: bool,
}

/// Chat-Nachricht an den Partner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtAuftrag {
    pub message: String,
}

/// Eingehendes Signaling-Ereignis mit deklariertem Ziel
///
/// Alle Felder ausser `to` bleiben als opaker Blob erhalten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalAuftrag {
    pub to: SessionId,
    #[serde(flatten)]
    pub daten: serde_json::Value,
}

/// Medien-Umschalter (Kamera/Mikrofon)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToggleAuftrag {
    pub enabled: bool,
}

/// Alle Ereignisse die ein Client an den Kern senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    // Vermittlung
    FindMatch(FindMatchAuftrag),
    CancelMatch,
    Skip(SkipAuftrag),

    // Chat
    SendMessage(NachrichtAuftrag),
    Typing,
    StopTyping,

    // WebRTC-Signaling
    Offer(SignalAuftrag),
    Answer(SignalAuftrag),
    IceCandidate(SignalAuftrag),

    // Medien-Status
    VideoToggle(ToggleAuftrag),
    AudioToggle(ToggleAuftrag),
}

// ---------------------------------------------------------------------------
// Ausgehende Ereignisse (Kern -> Client)
// ---------------------------------------------------------------------------

/// Grund fuer das Ende einer Paarung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeendigungsGrund {
    Skipped,
    Disconnected,
}

/// Fortschritts-Tick waehrend der Suche
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuchFortschritt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    /// Bisherige Wartezeit in Millisekunden
    pub wait_time: u64,
    pub search_attempts: u32,
}

/// Paarung zustande gekommen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchGefunden {
    pub match_session_id: SessionId,
    pub match_user_id: UserId,
    /// Wartezeit dieser Seite in Millisekunden
    pub wait_time: u64,
}

/// Paarung beendet (Skip oder Verbindungsabbruch)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBeendet {
    pub reason: BeendigungsGrund,
    pub from_session_id: SessionId,
    pub disconnected: bool,
    pub auto_requeue: bool,
}

/// Zugestellte Chat-Nachricht (geht an beide Seiten, ein Zeitstempel)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NachrichtEmpfang {
    pub message: String,
    /// Unix-Zeitstempel in Millisekunden
    pub timestamp: u64,
    pub sender_id: SessionId,
}

/// Moderations-Veto – nur der Absender erfaehrt davon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NachrichtBlockiert {
    pub reason: String,
}

/// Weitergeleitetes Signaling-Ereignis mit Absenderkennung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalWeiterleitung {
    pub from: SessionId,
    #[serde(flatten)]
    pub daten: serde_json::Value,
}

/// Weitergeleiteter Medien-Umschalter des Partners
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToggleWeiterleitung {
    pub enabled: bool,
}

/// Skip-Bestaetigung an den Ausloeser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipBestaetigung {
    pub auto_requeue: bool,
}

/// Alle Ereignisse die der Kern an einen Client senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    // Vermittlung
    Searching(SuchFortschritt),
    MatchFound(MatchGefunden),
    MatchCancelled,
    MatchEnded(MatchBeendet),
    MatchmakingStopped,
    SkipSuccess(SkipBestaetigung),

    // Chat
    ReceiveMessage(NachrichtEmpfang),
    MessageBlocked(NachrichtBlockiert),
    UserTyping,
    UserStoppedTyping,

    // WebRTC-Signaling
    Offer(SignalWeiterleitung),
    Answer(SignalWeiterleitung),
    IceCandidate(SignalWeiterleitung),

    // Medien-Status des Partners
    PeerVideoToggle(ToggleWeiterleitung),
    PeerAudioToggle(ToggleWeiterleitung),
}

impl ServerEvent {
    /// Erstellt ein Such-Fortschritts-Ereignis
    pub fn suche_laeuft(
        queue_position: Option<usize>,
        wait_time_ms: u64,
        search_attempts: u32,
    ) -> Self {
        Self::Searching(SuchFortschritt {
            queue_position,
            wait_time: wait_time_ms,
            search_attempts,
        })
    }

    /// Erstellt ein Match-Found-Ereignis
    pub fn match_gefunden(partner: SessionId, partner_user: UserId, wait_time_ms: u64) -> Self {
        Self::MatchFound(MatchGefunden {
            match_session_id: partner,
            match_user_id: partner_user,
            wait_time: wait_time_ms,
        })
    }

    /// Erstellt ein Match-Ended-Ereignis
    pub fn match_beendet(
        reason: BeendigungsGrund,
        from: SessionId,
        auto_requeue: bool,
    ) -> Self {
        Self::MatchEnded(MatchBeendet {
            reason,
            from_session_id: from,
            disconnected: true,
            auto_requeue,
        })
    }

    /// Erstellt ein Receive-Message-Ereignis
    pub fn nachricht(message: impl Into<String>, timestamp_ms: u64, sender: SessionId) -> Self {
        Self::ReceiveMessage(NachrichtEmpfang {
            message: message.into(),
            timestamp: timestamp_ms,
            sender_id: sender,
        })
    }

    /// Erstellt ein Message-Blocked-Ereignis
    pub fn nachricht_blockiert(reason: impl Into<String>) -> Self {
        Self::MessageBlocked(NachrichtBlockiert {
            reason: reason.into(),
        })
    }

    /// Erstellt eine Skip-Bestaetigung
    pub fn skip_bestaetigt(auto_requeue: bool) -> Self {
        Self::SkipSuccess(SkipBestaetigung { auto_requeue })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_match_wire_format() {
        let json = r#"{
            "type": "find-match",
            "userId": "anon-771",
            "preferences": { "tier": "premium", "gender": "female", "region": "eu" }
        }"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        match ev {
            ClientEvent::FindMatch(auftrag) => {
                assert_eq!(auftrag.user_id, "anon-771");
                assert_eq!(auftrag.preferences.stufe, Stufe::Premium);
                assert_eq!(auftrag.preferences.geschlecht, Geschlecht::Weiblich);
                assert_eq!(auftrag.preferences.region, "eu");
            }
            andere => panic!("Falsches Ereignis: {:?}", andere),
        }
    }

    #[test]
    fn find_match_ohne_praeferenzen_nutzt_standard() {
        let json = r#"{ "type": "find-match", "userId": "x" }"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        match ev {
            ClientEvent::FindMatch(auftrag) => {
                assert!(auftrag.preferences.region_beliebig());
                assert!(auftrag.preferences.geschlecht_beliebig());
                assert_eq!(auftrag.preferences.stufe, Stufe::Free);
            }
            andere => panic!("Falsches Ereignis: {:?}", andere),
        }
    }

    #[test]
    fn signal_blob_bleibt_opak() {
        let ziel = SessionId::new();
        let json = format!(
            r#"{{ "type": "ice-candidate", "to": "{}", "candidate": {{ "sdpMid": "0", "foo": 42 }} }}"#,
            ziel.inner()
        );
        let ev: ClientEvent = serde_json::from_str(&json).unwrap();
        match ev {
            ClientEvent::IceCandidate(auftrag) => {
                assert_eq!(auftrag.to, ziel);
                assert_eq!(auftrag.daten["candidate"]["foo"], 42);
            }
            andere => panic!("Falsches Ereignis: {:?}", andere),
        }
    }

    #[test]
    fn server_ereignis_tags_sind_kebab_case() {
        let ev = ServerEvent::match_beendet(BeendigungsGrund::Skipped, SessionId::new(), true);
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "match-ended");
        assert_eq!(json["reason"], "skipped");
        assert_eq!(json["disconnected"], true);
        assert_eq!(json["autoRequeue"], true);

        let ev = ServerEvent::MatchmakingStopped;
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "matchmaking-stopped");
    }

    #[test]
    fn searching_ohne_position_laesst_feld_weg() {
        let ev = ServerEvent::suche_laeuft(None, 1500, 3);
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("queuePosition").is_none());
        assert_eq!(json["waitTime"], 1500);
        assert_eq!(json["searchAttempts"], 3);
    }

    #[test]
    fn weiterleitung_traegt_absender() {
        let von = SessionId::new();
        let ev = ServerEvent::Offer(SignalWeiterleitung {
            from: von,
            daten: serde_json::json!({ "sdp": "v=0..." }),
        });
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "offer");
        assert_eq!(json["from"], serde_json::to_value(von).unwrap());
        assert_eq!(json["sdp"], "v=0...");
    }

    #[test]
    fn ereignis_round_trip() {
        let ev = ServerEvent::nachricht("hallo", 1_700_000_000_000, SessionId::new());
        let json = serde_json::to_string(&ev).unwrap();
        let zurueck: ServerEvent = serde_json::from_str(&json).unwrap();
        match zurueck {
            ServerEvent::ReceiveMessage(n) => assert_eq!(n.message, "hallo"),
            andere => panic!("Falsches Ereignis: {:?}", andere),
        }
    }
}
