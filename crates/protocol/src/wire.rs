//! Wire-Format des Ereignisstroms
//!
//! Jedes Ereignis reist als eigener Frame: ein u32-Laengenpraefix
//! (big-endian, zaehlt nur die Nutzlast) gefolgt vom JSON des Ereignisses.
//!
//! Zwei Invarianten traegt der Codec:
//!
//! 1. **Frame-Grenzen ueberleben Fehler.** Sobald ein Frame vollstaendig
//!    im Buffer liegt wird er komplett verbraucht – auch wenn seine
//!    Nutzlast kein gueltiges Ereignis ergibt. Der Leser steht danach
//!    garantiert am Anfang des naechsten Frames und kann das kaputte
//!    Ereignis einfach verwerfen statt die Verbindung zu kappen.
//! 2. **Ein Limit fuer beide Richtungen.** Was der Codec nicht schreiben
//!    wuerde, nimmt er auch nicht an; ein absurdes Laengenpraefix wird
//!    abgelehnt bevor dafuer Speicher reserviert wird.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::events::{ClientEvent, ServerEvent};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Nutzlast eines Frames (256 KB)
///
/// SDP-Blobs und ICE-Kandidaten liegen weit darunter; Chat-Nachrichten
/// sowieso. Alles darueber ist ein kaputter oder boeswilliger Client.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Breite des Laengenpraefix in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer den Ereignisstrom
///
/// Der Typparameter bestimmt die Dekodier-Richtung: der Server dekodiert
/// `ClientEvent` ([`ServerCodec`]), ein Client dekodiert `ServerEvent`
/// ([`ClientCodec`]). Kodiert wird jeder serialisierbare Ereignistyp.
#[derive(Debug)]
pub struct FrameCodec<E> {
    /// Maximale erlaubte Nutzlast in Bytes
    max_frame_size: usize,
    _richtung: PhantomData<E>,
}

/// Serverseitiger Codec: liest `ClientEvent`, schreibt `ServerEvent`
pub type ServerCodec = FrameCodec<ClientEvent>;

/// Clientseitiger Codec: liest `ServerEvent`, schreibt `ClientEvent`
pub type ClientCodec = FrameCodec<ServerEvent>;

impl<E> FrameCodec<E> {
    /// Erstellt einen neuen Codec mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            _richtung: PhantomData,
        }
    }

    /// Erstellt einen Codec mit benutzerdefinierter maximaler Nutzlast
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _richtung: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Nutzlast zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn limit_fehler(&self, laenge: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame-Nutzlast von {laenge} Bytes ueberschreitet das Limit von {} Bytes",
                self.max_frame_size
            ),
        )
    }
}

impl<E> Default for FrameCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for FrameCodec<E> {
    fn clone(&self) -> Self {
        Self {
            max_frame_size: self.max_frame_size,
            _richtung: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<E: DeserializeOwned> Decoder for FrameCodec<E> {
    type Item = E;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Ohne vollstaendiges Praefix ist nichts zu entscheiden
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let mut praefix = [0u8; LENGTH_FIELD_SIZE];
        praefix.copy_from_slice(&src[..LENGTH_FIELD_SIZE]);
        let nutzlast_laenge = u32::from_be_bytes(praefix) as usize;

        // Limit pruefen bevor Speicher fuer den Frame reserviert wird
        if nutzlast_laenge > self.max_frame_size {
            return Err(self.limit_fehler(nutzlast_laenge));
        }

        let frame_ende = LENGTH_FIELD_SIZE + nutzlast_laenge;
        if src.len() < frame_ende {
            // Rest des Frames steht noch aus
            src.reserve(frame_ende - src.len());
            return Ok(None);
        }

        // Ab hier wird der Frame vollstaendig verbraucht, damit der Strom
        // auch nach unlesbarer Nutzlast an einer Frame-Grenze steht
        src.advance(LENGTH_FIELD_SIZE);
        let nutzlast = src.split_to(nutzlast_laenge);

        match serde_json::from_slice(&nutzlast) {
            Ok(ereignis) => Ok(Some(ereignis)),
            Err(fehler) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Frame-Nutzlast ist kein gueltiges Ereignis: {fehler}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<E, T: Serialize> Encoder<T> for FrameCodec<E> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let nutzlast = serde_json::to_vec(&item).map_err(|fehler| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Ereignis nicht serialisierbar: {fehler}"),
            )
        })?;

        // Dasselbe Limit wie beim Lesen – was die Gegenstelle ablehnen
        // wuerde, geht gar nicht erst auf die Leitung
        if nutzlast.len() > self.max_frame_size {
            return Err(self.limit_fehler(nutzlast.len()));
        }

        dst.reserve(LENGTH_FIELD_SIZE + nutzlast.len());
        dst.put_u32(nutzlast.len() as u32);
        dst.extend_from_slice(&nutzlast);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{NachrichtAuftrag, SuchFortschritt};

    fn test_client_ereignis(text: &str) -> ClientEvent {
        ClientEvent::SendMessage(NachrichtAuftrag {
            message: text.to_string(),
        })
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut codec = ServerCodec::new();
        let original = test_client_ereignis("servus");

        let mut buf = BytesMut::new();
        codec.encode(original, &mut buf).unwrap();

        // Laengenpraefix zaehlt genau die Nutzlast
        let nutzlast_laenge = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + nutzlast_laenge);

        let decoded = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss ein Ereignis enthalten");
        match decoded {
            ClientEvent::SendMessage(n) => assert_eq!(n.message, "servus"),
            andere => panic!("Falsches Ereignis: {:?}", andere),
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn halber_frame_liefert_noch_nichts() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_client_ereignis("x"), &mut buf).unwrap();

        // Nur die erste Haelfte ankommen lassen
        let mut teilstueck = buf.split_to(buf.len() / 2);
        assert!(codec.decode(&mut teilstueck).unwrap().is_none());

        // Praefix allein reicht ebenfalls nicht
        let mut nur_praefix = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut nur_praefix).unwrap().is_none());
    }

    #[test]
    fn limit_gilt_beim_lesen() {
        let mut codec = ServerCodec::with_max_size(64);
        let mut buf = BytesMut::new();
        buf.put_u32(128);
        buf.put_slice(&[b'x'; 128]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn limit_gilt_beim_schreiben() {
        let mut codec = ServerCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        let result = codec.encode(test_client_ereignis("viel zu lang dafuer"), &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn ungueltiges_json_konsumiert_frame() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        // Kaputtes JSON, danach ein gueltiges Ereignis
        let kaputt = b"{ nicht json";
        buf.put_u32(kaputt.len() as u32);
        buf.put_slice(kaputt);
        codec
            .encode(test_client_ereignis("danach"), &mut buf)
            .unwrap();

        // Erster decode: Fehler, aber der kaputte Frame ist verbraucht
        assert!(codec.decode(&mut buf).is_err());

        // Zweiter decode: das gueltige Ereignis
        let decoded = codec.decode(&mut buf).unwrap().expect("Ereignis erwartet");
        assert!(matches!(decoded, ClientEvent::SendMessage(_)));
    }

    #[test]
    fn unbekannter_ereignistyp_ist_invalid_data() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        let blob = br#"{ "type": "teleport", "x": 1 }"#;
        buf.put_u32(blob.len() as u32);
        buf.put_slice(blob);

        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn gestapelte_frames_kommen_der_reihe_nach() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        for i in 0..3 {
            codec
                .encode(test_client_ereignis(&format!("n{}", i)), &mut buf)
                .unwrap();
        }

        for i in 0..3 {
            let ev = codec.decode(&mut buf).unwrap().expect("Ereignis erwartet");
            match ev {
                ClientEvent::SendMessage(n) => assert_eq!(n.message, format!("n{}", i)),
                andere => panic!("Falsches Ereignis: {:?}", andere),
            }
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn beide_richtungen_verstehen_sich() {
        let mut server = ServerCodec::new();
        let mut client = ClientCodec::new();

        // Server -> Client
        let mut buf = BytesMut::new();
        server
            .encode(ServerEvent::suche_laeuft(Some(1), 250, 1), &mut buf)
            .unwrap();
        let beim_client = client.decode(&mut buf).unwrap().expect("Ereignis erwartet");
        assert!(matches!(
            beim_client,
            ServerEvent::Searching(SuchFortschritt { wait_time: 250, .. })
        ));

        // Client -> Server
        let mut buf = BytesMut::new();
        client.encode(ClientEvent::CancelMatch, &mut buf).unwrap();
        let beim_server = server.decode(&mut buf).unwrap().expect("Ereignis erwartet");
        assert!(matches!(beim_server, ClientEvent::CancelMatch));
    }
}
