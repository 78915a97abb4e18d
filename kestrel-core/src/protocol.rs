//! Wire codec for the signal-processor and display interfaces.
//!
//! Both directions are packed little-endian datagrams with fixed field
//! offsets. Encoding writes into preallocated buffers; decoding validates
//! lengths and message ids before touching any payload bytes.
//!
//! Ingress — SP detection message:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 4    | messageId (0x0001) |
//! | 4      | 4    | dwellCount |
//! | 8      | 8    | timestamp (µs since epoch) |
//! | 16     | 4    | numDetections |
//! | 20     | 64·N | detection records (8 f64 each) |
//!
//! Egress — track table: 16-byte packed header (messageId 0x0003,
//! timestamp, numTracks) followed by 128-byte track records.

use crate::error::ParseError;
use crate::types::{
    Detection, SpDetectionMessage, Timestamp, TrackClassification, TrackStatus, TrackUpdate,
    MSG_ID_SP_DETECTION, MSG_ID_TRACK_TABLE, MSG_ID_TRACK_UPDATE,
};

/// Size of one encoded detection record.
pub const DETECTION_SIZE: usize = 64;
/// Size of the SP detection message header.
pub const SP_HEADER_SIZE: usize = 20;
/// Size of one encoded track record.
pub const TRACK_RECORD_SIZE: usize = 128;
/// Size of the track table header.
pub const TRACK_TABLE_HEADER_SIZE: usize = 16;

fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

fn get_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}

fn get_f64(buf: &[u8], off: usize) -> f64 {
    f64::from_le_bytes(buf[off..off + 8].try_into().unwrap())
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

fn put_f64(buf: &mut [u8], off: usize, v: f64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Detection records
// ---------------------------------------------------------------------------

/// Encodes one detection record into `buf[off..off + DETECTION_SIZE]`.
pub fn encode_detection(buf: &mut [u8], off: usize, d: &Detection) {
    put_f64(buf, off, d.range);
    put_f64(buf, off + 8, d.azimuth);
    put_f64(buf, off + 16, d.elevation);
    put_f64(buf, off + 24, d.strength);
    put_f64(buf, off + 32, d.noise);
    put_f64(buf, off + 40, d.snr);
    put_f64(buf, off + 48, d.rcs);
    put_f64(buf, off + 56, d.micro_doppler);
}

/// Decodes one detection record starting at `buf[off..]`.
pub fn decode_detection(buf: &[u8], off: usize) -> Detection {
    Detection {
        range: get_f64(buf, off),
        azimuth: get_f64(buf, off + 8),
        elevation: get_f64(buf, off + 16),
        strength: get_f64(buf, off + 24),
        noise: get_f64(buf, off + 32),
        snr: get_f64(buf, off + 40),
        rcs: get_f64(buf, off + 48),
        micro_doppler: get_f64(buf, off + 56),
    }
}

// ---------------------------------------------------------------------------
// SP detection message
// ---------------------------------------------------------------------------

/// Serializes a dwell message exactly as the signal processor emits it.
pub fn encode_detection_message(msg: &SpDetectionMessage) -> Vec<u8> {
    let n = msg.detections.len();
    let mut buf = vec![0u8; SP_HEADER_SIZE + n * DETECTION_SIZE];
    put_u32(&mut buf, 0, MSG_ID_SP_DETECTION);
    put_u32(&mut buf, 4, msg.dwell_count);
    put_u64(&mut buf, 8, msg.timestamp);
    put_u32(&mut buf, 16, n as u32);
    for (i, d) in msg.detections.iter().enumerate() {
        encode_detection(&mut buf, SP_HEADER_SIZE + i * DETECTION_SIZE, d);
    }
    buf
}

/// Parses one ingress datagram into a dwell message.
pub fn decode_detection_message(buf: &[u8]) -> Result<SpDetectionMessage, ParseError> {
    if buf.len() < SP_HEADER_SIZE {
        return Err(ParseError::TooShort {
            expected: SP_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let message_id = get_u32(buf, 0);
    if message_id != MSG_ID_SP_DETECTION {
        return Err(ParseError::UnknownMessageId(message_id));
    }

    let dwell_count = get_u32(buf, 4);
    let timestamp = get_u64(buf, 8);
    let num = get_u32(buf, 16) as usize;

    let available = (buf.len() - SP_HEADER_SIZE) / DETECTION_SIZE;
    if available < num {
        return Err(ParseError::CountMismatch {
            declared: num,
            available,
        });
    }

    let detections = (0..num)
        .map(|i| decode_detection(buf, SP_HEADER_SIZE + i * DETECTION_SIZE))
        .collect();

    Ok(SpDetectionMessage {
        dwell_count,
        timestamp,
        detections,
    })
}

// ---------------------------------------------------------------------------
// Track records and the track table
// ---------------------------------------------------------------------------

/// Encodes one 128-byte track record into `buf[off..]`.
pub fn encode_track_record(buf: &mut [u8], off: usize, t: &TrackUpdate) {
    put_u32(buf, off, MSG_ID_TRACK_UPDATE);
    put_u32(buf, off + 4, t.track_id);
    put_u64(buf, off + 8, t.timestamp);
    put_u32(buf, off + 16, t.status as u32);
    put_u32(buf, off + 20, t.classification as u32);
    put_f64(buf, off + 24, t.range);
    put_f64(buf, off + 32, t.azimuth);
    put_f64(buf, off + 40, t.elevation);
    put_f64(buf, off + 48, t.range_rate);
    put_f64(buf, off + 56, t.x);
    put_f64(buf, off + 64, t.y);
    put_f64(buf, off + 72, t.z);
    put_f64(buf, off + 80, t.vx);
    put_f64(buf, off + 88, t.vy);
    put_f64(buf, off + 96, t.vz);
    put_f64(buf, off + 104, t.quality);
    put_u32(buf, off + 112, t.hit_count);
    put_u32(buf, off + 116, t.miss_count);
    put_u32(buf, off + 120, t.age);
    put_u32(buf, off + 124, 0); // alignment padding
}

/// Decodes one track record starting at `buf[off..]`.
pub fn decode_track_record(buf: &[u8], off: usize) -> Result<TrackUpdate, ParseError> {
    if buf.len() < off + TRACK_RECORD_SIZE {
        return Err(ParseError::TooShort {
            expected: off + TRACK_RECORD_SIZE,
            actual: buf.len(),
        });
    }

    let message_id = get_u32(buf, off);
    if message_id != MSG_ID_TRACK_UPDATE {
        return Err(ParseError::UnknownMessageId(message_id));
    }

    Ok(TrackUpdate {
        track_id: get_u32(buf, off + 4),
        timestamp: get_u64(buf, off + 8),
        status: TrackStatus::try_from(get_u32(buf, off + 16))?,
        classification: TrackClassification::try_from(get_u32(buf, off + 20))?,
        range: get_f64(buf, off + 24),
        azimuth: get_f64(buf, off + 32),
        elevation: get_f64(buf, off + 40),
        range_rate: get_f64(buf, off + 48),
        x: get_f64(buf, off + 56),
        y: get_f64(buf, off + 64),
        z: get_f64(buf, off + 72),
        vx: get_f64(buf, off + 80),
        vy: get_f64(buf, off + 88),
        vz: get_f64(buf, off + 96),
        quality: get_f64(buf, off + 104),
        hit_count: get_u32(buf, off + 112),
        miss_count: get_u32(buf, off + 116),
        age: get_u32(buf, off + 120),
    })
}

/// Serializes the egress track table datagram.
pub fn encode_track_table(tracks: &[TrackUpdate], timestamp: Timestamp) -> Vec<u8> {
    let mut buf = vec![0u8; TRACK_TABLE_HEADER_SIZE + tracks.len() * TRACK_RECORD_SIZE];
    put_u32(&mut buf, 0, MSG_ID_TRACK_TABLE);
    put_u64(&mut buf, 4, timestamp);
    put_u32(&mut buf, 12, tracks.len() as u32);
    for (i, t) in tracks.iter().enumerate() {
        encode_track_record(&mut buf, TRACK_TABLE_HEADER_SIZE + i * TRACK_RECORD_SIZE, t);
    }
    buf
}

/// Parses an egress track table datagram back into records.
pub fn decode_track_table(buf: &[u8]) -> Result<(Vec<TrackUpdate>, Timestamp), ParseError> {
    if buf.len() < TRACK_TABLE_HEADER_SIZE {
        return Err(ParseError::TooShort {
            expected: TRACK_TABLE_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let message_id = get_u32(buf, 0);
    if message_id != MSG_ID_TRACK_TABLE {
        return Err(ParseError::UnknownMessageId(message_id));
    }

    let timestamp = get_u64(buf, 4);
    let num = get_u32(buf, 12) as usize;

    let available = (buf.len() - TRACK_TABLE_HEADER_SIZE) / TRACK_RECORD_SIZE;
    if available < num {
        return Err(ParseError::CountMismatch {
            declared: num,
            available,
        });
    }

    let tracks = (0..num)
        .map(|i| decode_track_record(buf, TRACK_TABLE_HEADER_SIZE + i * TRACK_RECORD_SIZE))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((tracks, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_detection(i: u32) -> Detection {
        Detection {
            range: 1000.0 + i as f64,
            azimuth: 0.1 * i as f64,
            elevation: 0.05,
            strength: -60.0,
            noise: -95.0,
            snr: 20.0,
            rcs: -12.5,
            micro_doppler: 88.0,
        }
    }

    fn sample_update(id: u32) -> TrackUpdate {
        TrackUpdate {
            track_id: id,
            timestamp: 1_700_000_000_000_000,
            status: TrackStatus::Confirmed,
            classification: TrackClassification::DroneRotary,
            range: 1234.5,
            azimuth: 0.75,
            elevation: 0.12,
            range_rate: -4.2,
            x: 900.0,
            y: 800.0,
            z: 150.0,
            vx: 5.0,
            vy: -3.0,
            vz: 0.5,
            quality: 0.87,
            hit_count: 12,
            miss_count: 2,
            age: 14,
        }
    }

    #[test]
    fn test_detection_message_round_trip() {
        let msg = SpDetectionMessage {
            dwell_count: 42,
            timestamp: 1_700_000_000_123_456,
            detections: (0..3).map(sample_detection).collect(),
        };

        let buf = encode_detection_message(&msg);
        assert_eq!(buf.len(), SP_HEADER_SIZE + 3 * DETECTION_SIZE);

        let decoded = decode_detection_message(&buf).unwrap();
        assert_eq!(decoded, msg);

        // Bitwise identity on re-encode
        assert_eq!(encode_detection_message(&decoded), buf);
    }

    #[test]
    fn test_empty_dwell_round_trip() {
        let msg = SpDetectionMessage {
            dwell_count: 7,
            timestamp: 99,
            detections: Vec::new(),
        };
        let buf = encode_detection_message(&msg);
        assert_eq!(buf.len(), SP_HEADER_SIZE);
        assert_eq!(decode_detection_message(&buf).unwrap(), msg);
    }

    #[test]
    fn test_detection_message_rejects_wrong_id() {
        let mut buf = encode_detection_message(&SpDetectionMessage::default());
        buf[0] = 0x99;
        assert!(matches!(
            decode_detection_message(&buf),
            Err(ParseError::UnknownMessageId(_))
        ));
    }

    #[test]
    fn test_detection_message_rejects_truncation() {
        let msg = SpDetectionMessage {
            dwell_count: 1,
            timestamp: 1,
            detections: vec![sample_detection(0)],
        };
        let buf = encode_detection_message(&msg);
        assert!(matches!(
            decode_detection_message(&buf[..buf.len() - 1]),
            Err(ParseError::CountMismatch { .. })
        ));
        assert!(matches!(
            decode_detection_message(&buf[..10]),
            Err(ParseError::TooShort { .. })
        ));
    }

    #[test]
    fn test_track_table_round_trip() {
        let tracks: Vec<TrackUpdate> = (1..4).map(sample_update).collect();
        let ts = 1_700_000_000_999_999;

        let buf = encode_track_table(&tracks, ts);
        assert_eq!(
            buf.len(),
            TRACK_TABLE_HEADER_SIZE + tracks.len() * TRACK_RECORD_SIZE
        );

        let (decoded, decoded_ts) = decode_track_table(&buf).unwrap();
        assert_eq!(decoded_ts, ts);
        assert_eq!(decoded, tracks);
        assert_eq!(encode_track_table(&decoded, decoded_ts), buf);
    }

    #[test]
    fn test_track_record_field_offsets() {
        let mut buf = vec![0u8; TRACK_RECORD_SIZE];
        let t = sample_update(9);
        encode_track_record(&mut buf, 0, &t);

        assert_eq!(get_u32(&buf, 0), MSG_ID_TRACK_UPDATE);
        assert_eq!(get_u32(&buf, 4), 9);
        assert_eq!(get_u32(&buf, 16), TrackStatus::Confirmed as u32);
        assert_eq!(get_u32(&buf, 20), TrackClassification::DroneRotary as u32);
        assert_eq!(get_f64(&buf, 24), 1234.5);
        assert_eq!(get_f64(&buf, 104), 0.87);
        assert_eq!(get_u32(&buf, 120), 14);
        assert_eq!(get_u32(&buf, 124), 0);
    }

    #[test]
    fn test_track_table_rejects_bad_status() {
        let tracks = vec![sample_update(1)];
        let mut buf = encode_track_table(&tracks, 0);
        // Corrupt the status field of the first record
        buf[TRACK_TABLE_HEADER_SIZE + 16] = 0xFF;
        assert!(matches!(
            decode_track_table(&buf),
            Err(ParseError::UnknownTrackStatus(_))
        ));
    }
}
