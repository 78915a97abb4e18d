//! Binary dwell log.
//!
//! Every pipeline stage appends one record to a per-run log file. A record
//! is a packed 20-byte little-endian header followed by a type-specific
//! payload:
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 4    | magic (0xCAFEBABE) |
//! | 4      | 4    | recordType (0–8) |
//! | 8      | 8    | timestamp (µs) |
//! | 16     | 4    | payloadSize |
//!
//! The read side is used by offline tooling and the tests; it validates
//! the magic and hands back header plus raw payload.

use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{error, info};

use kestrel_core::matrix::{StateVector, STATE_DIM};
use kestrel_core::protocol::{
    encode_detection, encode_detection_message, encode_track_record, DETECTION_SIZE,
    TRACK_RECORD_SIZE,
};
use kestrel_core::recorder::DwellRecorder;
use kestrel_core::types::{
    Cluster, Detection, SpDetectionMessage, Timestamp, TrackStatus, TrackUpdate,
};

/// Magic prefix of every log record.
pub const LOG_MAGIC: u32 = 0xCAFE_BABE;
/// Size of the packed record header.
pub const LOG_HEADER_SIZE: usize = 20;

/// Kind of payload carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LogRecordType {
    RawDetection = 0,
    Preprocessed = 1,
    Clustered = 2,
    Predicted = 3,
    Associated = 4,
    TrackInitiated = 5,
    TrackUpdated = 6,
    TrackDeleted = 7,
    TrackSent = 8,
}

impl TryFrom<u32> for LogRecordType {
    type Error = io::Error;

    fn try_from(v: u32) -> io::Result<Self> {
        match v {
            0 => Ok(LogRecordType::RawDetection),
            1 => Ok(LogRecordType::Preprocessed),
            2 => Ok(LogRecordType::Clustered),
            3 => Ok(LogRecordType::Predicted),
            4 => Ok(LogRecordType::Associated),
            5 => Ok(LogRecordType::TrackInitiated),
            6 => Ok(LogRecordType::TrackUpdated),
            7 => Ok(LogRecordType::TrackDeleted),
            8 => Ok(LogRecordType::TrackSent),
            other => Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("unknown log record type {other}"),
            )),
        }
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecordHeader {
    pub record_type: LogRecordType,
    pub timestamp: Timestamp,
    pub payload_size: u32,
}

/// Reads the next record, `Ok(None)` at a clean end of file.
pub fn read_record<R: Read>(reader: &mut R) -> io::Result<Option<(LogRecordHeader, Vec<u8>)>> {
    let mut hdr = [0u8; LOG_HEADER_SIZE];
    match reader.read_exact(&mut hdr) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let magic = u32::from_le_bytes(hdr[0..4].try_into().unwrap());
    if magic != LOG_MAGIC {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("bad log record magic {magic:#010X}"),
        ));
    }

    let record_type = LogRecordType::try_from(u32::from_le_bytes(hdr[4..8].try_into().unwrap()))?;
    let timestamp = u64::from_le_bytes(hdr[8..16].try_into().unwrap());
    let payload_size = u32::from_le_bytes(hdr[16..20].try_into().unwrap());

    let mut payload = vec![0u8; payload_size as usize];
    reader.read_exact(&mut payload)?;

    Ok(Some((
        LogRecordHeader {
            record_type,
            timestamp,
            payload_size,
        },
        payload,
    )))
}

/// Appends pipeline records to a timestamped binary log file.
///
/// One recorder exists per process run and is owned by the dwell
/// processor; write errors are logged once per record and never interrupt
/// the pipeline.
pub struct BinaryRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl BinaryRecorder {
    /// Creates the log directory if needed and opens a fresh log file named
    /// `<prefix>_<YYYYmmdd_HHMMSS>.bin`.
    pub fn open(directory: &str, prefix: &str) -> io::Result<Self> {
        create_dir_all(directory)?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = Path::new(directory).join(format!("{prefix}_{stamp}.bin"));
        let file = File::create(&path)?;

        info!("Opened dwell log {}", path.display());
        Ok(BinaryRecorder {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn write_record(&mut self, record_type: LogRecordType, ts: Timestamp, payload: &[u8]) {
        let mut hdr = [0u8; LOG_HEADER_SIZE];
        hdr[0..4].copy_from_slice(&LOG_MAGIC.to_le_bytes());
        hdr[4..8].copy_from_slice(&(record_type as u32).to_le_bytes());
        hdr[8..16].copy_from_slice(&ts.to_le_bytes());
        hdr[16..20].copy_from_slice(&(payload.len() as u32).to_le_bytes());

        if let Err(e) = self
            .writer
            .write_all(&hdr)
            .and_then(|_| self.writer.write_all(payload))
        {
            error!("Dwell log write failed: {e}");
        }
    }
}

fn push_state(buf: &mut Vec<u8>, state: &StateVector) {
    for i in 0..STATE_DIM {
        buf.extend_from_slice(&state[i].to_le_bytes());
    }
}

fn encode_cluster_payload(clusters: &[Cluster]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(clusters.len() as u32).to_le_bytes());
    for c in clusters {
        buf.extend_from_slice(&c.cluster_id.to_le_bytes());
        for v in [
            c.range,
            c.azimuth,
            c.elevation,
            c.strength,
            c.snr,
            c.rcs,
            c.micro_doppler,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&c.num_detections.to_le_bytes());
        for v in [c.cartesian.x, c.cartesian.y, c.cartesian.z] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf.extend_from_slice(&(c.detection_indices.len() as u32).to_le_bytes());
        for idx in &c.detection_indices {
            buf.extend_from_slice(&idx.to_le_bytes());
        }
    }
    buf
}

impl DwellRecorder for BinaryRecorder {
    fn raw_detections(&mut self, ts: Timestamp, msg: &SpDetectionMessage) {
        let payload = encode_detection_message(msg);
        self.write_record(LogRecordType::RawDetection, ts, &payload);
    }

    fn preprocessed(&mut self, ts: Timestamp, detections: &[Detection]) {
        let mut payload = vec![0u8; 4 + detections.len() * DETECTION_SIZE];
        payload[0..4].copy_from_slice(&(detections.len() as u32).to_le_bytes());
        for (i, d) in detections.iter().enumerate() {
            encode_detection(&mut payload, 4 + i * DETECTION_SIZE, d);
        }
        self.write_record(LogRecordType::Preprocessed, ts, &payload);
    }

    fn clustered(&mut self, ts: Timestamp, clusters: &[Cluster]) {
        let payload = encode_cluster_payload(clusters);
        self.write_record(LogRecordType::Clustered, ts, &payload);
    }

    fn predicted(&mut self, ts: Timestamp, track_id: u32, state: &StateVector) {
        let mut payload = Vec::with_capacity(4 + STATE_DIM * 8);
        payload.extend_from_slice(&track_id.to_le_bytes());
        push_state(&mut payload, state);
        self.write_record(LogRecordType::Predicted, ts, &payload);
    }

    fn associated(&mut self, ts: Timestamp, track_id: u32, cluster_id: u32, distance: f64) {
        let mut payload = Vec::with_capacity(16);
        payload.extend_from_slice(&track_id.to_le_bytes());
        payload.extend_from_slice(&cluster_id.to_le_bytes());
        payload.extend_from_slice(&distance.to_le_bytes());
        self.write_record(LogRecordType::Associated, ts, &payload);
    }

    fn track_initiated(&mut self, ts: Timestamp, track_id: u32, state: &StateVector) {
        let mut payload = Vec::with_capacity(4 + STATE_DIM * 8);
        payload.extend_from_slice(&track_id.to_le_bytes());
        push_state(&mut payload, state);
        self.write_record(LogRecordType::TrackInitiated, ts, &payload);
    }

    fn track_updated(
        &mut self,
        ts: Timestamp,
        track_id: u32,
        status: TrackStatus,
        state: &StateVector,
    ) {
        let mut payload = Vec::with_capacity(8 + STATE_DIM * 8);
        payload.extend_from_slice(&track_id.to_le_bytes());
        payload.extend_from_slice(&(status as u32).to_le_bytes());
        push_state(&mut payload, state);
        self.write_record(LogRecordType::TrackUpdated, ts, &payload);
    }

    fn track_deleted(&mut self, ts: Timestamp, track_id: u32) {
        self.write_record(LogRecordType::TrackDeleted, ts, &track_id.to_le_bytes());
    }

    fn track_sent(&mut self, ts: Timestamp, update: &TrackUpdate) {
        let mut payload = vec![0u8; TRACK_RECORD_SIZE];
        encode_track_record(&mut payload, 0, update);
        self.write_record(LogRecordType::TrackSent, ts, &payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use kestrel_core::protocol::decode_track_record;
    use kestrel_core::types::TrackClassification;

    fn read_all(path: &Path) -> Vec<(LogRecordHeader, Vec<u8>)> {
        let data = std::fs::read(path).unwrap();
        let mut cursor = Cursor::new(data);
        let mut records = Vec::new();
        while let Some(rec) = read_record(&mut cursor).unwrap() {
            records.push(rec);
        }
        records
    }

    #[test]
    fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap();

        let mut recorder = BinaryRecorder::open(dir_str, "test").unwrap();

        let mut state = StateVector::zeros();
        state[0] = 1000.0;
        state[1] = 5.0;

        recorder.predicted(111, 7, &state);
        recorder.associated(222, 7, 3, 2.5);
        recorder.track_deleted(333, 7);
        recorder.flush().unwrap();

        let records = read_all(recorder.path());
        assert_eq!(records.len(), 3);

        let (hdr, payload) = &records[0];
        assert_eq!(hdr.record_type, LogRecordType::Predicted);
        assert_eq!(hdr.timestamp, 111);
        assert_eq!(hdr.payload_size as usize, payload.len());
        assert_eq!(payload.len(), 4 + 9 * 8);
        assert_eq!(u32::from_le_bytes(payload[0..4].try_into().unwrap()), 7);
        assert_eq!(
            f64::from_le_bytes(payload[4..12].try_into().unwrap()),
            1000.0
        );

        let (hdr, payload) = &records[1];
        assert_eq!(hdr.record_type, LogRecordType::Associated);
        assert_eq!(f64::from_le_bytes(payload[8..16].try_into().unwrap()), 2.5);

        let (hdr, payload) = &records[2];
        assert_eq!(hdr.record_type, LogRecordType::TrackDeleted);
        assert_eq!(hdr.timestamp, 333);
        assert_eq!(payload.as_slice(), &7u32.to_le_bytes());
    }

    #[test]
    fn test_track_sent_record_decodes() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = BinaryRecorder::open(dir.path().to_str().unwrap(), "test").unwrap();

        let update = TrackUpdate {
            track_id: 42,
            timestamp: 999,
            status: TrackStatus::Coasting,
            classification: TrackClassification::Bird,
            range: 1500.0,
            azimuth: 0.3,
            elevation: 0.05,
            range_rate: -2.0,
            x: 1400.0,
            y: 440.0,
            z: 75.0,
            vx: -1.0,
            vy: -1.5,
            vz: 0.0,
            quality: 0.6,
            hit_count: 9,
            miss_count: 3,
            age: 12,
        };
        recorder.track_sent(999, &update);
        recorder.flush().unwrap();

        let records = read_all(recorder.path());
        assert_eq!(records.len(), 1);
        let (hdr, payload) = &records[0];
        assert_eq!(hdr.record_type, LogRecordType::TrackSent);
        assert_eq!(payload.len(), TRACK_RECORD_SIZE);
        assert_eq!(decode_track_record(payload, 0).unwrap(), update);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut data = vec![0u8; LOG_HEADER_SIZE];
        data[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let mut cursor = Cursor::new(data);
        assert!(read_record(&mut cursor).is_err());
    }

    #[test]
    fn test_empty_file_is_clean_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_record(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_raw_detection_record_carries_full_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = BinaryRecorder::open(dir.path().to_str().unwrap(), "test").unwrap();

        let msg = SpDetectionMessage {
            dwell_count: 5,
            timestamp: 777,
            detections: vec![Detection {
                range: 1000.0,
                ..Detection::default()
            }],
        };
        recorder.raw_detections(777, &msg);
        recorder.flush().unwrap();

        let records = read_all(recorder.path());
        let (hdr, payload) = &records[0];
        assert_eq!(hdr.record_type, LogRecordType::RawDetection);

        let decoded = kestrel_core::protocol::decode_detection_message(payload).unwrap();
        assert_eq!(decoded, msg);
    }
}
