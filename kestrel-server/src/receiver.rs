//! UDP ingress: receives signal-processor dwell messages.

use log::{debug, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use kestrel_core::config::NetworkConfig;
use kestrel_core::protocol::decode_detection_message;
use kestrel_core::types::SpDetectionMessage;

use crate::error::ServerError;

/// Receives dwell datagrams and feeds them to the processor in arrival
/// order through an unbounded channel.
///
/// Malformed datagrams and unknown message ids are warned about and
/// dropped; the pipeline never sees them.
pub struct DetectionReceiver {
    socket: UdpSocket,
    tx: mpsc::UnboundedSender<SpDetectionMessage>,
    buffer_size: usize,
    messages: u64,
    detections: u64,
}

impl DetectionReceiver {
    /// Binds the ingress socket. A bind failure is fatal at startup.
    pub async fn bind(
        cfg: &NetworkConfig,
        tx: mpsc::UnboundedSender<SpDetectionMessage>,
    ) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", cfg.receiver_ip, cfg.receiver_port);
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!("Detection receiver listening on {addr}");
        Ok(DetectionReceiver {
            socket,
            tx,
            buffer_size: cfg.receive_buffer_size,
            messages: 0,
            detections: 0,
        })
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        let mut buf = vec![0u8; self.buffer_size];

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    info!(
                        "Detection receiver stopping: {} messages, {} detections",
                        self.messages, self.detections
                    );
                    return Ok(());
                }
                result = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = result?;
                    self.handle_datagram(&buf[..len], &peer.to_string());
                }
            }
        }
    }

    fn handle_datagram(&mut self, data: &[u8], peer: &str) {
        let msg = match decode_detection_message(data) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Discarding datagram from {peer} ({} bytes): {e}", data.len());
                return;
            }
        };

        self.messages += 1;
        self.detections += msg.detections.len() as u64;

        debug!(
            "Dwell {}: {} detections from {peer}",
            msg.dwell_count,
            msg.detections.len()
        );

        // The processor hanging up means the process is shutting down
        if self.tx.send(msg).is_err() {
            warn!("Dwell queue closed, dropping message from {peer}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::protocol::encode_detection_message;
    use kestrel_core::types::Detection;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cfg = NetworkConfig {
            receiver_ip: "127.0.0.1".to_string(),
            receiver_port: 0,
            ..NetworkConfig::default()
        };
        assert!(DetectionReceiver::bind(&cfg, tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_valid_datagram_is_queued() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cfg = NetworkConfig {
            receiver_ip: "127.0.0.1".to_string(),
            receiver_port: 0,
            ..NetworkConfig::default()
        };
        let mut receiver = DetectionReceiver::bind(&cfg, tx).await.unwrap();

        let msg = SpDetectionMessage {
            dwell_count: 3,
            timestamp: 123,
            detections: vec![Detection {
                range: 1000.0,
                ..Detection::default()
            }],
        };
        receiver.handle_datagram(&encode_detection_message(&msg), "test");

        assert_eq!(rx.try_recv().unwrap(), msg);
        assert_eq!(receiver.messages, 1);
        assert_eq!(receiver.detections, 1);
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cfg = NetworkConfig {
            receiver_ip: "127.0.0.1".to_string(),
            receiver_port: 0,
            ..NetworkConfig::default()
        };
        let mut receiver = DetectionReceiver::bind(&cfg, tx).await.unwrap();

        receiver.handle_datagram(&[0xFF; 8], "test");
        assert!(rx.try_recv().is_err());
        assert_eq!(receiver.messages, 0);
    }
}
