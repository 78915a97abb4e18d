//! UDP egress: publishes the track table to the display.

use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::net::UdpSocket;

use kestrel_core::config::{DisplayConfig, NetworkConfig};
use kestrel_core::protocol::encode_track_table;
use kestrel_core::types::{Timestamp, TrackStatus, TrackUpdate};

use crate::error::ServerError;

/// Sends one track table datagram per dwell to the configured destination.
///
/// Send failures are per-message warnings; the pipeline carries on.
pub struct TrackSender {
    socket: UdpSocket,
    destination: SocketAddr,
    send_deleted_tracks: bool,
    messages: u64,
}

impl TrackSender {
    pub async fn new(net: &NetworkConfig, display: &DisplayConfig) -> Result<Self, ServerError> {
        let destination: SocketAddr = format!("{}:{}", net.sender_ip, net.sender_port)
            .parse()
            .map_err(|_| {
                ServerError::Address(format!("{}:{}", net.sender_ip, net.sender_port))
            })?;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| ServerError::Bind {
                addr: "0.0.0.0:0".to_string(),
                source,
            })?;

        info!("Track sender ready, destination {destination}");
        Ok(TrackSender {
            socket,
            destination,
            send_deleted_tracks: display.send_deleted_tracks,
            messages: 0,
        })
    }

    /// Emits one track table datagram. Deleted-status records are filtered
    /// out when the display is configured not to receive them.
    pub async fn send_track_table(&mut self, updates: &[TrackUpdate], ts: Timestamp) {
        let to_send: Vec<TrackUpdate> = updates
            .iter()
            .filter(|u| self.send_deleted_tracks || u.status != TrackStatus::Deleted)
            .copied()
            .collect();

        if to_send.is_empty() {
            return;
        }

        let data = encode_track_table(&to_send, ts);
        match self.socket.send_to(&data, self.destination).await {
            Ok(sent) if sent == data.len() => {
                self.messages += 1;
                debug!("Sent {} track records ({} bytes)", to_send.len(), sent);
            }
            Ok(sent) => {
                warn!(
                    "Track table truncated on send: {} of {} bytes",
                    sent,
                    data.len()
                );
            }
            Err(e) => {
                warn!("Failed to send track table: {e}");
            }
        }
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::protocol::decode_track_table;
    use kestrel_core::types::TrackClassification;

    fn update(id: u32, status: TrackStatus) -> TrackUpdate {
        TrackUpdate {
            track_id: id,
            timestamp: 1,
            status,
            classification: TrackClassification::Unknown,
            range: 1000.0,
            azimuth: 0.0,
            elevation: 0.1,
            range_rate: 0.0,
            x: 995.0,
            y: 0.0,
            z: 99.8,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
            quality: 0.5,
            hit_count: 1,
            miss_count: 0,
            age: 0,
        }
    }

    async fn sender_to(port: u16, send_deleted: bool) -> TrackSender {
        let net = NetworkConfig {
            sender_ip: "127.0.0.1".to_string(),
            sender_port: port,
            ..NetworkConfig::default()
        };
        let display = DisplayConfig {
            send_deleted_tracks: send_deleted,
        };
        TrackSender::new(&net, &display).await.unwrap()
    }

    #[tokio::test]
    async fn test_track_table_reaches_destination() {
        let dest = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = dest.local_addr().unwrap().port();
        let mut sender = sender_to(port, true).await;

        sender
            .send_track_table(&[update(1, TrackStatus::Confirmed)], 42)
            .await;
        assert_eq!(sender.messages_sent(), 1);

        let mut buf = vec![0u8; 65536];
        let (len, _) = dest.recv_from(&mut buf).await.unwrap();
        let (tracks, ts) = decode_track_table(&buf[..len]).unwrap();
        assert_eq!(ts, 42);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 1);
    }

    #[tokio::test]
    async fn test_deleted_tracks_filtered() {
        let dest = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = dest.local_addr().unwrap().port();
        let mut sender = sender_to(port, false).await;

        // All records deleted: nothing goes on the wire
        sender
            .send_track_table(&[update(1, TrackStatus::Deleted)], 1)
            .await;
        assert_eq!(sender.messages_sent(), 0);

        // Mixed: only the live record survives
        sender
            .send_track_table(
                &[
                    update(1, TrackStatus::Deleted),
                    update(2, TrackStatus::Coasting),
                ],
                2,
            )
            .await;
        let mut buf = vec![0u8; 65536];
        let (len, _) = dest.recv_from(&mut buf).await.unwrap();
        let (tracks, _) = decode_track_table(&buf[..len]).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, 2);
    }

    #[tokio::test]
    async fn test_bad_destination_address() {
        let net = NetworkConfig {
            sender_ip: "not an address".to_string(),
            ..NetworkConfig::default()
        };
        let display = DisplayConfig::default();
        assert!(matches!(
            TrackSender::new(&net, &display).await,
            Err(ServerError::Address(_))
        ));
    }
}
