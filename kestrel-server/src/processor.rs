//! The dwell processor: single consumer of the ingress queue.

use log::info;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use kestrel_core::track::TrackManager;
use kestrel_core::types::{now_micros, SpDetectionMessage};

use crate::error::ServerError;
use crate::sender::TrackSender;

/// Drains the dwell FIFO and drives the tracking pipeline, one dwell at a
/// time, in arrival order. This is the only task that touches the track
/// manager; the sender is invoked synchronously after each dwell.
pub struct DwellProcessor {
    rx: mpsc::UnboundedReceiver<SpDetectionMessage>,
    manager: TrackManager,
    sender: TrackSender,
    cycles: u64,
}

impl DwellProcessor {
    pub fn new(
        rx: mpsc::UnboundedReceiver<SpDetectionMessage>,
        manager: TrackManager,
        sender: TrackSender,
    ) -> Self {
        DwellProcessor {
            rx,
            manager,
            sender,
            cycles: 0,
        }
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        info!("Dwell processor started");

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    // Dwells still queued are dropped deliberately
                    self.log_final_stats();
                    return Ok(());
                }
                msg = self.rx.recv() => match msg {
                    Some(msg) => self.process(msg).await,
                    None => {
                        self.log_final_stats();
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn process(&mut self, msg: SpDetectionMessage) {
        let updates = self.manager.process_dwell(&msg);
        let ts = if msg.timestamp > 0 {
            msg.timestamp
        } else {
            now_micros()
        };

        if !updates.is_empty() {
            self.sender.send_track_table(&updates, ts).await;
            for u in &updates {
                self.manager.recorder_mut().track_sent(ts, u);
            }
        }

        self.cycles += 1;
        if self.cycles % 100 == 0 {
            info!(
                "Cycle {}: {} tracks ({} confirmed)",
                self.cycles,
                self.manager.num_active_tracks(),
                self.manager.num_confirmed_tracks()
            );
        }
    }

    fn log_final_stats(&self) {
        info!(
            "Dwell processor stopping: {} dwells, {} active tracks ({} confirmed), \
             {} rejected detections, {} track tables sent",
            self.cycles,
            self.manager.num_active_tracks(),
            self.manager.num_confirmed_tracks(),
            self.manager.rejected_detections(),
            self.sender.messages_sent()
        );
    }
}
