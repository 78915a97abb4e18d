use std::time::Duration;

use clap::Parser;
use log::info;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use kestrel_core::config::TrackerConfig;
use kestrel_core::recorder::{DwellRecorder, NullRecorder};
use kestrel_core::track::TrackManager;

use kestrel_server::processor::DwellProcessor;
use kestrel_server::receiver::DetectionReceiver;
use kestrel_server::recording::BinaryRecorder;
use kestrel_server::sender::TrackSender;
use kestrel_server::{config_log_filter, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let text = std::fs::read_to_string(&args.config)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read configuration '{}'", args.config.display()))?;
    let config = TrackerConfig::from_json(&text)
        .into_diagnostic()
        .wrap_err("invalid configuration document")?;

    // CLI verbosity wins when given; otherwise the config decides
    let cli_filter = args.verbose.log_level_filter();
    let filter = if cli_filter == log::LevelFilter::Info {
        config_log_filter(config.system.log_level)
    } else {
        cli_filter
    };
    env_logger::Builder::new().filter_level(filter).init();

    info!(
        "Kestrel tracker starting (config '{}')",
        args.config.display()
    );

    let recorder: Box<dyn DwellRecorder> = if config.system.log_enabled {
        let rec = BinaryRecorder::open(&config.system.log_directory, "tracker")
            .into_diagnostic()
            .wrap_err("cannot open dwell log")?;
        Box::new(rec)
    } else {
        Box::new(NullRecorder)
    };

    let manager = TrackManager::new(config.clone(), recorder);

    let (dwell_tx, dwell_rx) = mpsc::unbounded_channel();
    let receiver = DetectionReceiver::bind(&config.network, dwell_tx)
        .await
        .into_diagnostic()?;
    let sender = TrackSender::new(&config.network, &config.display)
        .await
        .into_diagnostic()?;
    let processor = DwellProcessor::new(dwell_rx, manager, sender);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Receiver", |subsys| {
            receiver.run(subsys)
        }));
        s.start(SubsystemBuilder::new("Processor", |subsys| {
            processor.run(subsys)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .map_err(|e| miette!("{e}"))?;

    info!("Kestrel tracker exited cleanly");
    Ok(())
}
