//! Surface Sync gateway
//!
//! Connects a MIDI control surface and an OSC host: inbound controls go
//! through the shift-layer router and out as OSC, inbound OSC model updates
//! are diffed onto the surface's screen and pad LEDs.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surface_sync::config::AppConfig;
use surface_sync::display::PropertyDisplay;
use surface_sync::model::ModelUpdate;
use surface_sync::osc::{spawn_listener, OscClient, OscEncoder, OscWriter};
use surface_sync::pads::PadGrid;
use surface_sync::router::{
    ControlEvent, ControlId, EventKind, InputRouter, LayerState, RouterConfig,
};
use surface_sync::scheduler::{ResyncScheduler, ResyncSchedulerHandle};
use surface_sync::transport::{self, MidiSink};

/// Surface Sync - differential state sync for MIDI control surfaces and OSC hosts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        return transport::print_ports();
    }

    info!("Starting Surface Sync v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await?;
    info!("Configuration loaded successfully");

    run_app(config, shutdown_signal()).await?;

    info!("Surface Sync shutdown complete");
    Ok(())
}

/// Forwards control events to the OSC host
#[derive(Clone)]
struct OscForwarder {
    osc: Arc<OscWriter>,
    client: Option<Arc<OscClient>>,
}

impl OscForwarder {
    fn send(&self, address: &str, event: &ControlEvent) {
        let value = match event.kind {
            EventKind::Release => 0,
            EventKind::Press | EventKind::Change => i32::from(event.value),
        };
        match &self.client {
            Some(client) => {
                // Failures are already reported by the writer
                if let Err(e) = self.osc.fast_send(address, &[value], client.as_ref()) {
                    debug!("{} not delivered: {}", address, e);
                }
            }
            None => trace!("OSC disabled, dropping {} {}", address, value),
        }
    }
}

/// Writers plus the transports they flush to
struct Surfaces {
    display: PropertyDisplay,
    pads: PadGrid,
    osc: Arc<OscWriter>,
    display_sink: MidiSink,
    pad_sink: MidiSink,
    osc_client: Option<Arc<OscClient>>,
}

impl Surfaces {
    /// Transmit whatever is queued; failures were reported by the writers
    fn flush(&self) {
        let _ = self.display.flush(&self.display_sink);
        let _ = self.pads.flush(&self.pad_sink);
        if let Some(client) = &self.osc_client {
            let _ = self.osc.flush(client.as_ref());
        }
    }

    /// Mirror shift and view to the host
    fn publish_layer(&self, layer: &LayerState<String>) {
        self.osc.send_bool("/shift", layer.is_shifted(), false);
        self.osc.send_str("/view", layer.active_view(), false);
    }

    fn shutdown(&mut self, host_name: &str) {
        self.pads.fill(0);
        let _ = self.pads.flush(&self.pad_sink);
        if let Err(e) = self.display.shutdown(host_name, &self.display_sink) {
            error!("Display shutdown sequence failed: {}", e);
        }
    }
}

fn build_router(
    config: &AppConfig,
    scheduler: ResyncSchedulerHandle,
    forwarder: &OscForwarder,
) -> InputRouter<String> {
    let router_config = RouterConfig {
        control_channel: config.control_channel(),
        shift_note: config.device.shift_note,
        pad_notes: config.pad_notes(),
        resync_delay: config.resync_delay(),
        shift_view: config.router.shift_view.clone(),
    };
    let mut router = InputRouter::new(
        router_config,
        config.router.initial_view.clone(),
        Arc::new(scheduler),
    );

    for binding in &config.router.bindings {
        let Some(control) = binding.control() else {
            continue;
        };
        let forwarder = forwarder.clone();
        let address = binding.address.clone();
        let select_view = binding.select_view.clone();

        router.bind(
            binding.view.clone(),
            control,
            move |layer: &mut LayerState<String>, event: &ControlEvent| {
                if let (Some(view), EventKind::Press) = (&select_view, event.kind) {
                    layer.set_active_view(view.clone());
                }
                if !address.is_empty() {
                    forwarder.send(&address, event);
                }
            },
        );
    }

    for view in &config.router.views {
        let forwarder = forwarder.clone();
        router.bind_pads(
            view.clone(),
            move |_: &mut LayerState<String>, event: &ControlEvent| {
                if let ControlId::Note(note) = event.control {
                    forwarder.send(&format!("/pad/{}", note), event);
                }
            },
        );
    }

    info!(
        "Router initialized: {} views, {} bindings",
        config.router.views.len(),
        config.router.bindings.len()
    );
    router
}

async fn run_app(config: AppConfig, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    info!("Starting main application loop...");

    // MIDI
    let pad_sink = MidiSink::open(&config.midi.output_port)?;
    let display_sink = match &config.midi.display_port {
        Some(port) => MidiSink::open(port)?,
        None => pad_sink.clone(),
    };
    let (event_tx, mut event_rx) = mpsc::channel(1000);
    let _input = transport::open_input(&config.midi.input_port, event_tx)?;

    // OSC
    let osc = Arc::new(OscWriter::new(
        OscEncoder::new(config.heartbeat_filter()),
        config.osc.log_output,
    ));
    let (model_tx, mut model_rx) = mpsc::channel::<ModelUpdate>(1000);
    let osc_client = if config.osc.enabled {
        let client = Arc::new(OscClient::bind(config.osc_target()?).await?);
        spawn_listener(config.osc_listen_addr(), model_tx.clone()).await?;
        Some(client)
    } else {
        info!("OSC disabled");
        None
    };

    let (scheduler, mut due_rx) = ResyncScheduler::spawn();
    let forwarder = OscForwarder {
        osc: osc.clone(),
        client: osc_client.clone(),
    };
    let mut router = build_router(&config, scheduler, &forwarder);

    let mut surfaces = Surfaces {
        display: PropertyDisplay::new(config.geometry()),
        pads: PadGrid::new(config.pad_notes()),
        osc,
        display_sink,
        pad_sink,
        osc_client,
    };

    // Initial full sync: layout first, then every cell
    surfaces.display.set_layout(config.display.layout);
    if let Err(e) = surfaces.display.resync(&surfaces.display_sink) {
        error!("Initial display sync failed: {}", e);
    }
    surfaces.publish_layer(router.layer());
    surfaces.flush();

    let mut flush_timer = tokio::time::interval(config.flush_interval());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                trace!("Received MIDI event: raw={:02X?}", event.raw);
                // Routing errors are logged by the router
                if let Ok(outcome) = router.process(&event.raw) {
                    trace!("Routed: {:?}", outcome);
                }
                surfaces.publish_layer(router.layer());
                surfaces.flush();
            }

            Some(update) = model_rx.recv() => {
                trace!("Model update: {:?}", update);
                update.apply(&mut surfaces.display, &surfaces.pads);
            }

            Some(target) = due_rx.recv() => {
                surfaces.pads.apply(target);
                let _ = surfaces.pads.flush(&surfaces.pad_sink);
            }

            _ = flush_timer.tick() => {
                surfaces.flush();
            }

            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    surfaces.shutdown(&config.device.host_name);
    drop(model_tx);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
