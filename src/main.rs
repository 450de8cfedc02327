//! Still Replace CLI
//!
//! Runs a two-thread demonstration pipeline: a primary source that keeps
//! freezing on a still image, and a replacement source feeding the filter
//! from its own thread.

use clap::Parser;
use std::path::PathBuf;
use std::thread;
use still_replace::{
    config::FileConfig,
    filter::{Caps, Controller, FlowError, FlowResult, FrameSink, StillReplaceFilter, StreamEvent},
    video::{FrameSource, Pattern, PatternSource},
    Frame,
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "still-replace", version, about = "Replace a frozen still in a video stream")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Similarity threshold in dB (0 disables replacement).
    #[arg(short, long)]
    threshold: Option<u32>,

    /// Rows to compare from the top of each frame (0 = all).
    #[arg(long)]
    compare_lines: Option<u32>,

    /// Primary frames to push.
    #[arg(short, long)]
    frames: Option<u32>,

    /// Metrics server port (0 disables; needs the `metrics` feature).
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Log every comparison score.
    #[arg(short, long)]
    verbose: bool,
}

/// Downstream that only counts what reaches it.
#[derive(Debug, Default)]
struct CountingSink {
    frames: u64,
    bytes: u64,
    eos: bool,
}

impl FrameSink for CountingSink {
    fn push(&mut self, frame: Frame) -> FlowResult {
        if self.eos {
            return Err(FlowError::Eos);
        }
        self.frames += 1;
        self.bytes += frame.data().len() as u64;
        Ok(())
    }

    fn event(&mut self, event: &StreamEvent) {
        debug!(?event, "downstream event");
        if *event == StreamEvent::Eos {
            self.eos = true;
        }
    }
}

fn load_config(args: &Args) -> Result<FileConfig, still_replace::config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.filter.threshold = threshold;
    }
    if let Some(lines) = args.compare_lines {
        config.filter.compare_lines = lines;
    }
    if let Some(frames) = args.frames {
        config.source.frame_count = frames;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }
    if args.verbose {
        config.filter.silent = false;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(feature = "metrics")]
fn start_metrics(port: u16, controller: &Controller) {
    use still_replace::metrics::{MetricsRegistry, MetricsServer};

    if port == 0 {
        return;
    }
    let registry = match MetricsRegistry::new() {
        Ok(r) => r,
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            return;
        }
    };
    let server = MetricsServer::new(port, registry).with_controller(controller.clone());
    thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                warn!("Cannot start metrics runtime: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn start_metrics(port: u16, _controller: &Controller) {
    if port != 0 {
        debug!(port, "Built without the metrics feature, exporter disabled");
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Still Replace v{}", still_replace::VERSION);

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let descriptor = match config.source.descriptor() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid source format: {}", e);
            std::process::exit(1);
        }
    };

    let mut filter = match StillReplaceFilter::new(config.filter, CountingSink::default()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Invalid filter settings: {}", e);
            std::process::exit(1);
        }
    };
    let controller = filter.controller();

    {
        let controller = controller.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            warn!("Interrupted, flushing");
            controller.flush();
        }) {
            warn!("Cannot install Ctrl-C handler: {}", e);
        }
    }

    start_metrics(config.output.metrics_port, &controller);

    let caps = Caps::from(&descriptor);

    // Replacement thread
    let replacement = filter.replacement_input();
    replacement.link();
    if let Err(e) = replacement.handle_event(StreamEvent::Caps(caps.clone())) {
        eprintln!("Replacement caps rejected: {}", e);
        std::process::exit(1);
    }
    let replacement_source = PatternSource::new(
        descriptor.clone(),
        Pattern::Solid(config.source.replacement_value),
    )
    .with_fps(config.source.fps);
    let replacement_thread = thread::spawn(move || {
        let mut source = replacement_source;
        loop {
            let frame = match source.next_frame() {
                Ok(f) => f,
                Err(e) => {
                    warn!("Replacement source failed: {}", e);
                    break;
                }
            };
            if let Err(e) = replacement.chain(frame) {
                debug!("Replacement input stopped: {}", e);
                break;
            }
        }
        source.produced()
    });

    // Primary thread (this one)
    if let Err(e) = filter.handle_event(StreamEvent::Caps(caps)) {
        eprintln!("Primary caps rejected: {}", e);
        std::process::exit(1);
    }

    let source_config = &config.source;
    let cycle = (source_config.live_frames + source_config.still_frames).max(1);
    let mut primary = PatternSource::new(descriptor, Pattern::Solid(source_config.still_value))
        .with_fps(source_config.fps)
        .with_limit(u64::from(source_config.frame_count));

    info!(
        frames = source_config.frame_count,
        threshold = config.filter.threshold,
        compare_lines = config.filter.compare_lines,
        "Processing frames..."
    );

    for i in 0..source_config.frame_count {
        let pattern = if i % cycle < source_config.still_frames {
            Pattern::Solid(source_config.still_value)
        } else {
            Pattern::Moving
        };
        primary.set_pattern(pattern);

        let frame = match primary.next_frame() {
            Ok(f) => f,
            Err(e) => {
                warn!("Primary source failed: {}", e);
                break;
            }
        };

        match filter.chain(frame) {
            Ok(()) => {}
            Err(FlowError::Flushing) => {
                warn!("Pipeline flushing, stopping at frame {}", i);
                break;
            }
            Err(e) => {
                error!("Frame {} failed: {}", i, e);
                break;
            }
        }
    }

    if let Err(e) = filter.handle_event(StreamEvent::Eos) {
        warn!("End of stream not handled: {}", e);
    }

    let replacement_frames = replacement_thread.join().unwrap_or_else(|_| {
        error!("Replacement thread panicked");
        0
    });

    let stats = controller.stats();
    let sink = filter.into_sink();
    info!(
        "Processed {} frames: {} replaced, {} without replacement, {} mapping failures",
        stats.frames, stats.replaced, stats.unavailable, stats.mapping_failures
    );
    info!(
        "Replacement input produced {} frames ({} delivered, {} discarded)",
        replacement_frames, stats.delivered, stats.discarded
    );

    println!(
        "forwarded {} frames ({} bytes), replaced {}",
        sink.frames, sink.bytes, stats.replaced
    );
}
