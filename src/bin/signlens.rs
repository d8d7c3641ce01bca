//! signlens - convert sign-language media to text
//!
//! This CLI stands where an upload-handling shell would:
//! 1. Dispatches by file extension (or an explicit --kind) to the image
//!    or video path
//! 2. Builds the detector backend once, from configuration
//! 3. Runs the media aggregator over the file
//! 4. Prints the aggregate result as JSON on stdout
//!
//! Load and file-type errors exit with code 2 (the caller's fault);
//! detector faults exit with code 1.

use anyhow::Result;
use clap::Parser;

use signlens::config::SignlensConfig;
use signlens::{DetectorBackend, MediaAggregator, MediaError, MediaKind, StubBackend};

#[derive(Parser)]
#[command(name = "signlens", version, about = "Sign-language media to text")]
struct Args {
    /// Media file to process.
    path: String,

    /// Override extension-based dispatch.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Process every Nth video frame (default from configuration).
    #[arg(long)]
    frame_step: Option<u64>,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum KindArg {
    Image,
    Video,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{:#}", err);
        let code = match err.downcast_ref::<MediaError>() {
            Some(MediaError::LoadFailed(_)) | Some(MediaError::UnsupportedKind(_)) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let cfg = SignlensConfig::load()?;

    let kind = match args.kind {
        Some(kind) => kind.into(),
        None => MediaKind::from_path(&args.path)?,
    };

    let mut backend = build_backend(&cfg)?;
    backend.warm_up()?;
    log::info!("detector backend: {}", backend.name());

    let frame_step = args.frame_step.unwrap_or(cfg.frame_step);
    let mut aggregator = MediaAggregator::new()
        .with_frame_step(frame_step)
        .with_progress(|current, total| match total {
            Some(total) => log::info!(
                "processing frame {}/{} ({:.2}%)",
                current,
                total,
                current as f64 / total as f64 * 100.0
            ),
            None => log::info!("processing frame {}", current),
        });

    let result = aggregator.process(backend.as_mut(), &args.path, kind)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);
    Ok(())
}

fn build_backend(cfg: &SignlensConfig) -> Result<Box<dyn DetectorBackend>> {
    #[cfg(feature = "backend-tract")]
    if let Some(path) = &cfg.model.path {
        let backend = signlens::TractBackend::new(path, cfg.model.width, cfg.model.height)?
            .with_threshold(cfg.model.confidence_threshold)
            .with_iou_threshold(cfg.model.iou_threshold)
            .with_labels(cfg.model.labels.clone());
        return Ok(Box::new(backend));
    }

    #[cfg(not(feature = "backend-tract"))]
    if cfg.model.path.is_some() {
        return Err(anyhow::anyhow!(
            "a model is configured but this build lacks the backend-tract feature"
        ));
    }

    log::warn!("no model configured; using the stub backend (detects nothing)");
    Ok(Box::new(StubBackend::empty()))
}
