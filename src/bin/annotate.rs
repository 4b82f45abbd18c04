//! annotate - Detect pedestrians in a video file and write an annotated copy.
//!
//! Every frame is run through the person detector, overlapping boxes are
//! suppressed and the survivors are drawn with their confidence. The output
//! keeps the input's resolution and frame rate.
//!
//! Settings come from defaults, then the TOML file (`--config` or
//! `PEDESTRIAN_CONFIG`), then `PEDESTRIAN_*` variables, then flags.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use pedestrian_annotator::{
    build_detector, logging, AnnotationRenderer, AppConfig, FramePipeline, RunSummary,
    SnapshotPreview, Termination,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect and annotate pedestrians in video files")]
struct Args {
    /// Input video (.mp4, .avi, .mov, .mkv, .flv, .wmv, .webm)
    #[arg(long, value_name = "PATH")]
    input: String,

    /// Annotated output video
    #[arg(long, value_name = "PATH", default_value = "output/detected_video.mp4")]
    output: String,

    /// TOML settings file (overrides PEDESTRIAN_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model name (yolo11n..yolo11x, yolov8n..yolov8x) or path to an ONNX file
    #[arg(long)]
    model: Option<String>,

    /// Detector backend (tract|stub)
    #[arg(long)]
    backend: Option<String>,

    /// Confidence threshold (0.0-1.0)
    #[arg(long)]
    confidence: Option<f32>,

    /// Inference device
    #[arg(long)]
    device: Option<String>,

    /// Directory holding <model>.onnx files
    #[arg(long, value_name = "DIR")]
    models_dir: Option<PathBuf>,

    /// IoU above which overlapping boxes are merged (0.0-1.0)
    #[arg(long)]
    iou: Option<f64>,

    /// Keep a JPEG snapshot of the latest annotated frame
    #[arg(long)]
    display: bool,

    /// Snapshot file used with --display
    #[arg(long, value_name = "PATH", default_value = "output/preview.jpg")]
    preview_path: PathBuf,

    /// Write the final statistics as JSON
    #[arg(long, value_name = "PATH")]
    stats_json: Option<PathBuf>,

    /// Log filter (overrides config; RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,

    /// Append debug-level logs to this file as well
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::load()?,
    };
    apply_args(&mut cfg, &args);
    logging::init(&cfg.log_level, cfg.log_file.as_deref())?;
    cfg.validate()?;

    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(&args.ui, is_tty, stdout_is_tty);

    let model_info = cfg.detector.model_info();
    let detector = {
        let _stage = ui.stage(&format!("Load model {}", model_info.model));
        build_detector(&cfg.detector)?
    };
    log::info!("detector ready: {}", model_info);
    println!("Model: {}", model_info);

    let mut pipeline = FramePipeline::new(detector, cfg.pipeline.clone())?
        .with_renderer(AnnotationRenderer::new(cfg.render));
    if cfg.pipeline.display {
        pipeline = pipeline.with_preview(Box::new(SnapshotPreview::new(
            &args.preview_path,
            cfg.pipeline.progress_interval,
        )));
    }

    let abort = pipeline.abort_handle();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, stopping after the current frame");
        abort.abort();
    })
    .context("failed to install Ctrl-C handler")?;

    println!("Processing video: {}", args.input);
    let mut progress = ui.progress();
    let summary = pipeline.process_video(&args.input, &args.output, progress.as_mut())?;

    match summary.termination {
        Termination::Aborted => println!(
            "Processing interrupted; partial result saved to: {}",
            args.output
        ),
        _ => println!("Processing complete! Result saved to: {}", args.output),
    }
    print_statistics(&summary);

    if let Some(path) = &args.stats_json {
        write_stats_json(path, &summary)?;
        println!("Statistics written to: {}", path.display());
    }
    Ok(())
}

fn apply_args(cfg: &mut AppConfig, args: &Args) {
    if let Some(model) = &args.model {
        cfg.detector.model = model.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.detector.backend = backend.clone();
    }
    if let Some(confidence) = args.confidence {
        cfg.detector.confidence_threshold = confidence;
    }
    if let Some(device) = &args.device {
        cfg.detector.device = device.clone();
    }
    if let Some(dir) = &args.models_dir {
        cfg.detector.models_dir = dir.clone();
    }
    if let Some(iou) = args.iou {
        cfg.pipeline.iou_threshold = iou;
    }
    if args.display {
        cfg.pipeline.display = true;
    }
    if let Some(level) = &args.log_level {
        cfg.log_level = level.clone();
    }
    if let Some(path) = &args.log_file {
        cfg.log_file = Some(path.clone());
    }
}

fn print_statistics(summary: &RunSummary) {
    let stats = &summary.statistics;
    println!();
    println!("=== Detection statistics ===");
    println!("Total frames processed: {}", stats.total_frames);
    println!("Average detections per frame: {:.2}", stats.avg_detections);
    println!("Average confidence: {:.2}", stats.avg_confidence);
    println!("Processing speed (FPS): {:.2}", stats.fps);
    if summary.malformed_dropped > 0 {
        println!("Malformed boxes dropped: {}", summary.malformed_dropped);
    }
}

fn write_stats_json(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
