//! demo - end-to-end synthetic run of the annotation pipeline
//!
//! Feeds a generated clip through a scripted detector that reports a few
//! pedestrians, a duplicate of one of them and an inverted box, so the
//! summary shows suppression and malformed-box handling at work. No model
//! or video codec is needed.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;

use pedestrian_annotator::{
    logging, BoundingBox, Detection, FramePipeline, PipelineConfig, StubBackend,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames.
    #[arg(long, default_value_t = 90)]
    frames: u64,
    /// Synthetic frame width.
    #[arg(long, default_value_t = 640)]
    width: u32,
    /// Synthetic frame height.
    #[arg(long, default_value_t = 360)]
    height: u32,
    /// Synthetic frame rate.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    /// IoU threshold for duplicate suppression.
    #[arg(long, default_value_t = 0.5)]
    iou: f64,
    /// Output target; a file path needs the video-ffmpeg feature.
    #[arg(long, default_value = "stub://demo_out")]
    out: String,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn scripted_detections(width: u32, height: u32) -> Vec<Detection> {
    let w = width as i32;
    let h = height as i32;
    vec![
        Detection::person(BoundingBox::new(w / 10, h / 4, w / 10 + w / 8, h - h / 8), 0.91),
        // Near-duplicate of the first pedestrian.
        Detection::person(
            BoundingBox::new(w / 10 + 4, h / 4 + 3, w / 10 + w / 8 + 2, h - h / 8),
            0.64,
        ),
        Detection::person(BoundingBox::new(w / 2, h / 3, w / 2 + w / 10, h - h / 10), 0.78),
        Detection::person(BoundingBox::new(w - w / 5, h / 5, w - w / 10, h / 2), 0.55),
        // Inverted box, dropped before suppression.
        Detection::person(BoundingBox::new(w / 3, h / 2, w / 4, h / 3), 0.99),
    ]
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init("info", None)?;
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(&args.ui, is_tty, stdout_is_tty);

    let input = format!(
        "stub://demo?frames={}&width={}&height={}&fps={}",
        args.frames, args.width, args.height, args.fps
    );
    let detector =
        StubBackend::new().with_detections(scripted_detections(args.width, args.height));
    let config = PipelineConfig {
        iou_threshold: args.iou,
        ..PipelineConfig::default()
    };
    let mut pipeline = FramePipeline::new(Box::new(detector), config)?;

    let summary = {
        let _stage = ui.stage("Annotate synthetic clip");
        let mut progress = ui.progress();
        pipeline.process_video(&input, &args.out, progress.as_mut())?
    };

    println!("demo: {} -> {}", input, args.out);
    println!("  frames written:       {}", summary.frames_written);
    println!("  malformed dropped:    {}", summary.malformed_dropped);
    println!(
        "  avg detections/frame: {:.2}",
        summary.statistics.avg_detections
    );
    println!(
        "  avg confidence:       {:.2}",
        summary.statistics.avg_confidence
    );
    println!("  throughput:           {:.2} fps", summary.statistics.fps);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
