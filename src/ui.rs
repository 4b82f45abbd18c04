//! Stderr feedback shared by the binaries: stage spinners and a frame bar on
//! a terminal, plain lines and log records everywhere else.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use pedestrian_annotator::frame::VideoMetadata;
use pedestrian_annotator::pipeline::{LogProgress, Progress, ProgressObserver};
use pedestrian_annotator::stats::StatisticsSnapshot;

const TICK: Duration = Duration::from_millis(120);

#[derive(Clone, Copy, Debug)]
pub struct Ui {
    animated: bool,
}

impl Ui {
    /// `mode` is the `--ui` flag: `plain`, `pretty` or `auto`. Anything but a
    /// terminal on stderr is plain. `auto` also stays plain when stdout is
    /// redirected, so piped reports are not interleaved with redraws.
    pub fn from_args(mode: &str, stderr_is_tty: bool, stdout_is_tty: bool) -> Self {
        let animated = stderr_is_tty
            && match mode {
                "plain" => false,
                "pretty" => true,
                _ => stdout_is_tty,
            };
        Self { animated }
    }

    pub fn stage(&self, name: &str) -> Stage {
        let spinner = if self.animated {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(TICK);
            spinner.set_message(format!("{name}…"));
            Some(spinner)
        } else {
            eprintln!("==> {name}");
            None
        };
        Stage {
            name: name.to_string(),
            started: Instant::now(),
            spinner,
        }
    }

    /// Progress bar on a terminal, log lines otherwise.
    pub fn progress(&self) -> Box<dyn ProgressObserver> {
        if self.animated {
            Box::new(FrameBar::default())
        } else {
            Box::new(LogProgress)
        }
    }
}

/// Reports how long a stage took when dropped.
pub struct Stage {
    name: String,
    started: Instant,
    spinner: Option<ProgressBar>,
}

impl Drop for Stage {
    fn drop(&mut self) {
        let done = format!("✔ {} ({})", self.name, elapsed_label(self.started.elapsed()));
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(done),
            None => eprintln!("{done}"),
        }
    }
}

/// Frame counter bar. Becomes an open-ended spinner when the container does
/// not claim a frame count.
#[derive(Default)]
struct FrameBar {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for FrameBar {
    fn on_start(&mut self, metadata: &VideoMetadata) {
        let (bar, template) = if metadata.claimed_frames > 0 {
            (
                ProgressBar::new(metadata.claimed_frames),
                "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} frames ({percent}%) {msg}",
            )
        } else {
            (
                ProgressBar::new_spinner(),
                "{spinner} [{elapsed_precise}] {pos} frames {msg}",
            )
        };
        bar.set_style(
            ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.enable_steady_tick(TICK);
        bar.set_message(format!(
            "{}x{} @ {:.2}fps",
            metadata.width, metadata.height, metadata.fps
        ));
        self.bar = Some(bar);
    }

    fn on_progress(&mut self, progress: &Progress) {
        let Some(bar) = &self.bar else {
            return;
        };
        // Claimed totals can be short; grow the bar instead of overflowing it.
        if bar.length().is_some_and(|len| progress.frames_processed > len) {
            bar.set_length(progress.frames_processed);
        }
        bar.set_position(progress.frames_processed);
    }

    fn on_finish(&mut self, statistics: &StatisticsSnapshot) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(statistics.total_frames);
            bar.finish_with_message(format!("{:.2} fps", statistics.fps));
        }
    }
}

fn elapsed_label(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_needs_a_terminal_on_stderr() {
        assert!(!Ui::from_args("pretty", false, true).animated);
        assert!(Ui::from_args("pretty", true, false).animated);
        assert!(!Ui::from_args("plain", true, true).animated);
        assert!(Ui::from_args("auto", true, true).animated);
        assert!(!Ui::from_args("auto", true, false).animated);
    }

    #[test]
    fn elapsed_switches_to_seconds_at_one_second() {
        assert_eq!(elapsed_label(Duration::from_millis(999)), "999ms");
        assert_eq!(elapsed_label(Duration::from_millis(1500)), "1.50s");
    }
}
