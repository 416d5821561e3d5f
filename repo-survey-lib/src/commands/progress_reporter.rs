use crate::scan::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;

type ProgressCallback = Box<dyn Fn() -> (u64, u64, String) + Send + Sync>;

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL_MS: u64 = 100;

const DETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {msg}";
const DETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {msg}";

/// A progress bar that stays hidden until a delay has passed.
///
/// Short runs finish without ever drawing; long ones show a bar on stderr fed by the
/// callback given to [`Progress::set_determinate`].
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    visible_after: Instant,
    visible: Arc<AtomicBool>,
    message_callback: Arc<Mutex<ProgressCallback>>,
    refresh_task: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// When `use_colors` is false, progress bar chrome is rendered without ANSI styling.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();
        let visible_after = Instant::now() + delay;
        let visible = Arc::new(AtomicBool::new(false));
        let message_callback = Arc::new(Mutex::new(Box::new(|| (0u64, 0u64, String::new())) as ProgressCallback));

        Self {
            refresh_task: Arc::new(tokio::spawn(refresh_task(
                bar.clone(),
                visible_after,
                Arc::clone(&visible),
                Arc::clone(&message_callback),
            ))),
            bar,
            visible_after,
            visible,
            message_callback,
            use_colors,
        }
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
    }

    fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {
        *self.message_callback.lock().expect("lock poisoned") = callback;
        self.bar.set_length(0);
        self.bar.set_position(0);
        let template = if self.use_colors { DETERMINATE_TEMPLATE } else { DETERMINATE_TEMPLATE_NO_COLOR };
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .expect("could not create progress bar style")
                .progress_chars("=> "),
        );
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("visible_after", &self.visible_after)
            .field("visible", &self.visible)
            .field("message_callback", &"<callback>")
            .field("refresh_task", &"<task>")
            .field("use_colors", &self.use_colors)
            .finish()
    }
}

/// Background refresh task that periodically updates the progress bar.
async fn refresh_task(bar: ProgressBar, visible_after: Instant, visible: Arc<AtomicBool>, callback: Arc<Mutex<ProgressCallback>>) {
    let mut interval = tokio::time::interval(Duration::from_millis(REFRESH_INTERVAL_MS));
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !visible.load(Ordering::Relaxed) && Instant::now() >= visible_after {
            visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        if visible.load(Ordering::Relaxed) {
            let (length, position, message) = {
                let callback_guard = callback.lock().expect("lock poisoned");
                callback_guard()
            };

            if length > 0 {
                bar.set_length(length);
                bar.set_position(position);
            }
            bar.set_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_reporter_accepts_updates() {
        let reporter = ProgressReporter::new(Duration::from_hours(1), false);
        reporter.set_phase("Classifying");
        reporter.set_determinate(Box::new(|| (10, 3, "3/10 repositories".to_string())));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!reporter.visible.load(Ordering::Relaxed));

        reporter.done();
        assert!(format!("{reporter:?}").contains("ProgressReporter"));
    }
}
