//! Progress bar fed from the controller's snapshot channel.

use std::time::Duration;

use deckgen_core::task::{TaskSnapshot, TaskState};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Spawns the progress bar when requested.
///
/// The bar follows the running episode and clears itself once the episode
/// ends. Returns `None` when disabled.
pub(crate) fn spawn_progress_view(
    enabled: bool,
    updates: watch::Receiver<TaskSnapshot>,
) -> Option<JoinHandle<()>> {
    if !enabled {
        return None;
    }
    Some(tokio::spawn(render(ProgressBar::new(100), updates)))
}

async fn render(bar: ProgressBar, mut updates: watch::Receiver<TaskSnapshot>) {
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    loop {
        let running = {
            let snapshot = updates.borrow_and_update();
            bar.set_position(u64::from(snapshot.progress.percent()));
            bar.set_message(snapshot.phase.label());
            matches!(snapshot.state, TaskState::Running(_))
        };
        if !running || updates.changed().await.is_err() {
            break;
        }
    }

    bar.finish_and_clear();
}
