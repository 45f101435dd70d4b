//! One generation run: settings, submission, progress, save.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use deckgen_core::artifact::DirectorySaveTarget;
use deckgen_core::executor::HttpExecutor;
use deckgen_core::request::GenerationRequest;
use deckgen_core::task::{TaskController, TaskState};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{config, exit_handler, progress_view, terminal};
use crate::cli::Args;

pub(crate) async fn run(args: Args) -> Result<ProcessExit> {
    let file_config = config::load_config(args.config.as_deref())?;
    let settings = config::resolve_settings(&args, file_config.as_ref(), config::endpoint_from_env());

    let use_progress_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        settings.quiet,
        args.no_progress,
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(
        terminal::resolve_default_log_level(settings.quiet, settings.verbose, use_progress_bar),
        terminal::no_color_env_requested(),
    );
    debug!(?args, "CLI arguments parsed");

    let mut request = GenerationRequest::new(settings.topic.clone());
    if let Some(tone) = &settings.tone {
        request = request.with_tone(tone.clone());
    }
    if let Some(slides) = settings.slides {
        request = request.with_slide_count(slides);
    }
    if let Err(error) = request.validate() {
        eprintln!("Error: {error}");
        return Ok(ProcessExit::Usage);
    }

    let executor = HttpExecutor::with_timeouts(
        &settings.endpoint,
        settings.connect_timeout_secs,
        settings.request_timeout_secs,
    )
    .with_context(|| format!("Cannot use generation endpoint '{}'", settings.endpoint))?;
    let save_target = DirectorySaveTarget::new(
        executor.client().clone(),
        executor.endpoint().clone(),
        settings.output_dir.clone(),
    );
    info!(endpoint = %executor.endpoint(), "Deckgen starting");

    let controller = TaskController::with_settings(Arc::new(executor), settings.simulator);
    let id = match controller.submit(request) {
        Ok(id) => id,
        Err(error) => {
            eprintln!("Error: {error}");
            return Ok(ProcessExit::Usage);
        }
    };
    let view = progress_view::spawn_progress_view(use_progress_bar, controller.subscribe());

    let snapshot = tokio::select! {
        snapshot = controller.wait_for_terminal(id) => snapshot,
        _ = tokio::signal::ctrl_c() => {
            warn!(request_id = %id, "Interrupted; cancelling generation");
            controller.cancel(id);
            controller.snapshot()
        }
    };
    if let Some(view) = view {
        let _ = view.await;
    }

    let saved = match &snapshot.state {
        TaskState::Succeeded(_) => match controller.trigger_download(&save_target).await {
            Ok(saved) => {
                if !settings.quiet {
                    println!("Saved presentation to {}", saved.path.display());
                }
                controller.release_artifact();
                true
            }
            Err(error) => {
                eprintln!("Error: failed to save presentation: {error}");
                false
            }
        },
        TaskState::Failed(message) => {
            eprintln!("Error: {message}");
            false
        }
        TaskState::Idle | TaskState::Running(_) => {
            eprintln!("Generation cancelled.");
            false
        }
    };

    Ok(exit_handler::determine_exit_outcome(&snapshot.state, saved))
}
