//! Event loop binding the session orchestrator to the TUI frontend.
//!
//! Drives:
//! - [`mafia_client::orchestrator::SessionOrchestrator`]: state, store calls, timers
//! - [`crate::tui::Tui`]: terminal rendering and key mapping

use std::sync::Arc;

use crate::tui::{Tui, UserIntent};
use mafia_client::orchestrator::{PollResult, SessionOrchestrator};
use mafia_client::store::SessionStore;

/// Run the app against `store` until the user quits.
pub async fn start_client<S: SessionStore>(store: Arc<S>) -> Result<(), Box<dyn std::error::Error>> {
    let mut orch = SessionOrchestrator::new(store);

    let mut tui = Tui::setup()?;
    let result = run_event_loop(&mut tui, &mut orch).await;
    tui.teardown()?;
    result
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

async fn run_event_loop<S: SessionStore>(
    tui: &mut Tui,
    orch: &mut SessionOrchestrator<S>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tui.render(orch.state())?;

        let timeout = tokio::time::Duration::from_millis(50);

        tokio::select! {
            poll = orch.recv() => {
                if poll == PollResult::Updated {
                    tui.on_state_changed(orch.state());
                }
            }

            _ = tokio::time::sleep(timeout) => {
                match tui.poll_and_handle_input(orch.state())? {
                    UserIntent::Quit => break,
                    UserIntent::Send(intent) => {
                        orch.dispatch(intent);
                        tui.on_state_changed(orch.state());
                    }
                    UserIntent::None => {}
                }
            }
        }
    }

    tracing::info!("quit");
    Ok(())
}
