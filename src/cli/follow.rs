//! Render a live session to the terminal until it ends.

use std::error::Error;

use tokio::sync::watch;

use crate::core::stream::{SessionHandle, SessionState, StoreState, StreamStore};

/// Feed every store update to `render` until the session reaches a terminal
/// state. Ctrl+C cancels the session; the store stays as it was.
pub(crate) async fn follow<S: StreamStore>(
    handle: SessionHandle<S>,
    mut updates: watch::Receiver<StoreState<S>>,
    mut render: impl FnMut(&S) -> std::io::Result<()>,
) -> Result<SessionState, Box<dyn Error>> {
    let cancel = handle.canceller();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        let finished = {
            let state = updates.borrow_and_update();
            render(&state.store)?;
            state.session_id() != handle.id() || state.session.is_terminal()
        };
        if finished {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                cancel();
                eprintln!("\n⏹  Stopped");
            }
        }
    }

    Ok(handle.wait().await)
}
