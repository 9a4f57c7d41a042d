//! Drives a [`VideoSession`] on a tokio runtime.
//!
//! ```ignore
//! let handle = spawn_session(session);
//! handle.notify_resize();
//! handle.shutdown().await;
//! ```

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::video::VideoSession;
use crate::ar_detector::PlaybackState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Resize,
    Playback(PlaybackState),
    Recheck,
    SourceChanged,
    SetManuallyDisabled(bool),
    Shutdown,
}

/// Owner of a running session task. Dropping it aborts the task.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

/// Spawns the session loop. Must be called inside a tokio runtime.
pub fn spawn_session(session: VideoSession) -> SessionHandle {
    let (commands, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, rx));
    SessionHandle {
        commands,
        task: Some(task),
    }
}

impl SessionHandle {
    /// `false` once the session loop has ended.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn notify_resize(&self) -> bool {
        self.send(SessionCommand::Resize)
    }

    pub fn set_playback_state(&self, playback: PlaybackState) -> bool {
        self.send(SessionCommand::Playback(playback))
    }

    pub fn recheck(&self) -> bool {
        self.send(SessionCommand::Recheck)
    }

    /// Stops the loop and waits until the session has been released.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(mut session: VideoSession, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
    info!("🎬 session loop started");

    loop {
        let delay = session.next_wakeup(Instant::now().into_std());

        tokio::select! {
            command = commands.recv() => {
                let now = Instant::now().into_std();
                match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(SessionCommand::Resize) => session.on_resize(now),
                    Some(SessionCommand::Playback(playback)) => session.set_playback_state(playback),
                    Some(SessionCommand::Recheck) => session.request_recheck(),
                    Some(SessionCommand::SourceChanged) => session.on_source_changed(),
                    Some(SessionCommand::SetManuallyDisabled(disabled)) => {
                        session.set_manually_disabled(disabled)
                    }
                }
            }
            _ = tokio::time::sleep(delay) => {
                if let Some(result) = session.tick(Instant::now().into_std()) {
                    debug!("cycle result {:?}", result);
                }
            }
        }
    }

    session.destroy();
    info!("🗑️ session loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::video::tests::{scope_frame, MockDom, RecordingResizer, ResizerCall};
    use crate::core::settings::DEFAULT_SETTINGS;
    use crate::core::video::MockFrameSource;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(source: MockFrameSource, resizer: RecordingResizer) -> VideoSession {
        VideoSession::new(
            "www.example.com",
            Arc::clone(&DEFAULT_SETTINGS),
            Box::new(MockDom::new(1280.0, 720.0)),
            Box::new(source),
            Box::new(resizer),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_applies_ratio_and_releases_on_shutdown() {
        let source = MockFrameSource::new(Some(scope_frame()));
        let released = source.release_counter();
        let resizer = RecordingResizer::default();

        let handle = spawn_session(session(source, resizer.clone()));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let applied: Vec<_> = resizer
            .take()
            .into_iter()
            .filter(|c| matches!(c, ResizerCall::Apply(_)))
            .collect();
        // the first cycle finds the ratio, later ones report it unchanged
        assert_eq!(applied.len(), 1);

        assert!(handle.notify_resize());
        handle.shutdown().await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_releases_session() {
        let source = MockFrameSource::new(None);
        let released = source.release_counter();

        let handle = spawn_session(session(source, RecordingResizer::default()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        // let the runtime drop the aborted task
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_accepted_while_running() {
        let handle = spawn_session(session(MockFrameSource::new(None), RecordingResizer::default()));
        assert!(handle.set_playback_state(PlaybackState::Paused));
        assert!(handle.recheck());
        assert!(handle.send(SessionCommand::SetManuallyDisabled(true)));
        handle.shutdown().await;
    }
}
