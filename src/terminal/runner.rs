//! Command runner - starts configured commands and streams their output
//!
//! Uses tokio::task::spawn_blocking for PTY reads to avoid
//! blocking the async runtime.

use super::pty::TerminalSession;
use crate::commands::Launch;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Command session event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Started { session: u64, label: String },
    Output { session: u64, line: String },
    Exited { session: u64, exit_code: i32 },
    Failed { session: u64, error: String },
}

/// Runs configured commands in their own terminal sessions
pub struct CommandRunner {
    sessions: Arc<Mutex<HashMap<u64, TerminalSession>>>,
    next_id: AtomicU64,
    event_tx: mpsc::UnboundedSender<CommandEvent>,
}

impl CommandRunner {
    /// Create a new runner and the receiver for its events
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CommandEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                sessions: Arc::new(Mutex::new(HashMap::new())),
                next_id: AtomicU64::new(1),
                event_tx: tx,
            },
            rx,
        )
    }

    /// Start a command in a new terminal session, returning its id
    pub fn start(&self, launch: &Launch) -> Result<u64> {
        let session_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = TerminalSession::spawn(launch)?;

        self.lock_sessions().insert(session_id, session.clone());
        let _ = self.event_tx.send(CommandEvent::Started {
            session: session_id,
            label: launch.label.clone(),
        });

        let event_tx = self.event_tx.clone();
        let sessions = self.sessions.clone();

        tokio::spawn(async move {
            loop {
                let reader = session.clone();
                let line_result =
                    tokio::task::spawn_blocking(move || reader.read_line_blocking()).await;

                match line_result {
                    Ok(Ok(Some(line))) => {
                        let _ = event_tx.send(CommandEvent::Output {
                            session: session_id,
                            line,
                        });
                    }
                    Ok(Ok(None)) => {
                        let waiter = session.clone();
                        let exit = tokio::task::spawn_blocking(move || waiter.wait()).await;
                        let event = match exit {
                            Ok(Ok(exit_code)) => {
                                log::info!("Command {} exited ({})", session.label, exit_code);
                                CommandEvent::Exited {
                                    session: session_id,
                                    exit_code,
                                }
                            }
                            Ok(Err(e)) => CommandEvent::Failed {
                                session: session_id,
                                error: e.to_string(),
                            },
                            Err(e) => CommandEvent::Failed {
                                session: session_id,
                                error: format!("Internal error: {}", e),
                            },
                        };
                        let _ = event_tx.send(event);
                        break;
                    }
                    Ok(Err(e)) => {
                        log::error!("Command {} read error: {}", session.label, e);
                        let _ = event_tx.send(CommandEvent::Failed {
                            session: session_id,
                            error: e.to_string(),
                        });
                        break;
                    }
                    Err(e) => {
                        log::error!("Command {} spawn_blocking error: {}", session.label, e);
                        let _ = event_tx.send(CommandEvent::Failed {
                            session: session_id,
                            error: format!("Internal error: {}", e),
                        });
                        break;
                    }
                }
            }

            sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&session_id);
        });

        Ok(session_id)
    }

    /// Kill every running session
    pub fn stop_all(&self) {
        for (id, session) in self.lock_sessions().iter() {
            if let Err(e) = session.kill() {
                log::warn!("Failed to kill command session {}: {}", id, e);
            }
        }
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<u64, TerminalSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
