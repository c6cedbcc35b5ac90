//! PTY sessions - run a configured command in its own pseudo-terminal

use crate::commands::Launch;
use anyhow::Result;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{BufRead, BufReader, Read};
use std::sync::{Arc, Mutex, PoisonError};

/// A command running in a PTY
#[derive(Clone)]
pub struct TerminalSession {
    pub label: String,
    reader: Arc<Mutex<Option<BufReader<Box<dyn Read + Send>>>>>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    // Dropping the master closes the terminal
    _master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
}

impl TerminalSession {
    /// Spawn `launch.command` through the user's shell in a new PTY
    pub fn spawn(launch: &Launch) -> Result<Self> {
        log::info!(
            "Spawning terminal {:?} in {}: {}",
            launch.label,
            launch.cwd.display(),
            launch.command
        );

        if launch.command.trim().is_empty() {
            anyhow::bail!("Command {:?} is empty", launch.label);
        }

        let mut cmd = CommandBuilder::new(super::shell());
        cmd.arg("-c");
        cmd.arg(&launch.command);
        cmd.cwd(&launch.cwd);

        let pty_system = native_pty_system();
        let pair = pty_system.openpty(PtySize {
            rows: 24,
            cols: 120,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let child = pair.slave.spawn_command(cmd)?;
        drop(pair.slave);

        let reader = pair.master.try_clone_reader()?;

        Ok(Self {
            label: launch.label.clone(),
            reader: Arc::new(Mutex::new(Some(BufReader::new(reader)))),
            child: Arc::new(Mutex::new(child)),
            _master: Arc::new(Mutex::new(pair.master)),
        })
    }

    /// Read one line, blocking. `Ok(None)` once the process has closed
    /// its side of the terminal.
    pub fn read_line_blocking(&self) -> Result<Option<String>> {
        let mut guard = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(reader) = guard.as_mut() else {
            return Ok(None);
        };

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                *guard = None;
                Ok(None)
            }
            Ok(_) => Ok(Some(super::strip_ansi(line.trim_end()).into_owned())),
            // Linux reports EIO on the master once the child is gone
            Err(_) if self.try_wait().is_some() => {
                *guard = None;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Exit code if the process has finished
    pub fn try_wait(&self) -> Option<i32> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        child
            .try_wait()
            .ok()
            .flatten()
            .map(|status| status.exit_code() as i32)
    }

    /// Wait for the process to finish
    pub fn wait(&self) -> Result<i32> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(child.wait()?.exit_code() as i32)
    }

    /// Kill the process
    pub fn kill(&self) -> Result<()> {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        child.kill()?;
        Ok(())
    }
}
