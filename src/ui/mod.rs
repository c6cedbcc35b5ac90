//! UI layer - terminal setup and the dashboard event loop

mod dashboard;

pub use dashboard::DashboardView;

use crate::app::App;
use crate::runtime::Runtime;
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Redraw at least this often so the header clock stays current
const TICK: Duration = Duration::from_secs(1);

/// Main TUI controller
pub struct TUI {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TUI {
    /// Enter raw mode and the alternate screen
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal })
    }

    /// Run the dashboard until the user quits
    pub async fn run(&mut self, runtime: Arc<Runtime>) -> Result<()> {
        let mut panel_events = runtime.subscribe();
        let (mut app, mut command_rx) = App::new(runtime);
        app.refresh_rows().await;

        let mut input = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        while !app.should_quit {
            self.terminal
                .draw(|f| DashboardView::render(f, &app, f.area()))?;

            tokio::select! {
                _ = ticker.tick() => {}
                event = panel_events.recv() => match event {
                    Ok(event) => app.apply_panel_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        log::debug!("Skipped {} panel events", skipped);
                        app.refresh_rows().await;
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(event) = command_rx.recv() => {
                    app.apply_command_event(event);
                }
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::error!("Terminal input error: {}", e);
                        break;
                    }
                    None => break,
                },
            }
        }

        app.runner.stop_all();
        Ok(())
    }
}

impl Drop for TUI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
