//! Dashboard view - workflow panels, command output and overlays

use crate::app::{App, Level, Overlay, Picker, Viewer};
use crate::views::{Row, RowAction};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

const KEY_HINTS: &str =
    "Tab focus │ ↑↓ select │ Enter open │ r refresh │ t task │ u queue │ c commands │ q quit";

/// Dashboard view showing the three workflow panels
pub struct DashboardView;

impl DashboardView {
    /// Render the dashboard
    pub fn render(f: &mut Frame, app: &App, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        Self::render_header(f, app, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        Self::render_panels(f, app, body[0]);
        Self::render_output(f, app, body[1]);
        Self::render_footer(f, chunks[2]);

        match &app.overlay {
            Overlay::None => {}
            Overlay::Viewer(viewer) => Self::render_viewer(f, viewer, area),
            Overlay::Picker(picker) => Self::render_picker(f, picker, area),
        }
    }

    fn render_header(f: &mut Frame, app: &App, area: Rect) {
        let refreshed = app
            .last_refresh
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        let generation = app
            .runtime
            .current()
            .map(|s| format!("config #{}", s.generation))
            .unwrap_or_else(|| "no config".to_string());

        let title = Line::from(vec![
            Span::styled(
                "⚙ Workflow",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" │ {}", app.runtime.root().display())),
            Span::styled(
                format!(" │ {} │ refreshed {}", generation, refreshed),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        let message = match &app.message {
            Some(message) => {
                let color = match message.level {
                    Level::Info => Color::Green,
                    Level::Warning => Color::Yellow,
                    Level::Error => Color::Red,
                };
                Line::from(Span::styled(message.text.clone(), Style::default().fg(color)))
            }
            None => Line::from(""),
        };

        let header = Paragraph::new(vec![title, message])
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(header, area);
    }

    fn render_panels(f: &mut Frame, app: &App, area: Rect) {
        let constraints: Vec<Constraint> = app
            .panels
            .iter()
            .map(|(_, rows)| Constraint::Min(rows.len().min(8) as u16 + 2))
            .collect();

        let areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, (kind, rows)) in app.panels.iter().enumerate() {
            let focused = idx == app.focus;
            let border = if focused { Color::Cyan } else { Color::Gray };

            let items: Vec<ListItem> = rows.iter().map(row_item).collect();
            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(border))
                        .title(kind.title()),
                )
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

            let mut state = ListState::default();
            if focused && !rows.is_empty() {
                state.select(Some(app.selected[idx]));
            }
            f.render_stateful_widget(list, areas[idx], &mut state);
        }
    }

    fn render_output(f: &mut Frame, app: &App, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let start = app.output.len().saturating_sub(visible);

        let lines: Vec<Line> = app.output[start..]
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect();

        let output = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.output_title.as_str()),
        );

        f.render_widget(output, area);
    }

    fn render_footer(f: &mut Frame, area: Rect) {
        let footer = Paragraph::new(KEY_HINTS)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));

        f.render_widget(footer, area);
    }

    fn render_viewer(f: &mut Frame, viewer: &Viewer, area: Rect) {
        let area = centered(area, 85, 85);
        let lines: Vec<Line> = viewer
            .document
            .lines
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect();

        let title = format!("{} (Esc to close)", viewer.document.path.display());
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((viewer.scroll, 0));

        f.render_widget(Clear, area);
        f.render_widget(paragraph, area);
    }

    fn render_picker(f: &mut Frame, picker: &Picker, area: Rect) {
        let area = centered(area, 60, 50);
        let items: Vec<ListItem> = picker
            .choices
            .iter()
            .map(|choice| {
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(
                            choice.label.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("  {}", choice.description),
                            Style::default().fg(Color::Gray),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}", choice.detail),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Run workflow command"),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = ListState::default();
        state.select(Some(picker.selected));

        f.render_widget(Clear, area);
        f.render_stateful_widget(list, area, &mut state);
    }
}

fn row_item(row: &Row) -> ListItem<'_> {
    let style = match row.action {
        Some(RowAction::Invoke(_)) => Style::default().fg(Color::Cyan),
        Some(RowAction::OpenFile(_)) => Style::default().fg(Color::White),
        None => Style::default().fg(Color::Gray),
    };
    ListItem::new(Line::from(Span::styled(row.label.as_str(), style)))
}

/// Rect covering `percent_x` by `percent_y` of `area`, centered
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
