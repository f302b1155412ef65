mod help;
mod state;

use crate::model::{
    ActionEvent, ActionView, Notice, NoticeKind, Outcome, ScriptConvention, StatusLine,
};
use crate::orchestrator::{self, Orchestrator, ProcessLauncher, UiCommand};
use crate::registry::ActionRegistry;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{UiState, GRID_COLUMNS};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(registry: Arc<ActionRegistry>, convention: ScriptConvention) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ActionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let orch = Orchestrator::new(
        registry.clone(),
        convention.clone(),
        ProcessLauncher,
        event_tx,
    );

    let initial = orch.eligibility_view();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || {
        run_threaded(initial, registry, convention, event_rx, cmd_tx)
    });

    let res = orchestrator::run_controller(orch, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    initial: Vec<ActionView>,
    registry: Arc<ActionRegistry>,
    convention: ScriptConvention,
    mut event_rx: UnboundedReceiver<ActionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; the controller reaches it through events.
    let mut state = UiState::with_actions(initial);

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            if state.apply_event(ev) {
                terminal.draw(|f| draw(f.area(), f, &state)).ok();
                last_tick = Instant::now();
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }

                // An open dialog is modal: it only takes dismiss keys.
                if state.notice.is_some() {
                    if matches!(k.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                        state.dismiss_notice();
                    }
                    continue;
                }

                match k.code {
                    KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Tab => {
                        state.tab = (state.tab + 1) % 2;
                    }
                    KeyCode::Char('?') => {
                        state.tab = 1;
                    }
                    KeyCode::Left | KeyCode::Char('h') if state.tab == 0 => {
                        state.move_selection(0, -1)
                    }
                    KeyCode::Right | KeyCode::Char('l') if state.tab == 0 => {
                        state.move_selection(0, 1)
                    }
                    KeyCode::Up | KeyCode::Char('k') if state.tab == 0 => {
                        state.move_selection(-1, 0)
                    }
                    KeyCode::Down | KeyCode::Char('j') if state.tab == 0 => {
                        state.move_selection(1, 0)
                    }
                    KeyCode::Enter | KeyCode::Char(' ') if state.tab == 0 => {
                        match state.trigger_selected() {
                            Some(action) => {
                                let _ = cmd_tx.send(UiCommand::Execute(action));
                            }
                            None => {
                                state.info =
                                    "This action is disabled: its script is missing.".into();
                            }
                        }
                    }
                    KeyCode::Char('r') if state.tab == 0 => {
                        state.replace_actions(registry.eligibility_view(&convention));
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Actions"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("action-deck"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_actions(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    if let Some(notice) = state.notice.as_ref() {
        draw_notice(area, f, notice, state.queued_notices.len());
    }
}

fn draw_actions(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),    // Grid + recent runs
                Constraint::Length(4), // Status
            ]
            .as_ref(),
        )
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(main[0]);

    draw_grid(top[0], f, state);
    draw_recent(top[1], f, state);

    let status_color = match state.status {
        StatusLine::Succeeded { .. } => Color::Green,
        StatusLine::Failed { .. } | StatusLine::LaunchFailed { .. } => Color::Red,
        StatusLine::InProgress { .. } => Color::Yellow,
        StatusLine::Ready => Color::Gray,
    };
    let mut lines = vec![Line::from(Span::styled(
        state.status.to_message(),
        Style::default().fg(status_color),
    ))];
    if !state.info.is_empty() {
        lines.push(Line::from(Span::styled(
            state.info.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    let status = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, main[1]);
}

fn draw_grid(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Tools (enter to run)");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = state.actions.len().div_ceil(GRID_COLUMNS);
    if rows == 0 {
        return;
    }
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            std::iter::repeat(Constraint::Length(3))
                .take(rows)
                .chain(std::iter::once(Constraint::Min(0)))
                .collect::<Vec<_>>(),
        )
        .split(inner);

    for (r, row_area) in row_areas.iter().take(rows).enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                std::iter::repeat(Constraint::Ratio(1, GRID_COLUMNS as u32))
                    .take(GRID_COLUMNS)
                    .collect::<Vec<_>>(),
            )
            .split(*row_area);

        for (c, cell) in cols.iter().enumerate() {
            let idx = r * GRID_COLUMNS + c;
            let Some(action) = state.actions.get(idx) else {
                continue;
            };
            let is_selected = idx == state.selected;

            let (label, text_style) = if action.eligible {
                (
                    action.name.as_str().to_string(),
                    Style::default().fg(Color::Green),
                )
            } else {
                (
                    format!("{} (missing)", action.name),
                    Style::default().fg(Color::DarkGray),
                )
            };
            let border_style = if is_selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            };
            let text_style = if is_selected {
                text_style.add_modifier(Modifier::BOLD)
            } else {
                text_style
            };

            let p = Paragraph::new(Line::from(Span::styled(label, text_style)))
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(border_style),
                );
            f.render_widget(p, *cell);
        }
    }
}

fn draw_recent(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(selected) = state.selected_action() {
        lines.push(Line::from(vec![
            Span::styled("Script: ", Style::default().fg(Color::Gray)),
            Span::raw(selected.script.display().to_string()),
        ]));
        lines.push(Line::from(""));
    }

    if state.recent.is_empty() {
        lines.push(Line::from(Span::styled(
            "No runs yet",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for o in &state.recent {
        let (mark, color, detail) = match &o.outcome {
            Outcome::Succeeded => ("✓", Color::Green, "ok".to_string()),
            Outcome::Failed { code } => ("✗", Color::Red, format!("exit {code}")),
            Outcome::LaunchFailed { .. } => ("✗", Color::Red, "not started".to_string()),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{mark} "), Style::default().fg(color)),
            Span::raw(format!("{:<10}", o.display_name)),
            Span::raw(format!(" {detail:<8}")),
            Span::styled(
                format!(" {:.1}s", o.elapsed_ms as f64 / 1000.0),
                Style::default().fg(Color::Gray),
            ),
        ]));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Recent runs"));
    f.render_widget(p, area);
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, notice: &Notice, queued: usize) {
    let popup = centered_rect(60, 40, area);
    let color = match notice.kind {
        NoticeKind::Success => Color::Green,
        NoticeKind::Busy => Color::Yellow,
        NoticeKind::Error | NoticeKind::RuntimeError | NoticeKind::InvalidPath => Color::Red,
    };

    let mut lines: Vec<Line> = notice.body.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    let footer = if queued > 0 {
        format!("enter: dismiss ({queued} more)")
    } else {
        "enter: dismiss".to_string()
    };
    lines.push(Line::from(Span::styled(
        footer,
        Style::default().fg(Color::Gray),
    )));

    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(notice.title.clone()),
    );
    f.render_widget(Clear, popup);
    f.render_widget(p, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}
