use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &str, pad: usize, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(desc.to_string()),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("←↑↓→", 8, "Move between actions (or h/j/k/l)"),
        key_line("enter", 7, "Run the selected action"),
        key_line("r", 11, "Re-check scripts on disk"),
        key_line("tab", 9, "Switch tabs"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Dialogs:"),
        key_line("enter", 7, "Dismiss"),
        key_line("esc", 9, "Dismiss"),
        Line::from(""),
        Line::from("Scripts:"),
        Line::from("  Each tool runs scripts/<Tool>-setup.<ext> from the resource root."),
        Line::from("  Actions whose script is missing are shown disabled."),
        Line::from("  Logs are written to the --log-file path (fresh each start)."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
