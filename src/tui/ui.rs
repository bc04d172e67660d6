use super::app::{ARROW_WIDTH, App};
use crate::trace::RowKind;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

const ACTIVE_ARROW: &str = "▶";
const FRAME_ARROW: &str = "▷";

const ADDRESS_WIDTH: usize = 18;
const FILE_WIDTH: usize = 24;
const LINE_WIDTH: usize = 6;

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),      // Header line
            Constraint::Length(1),      // Divider
            Constraint::Length(1),      // Column titles
            Constraint::Percentage(55), // Stack
            Constraint::Min(3),         // Source
            Constraint::Length(1),      // Hint line
            Constraint::Length(1),      // Footer line
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_divider(f, chunks[1]);
    draw_column_titles(f, chunks[2]);
    draw_list(f, app, chunks[3]);
    draw_source(f, app, chunks[4]);
    draw_hints(f, app, chunks[5]);
    draw_footer(f, chunks[6]);

    // Draw help modal on top if active
    if app.show_help {
        draw_help(f);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let file_name = app
        .file_path
        .as_ref()
        .and_then(|p| std::path::Path::new(p).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("session");

    let tree = app.stack.tree();
    let active = tree.active_state();
    let header_text = format!(
        "stree-tui: {} | Threads: {} | Active thread: {} | Active frame: #{}",
        file_name,
        tree.thread_count(),
        active.thread_id,
        active.frame_index,
    );

    let header = Paragraph::new(header_text).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    f.render_widget(header, area);
}

fn draw_divider(f: &mut Frame, area: Rect) {
    let divider = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    f.render_widget(divider, area);
}

fn function_width(total: usize) -> usize {
    total.saturating_sub(ARROW_WIDTH as usize + ADDRESS_WIDTH + FILE_WIDTH + LINE_WIDTH + 3)
}

fn draw_column_titles(f: &mut Frame, area: Rect) {
    let function_width = function_width(area.width as usize);
    let titles = format!(
        "{}{} {} {} {}",
        " ".repeat(ARROW_WIDTH as usize),
        pad("Address", ADDRESS_WIDTH),
        pad("Function", function_width),
        pad("File", FILE_WIDTH),
        pad_left("Line", LINE_WIDTH),
    );

    let paragraph = Paragraph::new(titles).style(
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::UNDERLINED),
    );
    f.render_widget(paragraph, area);
}

fn draw_list(f: &mut Frame, app: &mut App, area: Rect) {
    // Calculate scroll offset to keep selected item visible
    let visible_height = area.height as usize;
    app.update_visible_height(visible_height);
    app.list_area = area;

    if app.selected_line >= app.scroll_offset + visible_height {
        app.scroll_offset = app.selected_line.saturating_sub(visible_height.saturating_sub(1));
    } else if app.selected_line < app.scroll_offset {
        app.scroll_offset = app.selected_line;
    }

    let start = app.scroll_offset;
    let end = (app.scroll_offset + visible_height).min(app.rows.len());
    let function_width = function_width(area.width as usize);

    let items: Vec<ListItem> = app.rows[start..end]
        .iter()
        .map(|row| match &row.kind {
            RowKind::Thread {
                thread_id,
                expanded,
                frame_count,
            } => {
                let fold = if *expanded { "▾" } else { "▸" };
                let label = format!("{} Thread {} ({} frames)", fold, thread_id, frame_count);
                ListItem::new(Line::from(Span::styled(
                    label,
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )))
            }
            RowKind::Frame { record, active } => {
                let (arrow, arrow_style) = if *active {
                    (ACTIVE_ARROW, Style::default().fg(Color::Yellow))
                } else {
                    (FRAME_ARROW, Style::default().fg(Color::DarkGray))
                };
                let text_color = if *active { Color::Yellow } else { Color::White };
                let file_color = if record.has_source {
                    Color::Green
                } else {
                    Color::DarkGray
                };
                let line = if record.file.is_some() {
                    record.line.to_string()
                } else {
                    String::new()
                };

                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", arrow), arrow_style),
                    Span::styled(
                        pad(&record.address, ADDRESS_WIDTH),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        pad(&record.function, function_width),
                        Style::default().fg(text_color),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        pad(record.file_name().unwrap_or(""), FILE_WIDTH),
                        Style::default().fg(file_color),
                    ),
                    Span::raw(" "),
                    Span::styled(pad_left(&line, LINE_WIDTH), Style::default().fg(file_color)),
                ]))
            }
        })
        .collect();

    let list = List::new(items).highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    // Calculate which item in the visible list to highlight
    let mut state = ratatui::widgets::ListState::default();
    if app.selected_line >= start && app.selected_line < end {
        state.select(Some(app.selected_line - app.scroll_offset));
    }

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_source(f: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.source else {
        let placeholder = Paragraph::new("Select a frame with source to show it here")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::TOP).title("Source"));
        f.render_widget(placeholder, area);
        return;
    };

    let title = format!("{}:{}", truncate_path_start(&view.file, area.width as usize), view.line);
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let lines = match &view.lines {
        Ok(lines) => lines,
        Err(message) => {
            let paragraph = Paragraph::new(message.as_str())
                .style(Style::default().fg(Color::Red))
                .block(block);
            f.render_widget(paragraph, area);
            return;
        }
    };

    // Keep the target line roughly in the middle of the pane
    let visible = area.height.saturating_sub(1) as usize;
    let target = view.line as usize;
    let top = target
        .saturating_sub(visible / 2)
        .max(view.first_line);
    let number_width = (top + visible).to_string().len();

    let text: Vec<Line> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| (view.first_line + i, text))
        .skip_while(|(number, _)| *number < top)
        .take(visible)
        .map(|(number, text)| {
            let style = if number == target {
                Style::default().bg(Color::Rgb(60, 60, 0)).fg(Color::White)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    format!("{:>width$} ", number, width = number_width),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(text.replace('\t', "    "), style),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_hints(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();
    for hint in app.hints() {
        if !spans.is_empty() {
            spans.push(Span::raw(" | "));
        }
        spans.push(Span::styled(hint, Style::default().fg(Color::Gray)));
    }
    if let Some(status) = app.status() {
        if !spans.is_empty() {
            spans.push(Span::raw(" | "));
        }
        spans.push(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let footer_text =
        "↑↓/jk: Nav | Enter: Open | Space/a: Switch frame | ←→: Fold | o: Editor | q: Quit | ?: Help";

    let footer = Paragraph::new(footer_text).style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, area);
}

fn draw_help(f: &mut Frame) {
    let help_text = vec![
        Line::from(Span::styled(
            "stree-tui Help",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Navigation:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  ↑/k         Move up one row"),
        Line::from("  ↓/j         Move down one row"),
        Line::from("  PageUp      Move up one page"),
        Line::from("  PageDown    Move down one page"),
        Line::from("  Home/g      Jump to first row"),
        Line::from("  End/G       Jump to last row"),
        Line::from(""),
        Line::from(Span::styled(
            "Frames:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  Enter       Show the frame's source again"),
        Line::from("  Space/a     Switch the debugger to this frame"),
        Line::from("  Click arrow Switch the debugger to this frame"),
        Line::from("  ←/x         Collapse thread"),
        Line::from("  →           Expand thread"),
        Line::from("  o           Open source location in $EDITOR"),
        Line::from(""),
        Line::from(Span::styled(
            "Other:",
            Style::default().add_modifier(Modifier::UNDERLINED),
        )),
        Line::from("  q/Q         Quit"),
        Line::from("  ?           Toggle this help"),
        Line::from("  Ctrl+C      Force quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close help",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true });

    let area = centered_rect(60, 70, f.area());
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Left-align `s` in exactly `width` characters
fn pad(s: &str, width: usize) -> String {
    let truncated = truncate_line(s, width);
    let len = truncated.chars().count();
    format!("{}{}", truncated, " ".repeat(width.saturating_sub(len)))
}

/// Right-align `s` in exactly `width` characters
fn pad_left(s: &str, width: usize) -> String {
    let truncated = truncate_line(s, width);
    let len = truncated.chars().count();
    format!("{}{}", " ".repeat(width.saturating_sub(len)), truncated)
}

fn truncate_path_start(path: &str, max_len: usize) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= max_len {
        return path.to_string();
    }

    let keep_chars = max_len.saturating_sub(3); // Reserve 3 for "..."
    let skip_chars = chars.len() - keep_chars;
    let truncated: String = chars.iter().skip(skip_chars).collect();
    format!("...{}", truncated)
}

fn truncate_line(s: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    // Count actual character width (not bytes)
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= width {
        s.to_string()
    } else {
        let truncate_at = width.saturating_sub(3);
        let truncated: String = chars.iter().take(truncate_at).collect();
        format!("{}...", truncated)
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
