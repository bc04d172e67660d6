use crate::trace::{Column, DebuggerHooks, Row, RowKind, StackTree, TreePosition, UiEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Width of the arrow cell at the start of every row (marker + space)
pub const ARROW_WIDTH: u16 = 2;

/// Lines of context loaded around the target line in the source pane
const SOURCE_CONTEXT: usize = 200;

/// Hooks wired to the terminal UI: navigation feeds the source pane, frame
/// switches end up in the status line.
#[derive(Debug, Default)]
pub struct TuiHooks {
    pub source_location: Option<(String, u32)>,
    pub status: Option<String>,
}

impl DebuggerHooks for TuiHooks {
    fn select_frame(&mut self, frame_index: usize) {
        log::info!("Switched to frame #{}", frame_index);
        self.status = Some(format!("Switched to frame #{}", frame_index));
    }

    fn move_to_line(&mut self, file: &str, line: u32) {
        log::debug!("Navigating to {}:{}", file, line);
        self.source_location = Some((file.to_string(), line));
    }
}

/// Terminal input the app reacts to
#[derive(Debug, Clone, Copy)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

/// Source text around the last navigated location
#[derive(Debug)]
pub struct SourceView {
    pub file: String,
    pub line: u32,
    /// First line number held in `lines` (1-based)
    pub first_line: usize,
    pub lines: Result<Vec<String>, String>,
}

impl SourceView {
    fn load(file: &str, line: u32) -> Self {
        let target = line as usize;
        let first_line = target.saturating_sub(SOURCE_CONTEXT).max(1);

        let lines = std::fs::read_to_string(file)
            .map(|text| {
                text.lines()
                    .skip(first_line - 1)
                    .take(SOURCE_CONTEXT * 2)
                    .map(str::to_string)
                    .collect()
            })
            .map_err(|e| format!("Cannot read {}: {}", file, e));

        Self {
            file: file.to_string(),
            line,
            first_line,
            lines,
        }
    }
}

pub struct App {
    // Data
    pub stack: StackTree<TuiHooks>,
    pub file_path: Option<String>,

    // UI State
    pub rows: Vec<Row>,
    pub selected_line: usize,
    pub scroll_offset: usize,
    pub last_visible_height: usize, // Track for page scrolling
    pub list_area: Rect,            // Where the rows were last drawn, for mouse hits
    pub source: Option<SourceView>,
    pub pending_editor_open: Option<(String, u32)>,

    // Flags
    pub should_quit: bool,
    pub show_help: bool,
}

impl App {
    pub fn new(stack: StackTree<TuiHooks>, file_path: Option<String>) -> Self {
        let mut app = Self {
            stack,
            file_path,
            rows: Vec::new(),
            selected_line: 0,
            scroll_offset: 0,
            last_visible_height: 20, // Default, will be updated on first draw
            list_area: Rect::default(),
            source: None,
            pending_editor_open: None,
            should_quit: false,
            show_help: false,
        };
        app.rebuild_rows();
        app.refresh_source();
        app
    }

    pub fn update_visible_height(&mut self, height: usize) {
        self.last_visible_height = height;
    }

    /// Re-read the rows from the tree and put the cursor on the tree's selection
    fn rebuild_rows(&mut self) {
        self.rows = self.stack.tree().rows();

        if let Some(selected) = self.stack.tree().selection()
            && let Some(line) = self.rows.iter().position(|row| row.position == selected)
        {
            self.selected_line = line;
        }

        // Clamp selection to valid range
        if self.selected_line >= self.rows.len() {
            self.selected_line = self.rows.len().saturating_sub(1);
        }
    }

    fn refresh_source(&mut self) {
        let Some((file, line)) = self.stack.hooks().source_location.clone() else {
            return;
        };
        let current = self
            .source
            .as_ref()
            .is_some_and(|view| view.file == file && view.line == line);
        if !current {
            self.source = Some(SourceView::load(&file, line));
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected_line)
    }

    /// Tooltips of the selected row, the way a pointer hover would show them
    pub fn hints(&self) -> Vec<String> {
        let Some(row) = self.selected_row() else {
            return Vec::new();
        };
        [Column::Address, Column::File]
            .into_iter()
            .filter_map(|column| self.stack.tooltip(row.position, column))
            .collect()
    }

    pub fn status(&self) -> Option<&str> {
        self.stack.hooks().status.as_deref()
    }

    fn dispatch(&mut self, event: UiEvent) {
        if let Err(e) = self.stack.handle(event) {
            log::warn!("{:?} rejected: {}", event, e);
            self.stack.hooks_mut().status = Some(e.to_string());
        }
        self.rebuild_rows();
        self.refresh_source();
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        // Help screen swallows everything but its own toggles
        if self.show_help {
            if matches!(event.code, KeyCode::Char('?') | KeyCode::Esc) {
                self.show_help = false;
            }
            return;
        }

        match event.code {
            // Quit
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }

            // Help
            KeyCode::Char('?') => {
                self.show_help = true;
            }

            // Navigation
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected_line > 0 {
                    self.select_line(self.selected_line - 1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_line + 1 < self.rows.len() {
                    self.select_line(self.selected_line + 1);
                }
            }
            KeyCode::PageUp => {
                let line = self.selected_line.saturating_sub(self.last_visible_height);
                self.select_line(line);
            }
            KeyCode::PageDown => {
                let line = (self.selected_line + self.last_visible_height)
                    .min(self.rows.len().saturating_sub(1));
                self.select_line(line);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.select_line(0);
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.select_line(self.rows.len().saturating_sub(1));
            }

            // Frame actions
            KeyCode::Enter => {
                if let Some(position) = self.selected_row().map(|row| row.position) {
                    self.dispatch(UiEvent::RowActivatedAgain(position));
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('a') => {
                if let Some(position) = self.selected_row().map(|row| row.position) {
                    self.dispatch(UiEvent::ArrowClicked(position));
                }
            }

            // Expand/Collapse
            KeyCode::Left | KeyCode::Char('x') => {
                self.set_current_expanded(false);
            }
            KeyCode::Right => {
                self.set_current_expanded(true);
            }

            // Editor
            KeyCode::Char('o') => {
                if let Some(view) = &self.source {
                    self.pending_editor_open = Some((view.file.clone(), view.line));
                }
            }

            _ => {}
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        if self.show_help || event.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }

        let area = self.list_area;
        if event.column < area.x
            || event.column >= area.x + area.width
            || event.row < area.y
            || event.row >= area.y + area.height
        {
            return;
        }

        let line = self.scroll_offset + (event.row - area.y) as usize;
        let Some(row) = self.rows.get(line) else {
            return;
        };
        let position = row.position;
        let on_arrow = event.column - area.x < ARROW_WIDTH;

        if on_arrow && matches!(row.kind, RowKind::Frame { .. }) {
            self.dispatch(UiEvent::ArrowClicked(position));
        } else if line == self.selected_line {
            self.dispatch(UiEvent::RowActivatedAgain(position));
        } else {
            self.select_line(line);
        }
    }

    fn select_line(&mut self, line: usize) {
        let Some(position) = self.rows.get(line).map(|row| row.position) else {
            return;
        };
        if line == self.selected_line && self.stack.tree().selection() == Some(position) {
            return;
        }
        self.selected_line = line;
        self.dispatch(UiEvent::RowSelected(position));
    }

    /// Fold or unfold the thread owning the selected row
    fn set_current_expanded(&mut self, expanded: bool) {
        let Some(position) = self.selected_row().map(|row| row.position) else {
            return;
        };
        let Some(thread_id) = self.stack.tree().thread_id_at(position.thread) else {
            return;
        };

        log::debug!(
            "{} thread {}",
            if expanded { "Expanding" } else { "Collapsing" },
            thread_id
        );
        if self.stack.set_expanded(thread_id, expanded).is_err() {
            return;
        }

        // Collapsing hides the selected frame, so fall back to its thread
        if !expanded && position.frame.is_some() {
            self.dispatch(UiEvent::RowSelected(TreePosition::thread(position.thread)));
        } else {
            self.rebuild_rows();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{FrameRecord, SWITCH_FRAME_TOOLTIP};
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn click(column: u16, row: u16) -> InputEvent {
        InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    /// Threads 1 and 2, thread 1 active with [inner, outer] and frame 0 active
    fn app() -> App {
        let mut stack = StackTree::init(TuiHooks::default());
        stack.add_thread(1).unwrap();
        stack.add_thread(2).unwrap();
        stack.set_active_thread_id(1);
        let outer = FrameRecord::new("0x20", "outer").with_location("/nonexistent/outer.c", 9, true);
        stack.add_frame(outer).unwrap();
        stack.add_frame(FrameRecord::new("0x10", "inner")).unwrap();
        stack.select_first_frame(true).unwrap();
        App::new(stack, None)
    }

    #[test]
    fn test_initial_selection_follows_tree() {
        let app = app();
        // thread 1, inner, outer, thread 2
        assert_eq!(app.rows.len(), 4);
        assert_eq!(app.selected_line, 1);
    }

    #[test]
    fn test_stop_in_frame_with_source_fills_source_pane() {
        let mut stack = StackTree::init(TuiHooks::default());
        stack.add_thread(1).unwrap();
        stack.set_active_thread_id(1);
        let inner = FrameRecord::new("0x10", "inner").with_location("/nonexistent/inner.c", 3, true);
        stack.add_frame(inner).unwrap();
        stack.select_first_frame(true).unwrap();
        let app = App::new(stack, None);

        assert_eq!(
            app.stack.hooks().source_location,
            Some(("/nonexistent/inner.c".to_string(), 3))
        );
        assert!(app.source.as_ref().is_some_and(|view| view.line == 3));
    }

    #[test]
    fn test_moving_down_navigates_to_source() {
        let mut app = app();
        app.handle_event(key(KeyCode::Down));

        assert_eq!(app.selected_line, 2);
        assert_eq!(
            app.stack.hooks().source_location,
            Some(("/nonexistent/outer.c".to_string(), 9))
        );
        assert!(app.source.as_ref().is_some_and(|view| view.lines.is_err()));
        assert_eq!(app.hints()[0], SWITCH_FRAME_TOOLTIP);
    }

    #[test]
    fn test_space_switches_frame() {
        let mut app = app();
        app.handle_event(key(KeyCode::Down));
        app.handle_event(key(KeyCode::Char(' ')));

        assert_eq!(app.stack.tree().active_state().frame_index, 1);
        assert_eq!(app.status(), Some("Switched to frame #1"));
    }

    #[test]
    fn test_click_arrow_and_reclick() {
        let mut app = app();
        app.list_area = Rect::new(0, 5, 80, 10);

        // Arrow of "outer" (third row)
        app.handle_event(click(0, 7));
        assert_eq!(app.stack.tree().active_state().frame_index, 1);
        assert_eq!(app.selected_line, 1);

        // Re-click on the selected row navigates, here a frame without source
        app.handle_event(click(10, 6));
        assert_eq!(app.stack.hooks().source_location, None);

        // Click outside the list is ignored
        app.handle_event(click(10, 1));
        assert_eq!(app.selected_line, 1);
    }

    #[test]
    fn test_collapse_moves_selection_to_thread() {
        let mut app = app();
        app.handle_event(key(KeyCode::Left));

        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.selected_line, 0);
        assert_eq!(app.stack.tree().selection(), Some(TreePosition::thread(0)));

        app.handle_event(key(KeyCode::Right));
        assert_eq!(app.rows.len(), 4);
    }

    #[test]
    fn test_open_editor_needs_location() {
        let mut app = app();
        app.handle_event(key(KeyCode::Char('o')));
        assert!(app.pending_editor_open.is_none());

        app.handle_event(key(KeyCode::Down));
        app.handle_event(key(KeyCode::Char('o')));
        assert_eq!(
            app.pending_editor_open,
            Some(("/nonexistent/outer.c".to_string(), 9))
        );
    }

    #[test]
    fn test_help_and_quit() {
        let mut app = app();
        app.handle_event(key(KeyCode::Char('?')));
        assert!(app.show_help);
        app.handle_event(key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        app.handle_event(key(KeyCode::Esc));
        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
