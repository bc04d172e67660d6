mod line_parser;
mod types;

pub use line_parser::parse_session_line;
pub use types::*;

use crate::trace::{DebuggerHooks, HookCall, StackTree, TraceError, TraceResult};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Errors that can occur while loading or replaying a session script
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments for {command}: {details}")]
    InvalidArguments { command: String, details: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: TraceError,
    },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Reads session scripts, collecting bad lines instead of stopping at them
#[derive(Debug)]
pub struct SessionParser {
    /// Accumulated errors during parsing
    pub errors: Vec<(usize, SessionError)>,
    /// Current line number
    line_number: usize,
}

impl SessionParser {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            line_number: 0,
        }
    }

    /// Parse an entire session script
    pub fn parse_file(&mut self, path: &str) -> SessionResult<Vec<ScriptLine>> {
        let file = File::open(path)
            .map_err(|e| SessionError::Io(format!("Failed to open {}: {}", path, e)))?;

        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(line.map_err(|e| SessionError::Io(format!("Failed to read {}: {}", path, e)))?);
        }
        self.parse_lines(lines.into_iter())
    }

    /// Parse a script from an iterator of lines
    pub fn parse_lines<I>(&mut self, lines: I) -> SessionResult<Vec<ScriptLine>>
    where
        I: Iterator<Item = String>,
    {
        let mut script = Vec::new();

        for line in lines {
            self.line_number += 1;

            match parse_session_line(&line) {
                Ok(Some(event)) => script.push(ScriptLine {
                    line_number: self.line_number,
                    event,
                }),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Skipping line {}: {}", self.line_number, e);
                    self.errors.push((self.line_number, e));
                }
            }
        }

        Ok(script)
    }

    pub fn error_info(&self) -> Vec<ParseErrorInfo> {
        self.errors
            .iter()
            .map(|(line, err)| ParseErrorInfo {
                line_number: *line,
                message: err.to_string(),
            })
            .collect()
    }
}

impl Default for SessionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvent {
    /// Feed this event to the stack view
    pub fn apply<H: DebuggerHooks>(&self, stack: &mut StackTree<H>) -> TraceResult<()> {
        match self {
            SessionEvent::AddThread(id) => stack.add_thread(*id),
            SessionEvent::RemoveThread(id) => stack.remove_thread(*id),
            SessionEvent::SetActiveThread(id) => {
                stack.set_active_thread_id(*id);
                Ok(())
            }
            SessionEvent::AddFrame(frame) => stack.add_frame(frame.clone()),
            SessionEvent::RemoveFrames => stack.remove_frames(),
            SessionEvent::Clear => {
                stack.clear();
                Ok(())
            }
            SessionEvent::SelectFirstFrame { make_active } => stack.select_first_frame(*make_active),
            SessionEvent::Ui(event) => stack.handle(*event),
        }
    }
}

/// Replay a script in order. The first rejected event aborts the replay,
/// since the rest of the script would build on a tree that no longer
/// matches the debugger.
pub fn replay<H: DebuggerHooks>(script: &[ScriptLine], stack: &mut StackTree<H>) -> SessionResult<()> {
    for line in script {
        line.event
            .apply(stack)
            .map_err(|source| SessionError::Replay {
                line: line.line_number,
                source,
            })?;
    }
    log::debug!("Replayed {} session events", script.len());
    Ok(())
}

/// Hooks that only remember what they were asked to do
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub calls: Vec<HookCall>,
}

impl DebuggerHooks for RecordingHooks {
    fn select_frame(&mut self, frame_index: usize) {
        log::debug!("select_frame({})", frame_index);
        self.calls.push(HookCall::SelectFrame { frame_index });
    }

    fn move_to_line(&mut self, file: &str, line: u32) {
        log::debug!("move_to_line({}, {})", file, line);
        self.calls.push(HookCall::MoveToLine {
            file: file.to_string(),
            line,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TreePosition;

    fn parse(script: &str) -> (SessionParser, Vec<ScriptLine>) {
        let mut parser = SessionParser::new();
        let lines = parser
            .parse_lines(script.lines().map(str::to_string))
            .unwrap();
        (parser, lines)
    }

    #[test]
    fn test_parse_keeps_line_numbers() {
        let (parser, script) = parse("# header\nadd_thread 1\n\nset_active_thread 1\n");

        assert!(parser.errors.is_empty());
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].line_number, 2);
        assert_eq!(script[1].line_number, 4);
    }

    #[test]
    fn test_parse_collects_errors() {
        let (parser, script) = parse("add_thread 1\nbogus\nadd_thread one\nadd_thread 2\n");

        assert_eq!(script.len(), 2);
        let lines: Vec<usize> = parser.errors.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(parser.error_info().len(), 2);
    }

    #[test]
    fn test_replay_scenario() {
        let (_, script) = parse(
            "add_thread 1\n\
             add_thread 3\n\
             add_thread 2\n\
             set_active_thread 1\n\
             add_frame 0x20 main main.c:10\n\
             add_frame 0x10 helper helper.c:3 nosource\n\
             select_first_frame active\n\
             arrow 0 1\n\
             arrow 0 1\n\
             select 0 0\n\
             select 0 1\n",
        );

        let mut stack = StackTree::init(RecordingHooks::default());
        replay(&script, &mut stack).unwrap();

        assert_eq!(stack.tree().thread_ids(), vec![1, 2, 3]);
        assert_eq!(stack.tree().active_state().frame_index, 1);
        assert_eq!(stack.tree().selection(), Some(TreePosition::frame(0, 1)));
        assert_eq!(
            stack.hooks().calls,
            vec![
                HookCall::SelectFrame { frame_index: 1 },
                HookCall::MoveToLine {
                    file: "main.c".to_string(),
                    line: 10
                },
            ]
        );
    }

    #[test]
    fn test_replay_stops_at_first_error() {
        let (_, script) = parse("add_thread 1\nremove_thread 5\nadd_thread 2\n");

        let mut stack = StackTree::init(RecordingHooks::default());
        let err = replay(&script, &mut stack).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Replay {
                line: 2,
                source: TraceError::NotFound(5)
            }
        ));
        assert_eq!(stack.tree().thread_ids(), vec![1]);
    }

    #[test]
    fn test_missing_file() {
        let mut parser = SessionParser::new();
        let result = parser.parse_file("/nonexistent/session.txt");
        assert!(matches!(result, Err(SessionError::Io(_))));
    }
}
