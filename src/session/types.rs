use crate::trace::{FrameRecord, HookCall, ThreadId, TreeSnapshot, UiEvent};
use serde::Serialize;

/// One step of a recorded debugging session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AddThread(ThreadId),
    RemoveThread(ThreadId),
    SetActiveThread(ThreadId),
    AddFrame(FrameRecord),
    RemoveFrames,
    Clear,
    SelectFirstFrame { make_active: bool },

    /// User input on the stack view
    Ui(UiEvent),
}

/// A parsed event together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the script
    pub line_number: usize,

    pub event: SessionEvent,
}

/// Output format of `stree-tui dump`
#[derive(Debug, Serialize)]
pub struct SessionOutput {
    /// Final state of the tree
    pub tree: TreeSnapshot,

    /// Hook calls made while replaying, in order
    pub calls: Vec<HookCall>,

    /// Lines that could not be parsed
    pub errors: Vec<ParseErrorInfo>,
}

/// Information about a parse error
#[derive(Debug, Serialize)]
pub struct ParseErrorInfo {
    /// Line number where error occurred
    pub line_number: usize,

    /// Error message
    pub message: String,
}
