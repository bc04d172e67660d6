pub mod session;
pub mod trace;
pub mod tui;

pub use session::{
    RecordingHooks, ScriptLine, SessionError, SessionEvent, SessionOutput, SessionParser,
    SessionResult, replay,
};
pub use trace::{
    DebuggerHooks, FrameRecord, HookCall, StackTree, TraceError, TraceResult, TraceTree,
    TreePosition, UiEvent,
};
