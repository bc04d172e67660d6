mod arena;
mod controller;
mod frame;
mod tree;

pub use arena::Locator;
use controller::navigation;
pub use controller::{
    ACTIVE_FRAME_TOOLTIP, Callbacks, Column, DebuggerHooks, HookCall, Reaction,
    SWITCH_FRAME_TOOLTIP, UiEvent, react, tooltip,
};
pub use frame::{FrameRecord, SharedFrame};
pub use tree::{
    ActiveState, FrameSnapshot, Row, RowKind, ThreadSnapshot, TraceTree, TreePosition,
    TreeSnapshot,
};

/// Debugger thread identifier
pub type ThreadId = i64;

/// Errors raised by tree operations. All of them mean the caller's idea of
/// threads and frames has drifted from the tree's.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("Unknown thread {0}")]
    NotFound(ThreadId),

    #[error("Thread {0} is already in the tree")]
    AlreadyExists(ThreadId),

    #[error("Active thread {0} is not in the tree")]
    InvalidState(ThreadId),

    #[error("Frame index {index} out of range for thread {thread_id} ({len} frames)")]
    PreconditionViolation {
        thread_id: ThreadId,
        index: usize,
        len: usize,
    },

    #[error("No row at position {0}")]
    UnknownPosition(TreePosition),
}

/// Result type for tree operations
pub type TraceResult<T> = Result<T, TraceError>;

/// Stack trace view handle: the tree plus the hooks it reports to.
///
/// This is the only way the debugger integration talks to the view, so the
/// hooks can never run while a mutation is half done.
pub struct StackTree<H> {
    tree: TraceTree,
    hooks: H,
}

impl<H: DebuggerHooks> StackTree<H> {
    pub fn init(hooks: H) -> Self {
        Self {
            tree: TraceTree::new(),
            hooks,
        }
    }

    /// Release the tree and hand the hooks back
    pub fn destroy(self) -> H {
        log::debug!(
            "Destroying stack trace view with {} threads",
            self.tree.thread_count()
        );
        self.hooks
    }

    pub fn tree(&self) -> &TraceTree {
        &self.tree
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn add_thread(&mut self, thread_id: ThreadId) -> TraceResult<()> {
        self.tree.add_thread(thread_id).map(|_| ())
    }

    pub fn remove_thread(&mut self, thread_id: ThreadId) -> TraceResult<()> {
        self.tree.remove_thread(thread_id)
    }

    pub fn add_frame(&mut self, frame: impl Into<SharedFrame>) -> TraceResult<()> {
        self.tree.add_frame(frame).map(|_| ())
    }

    pub fn remove_frames(&mut self) -> TraceResult<()> {
        self.tree.remove_frames().map(|_| ())
    }

    pub fn clear(&mut self) {
        self.tree.clear()
    }

    /// Select the innermost frame of the active thread. A new selection
    /// navigates to the frame's source, as if the user had picked the row.
    pub fn select_first_frame(&mut self, make_active: bool) -> TraceResult<()> {
        if self.tree.select_first_frame(make_active)?
            && let Some(position) = self.tree.selection()
            && let Some(call) = navigation(&self.tree, position)
        {
            call.dispatch(&mut self.hooks);
        }
        Ok(())
    }

    pub fn set_active_thread_id(&mut self, thread_id: ThreadId) {
        self.tree.set_active_thread(thread_id)
    }

    /// Fold or unfold a thread's frames in the view
    pub fn set_expanded(&mut self, thread_id: ThreadId, expanded: bool) -> TraceResult<()> {
        self.tree.set_expanded(thread_id, expanded)
    }

    /// Apply a user event. The tree is fully updated before any hook runs.
    pub fn handle(&mut self, event: UiEvent) -> TraceResult<()> {
        let reaction = react(&self.tree, event)?;
        log::debug!("{:?} -> {:?}", event, reaction);

        if let Some(position) = reaction.select {
            self.tree.select(position)?;
        }
        if let Some(frame_index) = reaction.activate {
            self.tree.set_active_frame(frame_index)?;
        }
        if let Some(call) = reaction.call {
            call.dispatch(&mut self.hooks);
        }
        Ok(())
    }

    pub fn tooltip(&self, position: TreePosition, column: Column) -> Option<String> {
        tooltip(&self.tree, position, column)
    }
}
