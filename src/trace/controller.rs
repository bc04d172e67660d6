use super::tree::{TraceTree, TreePosition};
use super::{TraceError, TraceResult};
use serde::Serialize;

pub const ACTIVE_FRAME_TOOLTIP: &str = "Active frame";
pub const SWITCH_FRAME_TOOLTIP: &str = "Click an arrow to switch to a frame";

/// What the stack view needs from the debugger and the source viewer
pub trait DebuggerHooks {
    /// `frame_index` of the active thread is now the evaluation context
    fn select_frame(&mut self, frame_index: usize);

    /// Show `file` at `line` in the source viewer
    fn move_to_line(&mut self, file: &str, line: u32);
}

/// Adapts a pair of closures to [`DebuggerHooks`]
pub struct Callbacks<M, S> {
    move_to_line: M,
    select_frame: S,
}

impl<M, S> Callbacks<M, S>
where
    M: FnMut(&str, u32),
    S: FnMut(usize),
{
    pub fn new(move_to_line: M, select_frame: S) -> Self {
        Self {
            move_to_line,
            select_frame,
        }
    }
}

impl<M, S> DebuggerHooks for Callbacks<M, S>
where
    M: FnMut(&str, u32),
    S: FnMut(usize),
{
    fn select_frame(&mut self, frame_index: usize) {
        (self.select_frame)(frame_index)
    }

    fn move_to_line(&mut self, file: &str, line: u32) {
        (self.move_to_line)(file, line)
    }
}

/// User input, already mapped to a tree position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// The selection moved onto this row
    RowSelected(TreePosition),
    /// The already selected row was clicked again
    RowActivatedAgain(TreePosition),
    /// The frame arrow of this row was clicked
    ArrowClicked(TreePosition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Address,
    Function,
    File,
    Line,
}

/// An outgoing call to the hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HookCall {
    SelectFrame { frame_index: usize },
    MoveToLine { file: String, line: u32 },
}

impl HookCall {
    pub fn dispatch<H: DebuggerHooks + ?Sized>(&self, hooks: &mut H) {
        match self {
            HookCall::SelectFrame { frame_index } => hooks.select_frame(*frame_index),
            HookCall::MoveToLine { file, line } => hooks.move_to_line(file, *line),
        }
    }
}

/// Everything an event leads to: at most one state change of each kind and
/// at most one call out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub select: Option<TreePosition>,
    pub activate: Option<usize>,
    pub call: Option<HookCall>,
}

/// Decide how to respond to `event` without touching the tree.
pub fn react(tree: &TraceTree, event: UiEvent) -> TraceResult<Reaction> {
    let position = match event {
        UiEvent::RowSelected(position)
        | UiEvent::RowActivatedAgain(position)
        | UiEvent::ArrowClicked(position) => position,
    };
    if tree.locator_at(position).is_none() {
        return Err(TraceError::UnknownPosition(position));
    }

    let mut reaction = Reaction::default();
    match event {
        UiEvent::ArrowClicked(position) => {
            // Thread rows have no arrow
            let Some(frame_index) = position.frame else {
                return Ok(reaction);
            };

            let active = tree.active_state();
            if tree.thread_id_at(position.thread) != Some(active.thread_id) {
                log::warn!(
                    "Ignoring arrow click on {}: not a frame of active thread {}",
                    position,
                    active.thread_id
                );
                return Ok(reaction);
            }

            if frame_index != active.frame_index {
                reaction.activate = Some(frame_index);
                reaction.call = Some(HookCall::SelectFrame { frame_index });
            }
        }
        UiEvent::RowSelected(position) => {
            // Re-selecting the selected row is not a selection change
            if tree.selection() == Some(position) {
                return Ok(reaction);
            }
            reaction.select = Some(position);
            reaction.call = navigation(tree, position);
        }
        UiEvent::RowActivatedAgain(position) => {
            reaction.call = navigation(tree, position);
        }
    }

    Ok(reaction)
}

/// Source navigation for the row at `position`: only frames with source have one
pub(crate) fn navigation(tree: &TraceTree, position: TreePosition) -> Option<HookCall> {
    let frame = tree.frame_at(position)?;
    let (file, line) = frame.source_location()?;
    Some(HookCall::MoveToLine {
        file: file.to_string(),
        line,
    })
}

/// Tooltip for a cell, if it has one
pub fn tooltip(tree: &TraceTree, position: TreePosition, column: Column) -> Option<String> {
    let frame_index = position.frame?;
    let frame = tree.frame_at(position)?;

    match column {
        Column::File => frame.file.clone(),
        Column::Address => {
            let active = tree.active_state();
            let is_active = tree.thread_id_at(position.thread) == Some(active.thread_id)
                && frame_index == active.frame_index;
            let text = if is_active {
                ACTIVE_FRAME_TOOLTIP
            } else {
                SWITCH_FRAME_TOOLTIP
            };
            Some(text.to_string())
        }
        Column::Function | Column::Line => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::FrameRecord;

    /// Thread 1 active with frames [inner (source), outer (no source)]
    fn tree() -> TraceTree {
        let mut tree = TraceTree::new();
        tree.add_thread(1).unwrap();
        tree.add_thread(2).unwrap();
        tree.set_active_thread(1);
        tree.add_frame(
            FrameRecord::new("0x20", "outer").with_location("/lib/libc.c", 88, false),
        )
        .unwrap();
        tree.add_frame(
            FrameRecord::new("0x10", "inner").with_location("/src/main.c", 12, true),
        )
        .unwrap();
        tree.select_first_frame(true).unwrap();
        tree
    }

    #[test]
    fn test_arrow_click_on_other_frame() {
        let tree = tree();
        let reaction = react(&tree, UiEvent::ArrowClicked(TreePosition::frame(0, 1))).unwrap();

        assert_eq!(reaction.activate, Some(1));
        assert_eq!(reaction.call, Some(HookCall::SelectFrame { frame_index: 1 }));
        assert_eq!(reaction.select, None);
    }

    #[test]
    fn test_arrow_click_on_active_frame() {
        let tree = tree();
        let reaction = react(&tree, UiEvent::ArrowClicked(TreePosition::frame(0, 0))).unwrap();
        assert_eq!(reaction, Reaction::default());
    }

    #[test]
    fn test_arrow_click_on_thread_row() {
        let tree = tree();
        let reaction = react(&tree, UiEvent::ArrowClicked(TreePosition::thread(0))).unwrap();
        assert_eq!(reaction, Reaction::default());
    }

    #[test]
    fn test_row_selected_with_source() {
        let mut tree = tree();
        tree.select(TreePosition::thread(1)).unwrap();
        let reaction = react(&tree, UiEvent::RowSelected(TreePosition::frame(0, 0))).unwrap();

        assert_eq!(reaction.select, Some(TreePosition::frame(0, 0)));
        assert_eq!(
            reaction.call,
            Some(HookCall::MoveToLine {
                file: "/src/main.c".to_string(),
                line: 12
            })
        );
        assert_eq!(reaction.activate, None);
    }

    #[test]
    fn test_row_selected_without_source() {
        let tree = tree();
        let reaction = react(&tree, UiEvent::RowSelected(TreePosition::frame(0, 1))).unwrap();

        assert_eq!(reaction.select, Some(TreePosition::frame(0, 1)));
        assert_eq!(reaction.call, None);
    }

    #[test]
    fn test_reselecting_selected_row_does_nothing() {
        let tree = tree();
        assert_eq!(tree.selection(), Some(TreePosition::frame(0, 0)));

        let reaction = react(&tree, UiEvent::RowSelected(TreePosition::frame(0, 0))).unwrap();
        assert_eq!(reaction, Reaction::default());
    }

    #[test]
    fn test_thread_row_selected() {
        let tree = tree();
        let reaction = react(&tree, UiEvent::RowSelected(TreePosition::thread(1))).unwrap();
        assert_eq!(reaction.call, None);
    }

    #[test]
    fn test_activated_again_navigates_without_selecting() {
        let tree = tree();
        let reaction =
            react(&tree, UiEvent::RowActivatedAgain(TreePosition::frame(0, 0))).unwrap();

        assert_eq!(reaction.select, None);
        assert!(matches!(reaction.call, Some(HookCall::MoveToLine { line: 12, .. })));
    }

    #[test]
    fn test_unknown_position() {
        let tree = tree();
        let position = TreePosition::frame(1, 0);
        assert_eq!(
            react(&tree, UiEvent::RowSelected(position)),
            Err(TraceError::UnknownPosition(position))
        );
    }

    #[test]
    fn test_tooltips() {
        let tree = tree();
        let active = TreePosition::frame(0, 0);
        let other = TreePosition::frame(0, 1);

        assert_eq!(
            tooltip(&tree, active, Column::Address).as_deref(),
            Some(ACTIVE_FRAME_TOOLTIP)
        );
        assert_eq!(
            tooltip(&tree, other, Column::Address).as_deref(),
            Some(SWITCH_FRAME_TOOLTIP)
        );
        assert_eq!(
            tooltip(&tree, other, Column::File).as_deref(),
            Some("/lib/libc.c")
        );
        assert_eq!(tooltip(&tree, active, Column::Function), None);
        assert_eq!(tooltip(&tree, active, Column::Line), None);
        assert_eq!(tooltip(&tree, TreePosition::thread(0), Column::Address), None);
    }

    #[test]
    fn test_callbacks_adapter() {
        let mut moved = Vec::new();
        let mut selected = Vec::new();
        {
            let mut hooks = Callbacks::new(
                |file: &str, line| moved.push((file.to_string(), line)),
                |index| selected.push(index),
            );
            HookCall::SelectFrame { frame_index: 2 }.dispatch(&mut hooks);
            HookCall::MoveToLine {
                file: "a.c".to_string(),
                line: 4,
            }
            .dispatch(&mut hooks);
        }

        assert_eq!(selected, vec![2]);
        assert_eq!(moved, vec![("a.c".to_string(), 4)]);
    }
}
