use super::arena::{Arena, Locator};
use super::frame::{FrameRecord, SharedFrame};
use super::{ThreadId, TraceError, TraceResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Row address as seen by a row-based view: thread index in the root, plus
/// the frame index below it for frame rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TreePosition {
    pub thread: usize,
    pub frame: Option<usize>,
}

impl TreePosition {
    pub fn thread(thread: usize) -> Self {
        Self {
            thread,
            frame: None,
        }
    }

    pub fn frame(thread: usize, frame: usize) -> Self {
        Self {
            thread,
            frame: Some(frame),
        }
    }

    /// 1 for thread rows, 2 for frame rows
    pub fn depth(&self) -> usize {
        if self.frame.is_some() { 2 } else { 1 }
    }
}

impl fmt::Display for TreePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame {
            Some(frame) => write!(f, "{}:{}", self.thread, frame),
            None => write!(f, "{}", self.thread),
        }
    }
}

/// The debugger's current thread, and the frame inside it used for evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActiveState {
    pub thread_id: ThreadId,
    pub frame_index: usize,
}

#[derive(Debug)]
enum Node {
    Thread(ThreadNode),
    Frame(FrameNode),
}

#[derive(Debug)]
struct ThreadNode {
    thread_id: ThreadId,
    /// Innermost frame first
    frames: Vec<Locator>,
    expanded: bool,
}

#[derive(Debug)]
struct FrameNode {
    thread: Locator,
    record: SharedFrame,
}

/// One visible line of the tree, in display order
#[derive(Debug, Clone)]
pub struct Row {
    pub position: TreePosition,
    pub locator: Locator,
    pub kind: RowKind,
}

#[derive(Debug, Clone)]
pub enum RowKind {
    Thread {
        thread_id: ThreadId,
        expanded: bool,
        frame_count: usize,
    },
    Frame {
        record: SharedFrame,
        active: bool,
    },
}

/// Threads and their call stacks, plus the active/selected bookkeeping.
#[derive(Debug, Default)]
pub struct TraceTree {
    nodes: Arena<Node>,
    /// Root sequence, ascending by thread id
    threads: Vec<Locator>,
    registry: HashMap<ThreadId, Locator>,
    active: ActiveState,
    /// The single frame drawn as active
    highlighted: Option<Locator>,
    /// The row the user has selected
    selection: Option<Locator>,
}

impl TraceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Thread ids in root order
    pub fn thread_ids(&self) -> Vec<ThreadId> {
        self.threads
            .iter()
            .filter_map(|&loc| self.thread_node(loc))
            .map(|thread| thread.thread_id)
            .collect()
    }

    pub fn thread_id_at(&self, thread_index: usize) -> Option<ThreadId> {
        let loc = *self.threads.get(thread_index)?;
        self.thread_node(loc).map(|thread| thread.thread_id)
    }

    pub fn add_thread(&mut self, thread_id: ThreadId) -> TraceResult<Locator> {
        if self.registry.contains_key(&thread_id) {
            log::warn!("Thread {} added twice", thread_id);
            return Err(TraceError::AlreadyExists(thread_id));
        }

        // First sibling with a larger id marks the insertion point
        let insert_at = self
            .threads
            .iter()
            .position(|&loc| {
                self.thread_node(loc)
                    .is_some_and(|thread| thread.thread_id > thread_id)
            })
            .unwrap_or(self.threads.len());

        let locator = self.nodes.insert(Node::Thread(ThreadNode {
            thread_id,
            frames: Vec::new(),
            expanded: false,
        }));
        self.threads.insert(insert_at, locator);
        self.registry.insert(thread_id, locator);

        log::debug!("Added thread {} at position {}", thread_id, insert_at);
        Ok(locator)
    }

    pub fn remove_thread(&mut self, thread_id: ThreadId) -> TraceResult<()> {
        let locator = self.locate(thread_id)?;

        if let Some(Node::Thread(thread)) = self.nodes.remove(locator) {
            for frame in thread.frames {
                self.nodes.remove(frame);
            }
        }
        self.threads.retain(|&loc| loc != locator);
        self.registry.remove(&thread_id);

        if thread_id == self.active.thread_id {
            log::warn!("Removed thread {} while it is the active thread", thread_id);
        }
        self.forget_stale_handles();

        log::debug!("Removed thread {}", thread_id);
        Ok(())
    }

    pub fn locate(&self, thread_id: ThreadId) -> TraceResult<Locator> {
        self.registry
            .get(&thread_id)
            .copied()
            .ok_or(TraceError::NotFound(thread_id))
    }

    /// Current position of a node, or `None` once it has been removed
    pub fn position_of(&self, locator: Locator) -> Option<TreePosition> {
        match self.nodes.get(locator)? {
            Node::Thread(_) => self.thread_index(locator).map(TreePosition::thread),
            Node::Frame(frame) => {
                let thread = self.thread_node(frame.thread)?;
                let frame_index = thread.frames.iter().position(|&loc| loc == locator)?;
                let thread_index = self.thread_index(frame.thread)?;
                Some(TreePosition::frame(thread_index, frame_index))
            }
        }
    }

    pub fn locator_at(&self, position: TreePosition) -> Option<Locator> {
        let thread_loc = *self.threads.get(position.thread)?;
        match position.frame {
            None => Some(thread_loc),
            Some(frame_index) => self.thread_node(thread_loc)?.frames.get(frame_index).copied(),
        }
    }

    /// Push a new innermost frame onto the active thread
    pub fn add_frame(&mut self, frame: impl Into<SharedFrame>) -> TraceResult<Locator> {
        let thread_loc = self.active_thread_locator()?;
        let locator = self.nodes.insert(Node::Frame(FrameNode {
            thread: thread_loc,
            record: frame.into(),
        }));

        if let Some(thread) = self.thread_node_mut(thread_loc) {
            thread.frames.insert(0, locator);
        }
        self.follow_highlight();

        Ok(locator)
    }

    /// Drop the whole call stack of the active thread, keeping the thread
    pub fn remove_frames(&mut self) -> TraceResult<usize> {
        let thread_loc = self.active_thread_locator()?;
        let frames = match self.thread_node_mut(thread_loc) {
            Some(thread) => std::mem::take(&mut thread.frames),
            None => Vec::new(),
        };

        let removed = frames.len();
        for frame in frames {
            self.nodes.remove(frame);
        }
        self.forget_stale_handles();
        self.active.frame_index = 0;

        log::debug!(
            "Removed {} frames of thread {}",
            removed,
            self.active.thread_id
        );
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.threads.clear();
        self.registry.clear();
        self.highlighted = None;
        self.selection = None;
        log::debug!("Cleared stack trace tree");
    }

    /// Expand the tree and select the innermost frame of the active thread.
    /// Returns whether the selection changed.
    pub fn select_first_frame(&mut self, make_active: bool) -> TraceResult<bool> {
        let thread_loc = self.active_thread_locator()?;
        self.expand_all();

        let Some(first) = self
            .thread_node(thread_loc)
            .and_then(|thread| thread.frames.first().copied())
        else {
            return Ok(false);
        };

        if make_active {
            self.highlighted = Some(first);
            self.active.frame_index = 0;
        }
        let changed = self.selection != Some(first);
        self.selection = Some(first);
        Ok(changed)
    }

    pub fn active_state(&self) -> ActiveState {
        self.active
    }

    /// Does not touch the active frame index; callers usually follow up
    /// with `select_first_frame`.
    pub fn set_active_thread(&mut self, thread_id: ThreadId) {
        log::debug!("Active thread {} -> {}", self.active.thread_id, thread_id);
        self.active.thread_id = thread_id;
    }

    /// Move the active-frame highlight within the active thread.
    /// Returns `false` when `frame_index` already is the active index.
    ///
    /// The comparison is against the stored index only. When nothing is
    /// highlighted at that index (after `remove_frames` followed by
    /// `select_first_frame(false)`, or after switching the active thread),
    /// asking for the same index is still a no-op and the frame stays
    /// unhighlighted until another index is chosen.
    pub fn set_active_frame(&mut self, frame_index: usize) -> TraceResult<bool> {
        if frame_index == self.active.frame_index {
            return Ok(false);
        }

        let thread_loc = self.active_thread_locator()?;
        let frames = self
            .thread_node(thread_loc)
            .map(|thread| thread.frames.as_slice())
            .unwrap_or_default();
        let Some(&target) = frames.get(frame_index) else {
            return Err(TraceError::PreconditionViolation {
                thread_id: self.active.thread_id,
                index: frame_index,
                len: frames.len(),
            });
        };

        // A single assignment moves the highlight, so no observer can see
        // zero or two active frames.
        self.highlighted = Some(target);
        self.active.frame_index = frame_index;

        log::debug!(
            "Active frame of thread {} is now #{}",
            self.active.thread_id,
            frame_index
        );
        Ok(true)
    }

    /// The frame currently drawn as active
    pub fn active_frame(&self) -> Option<SharedFrame> {
        self.highlighted.and_then(|loc| self.record(loc))
    }

    pub fn is_active_frame(&self, locator: Locator) -> bool {
        self.highlighted == Some(locator)
    }

    /// Call stack of a thread, innermost first
    pub fn frames(&self, thread_id: ThreadId) -> TraceResult<Vec<SharedFrame>> {
        let thread_loc = self.locate(thread_id)?;
        Ok(self
            .thread_node(thread_loc)
            .map(|thread| {
                thread
                    .frames
                    .iter()
                    .filter_map(|&loc| self.record(loc))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// The record behind a frame row. Returns a shared handle, so it stays
    /// readable even if the tree drops the frame afterwards.
    pub fn frame_at(&self, position: TreePosition) -> Option<SharedFrame> {
        position.frame?;
        self.record(self.locator_at(position)?)
    }

    /// Move the UI selection. Returns whether it changed.
    pub fn select(&mut self, position: TreePosition) -> TraceResult<bool> {
        let locator = self
            .locator_at(position)
            .ok_or(TraceError::UnknownPosition(position))?;
        if self.selection == Some(locator) {
            return Ok(false);
        }
        self.selection = Some(locator);
        Ok(true)
    }

    pub fn selection(&self) -> Option<TreePosition> {
        self.selection.and_then(|loc| self.position_of(loc))
    }

    pub fn set_expanded(&mut self, thread_id: ThreadId, expanded: bool) -> TraceResult<()> {
        let thread_loc = self.locate(thread_id)?;
        if let Some(thread) = self.thread_node_mut(thread_loc) {
            thread.expanded = expanded;
        }
        Ok(())
    }

    pub fn is_expanded(&self, thread_id: ThreadId) -> TraceResult<bool> {
        let thread_loc = self.locate(thread_id)?;
        Ok(self
            .thread_node(thread_loc)
            .is_some_and(|thread| thread.expanded))
    }

    pub fn expand_all(&mut self) {
        for &loc in &self.threads {
            if let Some(Node::Thread(thread)) = self.nodes.get_mut(loc) {
                thread.expanded = true;
            }
        }
    }

    /// Flatten the tree into the rows a view would draw
    pub fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();

        for (thread_index, &thread_loc) in self.threads.iter().enumerate() {
            let Some(thread) = self.thread_node(thread_loc) else {
                continue;
            };

            rows.push(Row {
                position: TreePosition::thread(thread_index),
                locator: thread_loc,
                kind: RowKind::Thread {
                    thread_id: thread.thread_id,
                    expanded: thread.expanded,
                    frame_count: thread.frames.len(),
                },
            });

            if !thread.expanded {
                continue;
            }

            for (frame_index, &frame_loc) in thread.frames.iter().enumerate() {
                if let Some(record) = self.record(frame_loc) {
                    rows.push(Row {
                        position: TreePosition::frame(thread_index, frame_index),
                        locator: frame_loc,
                        kind: RowKind::Frame {
                            record,
                            active: self.is_active_frame(frame_loc),
                        },
                    });
                }
            }
        }

        rows
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let threads = self
            .threads
            .iter()
            .filter_map(|&loc| self.thread_node(loc))
            .map(|thread| ThreadSnapshot {
                thread_id: thread.thread_id,
                expanded: thread.expanded,
                frames: thread
                    .frames
                    .iter()
                    .enumerate()
                    .filter_map(|(index, &loc)| {
                        self.record(loc).map(|record| FrameSnapshot {
                            index,
                            active: self.is_active_frame(loc),
                            record: FrameRecord::clone(&record),
                        })
                    })
                    .collect(),
            })
            .collect();

        TreeSnapshot {
            threads,
            active: self.active,
            selection: self.selection(),
        }
    }

    fn thread_node(&self, locator: Locator) -> Option<&ThreadNode> {
        match self.nodes.get(locator)? {
            Node::Thread(thread) => Some(thread),
            Node::Frame(_) => None,
        }
    }

    fn thread_node_mut(&mut self, locator: Locator) -> Option<&mut ThreadNode> {
        match self.nodes.get_mut(locator)? {
            Node::Thread(thread) => Some(thread),
            Node::Frame(_) => None,
        }
    }

    fn record(&self, locator: Locator) -> Option<SharedFrame> {
        match self.nodes.get(locator)? {
            Node::Frame(frame) => Some(Rc::clone(&frame.record)),
            Node::Thread(_) => None,
        }
    }

    fn thread_index(&self, locator: Locator) -> Option<usize> {
        self.threads.iter().position(|&loc| loc == locator)
    }

    fn active_thread_locator(&self) -> TraceResult<Locator> {
        self.registry
            .get(&self.active.thread_id)
            .copied()
            .ok_or(TraceError::InvalidState(self.active.thread_id))
    }

    /// Keep the active index pointing at the highlighted frame after frames
    /// were pushed in front of it.
    fn follow_highlight(&mut self) {
        let Some(highlighted) = self.highlighted else {
            return;
        };
        let Ok(thread_loc) = self.active_thread_locator() else {
            return;
        };
        if let Some(index) = self
            .thread_node(thread_loc)
            .and_then(|thread| thread.frames.iter().position(|&loc| loc == highlighted))
        {
            self.active.frame_index = index;
        }
    }

    fn forget_stale_handles(&mut self) {
        if self.highlighted.is_some_and(|loc| !self.nodes.contains(loc)) {
            self.highlighted = None;
        }
        if self.selection.is_some_and(|loc| !self.nodes.contains(loc)) {
            self.selection = None;
        }
    }
}

/// Serializable picture of the tree, used by `stree-tui dump`
#[derive(Debug, Serialize)]
pub struct TreeSnapshot {
    pub threads: Vec<ThreadSnapshot>,
    pub active: ActiveState,
    pub selection: Option<TreePosition>,
}

#[derive(Debug, Serialize)]
pub struct ThreadSnapshot {
    pub thread_id: ThreadId,
    pub expanded: bool,
    pub frames: Vec<FrameSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct FrameSnapshot {
    pub index: usize,
    pub active: bool,
    #[serde(flatten)]
    pub record: FrameRecord,
}
