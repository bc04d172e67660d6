use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A frame as handed over by the debugger. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Instruction address (e.g., "0x401136")
    pub address: String,

    /// Function name, possibly empty when the debugger has no symbol
    pub function: String,

    /// Source file path (if known)
    pub file: Option<String>,

    /// Line number inside `file`, 0 when unknown
    pub line: u32,

    /// Whether the source file is available for navigation
    pub has_source: bool,
}

/// Frames are shared between the tree and whoever fetched them last.
pub type SharedFrame = Rc<FrameRecord>;

impl FrameRecord {
    /// Create a frame without any source location
    pub fn new(address: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            function: function.into(),
            file: None,
            line: 0,
            has_source: false,
        }
    }

    /// Attach a source location; `has_source` says whether it can be opened
    pub fn with_location(mut self, file: impl Into<String>, line: u32, has_source: bool) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self.has_source = has_source;
        self
    }

    pub fn shared(self) -> SharedFrame {
        Rc::new(self)
    }

    /// Only the last path component, as shown in the file column
    pub fn file_name(&self) -> Option<&str> {
        let file = self.file.as_deref()?;
        Some(
            std::path::Path::new(file)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(file),
        )
    }

    /// Location to navigate to, if the source is available
    pub fn source_location(&self) -> Option<(&str, u32)> {
        if !self.has_source {
            return None;
        }
        self.file.as_deref().map(|file| (file, self.line))
    }
}
