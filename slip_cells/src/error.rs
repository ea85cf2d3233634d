//! Errors and diagnostics
//!
//! Every failing operation reports a diagnostic through `tracing` before returning its
//! error. The diagnostic carries the operation name, the caller's file and line, and a
//! low-level dump of the offending cell, since the cell graph is otherwise opaque.

use core::fmt;
use core::panic::Location;

use thiserror::Error;

use crate::handle::CellId;

/// Result type for cell and list operations
pub type SlipResult<T> = Result<T, SlipError>;

/// Result type for raw allocations
pub type AllocResult<T> = Result<T, AllocError>;

/// Allocation error: the arena could not grow by its configured delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of cell memory")
    }
}

impl From<AllocError> for SlipError {
    fn from(_: AllocError) -> SlipError {
        SlipError::OutOfMemory
    }
}

/// The ways a cell can be misused structurally.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misuse {
    #[error("cell is already linked into a list")]
    AlreadyLinked,
    #[error("cell is not linked into a list")]
    NotLinked,
    #[error("a header cannot be used as a value")]
    HeaderAsValue,
    #[error("cell is not a list header")]
    NotAHeader,
    #[error("a temporary cell cannot become a list header")]
    TemporaryHeader,
    #[error("cell is not a temporary")]
    NotTemporary,
    #[error("cell is not a member of the list")]
    NotAMember,
    #[error("cell is private to a reader")]
    ReaderCell,
    #[error("free links can only be written by the allocator")]
    FreeLink,
    #[error("a temporary without a payload cannot be adopted")]
    VacantTemporary,
    #[error("list is the descriptor list of another list")]
    OwnedDescriptor,
    #[error("list still owns a descriptor list")]
    HasDescriptor,
    #[error("list is still held by sublist cells")]
    SharedList,
}

/// Error returned by cell and list operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlipError {
    /// The operation would corrupt structure and was refused.
    #[error("{op}: {misuse} ({cell:?})")]
    StructuralMisuse {
        op: &'static str,
        misuse: Misuse,
        cell: CellId,
    },

    /// The cell was released to the AVSL (or recycled) after the handle was taken.
    #[error("{op}: stale reference to released cell {cell:?}")]
    StaleReference { op: &'static str, cell: CellId },

    /// A descriptor operation ran on a list without a descriptor list.
    #[error("{op}: list {list:?} has no descriptor list")]
    MissingDescriptorList { op: &'static str, list: CellId },

    /// A split was asked to cut at the header itself.
    #[error("{op}: the header of {list:?} cannot be a split boundary")]
    SplitAtHeader { op: &'static str, list: CellId },

    /// Top or bottom of an empty list was read, removed or replaced.
    #[error("{op}: list {list:?} is empty")]
    EmptyList { op: &'static str, list: CellId },

    /// A reference count would have gone below zero or past its maximum.
    #[error("{op}: reference count out of range on {cell:?}")]
    RefCount { op: &'static str, cell: CellId },

    /// Links or the free list do not describe a valid structure.
    #[error("{op}: arena corruption at {cell:?}: {reason}")]
    Corrupted {
        op: &'static str,
        cell: CellId,
        reason: &'static str,
    },

    /// The arena could not grow.
    #[error("out of cell memory")]
    OutOfMemory,
}

impl SlipError {
    /// Name of the operation that failed
    pub fn op(&self) -> &'static str {
        match self {
            SlipError::StructuralMisuse { op, .. }
            | SlipError::StaleReference { op, .. }
            | SlipError::MissingDescriptorList { op, .. }
            | SlipError::SplitAtHeader { op, .. }
            | SlipError::EmptyList { op, .. }
            | SlipError::RefCount { op, .. }
            | SlipError::Corrupted { op, .. } => op,
            SlipError::OutOfMemory => "allocate",
        }
    }

    /// The cell the error is about, if any
    pub fn cell(&self) -> Option<CellId> {
        match self {
            SlipError::StructuralMisuse { cell, .. }
            | SlipError::StaleReference { cell, .. }
            | SlipError::RefCount { cell, .. }
            | SlipError::Corrupted { cell, .. } => Some(*cell),
            SlipError::MissingDescriptorList { list, .. }
            | SlipError::SplitAtHeader { list, .. }
            | SlipError::EmptyList { list, .. } => Some(*list),
            SlipError::OutOfMemory => None,
        }
    }

    /// Stale references, corruption and exhaustion abort the operation chain. Everything
    /// else degrades to a no-op or a sentinel.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SlipError::StaleReference { .. }
                | SlipError::RefCount { .. }
                | SlipError::Corrupted { .. }
                | SlipError::OutOfMemory
        )
    }
}

/// A reported diagnostic, kept by the arena so callers can inspect the last failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub op: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub cell_dump: String,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(error: &SlipError, caller: &'static Location<'static>, cell_dump: String) -> Self {
        Diagnostic {
            op: error.op(),
            file: caller.file(),
            line: caller.line(),
            cell_dump,
            message: error.to_string(),
        }
    }

    /// Emit the diagnostic at the level matching the error's severity.
    pub(crate) fn emit(&self, fatal: bool) {
        if fatal {
            tracing::error!(
                op = self.op,
                caller = %format_args!("{}:{}", self.file, self.line),
                cell = %self.cell_dump,
                "{}",
                self.message
            );
        } else {
            tracing::warn!(
                op = self.op,
                caller = %format_args!("{}:{}", self.file, self.line),
                cell = %self.cell_dump,
                "{}",
                self.message
            );
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{}: {} [{}]",
            self.op, self.file, self.line, self.message, self.cell_dump
        )
    }
}
