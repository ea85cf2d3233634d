//! SLIP cells
//!
//! Symmetric list processing on an explicitly managed cell arena.
//! Lists are circular doubly linked rings of cells anchored by a header. Lists nest by
//! reference and may share or cycle; reclamation is by reference count and is explicit.
//!
//! Key types:
//! - `Avsl`: The cell arena and its available space list; all operations are methods on it
//! - `CellId`, `ListHandle`: Generational handles to cells and lists
//! - `Sequencer`: Cursor that moves along linear or structural axes
//! - `Reader`: Depth-first leaf iterator that climbs out of nested lists itself
//!
//! Key traits:
//! - `ListVisitor`: Callbacks for a cycle-safe recursive walk

mod avsl;
mod cell;
mod descriptor;
mod dump;
mod error;
pub mod global;
mod handle;
mod header;
mod link;
mod list;
mod options;
mod pending;
mod reader;
mod sequencer;
mod visitor;

pub use avsl::{Avsl, AvslAudit, AvslStats, Fragment};
pub use cell::{Cell, Datum, DatumKind, Item, Link, Payload, Role};
pub use error::{AllocError, AllocResult, Diagnostic, Misuse, SlipError, SlipResult};
pub use handle::{CellId, ListHandle};
pub use header::{HeaderFields, Mark, RefCount};
pub use options::{ErrorPolicy, Options, OptionsBuilder, DEFAULT_GROWTH_DELTA, DEFAULT_INITIAL_CELLS};
pub use reader::Reader;
pub use sequencer::{Direction, Scope, Sequencer, Target};
pub use visitor::ListVisitor;
