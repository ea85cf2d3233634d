//! Handles to arena cells
//!
//! `CellId` names a cell by its arena index plus the generation the cell had when the
//! handle was taken. The arena bumps a cell's generation each time the cell is released,
//! so a handle that outlives its cell is detected instead of silently aliasing whatever
//! the cell was recycled into.
//!
//! `ListHandle` is a `CellId` known to name a list header.

use core::fmt;

/// Handle to a cell in an `Avsl` arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    index: u32,
    generation: u32,
}

impl CellId {
    /// Names a cell outside the arena, in diagnostics about temporaries and the free list
    pub const TEMPORARY: CellId = CellId::new(u32::MAX, u32::MAX);

    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> CellId {
        CellId { index, generation }
    }

    /// Index of the cell in the arena
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the cell when this handle was taken
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) const fn slot(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CellId({:#010x}#{})", self.index, self.generation)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.index)
    }
}

/// Handle to a list, i.e. to the header cell anchoring it.
///
/// Holding a `ListHandle` is not itself a reference count. The creator of a list holds
/// one implicit reference which it gives up with `Avsl::delete_list`; every sublist cell
/// holds one more.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ListHandle(CellId);

impl ListHandle {
    #[inline]
    pub(crate) const fn from_id(id: CellId) -> ListHandle {
        ListHandle(id)
    }

    /// The header cell
    #[inline]
    pub const fn id(&self) -> CellId {
        self.0
    }

    #[inline]
    pub(crate) const fn index(&self) -> u32 {
        self.0.index
    }
}

impl fmt::Debug for ListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({:#010x}#{})", self.0.index, self.0.generation)
    }
}

impl From<ListHandle> for CellId {
    #[inline]
    fn from(list: ListHandle) -> CellId {
        list.0
    }
}
