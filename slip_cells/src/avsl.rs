//! AVSL - the available space list
//!
//! Design:
//! - One `Vec<Cell>` backs every cell the arena ever hands out; indices are stable
//! - Free cells are threaded into a singly linked free list through their right slot
//! - When the free list runs dry the arena grows by `growth_delta` cells (a fragment)
//! - Lists are returned as a whole run: the run is spliced onto the free list at once
//!
//! Nothing is collected automatically. Cells come back only through `release`,
//! `delete_cell` or the list operations built on them.

use core::cell::RefCell;
use core::mem;
use core::panic::Location;

use serde::Serialize;

use crate::{
    cell::{Cell, Datum, Link, Payload, Role},
    error::{AllocError, AllocResult, Diagnostic, Misuse, SlipError, SlipResult},
    handle::{CellId, ListHandle},
    header::HeaderFields,
    options::{ErrorPolicy, Options},
};

/// Cells are addressed by `u32`
const MAX_CELLS: usize = u32::MAX as usize;

/// A contiguous run of cells granted to the arena in one growth event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub start: u32,
    pub len: u32,
}

/// Snapshot of allocator counters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AvslStats {
    /// Cells owned by the arena, live or free
    pub total: usize,
    /// Cells on the free list
    pub available: usize,
    /// Number of growth events since creation or the last reset
    pub allocation_increments: usize,
    /// Cells added per growth event
    pub growth_delta: usize,
}

/// Result of a full audit of the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AvslAudit {
    /// Cells not on the free list
    pub live: usize,
    /// Cells on the free list
    pub available: usize,
    /// Live list headers
    pub lists: usize,
}

/// The cell arena and its available space list
pub struct Avsl {
    cells: Vec<Cell>,

    /// Head of the free list
    free_head: Option<u32>,

    /// Number of cells on the free list
    available: usize,

    fragments: Vec<Fragment>,

    /// Growth events since creation or the last reset
    increments: usize,

    /// Generation stamped on cells of new fragments
    epoch: u32,

    /// Highest generation ever stamped, so a reset never reuses one
    high_water: u32,

    options: Options,

    error_policy: ErrorPolicy,

    last_diagnostic: RefCell<Option<Diagnostic>>,
}

impl Avsl {
    /// Create an arena and carve out its first fragment
    pub fn new(options: Options) -> Avsl {
        let mut avsl = Avsl {
            cells: Vec::new(),
            free_head: None,
            available: 0,
            fragments: Vec::new(),
            increments: 0,
            epoch: 0,
            high_water: 0,
            options,
            error_policy: ErrorPolicy::default(),
            last_diagnostic: RefCell::new(None),
        };
        avsl.push_fragment(options.initial_cells.min(MAX_CELLS));
        avsl
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    #[inline]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    #[inline]
    pub fn set_error_policy(&mut self, error_policy: ErrorPolicy) {
        self.error_policy = error_policy;
    }

    pub fn stats(&self) -> AvslStats {
        AvslStats {
            total: self.cells.len(),
            available: self.available,
            allocation_increments: self.increments,
            growth_delta: self.options.growth_delta,
        }
    }

    /// Fragments in the order they were granted, starting with the initial one
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// The most recent diagnostic reported by any operation
    pub fn last_diagnostic(&self) -> Option<Diagnostic> {
        self.last_diagnostic.borrow().clone()
    }

    /// Discard every cell and rebuild the initial fragment.
    ///
    /// Handles taken before the reset are stale afterwards: the new cells start at a
    /// generation no earlier cell ever had.
    pub fn reset_to_pristine(&mut self) {
        let discarded = self.cells.len() - self.available;
        self.cells = Vec::new();
        self.free_head = None;
        self.available = 0;
        self.fragments.clear();
        self.increments = 0;
        self.epoch = self.high_water.wrapping_add(1);
        self.high_water = self.epoch;
        self.last_diagnostic.replace(None);
        self.push_fragment(self.options.initial_cells.min(MAX_CELLS));

        tracing::debug!(discarded, "reset cell arena to pristine state");
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Take one cell off the free list, growing the arena if it is empty.
    ///
    /// The cell comes back unlinked and vacant; a constructor stamps its payload.
    #[track_caller]
    pub fn allocate(&mut self) -> SlipResult<CellId> {
        if self.free_head.is_none() {
            if let Err(error) = self.grow() {
                return self.exhausted(error);
            }
        }

        let index = match self.free_head {
            Some(index) => index,
            None => return self.exhausted(AllocError),
        };

        let cell = &mut self.cells[index as usize];
        let next = match cell.right {
            Link::Free(next) => next,
            _ => {
                let id = CellId::new(index, cell.generation);
                return self.fail(SlipError::Corrupted {
                    op: "allocate",
                    cell: id,
                    reason: "free list threads through a live cell",
                });
            }
        };

        cell.left = Link::Unlinked;
        cell.right = Link::Unlinked;
        let id = CellId::new(index, cell.generation);

        self.free_head = next;
        self.available -= 1;

        Ok(id)
    }

    /// Add one fragment of `growth_delta` cells to the free list
    fn grow(&mut self) -> AllocResult<()> {
        let delta = self.options.growth_delta;
        if delta == 0
            || self.cells.len() + delta > MAX_CELLS
            || self.cells.try_reserve(delta).is_err()
        {
            return Err(AllocError);
        }

        self.push_fragment(delta);
        self.increments += 1;

        tracing::debug!(
            delta,
            total = self.cells.len(),
            increments = self.increments,
            "grew cell arena"
        );

        Ok(())
    }

    fn push_fragment(&mut self, len: usize) {
        if len == 0 {
            return;
        }

        let start = self.cells.len() as u32;
        let end = start + len as u32;

        // New cells are threaded in index order, the last one onto the old head
        for index in start..end {
            let next = if index + 1 < end {
                Some(index + 1)
            } else {
                self.free_head
            };
            self.cells.push(Cell::free(next, self.epoch));
        }

        self.free_head = Some(start);
        self.available += len;
        self.fragments.push(Fragment {
            start,
            len: len as u32,
        });
    }

    #[track_caller]
    fn exhausted<T>(&self, error: AllocError) -> SlipResult<T> {
        #[cfg(feature = "alloc_error")]
        {
            self.fail(SlipError::from(error))
        }

        #[cfg(not(feature = "alloc_error"))]
        {
            panic!("{}", error);
        }
    }

    /// Return a run of cells to the free list.
    ///
    /// `first..=last` must be chained by right links and detached from any live list:
    /// either a run of member cells unlinked at both ends, or a whole list starting at
    /// its header. A whole list must not be held by sublist cells and must not own or be
    /// a descriptor list. Holds that sublist cells in the run have on other lists are not
    /// released; that is the job of the list operations.
    #[track_caller]
    pub fn release(&mut self, first: CellId, last: CellId) -> SlipResult<usize> {
        let first = self.live("release", first)?;
        let last = self.live("release", last)?;
        self.check_detached(first, last)?;
        self.release_run("release", first, last)
    }

    #[track_caller]
    fn check_detached(&self, first: u32, last: u32) -> SlipResult<()> {
        let head = self.slot(first);
        match head.header() {
            Some(fields) => {
                if fields.ref_count.is_shared() {
                    return self.misuse("release", self.id_at(first), Misuse::SharedList);
                }
                if fields.owner.is_some() {
                    return self.misuse("release", self.id_at(first), Misuse::OwnedDescriptor);
                }
                if fields.descriptor.is_some() {
                    return self.misuse("release", self.id_at(first), Misuse::HasDescriptor);
                }
                // The run must close the ring, or the header's bottom stays linked to it
                if head.left != Link::Linked(last) {
                    return self.misuse("release", self.id_at(last), Misuse::AlreadyLinked);
                }
            }
            None => {
                if head.left.linked().is_some() {
                    return self.misuse("release", self.id_at(first), Misuse::AlreadyLinked);
                }
                if self.slot(last).right.linked().is_some() {
                    return self.misuse("release", self.id_at(last), Misuse::AlreadyLinked);
                }
            }
        }

        // A header inside the run would take its list down with it
        let mut index = first;
        let mut steps = 0;
        while index != last && steps < self.cells.len() {
            let Some(next) = self.slot(index).right.linked() else {
                break;
            };
            index = next;
            steps += 1;
            if self.slot(index).is_header() {
                return self.misuse("release", self.id_at(index), Misuse::HeaderAsValue);
            }
        }
        Ok(())
    }

    #[track_caller]
    pub(crate) fn release_run(&mut self, op: &'static str, first: u32, last: u32) -> SlipResult<usize> {
        // Validate the whole run before touching any of it
        let mut count = 1;
        let mut index = first;
        while index != last {
            match self.cells[index as usize].right {
                Link::Linked(next) if count < self.cells.len() && !self.slot(next).is_deleted() => {
                    index = next;
                    count += 1;
                }
                _ => {
                    return self.fail(SlipError::Corrupted {
                        op,
                        cell: self.id_at(index),
                        reason: "run is not chained by right links",
                    })
                }
            }
        }

        // Splice the run onto the free list, stamping each cell on the way
        let old_head = self.free_head;
        let mut index = first;
        loop {
            let cell = &mut self.cells[index as usize];
            let next = if index == last {
                None
            } else {
                cell.right.linked()
            };

            cell.left = Link::Free(None);
            cell.right = Link::Free(next.or(old_head));
            cell.generation = cell.generation.wrapping_add(1);
            cell.payload = Payload::Vacant;
            self.high_water = self.high_water.max(cell.generation);

            match next {
                Some(next) => index = next,
                None => break,
            }
        }

        self.free_head = Some(first);
        self.available += count;

        tracing::trace!(op, count, available = self.available, "released run");

        #[cfg(feature = "avsl_verify")]
        if let Err(error) = self.verify() {
            panic!("arena audit failed after {op}: {error}");
        }

        Ok(count)
    }

    // ========================================================================
    // Cell access
    // ========================================================================

    #[inline]
    pub(crate) fn slot(&self, index: u32) -> &Cell {
        &self.cells[index as usize]
    }

    #[inline]
    pub(crate) fn slot_mut(&mut self, index: u32) -> &mut Cell {
        &mut self.cells[index as usize]
    }

    /// Handle to the cell at `index` as it is now
    #[inline]
    pub(crate) fn id_at(&self, index: u32) -> CellId {
        let generation = self.cells.get(index as usize).map_or(0, |cell| cell.generation);
        CellId::new(index, generation)
    }

    #[inline]
    pub(crate) fn list_at(&self, index: u32) -> ListHandle {
        ListHandle::from_id(self.id_at(index))
    }

    /// Whether `id` still names the cell it was taken from, and that cell is not free
    #[inline]
    pub fn is_live(&self, id: CellId) -> bool {
        self.cells
            .get(id.slot())
            .map_or(false, |cell| cell.generation == id.generation() && !cell.is_deleted())
    }

    #[track_caller]
    pub(crate) fn live(&self, op: &'static str, id: CellId) -> SlipResult<u32> {
        if self.is_live(id) {
            Ok(id.index())
        } else {
            self.fail(SlipError::StaleReference { op, cell: id })
        }
    }

    /// Index of a live list header
    #[track_caller]
    pub(crate) fn header_index(&self, op: &'static str, list: ListHandle) -> SlipResult<u32> {
        let index = self.live(op, list.id())?;
        if self.slot(index).is_header() {
            Ok(index)
        } else {
            self.misuse(op, list.id(), Misuse::NotAHeader)
        }
    }

    /// Read a cell
    #[track_caller]
    pub fn cell(&self, id: CellId) -> SlipResult<&Cell> {
        let index = self.live("cell", id)?;
        Ok(self.slot(index))
    }

    #[track_caller]
    pub fn role(&self, id: CellId) -> SlipResult<Role> {
        let index = self.live("role", id)?;
        Ok(self.slot(index).role())
    }

    // ========================================================================
    // Role predicates
    // ========================================================================

    #[inline]
    pub fn is_header(&self, id: CellId) -> bool {
        self.is_live(id) && self.slot(id.index()).is_header()
    }

    #[inline]
    pub fn is_sublist(&self, id: CellId) -> bool {
        self.is_live(id) && self.slot(id.index()).is_sublist()
    }

    #[inline]
    pub fn is_data(&self, id: CellId) -> bool {
        self.is_live(id) && self.slot(id.index()).is_data()
    }

    #[inline]
    pub fn is_reader(&self, id: CellId) -> bool {
        self.is_live(id) && self.slot(id.index()).is_reader()
    }

    /// The cell was released since `id` was taken, whether or not it has been reused
    #[inline]
    pub fn is_deleted(&self, id: CellId) -> bool {
        !self.is_live(id)
    }

    #[inline]
    pub fn is_unlinked(&self, id: CellId) -> bool {
        self.is_live(id) && self.slot(id.index()).is_unlinked()
    }

    // ========================================================================
    // Raw links
    // ========================================================================

    #[track_caller]
    pub fn left_link(&self, id: CellId) -> SlipResult<Link> {
        let index = self.live("left_link", id)?;
        Ok(self.slot(index).left)
    }

    #[track_caller]
    pub fn right_link(&self, id: CellId) -> SlipResult<Link> {
        let index = self.live("right_link", id)?;
        Ok(self.slot(index).right)
    }

    /// Overwrite the left slot. The caller is responsible for keeping lists circular.
    #[track_caller]
    pub fn set_left_link(&mut self, id: CellId, link: Link) -> SlipResult<()> {
        let index = self.live("set_left_link", id)?;
        self.check_link("set_left_link", id, link)?;
        self.slot_mut(index).left = link;
        Ok(())
    }

    /// Overwrite the right slot. The caller is responsible for keeping lists circular.
    #[track_caller]
    pub fn set_right_link(&mut self, id: CellId, link: Link) -> SlipResult<()> {
        let index = self.live("set_right_link", id)?;
        self.check_link("set_right_link", id, link)?;
        self.slot_mut(index).right = link;
        Ok(())
    }

    #[track_caller]
    fn check_link(&self, op: &'static str, id: CellId, link: Link) -> SlipResult<()> {
        match link {
            Link::Free(_) => self.misuse(op, id, Misuse::FreeLink),
            Link::Linked(target)
                if self
                    .cells
                    .get(target as usize)
                    .map_or(true, |cell| cell.is_deleted()) =>
            {
                self.fail(SlipError::Corrupted {
                    op,
                    cell: id,
                    reason: "link target is not a live cell",
                })
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Payloads
    // ========================================================================

    /// The datum held by a cell, or `None` if the cell is not a datum
    #[track_caller]
    pub fn datum(&self, id: CellId) -> SlipResult<Option<&Datum>> {
        let index = self.live("datum", id)?;
        match &self.slot(index).payload {
            Payload::Datum(datum) => Ok(Some(datum)),
            _ => Ok(None),
        }
    }

    /// Replace the value of a cell in place.
    ///
    /// Replacing a sublist cell releases its hold on the referenced list. Headers and
    /// reader cells cannot be given a value.
    #[track_caller]
    pub fn set_datum(&mut self, id: CellId, datum: impl Into<Datum>) -> SlipResult<()> {
        let index = self.live("set_datum", id)?;
        match self.slot(index).payload {
            Payload::Header(_) => return self.misuse("set_datum", id, Misuse::HeaderAsValue),
            Payload::Reader(_) => return self.misuse("set_datum", id, Misuse::ReaderCell),
            _ => {}
        }

        let old = mem::replace(&mut self.slot_mut(index).payload, Payload::Datum(datum.into()));
        if let Payload::Sublist(list) = old {
            self.delete_list(ListHandle::from_id(list))?;
        }

        Ok(())
    }

    /// Copy a temporary cell into a fresh, unlinked arena cell.
    ///
    /// A temporary holding a header payload is refused: a list header must be created
    /// in the arena with `new_list`. So is a temporary with no payload.
    #[track_caller]
    pub fn adopt(&mut self, cell: &Cell) -> SlipResult<CellId> {
        if !cell.is_temp() {
            return self.misuse("adopt", CellId::TEMPORARY, Misuse::NotTemporary);
        }

        let item = match &cell.payload {
            Payload::Header(_) => {
                return self.misuse("adopt", CellId::TEMPORARY, Misuse::TemporaryHeader)
            }
            Payload::Reader(_) => return self.misuse("adopt", CellId::TEMPORARY, Misuse::ReaderCell),
            Payload::Vacant => {
                return self.misuse("adopt", CellId::TEMPORARY, Misuse::VacantTemporary)
            }
            Payload::Datum(datum) => crate::Item::Datum(datum.clone()),
            Payload::Sublist(list) => crate::Item::List(ListHandle::from_id(*list)),
        };

        let index = self.materialize("adopt", item)?;
        Ok(self.id_at(index))
    }

    /// Delete a single non-header cell, unlinking it first if needed.
    #[track_caller]
    pub fn delete_cell(&mut self, id: CellId) -> SlipResult<()> {
        let index = self.live("delete_cell", id)?;
        match self.slot(index).payload {
            Payload::Header(_) => return self.misuse("delete_cell", id, Misuse::HeaderAsValue),
            Payload::Reader(_) => return self.misuse("delete_cell", id, Misuse::ReaderCell),
            _ => {}
        }

        if self.slot(index).is_linked() {
            self.unlink_index(index);
        }

        let held = self.slot(index).sublist();
        self.release_run("delete_cell", index, index)?;
        if let Some(list) = held {
            self.delete_list(ListHandle::from_id(list))?;
        }

        Ok(())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Report `error` and return it
    #[track_caller]
    pub(crate) fn fail<T>(&self, error: SlipError) -> SlipResult<T> {
        self.report(&error);
        Err(error)
    }

    #[track_caller]
    pub(crate) fn misuse<T>(&self, op: &'static str, cell: CellId, misuse: Misuse) -> SlipResult<T> {
        self.fail(SlipError::StructuralMisuse { op, misuse, cell })
    }

    /// Emit a diagnostic for `error` without failing
    #[track_caller]
    pub(crate) fn report(&self, error: &SlipError) {
        let caller = Location::caller();
        let cell_dump = match error.cell() {
            Some(id) => self.dump_index(id.index()),
            None => String::from("-"),
        };

        let diagnostic = Diagnostic::new(error, caller, cell_dump);
        diagnostic.emit(error.is_fatal());
        self.last_diagnostic.replace(Some(diagnostic));
    }

    /// Fail under `ErrorPolicy::Signal`, report and return `sentinel` otherwise
    #[track_caller]
    pub(crate) fn degrade<T>(&self, error: SlipError, sentinel: T) -> SlipResult<T> {
        match self.error_policy {
            ErrorPolicy::Signal => self.fail(error),
            ErrorPolicy::Sentinel => {
                self.report(&error);
                Ok(sentinel)
            }
        }
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Check conservation and circularity over the whole arena.
    ///
    /// Every cell is either on the free list or live; every linked cell agrees with its
    /// neighbours; every header's right walk comes back to it.
    pub fn verify(&self) -> SlipResult<AvslAudit> {
        let total = self.cells.len();

        let mut available = 0;
        let mut next = self.free_head;
        while let Some(index) = next {
            let cell = match self.cells.get(index as usize) {
                Some(cell) if cell.is_deleted() && available < total => cell,
                _ => {
                    return self.fail(SlipError::Corrupted {
                        op: "verify",
                        cell: self.id_at(index),
                        reason: "free list threads through a live cell",
                    })
                }
            };
            available += 1;
            next = match cell.right {
                Link::Free(next) => next,
                _ => None,
            };
        }

        let mut live = 0;
        let mut lists = 0;
        for (index, cell) in self.cells.iter().enumerate() {
            let index = index as u32;
            if cell.is_deleted() {
                continue;
            }
            live += 1;

            if let Some(right) = cell.right.linked() {
                if self.cells.get(right as usize).map(|cell| cell.left) != Some(Link::Linked(index)) {
                    return self.fail(SlipError::Corrupted {
                        op: "verify",
                        cell: self.id_at(index),
                        reason: "right neighbour does not link back",
                    });
                }
            }

            if let Some(fields) = cell.header() {
                lists += 1;
                self.verify_circular(index, total)?;
                self.verify_descriptor(index, fields)?;
            }
        }

        if live + available != total {
            return self.fail(SlipError::Corrupted {
                op: "verify",
                cell: CellId::TEMPORARY,
                reason: "free cells missing from the free list",
            });
        }

        if available != self.available {
            return self.fail(SlipError::Corrupted {
                op: "verify",
                cell: CellId::TEMPORARY,
                reason: "available count disagrees with the free list",
            });
        }

        Ok(AvslAudit {
            live,
            available,
            lists,
        })
    }

    /// A descriptor list and its owner must name each other
    fn verify_descriptor(&self, header: u32, fields: &HeaderFields) -> SlipResult<()> {
        let id = self.id_at(header);
        let names_back = |other: CellId, back: fn(&HeaderFields) -> Option<CellId>| {
            self.is_live(other) && self.slot(other.index()).header().and_then(back) == Some(id)
        };

        let descriptor_ok = fields
            .descriptor
            .map_or(true, |descriptor| names_back(descriptor, |fields| fields.owner));
        let owner_ok = fields
            .owner
            .map_or(true, |owner| names_back(owner, |fields| fields.descriptor));

        if descriptor_ok && owner_ok {
            Ok(())
        } else {
            self.fail(SlipError::Corrupted {
                op: "verify",
                cell: id,
                reason: "descriptor list and its owner do not name each other",
            })
        }
    }

    fn verify_circular(&self, header: u32, total: usize) -> SlipResult<()> {
        let mut index = header;
        for _ in 0..=total {
            index = match self.slot(index).right.linked() {
                Some(next) if !self.slot(next).is_deleted() => next,
                _ => break,
            };
            if index == header {
                return Ok(());
            }
        }

        self.fail(SlipError::Corrupted {
            op: "verify",
            cell: self.id_at(header),
            reason: "list does not close back on its header",
        })
    }
}

impl Default for Avsl {
    fn default() -> Self {
        Self::new(Options::default())
    }
}
