//! List operations
//!
//! A list is a circular doubly linked ring anchored by a header cell. Members are datum
//! cells and sublist cells; a sublist cell holds one reference on the list it names.
//!
//! Ownership rules:
//! - The creator of a list holds an implicit reference and gives it up with `delete_list`
//! - `push`/`enqueue`/`put` of a list take a new reference for the sublist cell
//! - `pop`/`dequeue` hand the removed sublist cell's reference to the caller
//! - A list is reclaimed when `delete_list` finds its count at zero

use core::mem;

use hashbrown::HashSet;

use crate::{
    avsl::Avsl,
    cell::{Item, Link, Payload, Role},
    error::{Misuse, SlipError, SlipResult},
    handle::{CellId, ListHandle},
    header::{HeaderFields, Mark},
    pending::PendingQueue,
    sequencer::{Direction, Scope, Target},
};

impl Avsl {
    /// Create an empty list
    #[track_caller]
    pub fn new_list(&mut self) -> SlipResult<ListHandle> {
        let id = self.allocate()?;
        let index = id.index();
        let cell = self.slot_mut(index);
        cell.payload = Payload::Header(HeaderFields::new());
        cell.left = Link::Linked(index);
        cell.right = Link::Linked(index);

        Ok(ListHandle::from_id(id))
    }

    #[inline]
    pub(crate) fn header_fields(&self, index: u32) -> Option<&HeaderFields> {
        self.slot(index).header()
    }

    #[inline]
    pub(crate) fn header_fields_mut(&mut self, index: u32) -> Option<&mut HeaderFields> {
        self.slot_mut(index).header_mut()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[track_caller]
    pub fn is_empty(&self, list: ListHandle) -> SlipResult<bool> {
        let header = self.header_index("is_empty", list)?;
        Ok(self.neighbor(header, Direction::Right) == header)
    }

    /// Number of members, not counting nested lists
    #[track_caller]
    pub fn size(&self, list: ListHandle) -> SlipResult<usize> {
        let header = self.header_index("size", list)?;
        let mut count = 0;
        let mut index = self.neighbor(header, Direction::Right);
        while index != header {
            count += 1;
            index = self.neighbor(index, Direction::Right);
        }
        Ok(count)
    }

    /// First member, or `None` if the list is empty
    #[track_caller]
    pub fn top(&self, list: ListHandle) -> SlipResult<Option<CellId>> {
        self.end("top", list, Direction::Right)
    }

    /// Last member, or `None` if the list is empty
    #[track_caller]
    pub fn bot(&self, list: ListHandle) -> SlipResult<Option<CellId>> {
        self.end("bot", list, Direction::Left)
    }

    #[track_caller]
    fn end(&self, op: &'static str, list: ListHandle, end: Direction) -> SlipResult<Option<CellId>> {
        let header = self.header_index(op, list)?;
        let index = self.neighbor(header, end);
        Ok((index != header).then(|| self.id_at(index)))
    }

    /// The members of a list in order. Sublists are reported as `Item::List` without
    /// taking a reference.
    #[track_caller]
    pub fn items(&self, list: ListHandle) -> SlipResult<Vec<Item>> {
        let header = self.header_index("items", list)?;
        let mut items = Vec::new();
        let mut index = self.neighbor(header, Direction::Right);
        while index != header {
            items.push(self.item_at("items", index)?);
            index = self.neighbor(index, Direction::Right);
        }
        Ok(items)
    }

    #[track_caller]
    pub(crate) fn item_at(&self, op: &'static str, index: u32) -> SlipResult<Item> {
        match &self.slot(index).payload {
            Payload::Datum(datum) => Ok(Item::Datum(datum.clone())),
            Payload::Sublist(list) => Ok(Item::List(ListHandle::from_id(*list))),
            _ => self.fail(SlipError::Corrupted {
                op,
                cell: self.id_at(index),
                reason: "list body holds a cell that is not a value",
            }),
        }
    }

    // ========================================================================
    // Header bookkeeping
    // ========================================================================

    #[track_caller]
    pub fn ref_count(&self, list: ListHandle) -> SlipResult<u32> {
        let header = self.header_index("ref_count", list)?;
        Ok(self.header_fields(header).map_or(0, |fields| fields.ref_count.get()))
    }

    /// Take an additional reference on a list
    #[track_caller]
    pub fn increment_ref(&mut self, list: ListHandle) -> SlipResult<u32> {
        let header = self.header_index("increment_ref", list)?;
        self.hold("increment_ref", header)
    }

    /// Give up an additional reference without reclaiming. Use `delete_list` to give up
    /// the last one.
    #[track_caller]
    pub fn decrement_ref(&mut self, list: ListHandle) -> SlipResult<u32> {
        let header = self.header_index("decrement_ref", list)?;
        match self
            .header_fields_mut(header)
            .and_then(|fields| fields.ref_count.decrement())
        {
            Some(count) => Ok(count),
            None => self.fail(SlipError::RefCount {
                op: "decrement_ref",
                cell: list.id(),
            }),
        }
    }

    #[track_caller]
    fn hold(&mut self, op: &'static str, header: u32) -> SlipResult<u32> {
        match self
            .header_fields_mut(header)
            .and_then(|fields| fields.ref_count.increment())
        {
            Some(count) => Ok(count),
            None => self.fail(SlipError::RefCount {
                op,
                cell: self.id_at(header),
            }),
        }
    }

    #[track_caller]
    pub fn mark(&self, list: ListHandle) -> SlipResult<Mark> {
        let header = self.header_index("mark", list)?;
        Ok(self.header_fields(header).map_or(Mark::empty(), |fields| fields.mark))
    }

    /// Set the 15 bit user tag of a list's mark word
    #[track_caller]
    pub fn put_mark(&mut self, list: ListHandle, tag: u16) -> SlipResult<()> {
        let header = self.header_index("put_mark", list)?;
        if let Some(fields) = self.header_fields_mut(header) {
            fields.mark = fields.mark.with_user(tag);
        }
        Ok(())
    }

    /// Set the visited bit. Returns `false` if it was already set, i.e. a traversal that
    /// calls this on entry has come around a cycle.
    #[track_caller]
    pub fn visit(&mut self, list: ListHandle) -> SlipResult<bool> {
        let header = self.header_index("visit", list)?;
        Ok(self.set_visited(header, true))
    }

    /// Clear the visited bit
    #[track_caller]
    pub fn leave(&mut self, list: ListHandle) -> SlipResult<()> {
        let header = self.header_index("leave", list)?;
        self.set_visited(header, false);
        Ok(())
    }

    #[track_caller]
    pub fn is_visited(&self, list: ListHandle) -> SlipResult<bool> {
        let header = self.header_index("is_visited", list)?;
        Ok(self.is_visited_index(header))
    }

    #[inline]
    pub(crate) fn is_visited_index(&self, header: u32) -> bool {
        self.header_fields(header)
            .map_or(false, |fields| fields.mark.is_visited())
    }

    /// Returns whether the bit changed
    pub(crate) fn set_visited(&mut self, header: u32, visited: bool) -> bool {
        match self.header_fields_mut(header) {
            Some(fields) if fields.mark.is_visited() != visited => {
                fields.mark.set(Mark::VISITED, visited);
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Turn an item into a payload, taking a reference if it is a list
    #[track_caller]
    fn payload_for(&mut self, op: &'static str, item: Item) -> SlipResult<Payload> {
        match item {
            Item::Datum(datum) => Ok(Payload::Datum(datum)),
            Item::List(list) => {
                let header = self.header_index(op, list)?;
                self.hold(op, header)?;
                Ok(Payload::Sublist(list.id()))
            }
            Item::Header(list) => self.misuse(op, list.id(), Misuse::HeaderAsValue),
        }
    }

    /// Allocate an unlinked cell holding `item`
    #[track_caller]
    pub(crate) fn materialize(&mut self, op: &'static str, item: Item) -> SlipResult<u32> {
        let index = self.allocate()?.index();
        match self.payload_for(op, item) {
            Ok(payload) => {
                self.slot_mut(index).payload = payload;
                Ok(index)
            }
            Err(error) => {
                self.release_run(op, index, index)?;
                Err(error)
            }
        }
    }

    /// Insert at the top
    #[track_caller]
    pub fn push(&mut self, list: ListHandle, item: impl Into<Item>) -> SlipResult<CellId> {
        let header = self.header_index("push", list)?;
        let index = self.materialize("push", item.into())?;
        let top = self.neighbor(header, Direction::Right);
        self.link_between(header, index, top);
        Ok(self.id_at(index))
    }

    /// Insert at the bottom
    #[track_caller]
    pub fn enqueue(&mut self, list: ListHandle, item: impl Into<Item>) -> SlipResult<CellId> {
        let header = self.header_index("enqueue", list)?;
        let index = self.materialize("enqueue", item.into())?;
        let bottom = self.neighbor(header, Direction::Left);
        self.link_between(bottom, index, header);
        Ok(self.id_at(index))
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove and return the top member
    #[track_caller]
    pub fn pop(&mut self, list: ListHandle) -> SlipResult<Item> {
        self.take_end("pop", list, Direction::Right)
    }

    /// Remove and return the bottom member
    #[track_caller]
    pub fn dequeue(&mut self, list: ListHandle) -> SlipResult<Item> {
        self.take_end("dequeue", list, Direction::Left)
    }

    #[track_caller]
    fn take_end(&mut self, op: &'static str, list: ListHandle, end: Direction) -> SlipResult<Item> {
        let header = self.header_index(op, list)?;
        let index = self.neighbor(header, end);
        if index == header {
            let error = SlipError::EmptyList { op, list: list.id() };
            return self.degrade(error, Item::Header(list));
        }

        let item = self.item_at(op, index)?;
        self.unlink_index(index);
        self.release_run(op, index, index)?;
        Ok(item)
    }

    /// Remove the top member and release anything it held
    #[track_caller]
    pub fn delete_top(&mut self, list: ListHandle) -> SlipResult<()> {
        if let Item::List(held) = self.take_end("delete_top", list, Direction::Right)? {
            self.delete_list(held)?;
        }
        Ok(())
    }

    /// Remove the bottom member and release anything it held
    #[track_caller]
    pub fn delete_bot(&mut self, list: ListHandle) -> SlipResult<()> {
        if let Item::List(held) = self.take_end("delete_bot", list, Direction::Left)? {
            self.delete_list(held)?;
        }
        Ok(())
    }

    /// Overwrite the top member in place
    #[track_caller]
    pub fn replace_top(&mut self, list: ListHandle, item: impl Into<Item>) -> SlipResult<()> {
        self.replace_end("replace_top", list, Direction::Right, item.into())
    }

    /// Overwrite the bottom member in place
    #[track_caller]
    pub fn replace_bot(&mut self, list: ListHandle, item: impl Into<Item>) -> SlipResult<()> {
        self.replace_end("replace_bot", list, Direction::Left, item.into())
    }

    #[track_caller]
    fn replace_end(&mut self, op: &'static str, list: ListHandle, end: Direction, item: Item) -> SlipResult<()> {
        let header = self.header_index(op, list)?;
        let index = self.neighbor(header, end);
        if index == header {
            return self.degrade(SlipError::EmptyList { op, list: list.id() }, ());
        }
        self.replace_payload(op, index, item)
    }

    /// Swap the payload of a member cell, releasing the hold of a replaced sublist
    #[track_caller]
    pub(crate) fn replace_payload(&mut self, op: &'static str, index: u32, item: Item) -> SlipResult<()> {
        let payload = self.payload_for(op, item)?;
        let old = mem::replace(&mut self.slot_mut(index).payload, payload);
        if let Payload::Sublist(held) = old {
            self.delete_list(ListHandle::from_id(held))?;
        }
        Ok(())
    }

    /// Queue the referents of every sublist cell in `first..=last`
    fn queue_holds(&self, first: u32, last: u32, pending: &mut PendingQueue) {
        let mut index = first;
        loop {
            if let Some(held) = self.slot(index).sublist() {
                pending.push(held);
            }
            if index == last {
                break;
            }
            index = self.neighbor(index, Direction::Right);
        }
    }

    /// Release every member, keeping the header and its descriptor list
    #[track_caller]
    pub fn flush(&mut self, list: ListHandle) -> SlipResult<()> {
        let header = self.header_index("flush", list)?;
        let first = self.neighbor(header, Direction::Right);
        if first == header {
            return Ok(());
        }
        let last = self.neighbor(header, Direction::Left);

        let mut pending = PendingQueue::new();
        self.queue_holds(first, last, &mut pending);

        let cell = self.slot_mut(header);
        cell.left = Link::Linked(header);
        cell.right = Link::Linked(header);

        let released = self.release_run("flush", first, last)?;
        tracing::trace!(list = ?list, released, "flushed list");

        self.drain_pending(&mut pending)
    }

    /// Give up one reference on a list; reclaim it when none are left.
    ///
    /// Reclaiming releases the whole ring in one splice, drops the holds of its sublist
    /// cells and deletes its descriptor list. Deleting an already deleted list is a
    /// no-op. The last reference to a descriptor list belongs to its owner, so reclaiming
    /// one here is refused.
    #[track_caller]
    pub fn delete_list(&mut self, list: ListHandle) -> SlipResult<()> {
        if !self.is_live(list.id()) {
            tracing::debug!(list = ?list, "delete_list on a released list, nothing to do");
            return Ok(());
        }
        let Some(fields) = self.header_fields(list.index()) else {
            return self.misuse("delete_list", list.id(), Misuse::NotAHeader);
        };
        // Only the owner may reclaim its descriptor list
        if fields.owner.is_some() && !fields.ref_count.is_shared() {
            return self.misuse("delete_list", list.id(), Misuse::OwnedDescriptor);
        }

        let mut pending = PendingQueue::new();
        pending.push(list.id());
        self.drain_pending(&mut pending)
    }

    #[track_caller]
    fn drain_pending(&mut self, pending: &mut PendingQueue) -> SlipResult<()> {
        while let Some(id) = pending.pop() {
            // A cycle can queue a list that an earlier iteration already reclaimed
            if !self.is_live(id) {
                continue;
            }

            let header = id.index();
            let Some(fields) = self.header_fields_mut(header) else {
                continue;
            };

            if fields.ref_count.is_shared() {
                fields.ref_count.decrement();
                continue;
            }

            if let Some(descriptor) = self.detach_descriptor(header) {
                pending.push(descriptor);
            }

            let last = self.neighbor(header, Direction::Left);
            if last != header {
                let first = self.neighbor(header, Direction::Right);
                self.queue_holds(first, last, pending);
            }

            let released = self.release_run("delete_list", header, last)?;
            tracing::trace!(list = %id, released, "reclaimed list");
        }
        Ok(())
    }

    // ========================================================================
    // Splitting
    // ========================================================================

    /// Move the members from the top through `x` into a new list
    #[track_caller]
    pub fn split_left(&mut self, list: ListHandle, x: CellId) -> SlipResult<ListHandle> {
        let header = self.header_index("split_left", list)?;
        if x.index() == header {
            return self.fail(SlipError::SplitAtHeader {
                op: "split_left",
                list: list.id(),
            });
        }
        let index = self.live("split_left", x)?;

        let first = self.neighbor(header, Direction::Right);
        self.check_run("split_left", header, first, index)?;

        let split = self.new_list()?;
        self.move_run(first, index, split.index());
        Ok(split)
    }

    /// Move the members from `x` through the bottom into a new list
    #[track_caller]
    pub fn split_right(&mut self, list: ListHandle, x: CellId) -> SlipResult<ListHandle> {
        let header = self.header_index("split_right", list)?;
        if x.index() == header {
            return self.fail(SlipError::SplitAtHeader {
                op: "split_right",
                list: list.id(),
            });
        }
        let index = self.live("split_right", x)?;

        let last = self.neighbor(header, Direction::Left);
        self.check_run("split_right", header, index, last)?;

        let split = self.new_list()?;
        self.move_run(index, last, split.index());
        Ok(split)
    }

    // ========================================================================
    // Copying
    // ========================================================================

    /// Copy a list and its descriptor list chain.
    ///
    /// The copy is one level deep: sublist cells are copied as new references to the
    /// same lists.
    #[track_caller]
    pub fn copy_list(&mut self, src: ListHandle) -> SlipResult<ListHandle> {
        let header = self.header_index("copy_list", src)?;
        let copy = self.new_list()?;
        if let Err(error) = self.copy_into(header, copy.index()) {
            self.delete_list(copy)?;
            return Err(error);
        }
        Ok(copy)
    }

    #[track_caller]
    fn copy_into(&mut self, src: u32, dst: u32) -> SlipResult<()> {
        self.copy_body("copy_list", src, dst)?;

        let mut from = src;
        let mut to = dst;
        while let Some(descriptor) = self.stored_descriptor("copy_list", from)? {
            // Attach first so a failed copy is reclaimed with its owner
            let copy = self.new_list()?;
            self.attach_descriptor(to, copy.index());
            self.copy_body("copy_list", descriptor, copy.index())?;
            from = descriptor;
            to = copy.index();
        }
        Ok(())
    }

    /// Append copies of the members of `src` to the bottom of `dst`
    #[track_caller]
    pub(crate) fn copy_body(&mut self, op: &'static str, src: u32, dst: u32) -> SlipResult<()> {
        let mut index = self.neighbor(src, Direction::Right);
        while index != src {
            let item = self.item_at(op, index)?;
            let copy = self.materialize(op, item)?;
            let bottom = self.neighbor(dst, Direction::Left);
            self.link_between(bottom, copy, dst);
            index = self.neighbor(index, Direction::Right);
        }
        Ok(())
    }

    /// Move the body and descriptor list of the list at `from` into the empty list at `to`
    fn transfer(&mut self, from: u32, to: u32) {
        let first = self.neighbor(from, Direction::Right);
        if first != from {
            let last = self.neighbor(from, Direction::Left);
            self.move_run(first, last, to);
        }

        if let Some(descriptor) = self.detach_descriptor(from) {
            self.attach_descriptor(to, descriptor.index());
        }
    }

    /// Make `dst` a copy of `src`, keeping `dst`'s header and therefore its identity.
    ///
    /// The copy is built before `dst` is touched, so running out of memory leaves `dst`
    /// as it was.
    #[track_caller]
    pub fn assign(&mut self, dst: ListHandle, src: ListHandle) -> SlipResult<()> {
        let to = self.header_index("assign", dst)?;
        let from = self.header_index("assign", src)?;
        if to == from {
            return Ok(());
        }

        let staging = self.copy_list(src)?;
        self.flush(dst)?;
        self.delete_descriptor_list(dst)?;
        self.transfer(staging.index(), to);
        self.release_run("assign", staging.index(), staging.index())?;
        Ok(())
    }

    /// Append copies of the members of `src` to the bottom of `dst`. `src` may be `dst`.
    #[track_caller]
    pub fn append(&mut self, dst: ListHandle, src: ListHandle) -> SlipResult<()> {
        let to = self.header_index("append", dst)?;
        let from = self.header_index("append", src)?;

        let staging = self.new_list()?;
        if let Err(error) = self.copy_body("append", from, staging.index()) {
            self.delete_list(staging)?;
            return Err(error);
        }

        let first = self.neighbor(staging.index(), Direction::Right);
        if first != staging.index() {
            let last = self.neighbor(staging.index(), Direction::Left);
            self.move_run(first, last, to);
        }
        self.release_run("append", staging.index(), staging.index())?;
        Ok(())
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Structural congruence: both lists have the same sequence of roles (header,
    /// sublist, datum kind), descending into sublists. Datum values are not compared.
    ///
    /// A sublist that leads back to a list already on the current path is compared as a
    /// leaf, so cyclic structures compare in finite time.
    #[track_caller]
    pub fn is_equal(&self, a: ListHandle, b: ListHandle) -> SlipResult<bool> {
        let left = self.header_index("is_equal", a)?;
        let right = self.header_index("is_equal", b)?;
        if left == right {
            return Ok(true);
        }

        let mut left = StructuralWalk::new(left);
        let mut right = StructuralWalk::new(right);
        loop {
            match (left.advance(self), right.advance(self)) {
                (None, None) => return Ok(true),
                (Some(x), Some(y)) if x == y => {}
                _ => return Ok(false),
            }
        }
    }
}

/// Depth-first walk over a list and everything reachable from it.
///
/// The walk keeps its own path instead of using the visited bit, so two walks can be
/// in progress over the same lists.
struct StructuralWalk {
    top: u32,
    current: u32,
    /// Sublist cells descended through, innermost last
    path: Vec<u32>,
    /// Headers on the path, including the top
    on_path: HashSet<u32>,
    ascended: bool,
}

impl StructuralWalk {
    fn new(top: u32) -> StructuralWalk {
        let mut on_path = HashSet::new();
        on_path.insert(top);
        StructuralWalk {
            top,
            current: top,
            path: Vec::new(),
            on_path,
            ascended: false,
        }
    }

    /// Step to the next cell and report its role. A nested list's header is reported on
    /// the way out; `None` means the walk is back at the top.
    fn advance(&mut self, avsl: &Avsl) -> Option<Role> {
        let descend = match avsl.slot(self.current).sublist() {
            Some(list) if !self.ascended && !self.on_path.contains(&list.index()) => Some(list.index()),
            _ => None,
        };

        self.current = match descend {
            Some(header) => {
                self.path.push(self.current);
                self.on_path.insert(header);
                avsl.advance_index(self.current, Scope::Structural, Target::Word, Direction::Right)
            }
            None => avsl.advance_index(self.current, Scope::Linear, Target::Word, Direction::Right),
        };
        self.ascended = false;

        let role = avsl.slot(self.current).role();
        if role == Role::Header {
            if self.current == self.top {
                return None;
            }
            if let Some(sublist) = self.path.pop() {
                self.on_path.remove(&self.current);
                self.current = sublist;
                self.ascended = true;
            }
        }
        Some(role)
    }
}
