//! Link operations
//!
//! Insertion, unlinking and moving runs of cells between lists. These only rewrite link
//! slots; allocation and reference counts are handled by the list operations.

use crate::{
    avsl::Avsl,
    cell::Link,
    error::{Misuse, SlipResult},
    handle::{CellId, ListHandle},
    sequencer::Direction,
};

impl Avsl {
    /// Neighbour of a linked cell. An unlinked cell is its own neighbour.
    #[inline]
    pub(crate) fn neighbor(&self, index: u32, direction: Direction) -> u32 {
        let cell = self.slot(index);
        let link = match direction {
            Direction::Left => cell.left,
            Direction::Right => cell.right,
        };
        link.linked().unwrap_or(index)
    }

    /// Link the unlinked cell `x` immediately left of `at`
    #[track_caller]
    pub fn insert_left(&mut self, at: CellId, x: CellId) -> SlipResult<()> {
        self.insert("insert_left", at, x, Direction::Left)
    }

    /// Link the unlinked cell `x` immediately right of `at`
    #[track_caller]
    pub fn insert_right(&mut self, at: CellId, x: CellId) -> SlipResult<()> {
        self.insert("insert_right", at, x, Direction::Right)
    }

    #[track_caller]
    fn insert(&mut self, op: &'static str, at: CellId, x: CellId, side: Direction) -> SlipResult<()> {
        let at_index = self.live(op, at)?;
        let x_index = self.live(op, x)?;

        if !self.slot(at_index).is_linked() {
            return self.misuse(op, at, Misuse::NotLinked);
        }

        let cell = self.slot(x_index);
        if cell.is_header() {
            return self.misuse(op, x, Misuse::HeaderAsValue);
        }
        if cell.is_reader() {
            return self.misuse(op, x, Misuse::ReaderCell);
        }
        if !cell.is_unlinked() {
            return self.misuse(op, x, Misuse::AlreadyLinked);
        }

        match side {
            Direction::Left => {
                let left = self.neighbor(at_index, Direction::Left);
                self.link_between(left, x_index, at_index);
            }
            Direction::Right => {
                let right = self.neighbor(at_index, Direction::Right);
                self.link_between(at_index, x_index, right);
            }
        }

        tracing::trace!(op, at = %at, cell = %x, "linked cell");
        Ok(())
    }

    /// Link `x` between two adjacent cells
    #[inline]
    pub(crate) fn link_between(&mut self, left: u32, x: u32, right: u32) {
        self.slot_mut(left).right = Link::Linked(x);
        let cell = self.slot_mut(x);
        cell.left = Link::Linked(left);
        cell.right = Link::Linked(right);
        self.slot_mut(right).left = Link::Linked(x);
    }

    /// Detach a cell from its list, leaving it unlinked but allocated.
    ///
    /// The cell keeps its payload, and a sublist cell keeps its hold.
    #[track_caller]
    pub fn unlink(&mut self, x: CellId) -> SlipResult<CellId> {
        let index = self.live("unlink", x)?;
        let cell = self.slot(index);
        if cell.is_header() {
            return self.misuse("unlink", x, Misuse::HeaderAsValue);
        }
        if !cell.is_linked() {
            return self.misuse("unlink", x, Misuse::NotLinked);
        }

        self.unlink_index(index);
        tracing::trace!(cell = %x, "unlinked cell");
        Ok(x)
    }

    pub(crate) fn unlink_index(&mut self, index: u32) {
        let left = self.neighbor(index, Direction::Left);
        let right = self.neighbor(index, Direction::Right);
        self.slot_mut(left).right = Link::Linked(right);
        self.slot_mut(right).left = Link::Linked(left);

        let cell = self.slot_mut(index);
        cell.left = Link::Unlinked;
        cell.right = Link::Unlinked;
    }

    /// Move the run `from..=to` of `list` into a brand new list.
    #[track_caller]
    pub fn splice(&mut self, list: ListHandle, from: CellId, to: CellId) -> SlipResult<ListHandle> {
        let header = self.header_index("splice", list)?;
        let from_index = self.live("splice", from)?;
        let to_index = self.live("splice", to)?;

        self.check_run("splice", header, from_index, to_index)?;

        // Allocate before any link changes so a failure leaves the list untouched
        let spliced = self.new_list()?;
        self.move_run(from_index, to_index, spliced.index());

        Ok(spliced)
    }

    /// Check that `from..=to` is a run of body cells of the list anchored at `header`
    #[track_caller]
    pub(crate) fn check_run(&self, op: &'static str, header: u32, from: u32, to: u32) -> SlipResult<()> {
        if self.slot(from).is_header() || !self.slot(from).is_linked() {
            return self.misuse(op, self.id_at(from), Misuse::NotAMember);
        }

        let limit = self.stats().total;
        let mut index = from;
        let mut steps = 0;
        while index != to {
            index = self.neighbor(index, Direction::Right);
            steps += 1;
            if self.slot(index).is_header() || steps > limit {
                return self.misuse(op, self.id_at(to), Misuse::NotAMember);
            }
        }

        while !self.slot(index).is_header() {
            index = self.neighbor(index, Direction::Right);
            steps += 1;
            if steps > limit {
                break;
            }
        }

        if index == header {
            Ok(())
        } else {
            self.misuse(op, self.id_at(from), Misuse::NotAMember)
        }
    }

    /// Cut `from..=to` out of its list and link it at the bottom of `dest`
    pub(crate) fn move_run(&mut self, from: u32, to: u32, dest: u32) {
        let left = self.neighbor(from, Direction::Left);
        let right = self.neighbor(to, Direction::Right);
        self.slot_mut(left).right = Link::Linked(right);
        self.slot_mut(right).left = Link::Linked(left);

        let bottom = self.neighbor(dest, Direction::Left);
        self.slot_mut(bottom).right = Link::Linked(from);
        self.slot_mut(from).left = Link::Linked(bottom);
        self.slot_mut(to).right = Link::Linked(dest);
        self.slot_mut(dest).left = Link::Linked(to);
    }
}
