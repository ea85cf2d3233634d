//! Recursive list traversal
//!
//! `Avsl::walk` visits a list and, depth first, every list reachable through its
//! sublist cells. It sets the visited bit on each list while inside it, so a sublist
//! leading back into a list on the current path is reported through `visit_cycle`
//! instead of being entered again.

use crate::{
    avsl::Avsl,
    error::SlipResult,
    handle::{CellId, ListHandle},
    sequencer::Direction,
};

/// Callbacks for `Avsl::walk`. Depth 0 is the list the walk started on; its members are
/// at depth 1.
pub trait ListVisitor {
    /// Called before the members of a list are visited
    fn enter_list(&mut self, avsl: &Avsl, list: ListHandle, depth: usize);

    /// Called for every member cell, before a sublist cell's list is entered
    fn visit_cell(&mut self, avsl: &Avsl, cell: CellId, depth: usize);

    /// Called instead of `enter_list` for a list already on the current path
    fn visit_cycle(&mut self, _avsl: &Avsl, _list: ListHandle, _depth: usize) {}

    /// Called after the last member of a list
    fn leave_list(&mut self, _avsl: &Avsl, _list: ListHandle, _depth: usize) {}
}

impl Avsl {
    /// Walk a list and everything reachable from it.
    ///
    /// The traversal keeps an explicit stack, so depth is bounded by memory rather than
    /// by the thread's stack. Visited bits are cleared on the way out.
    #[track_caller]
    pub fn walk(&mut self, list: ListHandle, visitor: &mut impl ListVisitor) -> SlipResult<()> {
        let top = self.header_index("walk", list)?;
        if !self.set_visited(top, true) {
            visitor.visit_cycle(self, list, 0);
            return Ok(());
        }
        visitor.enter_list(self, list, 0);

        // (header, cursor) for every list on the path
        let mut stack = vec![(top, top)];
        while let Some(&(header, cursor)) = stack.last() {
            let depth = stack.len() - 1;
            let next = self.neighbor(cursor, Direction::Right);

            if next == header {
                stack.pop();
                self.set_visited(header, false);
                visitor.leave_list(self, self.list_at(header), depth);
                continue;
            }

            if let Some(frame) = stack.last_mut() {
                frame.1 = next;
            }
            visitor.visit_cell(self, self.id_at(next), depth + 1);

            if let Some(held) = self.slot(next).sublist() {
                let nested = ListHandle::from_id(held);
                if self.set_visited(held.index(), true) {
                    visitor.enter_list(self, nested, depth + 1);
                    stack.push((held.index(), held.index()));
                } else {
                    visitor.visit_cycle(self, nested, depth + 1);
                }
            }
        }

        Ok(())
    }
}
