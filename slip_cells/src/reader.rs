//! Readers
//!
//! A reader walks every leaf (datum cell) reachable from a list, depth first, climbing
//! back out of nested lists on its own. The ascent path is kept in a private list of
//! reader cells allocated from the same arena, so a deep walk costs cells, not stack.
//!
//! A reader never touches mark bits: any number of readers may walk the same lists at
//! once. A sublist leading back to a list already on the reader's path is skipped.

use crate::{
    avsl::Avsl,
    cell::{Payload, Role},
    error::{SlipError, SlipResult},
    handle::{CellId, ListHandle},
    sequencer::{Direction, Scope, Target},
};

/// Depth-first leaf iterator over a list
#[derive(Debug)]
pub struct Reader {
    top: ListHandle,
    current: CellId,
    /// Private list of reader cells, innermost descent on top
    path: ListHandle,
    /// The cursor was just restored to a sublist cell and must not re-enter it
    ascended: bool,
}

impl Reader {
    /// Start a reader on a list. Call `close` when done to return its cells.
    #[track_caller]
    pub fn new(avsl: &mut Avsl, list: ListHandle) -> SlipResult<Reader> {
        avsl.header_index("reader", list)?;
        let path = avsl.new_list()?;
        Ok(Reader {
            top: list,
            current: list.id(),
            path,
            ascended: false,
        })
    }

    #[inline]
    pub fn list(&self) -> ListHandle {
        self.top
    }

    /// The last cell returned, or the top header before the first step
    #[inline]
    pub fn current(&self) -> CellId {
        self.current
    }

    /// Number of nested lists the reader is inside
    #[track_caller]
    pub fn depth(&self, avsl: &Avsl) -> SlipResult<usize> {
        avsl.size(self.path)
    }

    /// Advance to the next datum cell, or return `None` once the whole structure has been
    /// read. Reading again after `None` starts over from the top.
    #[track_caller]
    pub fn next_leaf(&mut self, avsl: &mut Avsl) -> SlipResult<Option<CellId>> {
        let mut index = avsl.live("next_leaf", self.current)?;
        loop {
            let descend = match avsl.slot(index).sublist() {
                Some(list) if !self.ascended => !self.on_path(avsl, list.index()),
                _ => false,
            };

            index = if descend {
                self.save(avsl, index)?;
                avsl.advance_index(index, Scope::Structural, Target::Word, Direction::Right)
            } else {
                avsl.advance_index(index, Scope::Linear, Target::Word, Direction::Right)
            };
            self.ascended = false;

            match avsl.slot(index).role() {
                Role::Datum(_) => {
                    self.current = avsl.id_at(index);
                    return Ok(Some(self.current));
                }
                Role::Header if index == self.top.index() => {
                    self.current = self.top.id();
                    return Ok(None);
                }
                Role::Header => match self.ascend(avsl)? {
                    Some(sublist) => index = sublist.index(),
                    None => {
                        return avsl.fail(SlipError::Corrupted {
                            op: "next_leaf",
                            cell: avsl.id_at(index),
                            reason: "reader reached a nested header with an empty path",
                        })
                    }
                },
                _ => {}
            }
        }
    }

    /// Climb out of the innermost nested list, leaving the reader on the sublist cell it
    /// entered through. Returns `None` at the top level.
    #[track_caller]
    pub fn ascend(&mut self, avsl: &mut Avsl) -> SlipResult<Option<CellId>> {
        let path = avsl.header_index("ascend", self.path)?;
        let saved = avsl.neighbor(path, Direction::Right);
        if saved == path {
            return Ok(None);
        }

        let sublist = match avsl.slot(saved).payload {
            Payload::Reader(sublist) => sublist,
            _ => {
                return avsl.fail(SlipError::Corrupted {
                    op: "ascend",
                    cell: avsl.id_at(saved),
                    reason: "reader path holds a cell that is not a reader cell",
                })
            }
        };

        avsl.unlink_index(saved);
        avsl.release_run("ascend", saved, saved)?;

        // The sublist cell may have been deleted under the reader
        avsl.live("ascend", sublist)?;
        self.current = sublist;
        self.ascended = true;
        Ok(Some(sublist))
    }

    /// Return to the top of the list
    #[track_caller]
    pub fn reset(&mut self, avsl: &mut Avsl) -> SlipResult<()> {
        avsl.flush(self.path)?;
        self.current = self.top.id();
        self.ascended = false;
        Ok(())
    }

    /// Release the reader's private cells
    #[track_caller]
    pub fn close(self, avsl: &mut Avsl) -> SlipResult<()> {
        avsl.delete_list(self.path)
    }

    /// Record a descent through the sublist cell at `sublist`
    #[track_caller]
    fn save(&self, avsl: &mut Avsl, sublist: u32) -> SlipResult<()> {
        let path = avsl.header_index("next_leaf", self.path)?;
        let saved = avsl.id_at(sublist);
        let cell = avsl.allocate()?.index();
        avsl.slot_mut(cell).payload = Payload::Reader(saved);
        let top = avsl.neighbor(path, Direction::Right);
        avsl.link_between(path, cell, top);
        Ok(())
    }

    /// Whether the list at `header` is the top list or one the reader is inside
    fn on_path(&self, avsl: &Avsl, header: u32) -> bool {
        if header == self.top.index() {
            return true;
        }

        let path = self.path.index();
        let mut index = avsl.neighbor(path, Direction::Right);
        while index != path {
            if let Payload::Reader(sublist) = avsl.slot(index).payload {
                let entered = avsl
                    .is_live(sublist)
                    .then(|| avsl.slot(sublist.index()).sublist())
                    .flatten();
                if entered.map(|list| list.index()) == Some(header) {
                    return true;
                }
            }
            index = avsl.neighbor(index, Direction::Right);
        }
        false
    }
}
