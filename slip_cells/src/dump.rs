//! Low-level dumps for debugging

use core::fmt::{self, Write};

use crate::{
    avsl::Avsl,
    cell::{Cell, Payload},
    error::SlipResult,
    handle::{CellId, ListHandle},
    visitor::ListVisitor,
};

impl Avsl {
    /// One line describing a cell: index, generation, links and payload
    pub fn dump_cell(&self, id: CellId) -> String {
        self.dump_index(id.index())
    }

    pub(crate) fn dump_index(&self, index: u32) -> String {
        if index as usize >= self.stats().total {
            return format!("{index:#010x} <outside arena>");
        }

        let mut out = String::new();
        let _ = write_cell(&mut out, index, self.slot(index));
        out
    }

    /// Indented dump of a list and everything reachable from it
    #[track_caller]
    pub fn dump_list(&mut self, list: ListHandle) -> SlipResult<String> {
        let mut dumper = Dumper::default();
        self.walk(list, &mut dumper)?;
        Ok(dumper.out)
    }

    /// Every cell in the arena, free ones included
    pub fn dump_arena(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "avsl: {} cells, {} available, {} increments of {}",
            stats.total, stats.available, stats.allocation_increments, stats.growth_delta
        );
        for index in 0..stats.total as u32 {
            let _ = write_cell(&mut out, index, self.slot(index));
            out.push('\n');
        }
        out
    }
}

fn write_cell(out: &mut impl Write, index: u32, cell: &Cell) -> fmt::Result {
    write!(
        out,
        "{index:#010x} g{} [{} | {}] ",
        cell.generation, cell.left, cell.right
    )?;

    match &cell.payload {
        Payload::Header(fields) => {
            write!(
                out,
                "header refs={} mark={:#06x}",
                fields.ref_count.get(),
                fields.mark.bits()
            )?;
            if let Some(descriptor) = fields.descriptor {
                write!(out, " desc={descriptor}")?;
            }
            match fields.owner {
                Some(owner) => write!(out, " owner={owner}"),
                None => Ok(()),
            }
        }
        Payload::Sublist(list) => write!(out, "sublist -> {list}"),
        Payload::Datum(datum) => write!(out, "datum {datum:?}"),
        Payload::Reader(sublist) => write!(out, "reader @ {sublist}"),
        Payload::Vacant => out.write_str("vacant"),
    }
}

#[derive(Default)]
struct Dumper {
    out: String,
}

impl Dumper {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl ListVisitor for Dumper {
    fn enter_list(&mut self, avsl: &Avsl, list: ListHandle, depth: usize) {
        // Nested headers are printed under the sublist cell that leads to them
        if depth == 0 {
            self.line(depth, &avsl.dump_cell(list.id()));
        }
    }

    fn visit_cell(&mut self, avsl: &Avsl, cell: CellId, depth: usize) {
        self.line(depth, &avsl.dump_cell(cell));
    }

    fn visit_cycle(&mut self, _avsl: &Avsl, list: ListHandle, depth: usize) {
        self.line(depth + 1, &format!("<cycle {}>", list.id()));
    }
}
