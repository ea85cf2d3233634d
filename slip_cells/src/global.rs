//! Process-wide arena
//!
//! Most programs want a single arena shared by everything. This module keeps one behind
//! a mutex; `initialize` creates it, `with` borrows it, `shutdown` drops it.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::{
    avsl::{Avsl, AvslStats},
    options::OptionsBuilder,
};

static GLOBAL_AVSL: Lazy<Mutex<Option<Avsl>>> = Lazy::new(|| Mutex::new(None));

/// Create the global arena. Re-initializing replaces the previous arena, and handles
/// into it must not be used again.
pub fn initialize(initial_cells: usize, growth_delta: usize) -> AvslStats {
    let options = OptionsBuilder::new()
        .initial_cells(initial_cells)
        .growth_delta(growth_delta)
        .build();
    let avsl = Avsl::new(options);
    let stats = avsl.stats();

    let mut global = GLOBAL_AVSL.lock();
    if global.is_some() {
        tracing::warn!("replacing an initialized global cell arena");
    }
    *global = Some(avsl);

    tracing::debug!(initial_cells, growth_delta, "initialized global cell arena");
    stats
}

pub fn is_initialized() -> bool {
    GLOBAL_AVSL.lock().is_some()
}

/// Reset the global arena. Returns `false` if it was never initialized.
pub fn reset_to_pristine() -> bool {
    match GLOBAL_AVSL.lock().as_mut() {
        Some(avsl) => {
            avsl.reset_to_pristine();
            true
        }
        None => false,
    }
}

/// Drop the global arena, returning its final counters
pub fn shutdown() -> Option<AvslStats> {
    let avsl = GLOBAL_AVSL.lock().take()?;
    let stats = avsl.stats();
    tracing::debug!(total = stats.total, available = stats.available, "shut down global cell arena");
    Some(stats)
}

/// Run `f` with the global arena locked. Returns `None` if it is not initialized.
pub fn with<R>(f: impl FnOnce(&mut Avsl) -> R) -> Option<R> {
    GLOBAL_AVSL.lock().as_mut().map(f)
}

pub fn stats() -> Option<AvslStats> {
    with(|avsl| avsl.stats())
}
