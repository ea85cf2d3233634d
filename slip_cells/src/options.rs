use serde::{Deserialize, Serialize};

/// Number of cells carved out when an arena is created
pub const DEFAULT_INITIAL_CELLS: usize = 1024;

/// Number of cells added by each growth event
pub const DEFAULT_GROWTH_DELTA: usize = 256;

/// Arena configuration. Two integers, nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Size of the first fragment, in cells
    pub initial_cells: usize,

    /// Size of every later fragment, in cells. Zero disables growth.
    pub growth_delta: usize,
}

impl Default for Options {
    /// Create a new options struct with default values.
    fn default() -> Self {
        OptionsBuilder::new().build()
    }
}

pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self(Options {
            initial_cells: DEFAULT_INITIAL_CELLS,
            growth_delta: DEFAULT_GROWTH_DELTA,
        })
    }

    /// Return the options that have been built, consuming the builder.
    pub fn build(self) -> Options {
        self.0
    }

    pub fn initial_cells(mut self, initial_cells: usize) -> Self {
        self.0.initial_cells = initial_cells;
        self
    }

    pub fn growth_delta(mut self, growth_delta: usize) -> Self {
        self.0.growth_delta = growth_delta;
        self
    }
}

/// What popping or dequeuing an empty list returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Return `SlipError::EmptyList`
    #[default]
    Signal,
    /// Return `Item::Header(list)`; callers check `Item::is_header`
    Sentinel,
}
