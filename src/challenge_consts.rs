// Fixed rules of the expedition challenge.

/// Health the party starts with.
pub const START_HEALTH: i32 = 10;
/// A healer can never bring health above this.
pub const MAX_HEALTH: i32 = 10;

/// Number of worker threads used when splitting the search on the first move.
pub const NUM_THREADS: usize = 4;

/// Number of distinct resource kinds on a map.
pub const NUM_RESOURCE_KINDS: usize = 3;

// Travel difficulty per terrain type.
pub const SAND_DIFFICULTY: u32 = 1;
pub const ICE_DIFFICULTY: u32 = 5;
pub const TALL_SAND_DIFFICULTY: u32 = 10;
pub const MOUNTAIN_DIFFICULTY: u32 = 15;

// Healer stretches the step allowance by 20%, rounded up.
pub const HEALER_STEP_NUMERATOR: u32 = 6;
pub const HEALER_STEP_DENOMINATOR: u32 = 5;

pub const GATHERER_RESOURCE_MULTIPLIER: u32 = 2;
