// Rules shared by every search engine, and what they hand back.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::challenge_consts::{MAX_HEALTH, NUM_THREADS, START_HEALTH};
use crate::grid::{Grid, GridError, Pos};
use crate::party::PartyEffects;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SearchError {
    #[error("search origin is not on the grid")]
    InvalidOrigin(#[from] GridError),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Cell every path starts from.
    pub origin: Pos,
    pub start_health: i32,
    /// Cap for a healer's regeneration.
    pub max_health: i32,
    /// Stop after evaluating this many states and return the best so far.
    pub max_nodes: Option<u64>,
    /// Same, based on wall time.
    pub time_limit_ms: Option<u64>,
    /// Worker threads for solvers that split the search.
    pub threads: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            origin: Pos::new(0, 0),
            start_health: START_HEALTH,
            max_health: MAX_HEALTH,
            max_nodes: None,
            time_limit_ms: None,
            threads: NUM_THREADS,
        }
    }
}

impl SearchConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn check_origin(&self, grid: &Grid) -> Result<(), SearchError> {
        grid.cell_at(&self.origin)?;
        Ok(())
    }
}

/// Health after one move: one lost to travel, one regained (up to the cap)
/// when a healer is around.
#[inline]
pub fn next_health(health: i32, effects: &PartyEffects, config: &SearchConfig) -> i32 {
    debug_assert!(health > 0, "moving with no health left ({health})");
    let health = health.max(0) - 1;
    if effects.healer_present {
        i32::min(health + 1, config.max_health)
    } else {
        health
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub party: PartyEffects,
    pub path: Vec<Pos>,
    pub score: i32,
    /// False when a node or time budget cut the search short, in which case
    /// `path` is only the best one seen.
    pub complete: bool,
    /// Number of search states evaluated.
    pub nodes: u64,
}

#[cfg(test)]
mod tests {
    use crate::party::Role;
    use super::*;

    #[test]
    fn test_health_decays_without_healer() {
        let config = SearchConfig::default();
        let effects = PartyEffects::default();
        assert_eq!(next_health(10, &effects, &config), 9);
        assert_eq!(next_health(1, &effects, &config), 0);
    }

    #[test]
    fn test_healer_offsets_decay_up_to_cap() {
        let config = SearchConfig { max_health: 10, ..SearchConfig::default() };
        let effects = PartyEffects::derive([Role::Healer]);
        assert_eq!(next_health(10, &effects, &config), 10);
        assert_eq!(next_health(4, &effects, &config), 4);
        assert_eq!(next_health(15, &effects, &config), 10);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: SearchConfig = serde_json::from_str(r#"{"max_nodes": 500}"#).unwrap();
        assert_eq!(config.max_nodes, Some(500));
        assert_eq!(config.start_health, 10);
        assert_eq!(config.origin, Pos::new(0, 0));
        assert_eq!(config.time_limit(), None);
    }
}
