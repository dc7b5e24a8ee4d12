// Implementation of search.rs, without optimizations: plain recursion over
// immutable states, every reachable path is scored.
use crate::challenge::{next_health, SearchConfig, SearchError, Solution};
use crate::grid::{Grid, Pos};
use crate::party::PartyEffects;
use crate::scoring::{quota_bonus, total_score, travel_score, Tally};

/// One node of the exploration tree. Moving derives a new state, the parent
/// is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub pos: Pos,
    pub steps: u32,
    /// Sum of the difficulty of every cell entered.
    pub travel: u32,
    pub tally: Tally,
    pub health: i32,
    pub path: Vec<Pos>,
}

impl SearchState {
    pub fn initial(config: &SearchConfig) -> Self {
        SearchState {
            pos: config.origin,
            steps: 0,
            travel: 0,
            tally: Tally::default(),
            health: config.start_health,
            path: vec![config.origin],
        }
    }

    /// Same value `score_path` gives for `self.path`.
    pub fn score(&self, grid: &Grid, effects: &PartyEffects) -> i32 {
        let allowance = effects.effective_allowance(grid.step_allowance());
        total_score(travel_score(self.travel, effects),
                    self.steps.saturating_sub(allowance),
                    quota_bonus(grid, &self.tally))
    }

    /// State after moving to `next`, or None if that move would kill the
    /// party or go over the step allowance.
    pub fn advance(
        &self, next: Pos, grid: &Grid, effects: &PartyEffects, config: &SearchConfig
        ) -> Option<SearchState> {
        if self.health <= 0 {
            return None;
        }
        let health = next_health(self.health, effects, config);
        let steps = self.steps + 1;
        if health <= 0 || steps > effects.effective_allowance(grid.step_allowance()) {
            return None;
        }
        let cell = grid.cell(&next);
        let mut tally = self.tally;
        if let Some(resource) = cell.resource {
            tally.gather(resource.kind, resource.amount, effects);
        }
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(next);
        Some(SearchState {
            pos: next,
            steps,
            travel: self.travel.saturating_add(cell.difficulty()),
            tally,
            health,
            path,
        })
    }
}

pub struct SimpleSearch<'a> {
    grid: &'a Grid,
    effects: &'a PartyEffects,
    config: &'a SearchConfig,
    best: Option<(i32, Vec<Pos>)>,
    nodes: u64,
}

impl<'a> SimpleSearch<'a> {
    pub fn new(grid: &'a Grid, effects: &'a PartyEffects, config: &'a SearchConfig) -> Self {
        SimpleSearch { grid, effects, config, best: None, nodes: 0 }
    }

    pub fn run(mut self) -> Result<Solution, SearchError> {
        self.config.check_origin(self.grid)?;
        self.explore(&SearchState::initial(self.config));
        let (score, path) = self.best.unwrap_or((0, vec![self.config.origin]));
        Ok(Solution {
            party: *self.effects,
            path,
            score,
            complete: true,
            nodes: self.nodes,
        })
    }

    fn explore(&mut self, state: &SearchState) {
        self.nodes += 1;
        let score = state.score(self.grid, self.effects);
        if self.best.as_ref().map_or(true, |(best, _)| score > *best) {
            self.best = Some((score, state.path.clone()));
        }
        for next in self.grid.neighbors(state.pos) {
            if state.path.contains(&next) {
                continue;
            }
            if let Some(child) = state.advance(next, self.grid, self.effects, self.config) {
                self.explore(&child);
            }
        }
    }
}
