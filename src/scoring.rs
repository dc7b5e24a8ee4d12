// Score of a path: travel difficulty, minus an over-budget penalty, plus an
// all-or-nothing bonus for every resource kind whose quota is met.
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::challenge_consts::NUM_RESOURCE_KINDS;
use crate::grid::{Grid, GridError, Pos, ResourceKind};
use crate::party::PartyEffects;

/// Amount collected per resource kind, role multipliers already applied.
#[derive(Serialize, Debug, Default, PartialEq, Eq, Hash, Copy, Clone)]
pub struct Tally(pub [u32; NUM_RESOURCE_KINDS]);

impl Tally {
    #[inline]
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0[kind.index()]
    }

    #[inline]
    pub fn add(&mut self, kind: ResourceKind, amount: u32) {
        let slot = &mut self.0[kind.index()];
        *slot = slot.saturating_add(amount);
    }

    /// Adds one resource cell worth of `amount`, role multiplier applied.
    #[inline]
    pub fn gather(&mut self, kind: ResourceKind, amount: u32, effects: &PartyEffects) {
        self.add(kind, amount.saturating_mul(effects.resource_multiplier_for(kind)));
    }
}

// Scores are reported as i32; anything past its range sticks to the bound.
#[inline]
fn clamp_score(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Bonus for a single kind: nothing below quota, `tally * multiplier` at or
/// above it. Kinds without a quota never earn anything.
#[inline]
pub fn kind_bonus(grid: &Grid, kind: ResourceKind, tally: u32) -> i32 {
    match grid.quota(kind) {
        Some(quota) if tally >= quota => {
            clamp_score(tally as i64 * grid.quota_multiplier() as i64)
        },
        _ => 0,
    }
}

pub fn quota_bonus(grid: &Grid, tally: &Tally) -> i32 {
    clamp_score(ResourceKind::ALL.iter()
        .map(|&kind| kind_bonus(grid, kind, tally.get(kind)) as i64)
        .sum())
}

/// Travel part of the score. A scout halves it, truncating.
#[inline]
pub fn travel_score(travel: u32, effects: &PartyEffects) -> i32 {
    let travel = if effects.scout_active { travel / 2 } else { travel };
    clamp_score(travel as i64)
}

/// Combines the parts of a score the same way for the scorer and the search.
#[inline]
pub fn total_score(travel_score: i32, overage: u32, bonus: i32) -> i32 {
    clamp_score(travel_score as i64 - overage as i64 + bonus as i64)
}

#[derive(Serialize, Debug, Default, PartialEq, Eq, Clone)]
pub struct ScoreBreakdown {
    /// Sum of Manhattan distances between consecutive positions.
    pub steps: u32,
    /// Sum of the difficulty of every cell entered.
    pub travel: u32,
    /// `travel`, after role effects.
    pub travel_score: i32,
    /// Steps over the allowance, subtracted from the score.
    pub overage: u32,
    pub tally: Tally,
    pub bonus: i32,
    pub score: i32,
}

/// Scores any path, adjacent or not. Each resource cell counts once per path,
/// however often the path enters it. Only fails if the path leaves the grid.
pub fn score_breakdown(
    path: &[Pos], grid: &Grid, effects: &PartyEffects
    ) -> Result<ScoreBreakdown, GridError> {
    let mut breakdown = ScoreBreakdown::default();
    if let Some(start) = path.first() {
        grid.cell_at(start)?;
    }
    let mut consumed: FxHashSet<Pos> = FxHashSet::default();
    for (from, to) in path.iter().tuple_windows() {
        let cell = grid.cell_at(to)?;
        if let Some(resource) = cell.resource {
            if consumed.insert(*to) {
                breakdown.tally.gather(resource.kind, resource.amount, effects);
            }
        }
        breakdown.steps = breakdown.steps.saturating_add(from.manhattan_distance(to));
        breakdown.travel = breakdown.travel.saturating_add(cell.difficulty());
    }

    breakdown.travel_score = travel_score(breakdown.travel, effects);
    let allowance = effects.effective_allowance(grid.step_allowance());
    breakdown.overage = breakdown.steps.saturating_sub(allowance);
    breakdown.bonus = quota_bonus(grid, &breakdown.tally);
    breakdown.score = total_score(breakdown.travel_score, breakdown.overage, breakdown.bonus);
    Ok(breakdown)
}

pub fn score_path(path: &[Pos], grid: &Grid, effects: &PartyEffects) -> Result<i32, GridError> {
    Ok(score_breakdown(path, grid, effects)?.score)
}
