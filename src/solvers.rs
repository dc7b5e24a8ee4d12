// Different solver implementations to find the best expedition path.
// Without a node or time budget they all return the same path and score, they
// only differ in how many states they evaluate to get there.

use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::challenge::{SearchConfig, SearchError, Solution};
use crate::grid::Grid;
use crate::party::PartyEffects;
use crate::search::{parallel_search, Search};
use crate::simple_search::SimpleSearch;

pub trait Solver {
    // Name to display for this solver.
    fn name(&self) -> &str;

    // Implementation of the solver.
    fn do_solve(
        &mut self, grid: &Arc<Grid>, effects: &PartyEffects
        ) -> Result<Solution, SearchError>;

    // Wrapper to do_solve, to log timing and score information.
    fn solve(
        &mut self, grid: &Arc<Grid>, effects: &PartyEffects
        ) -> Result<Solution, SearchError> {
        let start = Instant::now();
        let solution = self.do_solve(grid, effects);
        info!("Solver {} took {:?}", self.name(), start.elapsed());
        match &solution {
            Ok(solution) if solution.complete => info!(
                "Solver {} found a score of {}, with {} steps ({} states)",
                self.name(), solution.score, solution.path.len() - 1, solution.nodes),
            Ok(solution) => warn!(
                "Solver {} ran out of budget, best score seen {} ({} states)",
                self.name(), solution.score, solution.nodes),
            Err(err) => warn!("Solver {} failed: {}", self.name(), err),
        };
        solution
    }
}

// Reference solver: scores every path the party can walk. Exponential, only
// meant for small maps and to check the other solvers.
pub struct ExhaustiveSolver {
    pub config: SearchConfig,
}

// Same paths as ExhaustiveSolver, skipping subtrees that can't beat the best
// path so far. Honors the node and time budgets.
pub struct BranchAndBoundSolver {
    pub config: SearchConfig,
}

// BranchAndBoundSolver, with one thread per first move (up to
// `config.threads`).
pub struct ParallelSolver {
    pub config: SearchConfig,
}

impl Solver for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn do_solve(
        &mut self, grid: &Arc<Grid>, effects: &PartyEffects
        ) -> Result<Solution, SearchError> {
        SimpleSearch::new(grid, effects, &self.config).run()
    }
}

impl Solver for BranchAndBoundSolver {
    fn name(&self) -> &str {
        "branch-and-bound"
    }

    fn do_solve(
        &mut self, grid: &Arc<Grid>, effects: &PartyEffects
        ) -> Result<Solution, SearchError> {
        Search::new(grid, effects, &self.config).run()
    }
}

impl Solver for ParallelSolver {
    fn name(&self) -> &str {
        "parallel"
    }

    fn do_solve(
        &mut self, grid: &Arc<Grid>, effects: &PartyEffects
        ) -> Result<Solution, SearchError> {
        parallel_search(grid, effects, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::map_format::load_map;
    use crate::party::Role;
    use crate::scoring::score_path;
    use super::*;

    fn make_map() -> Arc<Grid> {
        // Note this isn't great, we ideally shouldn't read from disk here.
        Arc::new(load_map(Path::new("./maps/map.txt")).expect("Couldn't load map file"))
    }

    #[test]
    fn test_match_solvers() {
        let grid = make_map();
        let config = SearchConfig::default();
        let parties = [vec![], vec![Role::Scout, Role::Gatherer],
                       vec![Role::Healer], vec![Role::Healer, Role::Gatherer]];
        for roles in parties {
            let effects = PartyEffects::derive(roles);
            let mut solvers: Vec<Box<dyn Solver>> = vec![
                Box::new(ExhaustiveSolver { config: config.clone() }),
                Box::new(BranchAndBoundSolver { config: config.clone() }),
                Box::new(ParallelSolver { config: config.clone() }),
            ];
            let solutions: Vec<Solution> = solvers.iter_mut()
                .map(|solver| solver.solve(&grid, &effects).unwrap())
                .collect();
            for solution in &solutions[1..] {
                assert_eq!(solution.path, solutions[0].path);
                assert_eq!(solution.score, solutions[0].score);
            }
            assert_eq!(Ok(solutions[0].score),
                       score_path(&solutions[0].path, &grid, &effects));
        }
    }
}
