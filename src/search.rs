// Depth-first search for the best scoring path, with an explicit stack and
// branch-and-bound pruning.
//
// States are visited in the same order as simple_search.rs (neighbors up,
// down, left, right) and the best is only replaced on a strictly higher
// score, so ties go to the first path found. A subtree is skipped when an
// upper bound on every score reachable from its root can't beat the current
// best: this changes how many states get evaluated, never the result.
//
// The upper bound assumes each remaining move enters the hardest terrain of
// the map, and that every resource kind ends up with all of that kind on the
// map. Remaining moves are limited by the step allowance, by health (without
// a healer) and by the number of cells not on the path yet.
use log::{debug, warn};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use crate::challenge::{next_health, SearchConfig, SearchError, Solution};
use crate::grid::{Grid, Neighbors, Pos, ResourceKind};
use crate::party::PartyEffects;
use crate::scoring::{kind_bonus, quota_bonus, total_score, travel_score, Tally};

// Loop iterations between two deadline checks. The first iteration is
// always checked.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone)]
struct Frame {
    // Moves to try from this state, and the index of the next one.
    neighbors: Neighbors,
    next: usize,
    health: i32,
    steps: u32,
    travel: u32,
    tally: Tally,
}

/// Best path among those starting with a given first move.
#[derive(Debug, Clone)]
pub struct Branch {
    pub score: i32,
    pub path: Vec<Pos>,
    pub nodes: u64,
    pub complete: bool,
}

pub struct Search<'a> {
    grid: &'a Grid,
    effects: &'a PartyEffects,
    config: &'a SearchConfig,
    allowance: u32,
    // Highest quota bonus any path on this map could earn.
    bonus_bound: i64,

    // on_path[grid.index(pos)]
    on_path: Vec<bool>,
    path: Vec<Pos>,
    frames: Vec<Frame>,

    best_score: i32,
    best_path: Vec<Pos>,
    nodes: u64,
    pruned: u64,
    iterations: u64,
    deadline: Option<Instant>,
    complete: bool,
}

impl<'a> Search<'a> {
    pub fn new(grid: &'a Grid, effects: &'a PartyEffects, config: &'a SearchConfig) -> Self {
        let bonus_bound = ResourceKind::ALL.iter().map(|&kind| {
            let most = grid.total_amount(kind)
                .saturating_mul(effects.resource_multiplier_for(kind));
            i64::max(0, kind_bonus(grid, kind, most) as i64)
        }).sum();
        Search {
            grid,
            effects,
            config,
            allowance: effects.effective_allowance(grid.step_allowance()),
            bonus_bound,
            on_path: Vec::new(),
            path: Vec::new(),
            frames: Vec::new(),
            best_score: i32::MIN,
            best_path: Vec::new(),
            nodes: 0,
            pruned: 0,
            iterations: 0,
            deadline: None,
            complete: true,
        }
    }

    /// Searches every path from the origin.
    pub fn run(mut self) -> Result<Solution, SearchError> {
        self.config.check_origin(self.grid)?;
        self.start(self.grid.neighbors(self.config.origin));
        self.explore();
        self.report();
        Ok(Solution {
            party: *self.effects,
            path: self.best_path,
            score: self.best_score,
            complete: self.complete,
            nodes: self.nodes,
        })
    }

    /// Searches the paths whose first move is `first`. If none of them beats
    /// staying on the origin, the result is the origin alone. The origin
    /// itself isn't counted in `nodes`.
    pub fn run_branch(mut self, first: Pos) -> Result<Branch, SearchError> {
        self.config.check_origin(self.grid)?;
        self.start(Neighbors::from_iter([first]));
        self.nodes = 0;
        self.explore();
        self.report();
        Ok(Branch {
            score: self.best_score,
            path: self.best_path,
            nodes: self.nodes,
            complete: self.complete,
        })
    }

    /// Score of the path made of the origin alone.
    pub fn origin_score(&self) -> i32 {
        self.evaluate(&self.root(Neighbors::new()))
    }

    fn root(&self, moves: Neighbors) -> Frame {
        Frame {
            neighbors: moves,
            next: 0,
            health: self.config.start_health,
            steps: 0,
            travel: 0,
            tally: Tally::default(),
        }
    }

    // Puts the origin on the path, with `moves` as the only moves to try
    // from it.
    fn start(&mut self, moves: Neighbors) {
        let origin = self.config.origin;
        self.on_path = vec![false; self.grid.num_cells()];
        self.on_path[self.grid.index(&origin)] = true;
        self.path = vec![origin];
        let root = self.root(moves);
        self.best_score = self.evaluate(&root);
        self.best_path = self.path.clone();
        self.frames = vec![root];
        self.nodes = 1;
        self.pruned = 0;
        self.iterations = 0;
        self.deadline = self.config.time_limit().map(|limit| Instant::now() + limit);
        self.complete = true;
    }

    fn evaluate(&self, frame: &Frame) -> i32 {
        total_score(travel_score(frame.travel, self.effects),
                    frame.steps.saturating_sub(self.allowance),
                    quota_bonus(self.grid, &frame.tally))
    }

    // Highest score of any path extending a state. `path_len` counts the
    // state's own cell.
    fn upper_bound(&self, frame: &Frame, path_len: usize) -> i32 {
        let by_steps = self.allowance.saturating_sub(frame.steps) as usize;
        let by_health = if self.effects.healer_present {
            usize::MAX
        } else {
            (frame.health.max(1) - 1) as usize
        };
        let by_cells = self.grid.num_cells() - path_len;
        let moves = by_steps.min(by_health).min(by_cells) as i64;
        let mut travel = frame.travel as i64 + moves * self.grid.max_difficulty() as i64;
        if self.effects.scout_active {
            travel /= 2;
        }
        i64::min(travel + self.bonus_bound, i32::MAX as i64) as i32
    }

    // State after moving to `next`, if the party survives it and stays
    // within the allowance.
    fn child(&self, parent: &Frame, next: Pos) -> Option<Frame> {
        if parent.health <= 0 {
            return None;
        }
        let health = next_health(parent.health, self.effects, self.config);
        let steps = parent.steps + 1;
        if health <= 0 || steps > self.allowance {
            return None;
        }
        let cell = self.grid.cell(&next);
        let mut tally = parent.tally;
        if let Some(resource) = cell.resource {
            tally.gather(resource.kind, resource.amount, self.effects);
        }
        Some(Frame {
            neighbors: self.grid.neighbors(next),
            next: 0,
            health,
            steps,
            travel: parent.travel.saturating_add(cell.difficulty()),
            tally,
        })
    }

    fn push(&mut self, frame: Frame, pos: Pos) {
        self.nodes += 1;
        let idx = self.grid.index(&pos);
        self.on_path[idx] = true;
        self.path.push(pos);
        let score = self.evaluate(&frame);
        if score > self.best_score {
            self.best_score = score;
            self.best_path.clear();
            self.best_path.extend_from_slice(&self.path);
            debug!("New best path! score={} steps={}", score, frame.steps);
        }
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
        if let Some(pos) = self.path.pop() {
            let idx = self.grid.index(&pos);
            self.on_path[idx] = false;
        }
    }

    fn out_of_budget(&mut self) -> bool {
        if let Some(max_nodes) = self.config.max_nodes {
            if self.nodes >= max_nodes {
                return true;
            }
        }
        if let Some(deadline) = self.deadline {
            self.iterations += 1;
            if self.iterations % DEADLINE_CHECK_INTERVAL == 1 && Instant::now() >= deadline {
                return true;
            }
        }
        false
    }

    fn explore(&mut self) {
        while let Some(top) = self.frames.len().checked_sub(1) {
            if self.out_of_budget() {
                self.complete = false;
                break;
            }
            let frame = &mut self.frames[top];
            if frame.next == frame.neighbors.len() {
                self.pop();
                continue;
            }
            let next = frame.neighbors[frame.next];
            frame.next += 1;
            if self.on_path[self.grid.index(&next)] {
                continue;
            }
            let Some(child) = self.child(&self.frames[top], next) else {
                continue;
            };
            if self.upper_bound(&child, self.path.len() + 1) <= self.best_score {
                self.pruned += 1;
                continue;  // can't beat our best -- skip
            }
            self.push(child, next);
        }
    }

    fn report(&self) {
        debug!("Search evaluated {} states, pruned {} subtrees", self.nodes, self.pruned);
        if !self.complete {
            warn!("Search stopped early after {} states, best score so far: {}",
                  self.nodes, self.best_score);
        }
    }
}

/// Splits the search on the first move, one branch per worker thread. Each
/// worker owns its path and visited set, the grid is shared read-only.
/// Branches are merged in exploration order, so the result is the one a
/// sequential search gives. A node budget applies to each branch.
pub fn parallel_search(
    grid: &Arc<Grid>, effects: &PartyEffects, config: &SearchConfig
    ) -> Result<Solution, SearchError> {
    config.check_origin(grid)?;
    let first_moves: Vec<Pos> = grid.neighbors(config.origin).into_iter().collect();
    let threads = config.threads.max(1);

    let mut handles = vec![];
    let (tx, rx) = mpsc::channel();
    for i in 0..usize::min(threads, first_moves.len()) {
        let tx = tx.clone();
        let grid = grid.clone();
        let effects = *effects;
        let config = config.clone();
        let first_moves = first_moves.clone();
        handles.push(thread::spawn(move || {
            for j in (i..first_moves.len()).step_by(threads) {
                let branch = Search::new(&grid, &effects, &config).run_branch(first_moves[j]);
                if tx.send((j, branch)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);  // Drop the last sender, wait until all threads are done.
    let mut results: Vec<Option<Result<Branch, SearchError>>> =
        first_moves.iter().map(|_| None).collect();
    while let Ok((j, branch)) = rx.recv() {
        results[j] = Some(branch);
    }
    for handle in handles {
        if let Err(panic) = handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
    let branches = results.into_iter().flatten().collect::<Result<Vec<Branch>, _>>()?;

    let mut solution = Solution {
        party: *effects,
        path: vec![config.origin],
        score: Search::new(grid, effects, config).origin_score(),
        complete: true,
        nodes: 1,
    };
    for branch in branches {
        solution.nodes += branch.nodes;
        solution.complete &= branch.complete;
        if branch.score > solution.score {
            solution.score = branch.score;
            solution.path = branch.path;
        }
    }
    Ok(solution)
}
