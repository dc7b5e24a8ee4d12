use arrayvec::ArrayVec;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::challenge_consts::{
    ICE_DIFFICULTY, MOUNTAIN_DIFFICULTY, NUM_RESOURCE_KINDS, SAND_DIFFICULTY,
    TALL_SAND_DIFFICULTY,
};
use crate::map_format::{CellDescriptor, ParsedMap};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
    #[error("position ({row}, {col}) is outside of the grid")]
    OutOfBounds { row: i64, col: i64 },
    #[error("grid declared as {rows}x{cols} but {detail}")]
    DimensionMismatch { rows: usize, cols: usize, detail: String },
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    #[error("step allowance must be positive")]
    ZeroStepAllowance,
    #[error("unknown terrain code {0:?}")]
    UnknownTerrain(String),
}

/// A grid position. Serialized as `[row, col]`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Copy, Clone)]
#[serde(from = "[u16; 2]", into = "[u16; 2]")]
pub struct Pos {
    pub row: u16,
    pub col: u16,
}

impl Pos {
    pub const fn new(row: u16, col: u16) -> Self {
        Pos { row, col }
    }

    pub fn manhattan_distance(&self, other: &Pos) -> u32 {
        let rows = (self.row as i32 - other.row as i32).unsigned_abs();
        let cols = (self.col as i32 - other.col as i32).unsigned_abs();
        rows + cols
    }
}

impl From<[u16; 2]> for Pos {
    fn from([row, col]: [u16; 2]) -> Self {
        Pos { row, col }
    }
}

impl From<Pos> for [u16; 2] {
    fn from(pos: Pos) -> Self {
        [pos.row, pos.col]
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum Terrain {
    #[serde(rename = "S")]
    Sand,
    #[serde(rename = "I")]
    Ice,
    #[serde(rename = "TS")]
    TallSand,
    #[serde(rename = "M")]
    Mountain,
}

impl Terrain {
    pub fn from_code(code: &str) -> Result<Terrain, GridError> {
        match code {
            "S" => Ok(Terrain::Sand),
            "I" => Ok(Terrain::Ice),
            "TS" => Ok(Terrain::TallSand),
            "M" => Ok(Terrain::Mountain),
            _ => Err(GridError::UnknownTerrain(code.to_string())),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Terrain::Sand => "S",
            Terrain::Ice => "I",
            Terrain::TallSand => "TS",
            Terrain::Mountain => "M",
        }
    }

    pub fn difficulty(&self) -> u32 {
        match self {
            Terrain::Sand => SAND_DIFFICULTY,
            Terrain::Ice => ICE_DIFFICULTY,
            Terrain::TallSand => TALL_SAND_DIFFICULTY,
            Terrain::Mountain => MOUNTAIN_DIFFICULTY,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Copy, Clone)]
pub enum ResourceKind {
    Coal,
    Fish,
    #[serde(rename = "Scrap_metal", alias = "ScrapMetal")]
    ScrapMetal,
}

impl ResourceKind {
    /// In the order quotas are listed in map files.
    pub const ALL: [ResourceKind; NUM_RESOURCE_KINDS] =
        [ResourceKind::Coal, ResourceKind::Fish, ResourceKind::ScrapMetal];

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_name(name: &str) -> Option<ResourceKind> {
        match name {
            "Coal" => Some(ResourceKind::Coal),
            "Fish" => Some(ResourceKind::Fish),
            "Scrap_metal" | "ScrapMetal" => Some(ResourceKind::ScrapMetal),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Coal => "Coal",
            ResourceKind::Fish => "Fish",
            ResourceKind::ScrapMetal => "Scrap_metal",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Resource {
    pub kind: ResourceKind,
    pub amount: u32,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Cell {
    pub terrain: Terrain,
    pub resource: Option<Resource>,
}

impl Cell {
    #[inline]
    pub fn difficulty(&self) -> u32 {
        self.terrain.difficulty()
    }
}

pub type Neighbors = ArrayVec<Pos, 4>;

/// Immutable map the search runs on. Only built through `Grid::from_parsed`,
/// which checks that the resource registry agrees with the cells.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    // cells[row * cols + col]
    cells: Vec<Cell>,
    step_allowance: u32,
    quotas: [Option<u32>; NUM_RESOURCE_KINDS],
    quota_multiplier: i32,
    // registry[kind] lists every cell carrying that kind, in row-major order.
    registry: [Vec<Pos>; NUM_RESOURCE_KINDS],
    max_difficulty: u32,
}

impl Grid {
    pub fn from_parsed(map: &ParsedMap) -> Result<Grid, GridError> {
        let (rows, cols) = map.size;
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }
        if rows > u16::MAX as usize || cols > u16::MAX as usize {
            return Err(GridError::DimensionMismatch {
                rows, cols, detail: "positions are limited to 16 bits".to_string(),
            });
        }
        if map.step_allowance == 0 {
            return Err(GridError::ZeroStepAllowance);
        }
        if map.grid.len() != rows {
            return Err(GridError::DimensionMismatch {
                rows, cols, detail: format!("got {} rows", map.grid.len()),
            });
        }

        let mut cells = Vec::with_capacity(rows * cols);
        let mut registry: [Vec<Pos>; NUM_RESOURCE_KINDS] = Default::default();
        for (r, row) in map.grid.iter().enumerate() {
            if row.len() != cols {
                return Err(GridError::DimensionMismatch {
                    rows, cols, detail: format!("row {} has {} cells", r, row.len()),
                });
            }
            for (c, descriptor) in row.iter().enumerate() {
                let cell = descriptor.to_cell()?;
                if let Some(resource) = cell.resource {
                    registry[resource.kind.index()].push(Pos::new(r as u16, c as u16));
                }
                cells.push(cell);
            }
        }

        let mut quotas = [None; NUM_RESOURCE_KINDS];
        for (kind, &quota) in &map.quota {
            quotas[kind.index()] = Some(quota);
        }
        let max_difficulty = cells.iter().map(Cell::difficulty).max().unwrap_or(0);

        Ok(Grid {
            rows,
            cols,
            cells,
            step_allowance: map.step_allowance,
            quotas,
            quota_multiplier: map.quota_multiplier,
            registry,
            max_difficulty,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn contains(&self, pos: &Pos) -> bool {
        (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    /// Flat index of an in-bounds position.
    #[inline]
    pub fn index(&self, pos: &Pos) -> usize {
        pos.row as usize * self.cols + pos.col as usize
    }

    pub fn cell_at(&self, pos: &Pos) -> Result<&Cell, GridError> {
        if self.contains(pos) {
            Ok(&self.cells[self.index(pos)])
        } else {
            Err(GridError::OutOfBounds { row: pos.row as i64, col: pos.col as i64 })
        }
    }

    /// Cell lookup for positions already known to be in bounds.
    #[inline]
    pub fn cell(&self, pos: &Pos) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn resources_of(&self, kind: ResourceKind) -> &[Pos] {
        &self.registry[kind.index()]
    }

    /// Sum of every amount of `kind` lying on the map.
    pub fn total_amount(&self, kind: ResourceKind) -> u32 {
        self.resources_of(kind).iter()
            .filter_map(|pos| self.cell(pos).resource)
            .fold(0u32, |total, resource| total.saturating_add(resource.amount))
    }

    #[inline]
    pub fn step_allowance(&self) -> u32 {
        self.step_allowance
    }

    #[inline]
    pub fn quota(&self, kind: ResourceKind) -> Option<u32> {
        self.quotas[kind.index()]
    }

    #[inline]
    pub fn quota_multiplier(&self) -> i32 {
        self.quota_multiplier
    }

    #[inline]
    pub fn max_difficulty(&self) -> u32 {
        self.max_difficulty
    }

    /// Orthogonal in-bounds neighbors, always in the order up, down, left,
    /// right. The search relies on this order to break ties.
    pub fn neighbors(&self, pos: Pos) -> Neighbors {
        const DELTAS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        DELTAS.iter().filter_map(|&(dr, dc)| {
            let row = pos.row as i32 + dr;
            let col = pos.col as i32 + dc;
            if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
                None
            } else {
                Some(Pos::new(row as u16, col as u16))
            }
        }).collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Map size: {} x {}", self.rows, self.cols)?;
        writeln!(f, "Step allowance: {}", self.step_allowance)?;
        for kind in ResourceKind::ALL {
            let locations = self.resources_of(kind).iter()
                .map(|pos| format!("({},{})", pos.row, pos.col))
                .join(" ");
            match self.quota(kind) {
                Some(quota) => writeln!(f, "{}: quota {} at {}", kind.name(), quota, locations)?,
                None => writeln!(f, "{}: no quota at {}", kind.name(), locations)?,
            }
        }
        writeln!(f, "Quota multiplier: {}", self.quota_multiplier)?;
        writeln!(f, "Tiles:")?;
        for row in self.cells.chunks(self.cols) {
            let line = row.iter().map(|cell| match cell.resource {
                Some(resource) => format!("{}*{}", cell.terrain.code(),
                                          &resource.kind.name()[..1]),
                None => cell.terrain.code().to_string(),
            }).join(" ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl CellDescriptor {
    pub fn to_cell(&self) -> Result<Cell, GridError> {
        match self {
            CellDescriptor::Terrain(code) => Ok(Cell {
                terrain: Terrain::from_code(code)?,
                resource: None,
            }),
            CellDescriptor::Detailed { terrain, resource, amount } => Ok(Cell {
                terrain: *terrain,
                resource: resource.map(|kind| Resource { kind, amount: *amount }),
            }),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use rustc_hash::FxHashMap;

    use super::*;

    /// Builds a map from terrain codes, where a code like "S:Coal:3" places a
    /// resource on the cell.
    pub fn make_map(rows: &[&[&str]], step_allowance: u32,
                    quota: &[(ResourceKind, u32)], quota_multiplier: i32) -> ParsedMap {
        let grid = rows.iter().map(|row| row.iter().map(|code| {
            let parts: Vec<&str> = code.split(':').collect();
            if parts.len() == 1 {
                CellDescriptor::Terrain(parts[0].to_string())
            } else {
                CellDescriptor::Detailed {
                    terrain: Terrain::from_code(parts[0]).unwrap(),
                    resource: Some(ResourceKind::from_name(parts[1]).unwrap()),
                    amount: parts[2].parse().unwrap(),
                }
            }
        }).collect()).collect();
        ParsedMap {
            size: (rows.len(), rows[0].len()),
            step_allowance,
            quota: FxHashMap::from_iter(quota.iter().cloned()),
            quota_multiplier,
            grid,
        }
    }

    pub fn make_grid(rows: &[&[&str]], step_allowance: u32,
                     quota: &[(ResourceKind, u32)], quota_multiplier: i32) -> Grid {
        Grid::from_parsed(&make_map(rows, step_allowance, quota, quota_multiplier))
            .expect("test grid should be valid")
    }

    #[test]
    fn test_registry_matches_cells() {
        let grid = make_grid(&[
            &["S", "S:Coal:3", "I"],
            &["M:Fish:1", "TS", "S:Coal:2"],
        ], 5, &[(ResourceKind::Coal, 3)], 2);
        assert_eq!(grid.resources_of(ResourceKind::Coal),
                   &[Pos::new(0, 1), Pos::new(1, 2)]);
        assert_eq!(grid.resources_of(ResourceKind::Fish), &[Pos::new(1, 0)]);
        assert!(grid.resources_of(ResourceKind::ScrapMetal).is_empty());
        for kind in ResourceKind::ALL {
            for pos in grid.resources_of(kind) {
                assert_eq!(grid.cell_at(pos).unwrap().resource.unwrap().kind, kind);
            }
        }
        assert_eq!(grid.total_amount(ResourceKind::Coal), 5);
        assert_eq!(grid.quota(ResourceKind::Coal), Some(3));
        assert_eq!(grid.quota(ResourceKind::Fish), None);
        assert_eq!(grid.max_difficulty(), 15);
    }

    #[test]
    fn test_cell_at_out_of_bounds() {
        let grid = make_grid(&[&["S", "I"]], 5, &[], 1);
        assert_eq!(grid.cell_at(&Pos::new(0, 1)).unwrap().difficulty(), 5);
        assert_eq!(grid.cell_at(&Pos::new(1, 0)),
                   Err(GridError::OutOfBounds { row: 1, col: 0 }));
        assert_eq!(grid.cell_at(&Pos::new(0, 2)),
                   Err(GridError::OutOfBounds { row: 0, col: 2 }));
    }

    #[test]
    fn test_neighbors_order() {
        let grid = make_grid(&[&["S", "S", "S"], &["S", "S", "S"], &["S", "S", "S"]],
                             5, &[], 1);
        let center: Vec<Pos> = grid.neighbors(Pos::new(1, 1)).into_iter().collect();
        assert_eq!(center, vec![Pos::new(0, 1), Pos::new(2, 1),
                                Pos::new(1, 0), Pos::new(1, 2)]);
        let corner: Vec<Pos> = grid.neighbors(Pos::new(0, 0)).into_iter().collect();
        assert_eq!(corner, vec![Pos::new(1, 0), Pos::new(0, 1)]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut map = make_map(&[&["S", "S"], &["S", "S"]], 5, &[], 1);
        map.size = (2, 3);
        assert!(matches!(Grid::from_parsed(&map),
                         Err(GridError::DimensionMismatch { .. })));
        map.size = (3, 2);
        assert!(matches!(Grid::from_parsed(&map),
                         Err(GridError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_rejects_bad_maps() {
        let mut map = make_map(&[&["S"]], 5, &[], 1);
        map.step_allowance = 0;
        assert_eq!(Grid::from_parsed(&map).unwrap_err(), GridError::ZeroStepAllowance);
        let map = make_map(&[&["S", "X"]], 5, &[], 1);
        assert_eq!(Grid::from_parsed(&map).unwrap_err(),
                   GridError::UnknownTerrain("X".to_string()));
    }

    #[test]
    fn test_pos_serializes_as_pair() {
        let json = serde_json::to_string(&vec![Pos::new(0, 0), Pos::new(2, 3)]).unwrap();
        assert_eq!(json, "[[0,0],[2,3]]");
        let back: Vec<Pos> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Pos::new(0, 0), Pos::new(2, 3)]);
    }

    #[test]
    fn test_display_lists_tiles() {
        let grid = make_grid(&[&["S", "TS:Fish:1"]], 4, &[(ResourceKind::Fish, 1)], 3);
        let printed = grid.to_string();
        assert!(printed.contains("Map size: 1 x 2"));
        assert!(printed.contains("S TS*F"));
        assert!(printed.contains("Fish: quota 1 at (0,1)"));
    }
}
