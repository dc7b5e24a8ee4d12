// Map files, either as JSON (`ParsedMap` straight through serde) or in the
// line-based text format:
//
//   map_size 3x4
//   Step_allowance 12
//   Quota 3,2,1
//   Quota_multiplier 2
//   S S I TS S M S S I I S S
//   Coal,2 0,1 2,3
//   Fish,1 1,1,4
//
// Quotas are listed as Coal, Fish, Scrap_metal. Terrain codes are row-major
// and may span several lines. A resource line gives the kind and how many
// locations follow, each as "row,col" or "row,col,amount" (amount defaults
// to 1).
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::grid::{Grid, GridError, ResourceKind, Terrain};

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Failed reading the map file")]
    ReadError(#[from] std::io::Error),
    #[error("Failed parsing the JSON map")]
    ParseError(#[from] serde_json::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: can't read cell encoding {token:?}")]
    InvalidCellEncoding { line: usize, token: String },
    #[error("map file has no {0} line")]
    Missing(&'static str),
    #[error("invalid map")]
    Grid(#[from] GridError),
}

fn default_amount() -> u32 {
    1
}

fn default_quota_multiplier() -> i32 {
    1
}

/// One cell of a parsed map: either a bare terrain code, or a terrain with a
/// resource on it.
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum CellDescriptor {
    Terrain(String),
    Detailed {
        terrain: Terrain,
        #[serde(default)]
        resource: Option<ResourceKind>,
        #[serde(default = "default_amount")]
        amount: u32,
    },
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMap {
    pub step_allowance: u32,
    #[serde(default)]
    pub quota: FxHashMap<ResourceKind, u32>,
    #[serde(default = "default_quota_multiplier")]
    pub quota_multiplier: i32,
    /// (rows, cols)
    pub size: (usize, usize),
    /// grid[row][col]
    pub grid: Vec<Vec<CellDescriptor>>,
}

lazy_static! {
    static ref KEY_VALUE: Regex = Regex::new(
        r"^(map_size|Step_allowance|Quota_multiplier|Quota)[ =]\s*(\S+)\s*$").unwrap();
    static ref MAP_SIZE: Regex = Regex::new(r"^(\d+)x(\d+)$").unwrap();
    static ref RESOURCE_HEADER: Regex = Regex::new(r"^([A-Za-z_]+),(\d+)$").unwrap();
    static ref LOCATION: Regex = Regex::new(r"^(\d+),(\d+)(?:,(\d+))?$").unwrap();
}

struct Placement {
    line: usize,
    kind: ResourceKind,
    row: usize,
    col: usize,
    amount: u32,
}

fn parse_number<T: std::str::FromStr>(value: &str, line: usize, what: &str) -> Result<T, MapError> {
    value.parse().map_err(|_| MapError::Syntax {
        line, message: format!("{what} should be a number, got {value:?}"),
    })
}

fn parse_location(token: &str, line: usize) -> Result<(usize, usize, u32), MapError> {
    let invalid = || MapError::InvalidCellEncoding { line, token: token.to_string() };
    let caps = LOCATION.captures(token).ok_or_else(invalid)?;
    let row = caps[1].parse().map_err(|_| invalid())?;
    let col = caps[2].parse().map_err(|_| invalid())?;
    let amount = match caps.get(3) {
        Some(amount) => amount.as_str().parse().map_err(|_| invalid())?,
        None => default_amount(),
    };
    Ok((row, col, amount))
}

/// Parses the text map format. Malformed resource locations are skipped with
/// a warning, anything else malformed is an error.
pub fn parse_text(text: &str) -> Result<ParsedMap, MapError> {
    let mut size: Option<(usize, usize)> = None;
    let mut step_allowance: Option<u32> = None;
    let mut quota = FxHashMap::default();
    let mut quota_multiplier = default_quota_multiplier();
    let mut terrain: Vec<Terrain> = Vec::new();
    let mut placements: Vec<Placement> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        if let Some(caps) = KEY_VALUE.captures(content) {
            let value = &caps[2];
            match &caps[1] {
                "map_size" => {
                    let dims = MAP_SIZE.captures(value).ok_or_else(|| MapError::Syntax {
                        line, message: format!("map_size should look like 3x4, got {value:?}"),
                    })?;
                    let rows: usize = parse_number(&dims[1], line, "rows")?;
                    let cols: usize = parse_number(&dims[2], line, "columns")?;
                    if rows.checked_mul(cols).is_none() {
                        return Err(MapError::Syntax {
                            line, message: format!("map_size {rows}x{cols} is too large"),
                        });
                    }
                    size = Some((rows, cols));
                },
                "Step_allowance" => {
                    step_allowance = Some(parse_number(value, line, "Step_allowance")?);
                },
                "Quota_multiplier" => {
                    quota_multiplier = parse_number(value, line, "Quota_multiplier")?;
                },
                _ => {
                    let amounts: Vec<&str> = value.split(',').collect();
                    if amounts.len() != ResourceKind::ALL.len() {
                        return Err(MapError::Syntax {
                            line,
                            message: format!("Quota needs {} values, got {value:?}",
                                             ResourceKind::ALL.len()),
                        });
                    }
                    for (kind, amount) in ResourceKind::ALL.iter().zip(amounts) {
                        quota.insert(*kind, parse_number(amount, line, "Quota")?);
                    }
                },
            }
            continue;
        }

        let tokens: Vec<&str> = content.split_whitespace().collect();
        if let Some(caps) = RESOURCE_HEADER.captures(tokens[0]) {
            let Some(kind) = ResourceKind::from_name(&caps[1]) else {
                warn!("line {line}: unknown resource {:?}, skipping line", &caps[1]);
                continue;
            };
            let count: usize = parse_number(&caps[2], line, "resource count")?;
            let locations = &tokens[1..];
            if locations.len() != count {
                warn!("line {line}: {} announces {count} location(s) but lists {}",
                      kind.name(), locations.len());
            }
            for token in locations.iter().take(count) {
                match parse_location(token, line) {
                    Ok((row, col, amount)) => {
                        placements.push(Placement { line, kind, row, col, amount });
                    },
                    Err(err) => warn!("{err}, no resource placed"),
                }
            }
            continue;
        }

        let Some((rows, cols)) = size else {
            return Err(MapError::Syntax {
                line, message: "terrain listed before map_size".to_string(),
            });
        };
        for token in tokens {
            terrain.push(Terrain::from_code(token).map_err(|err| MapError::Syntax {
                line, message: err.to_string(),
            })?);
        }
        if terrain.len() > rows * cols {
            return Err(MapError::Syntax {
                line,
                message: format!("{} terrain codes for a {rows}x{cols} map", terrain.len()),
            });
        }
    }

    let (rows, cols) = size.ok_or(MapError::Missing("map_size"))?;
    let step_allowance = step_allowance.ok_or(MapError::Missing("Step_allowance"))?;
    if terrain.len() != rows * cols {
        return Err(GridError::DimensionMismatch {
            rows, cols, detail: format!("got {} terrain codes", terrain.len()),
        }.into());
    }

    let mut resources: Vec<Option<(ResourceKind, u32)>> = vec![None; rows * cols];
    for placement in placements {
        if placement.row >= rows || placement.col >= cols {
            warn!("line {}: {} at ({},{}) is outside the map, skipping",
                  placement.line, placement.kind.name(), placement.row, placement.col);
            continue;
        }
        let idx = placement.row * cols + placement.col;
        let existing = resources[idx];
        match existing {
            None => resources[idx] = Some((placement.kind, placement.amount)),
            Some((kind, amount)) if kind == placement.kind => {
                resources[idx] = Some((kind, amount.saturating_add(placement.amount)));
            },
            Some((kind, _)) => warn!(
                "line {}: ({},{}) already holds {}, skipping {}",
                placement.line, placement.row, placement.col, kind.name(),
                placement.kind.name()),
        }
    }

    let grid = (0..rows).map(|r| (0..cols).map(|c| {
        let idx = r * cols + c;
        match resources[idx] {
            Some((kind, amount)) => CellDescriptor::Detailed {
                terrain: terrain[idx], resource: Some(kind), amount,
            },
            None => CellDescriptor::Terrain(terrain[idx].code().to_string()),
        }
    }).collect()).collect();

    Ok(ParsedMap { step_allowance, quota, quota_multiplier, size: (rows, cols), grid })
}

pub fn parse_json(text: &str) -> Result<ParsedMap, MapError> {
    Ok(serde_json::from_str(text)?)
}

/// Reads a map file, as JSON if it has a `.json` extension, as text otherwise.
pub fn load_map(path: &Path) -> Result<Grid, MapError> {
    let data = std::fs::read_to_string(path)?;
    let is_json = path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    debug!("Loading {} map from {}", if is_json { "JSON" } else { "text" }, path.display());
    let parsed = if is_json { parse_json(&data)? } else { parse_text(&data)? };
    Ok(Grid::from_parsed(&parsed)?)
}

#[cfg(test)]
mod tests {
    use crate::grid::Pos;
    use super::*;

    const SAMPLE: &str = "\
map_size 2x3
Step_allowance 6
Quota 3,1,1
Quota_multiplier 2
S I TS
M S S
Coal,2 0,1,2 1,2
Fish,1 1,1
";

    #[test]
    fn test_parse_text() {
        let parsed = parse_text(SAMPLE).unwrap();
        assert_eq!(parsed.size, (2, 3));
        assert_eq!(parsed.step_allowance, 6);
        assert_eq!(parsed.quota_multiplier, 2);
        assert_eq!(parsed.quota.get(&ResourceKind::Coal), Some(&3));
        assert_eq!(parsed.quota.get(&ResourceKind::ScrapMetal), Some(&1));
        let grid = Grid::from_parsed(&parsed).unwrap();
        assert_eq!(grid.cell(&Pos::new(0, 2)).terrain, Terrain::TallSand);
        assert_eq!(grid.resources_of(ResourceKind::Coal), &[Pos::new(0, 1), Pos::new(1, 2)]);
        assert_eq!(grid.total_amount(ResourceKind::Coal), 3);
        assert_eq!(grid.resources_of(ResourceKind::Fish), &[Pos::new(1, 1)]);
    }

    #[test]
    fn test_bad_locations_are_skipped() {
        let text = "map_size 1x3\nStep_allowance 4\nS S S\nCoal,3 0,1 zz 0,9\n";
        let grid = Grid::from_parsed(&parse_text(text).unwrap()).unwrap();
        assert_eq!(grid.resources_of(ResourceKind::Coal), &[Pos::new(0, 1)]);
    }

    #[test]
    fn test_terrain_may_span_lines_and_use_equals() {
        let text = "map_size=2x2\nStep_allowance=3\n# terrain\nS I\nM TS\n";
        let parsed = parse_text(text).unwrap();
        let grid = Grid::from_parsed(&parsed).unwrap();
        assert_eq!(grid.cell(&Pos::new(1, 1)).difficulty(), 10);
        assert!(parsed.quota.is_empty());
        assert_eq!(parsed.quota_multiplier, 1);
    }

    #[test]
    fn test_text_errors() {
        assert!(matches!(parse_text("Step_allowance 3\nS S\n"),
                         Err(MapError::Syntax { line: 2, .. })));
        assert!(matches!(parse_text("map_size 1x2\nS S\n"),
                         Err(MapError::Missing("Step_allowance"))));
        assert!(matches!(parse_text("map_size 1x3\nStep_allowance 2\nS S\n"),
                         Err(MapError::Grid(GridError::DimensionMismatch { .. }))));
        assert!(matches!(parse_text("map_size 1x2\nStep_allowance 2\nS Q\n"),
                         Err(MapError::Syntax { line: 3, .. })));
        assert!(matches!(parse_text("map_size 1x1\nStep_allowance 2\nQuota 1,2\nS\n"),
                         Err(MapError::Syntax { line: 3, .. })));
    }

    #[test]
    fn test_oversized_values() {
        assert!(matches!(parse_text("map_size 99999999999x99999999999\nStep_allowance 2\n"),
                         Err(MapError::Syntax { line: 1, .. })));
        let text = "map_size 1x2\nStep_allowance 2\nS S\nCoal,2 0,1,4000000000 0,1,4000000000\n";
        let grid = Grid::from_parsed(&parse_text(text).unwrap()).unwrap();
        assert_eq!(grid.total_amount(ResourceKind::Coal), u32::MAX);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "stepAllowance": 5,
            "quota": {"Coal": 3, "Scrap_metal": 1},
            "quotaMultiplier": 2,
            "size": [1, 3],
            "grid": [["S", {"terrain": "I", "resource": "Coal", "amount": 3}, "M"]]
        }"#;
        let parsed = parse_json(json).unwrap();
        let grid = Grid::from_parsed(&parsed).unwrap();
        assert_eq!(grid.step_allowance(), 5);
        assert_eq!(grid.quota(ResourceKind::ScrapMetal), Some(1));
        assert_eq!(grid.quota(ResourceKind::Fish), None);
        assert_eq!(grid.resources_of(ResourceKind::Coal), &[Pos::new(0, 1)]);
        assert_eq!(grid.cell(&Pos::new(0, 1)).difficulty(), 5);
    }

    #[test]
    fn test_load_sample_map() {
        // Note this reads from disk, relative to the crate root.
        let grid = load_map(Path::new("./maps/map.txt")).expect("sample map should load");
        assert_eq!((grid.rows(), grid.cols()), (4, 5));
        assert!(!grid.resources_of(ResourceKind::Coal).is_empty());
    }
}
