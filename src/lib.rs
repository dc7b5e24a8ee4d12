pub mod challenge;
pub mod challenge_consts;
pub mod grid;
pub mod map_format;
pub mod party;
pub mod scoring;
pub mod search;
pub mod simple_search;
pub mod solvers;
