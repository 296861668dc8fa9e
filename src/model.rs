//! Simulation output types.

use crate::population::StageVector;
use serde::{Deserialize, Serialize};

/// State of the compartments after one annual step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Index of the simulated year, starting at 0.
    pub year: usize,

    /// Reef colonies per size class.
    pub reef: StageVector,
    /// Nursery colonies per size class.
    pub nursery: StageVector,

    /// Larvae collected into the rearing facility this year.
    pub larval_pool: f64,

    /// Colonies across reef and nursery.
    pub total_population: f64,
    /// Planar area covered by reef colonies.
    pub coral_cover: f64,
    /// Larvae released by both compartments this year.
    pub larvae_produced: f64,
}
