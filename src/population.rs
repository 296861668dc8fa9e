//! Size-structured population vectors.

use crate::error::DemographyError;
use serde::{Deserialize, Serialize};

/// Number of colony size classes (SC1 to SC5).
pub const N_STAGES: usize = 5;

/// Midpoint planar area of each size class in cm².
pub const STAGE_AREAS: [f64; N_STAGES] = [0.1, 43.0, 369.0, 2158.0, 11171.0];

/// Convert a rate slice into a per-stage array.
///
/// # Errors
/// Returns [`DemographyError::InvalidDimension`] unless `vals` has five entries.
pub fn stage_array(vals: &[f64]) -> Result<[f64; N_STAGES], DemographyError> {
    vals.try_into().map_err(|_| DemographyError::InvalidDimension {
        expected: N_STAGES,
        found: vals.len(),
    })
}

/// Colony counts per size class, ordered from smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageVector([f64; N_STAGES]);

impl StageVector {
    pub const fn new(counts: [f64; N_STAGES]) -> Self {
        Self(counts)
    }

    pub const fn zeros() -> Self {
        Self([0.0; N_STAGES])
    }

    /// # Errors
    /// Returns [`DemographyError::InvalidDimension`] unless `counts` has five entries.
    pub fn from_slice(counts: &[f64]) -> Result<Self, DemographyError> {
        stage_array(counts).map(Self)
    }

    pub fn as_array(&self) -> &[f64; N_STAGES] {
        &self.0
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Planar area covered by the population.
    pub fn cover(&self, stage_areas: &[f64; N_STAGES]) -> f64 {
        weighted_sum(&self.0, stage_areas)
    }

    /// Larvae released in one year given per-colony fecundity.
    pub fn larval_yield(&self, fecundity: &[f64; N_STAGES]) -> f64 {
        weighted_sum(&self.0, fecundity)
    }

    /// Scale all stages uniformly so that cover does not exceed `max_cover`.
    pub fn apply_capacity(&self, max_cover: f64, stage_areas: &[f64; N_STAGES]) -> Self {
        let cover = self.cover(stage_areas);
        if cover <= max_cover {
            return *self;
        }
        self.scale(max_cover / cover)
    }

    /// Scale all stages uniformly so that the colony count does not exceed `max_total`.
    pub fn apply_count_limit(&self, max_total: f64) -> Self {
        let total = self.total();
        if total <= max_total {
            return *self;
        }
        self.scale(max_total / total)
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.map(|ele| ele * factor))
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut res = self.0;
        for (ele, &oth) in res.iter_mut().zip(&other.0) {
            *ele += oth;
        }
        Self(res)
    }

    /// Add newly settled recruits to the smallest size class.
    pub fn recruit(&mut self, settlers: f64) {
        self.0[0] += settlers;
    }

    /// Zero out components pushed below zero by rounding.
    pub fn clamp_non_negative(&mut self) {
        self.0.iter_mut().for_each(|ele| *ele = ele.max(0.0));
    }

    /// Share of colonies in each stage as percentages (all zero when empty).
    pub fn distribution(&self) -> [f64; N_STAGES] {
        let total = self.total();
        if total == 0.0 {
            return [0.0; N_STAGES];
        }
        self.0.map(|ele| 100.0 * ele / total)
    }

    pub fn is_extinct(&self) -> bool {
        self.total() < 1.0
    }

    /// Count-weighted mean stage index in `1..=5`, or 0 for an empty population.
    pub fn mean_stage(&self) -> f64 {
        let total = self.total();
        if total == 0.0 {
            return 0.0;
        }
        let weights: [f64; N_STAGES] = std::array::from_fn(|i| (i + 1) as f64);
        weighted_sum(&self.0, &weights) / total
    }
}

fn weighted_sum(vals: &[f64; N_STAGES], weights: &[f64; N_STAGES]) -> f64 {
    vals.iter().zip(weights).map(|(v, w)| v * w).sum()
}
