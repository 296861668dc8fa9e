use crate::config::CompartmentRates;
use crate::error::DemographyError;
use crate::matrix::{EIGEN_ITERATIONS, StageMatrix};
use crate::population::{N_STAGES, stage_array};

/// Precomputed demographic operators of one compartment.
#[derive(Debug, Clone, PartialEq)]
pub struct Demography {
    /// Diagonal survival operator `S`.
    pub survival: StageMatrix,
    /// Growth, shrinkage and stasis operator `T`.
    pub transition: StageMatrix,
    /// Fragment production operator `F`.
    pub fragmentation: StageMatrix,
    /// Single-step operator `S (T + F)`.
    pub projection: StageMatrix,
    /// Larvae per colony and year.
    pub fecundity: [f64; N_STAGES],
}

impl Demography {
    /// Compile raw rates into demographic operators.
    ///
    /// # Errors
    /// Returns [`DemographyError::InvalidDimension`] if any rate is not sized
    /// for five stages, and [`DemographyError::InvalidTransitionMatrix`] if
    /// growth and shrinkage leave no valid stasis in some column.
    pub fn compile(rates: &CompartmentRates) -> Result<Self, DemographyError> {
        let survival = StageMatrix::survival(&rates.survival)?;
        let growth = StageMatrix::from_rows(&rates.growth)?;
        let shrinkage = StageMatrix::from_rows(&rates.shrinkage)?;
        let fragmentation = StageMatrix::from_rows(&rates.fragmentation)?;
        let fecundity = stage_array(&rates.fecundity)?;

        let transition = StageMatrix::transition(&growth, &shrinkage);
        transition.check_transition()?;

        let projection = survival.multiply(&transition.add(&fragmentation));

        Ok(Self {
            survival,
            transition,
            fragmentation,
            projection,
            fecundity,
        })
    }

    /// Asymptotic annual growth rate (dominant eigenvalue of the projection).
    pub fn growth_rate(&self) -> f64 {
        self.projection.dominant_eigenvalue(EIGEN_ITERATIONS)
    }
}
