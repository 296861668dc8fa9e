use crate::config::{Config, ManagementParams};
use crate::demography::Demography;
use crate::model::SimulationState;
use crate::population::{STAGE_AREAS, StageVector};
use anyhow::{Context, Result};

/// Fraction of collected larvae that settle and are outplanted.
pub const SETTLEMENT_SUCCESS: f64 = 0.5;

/// Deterministic projection engine.
///
/// Holds the compiled demography of both compartments, the management
/// parameters and the initial populations, and advances them year by year.
pub struct Engine {
    years: usize,
    mgmt: ManagementParams,
    reef: Demography,
    nursery: Demography,
    init: Compartments,
}

/// Mutable populations carried from one year to the next.
#[derive(Clone, Copy)]
struct Compartments {
    reef: StageVector,
    nursery: StageVector,
    larval_pool: f64,
}

impl Engine {
    /// Compile the demography of both compartments and set up the initial state.
    pub fn new(cfg: &Config) -> Result<Self> {
        let reef = Demography::compile(&cfg.reef).context("failed to compile reef demography")?;
        let nursery =
            Demography::compile(&cfg.nursery).context("failed to compile nursery demography")?;

        let init = Compartments {
            reef: StageVector::from_slice(&cfg.init.reef)
                .context("invalid initial reef population")?,
            nursery: StageVector::from_slice(&cfg.init.nursery)
                .context("invalid initial nursery population")?,
            larval_pool: 0.0,
        };

        Ok(Self {
            years: cfg.years,
            mgmt: cfg.management,
            reef,
            nursery,
            init,
        })
    }

    pub fn reef(&self) -> &Demography {
        &self.reef
    }

    pub fn nursery(&self) -> &Demography {
        &self.nursery
    }

    /// Run all years and return one state per year, in order.
    ///
    /// The initial condition itself is not recorded.
    pub fn perform_simulation(&self) -> Vec<SimulationState> {
        let mut comp = self.init;
        let mut trajectory = Vec::with_capacity(self.years);

        for year in 0..self.years {
            let state = self.perform_step(&mut comp, year);
            log::debug!(
                "year {year}: total {:.3e}, cover {:.3e}, larvae {:.3e}",
                state.total_population,
                state.coral_cover,
                state.larvae_produced
            );
            trajectory.push(state);
        }

        trajectory
    }

    fn perform_step(&self, comp: &mut Compartments, year: usize) -> SimulationState {
        // Reef: survival, then the full projection (which applies survival again).
        comp.reef = self.reef.survival.apply(&comp.reef);
        comp.reef = self.reef.projection.apply(&comp.reef);
        comp.reef.clamp_non_negative();

        let reef_larvae = comp.reef.larval_yield(&self.reef.fecundity);

        comp.reef = comp.reef.apply_capacity(self.mgmt.reef_area, &STAGE_AREAS);

        // Nursery: survival and transition only, no fragmentation.
        comp.nursery = self.nursery.survival.apply(&comp.nursery);
        comp.nursery = self.nursery.transition.apply(&comp.nursery);
        comp.nursery.clamp_non_negative();

        let nursery_larvae = comp.nursery.larval_yield(&self.nursery.fecundity);

        // The pool holds this year's collection only.
        comp.larval_pool =
            reef_larvae * self.mgmt.reef_yield + nursery_larvae * self.mgmt.nursery_yield;

        if comp.larval_pool > 0.0 {
            let settlers = comp.larval_pool * SETTLEMENT_SUCCESS;
            comp.reef.recruit(settlers * self.mgmt.reef_prop);
            comp.nursery.recruit(settlers * (1.0 - self.mgmt.reef_prop));
        }

        comp.nursery = comp.nursery.apply_count_limit(self.mgmt.nursery_capacity);

        SimulationState {
            year,
            reef: comp.reef,
            nursery: comp.nursery,
            larval_pool: comp.larval_pool,
            total_population: comp.reef.total() + comp.nursery.total(),
            coral_cover: comp.reef.cover(&STAGE_AREAS),
            larvae_produced: reef_larvae + nursery_larvae,
        }
    }
}
