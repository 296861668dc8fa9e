use crate::model::SimulationState;
use serde::{Deserialize, Serialize};

/// Default total population of the time-to-target indicator.
pub const DEFAULT_TARGET_POPULATION: f64 = 5000.0;

/// Online mean and variance (Welford).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Scalar indicators of one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub final_population: f64,
    pub peak_population: f64,
    pub peak_year: usize,
    pub min_population: f64,
    /// First year whose total population reaches the target, if any.
    pub time_to_target: Option<usize>,
    pub final_coral_cover: f64,
    /// Mean relative change of the total population between consecutive years.
    pub mean_growth_rate: f64,
    /// 1 if the final total population is below one colony, else 0.
    pub extinction_risk: f64,
}

impl SimulationSummary {
    /// Summary of an empty trajectory.
    pub fn neutral() -> Self {
        Self {
            final_population: 0.0,
            peak_population: 0.0,
            peak_year: 0,
            min_population: 0.0,
            time_to_target: None,
            final_coral_cover: 0.0,
            mean_growth_rate: 0.0,
            extinction_risk: 1.0,
        }
    }
}

/// Reduce a trajectory to its summary indicators.
///
/// Pure: an empty trajectory gives [`SimulationSummary::neutral`].
pub fn calculate_summary(trajectory: &[SimulationState], target: f64) -> SimulationSummary {
    let Some(final_state) = trajectory.last() else {
        return SimulationSummary::neutral();
    };

    let mut peak_population = 0.0;
    let mut peak_year = 0;
    let mut min_population = f64::INFINITY;
    let mut time_to_target = None;

    for (year, state) in trajectory.iter().enumerate() {
        let pop = state.total_population;
        if pop > peak_population {
            peak_population = pop;
            peak_year = year;
        }
        if pop < min_population {
            min_population = pop;
        }
        if time_to_target.is_none() && pop >= target {
            time_to_target = Some(year);
        }
    }

    let mut growth_acc = Accumulator::new();
    for pair in trajectory.windows(2) {
        let prev = pair[0].total_population;
        if prev > 0.0 {
            growth_acc.add((pair[1].total_population - prev) / prev);
        }
    }
    let mean_growth_rate = if growth_acc.n_vals > 0 {
        growth_acc.report().mean
    } else {
        0.0
    };

    let final_population = final_state.total_population;
    SimulationSummary {
        final_population,
        peak_population,
        peak_year,
        min_population,
        time_to_target,
        final_coral_cover: final_state.coral_cover,
        mean_growth_rate,
        extinction_risk: if final_population < 1.0 { 1.0 } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Preset};
    use crate::engine::Engine;
    use crate::population::StageVector;

    fn trajectory(totals: &[f64]) -> Vec<SimulationState> {
        totals
            .iter()
            .enumerate()
            .map(|(year, &total)| SimulationState {
                year,
                reef: StageVector::new([total, 0.0, 0.0, 0.0, 0.0]),
                nursery: StageVector::zeros(),
                larval_pool: 0.0,
                total_population: total,
                coral_cover: 0.1 * total,
                larvae_produced: 0.0,
            })
            .collect()
    }

    #[test]
    fn accumulator_mean_and_std_dev() {
        let mut acc = Accumulator::new();
        [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .for_each(|&val| acc.add(val));
        let report = acc.report();
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(Accumulator::new().report().std_dev.is_nan());
    }

    #[test]
    fn summarizes_trajectory() {
        let summary = calculate_summary(&trajectory(&[100.0, 200.0, 6000.0, 3000.0]), 5000.0);

        assert_eq!(summary.final_population, 3000.0);
        assert_eq!(summary.peak_population, 6000.0);
        assert_eq!(summary.peak_year, 2);
        assert_eq!(summary.min_population, 100.0);
        assert_eq!(summary.time_to_target, Some(2));
        assert_eq!(summary.final_coral_cover, 300.0);
        let exp_growth = (1.0 + 29.0 - 0.5) / 3.0;
        assert!((summary.mean_growth_rate - exp_growth).abs() < 1e-12);
        assert_eq!(summary.extinction_risk, 0.0);
    }

    #[test]
    fn skips_growth_from_empty_years() {
        let summary = calculate_summary(&trajectory(&[0.0, 10.0, 20.0, 0.5]), 5000.0);
        let exp_growth = (1.0 - 0.975) / 2.0;
        assert!((summary.mean_growth_rate - exp_growth).abs() < 1e-12);
        assert_eq!(summary.time_to_target, None);
        assert_eq!(summary.extinction_risk, 1.0);
    }

    #[test]
    fn empty_trajectory_is_neutral() {
        let summary = calculate_summary(&[], DEFAULT_TARGET_POPULATION);
        assert_eq!(summary, SimulationSummary::neutral());
        assert_eq!(summary.extinction_risk, 1.0);
    }

    #[test]
    fn default_scenario_summary_is_well_formed() {
        let cfg = Config::preset(Preset::Baseline, 10);
        let trajectory = Engine::new(&cfg).unwrap().perform_simulation();

        let summary = calculate_summary(&trajectory, DEFAULT_TARGET_POPULATION);
        for val in [
            summary.final_population,
            summary.peak_population,
            summary.mean_growth_rate,
        ] {
            assert!(val.is_finite());
            assert!(val >= 0.0);
        }
        assert!(summary.peak_year <= 9);

        assert_eq!(
            calculate_summary(&trajectory, DEFAULT_TARGET_POPULATION),
            summary
        );
    }
}
