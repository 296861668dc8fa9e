//! Stochastic ensemble of perturbed projections.
//!
//! Each replicate rescales the survival rates of both compartments by
//! `exp(eps)` with `eps` drawn uniformly from `[-std_dev, std_dev]` per stage,
//! clamps them to `[0, 1]`, and runs the deterministic engine. The uniform
//! draw is a deliberate simplification of lognormal environmental noise.

use crate::config::{CompartmentRates, Config};
use crate::engine::Engine;
use crate::model::SimulationState;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Distribution of the total population across replicates in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStats {
    pub year: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    /// 5th percentile (nearest rank).
    pub p5: f64,
    /// 95th percentile (nearest rank).
    pub p95: f64,
}

/// Aggregated outcome of an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleReport {
    pub n_reps: usize,
    pub year_stats: Vec<YearStats>,
    /// Fraction of replicates whose final total population is below one colony.
    pub extinction_prob: f64,
}

/// Run `n_reps` perturbed replicates of the configured projection.
///
/// One seed per replicate is drawn from `rng` up front, so the result only
/// depends on the state of `rng` and not on how replicates are scheduled.
pub fn run_ensemble<R: Rng>(
    cfg: &Config,
    n_reps: usize,
    std_dev: f64,
    rng: &mut R,
) -> Result<Vec<Vec<SimulationState>>> {
    let eps_dist = Uniform::new_inclusive(-std_dev, std_dev)?;
    let seeds: Vec<u64> = (0..n_reps).map(|_| rng.random()).collect();
    let n_done = AtomicUsize::new(0);
    let log_every = (n_reps / 10).max(1);

    seeds
        .par_iter()
        .enumerate()
        .map(|(i_rep, &seed)| {
            let mut rep_rng = ChaCha12Rng::seed_from_u64(seed);

            let mut rep_cfg = cfg.clone();
            rep_cfg.reef = perturb_survival(&cfg.reef, &eps_dist, &mut rep_rng);
            rep_cfg.nursery = perturb_survival(&cfg.nursery, &eps_dist, &mut rep_rng);

            let engine = Engine::new(&rep_cfg)
                .with_context(|| format!("failed to set up replicate {i_rep}"))?;
            let trajectory = engine.perform_simulation();

            let done = n_done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % log_every == 0 || done == n_reps {
                let progress = 100.0 * done as f64 / n_reps as f64;
                log::info!("completed {progress:06.2}%");
            }

            Ok(trajectory)
        })
        .collect()
}

fn perturb_survival<R: Rng>(
    rates: &CompartmentRates,
    eps_dist: &Uniform<f64>,
    rng: &mut R,
) -> CompartmentRates {
    let survival = rates
        .survival
        .iter()
        .map(|&s| (s * eps_dist.sample(rng).exp()).clamp(0.0, 1.0))
        .collect();
    CompartmentRates {
        survival,
        ..rates.clone()
    }
}

/// Per-year statistics of the total population across replicates.
///
/// Percentiles use nearest-rank indexing into the sorted values
/// (`floor(n * 0.05)`, `floor(n / 2)`, `floor(n * 0.95)`), without
/// interpolation. An empty ensemble yields no years.
pub fn ensemble_stats(runs: &[Vec<SimulationState>]) -> Vec<YearStats> {
    let n_years = runs.iter().map(Vec::len).min().unwrap_or(0);

    (0..n_years)
        .map(|year| {
            let mut pops: Vec<f64> = runs.iter().map(|run| run[year].total_population).collect();
            pops.sort_by(f64::total_cmp);

            let mut acc = Accumulator::new();
            pops.iter().for_each(|&pop| acc.add(pop));
            let report = acc.report();

            let n = pops.len();
            YearStats {
                year,
                mean: report.mean,
                std_dev: report.std_dev,
                median: pops[n / 2],
                p5: pops[(n as f64 * 0.05).floor() as usize],
                p95: pops[(n as f64 * 0.95).floor() as usize],
            }
        })
        .collect()
}

/// Reduce an ensemble to its report.
pub fn summarize_ensemble(runs: &[Vec<SimulationState>]) -> EnsembleReport {
    let n_extinct = runs
        .iter()
        .filter(|run| run.last().is_none_or(|state| state.total_population < 1.0))
        .count();
    let extinction_prob = if runs.is_empty() {
        1.0
    } else {
        n_extinct as f64 / runs.len() as f64
    };

    EnsembleReport {
        n_reps: runs.len(),
        year_stats: ensemble_stats(runs),
        extinction_prob,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::population::StageVector;

    fn state_with_total(year: usize, total: f64) -> SimulationState {
        SimulationState {
            year,
            reef: StageVector::new([total, 0.0, 0.0, 0.0, 0.0]),
            nursery: StageVector::zeros(),
            larval_pool: 0.0,
            total_population: total,
            coral_cover: 0.1 * total,
            larvae_produced: 0.0,
        }
    }

    #[test]
    fn percentiles_are_ordered() {
        let cfg = Config::preset(Preset::Baseline, 10);
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let runs = run_ensemble(&cfg, 100, 0.1, &mut rng).unwrap();

        assert_eq!(runs.len(), 100);
        let stats = ensemble_stats(&runs);
        assert_eq!(stats.len(), 10);
        for stat in &stats {
            assert!(stat.p5 <= stat.median);
            assert!(stat.median <= stat.p95);
        }
    }

    #[test]
    fn same_seed_gives_same_ensemble() {
        let cfg = Config::preset(Preset::Conservative, 5);
        let runs_a = run_ensemble(&cfg, 8, 0.2, &mut ChaCha12Rng::seed_from_u64(3)).unwrap();
        let runs_b = run_ensemble(&cfg, 8, 0.2, &mut ChaCha12Rng::seed_from_u64(3)).unwrap();
        assert_eq!(runs_a, runs_b);
    }

    #[test]
    fn zero_spread_reproduces_deterministic_run() {
        let cfg = Config::preset(Preset::Baseline, 6);
        let det = Engine::new(&cfg).unwrap().perform_simulation();
        let runs = run_ensemble(&cfg, 3, 0.0, &mut ChaCha12Rng::seed_from_u64(1)).unwrap();
        for run in runs {
            assert_eq!(run, det);
        }
    }

    #[test]
    fn perturbed_survival_stays_in_bounds() {
        let eps_dist = Uniform::new_inclusive(-1.0, 1.0).unwrap();
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let rates = CompartmentRates::nursery();
        for _ in 0..50 {
            let new = perturb_survival(&rates, &eps_dist, &mut rng);
            assert!(new.survival.iter().all(|&s| (0.0..=1.0).contains(&s)));
            assert_eq!(new.growth, rates.growth);
            assert_eq!(new.fecundity, rates.fecundity);
        }
    }

    #[test]
    fn nearest_rank_indexing() {
        let runs: Vec<_> = (0..20)
            .map(|i| vec![state_with_total(0, i as f64)])
            .rev()
            .collect();
        let stats = ensemble_stats(&runs);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].p5, 1.0);
        assert_eq!(stats[0].median, 10.0);
        assert_eq!(stats[0].p95, 19.0);
        assert!((stats[0].mean - 9.5).abs() < 1e-12);
    }

    #[test]
    fn empty_ensemble_is_neutral() {
        assert!(ensemble_stats(&[]).is_empty());
        let report = summarize_ensemble(&[]);
        assert_eq!(report.n_reps, 0);
        assert_eq!(report.extinction_prob, 1.0);
    }

    #[test]
    fn extinction_probability_counts_final_states() {
        let runs = vec![
            vec![state_with_total(0, 5.0), state_with_total(1, 0.5)],
            vec![state_with_total(0, 5.0), state_with_total(1, 8.0)],
        ];
        assert_eq!(summarize_ensemble(&runs).extinction_prob, 0.5);
    }
}
