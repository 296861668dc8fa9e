use crate::stats::DEFAULT_TARGET_POPULATION;
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Upper bound on the projection horizon.
pub const MAX_YEARS: usize = 100;

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of annual steps to project.
    pub years: usize,
    /// Total population used for the time-to-target indicator.
    #[serde(default = "default_target_population")]
    pub target_population: f64,

    /// Initial populations.
    pub init: InitConfig,

    /// Demographic rates of the wild reef.
    pub reef: CompartmentRates,
    /// Demographic rates of the nursery.
    pub nursery: CompartmentRates,

    /// Management actions and capacities.
    pub management: ManagementParams,

    /// Stochastic ensemble settings.
    #[serde(default)]
    pub stochastic: StochasticConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Initial reef colonies per size class.
    pub reef: Vec<f64>,
    /// Initial nursery colonies per size class.
    pub nursery: Vec<f64>,
}

/// Raw per-compartment demographic rates.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CompartmentRates {
    /// Annual survival probability per size class.
    pub survival: Vec<f64>,
    /// Growth probabilities (matrix `5 x 5`, only entries below the diagonal are used).
    pub growth: Vec<Vec<f64>>,
    /// Shrinkage probabilities (matrix `5 x 5`, only entries above the diagonal are used).
    pub shrinkage: Vec<Vec<f64>>,
    /// Fragment production rates (matrix `5 x 5`).
    pub fragmentation: Vec<Vec<f64>>,
    /// Larvae released per colony and year.
    pub fecundity: Vec<f64>,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ManagementParams {
    /// Reef carrying capacity as planar area (cm²).
    pub reef_area: f64,
    /// Nursery carrying capacity as a colony count.
    pub nursery_capacity: f64,
    /// Fraction of reef larvae collected.
    pub reef_yield: f64,
    /// Fraction of nursery larvae collected.
    pub nursery_yield: f64,
    /// Fraction of settlers outplanted to the reef (the rest go to the nursery).
    pub reef_prop: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticConfig {
    /// Also run the perturbed-survival ensemble.
    pub enabled: bool,
    /// Half-width of the log-scale survival perturbation.
    pub std_dev: f64,
    /// Number of ensemble replicates.
    pub n_reps: usize,
    /// Seed of the ensemble random number generator (drawn from the OS if absent).
    pub seed: Option<u64>,
}

impl Default for StochasticConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            std_dev: 0.1,
            n_reps: 100,
            seed: None,
        }
    }
}

fn default_target_population() -> f64 {
    DEFAULT_TARGET_POPULATION
}

/// Named parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Field-calibrated defaults.
    Baseline,
    /// Higher survival and collection yields.
    Optimistic,
    /// Lower survival and collection yields.
    Conservative,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Write the configuration to a TOML file.
    pub fn to_file<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }

    /// Build the configuration of a named parameter set.
    pub fn preset(preset: Preset, years: usize) -> Self {
        let mut cfg = Self {
            years,
            target_population: default_target_population(),
            init: InitConfig {
                reef: vec![100.0, 50.0, 20.0, 5.0, 1.0],
                nursery: vec![0.0; 5],
            },
            reef: CompartmentRates::reef(),
            nursery: CompartmentRates::nursery(),
            management: ManagementParams::default(),
            stochastic: StochasticConfig::default(),
        };

        match preset {
            Preset::Baseline => {}
            Preset::Optimistic => {
                cfg.reef.survival = vec![0.5, 0.7, 0.8, 0.85, 0.9];
                cfg.nursery.survival = vec![0.8, 0.85, 0.9, 0.93, 0.97];
                cfg.management.reef_yield = 0.7;
                cfg.management.nursery_yield = 0.7;
            }
            Preset::Conservative => {
                cfg.reef.survival = vec![0.3, 0.5, 0.6, 0.7, 0.75];
                cfg.nursery.survival = vec![0.6, 0.7, 0.75, 0.8, 0.85];
                cfg.management.reef_yield = 0.3;
                cfg.management.nursery_yield = 0.3;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.years, 1..=MAX_YEARS).context("invalid number of years")?;
        check_num(self.target_population, 0.0..).context("invalid target population")?;

        check_vec(&self.init.reef, 0.0..).context("invalid initial reef population")?;
        check_vec(&self.init.nursery, 0.0..).context("invalid initial nursery population")?;

        self.reef.validate().context("invalid reef rates")?;
        self.nursery.validate().context("invalid nursery rates")?;

        self.management
            .validate()
            .context("invalid management parameters")?;

        check_num(self.stochastic.std_dev, 0.0..=1.0)
            .context("invalid stochastic standard deviation")?;
        check_num(self.stochastic.n_reps, 1..=10_000).context("invalid number of replicates")?;

        Ok(())
    }
}

impl CompartmentRates {
    /// Field-calibrated wild reef rates.
    pub fn reef() -> Self {
        Self {
            survival: vec![0.4, 0.6, 0.7, 0.8, 0.85],
            growth: vec![
                vec![0.80, 0.02, 0.01, 0.00, 0.00],
                vec![0.15, 0.75, 0.03, 0.00, 0.00],
                vec![0.05, 0.18, 0.78, 0.05, 0.00],
                vec![0.00, 0.05, 0.15, 0.82, 0.10],
                vec![0.00, 0.00, 0.03, 0.13, 0.90],
            ],
            shrinkage: vec![
                vec![0.00, 0.02, 0.01, 0.00, 0.00],
                vec![0.00, 0.00, 0.03, 0.00, 0.00],
                vec![0.00, 0.00, 0.00, 0.05, 0.00],
                vec![0.00, 0.00, 0.00, 0.00, 0.10],
                vec![0.00, 0.00, 0.00, 0.00, 0.00],
            ],
            fragmentation: vec![
                vec![0.0, 0.0, 0.0, 0.5, 1.0],
                vec![0.0, 0.0, 0.0, 0.3, 0.6],
                vec![0.0, 0.0, 0.0, 0.2, 0.4],
                vec![0.0, 0.0, 0.0, 0.1, 0.2],
                vec![0.0, 0.0, 0.0, 0.0, 0.1],
            ],
            fecundity: vec![0.0, 0.0, 5000.0, 50000.0, 100000.0],
        }
    }

    /// Protected nursery rates (no fragmentation).
    pub fn nursery() -> Self {
        Self {
            survival: vec![0.7, 0.8, 0.85, 0.9, 0.95],
            growth: vec![
                vec![0.70, 0.01, 0.00, 0.00, 0.00],
                vec![0.25, 0.70, 0.02, 0.00, 0.00],
                vec![0.05, 0.25, 0.75, 0.03, 0.00],
                vec![0.00, 0.04, 0.20, 0.80, 0.08],
                vec![0.00, 0.00, 0.03, 0.17, 0.92],
            ],
            shrinkage: vec![
                vec![0.00, 0.01, 0.00, 0.00, 0.00],
                vec![0.00, 0.00, 0.02, 0.00, 0.00],
                vec![0.00, 0.00, 0.00, 0.03, 0.00],
                vec![0.00, 0.00, 0.00, 0.00, 0.08],
                vec![0.00, 0.00, 0.00, 0.00, 0.00],
            ],
            fragmentation: vec![vec![0.0; 5]; 5],
            fecundity: vec![0.0, 0.0, 6000.0, 60000.0, 120000.0],
        }
    }

    fn validate(&self) -> Result<()> {
        check_vec(&self.survival, 0.0..=1.0).context("invalid survival rates")?;
        check_mat(&self.growth, 0.0..=1.0).context("invalid growth probabilities")?;
        check_mat(&self.shrinkage, 0.0..=1.0).context("invalid shrinkage probabilities")?;
        check_mat(&self.fragmentation, 0.0..).context("invalid fragmentation rates")?;
        check_vec(&self.fecundity, 0.0..).context("invalid fecundity")?;
        Ok(())
    }
}

impl Default for ManagementParams {
    fn default() -> Self {
        Self {
            reef_area: 1e7,
            nursery_capacity: 1000.0,
            reef_yield: 0.5,
            nursery_yield: 0.5,
            reef_prop: 0.75,
        }
    }
}

impl ManagementParams {
    fn validate(&self) -> Result<()> {
        check_num(self.reef_area, (Bound::Excluded(0.0), Bound::Unbounded))
            .context("invalid reef area")?;
        check_num(self.nursery_capacity, 0.0..).context("invalid nursery capacity")?;
        check_num(self.reef_yield, 0.0..=1.0).context("invalid reef yield")?;
        check_num(self.nursery_yield, 0.0..=1.0).context("invalid nursery yield")?;
        check_num(self.reef_prop, 0.0..=1.0).context("invalid reef proportion")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

// Lengths are left to the typed constructors.
fn check_vec<R>(vec: &[f64], range: R) -> Result<()>
where
    R: RangeBounds<f64> + Debug + Clone,
{
    for (i_ele, &ele) in vec.iter().enumerate() {
        check_num(ele, range.clone()).with_context(|| format!("invalid element {i_ele}"))?;
    }
    Ok(())
}

fn check_mat<R>(mat: &[Vec<f64>], range: R) -> Result<()>
where
    R: RangeBounds<f64> + Debug + Clone,
{
    for (i_row, row) in mat.iter().enumerate() {
        check_vec(row, range.clone()).with_context(|| format!("invalid row {i_row}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in [Preset::Baseline, Preset::Optimistic, Preset::Conservative] {
            Config::preset(preset, 50).validate().unwrap();
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = Config::preset(Preset::Baseline, 0);
        assert!(cfg.validate().is_err());

        cfg.years = MAX_YEARS + 1;
        assert!(cfg.validate().is_err());

        cfg.years = 10;
        cfg.reef.survival[2] = 1.2;
        assert!(cfg.validate().is_err());

        cfg.reef.survival[2] = 0.7;
        cfg.management.reef_prop = -0.1;
        assert!(cfg.validate().is_err());

        cfg.management.reef_prop = 0.75;
        cfg.stochastic.n_reps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_reef_area() {
        let mut cfg = Config::preset(Preset::Baseline, 10);
        for reef_area in [0.0, -1.0, f64::NAN] {
            cfg.management.reef_area = reef_area;
            assert!(cfg.validate().is_err(), "accepted reef area {reef_area}");
        }

        cfg.management.reef_area = 1e-3;
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_nan_reef_area_in_toml() {
        let cfg = Config::preset(Preset::Baseline, 10);
        let contents: String = toml::to_string_pretty(&cfg)
            .unwrap()
            .lines()
            .map(|line| {
                if line.starts_with("reef_area") {
                    "reef_area = nan\n".to_string()
                } else {
                    format!("{line}\n")
                }
            })
            .collect();

        let parsed: Config = toml::from_str(&contents).unwrap();
        assert!(parsed.management.reef_area.is_nan());
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn parses_toml_with_defaults() {
        let cfg = Config::preset(Preset::Conservative, 20);
        let contents = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, cfg);

        let stripped: String = contents
            .lines()
            .take_while(|line| !line.starts_with("[stochastic]"))
            .filter(|line| !line.starts_with("target_population"))
            .map(|line| format!("{line}\n"))
            .collect();
        let parsed: Config = toml::from_str(&stripped).unwrap();
        assert_eq!(parsed.target_population, 5000.0);
        assert_eq!(parsed.stochastic, StochasticConfig::default());
    }
}
