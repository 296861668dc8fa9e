use crate::config::{Config, Preset};
use crate::engine::Engine;
use crate::ensemble::{run_ensemble, summarize_ensemble};
use crate::stats::calculate_summary;
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::encode;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    /// Write a preset configuration into `sim_dir`.
    pub fn create_config<P: AsRef<Path>>(sim_dir: P, preset: Preset, years: usize) -> Result<()> {
        let sim_dir = sim_dir.as_ref();
        fs::create_dir_all(sim_dir).with_context(|| format!("failed to create {sim_dir:?}"))?;

        let config_file = config_file(sim_dir);
        if config_file.exists() {
            bail!("{config_file:?} already exists");
        }

        let cfg = Config::preset(preset, years);
        cfg.validate().context("invalid preset")?;
        cfg.to_file(&config_file)?;
        log::info!("created {config_file:?}");

        Ok(())
    }

    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(config_file(&sim_dir)).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn run_simulation(&self) -> Result<()> {
        let engine = Engine::new(&self.cfg).context("failed to construct engine")?;

        for (name, demo) in [("reef", engine.reef()), ("nursery", engine.nursery())] {
            let lambda = demo.growth_rate();
            log::info!("{name} asymptotic growth rate: {lambda:.4}");
            if lambda < 1.0 {
                log::warn!("{name} population declines without recruitment");
            }
        }

        let trajectory = engine.perform_simulation();
        let summary = calculate_summary(&trajectory, self.cfg.target_population);

        write_msgpack(self.sim_dir.join("trajectory.msgpack"), &trajectory)
            .context("failed to save trajectory")?;
        write_msgpack(self.sim_dir.join("summary.msgpack"), &summary)
            .context("failed to save summary")?;

        log::info!("{summary:#?}");
        if let Some(state) = trajectory.last() {
            log::info!(
                "final reef distribution (%): {:.2?}, mean stage: {:.3}",
                state.reef.distribution(),
                state.reef.mean_stage()
            );
        }

        if self.cfg.stochastic.enabled {
            self.run_stochastic().context("failed to run ensemble")?;
        }

        Ok(())
    }

    fn run_stochastic(&self) -> Result<()> {
        let stoch = &self.cfg.stochastic;
        let seed = match stoch.seed {
            Some(seed) => seed,
            None => ChaCha12Rng::try_from_os_rng()?.random(),
        };
        log::info!("running {} replicates with seed {seed}", stoch.n_reps);

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let runs = run_ensemble(&self.cfg, stoch.n_reps, stoch.std_dev, &mut rng)?;
        let report = summarize_ensemble(&runs);

        write_msgpack(self.sim_dir.join("ensemble.msgpack"), &report)
            .context("failed to save ensemble report")?;

        if report.extinction_prob > 0.0 {
            log::warn!("extinction probability: {:.3}", report.extinction_prob);
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let pattern = self.sim_dir.join("*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        for file in glob(pattern).context("failed to glob output files")? {
            let file = file.context("failed to read glob entry")?;
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }
}

fn config_file(sim_dir: &Path) -> PathBuf {
    sim_dir.join("config.toml")
}

fn write_msgpack<P: AsRef<Path>, T: Serialize + ?Sized>(file: P, val: &T) -> Result<()> {
    let file = file.as_ref();
    let handle = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(handle);
    encode::write(&mut writer, val).context("failed to serialize value")?;
    writer.flush().context("failed to flush writer stream")?;
    log::info!("wrote {file:?}");
    Ok(())
}
