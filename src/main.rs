use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reefsim::config::Preset;
use reefsim::manager::Manager;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Init {
        #[arg(long, value_enum, default_value_t = Preset::Baseline)]
        preset: Preset,

        #[arg(long, default_value_t = 50)]
        years: usize,
    },

    Run,

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Init { preset, years } => Manager::create_config(&args.sim_dir, preset, years)
            .context("failed to create config")?,
        Command::Run => Manager::new(&args.sim_dir)
            .context("failed to construct mgr")?
            .run_simulation()?,
        Command::Clean => Manager::new(&args.sim_dir)
            .context("failed to construct mgr")?
            .clean_sim()?,
    }

    Ok(())
}
