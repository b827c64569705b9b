use crate::analysis::{Analyzer, REPORT_FILES};
use crate::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn simulate(&self, seed: Option<u64>, report: bool) -> Result<()> {
        let mut cfg = self.cfg.clone();
        if let Some(seed) = seed {
            log::info!("overriding seed {} with {seed}", cfg.population.seed);
            cfg.population.seed = seed;
        }

        let engine = Engine::new(cfg).context("failed to construct engine")?;
        let data = engine.simulate().context("failed to simulate dataset")?;

        data.save(self.utilities_file(), self.trips_file())
            .context("failed to save dataset")?;

        if report {
            let mut analyzer = Analyzer::new(engine.cfg());
            analyzer
                .add_dataset(&data)
                .context("failed to analyze dataset")?;
            analyzer
                .save_results(&self.sim_dir)
                .context("failed to save reports")?;
        }

        Ok(())
    }

    /// Remove the tables and reports written by [`Manager::simulate`].
    ///
    /// Other files in the simulation directory are left untouched.
    pub fn clean(&self) -> Result<()> {
        for file in self.output_files() {
            if !file.exists() {
                continue;
            }
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }

    fn output_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.utilities_file(), self.trips_file()];
        files.extend(REPORT_FILES.iter().map(|name| self.sim_dir.join(name)));
        files
    }

    fn utilities_file(&self) -> PathBuf {
        self.sim_dir.join("true_user_utilities.csv")
    }

    fn trips_file(&self) -> PathBuf {
        self.sim_dir.join("simulated_data.csv")
    }
}
