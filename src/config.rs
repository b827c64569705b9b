use anyhow::{Context, Result, bail};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Tolerance used when checking that group probabilities sum to 1.0.
pub const PROB_SUM_TOL: f64 = 1e-8;

/// Relative tolerance below which a covariance eigenvalue is treated as zero.
const EIG_TOL: f64 = 1e-10;

/// Model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of latent shopper groups.
    pub num_groups: usize,
    /// Number of items in the category.
    pub num_items: usize,
    /// Number of shopping trips per shopper.
    pub num_trips: usize,
    /// Number of items shown on the shelf at each trip.
    pub shelf_size: usize,
}

/// Population parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of simulated shoppers.
    pub num_users: usize,
    /// Seed of the random number generators.
    pub seed: u64,
}

/// Utility distribution of one latent group.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Membership probability of the group.
    pub probability: f64,
    /// Mean of the group utilities (`num_items` entries).
    pub mean: Vec<f64>,
    /// Covariance of the group utilities (matrix `num_items x num_items`).
    pub cov: Vec<Vec<f64>>,
}

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub population: PopulationConfig,
    pub groups: Vec<GroupConfig>,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Membership probabilities of all groups, ordered by group id.
    pub fn group_probabilities(&self) -> Vec<f64> {
        self.groups.iter().map(|grp| grp.probability).collect()
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.num_groups, 1..).context("invalid number of groups")?;
        check_num(model.num_items, 1..).context("invalid number of items")?;
        check_num(model.num_trips, 1..).context("invalid number of trips")?;
        check_num(model.shelf_size, 1..=model.num_items).context("invalid shelf size")?;

        check_num(self.population.num_users, 1..).context("invalid number of users")?;

        let n_grp = self.groups.len();
        if n_grp != model.num_groups {
            bail!("number of groups must be {}, but is {n_grp}", model.num_groups);
        }

        for (i_grp, grp) in self.groups.iter().enumerate() {
            check_vec(&grp.mean, model.num_items)
                .with_context(|| format!("invalid mean of group {i_grp}"))?;
            check_cov(&grp.cov, model.num_items)
                .with_context(|| format!("invalid covariance of group {i_grp}"))?;
        }

        check_prob_vec(&self.group_probabilities()).context("invalid group probabilities")?;

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

fn check_vec(vec: &[f64], exp_len: usize) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if vec.iter().any(|ele| !ele.is_finite()) {
        bail!("vector must have only finite elements");
    }
    Ok(())
}

fn check_prob_vec(vec: &[f64]) -> Result<()> {
    if vec.iter().any(|&ele| !(0.0..=1.0).contains(&ele)) {
        bail!("probabilities must be in the range [0, 1]");
    }
    let sum: f64 = vec.iter().sum();
    if (sum - 1.0).abs() > PROB_SUM_TOL {
        bail!("probabilities must sum to 1.0 (tolerance: {PROB_SUM_TOL}), but sum to {sum}");
    }
    Ok(())
}

fn check_cov(mat: &[Vec<f64>], exp_dim: usize) -> Result<()> {
    // Ensure matrix has expected dimensions.
    let n_rows = mat.len();
    if n_rows != exp_dim {
        bail!("matrix must have {exp_dim} rows, but has {n_rows}");
    }
    for (i_row, row) in mat.iter().enumerate() {
        check_vec(row, exp_dim).with_context(|| format!("invalid row {i_row}"))?;
    }

    let mat = to_matrix(mat);
    let tol = 1e-12 * mat.amax().max(1.0);
    for i in 0..exp_dim {
        for j in (i + 1)..exp_dim {
            if (mat[(i, j)] - mat[(j, i)]).abs() > tol {
                bail!("matrix must be symmetric, but differs at ({i}, {j})");
            }
        }
    }

    // Eigenvalues within rounding of zero count as zero.
    let eigs = mat.symmetric_eigenvalues();
    let max_eig = eigs.iter().fold(0.0_f64, |acc, &eig| acc.max(eig.abs()));
    let min_eig = eigs.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eig <= EIG_TOL * max_eig {
        bail!("matrix must be positive definite, but has eigenvalue {min_eig}");
    }
    Ok(())
}

/// Convert a row-major nested vector into a square matrix.
pub fn to_matrix(rows: &[Vec<f64>]) -> DMatrix<f64> {
    let n = rows.len();
    DMatrix::from_fn(n, n, |i, j| rows[i][j])
}
