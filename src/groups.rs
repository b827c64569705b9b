//! Latent shopper groups.

use crate::config::{Config, to_matrix};
use anyhow::{Context, Result};
use nalgebra::{DMatrix, DVector};

/// Multivariate Gaussian distribution of item utilities of one group.
#[derive(Debug, Clone)]
pub struct GroupDistribution {
    mean: DVector<f64>,
    /// Lower Cholesky factor `L` such that `L Lᵀ = cov`.
    chol_l: DMatrix<f64>,
}

impl GroupDistribution {
    pub fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
        let chol_l = cov
            .cholesky()
            .context("covariance is not positive definite")?
            .l();
        Ok(Self { mean, chol_l })
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn chol_l(&self) -> &DMatrix<f64> {
        &self.chol_l
    }

    pub fn n_items(&self) -> usize {
        self.mean.len()
    }
}

/// Keyed lookup from group id to its utility distribution,
/// plus the group membership probabilities.
#[derive(Debug, Clone)]
pub struct GroupTable {
    dists: Vec<GroupDistribution>,
    probs: Vec<f64>,
}

impl GroupTable {
    /// Build the table from a validated [`Config`].
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut dists = Vec::with_capacity(cfg.groups.len());
        for (i_grp, grp) in cfg.groups.iter().enumerate() {
            let mean = DVector::from_column_slice(&grp.mean);
            let cov = to_matrix(&grp.cov);
            let dist = GroupDistribution::new(mean, cov)
                .with_context(|| format!("failed to build distribution of group {i_grp}"))?;
            dists.push(dist);
        }
        Ok(Self {
            dists,
            probs: cfg.group_probabilities(),
        })
    }

    pub fn distribution(&self, group_id: usize) -> &GroupDistribution {
        &self.dists[group_id]
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn n_groups(&self) -> usize {
        self.dists.len()
    }
}
