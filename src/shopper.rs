//! Synthetic shoppers and their choices.

use crate::groups::GroupDistribution;
use anyhow::{Context, Result, bail};
use nalgebra::DVector;
use rand::prelude::*;
use rand_distr::{StandardNormal, weighted::WeightedIndex};

/// Latent preferences of one shopper.
///
/// `utility` is a draw from the shopper's group distribution, shifted so that
/// the last item has zero utility. `choice_prob` is its softmax.
#[derive(Debug, Clone)]
pub struct ShopperProfile {
    pub user_id: usize,
    pub group_id: usize,
    pub utility: Vec<f64>,
    pub choice_prob: Vec<f64>,
}

impl ShopperProfile {
    /// Draw a new profile from the distribution of the shopper's group.
    pub fn draw<R: Rng + ?Sized>(
        user_id: usize,
        group_id: usize,
        dist: &GroupDistribution,
        rng: &mut R,
    ) -> Self {
        let n_items = dist.n_items();
        let noise = DVector::from_fn(n_items, |_, _| -> f64 { StandardNormal.sample(rng) });
        let draw = dist.mean() + dist.chol_l() * noise;

        let last = draw[n_items - 1];
        let utility: Vec<f64> = draw.iter().map(|&u| u - last).collect();
        let choice_prob = softmax(&utility);

        Self {
            user_id,
            group_id,
            utility,
            choice_prob,
        }
    }
}

/// Multinomial logit link.
pub fn softmax(utility: &[f64]) -> Vec<f64> {
    let max = utility.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut prob: Vec<f64> = utility.iter().map(|&u| (u - max).exp()).collect();
    let sum: f64 = prob.iter().sum();
    prob.iter_mut().for_each(|p| *p /= sum);
    prob
}

/// Single pick made by a shopper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Choice {
    pub user_id: usize,
    /// 1-based trip counter of the shopper.
    pub trip: usize,
    pub item: usize,
}

/// A shopper making one choice per trip.
pub struct Shopper {
    profile: ShopperProfile,
    n_trips_done: usize,
}

impl Shopper {
    pub fn new(profile: ShopperProfile) -> Self {
        Self {
            profile,
            n_trips_done: 0,
        }
    }

    pub fn into_profile(self) -> ShopperProfile {
        self.profile
    }

    /// Pick one of the shown items with probability proportional to its
    /// choice probability, conditioned on the shelf.
    pub fn choose<R: Rng + ?Sized>(&mut self, items: &[usize], rng: &mut R) -> Result<Choice> {
        if items.is_empty() {
            bail!("shelf must not be empty");
        }
        let utility = &self.profile.utility;
        if let Some(&i_item) = items.iter().find(|&&i_item| i_item >= utility.len()) {
            bail!("shelf item {i_item} is out of range");
        }

        let cond_prob = conditional_probs(utility, items);
        let dist = WeightedIndex::new(&cond_prob).context("failed to build choice distribution")?;
        let item = items[dist.sample(rng)];

        self.n_trips_done += 1;

        Ok(Choice {
            user_id: self.profile.user_id,
            trip: self.n_trips_done,
            item,
        })
    }
}

/// Choice probabilities of `items` given that only they are on the shelf.
///
/// Equal to the full-catalog softmax restricted to `items` and renormalized,
/// but computed from the shown utilities so it never divides by zero.
pub fn conditional_probs(utility: &[f64], items: &[usize]) -> Vec<f64> {
    let shown: Vec<f64> = items.iter().map(|&i_item| utility[i_item]).collect();
    softmax(&shown)
}
