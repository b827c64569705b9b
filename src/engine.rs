use crate::config::Config;
use crate::groups::GroupTable;
use crate::shelf::ShelfGenerator;
use crate::shopper::{Shopper, ShopperProfile};
use crate::types::{Dataset, TripRecord, UtilityRecord};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::weighted::WeightedIndex;
use rayon::prelude::*;

/// Number of shoppers between progress messages.
const PROGRESS_BLOCK: usize = 50;

/// Simulation engine.
///
/// Holds the configuration and the group table, and turns them into a
/// [`Dataset`]. Every shopper owns its generator, profile and random stream,
/// so shoppers are simulated in parallel without changing the output.
pub struct Engine {
    cfg: Config,
    groups: GroupTable,
}

impl Engine {
    pub fn new(cfg: Config) -> Result<Self> {
        let groups = GroupTable::from_config(&cfg).context("failed to build group table")?;
        Ok(Self { cfg, groups })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Draw the group of every shopper from the membership probabilities.
    pub fn draw_user_groups(&self) -> Result<Vec<usize>> {
        let mut rng = self.stream_rng(0);
        let grp_dist = WeightedIndex::new(self.groups.probabilities())?;
        let user_groups: Vec<usize> = (0..self.cfg.population.num_users)
            .map(|_| grp_dist.sample(&mut rng))
            .collect();

        let mut grp_sizes = vec![0; self.groups.n_groups()];
        for &grp in &user_groups {
            grp_sizes[grp] += 1;
        }
        log::info!("drawn group sizes {grp_sizes:?}");

        Ok(user_groups)
    }

    /// Simulate every shopper and collect the resulting dataset.
    pub fn simulate(&self) -> Result<Dataset> {
        let user_groups = self
            .draw_user_groups()
            .context("failed to draw user groups")?;
        let num_users = user_groups.len();

        let per_user: Vec<(UtilityRecord, Vec<TripRecord>)> = user_groups
            .into_par_iter()
            .enumerate()
            .map(|(user_id, group_id)| -> Result<_> {
                let out = self
                    .simulate_user(user_id, group_id)
                    .with_context(|| format!("failed to simulate user {user_id}"))?;
                if (user_id + 1) % PROGRESS_BLOCK == 0 || user_id + 1 == num_users {
                    log::info!("simulated user {}/{num_users}", user_id + 1);
                }
                Ok(out)
            })
            .collect::<Result<_>>()?;

        let mut utilities = Vec::with_capacity(num_users);
        let mut trips = Vec::with_capacity(num_users * self.cfg.model.num_trips);
        for (util_rec, trip_recs) in per_user {
            utilities.push(util_rec);
            trips.extend(trip_recs);
        }

        Ok(Dataset {
            n_items: self.cfg.model.num_items,
            utilities,
            trips,
        })
    }

    fn simulate_user(
        &self,
        user_id: usize,
        group_id: usize,
    ) -> Result<(UtilityRecord, Vec<TripRecord>)> {
        let model = &self.cfg.model;
        let mut rng = self.stream_rng(user_id as u64 + 1);

        let dist = self.groups.distribution(group_id);
        let profile = ShopperProfile::draw(user_id, group_id, dist, &mut rng);
        log::debug!("user {user_id} choice probabilities {:?}", profile.choice_prob);
        let mut shopper = Shopper::new(profile);

        let mut shelf_gen = ShelfGenerator::new(model.num_items, model.num_trips, model.shelf_size);
        shelf_gen.reset();

        let mut trip_recs = Vec::with_capacity(model.num_trips);
        for _ in 0..model.num_trips {
            let shelf = shelf_gen
                .next_shelf(&mut rng)
                .context("failed to generate shelf")?;
            let choice = shopper
                .choose(&shelf.items, &mut rng)
                .context("failed to simulate choice")?;
            trip_recs.push(TripRecord {
                user_id: choice.user_id,
                trip: choice.trip,
                choice: choice.item,
                shown: shelf.shown,
            });
        }
        log::debug!(
            "simulated user {user_id} of group {group_id} over {} trips, exposures {:?}",
            shelf_gen.trips_completed(),
            shelf_gen.seen_counts()
        );

        let profile = shopper.into_profile();
        let util_rec = UtilityRecord {
            user_id: profile.user_id,
            group_id: profile.group_id,
            utility: profile.utility,
        };

        Ok((util_rec, trip_recs))
    }

    /// Random stream `stream` of the configured seed.
    fn stream_rng(&self, stream: u64) -> ChaCha12Rng {
        let mut rng = ChaCha12Rng::seed_from_u64(self.cfg.population.seed);
        rng.set_stream(stream);
        rng
    }
}
