//! Post-hoc summaries of a simulated dataset.

use crate::config::Config;
use crate::stats::Accumulator;
use crate::types::{Dataset, item_column, save_with, write_header};
use anyhow::{Context, Result, bail};
use std::{io::Write, path::Path};

/// File written by [`GroupSummary`].
pub const SUMMARY_FILE: &str = "drawn_users_summary.csv";
/// File written by [`ItemBalance`].
pub const BALANCE_FILE: &str = "item_balance_per_user.csv";

/// Files written by [`Analyzer::save_results`].
pub const REPORT_FILES: [&str; 2] = [SUMMARY_FILE, BALANCE_FILE];

pub trait Obs {
    fn update(&mut self, data: &Dataset) -> Result<()>;
    fn file_name(&self) -> &'static str;
    fn write(&self, out: &mut dyn Write) -> Result<()>;
}

/// Input versus simulated group memberships and mean utilities.
pub struct GroupSummary {
    input_probs: Vec<f64>,
    input_means: Vec<Vec<f64>>,
    n_users: usize,
    acc_vec: Vec<Accumulator>,
}

impl GroupSummary {
    pub fn new(cfg: &Config) -> Self {
        let n_items = cfg.model.num_items;
        let input_means = cfg
            .groups
            .iter()
            .map(|grp| {
                let last = grp.mean[n_items - 1];
                grp.mean.iter().map(|&m| m - last).collect()
            })
            .collect();
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(cfg.model.num_groups, || Accumulator::new(n_items));
        Self {
            input_probs: cfg.group_probabilities(),
            input_means,
            n_users: 0,
            acc_vec,
        }
    }
}

impl Obs for GroupSummary {
    fn update(&mut self, data: &Dataset) -> Result<()> {
        for rec in &data.utilities {
            let Some(acc) = self.acc_vec.get_mut(rec.group_id) else {
                bail!("user {} has unknown group {}", rec.user_id, rec.group_id);
            };
            acc.add(&rec.utility);
            self.n_users += 1;
        }
        Ok(())
    }

    fn file_name(&self) -> &'static str {
        SUMMARY_FILE
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        let n_items = self.input_means.first().map_or(0, Vec::len);
        let mut cols = vec!["input_memb_prob".to_string(), "sim_memb_prob".to_string()];
        for prefix in ["mean_input_util_", "mean_sim_util_", "std_sim_util_"] {
            cols.extend((0..n_items).map(|i_item| item_column(prefix, i_item)));
        }
        writeln!(out, "{}", cols.join(","))?;

        for ((input_prob, input_mean), acc) in self
            .input_probs
            .iter()
            .zip(&self.input_means)
            .zip(&self.acc_vec)
        {
            let report = acc.report();
            let sim_prob = report.n_vals as f64 / self.n_users as f64;
            let vals: Vec<String> = [*input_prob, sim_prob]
                .into_iter()
                .chain(input_mean.iter().copied())
                .chain(report.mean)
                .chain(report.std_dev)
                .map(|val| val.to_string())
                .collect();
            writeln!(out, "{}", vals.join(","))?;
        }
        Ok(())
    }
}

/// Exposure count of every item per user, relative to the ideal count.
pub struct ItemBalance {
    ideal_count: f64,
    n_items: usize,
    counts: Vec<Vec<usize>>,
}

impl ItemBalance {
    pub fn new(cfg: &Config) -> Self {
        let model = &cfg.model;
        Self {
            ideal_count: (model.num_trips * model.shelf_size) as f64 / model.num_items as f64,
            n_items: model.num_items,
            counts: Vec::new(),
        }
    }
}

impl Obs for ItemBalance {
    fn update(&mut self, data: &Dataset) -> Result<()> {
        for rec in &data.trips {
            if rec.user_id >= self.counts.len() {
                self.counts.resize(rec.user_id + 1, vec![0; self.n_items]);
            }
            for (cnt, &x) in self.counts[rec.user_id].iter_mut().zip(&rec.shown) {
                *cnt += x as usize;
            }
        }
        Ok(())
    }

    fn file_name(&self) -> &'static str {
        BALANCE_FILE
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        write_header(out, &["user_id"], self.n_items)?;
        for (user_id, counts) in self.counts.iter().enumerate() {
            write!(out, "{user_id}")?;
            for &cnt in counts {
                write!(out, ",{}", cnt as f64 / self.ideal_count)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

pub struct Analyzer {
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: &Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(GroupSummary::new(cfg)),
            Box::new(ItemBalance::new(cfg)),
        ];
        Self { obs_ptr_vec }
    }

    pub fn add_dataset(&mut self, data: &Dataset) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(data).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        for obs in &self.obs_ptr_vec {
            let file = dir.join(obs.file_name());
            save_with(&file, |writer| obs.write(writer))
                .with_context(|| format!("failed to save {}", obs.file_name()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::types::{TripRecord, UtilityRecord};

    fn written(obs: &dyn Obs) -> Vec<String> {
        let mut buf = Vec::new();
        obs.write(&mut buf).unwrap();
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn small_dataset() -> Dataset {
        let utilities = vec![
            UtilityRecord {
                user_id: 0,
                group_id: 1,
                utility: vec![1.0, 2.0, 0.0],
            },
            UtilityRecord {
                user_id: 1,
                group_id: 1,
                utility: vec![3.0, 0.0, 0.0],
            },
        ];
        let trips = (0..2)
            .flat_map(|user_id| {
                (1..=4).map(move |trip| TripRecord {
                    user_id,
                    trip,
                    choice: 0,
                    shown: if trip % 2 == 0 { vec![1, 1, 0] } else { vec![1, 0, 1] },
                })
            })
            .collect();
        Dataset {
            n_items: 3,
            utilities,
            trips,
        }
    }

    #[test]
    fn group_summary_compares_input_and_simulation() {
        let cfg = sample_config();
        let mut obs = GroupSummary::new(&cfg);
        obs.update(&small_dataset()).unwrap();
        let lines = written(&obs);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("input_memb_prob,sim_memb_prob,mean_input_util_item000"));
        assert!(lines[0].ends_with("std_sim_util_item002"));

        let row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&row[..5], &["0.25", "0", "1", "0.5", "0"]);
        assert_eq!(row[5], "NaN");

        let row: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(&row[..8], &["0.75", "1", "-1.5", "-0.5", "0", "2", "1", "0"]);
    }

    #[test]
    fn item_balance_divides_by_ideal_count() {
        // ideal count = 4 * 2 / 3
        let cfg = sample_config();
        let mut obs = ItemBalance::new(&cfg);
        obs.update(&small_dataset()).unwrap();
        let lines = written(&obs);

        assert_eq!(lines[0], "user_id,item000,item001,item002");
        assert_eq!(lines.len(), 3);
        let row: Vec<f64> = lines[1]
            .split(',')
            .skip(1)
            .map(|val| val.parse().unwrap())
            .collect();
        assert!((row[0] - 1.5).abs() < 1e-12);
        assert!((row[1] - 0.75).abs() < 1e-12);
        assert!((row[2] - 0.75).abs() < 1e-12);
    }
}
