//! Simulation output types.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Ground-truth utilities of one shopper.
#[derive(Debug, Clone, PartialEq)]
pub struct UtilityRecord {
    pub user_id: usize,
    pub group_id: usize,
    pub utility: Vec<f64>,
}

/// Outcome of one shopping trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub user_id: usize,
    /// 1-based trip index.
    pub trip: usize,
    /// Chosen item.
    pub choice: usize,
    /// Indicator of the items shown on the shelf.
    pub shown: Vec<u8>,
}

/// Complete simulated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub n_items: usize,
    /// One record per shopper, ordered by user id.
    pub utilities: Vec<UtilityRecord>,
    /// One record per shopper and trip, ordered by user id and trip.
    pub trips: Vec<TripRecord>,
}

impl Dataset {
    /// Write the ground-truth utility table as CSV.
    pub fn write_utilities<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_header(writer, &["user_id", "user_group"], self.n_items)?;
        for rec in &self.utilities {
            write!(writer, "{},{}", rec.user_id, rec.group_id)?;
            for u in &rec.utility {
                write!(writer, ",{u}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Write the trip-level table as CSV.
    pub fn write_trips<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_header(writer, &["user_id", "trip", "choice"], self.n_items)?;
        for rec in &self.trips {
            write!(writer, "{},{},{}", rec.user_id, rec.trip, rec.choice)?;
            for x in &rec.shown {
                write!(writer, ",{x}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Save both tables to the given files.
    pub fn save<P: AsRef<Path>>(&self, utilities_file: P, trips_file: P) -> Result<()> {
        save_with(utilities_file, |writer| self.write_utilities(writer))
            .context("failed to save utilities")?;
        save_with(trips_file, |writer| self.write_trips(writer))
            .context("failed to save trips")?;
        Ok(())
    }
}

/// Column name of an item.
pub fn item_column(prefix: &str, i_item: usize) -> String {
    format!("{prefix}item{i_item:03}")
}

pub fn write_header<W>(writer: &mut W, leading: &[&str], n_items: usize) -> Result<()>
where
    W: Write + ?Sized,
{
    let mut cols: Vec<String> = leading.iter().map(|col| col.to_string()).collect();
    cols.extend((0..n_items).map(|i_item| item_column("", i_item)));
    writeln!(writer, "{}", cols.join(","))?;
    Ok(())
}

/// Create `file` and fill it through a buffered writer.
pub fn save_with<P, F>(file: P, fill: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = file.as_ref();
    let handle = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(handle);
    fill(&mut writer)?;
    writer.flush().context("failed to flush writer stream")?;
    log::info!("wrote {file:?}");
    Ok(())
}
