use crate::aggregate::{count_columns, MeanRow, ReportRow, Scored};
use crate::census::{CensusCounts, GroundTruthCensus};
use crate::error::UnitFailure;
use crate::tables::{MafTable, Tally};
use anyhow::{Context, Result};
use csv::Writer;
use std::path::Path;

/// Column naming the bin of a binned report.
pub const BINNED_INDEX: &str = "maf";
/// Column naming the threshold of a cumulative report.
pub const CUMULATIVE_INDEX: &str = "maf_min";

fn create_writer(path: &Path) -> Result<Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Writer::from_path(path).with_context(|| format!("Failed to create CSV file: {}", path.display()))
}

/// Write one per-chromosome binned table, indexed by `maf` 0..50.
pub fn write_table<T: Tally>(table: &MafTable<T>, path: &Path) -> Result<()> {
    let mut wtr = create_writer(path)?;

    let mut header = vec![BINNED_INDEX];
    header.extend_from_slice(T::COLUMNS);
    wtr.write_record(&header)?;

    for (maf, counts) in table.iter() {
        let mut record = vec![maf.to_string()];
        record.extend(counts.values().iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_census(census: &GroundTruthCensus, path: &Path) -> Result<()> {
    let mut wtr = create_writer(path)?;

    let mut header = vec!["chrom", "sample", "maf"];
    header.extend_from_slice(CensusCounts::COLUMNS);
    wtr.write_record(&header)?;

    for (chrom, sample, maf, counts) in census.cells() {
        let mut record = vec![chrom.to_string(), sample.to_string(), maf.to_string()];
        record.extend(counts.values().iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write a run report; `index` is [`BINNED_INDEX`] or [`CUMULATIVE_INDEX`].
pub fn write_report<T: Scored>(rows: &[ReportRow<T>], index: &str, path: &Path) -> Result<()> {
    let mut wtr = create_writer(path)?;

    let mut header = vec!["nst", index];
    header.extend(count_columns::<T>());
    header.extend_from_slice(T::RATIO_COLUMNS);
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.nst.clone(), row.maf.to_string()];
        record.extend(row.count_values().iter().map(u64::to_string));
        record.extend(row.ratios().iter().map(|r| r.to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the cross-run means of a condition.
pub fn write_mean_report<T: Scored>(rows: &[MeanRow], index: &str, path: &Path) -> Result<()> {
    let mut wtr = create_writer(path)?;

    let mut header = vec!["nst", index];
    header.extend(count_columns::<T>());
    header.extend_from_slice(T::RATIO_COLUMNS);
    header.push("runs");
    wtr.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.nst.clone(), row.maf.to_string()];
        record.extend(row.counts.iter().map(|v| format!("{:.6}", v)));
        record.extend(row.ratios.iter().map(|r| r.to_string()));
        record.push(row.runs.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Always written, header only when nothing was excluded.
pub fn write_exclusions(failures: &[UnitFailure], path: &Path) -> Result<()> {
    let mut wtr = create_writer(path)?;

    wtr.write_record(["run", "samples", "chromosome", "reason"])?;
    for failure in failures {
        wtr.write_record([
            &failure.run,
            &failure.samples,
            &failure.chromosome,
            &failure.reason,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
