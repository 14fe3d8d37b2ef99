use crate::census::{CensusCounts, GroundTruthCensus};
use crate::output::BINNED_INDEX;
use crate::tables::{MafTable, Tally};
use crate::types::MafBin;
use anyhow::{bail, Context, Result};
use log::debug;
use std::path::Path;

fn check_header(headers: &csv::StringRecord, expected: &[&str], path: &Path) -> Result<()> {
    if !headers.iter().eq(expected.iter().copied()) {
        bail!(
            "Unexpected columns in {}: expected {}, found {}",
            path.display(),
            expected.join(","),
            headers.iter().collect::<Vec<_>>().join(",")
        );
    }
    Ok(())
}

fn parse_bin(field: Option<&str>, row: usize) -> Result<MafBin> {
    let ctx = || format!("row {}", row);
    let index: usize = field.with_context(ctx)?.parse().with_context(ctx)?;
    MafBin::from_index(index).with_context(|| format!("row {}: MAF bin {} out of range", row, index))
}

fn parse_counts<T: Tally>(record: &csv::StringRecord, skip: usize, row: usize) -> Result<T> {
    let ctx = || format!("row {}", row);
    let values = record
        .iter()
        .skip(skip)
        .map(|v| v.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(ctx)?;
    T::from_values(&values).with_context(ctx)
}

/// Read a per-chromosome binned table written by [`crate::output::write_table`].
///
/// Bins without a row read as zero; a bin listed twice is an error.
pub fn load_table<T: Tally>(path: &Path) -> Result<MafTable<T>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut expected = vec![BINNED_INDEX];
    expected.extend_from_slice(T::COLUMNS);
    check_header(rdr.headers()?, &expected, path)?;

    let mut table = MafTable::new();
    let mut seen = [false; crate::types::MAF_BINS];
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse CSV row {}", i + 1))?;
        let bin = parse_bin(record.get(0), i + 1)?;
        if std::mem::replace(&mut seen[bin.index()], true) {
            bail!("{}: MAF bin {} appears twice", path.display(), bin);
        }
        *table.bin_mut(bin) = parse_counts(&record, 1, i + 1)?;
    }
    Ok(table)
}

/// Read a census CSV (`chrom,sample,maf,total_gt,alt_gt,het_gt,hom_alt`).
pub fn load_census(path: &Path) -> Result<GroundTruthCensus> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open census file: {}", path.display()))?;

    let mut expected = vec!["chrom", "sample", "maf"];
    expected.extend_from_slice(CensusCounts::COLUMNS);
    check_header(rdr.headers()?, &expected, path)?;

    let mut census = GroundTruthCensus::new();
    let mut rows = 0usize;
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to parse CSV row {}", i + 1))?;
        let ctx = || format!("row {}", i + 1);
        let chrom = record.get(0).with_context(ctx)?;
        let sample = record.get(1).with_context(ctx)?;
        let bin = parse_bin(record.get(2), i + 1)?;
        let counts: CensusCounts = parse_counts(&record, 3, i + 1)?;
        census.add(chrom, sample, bin, &counts);
        rows += 1;
    }
    debug!("Loaded {} census rows from {}", rows, path.display());
    Ok(census)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{write_census, write_table};
    use crate::tables::TrioCounts;

    fn bin(i: usize) -> MafBin {
        MafBin::from_index(i).unwrap()
    }

    #[test]
    fn test_table_reload_matches_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chr1_summary.csv");
        let mut table = MafTable::<TrioCounts>::new();
        table.bin_mut(bin(10)).gt_child_correct_mom_wrong = 1;
        table.bin_mut(bin(50)).alt_both_wrong = 7;
        write_table(&table, &path).unwrap();

        assert_eq!(load_table::<TrioCounts>(&path).unwrap(), table);
    }

    #[test]
    fn test_table_with_wrong_columns_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "maf,direct_gt_true\n0,1\n").unwrap();
        let err = load_table::<TrioCounts>(&path).unwrap_err();
        assert!(err.to_string().contains("Unexpected columns"));
    }

    #[test]
    fn test_census_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("census.csv");
        let mut census = GroundTruthCensus::new();
        let counts = CensusCounts {
            total_gt: 10,
            alt_gt: 4,
            het_gt: 3,
            hom_alt: 1,
        };
        census.add("chr1", "HG001", bin(10), &counts);
        census.add("chr2", "HG002", bin(0), &counts);
        write_census(&census, &path).unwrap();

        let loaded = load_census(&path).unwrap();
        assert_eq!(loaded, census);
        assert_eq!(loaded.sample_table("chr1", "HG002"), MafTable::new());
    }
}
