use crate::census::{CensusCounts, TrioTruth};
use crate::statistics::{accuracy, call_rate, mean_count, mean_defined, Ratio};
use crate::tables::{MafTable, SingleCounts, Tally, TrioCounts};
use crate::types::{MafBin, Method};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Name of the synthetic row summed over every chromosome.
pub const ALL_CHROMOSOMES: &str = "all";

/// A counter table that can be scored against ground-truth census totals.
pub trait Scored: Tally {
    /// Census totals that serve as call-rate denominators.
    type Truth: Tally;

    /// Counters computed from the raw ones, reported next to them.
    const DERIVED_COLUMNS: &'static [&'static str];
    const RATIO_COLUMNS: &'static [&'static str];

    fn derived(&self) -> Vec<u64>;

    /// Ratios in [`Scored::RATIO_COLUMNS`] order.
    fn ratios(&self, truth: &Self::Truth) -> Vec<Ratio>;
}

impl Scored for SingleCounts {
    type Truth = CensusCounts;

    const DERIVED_COLUMNS: &'static [&'static str] = &[];
    const RATIO_COLUMNS: &'static [&'static str] = &[
        "call_rate_direct_gt",
        "accuracy_direct_gt",
        "call_rate_direct_alt",
        "accuracy_direct_alt",
        "call_rate_imputed_gt",
        "accuracy_imputed_gt",
        "call_rate_imputed_alt",
        "accuracy_imputed_alt",
    ];

    fn derived(&self) -> Vec<u64> {
        Vec::new()
    }

    fn ratios(&self, truth: &CensusCounts) -> Vec<Ratio> {
        let mut ratios = Vec::with_capacity(Self::RATIO_COLUMNS.len());
        for method in [Method::Direct, Method::Imputed] {
            let c = self.method(method);
            ratios.push(call_rate(c.gt_true, c.gt_false, truth.total_gt));
            ratios.push(accuracy(c.gt_true, c.gt_false));
            ratios.push(call_rate(c.alt_true, c.alt_false, truth.alt_gt));
            ratios.push(accuracy(c.alt_true, c.alt_false));
        }
        ratios
    }
}

impl Scored for TrioCounts {
    type Truth = TrioTruth;

    const DERIVED_COLUMNS: &'static [&'static str] = &[
        "gt_mom_wrong",
        "gt_child_wrong",
        "alt_mom_wrong",
        "alt_child_wrong",
    ];
    const RATIO_COLUMNS: &'static [&'static str] = &[
        "call_rate_mother_gt",
        "accuracy_mother_gt",
        "call_rate_mother_alt",
        "accuracy_mother_alt",
        "call_rate_child_gt",
        "accuracy_child_gt",
        "call_rate_child_alt",
        "accuracy_child_alt",
    ];

    fn derived(&self) -> Vec<u64> {
        vec![
            self.gt_mom_wrong(),
            self.gt_child_wrong(),
            self.alt_mom_wrong(),
            self.alt_child_wrong(),
        ]
    }

    fn ratios(&self, truth: &TrioTruth) -> Vec<Ratio> {
        vec![
            call_rate(self.gt_mom_correct, self.gt_mom_wrong(), truth.total_gt_mother),
            accuracy(self.gt_mom_correct, self.gt_mom_wrong()),
            call_rate(self.alt_mom_correct, self.alt_mom_wrong(), truth.total_alt_mother),
            accuracy(self.alt_mom_correct, self.alt_mom_wrong()),
            call_rate(self.gt_child_correct, self.gt_child_wrong(), truth.total_gt_child),
            accuracy(self.gt_child_correct, self.gt_child_wrong()),
            call_rate(self.alt_child_correct, self.alt_child_wrong(), truth.total_alt_child),
            accuracy(self.alt_child_correct, self.alt_child_wrong()),
        ]
    }
}

/// Counter and census columns of a report row, in output order.
pub fn count_columns<T: Scored>() -> Vec<&'static str> {
    T::COLUMNS
        .iter()
        .chain(T::DERIVED_COLUMNS)
        .chain(<T::Truth as Tally>::COLUMNS)
        .copied()
        .collect()
}

/// Comparison counts of one chromosome of one run, with the matching census.
#[derive(Debug, Clone)]
pub struct ChromosomeTable<T: Scored> {
    pub chrom: String,
    pub counts: MafTable<T>,
    pub truth: MafTable<T::Truth>,
}

/// One report line: a chromosome (or `all`) at one MAF bin or threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow<T: Scored> {
    pub nst: String,
    pub maf: MafBin,
    pub counts: T,
    pub truth: T::Truth,
}

impl<T: Scored> ReportRow<T> {
    /// Every counter of the row: raw, derived, then census totals.
    pub fn count_values(&self) -> Vec<u64> {
        let mut values = self.counts.values();
        values.extend(self.counts.derived());
        values.extend(self.truth.values());
        values
    }

    pub fn ratios(&self) -> Vec<Ratio> {
        self.counts.ratios(&self.truth)
    }
}

/// Binned and cumulative reports of one run.
#[derive(Debug, Clone)]
pub struct RunReport<T: Scored> {
    pub binned: Vec<ReportRow<T>>,
    pub cumulative: Vec<ReportRow<T>>,
}

fn push_rows<T: Scored>(
    rows: &mut Vec<ReportRow<T>>,
    nst: &str,
    counts: &MafTable<T>,
    truth: &MafTable<T::Truth>,
) {
    for ((maf, c), (_, t)) in counts.iter().zip(truth.iter()) {
        rows.push(ReportRow {
            nst: nst.to_string(),
            maf,
            counts: c.clone(),
            truth: t.clone(),
        });
    }
}

/// Merge the chromosome tables of one run into its binned and cumulative reports.
///
/// Chromosome rows come in natural order, followed by the `all` rows. The
/// cumulative `all` rows are derived from the merged binned table, and the
/// census is merged the same way.
pub fn summarize_run<T: Scored>(mut tables: Vec<ChromosomeTable<T>>) -> RunReport<T> {
    tables.sort_by(|a, b| natural_chrom_cmp(&a.chrom, &b.chrom));

    let mut binned = Vec::with_capacity((tables.len() + 1) * crate::types::MAF_BINS);
    let mut cumulative = Vec::with_capacity(binned.capacity());

    for table in &tables {
        push_rows(&mut binned, &table.chrom, &table.counts, &table.truth);
        push_rows(
            &mut cumulative,
            &table.chrom,
            &table.counts.cumulative(),
            &table.truth.cumulative(),
        );
    }

    let all_counts = MafTable::sum(tables.iter().map(|t| &t.counts));
    let all_truth = MafTable::sum(tables.iter().map(|t| &t.truth));
    push_rows(&mut binned, ALL_CHROMOSOMES, &all_counts, &all_truth);
    push_rows(
        &mut cumulative,
        ALL_CHROMOSOMES,
        &all_counts.cumulative(),
        &all_truth.cumulative(),
    );

    RunReport { binned, cumulative }
}

/// Mean of one (nst, bin) row across the runs of a condition.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanRow {
    pub nst: String,
    pub maf: MafBin,
    /// Means of the counter columns, same order as [`ReportRow::count_values`].
    pub counts: Vec<f64>,
    pub ratios: Vec<Ratio>,
    /// Runs contributing to this row.
    pub runs: usize,
}

/// Average report rows across runs, keyed by (nst, bin).
///
/// Ratios are computed per run first and then averaged; undefined ratios
/// are left out of the mean.
pub fn average_runs<'a, T: Scored + 'a>(
    runs: impl IntoIterator<Item = &'a [ReportRow<T>]>,
) -> Vec<MeanRow> {
    let mut groups: HashMap<(String, MafBin), (Vec<Vec<u64>>, Vec<Vec<Ratio>>)> = HashMap::new();
    for rows in runs {
        for row in rows {
            let (counts, ratios) = groups.entry((row.nst.clone(), row.maf)).or_default();
            counts.push(row.count_values());
            ratios.push(row.ratios());
        }
    }

    let mut means: Vec<MeanRow> = groups
        .into_iter()
        .map(|((nst, maf), (counts, ratios))| {
            let n_counts = counts.first().map_or(0, Vec::len);
            let n_ratios = ratios.first().map_or(0, Vec::len);
            MeanRow {
                nst,
                maf,
                counts: (0..n_counts)
                    .map(|i| mean_count(&counts.iter().map(|c| c[i]).collect::<Vec<_>>()))
                    .collect(),
                ratios: (0..n_ratios)
                    .map(|i| mean_defined(ratios.iter().map(|r| r[i])))
                    .collect(),
                runs: counts.len(),
            }
        })
        .collect();

    means.sort_by(|a, b| natural_chrom_cmp(&a.nst, &b.nst).then(a.maf.cmp(&b.maf)));
    means
}

/// Natural chromosome order: chr1 < chr2 < chr10 < chrX, with `all` last.
pub fn natural_chrom_cmp(a: &str, b: &str) -> Ordering {
    match (a == ALL_CHROMOSOMES, b == ALL_CHROMOSOMES) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let a_num = extract_chrom_number(a);
    let b_num = extract_chrom_number(b);

    match (a_num, b_num) {
        (Some(an), Some(bn)) => an.cmp(&bn),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn extract_chrom_number(chrom: &str) -> Option<u64> {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("Chr"))
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    stripped.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bin(i: usize) -> MafBin {
        MafBin::from_index(i).unwrap()
    }

    fn single_table(chrom: &str, maf: usize, gt_true: u64, gt_false: u64, total_gt: u64) -> ChromosomeTable<SingleCounts> {
        let mut counts = MafTable::<SingleCounts>::new();
        counts.bin_mut(bin(maf)).imputed_gt_true = gt_true;
        counts.bin_mut(bin(maf)).imputed_gt_false = gt_false;
        let mut truth = MafTable::<CensusCounts>::new();
        truth.bin_mut(bin(maf)).total_gt = total_gt;
        ChromosomeTable {
            chrom: chrom.to_string(),
            counts,
            truth,
        }
    }

    #[test]
    fn test_natural_chrom_order() {
        let mut chroms = vec!["chrX", "all", "chr10", "chr2", "chr1", "chrY"];
        chroms.sort_by(|a, b| natural_chrom_cmp(a, b));
        assert_eq!(chroms, vec!["chr1", "chr2", "chr10", "chrX", "chrY", "all"]);
    }

    #[test]
    fn test_single_ratios() {
        let counts = SingleCounts {
            direct_gt_true: 3,
            direct_gt_false: 1,
            direct_alt_true: 2,
            direct_alt_false: 2,
            ..SingleCounts::default()
        };
        let truth = CensusCounts {
            total_gt: 8,
            alt_gt: 5,
            het_gt: 0,
            hom_alt: 0,
        };
        let ratios = counts.ratios(&truth);
        assert_eq!(ratios.len(), SingleCounts::RATIO_COLUMNS.len());
        assert_relative_eq!(ratios[0].value().unwrap(), 0.5);
        assert_relative_eq!(ratios[1].value().unwrap(), 0.75);
        assert_relative_eq!(ratios[2].value().unwrap(), 0.8);
        // ALT accuracy is judged against ALT errors.
        assert_relative_eq!(ratios[3].value().unwrap(), 0.5);
        assert_eq!(ratios[4].value(), Some(0.0));
        assert_eq!(ratios[5], Ratio::UNDEFINED);
    }

    #[test]
    fn test_trio_ratios_use_derived_wrong_counts() {
        let counts = TrioCounts {
            gt_both_correct: 4,
            gt_mom_correct: 5,
            gt_child_correct: 6,
            gt_mom_correct_child_wrong: 1,
            gt_child_correct_mom_wrong: 2,
            gt_both_wrong: 3,
            ..TrioCounts::default()
        };
        let truth = TrioTruth {
            total_gt_mother: 20,
            total_alt_mother: 0,
            total_gt_child: 10,
            total_alt_child: 0,
        };
        assert_eq!(counts.derived(), vec![5, 4, 0, 0]);
        let ratios = counts.ratios(&truth);
        assert_relative_eq!(ratios[0].value().unwrap(), 0.5);
        assert_relative_eq!(ratios[1].value().unwrap(), 0.5);
        assert_eq!(ratios[2], Ratio::UNDEFINED);
        assert_relative_eq!(ratios[4].value().unwrap(), 1.0);
        assert_relative_eq!(ratios[5].value().unwrap(), 0.6);
    }

    #[test]
    fn test_undefined_ratio_for_empty_bin() {
        let report = summarize_run(vec![single_table("chr1", 10, 1, 0, 2)]);
        let empty = &report.binned[3];
        assert_eq!(empty.maf, bin(3));
        assert!(empty.ratios().iter().all(|r| !r.is_defined()));
    }

    #[test]
    fn test_summarize_run_orders_and_appends_all() {
        let report = summarize_run(vec![
            single_table("chr10", 5, 1, 1, 4),
            single_table("chr2", 20, 3, 0, 3),
        ]);
        assert_eq!(report.binned.len(), 3 * 51);
        assert_eq!(report.binned[0].nst, "chr2");
        assert_eq!(report.binned[51].nst, "chr10");
        assert_eq!(report.binned[102].nst, "all");

        let all_threshold_0 = &report.cumulative[102];
        assert_eq!(all_threshold_0.nst, "all");
        assert_eq!(all_threshold_0.counts.imputed_gt_true, 4);
        assert_eq!(all_threshold_0.counts.imputed_gt_false, 1);
        assert_eq!(all_threshold_0.truth.total_gt, 7);

        let all_threshold_6 = &report.cumulative[102 + 6];
        assert_eq!(all_threshold_6.counts.imputed_gt_true, 3);
        assert_eq!(all_threshold_6.truth.total_gt, 3);
        assert_relative_eq!(all_threshold_6.ratios()[4].value().unwrap(), 1.0);
    }

    #[test]
    fn test_average_runs_means_ratios_not_counts() {
        // Pooled counts would give 4/10; the mean of per-run rates is (1.0 + 0.25) / 2.
        let run_a = summarize_run(vec![single_table("chr1", 10, 2, 0, 2)]);
        let run_b = summarize_run(vec![single_table("chr1", 10, 2, 0, 8)]);
        let means = average_runs([run_a.binned.as_slice(), run_b.binned.as_slice()]);

        assert_eq!(means.len(), 2 * 51);
        let row = means.iter().find(|m| m.nst == "chr1" && m.maf == bin(10)).unwrap();
        assert_eq!(row.runs, 2);
        assert_relative_eq!(row.ratios[4].value().unwrap(), 0.625);
        let total_gt_col = count_columns::<SingleCounts>()
            .iter()
            .position(|c| *c == "total_gt")
            .unwrap();
        assert_relative_eq!(row.counts[total_gt_col], 5.0);
        assert_eq!(means.last().unwrap().nst, "all");
    }

    #[test]
    fn test_average_runs_skips_undefined_per_run() {
        let run_a = summarize_run(vec![single_table("chr1", 10, 1, 1, 4)]);
        let run_b = summarize_run(vec![single_table("chr1", 10, 0, 0, 0)]);
        let means = average_runs([run_a.binned.as_slice(), run_b.binned.as_slice()]);
        let row = means.iter().find(|m| m.nst == "chr1" && m.maf == bin(10)).unwrap();
        assert_relative_eq!(row.ratios[5].value().unwrap(), 0.5);
    }
}
