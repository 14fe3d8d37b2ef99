use crate::compare::{JointClass, TrioOutcome};
use crate::types::{ComparisonOutcome, MafBin, Method, MAF_BINS};
use std::fmt;

/// A fixed set of named `u64` counters that can be summed.
pub trait Tally: fmt::Debug + Default + Clone + PartialEq {
    /// CSV column names, in [`Tally::values`] order.
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<u64>;

    /// Inverse of [`Tally::values`]; `None` on a length mismatch.
    fn from_values(values: &[u64]) -> Option<Self>;

    fn add(&mut self, other: &Self);
}

/// Declare a counter struct whose fields are its CSV columns.
macro_rules! tally {
    ($(#[$meta:meta])* $name:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: u64),+
        }

        impl $crate::tables::Tally for $name {
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn values(&self) -> Vec<u64> {
                vec![$(self.$field),+]
            }

            fn from_values(values: &[u64]) -> Option<Self> {
                let mut it = values.iter().copied();
                let out = $name { $($field: it.next()?),+ };
                if it.next().is_some() {
                    return None;
                }
                Some(out)
            }

            fn add(&mut self, other: &Self) {
                $(self.$field += other.$field;)+
            }
        }
    };
}

pub(crate) use tally;

/// Dense per-MAF-bin table, one `T` for each bin 0..=50.
#[derive(Debug, Clone, PartialEq)]
pub struct MafTable<T> {
    bins: Vec<T>,
}

impl<T: Tally> Default for MafTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tally> MafTable<T> {
    pub fn new() -> Self {
        MafTable {
            bins: vec![T::default(); MAF_BINS],
        }
    }

    pub fn from_fn(f: impl FnMut(MafBin) -> T) -> Self {
        MafTable {
            bins: MafBin::all().map(f).collect(),
        }
    }

    pub fn bin(&self, bin: MafBin) -> &T {
        &self.bins[bin.index()]
    }

    pub fn bin_mut(&mut self, bin: MafBin) -> &mut T {
        &mut self.bins[bin.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (MafBin, &T)> {
        MafBin::all().zip(self.bins.iter())
    }

    /// Bin-wise sum.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.bins.iter_mut().zip(other.bins.iter()) {
            mine.add(theirs);
        }
    }

    pub fn sum<'a>(tables: impl IntoIterator<Item = &'a Self>) -> Self
    where
        T: 'a,
    {
        let mut total = Self::new();
        for table in tables {
            total.merge(table);
        }
        total
    }

    /// Threshold view: bin `t` holds the sum over bins `t..=50`.
    pub fn cumulative(&self) -> Self {
        let mut bins = self.bins.clone();
        for i in (0..MAF_BINS - 1).rev() {
            let (head, tail) = bins.split_at_mut(i + 1);
            head[i].add(&tail[0]);
        }
        MafTable { bins }
    }

    /// Sum over every bin.
    pub fn total(&self) -> T {
        let mut total = T::default();
        for counts in &self.bins {
            total.add(counts);
        }
        total
    }
}

tally! {
    /// Correctness counts of both calling methods for one MAF bin.
    SingleCounts {
        direct_gt_true,
        direct_gt_false,
        direct_alt_true,
        direct_alt_false,
        imputed_gt_true,
        imputed_gt_false,
        imputed_alt_true,
        imputed_alt_false,
    }
}

/// Per-method view of [`SingleCounts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCounts {
    pub gt_true: u64,
    pub gt_false: u64,
    pub alt_true: u64,
    pub alt_false: u64,
}

impl SingleCounts {
    pub fn record(&mut self, method: Method, outcome: &ComparisonOutcome) {
        let (gt_true, gt_false, alt_true, alt_false) = match method {
            Method::Direct => (
                &mut self.direct_gt_true,
                &mut self.direct_gt_false,
                &mut self.direct_alt_true,
                &mut self.direct_alt_false,
            ),
            Method::Imputed => (
                &mut self.imputed_gt_true,
                &mut self.imputed_gt_false,
                &mut self.imputed_alt_true,
                &mut self.imputed_alt_false,
            ),
        };
        *gt_true += outcome.gt_correct();
        *gt_false += outcome.gt_wrong();
        *alt_true += outcome.alt_correct();
        *alt_false += outcome.alt_wrong();
    }

    pub fn method(&self, method: Method) -> MethodCounts {
        match method {
            Method::Direct => MethodCounts {
                gt_true: self.direct_gt_true,
                gt_false: self.direct_gt_false,
                alt_true: self.direct_alt_true,
                alt_false: self.direct_alt_false,
            },
            Method::Imputed => MethodCounts {
                gt_true: self.imputed_gt_true,
                gt_false: self.imputed_gt_false,
                alt_true: self.imputed_alt_true,
                alt_false: self.imputed_alt_false,
            },
        }
    }
}

tally! {
    /// Joint mother/child outcome counts for one MAF bin.
    ///
    /// The four `*_both_*`/`*_correct_*_wrong` columns partition the
    /// evaluated variants; `*_mom_correct` and `*_child_correct` are
    /// marginal tallies over the same variants.
    TrioCounts {
        gt_both_correct,
        gt_mom_correct,
        gt_child_correct,
        gt_mom_correct_child_wrong,
        gt_child_correct_mom_wrong,
        gt_both_wrong,
        alt_both_correct,
        alt_mom_correct,
        alt_child_correct,
        alt_mom_correct_child_wrong,
        alt_child_correct_mom_wrong,
        alt_both_wrong,
    }
}

impl TrioCounts {
    pub fn record(&mut self, outcome: &TrioOutcome) {
        match outcome.gt {
            JointClass::BothCorrect => self.gt_both_correct += 1,
            JointClass::MomCorrectChildWrong => self.gt_mom_correct_child_wrong += 1,
            JointClass::ChildCorrectMomWrong => self.gt_child_correct_mom_wrong += 1,
            JointClass::BothWrong => self.gt_both_wrong += 1,
        }
        self.gt_mom_correct += outcome.gt_mom_ok as u64;
        self.gt_child_correct += outcome.gt_child_ok as u64;

        match outcome.alt {
            JointClass::BothCorrect => self.alt_both_correct += 1,
            JointClass::MomCorrectChildWrong => self.alt_mom_correct_child_wrong += 1,
            JointClass::ChildCorrectMomWrong => self.alt_child_correct_mom_wrong += 1,
            JointClass::BothWrong => self.alt_both_wrong += 1,
        }
        self.alt_mom_correct += outcome.alt_mom_ok as u64;
        self.alt_child_correct += outcome.alt_child_ok as u64;
    }

    /// Variants where both samples were evaluated.
    pub fn gt_evaluated(&self) -> u64 {
        self.gt_both_correct + self.gt_mom_correct_child_wrong + self.gt_child_correct_mom_wrong + self.gt_both_wrong
    }

    pub fn alt_evaluated(&self) -> u64 {
        self.alt_both_correct
            + self.alt_mom_correct_child_wrong
            + self.alt_child_correct_mom_wrong
            + self.alt_both_wrong
    }

    pub fn gt_mom_wrong(&self) -> u64 {
        self.gt_both_wrong + self.gt_child_correct_mom_wrong
    }

    pub fn gt_child_wrong(&self) -> u64 {
        self.gt_both_wrong + self.gt_mom_correct_child_wrong
    }

    pub fn alt_mom_wrong(&self) -> u64 {
        self.alt_both_wrong + self.alt_child_correct_mom_wrong
    }

    pub fn alt_child_wrong(&self) -> u64 {
        self.alt_both_wrong + self.alt_mom_correct_child_wrong
    }
}

pub type SingleSampleTable = MafTable<SingleCounts>;
pub type TrioTable = MafTable<TrioCounts>;

impl MafTable<SingleCounts> {
    pub fn record(&mut self, method: Method, outcome: &ComparisonOutcome) {
        self.bin_mut(outcome.maf_bin).record(method, outcome);
    }
}

impl MafTable<TrioCounts> {
    pub fn record(&mut self, outcome: &TrioOutcome) {
        self.bin_mut(outcome.maf_bin).record(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;

    fn bin(i: usize) -> MafBin {
        MafBin::from_index(i).unwrap()
    }

    fn outcome(maf: usize, gt: Verdict, alt: Option<Verdict>) -> ComparisonOutcome {
        ComparisonOutcome {
            maf_bin: bin(maf),
            gt,
            alt,
        }
    }

    #[test]
    fn test_single_table_records_per_method() {
        let mut table = SingleSampleTable::new();
        table.record(Method::Direct, &outcome(10, Verdict::Correct, Some(Verdict::Correct)));
        table.record(Method::Imputed, &outcome(10, Verdict::Wrong, None));
        table.record(Method::Imputed, &outcome(10, Verdict::Wrong, Some(Verdict::Wrong)));

        let counts = table.bin(bin(10));
        assert_eq!(counts.direct_gt_true, 1);
        assert_eq!(counts.direct_alt_true, 1);
        assert_eq!(counts.imputed_gt_false, 2);
        assert_eq!(counts.imputed_alt_false, 1);
        assert_eq!(counts.imputed_alt_true, 0);
        assert_eq!(table.bin(bin(9)), &SingleCounts::default());
    }

    #[test]
    fn test_trio_record_child_correct_mom_wrong() {
        let child = outcome(10, Verdict::Correct, Some(Verdict::Correct));
        let mom = outcome(10, Verdict::Wrong, None);
        let mut table = TrioTable::new();
        table.record(&TrioOutcome::classify(&child, &mom));

        let expected = TrioCounts {
            gt_child_correct_mom_wrong: 1,
            gt_child_correct: 1,
            alt_child_correct_mom_wrong: 1,
            alt_child_correct: 1,
            ..TrioCounts::default()
        };
        assert_eq!(table.bin(bin(10)), &expected);
        assert_eq!(table.total(), expected);
    }

    #[test]
    fn test_trio_partition_counts_every_pair_once() {
        let mut counts = TrioCounts::default();
        let verdicts = [Verdict::Correct, Verdict::Wrong];
        for child in verdicts {
            for mom in verdicts {
                let trio = TrioOutcome::classify(&outcome(0, child, None), &outcome(0, mom, None));
                counts.record(&trio);
            }
        }
        assert_eq!(counts.gt_evaluated(), 4);
        assert_eq!(counts.gt_both_correct, 1);
        assert_eq!(counts.gt_both_wrong, 1);
        assert_eq!(counts.gt_mom_correct, 2);
        assert_eq!(counts.gt_child_correct, 2);
        assert_eq!(counts.gt_mom_wrong(), 2);
        assert_eq!(counts.alt_both_wrong, 4);
    }

    #[test]
    fn test_cumulative_is_suffix_sum() {
        let mut table = SingleSampleTable::new();
        table.bin_mut(bin(0)).imputed_gt_true = 1;
        table.bin_mut(bin(10)).imputed_gt_true = 2;
        table.bin_mut(bin(50)).imputed_gt_true = 4;

        let cumulative = table.cumulative();
        assert_eq!(cumulative.bin(bin(0)).imputed_gt_true, 7);
        assert_eq!(cumulative.bin(bin(1)).imputed_gt_true, 6);
        assert_eq!(cumulative.bin(bin(10)).imputed_gt_true, 6);
        assert_eq!(cumulative.bin(bin(11)).imputed_gt_true, 4);
        assert_eq!(cumulative.bin(bin(50)).imputed_gt_true, 4);
        assert_eq!(cumulative.bin(bin(0)), &table.total());
    }

    #[test]
    fn test_tally_values_round_trip_shape() {
        assert_eq!(SingleCounts::COLUMNS.len(), 8);
        assert_eq!(TrioCounts::COLUMNS.len(), 12);
        assert_eq!(SingleCounts::COLUMNS[0], "direct_gt_true");
        assert!(SingleCounts::from_values(&[1, 2, 3]).is_none());
        let counts = SingleCounts::from_values(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(counts.imputed_alt_false, 8);
    }
}
