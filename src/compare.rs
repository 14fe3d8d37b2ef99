use crate::truth::GroundTruthIndex;
use crate::types::{ComparisonOutcome, GenomicKey, GenotypeCall, MafBin, Verdict};

/// Score a called genotype against the truth genotype at one locus.
///
/// Returns `None` when the call has no valid allele. GT is exact set
/// equality. ALT is only judged when the call claims an ALT allele: a call
/// of `{0}` is never counted as an ALT error, whatever the truth says.
pub fn classify(called: GenotypeCall, truth: GenotypeCall, maf_bin: MafBin) -> Option<ComparisonOutcome> {
    if called.is_empty() {
        return None;
    }

    let gt = if called == truth {
        Verdict::Correct
    } else {
        Verdict::Wrong
    };

    let alt = if called.has_alt() {
        if truth.has_alt() {
            Some(Verdict::Correct)
        } else {
            Some(Verdict::Wrong)
        }
    } else {
        None
    };

    Some(ComparisonOutcome { maf_bin, gt, alt })
}

/// Scores called records for one sample against a shared truth index.
#[derive(Debug, Clone, Copy)]
pub struct Comparator<'a> {
    index: &'a GroundTruthIndex,
    column: Option<usize>,
}

impl<'a> Comparator<'a> {
    pub fn new(index: &'a GroundTruthIndex, sample: &str) -> Self {
        Comparator {
            index,
            column: index.sample_column(sample),
        }
    }

    /// `false` when the sample is absent from the truth panel; every
    /// comparison then yields nothing.
    pub fn has_truth(&self) -> bool {
        self.column.is_some()
    }

    /// `None` when the key, the sample or its truth genotype is missing, or
    /// when the call has no valid allele.
    pub fn compare(&self, key: &GenomicKey, called: &[i32]) -> Option<ComparisonOutcome> {
        let column = self.column?;
        let entry = self.index.get(key)?;
        let truth = entry.genotype(column)?;
        if truth.is_empty() {
            return None;
        }
        classify(GenotypeCall::from_alleles(called), truth, entry.maf_bin)
    }
}

/// Joint outcome of a mother/child pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointClass {
    BothCorrect,
    MomCorrectChildWrong,
    ChildCorrectMomWrong,
    BothWrong,
}

impl JointClass {
    pub fn from_flags(child_ok: bool, mom_ok: bool) -> Self {
        match (child_ok, mom_ok) {
            (true, true) => JointClass::BothCorrect,
            (false, true) => JointClass::MomCorrectChildWrong,
            (true, false) => JointClass::ChildCorrectMomWrong,
            (false, false) => JointClass::BothWrong,
        }
    }
}

/// Trio classification of one imputed record, at GT and ALT level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrioOutcome {
    pub maf_bin: MafBin,
    pub gt: JointClass,
    pub gt_child_ok: bool,
    pub gt_mom_ok: bool,
    pub alt: JointClass,
    pub alt_child_ok: bool,
    pub alt_mom_ok: bool,
}

impl TrioOutcome {
    /// Both samples must have an outcome for the same record.
    ///
    /// ALT is "ok" only for an explicit ALT_correct; an absent ALT outcome
    /// counts as not ok, exactly like an ALT_wrong.
    pub fn classify(child: &ComparisonOutcome, mother: &ComparisonOutcome) -> Self {
        let gt_child_ok = child.gt.is_correct();
        let gt_mom_ok = mother.gt.is_correct();
        let alt_child_ok = child.alt == Some(Verdict::Correct);
        let alt_mom_ok = mother.alt == Some(Verdict::Correct);

        TrioOutcome {
            maf_bin: child.maf_bin,
            gt: JointClass::from_flags(gt_child_ok, gt_mom_ok),
            gt_child_ok,
            gt_mom_ok,
            alt: JointClass::from_flags(alt_child_ok, alt_mom_ok),
            alt_child_ok,
            alt_mom_ok,
        }
    }
}
