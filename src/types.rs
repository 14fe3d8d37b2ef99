use std::fmt;
use std::sync::Arc;

/// Number of MAF bins: 0..=50.
pub const MAF_BINS: usize = 51;

/// Default minor allele frequency floor; rarer variants are never reported.
pub const DEFAULT_MIN_MAF: f64 = 0.001;

/// Marker for a missing allele in a [`RawGenotype`].
pub const MISSING_ALLELE: i32 = -1;

// Absorbs the rounding error of `1 - (1 - af)` so that MAF bins stay symmetric.
const MAF_TOLERANCE: f64 = 1e-9;

/// Identifies a locus + allele pair: (chrom, pos, ref, first alt).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicKey {
    pub chrom: Arc<str>,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl GenomicKey {
    pub fn new(chrom: &str, pos: u64, ref_allele: &str, alt_allele: &str) -> Self {
        GenomicKey {
            chrom: Arc::from(chrom),
            pos,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        }
    }
}

impl fmt::Display for GenomicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}>{}", self.chrom, self.pos, self.ref_allele, self.alt_allele)
    }
}

/// The AF annotation as it arrives from a VCF.
///
/// Headers disagree on how AF is declared, so the value is kept in the shape
/// it was read in and normalised once by [`AlleleFrequency::representative`].
#[derive(Debug, Clone, PartialEq)]
pub enum AlleleFrequency {
    Scalar(f64),
    Delimited(String),
    List(Vec<f64>),
}

impl AlleleFrequency {
    /// Single frequency for the first alternate allele, or `None` when the
    /// annotation is unparseable, missing or outside [0, 1].
    pub fn representative(&self) -> Option<f64> {
        let value = match self {
            AlleleFrequency::Scalar(v) => Some(*v),
            AlleleFrequency::List(values) => values.first().copied(),
            AlleleFrequency::Delimited(s) => s
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split(',')
                .next()
                .and_then(|first| first.trim().parse::<f64>().ok()),
        }?;

        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(value)
        } else {
            None
        }
    }
}

/// MAF stratum: `floor(min(AF, 1 - AF) * 100)`, always in 0..=50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MafBin(u8);

impl MafBin {
    pub const MAX: MafBin = MafBin(50);

    /// Bin for an allele frequency, or `None` below `min_maf`.
    pub fn from_frequency(af: f64, min_maf: f64) -> Option<MafBin> {
        if !(0.0..=1.0).contains(&af) {
            return None;
        }
        let maf = af.min(1.0 - af);
        if maf + MAF_TOLERANCE < min_maf {
            return None;
        }
        let bin = ((maf * 100.0) + MAF_TOLERANCE).floor() as u8;
        Some(MafBin(bin.min(Self::MAX.0)))
    }

    /// Bin from its integer index, as read back from a table.
    pub fn from_index(index: usize) -> Option<MafBin> {
        if index < MAF_BINS {
            Some(MafBin(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl DoubleEndedIterator<Item = MafBin> {
        (0..MAF_BINS as u8).map(MafBin)
    }
}

impl fmt::Display for MafBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First two allele indices of a sample as read from the VCF; negative means missing.
pub type RawGenotype = [i32; 2];

/// Set of called allele indices (0 = REF).
///
/// Stored as a bitmask over allele indices 0..64; an empty set means the
/// genotype is not callable, which is distinct from hom-ref `{0}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GenotypeCall(u64);

impl GenotypeCall {
    pub const EMPTY: GenotypeCall = GenotypeCall(0);

    /// Build from raw allele indices, dropping missing (negative) ones.
    pub fn from_alleles(alleles: &[i32]) -> Self {
        let mask = alleles
            .iter()
            .filter(|&&a| (0..64).contains(&a))
            .fold(0u64, |mask, &a| mask | (1u64 << a));
        GenotypeCall(mask)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Anything but exactly `{0}`.
    pub fn has_alt(&self) -> bool {
        self.0 != 1
    }

    pub fn contains(&self, allele: u32) -> bool {
        allele < 64 && self.0 & (1u64 << allele) != 0
    }
}

impl fmt::Display for GenotypeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, ".");
        }
        let alleles: Vec<String> = (0..64u32)
            .filter(|&a| self.contains(a))
            .map(|a| a.to_string())
            .collect();
        write!(f, "{{{}}}", alleles.join(","))
    }
}

/// Calling method whose output is being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Direct caller working from the alignments.
    Direct,
    /// Imputation-based refinement of the direct calls.
    Imputed,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Direct => "direct",
            Method::Imputed => "imputed",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong,
}

impl Verdict {
    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

/// Result of scoring one called record for one sample against the truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonOutcome {
    pub maf_bin: MafBin,
    pub gt: Verdict,
    /// `None` when the call makes no ALT claim.
    pub alt: Option<Verdict>,
}

impl ComparisonOutcome {
    pub fn gt_correct(&self) -> u64 {
        (self.gt == Verdict::Correct) as u64
    }

    pub fn gt_wrong(&self) -> u64 {
        (self.gt == Verdict::Wrong) as u64
    }

    pub fn alt_correct(&self) -> u64 {
        (self.alt == Some(Verdict::Correct)) as u64
    }

    pub fn alt_wrong(&self) -> u64 {
        (self.alt == Some(Verdict::Wrong)) as u64
    }
}
