use crate::error::{InputKind, UnitError, VcfError};
use crate::tables::{tally, MafTable, Tally};
use crate::types::{MafBin, RawGenotype};
use crate::vcf_parser::{Site, VcfSiteReader};
use log::info;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

tally! {
    /// Ground-truth genotype counts for one (chromosome, sample, MAF bin).
    CensusCounts {
        total_gt,
        alt_gt,
        het_gt,
        hom_alt,
    }
}

impl CensusCounts {
    /// Count one truth genotype. Only the first two alleles matter.
    pub fn tally(&mut self, raw: &RawGenotype) {
        let valid: Vec<i32> = raw.iter().copied().filter(|&a| a >= 0).collect();
        if valid.is_empty() {
            return;
        }
        self.total_gt += 1;
        if valid.iter().any(|&a| a > 0) {
            self.alt_gt += 1;
        }
        if let [a, b] = valid.as_slice() {
            if a != b {
                self.het_gt += 1;
            } else if *a > 0 {
                self.hom_alt += 1;
            }
        }
    }
}

tally! {
    /// Census totals of a mother/child pair, used as trio call-rate denominators.
    TrioTruth {
        total_gt_mother,
        total_alt_mother,
        total_gt_child,
        total_alt_child,
    }
}

impl TrioTruth {
    pub fn new(mother: &CensusCounts, child: &CensusCounts) -> Self {
        TrioTruth {
            total_gt_mother: mother.total_gt,
            total_alt_mother: mother.alt_gt,
            total_gt_child: child.total_gt,
            total_alt_child: child.alt_gt,
        }
    }
}

/// Ground-truth totals keyed by chromosome, then sample.
///
/// Unknown chromosomes or samples read as all-zero tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundTruthCensus {
    tables: BTreeMap<String, BTreeMap<String, MafTable<CensusCounts>>>,
}

impl GroundTruthCensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every sample of a ground-truth VCF for one chromosome.
    pub fn build(chrom: &str, path: &Path, min_maf: f64) -> Result<Self, UnitError> {
        let wrap = |e: VcfError| UnitError::new(InputKind::GroundTruth, path, e);

        let reader = VcfSiteReader::open(path).map_err(wrap)?;
        let samples = reader.selected_samples();
        let mut census = GroundTruthCensus::new();
        let mut counted = 0u64;
        for site in reader {
            if census.count_site(chrom, &samples, &site.map_err(wrap)?, min_maf) {
                counted += 1;
            }
        }
        info!("Census for {}: {} variants, {} samples", chrom, counted, samples.len());
        Ok(census)
    }

    /// Apply the truth index's AF rules and count the site's genotypes.
    /// Returns `false` when the site is not eligible.
    pub fn count_site(&mut self, chrom: &str, samples: &[String], site: &Site, min_maf: f64) -> bool {
        let Some(bin) = site
            .frequency
            .as_ref()
            .and_then(|f| f.representative())
            .and_then(|af| MafBin::from_frequency(af, min_maf))
        else {
            return false;
        };

        let by_sample = self.tables.entry(chrom.to_string()).or_default();
        for (sample, raw) in samples.iter().zip(site.genotypes.iter()) {
            by_sample
                .entry(sample.clone())
                .or_default()
                .bin_mut(bin)
                .tally(raw);
        }
        true
    }

    pub fn add(&mut self, chrom: &str, sample: &str, bin: MafBin, counts: &CensusCounts) {
        self.tables
            .entry(chrom.to_string())
            .or_default()
            .entry(sample.to_string())
            .or_default()
            .bin_mut(bin)
            .add(counts);
    }

    /// Fold another census in; counts for the same cell are summed.
    pub fn merge(&mut self, other: GroundTruthCensus) {
        for (chrom, samples) in other.tables {
            let mine = self.tables.entry(chrom).or_default();
            for (sample, table) in samples {
                mine.entry(sample).or_default().merge(&table);
            }
        }
    }

    pub fn sample_table(&self, chrom: &str, sample: &str) -> MafTable<CensusCounts> {
        self.tables
            .get(chrom)
            .and_then(|samples| samples.get(sample))
            .cloned()
            .unwrap_or_default()
    }

    pub fn trio_table(&self, chrom: &str, mother: &str, child: &str) -> MafTable<TrioTruth> {
        let mother = self.sample_table(chrom, mother);
        let child = self.sample_table(chrom, child);
        MafTable::from_fn(|bin| TrioTruth::new(mother.bin(bin), child.bin(bin)))
    }

    /// Non-zero cells as (chrom, sample, bin, counts), ordered by chromosome and sample name.
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, MafBin, &CensusCounts)> {
        self.tables.iter().flat_map(|(chrom, samples)| {
            samples.iter().flat_map(move |(sample, table)| {
                table
                    .iter()
                    .filter(|(_, counts)| **counts != CensusCounts::default())
                    .map(move |(bin, counts)| (chrom.as_str(), sample.as_str(), bin, counts))
            })
        })
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Per-sample grand totals over every chromosome and bin.
    pub fn sample_totals(&self) -> HashMap<&str, CensusCounts> {
        let mut totals: HashMap<&str, CensusCounts> = HashMap::new();
        for (_, sample, _, counts) in self.cells() {
            totals.entry(sample).or_default().add(counts);
        }
        totals
    }
}
