use crate::error::{InputKind, UnitError, VcfError};
use crate::types::{GenomicKey, GenotypeCall, MafBin};
use crate::vcf_parser::{Site, VcfSiteReader};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Truth for one locus: its MAF bin and the genotype of every indexed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthEntry {
    pub maf_bin: MafBin,
    genotypes: Box<[GenotypeCall]>,
}

impl GroundTruthEntry {
    pub fn genotype(&self, column: usize) -> Option<GenotypeCall> {
        self.genotypes.get(column).copied()
    }
}

/// Records dropped while indexing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexSkips {
    pub invalid_af: u64,
    pub below_min_maf: u64,
}

/// Which samples the index keeps, and the MAF floor.
#[derive(Debug, Clone)]
pub struct TruthSettings {
    pub min_maf: f64,
    /// `None` keeps every sample in the header.
    pub samples: Option<HashSet<String>>,
}

/// Per-chromosome lookup from [`GenomicKey`] to [`GroundTruthEntry`].
///
/// Built once and never mutated afterwards; comparison tasks share it by reference.
#[derive(Debug, Clone)]
pub struct GroundTruthIndex {
    samples: Vec<String>,
    columns: HashMap<String, usize>,
    entries: HashMap<GenomicKey, GroundTruthEntry>,
    skips: IndexSkips,
}

impl GroundTruthIndex {
    /// Index a ground-truth VCF. Any read error aborts the whole index.
    pub fn build(path: &Path, settings: &TruthSettings) -> Result<Self, UnitError> {
        let wrap = |e: VcfError| UnitError::new(InputKind::GroundTruth, path, e);

        let mut reader = VcfSiteReader::open(path).map_err(wrap)?;
        if let Some(keep) = &settings.samples {
            reader.retain_samples(|name| keep.contains(name));
        }

        let mut builder = IndexBuilder::new(reader.selected_samples(), settings.min_maf);
        for site in reader {
            builder.push(site.map_err(wrap)?);
        }
        let index = builder.finish();

        info!(
            "Indexed {} truth variants for {} sample(s) from {}",
            index.len(),
            index.samples.len(),
            path.display()
        );
        debug!(
            "  skipped: {} invalid AF, {} below MAF floor",
            index.skips.invalid_af, index.skips.below_min_maf
        );
        Ok(index)
    }

    /// Index already-parsed sites; genotypes are in `samples` order.
    pub fn from_sites(
        samples: Vec<String>,
        sites: impl IntoIterator<Item = Site>,
        min_maf: f64,
    ) -> Self {
        let mut builder = IndexBuilder::new(samples, min_maf);
        for site in sites {
            builder.push(site);
        }
        builder.finish()
    }

    pub fn get(&self, key: &GenomicKey) -> Option<&GroundTruthEntry> {
        self.entries.get(key)
    }

    /// Column of a sample in every entry, or `None` if it was not indexed.
    pub fn sample_column(&self, sample: &str) -> Option<usize> {
        self.columns.get(sample).copied()
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn skips(&self) -> IndexSkips {
        self.skips
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct IndexBuilder {
    index: GroundTruthIndex,
    min_maf: f64,
}

impl IndexBuilder {
    fn new(samples: Vec<String>, min_maf: f64) -> Self {
        let columns = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        IndexBuilder {
            index: GroundTruthIndex {
                samples,
                columns,
                entries: HashMap::new(),
                skips: IndexSkips::default(),
            },
            min_maf,
        }
    }

    fn push(&mut self, site: Site) {
        let Some(af) = site.frequency.as_ref().and_then(|f| f.representative()) else {
            self.index.skips.invalid_af += 1;
            return;
        };
        let Some(maf_bin) = MafBin::from_frequency(af, self.min_maf) else {
            self.index.skips.below_min_maf += 1;
            return;
        };

        let genotypes = site
            .genotypes
            .iter()
            .map(|raw| GenotypeCall::from_alleles(raw))
            .collect();

        // Last record for a key wins.
        self.index
            .entries
            .insert(site.key, GroundTruthEntry { maf_bin, genotypes });
    }

    fn finish(self) -> GroundTruthIndex {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlleleFrequency, DEFAULT_MIN_MAF, MISSING_ALLELE};

    fn site(pos: u64, alt: &str, af: Option<AlleleFrequency>, genotypes: Vec<[i32; 2]>) -> Site {
        Site {
            key: GenomicKey::new("chr1", pos, "A", alt),
            frequency: af,
            genotypes,
        }
    }

    fn samples() -> Vec<String> {
        vec!["MOM".to_string(), "KID".to_string()]
    }

    #[test]
    fn test_index_stores_bin_and_genotypes() {
        let index = GroundTruthIndex::from_sites(
            samples(),
            vec![site(100, "G", Some(AlleleFrequency::Scalar(0.10)), vec![[0, 1], [1, 1]])],
            DEFAULT_MIN_MAF,
        );
        let entry = index.get(&GenomicKey::new("chr1", 100, "A", "G")).unwrap();
        assert_eq!(entry.maf_bin.index(), 10);
        let kid = index.sample_column("KID").unwrap();
        assert_eq!(entry.genotype(kid), Some(GenotypeCall::from_alleles(&[1, 1])));
        assert_eq!(index.sample_column("DAD"), None);
    }

    #[test]
    fn test_index_skips_bad_af_and_rare_variants() {
        let index = GroundTruthIndex::from_sites(
            samples(),
            vec![
                site(1, "G", None, vec![[0, 1], [0, 1]]),
                site(2, "G", Some(AlleleFrequency::Scalar(1.2)), vec![[0, 1], [0, 1]]),
                site(3, "G", Some(AlleleFrequency::Delimited("NA".into())), vec![[0, 1], [0, 1]]),
                site(4, "G", Some(AlleleFrequency::Scalar(0.0002)), vec![[0, 1], [0, 1]]),
                site(5, "G", Some(AlleleFrequency::List(vec![0.3, 0.2])), vec![[0, 1], [0, 1]]),
            ],
            DEFAULT_MIN_MAF,
        );
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.skips(),
            IndexSkips {
                invalid_af: 3,
                below_min_maf: 1
            }
        );
        assert_eq!(
            index.get(&GenomicKey::new("chr1", 5, "A", "G")).unwrap().maf_bin.index(),
            30
        );
    }

    #[test]
    fn test_index_distinguishes_alt_alleles_and_last_write_wins() {
        let index = GroundTruthIndex::from_sites(
            samples(),
            vec![
                site(7, "G", Some(AlleleFrequency::Scalar(0.2)), vec![[0, 0], [0, 0]]),
                site(7, "T", Some(AlleleFrequency::Scalar(0.3)), vec![[0, 1], [0, 1]]),
                site(7, "G", Some(AlleleFrequency::Scalar(0.4)), vec![[1, 1], [MISSING_ALLELE, MISSING_ALLELE]]),
            ],
            DEFAULT_MIN_MAF,
        );
        assert_eq!(index.len(), 2);
        let g = index.get(&GenomicKey::new("chr1", 7, "A", "G")).unwrap();
        assert_eq!(g.maf_bin.index(), 40);
        assert!(g.genotype(1).unwrap().is_empty());
        assert_eq!(index.get(&GenomicKey::new("chr1", 7, "A", "T")).unwrap().maf_bin.index(), 30);
    }
}
