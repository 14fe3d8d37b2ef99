use crate::error::VcfError;
use crate::types::{AlleleFrequency, GenomicKey, RawGenotype, MISSING_ALLELE};
use rust_htslib::bcf::header::HeaderView;
use rust_htslib::bcf::record::{Genotype, GenotypeAllele};
use rust_htslib::{bcf, bcf::Read};
use std::path::Path;
use std::sync::Arc;

/// One VCF record reduced to what concordance needs.
#[derive(Debug, Clone)]
pub struct Site {
    pub key: GenomicKey,
    pub frequency: Option<AlleleFrequency>,
    /// Genotypes of the selected sample columns, in selection order.
    pub genotypes: Vec<RawGenotype>,
}

/// Streaming reader over a VCF/BCF that yields [`Site`]s.
///
/// Only the selected sample columns are decoded; by default that is every
/// sample in the header.
pub struct VcfSiteReader {
    reader: bcf::Reader,
    header: HeaderView,
    record: bcf::Record,
    samples: Vec<String>,
    columns: Vec<usize>,
    contig: Option<(u32, Arc<str>)>,
}

/// Resolve a sample name to its column index in the VCF header.
fn resolve_sample_index(samples: &[String], name: &str) -> Result<usize, VcfError> {
    samples
        .iter()
        .position(|s| s == name)
        .ok_or_else(|| VcfError::MissingSample {
            name: name.to_string(),
            available: samples.to_vec(),
        })
}

/// First two alleles of a genotype, missing ones as [`MISSING_ALLELE`].
fn raw_genotype(gt: &Genotype) -> RawGenotype {
    let mut raw = [MISSING_ALLELE; 2];
    for (slot, allele) in raw.iter_mut().zip(gt.iter()) {
        *slot = match allele {
            GenotypeAllele::Unphased(n) | GenotypeAllele::Phased(n) => *n,
            _ => MISSING_ALLELE,
        };
    }
    raw
}

/// Read the AF annotation in whatever shape the header declares it.
fn read_frequency(record: &bcf::Record) -> Option<AlleleFrequency> {
    if let Ok(Some(values)) = record.info(b"AF").float() {
        let values: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        return match values.as_slice() {
            [single] => Some(AlleleFrequency::Scalar(*single)),
            _ => Some(AlleleFrequency::List(values)),
        };
    }
    if let Ok(Some(values)) = record.info(b"AF").string() {
        let joined = values
            .iter()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        return Some(AlleleFrequency::Delimited(joined));
    }
    None
}

impl VcfSiteReader {
    pub fn open(path: &Path) -> Result<Self, VcfError> {
        let reader = bcf::Reader::from_path(path)?;
        let header = reader.header().clone();
        let record = reader.empty_record();

        let samples: Vec<String> = header
            .samples()
            .iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect();
        let columns = (0..samples.len()).collect();

        Ok(VcfSiteReader {
            reader,
            header,
            record,
            samples,
            columns,
            contig: None,
        })
    }

    /// Names of the decoded columns, in the order genotypes are returned.
    pub fn selected_samples(&self) -> Vec<String> {
        self.columns.iter().map(|&i| self.samples[i].clone()).collect()
    }

    /// Decode only the columns whose sample name passes `keep`.
    pub fn retain_samples(&mut self, keep: impl Fn(&str) -> bool) {
        let samples = &self.samples;
        self.columns.retain(|&i| keep(&samples[i]));
    }

    /// Decode only the named sample.
    pub fn select_sample(&mut self, name: &str) -> Result<(), VcfError> {
        let idx = resolve_sample_index(&self.samples, name)?;
        self.columns = vec![idx];
        Ok(())
    }

    /// Decode only the first sample column (the layout of single-sample call sets).
    pub fn select_first_sample(&mut self) -> Result<(), VcfError> {
        if self.samples.is_empty() {
            return Err(VcfError::NoSamples);
        }
        self.columns = vec![0];
        Ok(())
    }

    fn contig_name(&mut self, rid: u32) -> Result<Arc<str>, VcfError> {
        if let Some((cached, name)) = &self.contig {
            if *cached == rid {
                return Ok(Arc::clone(name));
            }
        }
        let name: Arc<str> = Arc::from(String::from_utf8_lossy(self.header.rid2name(rid)?).as_ref());
        self.contig = Some((rid, Arc::clone(&name)));
        Ok(name)
    }

    fn current_site(&mut self) -> Result<Site, VcfError> {
        let pos = self.record.pos() as u64 + 1; // BCF is 0-based, we want 1-based
        let rid = self.record.rid().ok_or(VcfError::MissingContig(pos))?;
        let chrom = self.contig_name(rid)?;

        let (ref_allele, alt_allele) = {
            let alleles = self.record.alleles();
            let ref_allele = alleles
                .first()
                .map(|a| String::from_utf8_lossy(a).to_string())
                .unwrap_or_else(|| ".".to_string());
            let alt_allele = alleles
                .get(1)
                .map(|a| String::from_utf8_lossy(a).to_string())
                .unwrap_or_else(|| ".".to_string());
            (ref_allele, alt_allele)
        };

        let frequency = read_frequency(&self.record);

        let genotypes = if self.columns.is_empty() {
            Vec::new()
        } else {
            match self.record.genotypes() {
                Ok(genotypes) => self
                    .columns
                    .iter()
                    .map(|&i| raw_genotype(&genotypes.get(i)))
                    .collect(),
                // No GT on this record: every selected sample is uncalled.
                Err(_) => vec![[MISSING_ALLELE; 2]; self.columns.len()],
            }
        };

        Ok(Site {
            key: GenomicKey {
                chrom,
                pos,
                ref_allele,
                alt_allele,
            },
            frequency,
            genotypes,
        })
    }
}

impl Iterator for VcfSiteReader {
    type Item = Result<Site, VcfError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read(&mut self.record)? {
            Ok(()) => Some(self.current_site()),
            Err(e) => Some(Err(e.into())),
        }
    }
}
