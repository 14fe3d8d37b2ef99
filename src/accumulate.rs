use crate::compare::{Comparator, TrioOutcome};
use crate::error::{InputKind, UnitError, VcfError};
use crate::tables::{SingleSampleTable, TrioTable};
use crate::truth::GroundTruthIndex;
use crate::types::{GenomicKey, Method, RawGenotype};
use crate::vcf_parser::VcfSiteReader;
use log::{debug, warn};
use std::path::Path;

/// Stream one sample column of a called VCF as (key, genotype); the first
/// column unless `column` names another.
fn called_records<'a>(
    path: &'a Path,
    method: Method,
    column: Option<&str>,
) -> Result<impl Iterator<Item = Result<(GenomicKey, RawGenotype), UnitError>> + 'a, UnitError> {
    let kind = InputKind::Called(method);
    let mut reader = VcfSiteReader::open(path).map_err(|e| UnitError::new(kind, path, e))?;
    let selected = match column {
        Some(name) => reader.select_sample(name),
        None => reader.select_first_sample(),
    };
    selected.map_err(|e| UnitError::new(kind, path, e))?;

    Ok(reader.map(move |site| {
        let site = site.map_err(|e: VcfError| UnitError::new(kind, path, e))?;
        let raw = site.genotypes.first().copied().unwrap_or([crate::types::MISSING_ALLELE; 2]);
        Ok((site.key, raw))
    }))
}

/// Per-bin correctness counts of both calling methods for one sample.
pub fn tabulate_single(
    index: &GroundTruthIndex,
    sample: &str,
    call_sample: Option<&str>,
    direct_vcf: &Path,
    imputed_vcf: &Path,
) -> Result<SingleSampleTable, UnitError> {
    let comparator = Comparator::new(index, sample);
    if !comparator.has_truth() {
        warn!("Sample {} is not in the truth panel; every call will be skipped", sample);
    }

    let mut table = SingleSampleTable::new();
    for (method, path) in [(Method::Direct, direct_vcf), (Method::Imputed, imputed_vcf)] {
        let mut scored = 0u64;
        for record in called_records(path, method, call_sample)? {
            let (key, raw) = record?;
            if let Some(outcome) = comparator.compare(&key, &raw) {
                table.record(method, &outcome);
                scored += 1;
            }
        }
        debug!("{} {}: {} calls matched the truth", sample, method, scored);
    }
    Ok(table)
}

/// Joint child/mother counts for a mixed sample's imputed calls.
///
/// The one called genotype is scored against both truths; a record counts
/// only when both produce an outcome.
pub fn tabulate_trio(
    index: &GroundTruthIndex,
    child: &str,
    mother: &str,
    call_sample: Option<&str>,
    imputed_vcf: &Path,
) -> Result<TrioTable, UnitError> {
    let child_cmp = Comparator::new(index, child);
    let mother_cmp = Comparator::new(index, mother);
    for (name, cmp) in [(child, &child_cmp), (mother, &mother_cmp)] {
        if !cmp.has_truth() {
            warn!("Sample {} is not in the truth panel; every call will be skipped", name);
        }
    }

    let mut table = TrioTable::new();
    let mut scored = 0u64;
    for record in called_records(imputed_vcf, Method::Imputed, call_sample)? {
        let (key, raw) = record?;
        let (Some(child_outcome), Some(mother_outcome)) =
            (child_cmp.compare(&key, &raw), mother_cmp.compare(&key, &raw))
        else {
            continue;
        };
        table.record(&TrioOutcome::classify(&child_outcome, &mother_outcome));
        scored += 1;
    }
    debug!("{}+{}: {} calls matched both truths", child, mother, scored);
    Ok(table)
}
