use crate::accumulate::{tabulate_single, tabulate_trio};
use crate::aggregate::{average_runs, summarize_run, ChromosomeTable, RunReport, Scored};
use crate::census::GroundTruthCensus;
use crate::config::{expand, EvalConfig, RunConfig, RunMode};
use crate::csv_reader::load_table;
use crate::error::UnitFailure;
use crate::output::{
    write_census, write_exclusions, write_mean_report, write_report, write_table, BINNED_INDEX,
    CUMULATIVE_INDEX,
};
use crate::tables::{MafTable, SingleCounts, TrioCounts};
use crate::truth::{GroundTruthIndex, TruthSettings};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const EXCLUSIONS_FILE: &str = "excluded_units.csv";

fn failure(run: &RunConfig, chrom: &str, reason: impl ToString) -> UnitFailure {
    let failure = UnitFailure {
        run: run.label.clone(),
        samples: run.sample_label(),
        chromosome: chrom.to_string(),
        reason: reason.to_string(),
    };
    warn!("Excluding {}", failure);
    failure
}

/// Remove an output left by an earlier invocation so it cannot be reused.
fn remove_stale(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => warn!("Removed stale {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove stale {}: {}", path.display(), e),
    }
}

/// Build the ground-truth census for every configured chromosome and write it.
pub fn build_census(config: &EvalConfig, pb: Option<&ProgressBar>) -> Result<GroundTruthCensus> {
    let parts: Vec<GroundTruthCensus> = config
        .chromosomes
        .par_iter()
        .map(|chrom| {
            let census = GroundTruthCensus::build(chrom, &config.truth_path(chrom), config.min_maf);
            if let Some(pb) = pb {
                pb.inc(1);
            }
            census.with_context(|| format!("Census failed for {}", chrom))
        })
        .collect::<Result<_>>()?;

    let mut census = GroundTruthCensus::new();
    for part in parts {
        census.merge(part);
    }
    write_census(&census, &config.census)?;
    info!("Census written to {}", config.census.display());
    Ok(census)
}

/// Score one run on one chromosome and persist its binned table.
fn evaluate_unit(
    config: &EvalConfig,
    run: &RunConfig,
    chrom: &str,
    index: &GroundTruthIndex,
) -> Result<PathBuf> {
    let path = config.table_path(run, chrom);
    match &run.mode {
        RunMode::Single {
            sample,
            direct_vcf,
            imputed_vcf,
        } => {
            let table = tabulate_single(
                index,
                sample,
                run.call_sample.as_deref(),
                &expand(direct_vcf, chrom),
                &expand(imputed_vcf, chrom),
            )?;
            write_table(&table, &path)?;
        }
        RunMode::Trio {
            child,
            mother,
            imputed_vcf,
            ..
        } => {
            let table = tabulate_trio(
                index,
                child,
                mother,
                run.call_sample.as_deref(),
                &expand(imputed_vcf, chrom),
            )?;
            write_table(&table, &path)?;
        }
    }
    Ok(path)
}

/// Score every run on every chromosome and write the per-unit tables.
///
/// Chromosomes are processed one at a time so only one truth index is held
/// in memory; it is built once and shared read-only by the runs scored in
/// parallel against it. A failed unit is returned as a [`UnitFailure`], its
/// table from any earlier evaluation is removed, and its siblings go on.
pub fn evaluate(config: &EvalConfig, pb: Option<&ProgressBar>) -> Vec<UnitFailure> {
    let settings = TruthSettings {
        min_maf: config.min_maf,
        samples: Some(config.tracked_samples()),
    };

    let mut failures = Vec::new();
    for chrom in &config.chromosomes {
        if let Some(pb) = pb {
            pb.set_message(chrom.clone());
        }

        let index = match GroundTruthIndex::build(&config.truth_path(chrom), &settings) {
            Ok(index) => index,
            Err(e) => {
                for run in &config.runs {
                    remove_stale(&config.table_path(run, chrom));
                    failures.push(failure(run, chrom, &e));
                }
                if let Some(pb) = pb {
                    pb.inc(config.runs.len() as u64);
                }
                continue;
            }
        };

        let results: Vec<Result<PathBuf, UnitFailure>> = config
            .runs
            .par_iter()
            .map(|run| {
                let result = evaluate_unit(config, run, chrom, &index).map_err(|e| {
                    remove_stale(&config.table_path(run, chrom));
                    failure(run, chrom, format!("{:#}", e))
                });
                if let Some(pb) = pb {
                    pb.inc(1);
                }
                result
            })
            .collect();

        for (run, result) in config.runs.iter().zip(results) {
            match result {
                Ok(path) => info!("{} on {}: table written to {}", run.label, chrom, path.display()),
                Err(f) => failures.push(f),
            }
        }
    }
    failures
}

/// Load the persisted tables of one run, skipping units already known to
/// have failed. Unreadable tables become new failures.
fn load_run_tables<T: Scored>(
    config: &EvalConfig,
    run: &RunConfig,
    failed: &HashSet<(String, String)>,
    truth: impl Fn(&str) -> MafTable<T::Truth>,
) -> (Vec<ChromosomeTable<T>>, Vec<UnitFailure>) {
    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for chrom in &config.chromosomes {
        if failed.contains(&(run.label.clone(), chrom.clone())) {
            continue;
        }
        match load_table::<T>(&config.table_path(run, chrom)) {
            Ok(counts) => tables.push(ChromosomeTable {
                chrom: chrom.clone(),
                counts,
                truth: truth(chrom),
            }),
            Err(e) => failures.push(failure(run, chrom, format!("{:#}", e))),
        }
    }
    (tables, failures)
}

struct ConditionReports<T: Scored> {
    by_condition: BTreeMap<String, Vec<RunReport<T>>>,
}

impl<T: Scored> ConditionReports<T> {
    fn new() -> Self {
        ConditionReports {
            by_condition: BTreeMap::new(),
        }
    }

    fn report_run(
        &mut self,
        config: &EvalConfig,
        run: &RunConfig,
        tables: Vec<ChromosomeTable<T>>,
    ) -> Result<()> {
        let dir = config.run_dir(run);
        if tables.is_empty() {
            warn!("Run {} has no usable chromosome; left out of the reports", run.label);
            remove_stale(&dir.join("binned.csv"));
            remove_stale(&dir.join("cumulative.csv"));
            return Ok(());
        }
        let report = summarize_run(tables);
        write_report(&report.binned, BINNED_INDEX, &dir.join("binned.csv"))?;
        write_report(&report.cumulative, CUMULATIVE_INDEX, &dir.join("cumulative.csv"))?;
        self.by_condition
            .entry(run.condition())
            .or_default()
            .push(report);
        Ok(())
    }

    fn write_means(&self, config: &EvalConfig) -> Result<()> {
        for (condition, reports) in &self.by_condition {
            let binned = average_runs(reports.iter().map(|r| r.binned.as_slice()));
            let cumulative = average_runs(reports.iter().map(|r| r.cumulative.as_slice()));
            write_mean_report::<T>(
                &binned,
                BINNED_INDEX,
                &config.output_dir.join(format!("{}_binned_mean.csv", condition)),
            )?;
            write_mean_report::<T>(
                &cumulative,
                CUMULATIVE_INDEX,
                &config.output_dir.join(format!("{}_cumulative_mean.csv", condition)),
            )?;
            info!("{}: mean of {} run(s) written", condition, reports.len());
        }
        Ok(())
    }
}

/// Aggregate the persisted per-unit tables into run and condition reports,
/// then write the exclusion report. Returns every excluded unit.
pub fn summarize(
    config: &EvalConfig,
    census: &GroundTruthCensus,
    mut failures: Vec<UnitFailure>,
) -> Result<Vec<UnitFailure>> {
    let failed: HashSet<(String, String)> = failures
        .iter()
        .map(|f| (f.run.clone(), f.chromosome.clone()))
        .collect();

    let counted: HashSet<&str> = census.chromosomes().collect();
    for chrom in &config.chromosomes {
        if !counted.contains(chrom.as_str()) {
            warn!("Chromosome {} has no census counts; its call rates will be NA", chrom);
        }
    }
    let totals = census.sample_totals();
    for sample in config.tracked_samples() {
        if !totals.contains_key(sample.as_str()) {
            warn!("Sample {} has no census counts; its call rates will be NA", sample);
        }
    }

    let mut single = ConditionReports::<SingleCounts>::new();
    let mut trio = ConditionReports::<TrioCounts>::new();

    for run in &config.runs {
        match &run.mode {
            RunMode::Single { sample, .. } => {
                let (tables, new_failures) = load_run_tables::<SingleCounts>(config, run, &failed, |chrom| {
                    census.sample_table(chrom, sample)
                });
                failures.extend(new_failures);
                single.report_run(config, run, tables)?;
            }
            RunMode::Trio { child, mother, .. } => {
                let (tables, new_failures) = load_run_tables::<TrioCounts>(config, run, &failed, |chrom| {
                    census.trio_table(chrom, mother, child)
                });
                failures.extend(new_failures);
                trio.report_run(config, run, tables)?;
            }
        }
    }

    single.write_means(config)?;
    trio.write_means(config)?;

    let exclusions = config.output_dir.join(EXCLUSIONS_FILE);
    write_exclusions(&failures, &exclusions)
        .with_context(|| format!("Failed to write {}", exclusions.display()))?;
    if !failures.is_empty() {
        warn!("{} unit(s) excluded, see {}", failures.len(), exclusions.display());
    }
    Ok(failures)
}
