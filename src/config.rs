use crate::types::DEFAULT_MIN_MAF;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the chromosome name in VCF path templates.
pub const CHROM_PLACEHOLDER: &str = "{chrom}";

fn default_min_maf() -> f64 {
    DEFAULT_MIN_MAF
}

fn default_replicate() -> u32 {
    1
}

/// Evaluation settings, read from JSON and validated before any VCF is opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    pub chromosomes: Vec<String>,
    #[serde(default = "default_min_maf")]
    pub min_maf: f64,
    /// Ground-truth VCF template, e.g. `truth/{chrom}.vcf.gz`.
    pub truth_vcf: String,
    /// Census CSV produced by the `census` command.
    pub census: PathBuf,
    pub output_dir: PathBuf,
    pub runs: Vec<RunConfig>,
}

/// One sampling run: a sample (or mother/child pair) at one coverage.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub label: String,
    pub coverage: f64,
    #[serde(default = "default_replicate")]
    pub replicate: u32,
    /// Column of the call VCFs to score; the first column when unset.
    #[serde(default)]
    pub call_sample: Option<String>,
    pub mode: RunMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Single {
        sample: String,
        direct_vcf: String,
        imputed_vcf: String,
    },
    Trio {
        child: String,
        mother: String,
        #[serde(default)]
        father: Option<String>,
        fetal_fraction: f64,
        imputed_vcf: String,
    },
}

impl EvalConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: EvalConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chromosomes.is_empty() {
            bail!("No chromosomes configured");
        }
        let mut seen = HashSet::new();
        for chrom in &self.chromosomes {
            if chrom.is_empty() || chrom == crate::aggregate::ALL_CHROMOSOMES {
                bail!("Invalid chromosome name '{}'", chrom);
            }
            if !seen.insert(chrom) {
                bail!("Chromosome '{}' listed twice", chrom);
            }
        }

        if !(self.min_maf > 0.0 && self.min_maf <= 0.5) {
            bail!("min_maf must be in (0, 0.5], got {}", self.min_maf);
        }
        check_template("truth_vcf", &self.truth_vcf)?;

        let mut labels = HashSet::new();
        let mut replicates = HashSet::new();
        for run in &self.runs {
            run.validate()?;
            if !labels.insert(run.label.as_str()) {
                bail!("Run label '{}' used twice", run.label);
            }
            // A repeated replicate would be counted twice in its condition mean.
            if !replicates.insert((run.condition(), run.sample_label(), run.replicate)) {
                bail!(
                    "Run '{}': replicate {} of {} at {} is already configured",
                    run.label,
                    run.replicate,
                    run.sample_label(),
                    run.condition()
                );
            }
        }
        Ok(())
    }

    pub fn truth_path(&self, chrom: &str) -> PathBuf {
        expand(&self.truth_vcf, chrom)
    }

    /// Samples any run needs from the truth panel; the index keeps only these.
    pub fn tracked_samples(&self) -> HashSet<String> {
        self.runs
            .iter()
            .flat_map(|run| run.samples())
            .map(str::to_string)
            .collect()
    }

    /// Directory holding a run's per-chromosome tables and reports.
    pub fn run_dir(&self, run: &RunConfig) -> PathBuf {
        self.output_dir.join(&run.label)
    }

    pub fn table_path(&self, run: &RunConfig, chrom: &str) -> PathBuf {
        self.run_dir(run).join(format!("{}_summary.csv", chrom))
    }
}

impl RunConfig {
    fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            bail!("Run with empty label");
        }
        if self.replicate == 0 {
            bail!("Run '{}': replicate numbers start at 1", self.label);
        }
        if !(self.coverage > 0.0) {
            bail!("Run '{}': coverage must be positive, got {}", self.label, self.coverage);
        }
        match &self.mode {
            RunMode::Single {
                sample,
                direct_vcf,
                imputed_vcf,
            } => {
                if sample.is_empty() {
                    bail!("Run '{}': empty sample name", self.label);
                }
                check_template("direct_vcf", direct_vcf)?;
                check_template("imputed_vcf", imputed_vcf)?;
            }
            RunMode::Trio {
                child,
                mother,
                fetal_fraction,
                imputed_vcf,
                ..
            } => {
                if child.is_empty() || mother.is_empty() {
                    bail!("Run '{}': empty sample name", self.label);
                }
                if child == mother {
                    bail!("Run '{}': child and mother are both '{}'", self.label, child);
                }
                if !(*fetal_fraction > 0.0 && *fetal_fraction < 1.0) {
                    bail!(
                        "Run '{}': fetal_fraction must be in (0, 1), got {}",
                        self.label,
                        fetal_fraction
                    );
                }
                check_template("imputed_vcf", imputed_vcf)?;
            }
        }
        Ok(())
    }

    /// Truth samples this run is scored against.
    pub fn samples(&self) -> Vec<&str> {
        match &self.mode {
            RunMode::Single { sample, .. } => vec![sample.as_str()],
            RunMode::Trio { child, mother, .. } => vec![child.as_str(), mother.as_str()],
        }
    }

    /// Sample description used in logs and the exclusion report.
    pub fn sample_label(&self) -> String {
        match &self.mode {
            RunMode::Single { sample, .. } => sample.clone(),
            RunMode::Trio {
                child,
                mother,
                father,
                ..
            } => match father {
                Some(father) => format!("{}+{} (father {})", child, mother, father),
                None => format!("{}+{}", child, mother),
            },
        }
    }

    /// Runs sharing a condition are averaged together: mode, coverage and,
    /// for trios, fetal fraction.
    pub fn condition(&self) -> String {
        match &self.mode {
            RunMode::Single { .. } => format!("single_{}x", self.coverage),
            RunMode::Trio { fetal_fraction, .. } => {
                format!("trio_{}x_ff{:.2}", self.coverage, fetal_fraction)
            }
        }
    }
}

fn check_template(field: &str, template: &str) -> Result<()> {
    if !template.contains(CHROM_PLACEHOLDER) {
        bail!("{} '{}' must contain {}", field, template, CHROM_PLACEHOLDER);
    }
    Ok(())
}

/// Substitute the chromosome into a path template.
pub fn expand(template: &str, chrom: &str) -> PathBuf {
    PathBuf::from(template.replace(CHROM_PLACEHOLDER, chrom))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "chromosomes": ["chr1", "chr2"],
        "truth_vcf": "truth/{chrom}.vcf.gz",
        "census": "census.csv",
        "output_dir": "out",
        "runs": [
            {
                "label": "HG001_0.1x",
                "coverage": 0.1,
                "mode": {"single": {
                    "sample": "HG001",
                    "direct_vcf": "calls/HG001/{chrom}.vcf.gz",
                    "imputed_vcf": "imputed/HG001/{chrom}.vcf.gz"
                }}
            },
            {
                "label": "trio_a",
                "coverage": 0.1,
                "replicate": 2,
                "mode": {"trio": {
                    "child": "KID",
                    "mother": "MOM",
                    "fetal_fraction": 0.1,
                    "imputed_vcf": "nipt/{chrom}.vcf.gz"
                }}
            }
        ]
    }"#;

    fn parse(text: &str) -> EvalConfig {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_parse_and_defaults() {
        let config = parse(CONFIG);
        config.validate().unwrap();
        assert_eq!(config.min_maf, DEFAULT_MIN_MAF);
        assert_eq!(config.runs[0].replicate, 1);
        assert_eq!(config.truth_path("chr2"), PathBuf::from("truth/chr2.vcf.gz"));
        assert_eq!(config.runs[0].condition(), "single_0.1x");
        assert_eq!(config.runs[1].condition(), "trio_0.1x_ff0.10");
        assert_eq!(
            config.table_path(&config.runs[1], "chr1"),
            PathBuf::from("out/trio_a/chr1_summary.csv")
        );

        let tracked = config.tracked_samples();
        assert_eq!(tracked.len(), 3);
        assert!(tracked.contains("MOM"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = parse(CONFIG);
        config.min_maf = 0.6;
        assert!(config.validate().is_err());

        let mut config = parse(CONFIG);
        config.chromosomes.push("chr1".to_string());
        assert!(config.validate().is_err());

        let mut config = parse(CONFIG);
        config.truth_vcf = "truth.vcf.gz".to_string();
        assert!(config.validate().is_err());

        let mut config = parse(CONFIG);
        config.runs[1].label = config.runs[0].label.clone();
        assert!(config.validate().is_err());

        let mut config = parse(CONFIG);
        if let RunMode::Trio { mother, .. } = &mut config.runs[1].mode {
            *mother = "KID".to_string();
        }
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("child and mother"));

        let mut config = parse(CONFIG);
        config.runs[0].replicate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_repeated_replicate_is_rejected() {
        let mut config = parse(CONFIG);
        let mut again = config.runs[1].clone();
        again.label = "trio_b".to_string();
        config.runs.push(again.clone());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("replicate 2 of KID+MOM"));

        // Another replicate of the same condition is fine.
        config.runs.pop();
        again.replicate = 3;
        config.runs.push(again);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let text = CONFIG.replace("\"census\"", "\"censsu\"");
        assert!(serde_json::from_str::<EvalConfig>(&text).is_err());
    }
}
