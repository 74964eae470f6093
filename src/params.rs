use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Directional mode
// ---------------------------------------------------------------------------

/// `--directionalMode` values for paired-end libraries.
///
/// Bit 16 of the SAM flag marks a reverse-strand alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionalMode {
    /// 0: any orientation accepted from either mate
    #[default]
    Unrestricted,
    /// 1: mate 1 forward, mate 2 reverse
    ForwardReverse,
    /// 2: mate 1 reverse, mate 2 forward
    ReverseForward,
}

impl DirectionalMode {
    /// Whether a mate-1 record with the given strand passes the filter.
    pub fn accepts_mate1(self, is_reverse: bool) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::ForwardReverse => !is_reverse,
            Self::ReverseForward => is_reverse,
        }
    }

    /// Whether a mate-2 record with the given strand passes the filter.
    pub fn accepts_mate2(self, is_reverse: bool) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::ForwardReverse => is_reverse,
            Self::ReverseForward => !is_reverse,
        }
    }
}

impl std::str::FromStr for DirectionalMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::Unrestricted),
            "1" => Ok(Self::ForwardReverse),
            "2" => Ok(Self::ReverseForward),
            _ => Err(format!(
                "unknown directionalMode '{s}'; expected 0, 1 or 2"
            )),
        }
    }
}

impl std::fmt::Display for DirectionalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrestricted => write!(f, "0"),
            Self::ForwardReverse => write!(f, "1"),
            Self::ReverseForward => write!(f, "2"),
        }
    }
}

// ---------------------------------------------------------------------------
// Expression mode
// ---------------------------------------------------------------------------

/// Built-in bias correction applied before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpressionMode {
    #[default]
    RawCount,
    PerKilobase,
}

impl std::str::FromStr for ExpressionMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RawCount" => Ok(Self::RawCount),
            "PerKilobase" => Ok(Self::PerKilobase),
            _ => Err(format!(
                "unknown expressionMode '{s}'; expected 'RawCount' or 'PerKilobase'"
            )),
        }
    }
}

impl std::fmt::Display for ExpressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RawCount => write!(f, "RawCount"),
            Self::PerKilobase => write!(f, "PerKilobase"),
        }
    }
}

// ---------------------------------------------------------------------------
// Read input
// ---------------------------------------------------------------------------

/// Which alignment input the run consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadInput {
    Single(PathBuf),
    Paired { mate1: PathBuf, mate2: PathBuf },
}

/// `<prefix>_1.sam` / `<prefix>_2.sam`
pub fn paired_sam_paths(prefix: &Path) -> (PathBuf, PathBuf) {
    let base = prefix.as_os_str().to_string_lossy();
    (
        PathBuf::from(format!("{base}_1.sam")),
        PathBuf::from(format!("{base}_2.sam")),
    )
}

// ---------------------------------------------------------------------------
// Parameters struct
// ---------------------------------------------------------------------------

/// interactome command-line parameters.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "interactome",
    about = "Ligand-receptor interaction analysis of cancer/stromal RNA-seq",
    version
)]
pub struct Parameters {
    // ── Catalog ─────────────────────────────────────────────────────────
    /// Transcript catalog (transcript_id, gene_id, taxonomy, length[, invalid])
    #[arg(long = "catalogTranscripts")]
    pub catalog_transcripts: PathBuf,

    /// Interaction catalog (ligand/receptor symbols and gene sets)
    #[arg(long = "catalogInteractions")]
    pub catalog_interactions: PathBuf,

    // ── Read files ──────────────────────────────────────────────────────
    /// Single-end alignment file (SAM, optionally gzipped)
    #[arg(long = "readsSingle")]
    pub reads_single: Option<PathBuf>,

    /// Paired-end alignment prefix; reads <prefix>_1.sam and <prefix>_2.sam
    #[arg(long = "readsPairedPrefix")]
    pub reads_paired_prefix: Option<PathBuf>,

    /// Strand filter for paired-end mates: 0, 1 or 2
    #[arg(long = "directionalMode", default_value = "0")]
    pub directional_mode: DirectionalMode,

    /// Width of the match-length histogram; longer alignments are skipped
    #[arg(long = "maxMatchLength", default_value_t = 10000)]
    pub max_match_length: usize,

    /// Seed for the multi-mapping tie-break; entropy-seeded when absent
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    // ── Samples ─────────────────────────────────────────────────────────
    /// Taxonomy tag of the cancer sample
    #[arg(long = "cancerTaxonomy", default_value = "9606")]
    pub cancer_taxonomy: String,

    /// Taxonomy tag of the stromal sample
    #[arg(long = "stromalTaxonomy", default_value = "10090")]
    pub stromal_taxonomy: String,

    /// Bias correction applied to raw counts: RawCount or PerKilobase
    #[arg(long = "expressionMode", default_value = "RawCount")]
    pub expression_mode: ExpressionMode,

    // ── Output ──────────────────────────────────────────────────────────
    /// Output directory
    #[arg(long = "outputDir", default_value = "./")]
    pub output_dir: PathBuf,

    /// Dump paired reads of cancer genes to cancer_1/2.fastq
    #[arg(long = "outputCancerFastq", default_value_t = false)]
    pub output_cancer_fastq: bool,

    /// Dump paired reads of stromal genes to stroma_1/2.fastq
    #[arg(long = "outputStromalFastq", default_value_t = false)]
    pub output_stromal_fastq: bool,
}

impl Parameters {
    /// Resolve the alignment input from `--readsSingle` / `--readsPairedPrefix`.
    pub fn read_input(&self) -> Result<ReadInput, Error> {
        match (&self.reads_single, &self.reads_paired_prefix) {
            (Some(path), None) => Ok(ReadInput::Single(path.clone())),
            (None, Some(prefix)) => {
                let (mate1, mate2) = paired_sam_paths(prefix);
                Ok(ReadInput::Paired { mate1, mate2 })
            }
            (Some(_), Some(_)) => Err(Error::Parameter(
                "--readsSingle and --readsPairedPrefix are mutually exclusive".into(),
            )),
            (None, None) => Err(Error::Parameter(
                "one of --readsSingle or --readsPairedPrefix is required".into(),
            )),
        }
    }

    /// Validate parameter combinations that clap alone cannot enforce.
    pub fn validate(&self) -> Result<(), Error> {
        let input = self.read_input()?;

        if self.max_match_length == 0 {
            return Err(Error::Parameter("--maxMatchLength must be >= 1".into()));
        }

        if self.cancer_taxonomy == self.stromal_taxonomy {
            return Err(Error::Parameter(
                "--cancerTaxonomy and --stromalTaxonomy must differ".into(),
            ));
        }

        // FASTQ dumps are produced by the paired-end pass only
        if matches!(input, ReadInput::Single(_))
            && (self.output_cancer_fastq || self.output_stromal_fastq)
        {
            log::warn!("FASTQ output is only written for paired-end input; ignoring");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: parse a command line (without program name).
    fn parse(args: &[&str]) -> Parameters {
        let mut full = vec![
            "interactome",
            "--catalogTranscripts",
            "transcripts.tsv",
            "--catalogInteractions",
            "interactions.tsv",
        ];
        full.extend_from_slice(args);
        Parameters::parse_from(full)
    }

    #[test]
    fn defaults() {
        let p = parse(&["--readsSingle", "reads.sam"]);
        assert_eq!(p.catalog_transcripts, PathBuf::from("transcripts.tsv"));
        assert_eq!(p.catalog_interactions, PathBuf::from("interactions.tsv"));
        assert_eq!(p.directional_mode, DirectionalMode::Unrestricted);
        assert_eq!(p.max_match_length, 10000);
        assert_eq!(p.seed, None);
        assert_eq!(p.cancer_taxonomy, "9606");
        assert_eq!(p.stromal_taxonomy, "10090");
        assert_eq!(p.expression_mode, ExpressionMode::RawCount);
        assert_eq!(p.output_dir, PathBuf::from("./"));
        assert!(!p.output_cancer_fastq);
        assert!(!p.output_stromal_fastq);
        assert_eq!(
            p.read_input().unwrap(),
            ReadInput::Single(PathBuf::from("reads.sam"))
        );
    }

    #[test]
    fn paired_prefix_expands_to_mate_files() {
        let p = parse(&[
            "--readsPairedPrefix",
            "/data/run7",
            "--directionalMode",
            "2",
            "--outputCancerFastq",
            "--seed",
            "42",
        ]);
        assert_eq!(p.directional_mode, DirectionalMode::ReverseForward);
        assert!(p.output_cancer_fastq);
        assert_eq!(p.seed, Some(42));
        assert_eq!(
            p.read_input().unwrap(),
            ReadInput::Paired {
                mate1: PathBuf::from("/data/run7_1.sam"),
                mate2: PathBuf::from("/data/run7_2.sam"),
            }
        );
    }

    #[test]
    fn directional_filters() {
        let m = DirectionalMode::Unrestricted;
        assert!(m.accepts_mate1(true) && m.accepts_mate1(false));
        assert!(m.accepts_mate2(true) && m.accepts_mate2(false));

        let m = DirectionalMode::ForwardReverse;
        assert!(m.accepts_mate1(false));
        assert!(!m.accepts_mate1(true));
        assert!(m.accepts_mate2(true));
        assert!(!m.accepts_mate2(false));

        let m = DirectionalMode::ReverseForward;
        assert!(m.accepts_mate1(true));
        assert!(!m.accepts_mate1(false));
        assert!(m.accepts_mate2(false));
        assert!(!m.accepts_mate2(true));
    }

    #[test]
    fn expression_mode_parsing() {
        let p = parse(&["--readsSingle", "r.sam", "--expressionMode", "PerKilobase"]);
        assert_eq!(p.expression_mode, ExpressionMode::PerKilobase);
        assert!("Tpm".parse::<ExpressionMode>().is_err());
        assert!("3".parse::<DirectionalMode>().is_err());
    }

    #[test]
    fn validate_needs_reads() {
        let p = parse(&[]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("--readsSingle"));
    }

    #[test]
    fn validate_rejects_both_inputs() {
        let p = parse(&["--readsSingle", "r.sam", "--readsPairedPrefix", "r"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn validate_rejects_same_taxonomy() {
        let p = parse(&[
            "--readsSingle",
            "r.sam",
            "--cancerTaxonomy",
            "9606",
            "--stromalTaxonomy",
            "9606",
        ]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_histogram() {
        let p = parse(&["--readsSingle", "r.sam", "--maxMatchLength", "0"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("maxMatchLength"));
    }
}
