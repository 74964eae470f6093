/// Read resolution: turning alignment records into per-transcript counts
///
/// Both resolvers enforce the unique-gene rule: a read is only counted when
/// every surviving alignment lands on transcripts of one gene. Within that gene
/// each touched transcript receives at most one increment per read.
pub mod fragment;
pub mod paired;
pub mod single;

pub use fragment::{FragmentLengthHistogram, FragmentLengthStats};
pub use paired::PairedEndResolver;
pub use single::SingleEndResolver;

use crate::catalog::Catalog;
use crate::coverage::CoverageStore;
use crate::stats::{MatchLengthDistribution, ResolverStats};

/// Single-end alignments shorter than this are not counted
pub const MIN_MATCH_LENGTH: u32 = 50;

/// Progress is logged every this many reads
const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Result of one alignment pass
#[derive(Debug, Clone)]
pub struct ReadCounts {
    pub store: CoverageStore,
    pub stats: ResolverStats,
    pub match_lengths: MatchLengthDistribution,
    /// Only collected for paired-end input
    pub fragment_lengths: Option<FragmentLengthHistogram>,
}

/// The gene shared by all transcripts, or `None` when they span several genes
/// (or the iterator is empty)
pub(crate) fn unique_gene(
    catalog: &Catalog,
    mut transcripts: impl Iterator<Item = usize>,
) -> Option<usize> {
    let gene = catalog.transcript(transcripts.next()?).gene;
    transcripts
        .all(|t| catalog.transcript(t).gene == gene)
        .then_some(gene)
}

/// Distinct values in first-seen order
pub(crate) fn distinct_in_order(values: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

fn log_progress(reads: u64) {
    if reads % PROGRESS_INTERVAL == 0 {
        log::info!("processed {} reads", reads);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::catalog::{Catalog, InteractionRecord, TranscriptRecord};

    /// NM_1, NM_2 on cancer gene 100; NM_3 on cancer gene 200;
    /// NM_4 on stromal gene 300; NM_5 invalid on gene 100.
    pub(crate) fn small_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (id, gene, tax, length, invalid) in [
            ("NM_1", "100", "9606", 1000, false),
            ("NM_2", "100", "9606", 1200, false),
            ("NM_3", "200", "9606", 800, false),
            ("NM_4", "300", "10090", 900, false),
            ("NM_5", "100", "9606", 700, true),
        ] {
            catalog
                .add_transcript(TranscriptRecord {
                    transcript_id: id.to_string(),
                    gene_id: gene.to_string(),
                    taxonomy: tax.to_string(),
                    length,
                    is_invalid: invalid,
                })
                .unwrap();
        }
        catalog.add_interaction(InteractionRecord {
            ligand_symbol: "L".to_string(),
            receptor_symbol: "R".to_string(),
            ligand_cancer: vec!["100".to_string()],
            ligand_stromal: vec![],
            receptor_cancer: vec![],
            receptor_stromal: vec!["300".to_string()],
            valid_cancer_to_stroma: true,
            valid_stroma_to_cancer: false,
        });
        catalog
    }

    /// An 11-column SAM line
    pub(crate) fn sam_line(id: &str, flag: u16, reference: &str, pos: u64, cigar: &str) -> String {
        format!("{id}\t{flag}\t{reference}\t{pos}\t255\t{cigar}\t*\t0\t0\tACGTACGT\tIIIIIIII")
    }
}
