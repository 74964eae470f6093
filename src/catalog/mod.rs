/// Reference catalog of transcripts, genes and ligand-receptor interactions
///
/// The catalog is read-only once built and is passed by reference into every
/// pipeline stage. Transcripts and genes are addressed by dense indices; the
/// string ids are only used at the input boundaries.
mod tsv;

pub use tsv::{InteractionRecord, TranscriptRecord};

use crate::error::Error;
use std::collections::HashMap;
use std::path::Path;

/// Which of the two co-mingled samples a taxonomy tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleSource {
    Cancer,
    Stromal,
    Other,
}

/// Taxonomy tags identifying the cancer and stromal samples of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomies {
    pub cancer: String,
    pub stromal: String,
}

impl Taxonomies {
    pub fn new(cancer: impl Into<String>, stromal: impl Into<String>) -> Self {
        Self {
            cancer: cancer.into(),
            stromal: stromal.into(),
        }
    }

    pub fn classify(&self, taxonomy: &str) -> SampleSource {
        if taxonomy == self.cancer {
            SampleSource::Cancer
        } else if taxonomy == self.stromal {
            SampleSource::Stromal
        } else {
            SampleSource::Other
        }
    }
}

/// A reference transcript (RefSeq)
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    /// Index of the owning gene
    pub gene: usize,
    pub length: usize,
    pub taxonomy: String,
    pub is_invalid: bool,
}

/// A gene and its transcript variants, in catalog order
#[derive(Debug, Clone)]
pub struct Gene {
    pub entrez_id: String,
    pub taxonomy: String,
    pub variants: Vec<usize>,
}

/// One ligand-receptor edge of the interaction graph.
///
/// The four role sets hold gene indices.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub ligand_symbol: String,
    pub receptor_symbol: String,
    pub ligand_cancer: Vec<usize>,
    pub ligand_stromal: Vec<usize>,
    pub receptor_cancer: Vec<usize>,
    pub receptor_stromal: Vec<usize>,
    pub valid_cancer_to_stroma: bool,
    pub valid_stroma_to_cancer: bool,
}

/// Transcript/gene/interaction lookup structure
#[derive(Debug, Default)]
pub struct Catalog {
    transcripts: Vec<Transcript>,
    genes: Vec<Gene>,
    interactions: Vec<Interaction>,
    transcript_index: HashMap<String, usize>,
    gene_index: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalog from the transcript and interaction tables
    pub fn from_tsv(transcripts_path: &Path, interactions_path: &Path) -> Result<Self, Error> {
        log::info!("Loading transcript catalog from: {}", transcripts_path.display());
        let transcripts = tsv::parse_transcripts(transcripts_path)?;

        let mut catalog = Self::new();
        for record in transcripts {
            catalog.add_transcript(record)?;
        }
        log::info!(
            "Loaded {} transcripts of {} genes ({} invalid)",
            catalog.transcripts.len(),
            catalog.genes.len(),
            catalog.transcripts.iter().filter(|t| t.is_invalid).count()
        );

        log::info!(
            "Loading interaction catalog from: {}",
            interactions_path.display()
        );
        let interactions = tsv::parse_interactions(interactions_path)?;
        for record in interactions {
            catalog.add_interaction(record);
        }
        log::info!("Loaded {} interactions", catalog.interactions.len());

        Ok(catalog)
    }

    /// Register a transcript, creating its gene on first sight
    pub fn add_transcript(&mut self, record: TranscriptRecord) -> Result<usize, Error> {
        if self.transcript_index.contains_key(&record.transcript_id) {
            return Err(Error::Catalog(format!(
                "duplicate transcript id '{}'",
                record.transcript_id
            )));
        }

        let transcript_idx = self.transcripts.len();
        let gene_idx = match self.gene_index.get(&record.gene_id) {
            Some(&idx) => {
                let gene = &self.genes[idx];
                if gene.taxonomy != record.taxonomy {
                    return Err(Error::Catalog(format!(
                        "transcript '{}' has taxonomy {} but gene {} has {}",
                        record.transcript_id, record.taxonomy, gene.entrez_id, gene.taxonomy
                    )));
                }
                idx
            }
            None => {
                let idx = self.genes.len();
                self.genes.push(Gene {
                    entrez_id: record.gene_id.clone(),
                    taxonomy: record.taxonomy.clone(),
                    variants: Vec::new(),
                });
                self.gene_index.insert(record.gene_id.clone(), idx);
                idx
            }
        };

        self.genes[gene_idx].variants.push(transcript_idx);
        self.transcript_index
            .insert(record.transcript_id.clone(), transcript_idx);
        self.transcripts.push(Transcript {
            id: record.transcript_id,
            gene: gene_idx,
            length: record.length,
            taxonomy: record.taxonomy,
            is_invalid: record.is_invalid,
        });

        Ok(transcript_idx)
    }

    /// Register an interaction; gene ids missing from the catalog are dropped
    pub fn add_interaction(&mut self, record: InteractionRecord) -> usize {
        let ligand_cancer = self.resolve_genes(&record.ligand_cancer, &record);
        let ligand_stromal = self.resolve_genes(&record.ligand_stromal, &record);
        let receptor_cancer = self.resolve_genes(&record.receptor_cancer, &record);
        let receptor_stromal = self.resolve_genes(&record.receptor_stromal, &record);

        self.interactions.push(Interaction {
            ligand_symbol: record.ligand_symbol,
            receptor_symbol: record.receptor_symbol,
            ligand_cancer,
            ligand_stromal,
            receptor_cancer,
            receptor_stromal,
            valid_cancer_to_stroma: record.valid_cancer_to_stroma,
            valid_stroma_to_cancer: record.valid_stroma_to_cancer,
        });
        self.interactions.len() - 1
    }

    fn resolve_genes(&self, ids: &[String], record: &InteractionRecord) -> Vec<usize> {
        ids.iter()
            .filter_map(|id| {
                let idx = self.gene_index.get(id).copied();
                if idx.is_none() {
                    log::warn!(
                        "Interaction {}-{} references unknown gene {}",
                        record.ligand_symbol,
                        record.receptor_symbol,
                        id
                    );
                }
                idx
            })
            .collect()
    }

    /// Look up a transcript index by reference name
    pub fn transcript_idx(&self, transcript_id: &str) -> Option<usize> {
        self.transcript_index.get(transcript_id).copied()
    }

    /// Look up a gene index by Entrez id
    pub fn gene_idx(&self, entrez_id: &str) -> Option<usize> {
        self.gene_index.get(entrez_id).copied()
    }

    pub fn transcript(&self, idx: usize) -> &Transcript {
        &self.transcripts[idx]
    }

    pub fn gene(&self, idx: usize) -> &Gene {
        &self.genes[idx]
    }

    pub fn transcripts(&self) -> &[Transcript] {
        &self.transcripts
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Indices of the genes belonging to one sample, in catalog order
    pub fn genes_of(&self, source: SampleSource, taxonomies: &Taxonomies) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter(|(_, gene)| taxonomies.classify(&gene.taxonomy) == source)
            .map(|(idx, _)| idx)
            .collect()
    }
}
