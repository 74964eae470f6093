/// Read resolution statistics tracking and reporting
use crate::catalog::SampleSource;
use log::info;

/// Tracks read counting outcomes for one alignment pass
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ResolverStats {
    /// Alignment rows read (both mates for paired input)
    pub rows_read: u64,
    /// Rows with a reference assigned
    pub rows_mapped: u64,
    /// Read groups (single-end) or read pairs (paired-end) examined
    pub reads_processed: u64,
    /// Reads counted on a transcript
    pub reads_accepted: u64,
    /// Accepted reads attributed to the cancer sample
    pub cancer_reads: u64,
    /// Accepted reads attributed to the stromal sample
    pub stromal_reads: u64,
    /// Accepted reads on genes of neither configured taxonomy
    pub other_reads: u64,
    /// Reads dropped for hitting more than one gene
    pub multi_gene_reads: u64,
    /// Records skipped for exceeding the match-length histogram
    pub too_long_records: u64,
    /// Multi-locus pair candidates left for fragment-length resolution
    pub deferred_candidates: u64,
    /// Deferred candidates that found a qualifying locus combination
    pub rescued_candidates: u64,
}

impl ResolverStats {
    /// Create new statistics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted read
    pub fn record_accepted(&mut self, source: SampleSource) {
        self.reads_accepted += 1;
        match source {
            SampleSource::Cancer => self.cancer_reads += 1,
            SampleSource::Stromal => self.stromal_reads += 1,
            SampleSource::Other => self.other_reads += 1,
        }
    }

    /// Print summary statistics to log
    pub fn print_summary(&self) {
        if self.reads_processed == 0 {
            info!("No reads processed");
            return;
        }

        info!("=== Read Counting Summary ===");
        info!("Alignment rows: {}", self.rows_read);
        info!("Mapped rows: {}", self.rows_mapped);
        info!("Reads examined: {}", self.reads_processed);
        info!(
            "Reads mapped to unique genes: {} ({:.2}%)",
            self.reads_accepted,
            self.accepted_percent()
        );
        info!(
            "(cancer: {}, stroma: {})",
            self.cancer_reads, self.stromal_reads
        );
        if self.other_reads > 0 {
            info!("Reads on genes of other taxonomies: {}", self.other_reads);
        }
        if self.multi_gene_reads > 0 {
            info!("Reads hitting multiple genes: {}", self.multi_gene_reads);
        }
        if self.too_long_records > 0 {
            info!(
                "Records skipped for excessive match length: {}",
                self.too_long_records
            );
        }
        if self.deferred_candidates > 0 {
            info!(
                "Multi-locus pair candidates resolved by fragment length: {} of {}",
                self.rescued_candidates, self.deferred_candidates
            );
        }
    }

    /// Get percentage of accepted reads
    pub fn accepted_percent(&self) -> f64 {
        if self.reads_processed == 0 {
            0.0
        } else {
            100.0 * self.reads_accepted as f64 / self.reads_processed as f64
        }
    }
}

/// Histogram of alignment match lengths, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLengthDistribution {
    counts: Vec<u64>,
}

impl MatchLengthDistribution {
    /// Histogram accepting match lengths `0..=max_length`
    pub fn new(max_length: usize) -> Self {
        Self {
            counts: vec![0; max_length + 1],
        }
    }

    pub fn max_length(&self) -> usize {
        self.counts.len() - 1
    }

    /// Whether a match length fits in the histogram
    pub fn fits(&self, length: u32) -> bool {
        (length as usize) < self.counts.len()
    }

    /// Tally one alignment; returns `false` when the length does not fit
    pub fn record(&mut self, length: u32) -> bool {
        match self.counts.get_mut(length as usize) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}
