/// Single-end read resolution
use super::{MIN_MATCH_LENGTH, ReadCounts, distinct_in_order, log_progress, unique_gene};
use crate::catalog::{Catalog, Taxonomies};
use crate::coverage::{CoverageStore, Span};
use crate::error::Error;
use crate::io::sam::{AlignmentReader, SamRecord};
use crate::stats::{MatchLengthDistribution, ResolverStats};
use log::{info, warn};
use rand::Rng;
use std::io::BufRead;

/// Counts single-end reads, one read group (consecutive records sharing a read id) at a time.
///
/// When a read aligns to the same transcript several times, one of those
/// alignments is picked at random with the injected generator, so results are
/// reproducible for a seeded generator.
pub struct SingleEndResolver<'a, G> {
    catalog: &'a Catalog,
    taxonomies: &'a Taxonomies,
    rng: G,
    store: CoverageStore,
    stats: ResolverStats,
    match_lengths: MatchLengthDistribution,
}

impl<'a, G: Rng> SingleEndResolver<'a, G> {
    pub fn new(
        catalog: &'a Catalog,
        taxonomies: &'a Taxonomies,
        max_match_length: usize,
        rng: G,
    ) -> Self {
        Self {
            catalog,
            taxonomies,
            rng,
            store: CoverageStore::new(catalog),
            stats: ResolverStats::new(),
            match_lengths: MatchLengthDistribution::new(max_match_length),
        }
    }

    /// Read every group from `reader`
    pub fn consume<R: BufRead>(&mut self, reader: &mut AlignmentReader<R>) -> Result<(), Error> {
        info!("Reading single-end alignments from {}", reader.path().display());
        while let Some(group) = reader.next_group(SamRecord::read_id)? {
            self.resolve_group(&group);
            log_progress(self.stats.reads_processed);
        }
        Ok(())
    }

    /// Count one read group
    pub fn resolve_group(&mut self, group: &[SamRecord]) {
        self.stats.reads_processed += 1;
        self.stats.rows_read += group.len() as u64;

        let mut hits: Vec<(usize, Span)> = Vec::with_capacity(group.len());
        for record in group {
            if !record.is_mapped() {
                continue;
            }
            self.stats.rows_mapped += 1;

            let length = record.match_length();
            if !self.match_lengths.record(length) {
                warn!(
                    "Match length {} of read {} exceeds the histogram ({}), record skipped",
                    length,
                    record.read_id(),
                    self.match_lengths.max_length()
                );
                self.stats.too_long_records += 1;
                continue;
            }
            if length < MIN_MATCH_LENGTH {
                continue;
            }

            let Some(transcript) = self.catalog.transcript_idx(&record.reference) else {
                continue;
            };
            if self.catalog.transcript(transcript).is_invalid {
                continue;
            }
            let Some(start) = record.start() else {
                continue;
            };
            hits.push((transcript, Span::new(start, length as usize)));
        }

        if hits.is_empty() {
            return;
        }
        if unique_gene(self.catalog, hits.iter().map(|&(t, _)| t)).is_none() {
            self.stats.multi_gene_reads += 1;
            return;
        }

        for transcript in distinct_in_order(hits.iter().map(|&(t, _)| t)) {
            let spans: Vec<Span> = hits
                .iter()
                .filter(|&&(t, _)| t == transcript)
                .map(|&(_, span)| span)
                .collect();
            let chosen = spans[self.rng.gen_range(0..spans.len())];
            self.store.increment(transcript, &[chosen]);
        }

        let taxonomy = &self.catalog.transcript(hits[0].0).taxonomy;
        self.stats.record_accepted(self.taxonomies.classify(taxonomy));
    }

    pub fn finish(self) -> ReadCounts {
        self.stats.print_summary();
        ReadCounts {
            store: self.store,
            stats: self.stats,
            match_lengths: self.match_lengths,
            fragment_lengths: None,
        }
    }
}
