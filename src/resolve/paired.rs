/// Paired-end read resolution
///
/// The two mate files are read in lockstep, one read pair (all records whose
/// id matches once the `#` suffix is stripped) at a time from each. Pairs that
/// place exactly one locus per mate on a transcript are counted right away and
/// feed the fragment-length histogram; pairs with repeated loci are deferred
/// until the histogram is complete.
use super::fragment::{FragmentLengthHistogram, FragmentLengthStats};
use super::{ReadCounts, distinct_in_order, log_progress, unique_gene};
use crate::catalog::{Catalog, SampleSource, Taxonomies};
use crate::coverage::{CoverageStore, Span};
use crate::error::Error;
use crate::io::fastq::PairedFastqWriter;
use crate::io::sam::{AlignmentReader, SamRecord};
use crate::params::DirectionalMode;
use crate::stats::{MatchLengthDistribution, ResolverStats};
use log::{info, warn};
use std::io::BufRead;

/// Where one mate lands on a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locus {
    /// 0-based start
    pub start: usize,
    pub reverse: bool,
    pub length: usize,
}

impl Locus {
    fn span(&self) -> Span {
        Span::new(self.start, self.length)
    }
}

/// All loci of one read pair on one transcript, in first-appearance order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCandidate {
    pub transcript: usize,
    pub mate1: Vec<Locus>,
    pub mate2: Vec<Locus>,
}

impl PairCandidate {
    /// The only locus combination, when each mate has exactly one locus and
    /// the two lie on opposite strands
    pub fn unambiguous(&self) -> Option<(Locus, Locus)> {
        match (self.mate1.as_slice(), self.mate2.as_slice()) {
            ([a], [b]) if a.reverse != b.reverse => Some((*a, *b)),
            _ => None,
        }
    }

    /// Opposite-strand combination whose start-to-start interval is closest to
    /// the mean fragment length, within the accepted spread. First wins ties.
    pub fn closest_combination(&self, fragments: &FragmentLengthStats) -> Option<(Locus, Locus)> {
        let mut best: Option<(f64, Locus, Locus)> = None;
        for a in &self.mate1 {
            for b in &self.mate2 {
                if a.reverse == b.reverse {
                    continue;
                }
                let Some(deviation) = fragments.deviation(a.start.abs_diff(b.start)) else {
                    continue;
                };
                if best.map_or(true, |(d, _, _)| deviation < d) {
                    best = Some((deviation, *a, *b));
                }
            }
        }
        best.map(|(_, a, b)| (a, b))
    }
}

/// Surviving alignment of one mate
#[derive(Debug, Clone, Copy)]
struct MateHit {
    transcript: usize,
    locus: Locus,
    /// Index into the mate's record group
    record: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mate {
    First,
    Second,
}

/// Counts paired-end reads
pub struct PairedEndResolver<'a> {
    catalog: &'a Catalog,
    taxonomies: &'a Taxonomies,
    mode: DirectionalMode,
    store: CoverageStore,
    stats: ResolverStats,
    match_lengths: MatchLengthDistribution,
    fragments: FragmentLengthHistogram,
    deferred: Vec<PairCandidate>,
    cancer_dump: Option<PairedFastqWriter>,
    stromal_dump: Option<PairedFastqWriter>,
}

impl<'a> PairedEndResolver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        taxonomies: &'a Taxonomies,
        mode: DirectionalMode,
        max_match_length: usize,
    ) -> Self {
        Self {
            catalog,
            taxonomies,
            mode,
            store: CoverageStore::new(catalog),
            stats: ResolverStats::new(),
            match_lengths: MatchLengthDistribution::new(max_match_length),
            fragments: FragmentLengthHistogram::new(),
            deferred: Vec::new(),
            cancer_dump: None,
            stromal_dump: None,
        }
    }

    /// Dump accepted pairs of each sample source as FASTQ
    pub fn with_fastq_dumps(
        mut self,
        cancer: Option<PairedFastqWriter>,
        stromal: Option<PairedFastqWriter>,
    ) -> Self {
        self.cancer_dump = cancer;
        self.stromal_dump = stromal;
        self
    }

    /// Read both mate streams until either one ends
    pub fn consume<R1: BufRead, R2: BufRead>(
        &mut self,
        mate1: &mut AlignmentReader<R1>,
        mate2: &mut AlignmentReader<R2>,
    ) -> Result<(), Error> {
        info!(
            "Reading paired-end alignments from {} and {}",
            mate1.path().display(),
            mate2.path().display()
        );

        loop {
            let group1 = mate1.next_group(SamRecord::pair_name)?;
            let group2 = mate2.next_group(SamRecord::pair_name)?;
            match (group1, group2) {
                (Some(group1), Some(group2)) => {
                    if group1[0].pair_name() != group2[0].pair_name() {
                        return Err(Error::Desynchronized {
                            mate1: group1[0].pair_name().to_string(),
                            mate2: group2[0].pair_name().to_string(),
                        });
                    }
                    self.resolve_pair(&group1, &group2)?;
                    log_progress(self.stats.reads_processed);
                }
                (None, None) => break,
                (Some(group), None) => {
                    warn!(
                        "{} ended before {}; read {} and later ones ignored",
                        mate2.path().display(),
                        mate1.path().display(),
                        group[0].pair_name()
                    );
                    break;
                }
                (None, Some(group)) => {
                    warn!(
                        "{} ended before {}; read {} and later ones ignored",
                        mate1.path().display(),
                        mate2.path().display(),
                        group[0].pair_name()
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    /// Count one read pair; multi-locus candidates are kept for [`Self::finish`]
    pub fn resolve_pair(&mut self, mate1: &[SamRecord], mate2: &[SamRecord]) -> Result<(), Error> {
        self.stats.reads_processed += 1;
        for records in [mate1, mate2] {
            self.stats.rows_read += records.len() as u64;
            self.stats.rows_mapped += records.iter().filter(|r| r.is_mapped()).count() as u64;
        }

        let hits1 = self.surviving_hits(mate1, Mate::First);
        let hits2 = self.surviving_hits(mate2, Mate::Second);

        for hits in [&hits1, &hits2] {
            if let Some(first) = hits.first() {
                self.match_lengths.record(first.locus.length as u32);
            }
        }
        if hits1.is_empty() || hits2.is_empty() {
            return Ok(());
        }

        let gene1 = unique_gene(self.catalog, hits1.iter().map(|h| h.transcript));
        let gene2 = unique_gene(self.catalog, hits2.iter().map(|h| h.transcript));
        let gene = match (gene1, gene2) {
            (Some(a), Some(b)) if a == b => a,
            _ => {
                self.stats.multi_gene_reads += 1;
                return Ok(());
            }
        };
        let source = self.taxonomies.classify(&self.catalog.gene(gene).taxonomy);

        let dump = match source {
            SampleSource::Cancer => self.cancer_dump.as_mut(),
            SampleSource::Stromal => self.stromal_dump.as_mut(),
            SampleSource::Other => None,
        };
        if let Some(writer) = dump {
            writer.write_pair(&mate1[hits1[0].record], &mate2[hits2[0].record])?;
        }

        let touched = distinct_in_order(hits1.iter().chain(&hits2).map(|h| h.transcript));
        let mut counted = false;
        for transcript in touched {
            let candidate = PairCandidate {
                transcript,
                mate1: loci_on(&hits1, transcript),
                mate2: loci_on(&hits2, transcript),
            };

            if let Some((a, b)) = candidate.unambiguous() {
                self.store.increment(transcript, &[a.span(), b.span()]);
                self.fragments.record(a.start.abs_diff(b.start));
                counted = true;
            } else if !candidate.mate1.is_empty() && !candidate.mate2.is_empty() {
                self.stats.deferred_candidates += 1;
                self.deferred.push(candidate);
            }
        }

        if counted {
            self.stats.record_accepted(source);
        }
        Ok(())
    }

    /// Records of one mate passing the strand and validity filters
    fn surviving_hits(&mut self, records: &[SamRecord], mate: Mate) -> Vec<MateHit> {
        let mut hits = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let reverse = record.is_reverse();
            let accepted = match mate {
                Mate::First => self.mode.accepts_mate1(reverse),
                Mate::Second => self.mode.accepts_mate2(reverse),
            };
            if !accepted || record.span.is_none() {
                continue;
            }

            let Some(transcript) = self.catalog.transcript_idx(&record.reference) else {
                continue;
            };
            if self.catalog.transcript(transcript).is_invalid {
                continue;
            }

            let length = record.match_length();
            if !self.match_lengths.fits(length) {
                warn!(
                    "Match length {} of read {} exceeds the histogram ({}), record skipped",
                    length,
                    record.read_id(),
                    self.match_lengths.max_length()
                );
                self.stats.too_long_records += 1;
                continue;
            }
            let Some(start) = record.start() else {
                continue;
            };

            hits.push(MateHit {
                transcript,
                locus: Locus {
                    start,
                    reverse,
                    length: length as usize,
                },
                record: idx,
            });
        }
        hits
    }

    /// Resolve deferred candidates against the fragment-length distribution
    /// and close the FASTQ dumps
    pub fn finish(mut self) -> Result<ReadCounts, Error> {
        let deferred = std::mem::take(&mut self.deferred);
        match self.fragments.stats() {
            Some(fragments) => {
                for candidate in &deferred {
                    let Some((a, b)) = candidate.closest_combination(&fragments) else {
                        continue;
                    };
                    self.store
                        .increment(candidate.transcript, &[a.span(), b.span()]);
                    self.stats.rescued_candidates += 1;
                    let taxonomy = &self.catalog.transcript(candidate.transcript).taxonomy;
                    self.stats.record_accepted(self.taxonomies.classify(taxonomy));
                }
            }
            None if !deferred.is_empty() => {
                warn!(
                    "No unambiguous read pairs; {} multi-locus candidates left uncounted",
                    deferred.len()
                );
            }
            None => {}
        }

        if let Some(writer) = self.cancer_dump.take() {
            writer.finish()?;
        }
        if let Some(writer) = self.stromal_dump.take() {
            writer.finish()?;
        }

        self.stats.print_summary();
        Ok(ReadCounts {
            store: self.store,
            stats: self.stats,
            match_lengths: self.match_lengths,
            fragment_lengths: Some(self.fragments),
        })
    }
}

fn loci_on(hits: &[MateHit], transcript: usize) -> Vec<Locus> {
    hits.iter()
        .filter(|h| h.transcript == transcript)
        .map(|h| h.locus)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::test_support::{sam_line, small_catalog};
    use std::fs;
    use tempfile::TempDir;

    fn taxonomies() -> Taxonomies {
        Taxonomies::new("9606", "10090")
    }

    fn run(
        catalog: &Catalog,
        mode: DirectionalMode,
        mate1: &[String],
        mate2: &[String],
    ) -> Result<ReadCounts, Error> {
        let tax = taxonomies();
        let mut resolver = PairedEndResolver::new(catalog, &tax, mode, 10_000);
        let text1 = mate1.join("\n");
        let text2 = mate2.join("\n");
        let mut reader1 = AlignmentReader::new(text1.as_bytes(), "reads_1.sam");
        let mut reader2 = AlignmentReader::new(text2.as_bytes(), "reads_2.sam");
        resolver.consume(&mut reader1, &mut reader2)?;
        resolver.finish()
    }

    fn locus(start: usize, reverse: bool) -> Locus {
        Locus {
            start,
            reverse,
            length: 50,
        }
    }

    #[test]
    fn test_unambiguous_pair() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[sam_line("p1#0/1", 0, "NM_1", 101, "50M")],
            &[sam_line("p1#0/2", 16, "NM_1", 251, "50M")],
        )
        .unwrap();

        let input = counts.store.get(0);
        assert_eq!(input.raw_count, 1);
        assert_eq!(input.start_histogram[100], 1);
        assert_eq!(input.start_histogram[250], 1);
        assert_eq!(input.overlap_histogram[149], 1);
        assert_eq!(input.overlap_histogram[150], 0);
        assert_eq!(input.overlap_histogram[299], 1);
        let fragments = counts.fragment_lengths.unwrap();
        assert_eq!(fragments.counts()[150], 1);
        assert_eq!(fragments.total(), 1);
        assert_eq!(counts.stats.cancer_reads, 1);
        assert_eq!(counts.match_lengths.total(), 2);
    }

    #[test]
    fn test_same_strand_pair_not_counted() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[sam_line("p1", 0, "NM_1", 101, "50M")],
            &[sam_line("p1", 0, "NM_1", 251, "50M")],
        )
        .unwrap();
        assert_eq!(counts.store.total_count(), 0);
        // deferred, then no fragment statistics to resolve it
        assert_eq!(counts.stats.deferred_candidates, 1);
        assert_eq!(counts.stats.rescued_candidates, 0);
    }

    #[test]
    fn test_directional_modes() {
        let catalog = small_catalog();
        let mate1 = [sam_line("p1", 0, "NM_1", 101, "50M")];
        let mate2 = [sam_line("p1", 16, "NM_1", 251, "50M")];

        let counts = run(&catalog, DirectionalMode::ForwardReverse, &mate1, &mate2).unwrap();
        assert_eq!(counts.store.get(0).raw_count, 1);

        let counts = run(&catalog, DirectionalMode::ReverseForward, &mate1, &mate2).unwrap();
        assert_eq!(counts.store.get(0).raw_count, 0);
        assert_eq!(counts.stats.reads_accepted, 0);
    }

    #[test]
    fn test_genes_must_agree() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[sam_line("p1", 0, "NM_1", 101, "50M")],
            &[sam_line("p1", 16, "NM_3", 251, "50M")],
        )
        .unwrap();
        assert_eq!(counts.store.total_count(), 0);
        assert_eq!(counts.stats.multi_gene_reads, 1);
    }

    #[test]
    fn test_empty_mate_drops_pair() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[sam_line("p1", 0, "NM_1", 101, "50M")],
            &[sam_line("p1", 4, "*", 0, "*")],
        )
        .unwrap();
        assert_eq!(counts.store.total_count(), 0);
        // mate 1 survivor is still tallied
        assert_eq!(counts.match_lengths.counts()[50], 1);
        assert_eq!(counts.stats.reads_processed, 1);
    }

    #[test]
    fn test_row_counts_include_both_mates() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[
                sam_line("p1#0/1", 0, "NM_1", 101, "50M"),
                sam_line("p1#1/1", 0, "NM_2", 101, "50M"),
            ],
            &[sam_line("p1#0/2", 4, "*", 0, "*")],
        )
        .unwrap();
        assert_eq!(counts.stats.rows_read, 3);
        assert_eq!(counts.stats.rows_mapped, 2);
    }

    #[test]
    fn test_desynchronized_streams() {
        let catalog = small_catalog();
        let err = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[sam_line("p1", 0, "NM_1", 101, "50M")],
            &[sam_line("p2", 16, "NM_1", 251, "50M")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Desynchronized { .. }));
    }

    #[test]
    fn test_uneven_streams_stop_at_shorter() {
        let catalog = small_catalog();
        let counts = run(
            &catalog,
            DirectionalMode::Unrestricted,
            &[
                sam_line("p1", 0, "NM_1", 101, "50M"),
                sam_line("p2", 0, "NM_1", 101, "50M"),
            ],
            &[sam_line("p1", 16, "NM_1", 251, "50M")],
        )
        .unwrap();
        assert_eq!(counts.stats.reads_processed, 1);
        assert_eq!(counts.store.get(0).raw_count, 1);
    }

    #[test]
    fn test_deferred_candidate_rescued_by_fragment_length() {
        let catalog = small_catalog();
        let mut mate1 = Vec::new();
        let mut mate2 = Vec::new();
        for (i, interval) in [190, 200, 210].iter().enumerate() {
            let name = format!("u{i}");
            mate1.push(sam_line(&name, 0, "NM_3", 1, "50M"));
            mate2.push(sam_line(&name, 16, "NM_3", 1 + interval, "50M"));
        }
        // two mate-2 loci on NM_1: intervals 600 and 205
        mate1.push(sam_line("m1", 0, "NM_1", 101, "50M"));
        mate2.push(sam_line("m1", 16, "NM_1", 701, "50M"));
        mate2.push(sam_line("m1", 16, "NM_1", 306, "50M"));

        let counts = run(&catalog, DirectionalMode::Unrestricted, &mate1, &mate2).unwrap();

        assert_eq!(counts.stats.deferred_candidates, 1);
        assert_eq!(counts.stats.rescued_candidates, 1);
        let input = counts.store.get(0);
        assert_eq!(input.raw_count, 1);
        assert_eq!(input.start_histogram[100], 1);
        assert_eq!(input.start_histogram[305], 1);
        assert_eq!(input.start_histogram[700], 0);
        // rescued pairs do not feed the histogram
        assert_eq!(counts.fragment_lengths.unwrap().total(), 3);
    }

    #[test]
    fn test_closest_combination() {
        let fragments = FragmentLengthStats {
            mean: 200.0,
            sd: 20.0,
            count: 10,
        };
        let candidate = PairCandidate {
            transcript: 0,
            mate1: vec![locus(100, false), locus(500, false)],
            mate2: vec![locus(290, true), locus(310, true), locus(300, false)],
        };
        // (100, 290) and (100, 310) are equally close; first wins
        assert_eq!(
            candidate.closest_combination(&fragments),
            Some((locus(100, false), locus(290, true)))
        );

        let far = PairCandidate {
            transcript: 0,
            mate1: vec![locus(100, false)],
            mate2: vec![locus(400, true)],
        };
        assert_eq!(far.closest_combination(&fragments), None);
    }

    #[test]
    fn test_unambiguous_requires_single_loci() {
        let single = PairCandidate {
            transcript: 0,
            mate1: vec![locus(1, false)],
            mate2: vec![locus(9, true)],
        };
        assert!(single.unambiguous().is_some());

        let repeated = PairCandidate {
            transcript: 0,
            mate1: vec![locus(1, false), locus(5, false)],
            mate2: vec![locus(9, true)],
        };
        assert!(repeated.unambiguous().is_none());
    }

    #[test]
    fn test_fastq_dump_by_source() {
        let catalog = small_catalog();
        let dir = TempDir::new().unwrap();
        let tax = taxonomies();
        let mut resolver =
            PairedEndResolver::new(&catalog, &tax, DirectionalMode::Unrestricted, 10_000)
                .with_fastq_dumps(
                    Some(PairedFastqWriter::create(dir.path(), "cancer").unwrap()),
                    Some(PairedFastqWriter::create(dir.path(), "stroma").unwrap()),
                );

        resolver
            .resolve_pair(
                &[SamRecord::parse(&sam_line("c1#0/1", 0, "NM_1", 1, "50M")).unwrap()],
                &[SamRecord::parse(&sam_line("c1#0/2", 16, "NM_1", 201, "50M")).unwrap()],
            )
            .unwrap();
        resolver
            .resolve_pair(
                &[SamRecord::parse(&sam_line("s1#0/1", 0, "NM_4", 1, "50M")).unwrap()],
                &[SamRecord::parse(&sam_line("s1#0/2", 16, "NM_4", 201, "50M")).unwrap()],
            )
            .unwrap();
        let counts = resolver.finish().unwrap();
        assert_eq!(counts.stats.cancer_reads, 1);
        assert_eq!(counts.stats.stromal_reads, 1);

        let cancer = fs::read_to_string(dir.path().join("cancer_1.fastq")).unwrap();
        let stroma = fs::read_to_string(dir.path().join("stroma_2.fastq")).unwrap();
        assert!(cancer.starts_with("@c1#0/1\n"));
        assert!(stroma.starts_with("@s1#0/2\n"));
        assert_eq!(cancer.lines().count(), 4);
    }
}
