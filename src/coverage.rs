/// Per-transcript read accumulators
use crate::catalog::Catalog;

/// Aligned span of one mate on a transcript (0-based start)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub length: usize,
}

impl Span {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }
}

/// Counters for one transcript.
///
/// Both histograms are sized to the transcript length at allocation and
/// never resized.
#[derive(Debug, Clone)]
pub struct TranscriptInput {
    /// Reads assigned to this transcript
    pub raw_count: u64,
    /// Fragment 5' start tally per base
    pub start_histogram: Box<[u32]>,
    /// Per-base depth tally
    pub overlap_histogram: Box<[u32]>,
    /// Filled in by the bias corrector
    pub corrected_expression: f64,
}

impl TranscriptInput {
    fn new(length: usize) -> Self {
        Self {
            raw_count: 0,
            start_histogram: vec![0; length].into_boxed_slice(),
            overlap_histogram: vec![0; length].into_boxed_slice(),
            corrected_expression: 0.0,
        }
    }

    /// Declared transcript length
    pub fn length(&self) -> usize {
        self.start_histogram.len()
    }

    /// Count one read with one span per mate.
    ///
    /// Starts and overlaps falling outside the transcript are clipped.
    pub fn increment(&mut self, spans: &[Span]) {
        self.raw_count += 1;

        let length = self.length();
        for span in spans {
            if span.start < length {
                self.start_histogram[span.start] += 1;
            }
            let end = span.start.saturating_add(span.length).min(length);
            for depth in self.overlap_histogram.iter_mut().take(end).skip(span.start) {
                *depth += 1;
            }
        }
    }
}

/// Coverage accumulators for every catalog transcript, indexed like the catalog
#[derive(Debug, Clone)]
pub struct CoverageStore {
    inputs: Vec<TranscriptInput>,
}

impl CoverageStore {
    /// Allocate zeroed accumulators for every transcript in the catalog
    pub fn new(catalog: &Catalog) -> Self {
        let inputs = catalog
            .transcripts()
            .iter()
            .map(|t| TranscriptInput::new(t.length))
            .collect();
        Self { inputs }
    }

    pub fn get(&self, transcript: usize) -> &TranscriptInput {
        &self.inputs[transcript]
    }

    pub fn get_mut(&mut self, transcript: usize) -> &mut TranscriptInput {
        &mut self.inputs[transcript]
    }

    /// Record one read on a transcript
    pub fn increment(&mut self, transcript: usize, spans: &[Span]) {
        self.inputs[transcript].increment(spans);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptInput> {
        self.inputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TranscriptInput> {
        self.inputs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Sum of raw counts over all transcripts
    pub fn total_count(&self) -> u64 {
        self.inputs.iter().map(|input| input.raw_count).sum()
    }
}
