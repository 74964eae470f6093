/// Expression estimation: bias correction and per-sample normalization
pub mod normalize;

pub use normalize::{GeneExpression, GeneInput, PopulationScale, normalize};

use crate::coverage::{CoverageStore, TranscriptInput};
use crate::params::ExpressionMode;

/// Turns the raw accumulators of a transcript into an expression estimate.
///
/// Implementations may use the count, the start histogram and the depth
/// histogram; the result is written to `corrected_expression`.
pub trait BiasCorrector {
    fn name(&self) -> &'static str;

    fn correct(&self, input: &TranscriptInput) -> f64;
}

/// Corrected expression equals the read count
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCount;

impl BiasCorrector for RawCount {
    fn name(&self) -> &'static str {
        "RawCount"
    }

    fn correct(&self, input: &TranscriptInput) -> f64 {
        input.raw_count as f64
    }
}

/// Reads per kilobase of transcript length
#[derive(Debug, Clone, Copy, Default)]
pub struct PerKilobase;

impl BiasCorrector for PerKilobase {
    fn name(&self) -> &'static str {
        "PerKilobase"
    }

    fn correct(&self, input: &TranscriptInput) -> f64 {
        match input.length() {
            0 => 0.0,
            length => input.raw_count as f64 * 1000.0 / length as f64,
        }
    }
}

/// The built-in corrector selected on the command line
pub fn corrector_for(mode: ExpressionMode) -> Box<dyn BiasCorrector> {
    match mode {
        ExpressionMode::RawCount => Box::new(RawCount),
        ExpressionMode::PerKilobase => Box::new(PerKilobase),
    }
}

/// Fill `corrected_expression` of every transcript
pub fn apply_correction(corrector: &dyn BiasCorrector, store: &mut CoverageStore) {
    for input in store.iter_mut() {
        input.corrected_expression = corrector.correct(input);
    }
    log::info!(
        "Applied {} correction to {} transcripts",
        corrector.name(),
        store.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, TranscriptRecord};
    use crate::coverage::Span;

    fn store() -> CoverageStore {
        let mut catalog = Catalog::new();
        for (id, length) in [("NM_1", 2000), ("NM_2", 500)] {
            catalog
                .add_transcript(TranscriptRecord {
                    transcript_id: id.to_string(),
                    gene_id: id.to_string(),
                    taxonomy: "9606".to_string(),
                    length,
                    is_invalid: false,
                })
                .unwrap();
        }
        let mut store = CoverageStore::new(&catalog);
        for _ in 0..4 {
            store.increment(0, &[Span::new(0, 50)]);
            store.increment(1, &[Span::new(0, 50)]);
        }
        store
    }

    #[test]
    fn test_raw_count() {
        let mut store = store();
        apply_correction(&RawCount, &mut store);
        assert_eq!(store.get(0).corrected_expression, 4.0);
        assert_eq!(store.get(1).corrected_expression, 4.0);
    }

    #[test]
    fn test_per_kilobase() {
        let mut store = store();
        apply_correction(corrector_for(ExpressionMode::PerKilobase).as_ref(), &mut store);
        assert!((store.get(0).corrected_expression - 2.0).abs() < 1e-12);
        assert!((store.get(1).corrected_expression - 8.0).abs() < 1e-12);
    }
}
