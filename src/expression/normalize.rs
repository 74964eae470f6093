/// Trimmed-mean normalization of gene expression, per sample
///
/// Each gene is represented by its most expressed transcript variant. Genes
/// of the cancer sample and genes of the stromal sample are normalized
/// independently: the representative expressions are sorted, the lowest and
/// highest five percent are trimmed, and every gene is scaled so that the
/// trimmed sum would equal [`NORMALIZATION_TARGET`].
use crate::catalog::{Catalog, SampleSource, Taxonomies};
use crate::coverage::CoverageStore;
use log::{info, warn};

/// Trimmed sum every population is scaled to
pub const NORMALIZATION_TARGET: f64 = 300_000.0;

const TRIM_LOW: f64 = 0.05;
const TRIM_HIGH: f64 = 0.95;

/// Normalized expression of one gene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneInput {
    pub gene: usize,
    pub representative_transcript: usize,
    pub representative_expression: f64,
    pub normalized_expression: f64,
}

/// How one sample population was scaled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationScale {
    pub source: SampleSource,
    pub genes: usize,
    /// Sum the population was divided by; untrimmed when the trimmed one is zero
    pub sum: f64,
    /// `None` when every gene of the population has zero expression
    pub factor: Option<f64>,
}

/// Gene inputs indexed like the catalog's genes
#[derive(Debug, Clone, Default)]
pub struct GeneExpression {
    inputs: Vec<Option<GeneInput>>,
    scales: Vec<PopulationScale>,
}

impl GeneExpression {
    /// Input of a gene, `None` for genes of neither sample
    pub fn get(&self, gene: usize) -> Option<&GeneInput> {
        self.inputs.get(gene).and_then(Option::as_ref)
    }

    /// Normalized expression, zero when the gene was not normalized
    pub fn normalized(&self, gene: usize) -> f64 {
        self.get(gene).map_or(0.0, |input| input.normalized_expression)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneInput> {
        self.inputs.iter().flatten()
    }

    pub fn scales(&self) -> &[PopulationScale] {
        &self.scales
    }
}

/// Variant with the highest corrected expression; the first one wins ties
pub fn representative(catalog: &Catalog, store: &CoverageStore, gene: usize) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &transcript in &catalog.gene(gene).variants {
        let expression = store.get(transcript).corrected_expression;
        if best.map_or(true, |(_, e)| e < expression) {
            best = Some((transcript, expression));
        }
    }
    best
}

/// Sum of ascending-sorted values between the 5th and 95th percentile.
///
/// Indices run from `floor(0.95 n)` (clamped to the last element) down to the
/// first index strictly above `0.05 n`.
pub fn trimmed_sum(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let low = TRIM_LOW * n as f64;
    let high = ((TRIM_HIGH * n as f64).floor() as usize).min(n - 1);

    (0..=high)
        .rev()
        .take_while(|&i| i as f64 > low)
        .map(|i| sorted[i])
        .sum()
}

/// Normalize the cancer and the stromal gene populations
pub fn normalize(catalog: &Catalog, store: &CoverageStore, taxonomies: &Taxonomies) -> GeneExpression {
    let mut expression = GeneExpression {
        inputs: vec![None; catalog.genes().len()],
        scales: Vec::with_capacity(2),
    };

    for source in [SampleSource::Cancer, SampleSource::Stromal] {
        let genes: Vec<(usize, usize, f64)> = catalog
            .genes_of(source, taxonomies)
            .into_iter()
            .filter_map(|gene| representative(catalog, store, gene).map(|(t, e)| (gene, t, e)))
            .collect();
        if genes.is_empty() {
            info!("No {:?} genes in catalog, nothing to normalize", source);
            continue;
        }

        let mut sorted: Vec<f64> = genes.iter().map(|&(_, _, e)| e).collect();
        sorted.sort_by(f64::total_cmp);

        let mut sum = trimmed_sum(&sorted);
        if sum == 0.0 {
            sum = sorted.iter().sum();
        }
        let factor = if sum > 0.0 {
            Some(NORMALIZATION_TARGET / sum)
        } else {
            warn!(
                "All {} {:?} genes have zero expression; normalized values set to 0",
                genes.len(),
                source
            );
            None
        };

        let scale = PopulationScale {
            source,
            genes: genes.len(),
            sum,
            factor,
        };
        info!(
            "Normalized {} {:?} genes (sum {:.3}, factor {:.6})",
            scale.genes,
            scale.source,
            scale.sum,
            scale.factor.unwrap_or(0.0)
        );
        expression.scales.push(scale);

        for (gene, transcript, value) in genes {
            expression.inputs[gene] = Some(GeneInput {
                gene,
                representative_transcript: transcript,
                representative_expression: value,
                normalized_expression: factor.map_or(0.0, |f| value * f),
            });
        }
    }

    expression
}
