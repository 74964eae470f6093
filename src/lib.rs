pub mod catalog;
pub mod coverage;
pub mod error;
pub mod expression;
pub mod interaction;
pub mod io;
pub mod output;
pub mod params;
pub mod resolve;
pub mod stats;

use std::fs;

use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::{Catalog, Taxonomies};
use crate::io::{AlignmentReader, PairedFastqWriter};
use crate::params::{Parameters, ReadInput};
use crate::resolve::{PairedEndResolver, ReadCounts, SingleEndResolver};

/// Top-level pipeline. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> anyhow::Result<()> {
    params.validate()?;

    info!("interactome v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "cancerTaxonomy: {}, stromalTaxonomy: {}",
        params.cancer_taxonomy, params.stromal_taxonomy
    );
    info!("expressionMode: {}", params.expression_mode);

    let catalog = Catalog::from_tsv(&params.catalog_transcripts, &params.catalog_interactions)?;
    let taxonomies = Taxonomies::new(&params.cancer_taxonomy, &params.stromal_taxonomy);

    fs::create_dir_all(&params.output_dir)
        .map_err(|e| error::Error::io(e, &params.output_dir))?;

    let mut counts = match params.read_input()? {
        ReadInput::Single(path) => count_single_end(params, &catalog, &taxonomies, &path)?,
        ReadInput::Paired { mate1, mate2 } => {
            count_paired_end(params, &catalog, &taxonomies, &mate1, &mate2)?
        }
    };

    let corrector = expression::corrector_for(params.expression_mode);
    expression::apply_correction(corrector.as_ref(), &mut counts.store);
    let gene_expression = expression::normalize(&catalog, &counts.store, &taxonomies);
    let scores = interaction::score_interactions(&catalog, &gene_expression);

    let dir = &params.output_dir;
    output::write_genes(
        &dir.join(output::GENES_FILE),
        &catalog,
        &counts.store,
        &gene_expression,
        &taxonomies,
    )?;
    output::write_interactions(&dir.join(output::INTERACTIONS_FILE), &catalog, &scores)?;
    output::write_distribution(
        &dir.join(output::MATCH_LENGTH_FILE),
        counts.match_lengths.counts(),
    )?;
    if let Some(fragments) = &counts.fragment_lengths {
        output::write_distribution(&dir.join(output::FRAGMENT_LENGTH_FILE), fragments.counts())?;
    }

    info!("Analysis complete, results in {}", dir.display());
    Ok(())
}

fn rng_for(params: &Parameters) -> StdRng {
    match params.seed {
        Some(seed) => {
            info!("Tie-break seed: {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

fn count_single_end(
    params: &Parameters,
    catalog: &Catalog,
    taxonomies: &Taxonomies,
    path: &std::path::Path,
) -> anyhow::Result<ReadCounts> {
    let mut reader = AlignmentReader::open(path)?;
    let mut resolver =
        SingleEndResolver::new(catalog, taxonomies, params.max_match_length, rng_for(params));
    resolver.consume(&mut reader)?;
    Ok(resolver.finish())
}

fn count_paired_end(
    params: &Parameters,
    catalog: &Catalog,
    taxonomies: &Taxonomies,
    mate1: &std::path::Path,
    mate2: &std::path::Path,
) -> anyhow::Result<ReadCounts> {
    info!("directionalMode: {}", params.directional_mode);
    let mut reader1 = AlignmentReader::open(mate1)?;
    let mut reader2 = AlignmentReader::open(mate2)?;

    let cancer_dump = params
        .output_cancer_fastq
        .then(|| PairedFastqWriter::create(&params.output_dir, "cancer"))
        .transpose()?;
    let stromal_dump = params
        .output_stromal_fastq
        .then(|| PairedFastqWriter::create(&params.output_dir, "stroma"))
        .transpose()?;

    let mut resolver = PairedEndResolver::new(
        catalog,
        taxonomies,
        params.directional_mode,
        params.max_match_length,
    )
    .with_fastq_dumps(cancer_dump, stromal_dump);
    resolver.consume(&mut reader1, &mut reader2)?;
    Ok(resolver.finish()?)
}
