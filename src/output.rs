/// Results tables
///
/// All tables are tab-separated with a header line:
/// - `genes.tsv`: one row per normalized gene
/// - `interactions.tsv`: one row per catalog interaction, with every derived
///   statistic; unset values are written as `NA`
/// - `match_length_distribution.tsv` and `fragment_length_distribution.tsv`:
///   `length<TAB>count` for every non-empty bucket
use crate::catalog::{Catalog, SampleSource, Taxonomies};
use crate::coverage::CoverageStore;
use crate::error::Error;
use crate::expression::GeneExpression;
use crate::interaction::{InteractionScore, PartnerRank, View};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const GENES_FILE: &str = "genes.tsv";
pub const INTERACTIONS_FILE: &str = "interactions.tsv";
pub const MATCH_LENGTH_FILE: &str = "match_length_distribution.tsv";
pub const FRAGMENT_LENGTH_FILE: &str = "fragment_length_distribution.tsv";

fn create(path: &Path) -> Result<BufWriter<File>, Error> {
    let file = File::create(path).map_err(|e| Error::io(e, path))?;
    Ok(BufWriter::new(file))
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| format!("{v:.6}"))
}

fn source_name(source: SampleSource) -> &'static str {
    match source {
        SampleSource::Cancer => "cancer",
        SampleSource::Stromal => "stroma",
        SampleSource::Other => "other",
    }
}

/// `SYMBOL:expression` entries, comma separated; `-` when empty
fn ranking_field(ranking: &[PartnerRank]) -> String {
    if ranking.is_empty() {
        return "-".to_string();
    }
    ranking
        .iter()
        .map(|r| format!("{}:{:.6}", r.symbol, r.expression))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write the normalized expression of every gene
pub fn write_genes(
    path: &Path,
    catalog: &Catalog,
    store: &CoverageStore,
    expression: &GeneExpression,
    taxonomies: &Taxonomies,
) -> Result<(), Error> {
    let mut writer = create(path)?;
    let io_err = |e| Error::io(e, path);

    writeln!(
        writer,
        "entrez_id\tsource\trepresentative_transcript\traw_count\tcorrected_expression\tnormalized_expression"
    )
    .map_err(io_err)?;

    let mut written = 0usize;
    for input in expression.iter() {
        let gene = catalog.gene(input.gene);
        let transcript = catalog.transcript(input.representative_transcript);
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.6}\t{:.6}",
            gene.entrez_id,
            source_name(taxonomies.classify(&gene.taxonomy)),
            transcript.id,
            store.get(input.representative_transcript).raw_count,
            input.representative_expression,
            input.normalized_expression
        )
        .map_err(io_err)?;
        written += 1;
    }

    writer.flush().map_err(io_err)?;
    log::info!("Wrote {} genes to {}", written, path.display());
    Ok(())
}

/// Write the derived statistics of every interaction, in catalog order
pub fn write_interactions(
    path: &Path,
    catalog: &Catalog,
    scores: &[InteractionScore],
) -> Result<(), Error> {
    let mut writer = create(path)?;
    let io_err = |e| Error::io(e, path);

    let mut header = vec![
        "ligand".to_string(),
        "receptor".to_string(),
        "average_cancer_to_stroma".to_string(),
        "average_stroma_to_cancer".to_string(),
        "ligand_ratio_cancer".to_string(),
        "ligand_ratio_stroma".to_string(),
        "ligand_possession".to_string(),
        "receptor_ratio_cancer".to_string(),
        "receptor_ratio_stroma".to_string(),
    ];
    for view in View::ALL {
        header.push(format!("{}_average", view.name()));
        header.push(format!("{}_ratio", view.name()));
        header.push(format!("{}_ranking", view.name()));
    }
    writeln!(writer, "{}", header.join("\t")).map_err(io_err)?;

    for (interaction, score) in catalog.interactions().iter().zip(scores) {
        let mut fields = vec![
            interaction.ligand_symbol.clone(),
            interaction.receptor_symbol.clone(),
            optional(score.average_cancer_to_stroma),
            optional(score.average_stroma_to_cancer),
            optional(score.ligand_ratio_cancer),
            optional(score.ligand_ratio_stroma),
            optional(score.ligand_possession),
            format!("{:.6}", score.receptor_ratio_cancer),
            format!("{:.6}", score.receptor_ratio_stroma),
        ];
        for view in View::ALL {
            let view_score = score.view(view);
            fields.push(optional(view_score.average));
            fields.push(format!("{:.6}", view_score.ratio));
            fields.push(ranking_field(&view_score.ranking));
        }
        writeln!(writer, "{}", fields.join("\t")).map_err(io_err)?;
    }

    writer.flush().map_err(io_err)?;
    log::info!("Wrote {} interactions to {}", scores.len(), path.display());
    Ok(())
}

/// Write the non-empty buckets of a length histogram
pub fn write_distribution(path: &Path, counts: &[u64]) -> Result<(), Error> {
    let mut writer = create(path)?;
    let io_err = |e| Error::io(e, path);

    writeln!(writer, "length\tcount").map_err(io_err)?;
    for (length, &count) in counts.iter().enumerate() {
        if count > 0 {
            writeln!(writer, "{}\t{}", length, count).map_err(io_err)?;
        }
    }

    writer.flush().map_err(io_err)?;
    Ok(())
}
