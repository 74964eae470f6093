/// Tab-separated catalog files
///
/// Transcript table (4 or 5 columns):
/// 1. transcript id (reference name used in the alignments)
/// 2. gene id (Entrez)
/// 3. taxonomy tag
/// 4. transcript length
/// 5. invalid flag (optional; 1/true marks a transcript excluded from counting)
///
/// Interaction table (8 columns):
/// 1. ligand symbol
/// 2. receptor symbol
/// 3-6. gene ids of the cancer ligand, stromal ligand, cancer receptor and
///      stromal receptor roles (comma-separated, `-` for none)
/// 7. cancer-to-stroma direction valid (0/1)
/// 8. stroma-to-cancer direction valid (0/1)
use crate::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One row of the transcript table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptRecord {
    pub transcript_id: String,
    pub gene_id: String,
    pub taxonomy: String,
    pub length: usize,
    pub is_invalid: bool,
}

/// One row of the interaction table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionRecord {
    pub ligand_symbol: String,
    pub receptor_symbol: String,
    pub ligand_cancer: Vec<String>,
    pub ligand_stromal: Vec<String>,
    pub receptor_cancer: Vec<String>,
    pub receptor_stromal: Vec<String>,
    pub valid_cancer_to_stroma: bool,
    pub valid_stroma_to_cancer: bool,
}

/// Parse the transcript table.
pub fn parse_transcripts(path: &Path) -> Result<Vec<TranscriptRecord>, Error> {
    read_rows(path, parse_transcript_line)
}

/// Parse the interaction table.
pub fn parse_interactions(path: &Path) -> Result<Vec<InteractionRecord>, Error> {
    read_rows(path, parse_interaction_line)
}

fn read_rows<T>(path: &Path, parse: fn(&str) -> Result<T, String>) -> Result<Vec<T>, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;

        // Skip comments and empty lines
        let line = line.trim_end();
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let row = parse(line).map_err(|e| {
            Error::Catalog(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        rows.push(row);
    }

    Ok(rows)
}

/// Parse a single transcript line
fn parse_transcript_line(line: &str) -> Result<TranscriptRecord, String> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 4 {
        return Err(format!(
            "transcript line has {} fields, expected at least 4",
            fields.len()
        ));
    }

    let length = fields[3]
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid transcript length: {}", e))?;
    if length == 0 {
        return Err(format!(
            "transcript {} has zero length",
            fields[0]
        ));
    }

    let is_invalid = match fields.get(4) {
        Some(flag) => parse_flag(flag)?,
        None => false,
    };

    Ok(TranscriptRecord {
        transcript_id: fields[0].trim().to_string(),
        gene_id: fields[1].trim().to_string(),
        taxonomy: fields[2].trim().to_string(),
        length,
        is_invalid,
    })
}

/// Parse a single interaction line
fn parse_interaction_line(line: &str) -> Result<InteractionRecord, String> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 8 {
        return Err(format!(
            "interaction line has {} fields, expected 8",
            fields.len()
        ));
    }

    Ok(InteractionRecord {
        ligand_symbol: fields[0].trim().to_string(),
        receptor_symbol: fields[1].trim().to_string(),
        ligand_cancer: parse_gene_list(fields[2]),
        ligand_stromal: parse_gene_list(fields[3]),
        receptor_cancer: parse_gene_list(fields[4]),
        receptor_stromal: parse_gene_list(fields[5]),
        valid_cancer_to_stroma: parse_flag(fields[6])?,
        valid_stroma_to_cancer: parse_flag(fields[7])?,
    })
}

/// `-` or empty means no genes
fn parse_gene_list(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "-")
        .map(str::to_string)
        .collect()
}

fn parse_flag(field: &str) -> Result<bool, String> {
    match field.trim() {
        "1" | "true" | "TRUE" => Ok(true),
        "0" | "false" | "FALSE" | "" => Ok(false),
        other => Err(format!("invalid flag value '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_transcript_line() {
        let record = parse_transcript_line("NM_000001\t7040\t9606\t1500").unwrap();
        assert_eq!(record.transcript_id, "NM_000001");
        assert_eq!(record.gene_id, "7040");
        assert_eq!(record.taxonomy, "9606");
        assert_eq!(record.length, 1500);
        assert!(!record.is_invalid);
    }

    #[test]
    fn test_parse_transcript_line_invalid_flag() {
        let record = parse_transcript_line("NM_000002\t7040\t9606\t900\t1").unwrap();
        assert!(record.is_invalid);
        assert!(parse_transcript_line("NM_000002\t7040\t9606\t900\tmaybe").is_err());
    }

    #[test]
    fn test_parse_transcript_line_bad_length() {
        assert!(parse_transcript_line("NM_1\t1\t9606\tlong").is_err());
        assert!(parse_transcript_line("NM_1\t1\t9606\t0").is_err());
        assert!(parse_transcript_line("NM_1\t1\t9606").is_err());
    }

    #[test]
    fn test_parse_interaction_line() {
        let line = "TGFB1\tTGFBR2\t7040\t21803\t7048\t21813,21814\t1\t0";
        let record = parse_interaction_line(line).unwrap();
        assert_eq!(record.ligand_symbol, "TGFB1");
        assert_eq!(record.receptor_symbol, "TGFBR2");
        assert_eq!(record.ligand_cancer, vec!["7040".to_string()]);
        assert_eq!(record.ligand_stromal, vec!["21803".to_string()]);
        assert_eq!(record.receptor_cancer, vec!["7048".to_string()]);
        assert_eq!(
            record.receptor_stromal,
            vec!["21813".to_string(), "21814".to_string()]
        );
        assert!(record.valid_cancer_to_stroma);
        assert!(!record.valid_stroma_to_cancer);
    }

    #[test]
    fn test_parse_interaction_empty_sets() {
        let record = parse_interaction_line("A\tB\t-\t\t1\t-\t1\t1").unwrap();
        assert!(record.ligand_cancer.is_empty());
        assert!(record.ligand_stromal.is_empty());
        assert_eq!(record.receptor_cancer, vec!["1".to_string()]);
        assert!(record.receptor_stromal.is_empty());
    }

    #[test]
    fn test_parse_transcripts_with_comments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# transcript\tgene\ttax\tlength").unwrap();
        writeln!(file, "NM_1\t1\t9606\t100").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "NM_2\t1\t9606\t200").unwrap();

        let rows = parse_transcripts(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].length, 200);
    }

    #[test]
    fn test_parse_transcripts_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "NM_1\t1\t9606\t100").unwrap();
        writeln!(file, "NM_2\t1\t9606\tabc").unwrap();

        let err = parse_transcripts(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
