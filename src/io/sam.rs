/// Line-oriented SAM alignment reader
///
/// Records are tab-separated with at least the 11 mandatory SAM columns and
/// are decoded with `noodles::sam`. Header lines (`@`) are skipped; a line
/// starting with `#` ends the alignments (some aligners append a reporting
/// block).
use crate::error::Error;
use flate2::read::GzDecoder;
use noodles::sam;
use noodles::sam::alignment::record::Cigar as _;
use noodles::sam::alignment::record::cigar::op::Kind;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const MANDATORY_FIELDS: usize = 11;

/// One alignment line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamRecord {
    pub read_id: String,
    pub reverse: bool,
    /// Reference (transcript) name, `*` when unmapped
    pub reference: String,
    /// 0-based leftmost position
    pub start: Option<usize>,
    /// Reference bases covered; `None` for the unavailable CIGAR `*`
    pub span: Option<u32>,
    pub sequence: String,
    pub quality: String,
}

impl SamRecord {
    /// Parse a tab-separated alignment line
    pub fn parse(line: &str) -> Result<Self, String> {
        let fields = line.split('\t').count();
        if fields < MANDATORY_FIELDS {
            return Err(format!(
                "alignment line has {fields} fields, expected at least {MANDATORY_FIELDS}"
            ));
        }

        let mut record = sam::Record::default();
        sam::io::Reader::new(line.as_bytes())
            .read_record(&mut record)
            .map_err(|e| format!("invalid alignment line: {e}"))?;

        Self::from_record(&record)
    }

    fn from_record(record: &sam::Record) -> Result<Self, String> {
        let flags = record
            .flags()
            .map_err(|e| format!("invalid flag: {e}"))?;
        let start = record
            .alignment_start()
            .transpose()
            .map_err(|e| format!("invalid position: {e}"))?
            .map(|position| position.get() - 1);

        let cigar = record.cigar();
        let span = if cigar.is_empty() {
            None
        } else {
            let mut span = 0u32;
            for result in cigar.iter() {
                let op = result.map_err(|e| format!("invalid CIGAR: {e}"))?;
                if !consumes_reference(op.kind()) {
                    continue;
                }
                span = u32::try_from(op.len())
                    .ok()
                    .and_then(|len| span.checked_add(len))
                    .ok_or_else(|| "CIGAR reference span overflows".to_string())?;
            }
            Some(span)
        };

        Ok(Self {
            read_id: record.name().map_or_else(|| "*".to_string(), |name| text(name)),
            reverse: flags.is_reverse_complemented(),
            reference: record
                .reference_sequence_name()
                .map_or_else(|| "*".to_string(), |name| text(name)),
            start,
            span,
            sequence: text(record.sequence().as_ref()),
            quality: text(record.quality_scores().as_ref()),
        })
    }

    /// Full read identifier
    pub fn read_id(&self) -> &str {
        &self.read_id
    }

    /// Read identifier with any `#`-delimited suffix removed, shared by both mates
    pub fn pair_name(&self) -> &str {
        self.read_id.split('#').next().unwrap_or(&self.read_id)
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn is_mapped(&self) -> bool {
        !self.reference.contains('*')
    }

    /// 0-based start position
    pub fn start(&self) -> Option<usize> {
        self.start
    }

    /// Reference bases covered; 0 without a CIGAR
    pub fn match_length(&self) -> u32 {
        self.span.unwrap_or(0)
    }
}

/// M, =, X, D and N advance along the transcript
fn consumes_reference(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch | Kind::Deletion | Kind::Skip
    )
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Reader over alignment records that can hand out read groups
pub struct AlignmentReader<R> {
    inner: R,
    path: PathBuf,
    line: String,
    line_num: u64,
    pending: Option<SamRecord>,
    finished: bool,
}

impl AlignmentReader<Box<dyn BufRead + Send>> {
    /// Open an alignment file (plain or gzip compressed)
    pub fn open(path: &Path) -> Result<Self, Error> {
        let path_str = path.to_string_lossy();
        let is_gzipped = path_str.ends_with(".gz") || path_str.ends_with(".gzip");

        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let reader: Box<dyn BufRead + Send> = if is_gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self::new(reader, path))
    }
}

impl<R: BufRead> AlignmentReader<R> {
    /// Wrap any buffered reader; `path` is used in error messages
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            line: String::new(),
            line_num: 0,
            pending: None,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next alignment record, or `None` at end of stream or at a `#` line
    pub fn next_record(&mut self) -> Result<Option<SamRecord>, Error> {
        if let Some(record) = self.pending.take() {
            return Ok(Some(record));
        }

        while !self.finished {
            self.line.clear();
            let n = self
                .inner
                .read_line(&mut self.line)
                .map_err(|e| Error::io(e, &self.path))?;
            if n == 0 {
                self.finished = true;
                break;
            }
            self.line_num += 1;

            let line = self.line.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with('@') {
                continue;
            }
            if line.starts_with('#') {
                log::debug!(
                    "End-of-alignments marker at {}:{}",
                    self.path.display(),
                    self.line_num
                );
                self.finished = true;
                break;
            }

            let record = SamRecord::parse(line)
                .map_err(|msg| Error::record(&self.path, self.line_num, msg))?;
            return Ok(Some(record));
        }

        Ok(None)
    }

    /// Next run of consecutive records sharing the same `key`
    pub fn next_group(
        &mut self,
        key: fn(&SamRecord) -> &str,
    ) -> Result<Option<Vec<SamRecord>>, Error> {
        let first = match self.next_record()? {
            Some(record) => record,
            None => return Ok(None),
        };

        let mut group = vec![first];
        while let Some(record) = self.next_record()? {
            if key(&record) == key(&group[0]) {
                group.push(record);
            } else {
                self.pending = Some(record);
                break;
            }
        }

        Ok(Some(group))
    }
}
