/// FASTQ dump of accepted read pairs, one file per mate
use crate::error::Error;
use crate::io::sam::SamRecord;
use noodles::fastq;
use noodles::fastq::record::Definition;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `<stem>_1.fastq` and `<stem>_2.fastq` in lockstep
pub struct PairedFastqWriter {
    mate1: fastq::io::Writer<BufWriter<File>>,
    mate2: fastq::io::Writer<BufWriter<File>>,
    path1: PathBuf,
    path2: PathBuf,
    pairs_written: u64,
}

impl PairedFastqWriter {
    /// Create the two mate files inside `dir`
    pub fn create(dir: &Path, stem: &str) -> Result<Self, Error> {
        let path1 = dir.join(format!("{stem}_1.fastq"));
        let path2 = dir.join(format!("{stem}_2.fastq"));

        let file1 = File::create(&path1).map_err(|e| Error::io(e, &path1))?;
        let file2 = File::create(&path2).map_err(|e| Error::io(e, &path2))?;

        Ok(Self {
            mate1: fastq::io::Writer::new(BufWriter::new(file1)),
            mate2: fastq::io::Writer::new(BufWriter::new(file2)),
            path1,
            path2,
            pairs_written: 0,
        })
    }

    /// Write the sequence and qualities of one mate pair
    pub fn write_pair(&mut self, mate1: &SamRecord, mate2: &SamRecord) -> Result<(), Error> {
        self.mate1
            .write_record(&to_fastq(mate1))
            .map_err(|e| Error::io(e, &self.path1))?;
        self.mate2
            .write_record(&to_fastq(mate2))
            .map_err(|e| Error::io(e, &self.path2))?;
        self.pairs_written += 1;
        Ok(())
    }

    /// Flush both files
    pub fn finish(mut self) -> Result<u64, Error> {
        self.mate1
            .get_mut()
            .flush()
            .map_err(|e| Error::io(e, &self.path1))?;
        self.mate2
            .get_mut()
            .flush()
            .map_err(|e| Error::io(e, &self.path2))?;
        log::info!(
            "Wrote {} read pairs to {} / {}",
            self.pairs_written,
            self.path1.display(),
            self.path2.display()
        );
        Ok(self.pairs_written)
    }
}

fn to_fastq(record: &SamRecord) -> fastq::Record {
    fastq::Record::new(
        Definition::new(record.read_id.as_str(), ""),
        record.sequence.as_bytes(),
        record.quality.as_bytes(),
    )
}
