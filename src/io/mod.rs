/// Alignment input and read dump output
pub mod fastq;
pub mod sam;

pub use fastq::PairedFastqWriter;
pub use sam::{AlignmentReader, SamRecord};
