// Source: https://github.com/zaeleus/noodles/blob/master/noodles-bam/src/reader/records.rs

use super::Reader;
use crate::source::BlockSource;
use crate::{RawRecord, Result};

/// An iterator over records of a BAM reader.
///
/// This is created by calling [`Reader::records`]. Each item owns its bytes,
/// so records can be handed to other threads once pulled.
pub struct Records<'a, S> {
    reader: &'a mut Reader<S>,
    record: Vec<u8>,
}

impl<'a, S: BlockSource> Records<'a, S> {
    pub(crate) fn new(reader: &'a mut Reader<S>) -> Records<'a, S> {
        Self {
            reader,
            record: Vec::default(),
        }
    }

    /// Borrowing variant of `next` that reuses one buffer.
    pub fn next_rec(&mut self) -> Option<Result<&[u8]>> {
        match self.reader.read_record(&mut self.record) {
            Ok(0) => None,
            Ok(_) => Some(Ok(&self.record)),
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'a, S: BlockSource> Iterator for Records<'a, S> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(0) => None,
            Ok(_) => Some(Ok(RawRecord::from(std::mem::take(&mut self.record)))),
            Err(e) => Some(Err(e)),
        }
    }
}
