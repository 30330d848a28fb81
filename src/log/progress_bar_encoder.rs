//! Log lines written while the calibration progress bar is drawn would otherwise leave the tail
//! of the bar behind on the same console line.

use log::Record;
use log4rs::encode::{Encode, Write};

/// Wraps an encoder and clears the current console line before every record.
#[derive(Debug)]
pub struct PBWrapperEncoder {
    inner: Box<dyn Encode>,
}

impl PBWrapperEncoder {
    pub fn new(inner: Box<dyn Encode>) -> Self {
        Self { inner }
    }
}

impl Encode for PBWrapperEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> Result<(), anyhow::Error> {
        // Clear the entire line and return the cursor to the beginning.
        w.write_all("\x1B[2K\r".as_bytes())?;
        self.inner.encode(w, record)
    }
}
