//! High-level façade driving a [`Machine`] through the sink/poll/finish
//! protocol so callers can push arbitrarily-sized chunks in and get
//! complete output back out, without manually looping over `poll`.
//!
//! Mirrors `original_source/heatshrinkpy/core/__init__.py`'s `Encoder`
//! wrapper class, generalized over encoder and decoder alike.

use crate::HeatshrinkError;

/// Common sink/poll/finish protocol implemented by [`crate::encoder::Writer`]
/// and [`crate::decoder::Reader`].
pub trait Machine {
    /// Accept as much of `buf` as fits in the free space of the input
    /// window. Returns `(more_sinkable, bytes_consumed)`.
    fn sink(&mut self, buf: &[u8]) -> Result<(bool, usize), HeatshrinkError>;

    /// Drive the state machine, producing up to `out_buf_size` bytes.
    /// Returns `(more_available, output)`.
    fn poll(&mut self, out_buf_size: usize) -> Result<(bool, Vec<u8>), HeatshrinkError>;

    /// Signal that no more input is coming. Returns `true` once all
    /// buffered input has been fully drained.
    fn finish(&mut self) -> Result<bool, HeatshrinkError>;

    /// The largest number of bytes a single `poll` call can usefully
    /// return; used to size internal drain buffers.
    fn max_output_size(&self) -> usize;
}

/// Drives a [`Machine`] (an [`crate::encoder::Writer`] or
/// [`crate::decoder::Reader`]) through repeated sink/poll cycles so callers
/// can feed it arbitrarily-sized chunks and read back everything that's
/// ready, without juggling the underlying state machine themselves.
pub struct Coder<M: Machine> {
    machine: M,
    finished: bool,
}

impl<M: Machine> Coder<M> {
    /// Wrap `machine` in a fresh, unfinished coder.
    pub fn new(machine: M) -> Self {
        Coder {
            machine,
            finished: false,
        }
    }

    /// Feed `data` through the machine, returning every output byte it was
    /// able to produce before its input window filled up.
    pub fn fill(&mut self, data: impl AsRef<[u8]>) -> Result<Vec<u8>, HeatshrinkError> {
        self.check_not_finished()?;

        let mut remaining = data.as_ref();
        let mut out = Vec::new();

        while !remaining.is_empty() {
            let (_, consumed) = self.machine.sink(remaining)?;
            remaining = &remaining[consumed..];
            out.extend(self.drain()?);
        }

        Ok(out)
    }

    /// Signal end of input and return any remaining output. After this call
    /// the coder is closed: further `fill`/`finish` calls return an error.
    pub fn finish(&mut self) -> Result<Vec<u8>, HeatshrinkError> {
        self.check_not_finished()?;

        let mut out = Vec::new();
        loop {
            let done = self.machine.finish()?;
            out.extend(self.drain()?);
            if done {
                break;
            }
        }

        self.finished = true;
        Ok(out)
    }

    /// Whether [`Coder::finish`] has been called.
    pub fn finished(&self) -> bool {
        self.finished
    }

    fn drain(&mut self) -> Result<Vec<u8>, HeatshrinkError> {
        let out_buf_size = self.machine.max_output_size();
        let mut out = Vec::new();
        loop {
            let (more, chunk) = self.machine.poll(out_buf_size)?;
            let got_all = chunk.len() < out_buf_size;
            out.extend(chunk);
            if !more && got_all {
                break;
            }
        }
        Ok(out)
    }

    fn check_not_finished(&self) -> Result<(), HeatshrinkError> {
        if self.finished {
            return Err(HeatshrinkError::InvalidState(
                "Attempted to perform operation on a closed encoder.".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::Reader;
    use crate::encoder::Writer;

    #[test]
    fn closed_coder_rejects_further_calls() {
        let mut coder = Coder::new(Writer::new(8, 4).unwrap());
        coder.fill(b"abc").unwrap();
        coder.finish().unwrap();
        assert!(coder.finished());
        assert!(coder.fill(b"more").is_err());
        assert!(coder.finish().is_err());
    }

    #[test]
    fn round_trip_via_coder() {
        let mut enc = Coder::new(Writer::new(8, 4).unwrap());
        let mut compressed = enc.fill(b"hello hello hello").unwrap();
        compressed.extend(enc.finish().unwrap());

        let mut dec = Coder::new(Reader::new(256, 8, 4).unwrap());
        let mut decompressed = dec.fill(&compressed).unwrap();
        decompressed.extend(dec.finish().unwrap());

        assert_eq!(decompressed, b"hello hello hello");
    }
}
