//! Fixed-capacity output collector shared by the encoder and decoder state
//! machines while draining a single `poll` call.

/// Collects bytes produced by a single `poll` call up to a fixed capacity.
///
/// This plays the role of the teacher's `OutputInfo`, but owns a growable
/// `Vec<u8>` instead of borrowing a caller-provided slice, since the
/// capacity is a runtime parameter (`§3`) rather than a compile-time array
/// size.
pub(crate) struct OutputSink {
    buf: Vec<u8>,
    cap: usize,
}

impl OutputSink {
    pub(crate) fn new(cap: usize) -> Self {
        OutputSink {
            buf: Vec::with_capacity(cap),
            cap,
        }
    }

    /// Append a byte to the output. Caller must have checked `can_take_byte`.
    pub(crate) fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Check if there is space left in the output.
    pub(crate) fn can_take_byte(&self) -> bool {
        self.buf.len() < self.cap
    }

    /// Get the free space remaining in the output.
    pub(crate) fn remaining_free_size(&self) -> usize {
        self.cap - self.buf.len()
    }

    /// Whether the output has been filled to capacity.
    pub(crate) fn is_full(&self) -> bool {
        self.buf.len() == self.cap
    }

    /// Consume the sink, yielding the bytes collected so far.
    pub(crate) fn into_output(self) -> Vec<u8> {
        self.buf
    }
}
