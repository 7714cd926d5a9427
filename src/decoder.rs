//! The decoder ("Reader") state machine: bit-level input extraction,
//! the seven-state protocol that recognises tag bits, literals and
//! back-references, and the ring-buffer window used to replay them.

use crate::coder::Machine;
use crate::output::OutputSink;
use crate::params::{validate_input_buffer_size, validate_lookahead_sz2, validate_window_sz2};
use crate::HeatshrinkError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    TagBit,          /* tag bit */
    YieldLiteral,    /* ready to yield literal byte */
    BackrefIndexMsb, /* most significant bits of back-ref index */
    BackrefIndexLsb, /* least significant bits of back-ref index */
    BackrefCountMsb, /* most significant bits of back-ref count */
    BackrefCountLsb, /* least significant bits of back-ref count */
    YieldBackref,    /* ready to yield back-reference */
}

/// The decoder instance.
#[derive(Debug)]
pub struct Reader {
    window_sz2: u8,
    lookahead_sz2: u8,

    input_buffer: Vec<u8>,
    input_size: usize,
    input_index: usize,

    output_buffer: Vec<u8>, // len 1 << window_sz2, ring buffer
    output_index: usize,
    output_count: usize,
    head_index: usize,

    current_byte: u8,
    bit_index: u8,
    state: State,
}

impl Reader {
    /// Construct a new decoder. `input_buffer_size` bounds how many
    /// compressed bytes can be staged by a single `sink` call.
    pub fn new(
        input_buffer_size: usize,
        window_sz2: u8,
        lookahead_sz2: u8,
    ) -> Result<Self, HeatshrinkError> {
        validate_input_buffer_size(input_buffer_size)?;
        validate_window_sz2(window_sz2)?;
        validate_lookahead_sz2(lookahead_sz2, window_sz2)?;

        Ok(Reader {
            window_sz2,
            lookahead_sz2,
            input_buffer: vec![0u8; input_buffer_size],
            input_size: 0,
            input_index: 0,
            output_buffer: vec![0u8; 1usize << window_sz2],
            output_index: 0,
            output_count: 0,
            head_index: 0,
            current_byte: 0,
            bit_index: 0,
            state: State::TagBit,
        })
    }

    /// The maximum number of decompressed bytes a single `poll` can yield.
    pub fn max_output_size(&self) -> usize {
        self.output_buffer.len()
    }

    /// Reset the decoder to its initial state, discarding buffered input.
    pub fn reset(&mut self) {
        self.input_size = 0;
        self.input_index = 0;
        self.output_count = 0;
        self.output_index = 0;
        self.head_index = 0;
        self.current_byte = 0;
        self.bit_index = 0;
        self.state = State::TagBit;
        self.input_buffer.iter_mut().for_each(|m| *m = 0);
        self.output_buffer.iter_mut().for_each(|m| *m = 0);
    }

    /// Add compressed bytes to be processed. Returns `(full, sunk_count)`.
    pub fn sink(&mut self, in_buf: &[u8]) -> Result<(bool, usize), HeatshrinkError> {
        let remaining = self.input_buffer.len() - self.input_size;
        if remaining == 0 {
            return Ok((true, 0));
        }

        let size = remaining.min(in_buf.len());
        self.input_buffer[self.input_size..self.input_size + size].copy_from_slice(&in_buf[..size]);
        self.input_size += size;

        Ok((false, size))
    }

    /// Drive the state machine, collecting up to `out_buf_size` decompressed
    /// bytes. Returns `(more_available, output_bytes)`.
    pub fn poll(&mut self, out_buf_size: usize) -> Result<(bool, Vec<u8>), HeatshrinkError> {
        let mut sink = OutputSink::new(out_buf_size);

        loop {
            let in_state = self.state;

            self.state = match in_state {
                State::TagBit => self.st_tag_bit(),
                State::YieldLiteral => self.st_yield_literal(&mut sink),
                State::BackrefIndexMsb => self.st_backref_index_msb(),
                State::BackrefIndexLsb => self.st_backref_index_lsb(),
                State::BackrefCountMsb => self.st_backref_count_msb(),
                State::BackrefCountLsb => self.st_backref_count_lsb(),
                State::YieldBackref => self.st_yield_backref(&mut sink),
            };

            if self.state == in_state {
                return Ok((!sink.can_take_byte(), sink.into_output()));
            }
        }
    }

    /// Signal that no more compressed input is coming. Returns `true` once
    /// all buffered input has been consumed and no back-reference is still
    /// being replayed.
    pub fn finish(&mut self) -> Result<bool, HeatshrinkError> {
        if self.state == State::YieldBackref {
            return Ok(false);
        }
        Ok(self.input_size == 0)
    }

    fn st_tag_bit(&mut self) -> State {
        match self.get_bits(1) {
            None => State::TagBit,
            Some(0) => {
                self.output_index = 0;
                if self.window_sz2 > 8 {
                    State::BackrefIndexMsb
                } else {
                    State::BackrefIndexLsb
                }
            }
            Some(_) => State::YieldLiteral,
        }
    }

    fn st_yield_literal(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldLiteral;
        }
        match self.get_bits(8) {
            None => State::YieldLiteral,
            Some(x) => {
                let c = (x & 0xff) as u8;
                let mask = self.output_buffer.len() - 1;
                self.output_buffer[self.head_index & mask] = c;
                self.head_index += 1;
                sink.push_byte(c);
                State::TagBit
            }
        }
    }

    fn st_backref_index_msb(&mut self) -> State {
        let bitct = self.window_sz2 - 8;
        match self.get_bits(bitct) {
            None => State::BackrefIndexMsb,
            Some(x) => {
                self.output_index = (x as usize) << 8;
                State::BackrefIndexLsb
            }
        }
    }

    fn st_backref_index_lsb(&mut self) -> State {
        let bitct = if self.window_sz2 > 8 { 8 } else { self.window_sz2 };
        match self.get_bits(bitct) {
            None => State::BackrefIndexLsb,
            Some(x) => {
                self.output_index |= x as usize;
                self.output_index += 1;
                self.output_count = 0;
                if self.lookahead_sz2 > 8 {
                    State::BackrefCountMsb
                } else {
                    State::BackrefCountLsb
                }
            }
        }
    }

    fn st_backref_count_msb(&mut self) -> State {
        let bitct = self.lookahead_sz2 - 8;
        match self.get_bits(bitct) {
            None => State::BackrefCountMsb,
            Some(x) => {
                self.output_count = (x as usize) << 8;
                State::BackrefCountLsb
            }
        }
    }

    fn st_backref_count_lsb(&mut self) -> State {
        let bitct = if self.lookahead_sz2 > 8 {
            8
        } else {
            self.lookahead_sz2
        };
        match self.get_bits(bitct) {
            None => State::BackrefCountLsb,
            Some(x) => {
                self.output_count |= x as usize;
                self.output_count += 1;
                State::YieldBackref
            }
        }
    }

    fn st_yield_backref(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldBackref;
        }

        let mask = self.output_buffer.len() - 1;
        let count = self.output_count.min(sink.remaining_free_size());

        for _ in 0..count {
            let c = if self.output_index > self.head_index {
                0
            } else {
                self.output_buffer[(self.head_index - self.output_index) & mask]
            };
            self.output_buffer[self.head_index & mask] = c;
            sink.push_byte(c);
            self.head_index += 1;
        }

        self.output_count -= count;

        if self.output_count == 0 {
            State::TagBit
        } else {
            State::YieldBackref
        }
    }

    /// Get the next `count` bits from the input buffer, saving incremental
    /// progress across suspended calls. Returns `None` on end of input.
    fn get_bits(&mut self, count: u8) -> Option<u16> {
        if count == 0 {
            return Some(0);
        }
        if count > 15 {
            return None;
        }

        if self.input_size == 0 && self.bit_index < (1 << (count - 1)) {
            return None;
        }

        let mut accumulator: u16 = 0;
        let mut i = 0u8;

        while i < count {
            if self.bit_index == 0 {
                if self.input_size == 0 {
                    return None;
                }
                self.current_byte = self.input_buffer[self.input_index];
                self.input_index += 1;
                if self.input_index == self.input_size {
                    self.input_index = 0;
                    self.input_size = 0;
                }
                self.bit_index = 0x80;
            }
            accumulator <<= 1;
            if self.current_byte & self.bit_index != 0 {
                accumulator |= 0x1;
            }
            self.bit_index >>= 1;
            i += 1;
        }

        Some(accumulator)
    }
}

impl Machine for Reader {
    fn sink(&mut self, buf: &[u8]) -> Result<(bool, usize), HeatshrinkError> {
        Reader::sink(self, buf)
    }

    fn poll(&mut self, out_buf_size: usize) -> Result<(bool, Vec<u8>), HeatshrinkError> {
        Reader::poll(self, out_buf_size)
    }

    fn finish(&mut self) -> Result<bool, HeatshrinkError> {
        Reader::finish(self)
    }

    fn max_output_size(&self) -> usize {
        Reader::max_output_size(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coder::Coder;
    use crate::encoder::Writer;

    #[test]
    fn sink_reports_full_when_at_capacity() {
        let mut r = Reader::new(4, 8, 4).unwrap();
        r.sink(&[1, 2, 3, 4]).unwrap();
        let (full, sunk) = r.sink(&[5]).unwrap();
        assert!(full);
        assert_eq!(sunk, 0);
    }

    #[test]
    fn decode_literal_vector() {
        let mut r = Reader::new(256, 11, 4).unwrap();
        r.sink(b"\xb0\xd8\xacvK(").unwrap();
        let (_, out) = r.poll(256).unwrap();
        assert_eq!(out, b"abcde");
    }

    #[test]
    fn large_window_round_trips_with_msb_states() {
        let data: Vec<u8> = (0..5000u32).map(|i| ((i * 37) % 241) as u8).collect();

        let mut enc = Coder::new(Writer::new(15, 9).unwrap());
        let mut compressed = enc.fill(&data).unwrap();
        compressed.extend(enc.finish().unwrap());

        let mut dec = Coder::new(Reader::new(256, 15, 9).unwrap());
        let mut decompressed = dec.fill(&compressed).unwrap();
        decompressed.extend(dec.finish().unwrap());

        assert_eq!(decompressed, data);
    }
}
