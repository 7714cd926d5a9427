//! The encoder ("Writer") state machine: sliding-window management,
//! longest-match search backed by a per-byte chained index, bit-level
//! output packing, and the ten-state protocol that emits tag bits,
//! literals, back-reference indices and back-reference lengths.

use crate::coder::Machine;
use crate::output::OutputSink;
use crate::params::{validate_lookahead_sz2, validate_window_sz2};
use crate::HeatshrinkError;

const HEATSHRINK_LITERAL_MARKER: u8 = 0x01;
const HEATSHRINK_BACKREF_MARKER: u8 = 0x00;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    NotFull,       /* input buffer not full enough */
    Filled,        /* buffer is full */
    Search,        /* searching for patterns */
    YieldTagBit,   /* yield tag bit */
    YieldLiteral,  /* emit literal byte */
    YieldBrIndex,  /* yielding backref index */
    YieldBrLength, /* yielding backref length */
    SaveBacklog,   /* copying buffer to backlog */
    FlushBits,     /* flush bit buffer */
    Done,          /* done */
}

/// The encoder instance.
///
/// `buffer` is laid out as two concatenated halves of length `W` each: the
/// low half (offsets `0..W`) is the backlog of already-compressed bytes
/// still addressable for back-references, the high half (offsets `W..2W`)
/// is the active window currently being compressed.
#[derive(Debug)]
pub struct Writer {
    window_sz2: u8,
    lookahead_sz2: u8,
    input_buffer_size: usize, // W
    lookahead_size: usize,    // L

    buffer: Vec<u8>,         // len 2W
    search_index: Vec<i32>,  // len 2W, -1 sentinel

    input_size: usize,
    match_scan_index: usize,
    match_length: usize,
    match_pos: usize,
    outgoing_bits: u32,
    outgoing_bits_count: u8,
    current_byte: u8,
    bit_index: u8,
    state: State,
    finishing: bool,
}

impl Writer {
    /// Construct a new encoder for the given `window_sz2`/`lookahead_sz2`.
    pub fn new(window_sz2: u8, lookahead_sz2: u8) -> Result<Self, HeatshrinkError> {
        validate_window_sz2(window_sz2)?;
        validate_lookahead_sz2(lookahead_sz2, window_sz2)?;

        let input_buffer_size = 1usize << window_sz2;
        let lookahead_size = 1usize << lookahead_sz2;

        let mut writer = Writer {
            window_sz2,
            lookahead_sz2,
            input_buffer_size,
            lookahead_size,
            buffer: Vec::new(),
            search_index: vec![0; 2 * input_buffer_size],
            input_size: 0,
            match_scan_index: 0,
            match_length: 0,
            match_pos: 0,
            outgoing_bits: 0,
            outgoing_bits_count: 0,
            current_byte: 0,
            bit_index: 0x80,
            state: State::NotFull,
            finishing: false,
        };
        writer.reset();
        Ok(writer)
    }

    /// The maximum number of compressed bytes a single `poll` can yield: `W`.
    pub fn max_output_size(&self) -> usize {
        self.input_buffer_size
    }

    /// Reset the encoder to its initial state, discarding any buffered input.
    pub fn reset(&mut self) {
        self.buffer = vec![0u8; 2 * self.input_buffer_size];
        self.input_size = 0;
        self.state = State::NotFull;
        self.match_scan_index = 0;
        self.bit_index = 0x80;
        self.current_byte = 0x00;
        self.match_length = 0;
        self.match_pos = 0;
        self.outgoing_bits = 0;
        self.outgoing_bits_count = 0;
        self.finishing = false;
        self.search_index.iter_mut().for_each(|m| *m = 0);
    }

    /// Add bytes to be compressed. Returns `(full, sunk_count)`; legal only
    /// while the encoder is in the `NotFull` state and not finishing.
    pub fn sink(&mut self, in_buf: &[u8]) -> Result<(bool, usize), HeatshrinkError> {
        if self.finishing {
            return Err(HeatshrinkError::InvalidState(
                "Can't sink more content when finishing".to_string(),
            ));
        }
        if self.state != State::NotFull {
            return Err(HeatshrinkError::InvalidState(
                "Can't sink more content before processing is done".to_string(),
            ));
        }

        let write_offset = self.input_buffer_size + self.input_size;
        let rem = self.input_buffer_size - self.input_size;
        let size = rem.min(in_buf.len());

        self.buffer[write_offset..write_offset + size].copy_from_slice(&in_buf[..size]);
        self.input_size += size;
        if size == rem {
            self.state = State::Filled;
        }

        Ok((false, size))
    }

    /// Drive the state machine, collecting up to `out_buf_size` compressed
    /// bytes. Returns `(more_available, output_bytes)`.
    pub fn poll(&mut self, out_buf_size: usize) -> Result<(bool, Vec<u8>), HeatshrinkError> {
        let mut sink = OutputSink::new(out_buf_size);

        loop {
            let in_state = self.state;

            match in_state {
                State::NotFull | State::Done => return Ok((false, sink.into_output())),
                State::Filled => {
                    self.do_indexing();
                    self.state = State::Search;
                }
                State::Search => self.state = self.step_search(),
                State::YieldTagBit => self.state = self.yield_tag_bit(&mut sink),
                State::YieldLiteral => self.state = self.yield_literal(&mut sink),
                State::YieldBrIndex => self.state = self.yield_br_index(&mut sink),
                State::YieldBrLength => self.state = self.yield_br_length(&mut sink),
                State::SaveBacklog => self.state = self.save_backlog(),
                State::FlushBits => self.state = self.flush_bit_buffer(&mut sink),
            }

            if self.state == in_state && sink.is_full() {
                return Ok((true, sink.into_output()));
            }
        }
    }

    /// Mark input as complete. Returns `true` once the encoder has reached
    /// its terminal `Done` state (all pending output drained via `poll`).
    pub fn finish(&mut self) -> Result<bool, HeatshrinkError> {
        self.finishing = true;
        if self.state == State::NotFull {
            self.state = State::Filled;
        }
        Ok(self.state == State::Done)
    }

    fn do_indexing(&mut self) {
        // Build an index array that contains flattened linked lists for the
        // previous instances of every byte value in the buffer: if
        // buffer[i] == buffer[j] for some j < i, and j is the most recent
        // such position, then search_index[i] == j (or -1 if none).
        let mut last: [i32; 256] = [-1; 256];
        let end = self.input_buffer_size + self.input_size;

        for i in 0..end {
            let v = self.buffer[i] as usize;
            self.search_index[i] = last[v];
            last[v] = i as i32;
        }
    }

    fn step_search(&mut self) -> State {
        let threshold = if self.finishing { 1 } else { self.lookahead_size };
        if self.match_scan_index as isize > self.input_size as isize - threshold as isize {
            return if self.finishing {
                State::FlushBits
            } else {
                State::SaveBacklog
            };
        }

        let end = self.input_buffer_size + self.match_scan_index;
        let start = end - self.input_buffer_size;
        let max_possible = self
            .lookahead_size
            .min(self.input_size - self.match_scan_index);

        match self.find_longest_match(start, end, max_possible) {
            None => {
                self.match_scan_index += 1;
                self.match_length = 0;
            }
            Some((pos, len)) => {
                self.match_pos = pos;
                self.match_length = len;
            }
        }
        State::YieldTagBit
    }

    fn yield_tag_bit(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldTagBit;
        }
        if self.match_length == 0 {
            self.push_bits(1, HEATSHRINK_LITERAL_MARKER, sink);
            State::YieldLiteral
        } else {
            self.push_bits(1, HEATSHRINK_BACKREF_MARKER, sink);
            self.outgoing_bits = (self.match_pos - 1) as u32;
            self.outgoing_bits_count = self.window_sz2;
            State::YieldBrIndex
        }
    }

    fn yield_literal(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldLiteral;
        }
        // Correct because `Search` advances match_scan_index before
        // transitioning here: the byte just sunk is at index - 1.
        let input_offset = self.input_buffer_size + self.match_scan_index - 1;
        let c = self.buffer[input_offset];
        self.push_bits(8, c, sink);
        State::Search
    }

    fn yield_br_index(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldBrIndex;
        }
        if self.push_outgoing_bits(sink) > 0 {
            State::YieldBrIndex
        } else {
            self.outgoing_bits = (self.match_length - 1) as u32;
            self.outgoing_bits_count = self.lookahead_sz2;
            State::YieldBrLength
        }
    }

    fn yield_br_length(&mut self, sink: &mut OutputSink) -> State {
        if !sink.can_take_byte() {
            return State::YieldBrLength;
        }
        if self.push_outgoing_bits(sink) > 0 {
            State::YieldBrLength
        } else {
            self.match_scan_index += self.match_length;
            self.match_length = 0;
            State::Search
        }
    }

    fn save_backlog(&mut self) -> State {
        // Shift the processed window down into the backlog half so it
        // remains addressable for future matches.
        let msi = self.match_scan_index;
        let rem = self.input_buffer_size - msi;
        let shift_sz = self.input_buffer_size + rem;
        self.buffer.copy_within(msi..msi + shift_sz, 0);
        self.match_scan_index = 0;
        self.input_size -= msi;
        State::NotFull
    }

    fn flush_bit_buffer(&mut self, sink: &mut OutputSink) -> State {
        if self.bit_index == 0x80 {
            State::Done
        } else if sink.can_take_byte() {
            sink.push_byte(self.current_byte);
            State::Done
        } else {
            State::FlushBits
        }
    }

    fn find_longest_match(
        &self,
        start: usize,
        end: usize,
        maxlen: usize,
    ) -> Option<(usize, usize)> {
        let mut match_maxlen = 0usize;
        let mut match_index = 0usize;
        let mut pos = self.search_index[end];

        while pos >= start as i32 {
            let p = pos as usize;
            if self.buffer[p + match_maxlen] != self.buffer[end + match_maxlen] {
                pos = self.search_index[p];
                continue;
            }

            let mut ml = 0usize;
            for candidate in 1..=maxlen {
                ml = candidate;
                if ml == maxlen || self.buffer[p + ml] != self.buffer[end + ml] {
                    break;
                }
            }

            if ml > match_maxlen {
                match_maxlen = ml;
                match_index = p;
                if ml == maxlen {
                    break;
                }
            }

            pos = self.search_index[p];
        }

        let break_even_point = 1usize + self.window_sz2 as usize + self.lookahead_sz2 as usize;
        if match_maxlen > break_even_point / 8 {
            Some((end - match_index, match_maxlen))
        } else {
            None
        }
    }

    fn push_outgoing_bits(&mut self, sink: &mut OutputSink) -> u8 {
        let count;
        let bits;

        if self.outgoing_bits_count > 8 {
            count = 8;
            bits = ((self.outgoing_bits >> (self.outgoing_bits_count - 8)) & 0xFF) as u8;
        } else {
            count = self.outgoing_bits_count;
            bits = (self.outgoing_bits & 0xFF) as u8;
        }

        if count > 0 {
            self.push_bits(count, bits, sink);
            self.outgoing_bits_count -= count;
        }

        count
    }

    fn push_bits(&mut self, count: u8, bits: u8, sink: &mut OutputSink) {
        if count == 8 && self.bit_index == 0x80 {
            sink.push_byte(bits);
        } else {
            for i in (0..count).rev() {
                if bits & (1 << i) != 0 {
                    self.current_byte |= self.bit_index;
                }
                self.bit_index >>= 1;
                if self.bit_index == 0 {
                    self.bit_index = 0x80;
                    sink.push_byte(self.current_byte);
                    self.current_byte = 0;
                }
            }
        }
    }
}

impl Machine for Writer {
    fn sink(&mut self, buf: &[u8]) -> Result<(bool, usize), HeatshrinkError> {
        Writer::sink(self, buf)
    }

    fn poll(&mut self, out_buf_size: usize) -> Result<(bool, Vec<u8>), HeatshrinkError> {
        Writer::poll(self, out_buf_size)
    }

    fn finish(&mut self) -> Result<bool, HeatshrinkError> {
        Writer::finish(self)
    }

    fn max_output_size(&self) -> usize {
        Writer::max_output_size(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::coder::Coder;

    #[test]
    fn sink_rejects_after_finish() {
        let mut w = Writer::new(8, 4).unwrap();
        w.sink(b"abc").unwrap();
        w.finish().unwrap();
        assert!(w.sink(b"more").is_err());
    }

    #[test]
    fn sink_fills_buffer_and_transitions() {
        let mut w = Writer::new(4, 3).unwrap(); // W = 16
        let (_, sunk) = w.sink(&[0u8; 16]).unwrap();
        assert_eq!(sunk, 16);
        assert_eq!(w.state, State::Filled);
    }

    #[test]
    fn streaming_chunks_match_bulk_input() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();

        let mut whole = Coder::new(Writer::new(11, 4).unwrap());
        let mut bulk = whole.fill(&data).unwrap();
        bulk.extend(whole.finish().unwrap());

        let mut chunked = Coder::new(Writer::new(11, 4).unwrap());
        let mut out = Vec::new();
        for chunk in data.chunks(7) {
            out.extend(chunked.fill(chunk).unwrap());
        }
        out.extend(chunked.finish().unwrap());

        assert_eq!(bulk, out);
    }
}
