#![deny(warnings)]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Compression & decompression library implementing the Heatshrink variant
//! of LZSS, described here <https://github.com/atomicobject/heatshrink>
//! and here <https://spin.atomicobject.com/2013/03/14/heatshrink-embedded-data-compression/>.
//!
//! Unlike the fixed-parameter embedded ports this crate is descended from,
//! the sliding-window size and back-reference length are runtime
//! constructor parameters (see [`params`]), so [`encoder::Writer`] and
//! [`decoder::Reader`] allocate their buffers on construction rather than
//! baking them in as compile-time array sizes.

/// module to uncompress some compressed data
pub mod decoder;
/// module to compress data
pub mod encoder;

/// the high-level coder façade driving a [`Machine`](coder::Machine) through sink/poll/finish
pub mod coder;
/// configuration constants and parameter validation
pub mod params;

mod output;

pub use coder::{Coder, Machine};
pub use params::{
    DEFAULT_INPUT_BUFFER_SIZE, DEFAULT_LOOKAHEAD_SZ2, DEFAULT_WINDOW_SZ2, MAX_WINDOW_SZ2,
    MIN_LOOKAHEAD_SZ2, MIN_WINDOW_SZ2,
};

use std::fmt;

/// Error that can be encountered while (un)compressing data.
#[derive(Debug)]
pub enum HeatshrinkError {
    /// Construction parameters were out of range, or a mode string at the
    /// CLI layer was invalid.
    InvalidArgument(String),
    /// An operation was attempted in a state that forbids it (e.g. `sink`
    /// after `finish`, or any call on a closed [`Coder`]).
    InvalidState(String),
    /// An impossible state was reached. Indicates a bug in this crate.
    Internal(String),
    /// An I/O error was delegated from the underlying file or stream.
    Io(std::io::Error),
}

impl fmt::Display for HeatshrinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatshrinkError::InvalidArgument(msg) => write!(f, "{msg}"),
            HeatshrinkError::InvalidState(msg) => write!(f, "{msg}"),
            HeatshrinkError::Internal(msg) => write!(f, "internal error: {msg}"),
            HeatshrinkError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for HeatshrinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeatshrinkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HeatshrinkError {
    fn from(err: std::io::Error) -> Self {
        HeatshrinkError::Io(err)
    }
}

/// Compress `data` in one shot, returning the Heatshrink-encoded bytes.
///
/// Equivalent to feeding `data` through a [`Coder`] wrapping a freshly
/// constructed [`encoder::Writer`] and calling `finish`.
pub fn encode(data: &[u8], window_sz2: u8, lookahead_sz2: u8) -> Result<Vec<u8>, HeatshrinkError> {
    let writer = encoder::Writer::new(window_sz2, lookahead_sz2)?;
    let mut coder = Coder::new(writer);
    let mut out = coder.fill(data)?;
    out.extend(coder.finish()?);
    Ok(out)
}

/// Decompress `data` in one shot, returning the original bytes.
///
/// Equivalent to feeding `data` through a [`Coder`] wrapping a freshly
/// constructed [`decoder::Reader`] and calling `finish`.
pub fn decode(
    data: &[u8],
    input_buffer_size: usize,
    window_sz2: u8,
    lookahead_sz2: u8,
) -> Result<Vec<u8>, HeatshrinkError> {
    let reader = decoder::Reader::new(input_buffer_size, window_sz2, lookahead_sz2)?;
    let mut coder = Coder::new(reader);
    let mut out = coder.fill(data)?;
    out.extend(coder.finish()?);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    fn compare(src: &[u8]) {
        let compressed = encode(src, DEFAULT_WINDOW_SZ2, DEFAULT_LOOKAHEAD_SZ2).unwrap();
        let uncompressed = decode(
            &compressed,
            DEFAULT_INPUT_BUFFER_SIZE,
            DEFAULT_WINDOW_SZ2,
            DEFAULT_LOOKAHEAD_SZ2,
        )
        .unwrap();
        assert_eq!(src, uncompressed);
    }

    #[test]
    fn alpha() {
        let src = [
            33, 82, 149, 84, 52, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 147, 2, 0, 0, 0, 0, 0, 0, 242, 2, 241, 2, 240,
            2, 0, 0, 0, 0, 0, 0, 47, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0,
        ];
        compare(&src);
    }

    #[test]
    fn alpha2() {
        let src = [
            33, 82, 149, 84, 52, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 147, 2, 0, 0, 0, 0, 0, 0, 242, 2, 241, 2, 240,
            2, 0, 0, 0, 0, 0, 0, 47, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            12, 17,
        ];
        compare(&src);
    }

    #[test]
    fn beta() {
        let src = [
            189, 160, 51, 163, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 199, 0, 0, 0, 0, 0, 0, 0, 166, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 154, 0,
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0,
        ];
        compare(&src);
    }

    #[test]
    fn beta2() {
        let src: Vec<u8> = (0u8..=255).chain(0u8..=255).collect();
        compare(&src);
    }

    #[test]
    fn clib_compatibility() {
        // Compressed with window_sz2=8/lookahead_sz2=4 by the reference C
        // implementation; decoding it here cross-checks wire compatibility.
        let src = hex_literal::hex!("90D4B2B549A4082BE00F000E4C46DF2817C605F005B4BE0825F00280");
        let expected = hex_literal::hex!(
            "215295543402000000000000000000000000000000000000000000000000000000000000000000009302000000000000F202F102F0020000000000002F0400000000000000000000000000000000000000000000"
        );

        let decoded = decode(&src, DEFAULT_INPUT_BUFFER_SIZE, 8, 4).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn empty_round_trips_to_empty() {
        let compressed = encode(&[], DEFAULT_WINDOW_SZ2, DEFAULT_LOOKAHEAD_SZ2).unwrap();
        assert!(compressed.is_empty());
    }

    #[test]
    fn literal_vector_matches_defaults() {
        let compressed = encode(b"abcde", DEFAULT_WINDOW_SZ2, DEFAULT_LOOKAHEAD_SZ2).unwrap();
        assert_eq!(compressed, b"\xb0\xd8\xacvK(");
    }

    #[test]
    fn literal_vector_stable_under_window_8() {
        let compressed = encode(b"abcde", 8, DEFAULT_LOOKAHEAD_SZ2).unwrap();
        assert_eq!(compressed, b"\xb0\xd8\xacvK(");
    }

    #[test]
    fn literal_vector_stable_under_lookahead_3() {
        let compressed = encode(b"abcde", DEFAULT_WINDOW_SZ2, 3).unwrap();
        assert_eq!(compressed, b"\xb0\xd8\xacvK(");
    }

    #[test]
    fn decode_literal_vector() {
        let decoded = decode(
            b"\xb0\xd8\xacvK(",
            DEFAULT_INPUT_BUFFER_SIZE,
            11,
            DEFAULT_LOOKAHEAD_SZ2,
        )
        .unwrap();
        assert_eq!(decoded, b"abcde");
    }

    #[test]
    fn decode_literal_vector_lookahead_3() {
        let decoded = decode(
            b"\xb0\xd8\xacvK(",
            DEFAULT_INPUT_BUFFER_SIZE,
            DEFAULT_WINDOW_SZ2,
            3,
        )
        .unwrap();
        assert_eq!(decoded, b"abcde");
    }

    #[test]
    fn round_trip_a_string() {
        compare(b"a string");
    }

    #[test]
    fn different_parameters_may_change_output() {
        let a = encode(b"the quick brown fox the quick brown fox", 8, 4).unwrap();
        let b = encode(b"the quick brown fox the quick brown fox", 11, 4).unwrap();
        assert_ne!(a, b);

        let c = encode(b"the quick brown fox the quick brown fox", 11, 4).unwrap();
        let d = encode(b"the quick brown fox the quick brown fox", 11, 8).unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn invalid_window_sz2_rejected() {
        assert!(encoder::Writer::new(3, 3).is_err());
        assert!(encoder::Writer::new(16, 4).is_err());
    }

    #[test]
    fn invalid_lookahead_sz2_rejected() {
        assert!(encoder::Writer::new(11, 2).is_err());
        assert!(encoder::Writer::new(8, 9).is_err());
    }
}
