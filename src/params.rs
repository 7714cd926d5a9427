//! Configuration constants and parameter validation.
//!
//! Defaults and bounds are reproduced verbatim from
//! `original_source/heatshrinkpy/core/consts.py` (not retrieved directly,
//! but its values are pinned by `spec.md` §6 for wire compatibility with
//! existing compressed payloads) and the validation logic from
//! `original_source/heatshrinkpy/core/common.py`.

use crate::HeatshrinkError;

/// Default base-2 log of the sliding window size.
pub const DEFAULT_WINDOW_SZ2: u8 = 11;
/// Default base-2 log of the maximum back-reference length.
pub const DEFAULT_LOOKAHEAD_SZ2: u8 = 4;
/// Default capacity of the decoder's input staging ring.
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 256;

/// Smallest accepted `window_sz2`.
pub const MIN_WINDOW_SZ2: u8 = 4;
/// Largest accepted `window_sz2`.
pub const MAX_WINDOW_SZ2: u8 = 15;
/// Smallest accepted `lookahead_sz2`.
pub const MIN_LOOKAHEAD_SZ2: u8 = 3;

/// Validate `window_sz2` is within `[MIN_WINDOW_SZ2, MAX_WINDOW_SZ2]`.
pub(crate) fn validate_window_sz2(window_sz2: u8) -> Result<(), HeatshrinkError> {
    if !(MIN_WINDOW_SZ2..=MAX_WINDOW_SZ2).contains(&window_sz2) {
        return Err(HeatshrinkError::InvalidArgument(format!(
            "window_sz2 must be {MIN_WINDOW_SZ2} <= number <= {MAX_WINDOW_SZ2}"
        )));
    }
    Ok(())
}

/// Validate `lookahead_sz2` is within `[MIN_LOOKAHEAD_SZ2, window_sz2]`.
pub(crate) fn validate_lookahead_sz2(
    lookahead_sz2: u8,
    window_sz2: u8,
) -> Result<(), HeatshrinkError> {
    if !(MIN_LOOKAHEAD_SZ2..=window_sz2).contains(&lookahead_sz2) {
        return Err(HeatshrinkError::InvalidArgument(format!(
            "lookahead_sz2 must be {MIN_LOOKAHEAD_SZ2} <= number <= {window_sz2}"
        )));
    }
    Ok(())
}

/// Validate the decoder's `input_buffer_size` is non-zero.
pub(crate) fn validate_input_buffer_size(value: usize) -> Result<(), HeatshrinkError> {
    if value == 0 {
        return Err(HeatshrinkError::InvalidArgument(
            "input_buffer_size must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn window_sz2_bounds() {
        assert!(validate_window_sz2(3).is_err());
        assert!(validate_window_sz2(16).is_err());
        assert!(validate_window_sz2(4).is_ok());
        assert!(validate_window_sz2(15).is_ok());
    }

    #[test]
    fn lookahead_sz2_bounds() {
        assert!(validate_lookahead_sz2(2, 11).is_err());
        assert!(validate_lookahead_sz2(12, 11).is_err());
        assert!(validate_lookahead_sz2(3, 11).is_ok());
        assert!(validate_lookahead_sz2(11, 11).is_ok());
    }

    #[test]
    fn input_buffer_size_bounds() {
        assert!(validate_input_buffer_size(0).is_err());
        assert!(validate_input_buffer_size(1).is_ok());
    }
}
