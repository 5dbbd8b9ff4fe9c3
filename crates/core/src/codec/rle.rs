//! Signed run-length decoding down destination columns.
//!
//! Each run is introduced by a signed byte `r`: `r >= 0` repeats the next
//! literal byte `r + 1` times, `r < 0` copies the next `-r` bytes verbatim.
//! Runs fill one destination column top to bottom (stride = image width),
//! then continue into the next column. A run that finishes exactly at the
//! bottom of a column ends there; the next column starts with a fresh run
//! header. A run that is mid-flight at the column boundary carries over and
//! keeps emitting from the top of the next column — the stream has no
//! per-column alignment, so losing this carry desyncs everything after the
//! first column.

use super::CodecError;

/// Run state threaded across column boundaries.
#[derive(Clone, Copy)]
enum Run {
    /// Emit the held byte `remaining` more times.
    Repeat { value: u8, remaining: usize },
    /// Copy `remaining` more literal bytes from the source.
    Literal { remaining: usize },
    /// No run in flight; the next source byte is a run header.
    Idle,
}

/// Decode a column-major run-length stream into `dst`.
///
/// `dst` must hold at least `width * height` bytes; pixel (x, y) lands at
/// `dst[y * width + x]`. Returns the number of source bytes consumed, which
/// callers use to locate data packed after the image (mask sections).
pub fn decode_columns(
    src: &[u8],
    width: usize,
    height: usize,
    dst: &mut [u8],
) -> Result<usize, CodecError> {
    if width == 0 || height == 0 {
        return Ok(0);
    }
    let need = width * height;
    if dst.len() < need {
        return Err(CodecError::DestinationTooSmall {
            need,
            have: dst.len(),
        });
    }

    let mut pos = 0usize;
    let mut next = |pos: &mut usize| -> Result<u8, CodecError> {
        let b = *src
            .get(*pos)
            .ok_or(CodecError::SourceUnderrun { offset: *pos })?;
        *pos += 1;
        Ok(b)
    };

    let mut run = Run::Idle;
    for x in 0..width {
        let mut y = 0usize;
        while y < height {
            if matches!(run, Run::Idle) {
                let header = next(&mut pos)? as i8;
                run = if header >= 0 {
                    Run::Repeat {
                        value: next(&mut pos)?,
                        remaining: header as usize + 1,
                    }
                } else {
                    Run::Literal {
                        remaining: (-(header as i32)) as usize,
                    }
                };
            }
            let column_left = height - y;
            match &mut run {
                Run::Repeat { value, remaining } => {
                    let take = (*remaining).min(column_left);
                    for _ in 0..take {
                        dst[y * width + x] = *value;
                        y += 1;
                    }
                    *remaining -= take;
                    if *remaining == 0 {
                        run = Run::Idle;
                    }
                }
                Run::Literal { remaining } => {
                    let take = (*remaining).min(column_left);
                    for _ in 0..take {
                        dst[y * width + x] = next(&mut pos)?;
                        y += 1;
                    }
                    *remaining -= take;
                    if *remaining == 0 {
                        run = Run::Idle;
                    }
                }
                Run::Idle => unreachable!(),
            }
        }
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_then_literal_single_column() {
        // +2 repeats 0x05 three times, -1 copies one literal 0xAA.
        let src = [0x02, 0x05, 0xFF, 0xAA];
        let mut dst = [0u8; 4];
        let used = decode_columns(&src, 1, 4, &mut dst).unwrap();
        assert_eq!(dst, [0x05, 0x05, 0x05, 0xAA]);
        assert_eq!(used, 4);
    }

    #[test]
    fn test_run_carries_across_column_boundary() {
        // One repeat run of 6 pixels over a 2x3 image: fills column 0
        // (rows 0..3) then continues from the top of column 1.
        let src = [0x05, 0x07];
        let mut dst = [0u8; 6];
        decode_columns(&src, 2, 3, &mut dst).unwrap();
        assert_eq!(dst, [0x07; 6]);
    }

    #[test]
    fn test_literal_run_carries_across_column_boundary() {
        // -4: four literals spanning a 2x2 image column-major.
        let src = [0xFC, 1, 2, 3, 4];
        let mut dst = [0u8; 4];
        decode_columns(&src, 2, 2, &mut dst).unwrap();
        // Column 0 top-to-bottom gets 1, 2; column 1 gets 3, 4.
        assert_eq!(dst, [1, 3, 2, 4]);
    }

    #[test]
    fn test_run_ending_on_boundary_resets() {
        // First run fills column 0 exactly; column 1 must re-read a header.
        let src = [0x01, 0xAA, 0x01, 0xBB];
        let mut dst = [0u8; 4];
        let used = decode_columns(&src, 2, 2, &mut dst).unwrap();
        assert_eq!(dst, [0xAA, 0xBB, 0xAA, 0xBB]);
        assert_eq!(used, 4);
    }

    #[test]
    fn test_zero_dimensions_are_noop() {
        let mut dst = [0u8; 1];
        assert_eq!(decode_columns(&[0x00, 0xFF], 0, 4, &mut dst).unwrap(), 0);
        assert_eq!(decode_columns(&[0x00, 0xFF], 4, 0, &mut dst).unwrap(), 0);
        assert_eq!(dst[0], 0);
    }

    #[test]
    fn test_destination_too_small() {
        let src = [0x03, 0xAA];
        let mut dst = [0u8; 3];
        assert_eq!(
            decode_columns(&src, 2, 2, &mut dst),
            Err(CodecError::DestinationTooSmall { need: 4, have: 3 })
        );
    }

    #[test]
    fn test_truncated_source() {
        // Header promises 4 literals but only 2 follow.
        let src = [0xFC, 1, 2];
        let mut dst = [0u8; 4];
        assert_eq!(
            decode_columns(&src, 1, 4, &mut dst),
            Err(CodecError::SourceUnderrun { offset: 3 })
        );
    }

    #[test]
    fn test_consumed_bytes_locate_trailing_data() {
        let src = [0x03, 0x11, 0xDE, 0xAD];
        let mut dst = [0u8; 4];
        let used = decode_columns(&src, 1, 4, &mut dst).unwrap();
        assert_eq!(&src[used..], &[0xDE, 0xAD]);
    }
}
