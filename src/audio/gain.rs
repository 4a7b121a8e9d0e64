//! Per-block gain processing.

use log::warn;

/// Lowest representable sample value.
pub const SAMPLE_MIN: f32 = -32_768.0;
/// Highest representable sample value.
pub const SAMPLE_MAX: f32 = 32_767.0;

/// Scale every sample by `gain`, hard-clipping into the signed 16-bit
/// range (saturating, not wrapping). The output block has the same
/// length as the input.
///
/// A non-finite gain cannot produce meaningful samples; the block passes
/// through unmodified so the capture loop keeps running.
pub fn apply(block: &[i16], gain: f32) -> Vec<i16> {
    if !gain.is_finite() {
        warn!("non-finite gain {gain}; passing block through unmodified");
        return block.to_vec();
    }
    block
        .iter()
        .map(|&s| (s as f32 * gain).clamp(SAMPLE_MIN, SAMPLE_MAX) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_gain_is_identity() {
        let block: Vec<i16> = vec![i16::MIN, -1234, -1, 0, 1, 1234, i16::MAX];
        assert_eq!(apply(&block, 1.0), block);
    }

    #[test]
    fn output_always_within_sample_range() {
        let block: Vec<i16> = vec![i16::MIN, -20_000, -1, 0, 1, 20_000, i16::MAX];
        for gain in [0.0, 0.5, 1.0, 5.0, 1_000.0, -3.0, f32::MAX] {
            let out = apply(&block, gain);
            assert_eq!(out.len(), block.len());
            // Every i16 is in range by type; what matters is that the
            // cast saturated instead of wrapping.
            assert_eq!(apply(&[i16::MAX], gain.abs().max(1.0))[0], i16::MAX);
        }
        assert_eq!(apply(&[20_000], 5.0), vec![i16::MAX]);
        assert_eq!(apply(&[-20_000], 5.0), vec![i16::MIN]);
    }

    #[test]
    fn silence_stays_silent_under_any_gain() {
        let block = vec![0i16; 1024];
        for gain in [0.0, 1.0, 5.0, 1_000.0] {
            assert!(apply(&block, gain).iter().all(|&s| s == 0));
        }
    }

    #[test]
    fn non_finite_gain_passes_block_through() {
        let block: Vec<i16> = vec![-5, 0, 5, 300];
        assert_eq!(apply(&block, f32::NAN), block);
        assert_eq!(apply(&block, f32::INFINITY), block);
        assert_eq!(apply(&block, f32::NEG_INFINITY), block);
    }

    #[test]
    fn empty_block_is_fine() {
        assert!(apply(&[], 5.0).is_empty());
    }
}
