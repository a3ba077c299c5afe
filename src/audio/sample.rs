use std::fmt::Debug;

use num_traits::{Bounded, Num, ToPrimitive};

/// A sample type that can be mapped to and from the normalized `[-1.0, 1.0]` range.
///
/// Only the two representations that cross the wire are implemented: `f32` for
/// everything the client processes and `i16` for the PCM payload.
pub trait AudioSample:
    Num + Copy + Send + Sync + PartialOrd + ToPrimitive + Bounded + Debug + 'static
{
    fn silence() -> Self;

    fn to_f64_normalized(self) -> f64;

    fn from_f64_normalized(value: f64) -> Self;
}

impl AudioSample for f32 {
    fn silence() -> Self {
        0.0
    }

    fn to_f64_normalized(self) -> f64 {
        self as f64
    }

    fn from_f64_normalized(value: f64) -> Self {
        value.clamp(-1.0, 1.0) as f32
    }
}

/// Decoding divides by 32768 so `i16::MIN` maps exactly to -1.0. Encoding
/// scales by 32767 so +1.0 never overflows.
impl AudioSample for i16 {
    fn silence() -> Self {
        0
    }

    fn to_f64_normalized(self) -> f64 {
        self as f64 / 32768.0
    }

    fn from_f64_normalized(value: f64) -> Self {
        // `as` truncates toward zero.
        (value.clamp(-1.0, 1.0) * i16::MAX as f64) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_decode_range() {
        assert_eq!(i16::MIN.to_f64_normalized(), -1.0);
        assert_eq!(0i16.to_f64_normalized(), 0.0);
        assert!(i16::MAX.to_f64_normalized() < 1.0);
    }

    #[test]
    fn test_i16_encode_clamps_and_truncates() {
        assert_eq!(i16::from_f64_normalized(1.0), i16::MAX);
        assert_eq!(i16::from_f64_normalized(2.5), i16::MAX);
        assert_eq!(i16::from_f64_normalized(-3.0), -i16::MAX);
        // 0.5 * 32767 = 16383.5, truncated toward zero.
        assert_eq!(i16::from_f64_normalized(0.5), 16383);
        assert_eq!(i16::from_f64_normalized(-0.5), -16383);
    }

    #[test]
    fn test_f32_clamps() {
        assert_eq!(f32::from_f64_normalized(1.5), 1.0);
        assert_eq!(f32::from_f64_normalized(-0.25), -0.25);
        assert_eq!(f32::silence(), 0.0);
    }
}
