use crate::TrapCode;

/// Trapping float-to-integer truncation, as used by `i32.trunc_f32_s` and friends.
///
/// Returns [`TrapCode::InvalidConversion`] for NaN or infinite inputs and
/// [`TrapCode::IntegerOverflow`] when the truncated value does not fit the target type.
pub trait TryTruncateInto<T>: Sized {
    fn try_truncate_into(self) -> Result<T, TrapCode>;
}

macro_rules! impl_try_truncate {
    ($float:ty => $int:ty, min = $min:expr, max = $max:expr) => {
        impl TryTruncateInto<$int> for $float {
            fn try_truncate_into(self) -> Result<$int, TrapCode> {
                if self.is_nan() {
                    return Err(TrapCode::InvalidConversion);
                }
                let truncated = self.trunc();
                if truncated < $min || truncated > $max {
                    return Err(TrapCode::IntegerOverflow);
                }
                Ok(truncated as $int)
            }
        }
    };
}

impl_try_truncate!(f32 => i32, min = -2147483648.0f32, max = 2147483520.0f32);
impl_try_truncate!(f64 => i32, min = -2147483649.0f64, max = 2147483648.0f64);
impl_try_truncate!(f32 => i64, min = -9223372036854775808.0f32, max = 9223371487098961920.0f32);
impl_try_truncate!(f64 => i64, min = -9223372036854775808.0f64, max = 9223372036854775808.0f64);
impl_try_truncate!(f32 => u32, min = -1.0f32, max = 4294967040.0f32);
impl_try_truncate!(f64 => u32, min = -1.0f64, max = 4294967296.0f64);
impl_try_truncate!(f32 => u64, min = -1.0f32, max = 18446742974197923840.0f32);
impl_try_truncate!(f64 => u64, min = -1.0f64, max = 18446744073709551616.0f64);

/// Saturating `f32 -> i32` conversion: the non-trapping counterpart of `trunc_f32_s`.
pub fn wasm_f32_to_i32_sat(value: f32) -> i32 {
    if value.is_nan() {
        0
    } else {
        value.trunc().clamp(i32::MIN as f32, i32::MAX as f32) as i32
    }
}

/// Saturating `f64 -> i32` conversion.
pub fn wasm_f64_to_i32_sat(value: f64) -> i32 {
    if value.is_nan() {
        0
    } else {
        value.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    }
}

/// Saturating `f32 -> i64` conversion.
pub fn wasm_f32_to_i64_sat(value: f32) -> i64 {
    if value.is_nan() {
        0
    } else {
        value.trunc().clamp(i64::MIN as f32, i64::MAX as f32) as i64
    }
}

/// Saturating `f64 -> i64` conversion.
pub fn wasm_f64_to_i64_sat(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else {
        value.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapping_conversion_rejects_nan() {
        let result: Result<i32, _> = f32::NAN.try_truncate_into();
        assert_eq!(result, Err(TrapCode::InvalidConversion));
    }

    #[test]
    fn trapping_conversion_rejects_overflow() {
        let result: Result<i32, _> = 1.0e20f64.try_truncate_into();
        assert_eq!(result, Err(TrapCode::IntegerOverflow));
    }

    #[test]
    fn saturating_conversion_clamps_nan_to_zero() {
        assert_eq!(wasm_f64_to_i32_sat(f64::NAN), 0);
    }

    #[test]
    fn saturating_conversion_clamps_overflow() {
        assert_eq!(wasm_f64_to_i32_sat(1.0e20), i32::MAX);
        assert_eq!(wasm_f64_to_i32_sat(-1.0e20), i32::MIN);
    }
}
