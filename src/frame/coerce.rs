//! Raw buffer coercion.
//!
//! Every function here matches on [`RawBuffer`] exhaustively; element types
//! a target shape cannot take end in an unsupported-type error.

use crate::container::RawBuffer;
use crate::util::{Error, Result, Value};

/// Convert a leaf buffer to canonical column values.
///
/// | raw                      | value                 |
/// |--------------------------|-----------------------|
/// | int8/16/32/64            | `Int(i64)`            |
/// | uint8/16/32              | `Int(i64)`            |
/// | uint64                   | `UInt(u64)`           |
/// | float32/64               | `Float(f64)`          |
/// | bool                     | `Bool`                |
/// | string                   | `Str`                 |
pub fn to_values(buffer: RawBuffer) -> Result<Vec<Value>> {
    fn ints<T: Into<i64>>(v: Vec<T>) -> Vec<Value> {
        v.into_iter().map(|x| Value::Int(x.into())).collect()
    }

    Ok(match buffer {
        RawBuffer::Int8(v) => ints(v),
        RawBuffer::Int16(v) => ints(v),
        RawBuffer::Int32(v) => ints(v),
        RawBuffer::Int64(v) => ints(v),
        RawBuffer::Uint8(v) => ints(v),
        RawBuffer::Uint16(v) => ints(v),
        RawBuffer::Uint32(v) => ints(v),
        RawBuffer::Uint64(v) => v.into_iter().map(Value::UInt).collect(),
        RawBuffer::Float32(v) => v.into_iter().map(|x| Value::Float(f64::from(x))).collect(),
        RawBuffer::Float64(v) => v.into_iter().map(Value::Float).collect(),
        RawBuffer::Bool(v) => v.into_iter().map(Value::Bool).collect(),
        RawBuffer::Str(v) => v.into_iter().map(Value::Str).collect(),
        RawBuffer::Unsupported(name) => {
            return Err(Error::unsupported(format!("array element type {name}")))
        }
    })
}

/// Convert an index buffer to row labels.
///
/// Strings pass through; integers become their decimal form.
pub fn to_labels(buffer: RawBuffer) -> Result<Vec<String>> {
    fn decimal<T: ToString>(v: Vec<T>) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    Ok(match buffer {
        RawBuffer::Str(v) => v,
        RawBuffer::Int8(v) => decimal(v),
        RawBuffer::Int16(v) => decimal(v),
        RawBuffer::Int32(v) => decimal(v),
        RawBuffer::Int64(v) => decimal(v),
        RawBuffer::Uint8(v) => decimal(v),
        RawBuffer::Uint16(v) => decimal(v),
        RawBuffer::Uint32(v) => decimal(v),
        RawBuffer::Uint64(v) => decimal(v),
        other @ (RawBuffer::Bool(_)
        | RawBuffer::Float32(_)
        | RawBuffer::Float64(_)
        | RawBuffer::Unsupported(_)) => {
            return Err(Error::unsupported(format!(
                "index element type {}",
                other.type_name()
            )))
        }
    })
}

/// Convert a categorical codes buffer to signed codes.
///
/// Signed interpretation is kept: `-1` marks a missing value.
pub fn to_codes(buffer: RawBuffer) -> Result<Vec<i64>> {
    fn widen<T: Into<i64>>(v: Vec<T>) -> Vec<i64> {
        v.into_iter().map(Into::into).collect()
    }

    Ok(match buffer {
        RawBuffer::Int8(v) => widen(v),
        RawBuffer::Int16(v) => widen(v),
        RawBuffer::Int32(v) => widen(v),
        RawBuffer::Int64(v) => v,
        RawBuffer::Uint8(v) => widen(v),
        RawBuffer::Uint16(v) => widen(v),
        RawBuffer::Uint32(v) => widen(v),
        // Saturate: anything past i64::MAX is out of range for any category list.
        RawBuffer::Uint64(v) => v
            .into_iter()
            .map(|x| i64::try_from(x).unwrap_or(i64::MAX))
            .collect(),
        other @ (RawBuffer::Bool(_)
        | RawBuffer::Float32(_)
        | RawBuffer::Float64(_)
        | RawBuffer::Str(_)
        | RawBuffer::Unsupported(_)) => {
            return Err(Error::unsupported(format!(
                "categorical codes of type {}",
                other.type_name()
            )))
        }
    })
}

/// Convert a nullable-column mask to booleans (`true` = missing).
///
/// Accepts booleans, any integer width (non-zero = true), and strings where
/// `"TRUE"` (any case) or `"1"` is true.
pub fn to_mask(buffer: RawBuffer) -> Result<Vec<bool>> {
    fn nonzero<T: Default + PartialEq>(v: Vec<T>) -> Vec<bool> {
        let zero = T::default();
        v.into_iter().map(|x| x != zero).collect()
    }

    Ok(match buffer {
        RawBuffer::Bool(v) => v,
        RawBuffer::Int8(v) => nonzero(v),
        RawBuffer::Int16(v) => nonzero(v),
        RawBuffer::Int32(v) => nonzero(v),
        RawBuffer::Int64(v) => nonzero(v),
        RawBuffer::Uint8(v) => nonzero(v),
        RawBuffer::Uint16(v) => nonzero(v),
        RawBuffer::Uint32(v) => nonzero(v),
        RawBuffer::Uint64(v) => nonzero(v),
        RawBuffer::Str(v) => v
            .iter()
            .map(|s| s.eq_ignore_ascii_case("TRUE") || s == "1")
            .collect(),
        other @ (RawBuffer::Float32(_) | RawBuffer::Float64(_) | RawBuffer::Unsupported(_)) => {
            return Err(Error::unsupported(format!(
                "mask of type {}",
                other.type_name()
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_widths_roundtrip() {
        let cases = [
            (RawBuffer::Int8(vec![i8::MIN, -1, 0, i8::MAX]), vec![i8::MIN as i64, -1, 0, i8::MAX as i64]),
            (RawBuffer::Int16(vec![i16::MIN, 0, i16::MAX]), vec![i16::MIN as i64, 0, i16::MAX as i64]),
            (RawBuffer::Int32(vec![i32::MIN, 7, i32::MAX]), vec![i32::MIN as i64, 7, i32::MAX as i64]),
            (RawBuffer::Int64(vec![i64::MIN, 42, i64::MAX]), vec![i64::MIN, 42, i64::MAX]),
        ];
        for (buffer, expected) in cases {
            let values = to_values(buffer).unwrap();
            let expected: Vec<Value> = expected.into_iter().map(Value::Int).collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_unsigned_widths() {
        assert_eq!(
            to_values(RawBuffer::Uint8(vec![0, 200, 255])).unwrap(),
            vec![Value::Int(0), Value::Int(200), Value::Int(255)]
        );
        assert_eq!(
            to_values(RawBuffer::Uint32(vec![u32::MAX])).unwrap(),
            vec![Value::Int(u32::MAX as i64)]
        );
        assert_eq!(
            to_values(RawBuffer::Uint64(vec![u64::MAX])).unwrap(),
            vec![Value::UInt(u64::MAX)]
        );
    }

    #[test]
    fn test_floats_bools_strings() {
        assert_eq!(
            to_values(RawBuffer::Float32(vec![1.5, -0.25])).unwrap(),
            vec![Value::Float(1.5), Value::Float(-0.25)]
        );
        assert_eq!(
            to_values(RawBuffer::Bool(vec![true, false])).unwrap(),
            vec![Value::Bool(true), Value::Bool(false)]
        );
        assert_eq!(
            to_values(RawBuffer::Str(vec!["x".into()])).unwrap(),
            vec![Value::from("x")]
        );
    }

    #[test]
    fn test_unsupported_element() {
        let err = to_values(RawBuffer::Unsupported("compound".into())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(msg) if msg.contains("compound")));
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            to_labels(RawBuffer::Int64(vec![0, 1, -2])).unwrap(),
            vec!["0", "1", "-2"]
        );
        assert_eq!(
            to_labels(RawBuffer::Str(vec!["AAAC".into()])).unwrap(),
            vec!["AAAC"]
        );
        assert!(to_labels(RawBuffer::Float64(vec![1.0])).is_err());
    }

    #[test]
    fn test_codes_keep_sign() {
        assert_eq!(to_codes(RawBuffer::Int8(vec![-1, 0, 3])).unwrap(), vec![-1, 0, 3]);
        assert_eq!(to_codes(RawBuffer::Uint8(vec![255])).unwrap(), vec![255]);
        assert_eq!(to_codes(RawBuffer::Uint64(vec![u64::MAX])).unwrap(), vec![i64::MAX]);
        assert!(to_codes(RawBuffer::Float32(vec![0.0])).is_err());
    }

    #[test]
    fn test_mask_encodings() {
        assert_eq!(to_mask(RawBuffer::Uint8(vec![0, 1, 7])).unwrap(), vec![false, true, true]);
        assert_eq!(to_mask(RawBuffer::Int32(vec![0, -1])).unwrap(), vec![false, true]);
        let strings = RawBuffer::Str(vec!["TRUE".into(), "true".into(), "1".into(), "FALSE".into(), "yes".into()]);
        assert_eq!(to_mask(strings).unwrap(), vec![true, true, true, false, false]);
        assert!(to_mask(RawBuffer::Float64(vec![1.0])).is_err());
    }
}
