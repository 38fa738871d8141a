//! Type-coercing assignment of loosely-typed values to declared attributes
//!
//! Each declared [`AttributeType`] owns one coercion rule. A rule either
//! produces the value to store, asks for the field to be left unset, or
//! declines (returns `None`), in which case the raw value is stored verbatim.

use crate::{AttributeType, Value};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Outcome of coercing one value
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Store this value
    Set(Value),
    /// Clear the field
    Unset,
}

type Rule = fn(&Value, AttributeType) -> Option<Coerced>;

const RULES: &[(AttributeType, Rule)] = &[
    (AttributeType::String, to_text),
    (AttributeType::Integer16, to_integer),
    (AttributeType::Integer32, to_integer),
    (AttributeType::Integer64, to_integer),
    (AttributeType::Boolean, to_boolean),
    (AttributeType::Decimal, to_floating),
    (AttributeType::Float, to_floating),
    (AttributeType::Double, to_floating),
    (AttributeType::Date, to_date),
];

/// Date layout accepted for string input: `yyyy-MM-dd HH:mm:ss <zone>`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coerce a raw value for an attribute of the declared type
///
/// Never fails. Null clears the field without consulting the rules.
pub fn coerce(raw: Value, declared: AttributeType) -> Coerced {
    if raw.is_null() {
        return Coerced::Unset;
    }
    RULES
        .iter()
        .find(|(ty, _)| *ty == declared)
        .and_then(|(_, rule)| rule(&raw, declared))
        .unwrap_or(Coerced::Set(raw))
}

fn to_text(raw: &Value, _: AttributeType) -> Option<Coerced> {
    let text = match raw {
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        _ => return None,
    };
    Some(Coerced::Set(Value::String(text)))
}

fn to_integer(raw: &Value, declared: AttributeType) -> Option<Coerced> {
    let n = leading_int(raw.as_str()?);
    let n = match declared {
        AttributeType::Integer16 => n.clamp(i16::MIN as i64, i16::MAX as i64),
        AttributeType::Integer32 => n.clamp(i32::MIN as i64, i32::MAX as i64),
        _ => n,
    };
    Some(Coerced::Set(Value::Int(n)))
}

fn to_boolean(raw: &Value, _: AttributeType) -> Option<Coerced> {
    Some(Coerced::Set(Value::Bool(truthy(raw.as_str()?))))
}

fn to_floating(raw: &Value, _: AttributeType) -> Option<Coerced> {
    Some(Coerced::Set(Value::Float(leading_float(raw.as_str()?))))
}

fn to_date(raw: &Value, _: AttributeType) -> Option<Coerced> {
    Some(match parse_date(raw.as_str()?) {
        Some(date) => Coerced::Set(Value::Date(date)),
        None => Coerced::Unset,
    })
}

/// Parse the leading integer of a string: `"  42abc"` -> 42, `"abc"` -> 0
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit and saturates on overflow.
pub fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = (b - b'0') as i64;
        n = if negative {
            n.saturating_mul(10).saturating_sub(d)
        } else {
            n.saturating_mul(10).saturating_add(d)
        };
    }
    n
}

/// Parse the leading floating-point number of a string, 0.0 if there is none
pub fn leading_float(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return 0.0;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

/// Truthy-string rule: after whitespace, a sign and leading zeros, the
/// first character must be one of `Y y T t 1-9`
pub fn truthy(s: &str) -> bool {
    let s = s.trim_start();
    let s = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    let s = s.trim_start_matches('0');
    matches!(s.chars().next(), Some('Y' | 'y' | 'T' | 't' | '1'..='9'))
}

/// Parse `yyyy-MM-dd HH:mm:ss <zone>` into a UTC timestamp
///
/// The zone may be `UTC`, `GMT`, `Z`, `GMT+H[H][:MM]` / `UTC+...`, or a
/// bare `+HHMM` / `+HH:MM` offset.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let mut parts = s.trim().splitn(3, ' ');
    let date = parts.next()?;
    let time = parts.next()?;
    let zone = parts.next()?.trim();

    let naive = NaiveDateTime::parse_from_str(&format!("{} {}", date, time), DATE_FORMAT).ok()?;
    let offset = FixedOffset::east_opt(zone_offset_seconds(zone)?)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn zone_offset_seconds(zone: &str) -> Option<i32> {
    let upper = zone.to_ascii_uppercase();
    let rest = match upper.as_str() {
        "UTC" | "GMT" | "Z" => return Some(0),
        _ => upper
            .strip_prefix("GMT")
            .or_else(|| upper.strip_prefix("UTC"))
            .unwrap_or(upper.as_str()),
    };

    let (sign, body) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h, m),
        None if body.len() == 4 => body.split_at(2),
        None => (body, "0"),
    };
    if hours.is_empty() || hours.len() > 2 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 18 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn set(v: impl Into<Value>) -> Coerced {
        Coerced::Set(v.into())
    }

    #[test]
    fn test_numbers_into_text() {
        assert_eq!(coerce(Value::Int(42), AttributeType::String), set("42"));
        assert_eq!(coerce(Value::Float(3.5), AttributeType::String), set("3.5"));
        assert_eq!(coerce(Value::Float(2.0), AttributeType::String), set("2"));
        assert_eq!(coerce(Value::Bool(true), AttributeType::String), set("1"));
        assert_eq!(coerce(Value::from("as is"), AttributeType::String), set("as is"));
    }

    #[test]
    fn test_text_into_integer() {
        assert_eq!(coerce(Value::from("42"), AttributeType::Integer64), set(42i64));
        assert_eq!(coerce(Value::from("abc"), AttributeType::Integer64), set(0i64));
        assert_eq!(coerce(Value::from(" -12px"), AttributeType::Integer32), set(-12i64));
        assert_eq!(coerce(Value::from("3.9"), AttributeType::Integer64), set(3i64));
        assert_eq!(coerce(Value::from("70000"), AttributeType::Integer16), set(i16::MAX as i64));
        assert_eq!(leading_int("99999999999999999999"), i64::MAX);
        // non-text values are left alone
        assert_eq!(coerce(Value::Float(1.5), AttributeType::Integer64), set(1.5));
    }

    #[test]
    fn test_text_into_boolean() {
        for yes in ["YES", "yes", "true", "T", "1", "  42", "+7", "0001"] {
            assert_eq!(coerce(Value::from(yes), AttributeType::Boolean), set(true), "{}", yes);
        }
        for no in ["NO", "false", "0", "", "abc", "-0"] {
            assert_eq!(coerce(Value::from(no), AttributeType::Boolean), set(false), "{}", no);
        }
    }

    #[test]
    fn test_text_into_float() {
        assert_eq!(coerce(Value::from("2.5"), AttributeType::Double), set(2.5));
        assert_eq!(coerce(Value::from("1e3x"), AttributeType::Float), set(1000.0));
        assert_eq!(coerce(Value::from("-.5"), AttributeType::Decimal), set(-0.5));
        assert_eq!(coerce(Value::from("abc"), AttributeType::Double), set(0.0));
        assert_eq!(leading_float("7e"), 7.0);
        assert_eq!(leading_float("."), 0.0);
    }

    #[test]
    fn test_text_into_date() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(
            coerce(Value::from("2024-03-01 12:30:00 UTC"), AttributeType::Date),
            set(expected)
        );
        assert_eq!(
            coerce(Value::from("2024-03-01 14:30:00 GMT+2"), AttributeType::Date),
            set(expected)
        );
        assert_eq!(
            coerce(Value::from("2024-03-01 07:00:00 -0530"), AttributeType::Date),
            set(expected)
        );
        assert_eq!(
            coerce(Value::from("2024-03-01 13:30:00 +01:00"), AttributeType::Date),
            set(expected)
        );
    }

    #[test]
    fn test_malformed_date_is_unset() {
        for bad in ["2024-03-01", "yesterday", "2024-13-01 00:00:00 UTC", "2024-03-01 12:30:00 Mars"] {
            assert_eq!(coerce(Value::from(bad), AttributeType::Date), Coerced::Unset, "{}", bad);
        }
    }

    #[test]
    fn test_null_clears() {
        for ty in [AttributeType::String, AttributeType::Integer64, AttributeType::Date, AttributeType::Other] {
            assert_eq!(coerce(Value::Null, ty), Coerced::Unset);
        }
    }

    #[test]
    fn test_fallback_is_verbatim() {
        let bytes = Value::Binary(vec![1, 2, 3]);
        assert_eq!(coerce(bytes.clone(), AttributeType::Binary), Coerced::Set(bytes));
        assert_eq!(coerce(Value::from("x"), AttributeType::Other), set("x"));
        assert_eq!(coerce(Value::Int(5), AttributeType::Boolean), set(5i64));
    }
}
