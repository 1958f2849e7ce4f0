//! Typed get/set for leaf fields.
//!
//! Every leaf type implements [`Setting`], which decodes raw text into the
//! field and reports the current value as a [`Value`]. Types with their own
//! textual form implement [`TextDecode`] instead and are marked
//! `#[plugfig(text)]`; the field view always prefers that capability over the
//! kind rules.
//!
//! Kind rules:
//!
//! | Type | Accepted text |
//! |------|---------------|
//! | `String` | anything, verbatim |
//! | `bool` | `1 t T TRUE true True 0 f F FALSE false False` |
//! | integers | decimal, `0x`/`0o`/`0b` prefixes, leading-`0` octal, `_` separators |
//! | floats | decimal or exponent notation |
//! | `Duration` | `300ms`, `1.5h`, `1h30m`; units `ns us µs ms s m h` |
//! | `Vec<T>` | comma separated, each piece trimmed and decoded as `T` |
//! | maps | ignored |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use std::time::Duration;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

/// Why raw text could not be stored in a field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("invalid boolean {0:?}")]
    Bool(String),

    #[error("invalid integer {value:?}: {source}")]
    Int {
        value: String,
        source: ParseIntError,
    },

    #[error("invalid float {value:?}: {source}")]
    Float {
        value: String,
        source: ParseFloatError,
    },

    #[error("value {value} out of range for {kind}")]
    OutOfRange { value: String, kind: &'static str },

    #[error("invalid duration {value:?}: {reason}")]
    Duration { value: String, reason: &'static str },

    #[error("invalid {kind} {value:?}: {reason}")]
    Invalid {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("field {0} cannot be reached")]
    Unreachable(String),
}

impl ValueError {
    /// Convenience for [`TextDecode`] implementors.
    pub fn invalid(kind: &'static str, value: &str, reason: impl fmt::Display) -> Self {
        ValueError::Invalid {
            kind,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The current value of a field in a type-erased form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Duration(Duration),
    /// A value rendered through its own textual form.
    Text(String),
    List(Vec<Value>),
    /// An empty `Option`.
    None,
    /// A type `set` ignores (maps).
    Unsupported,
}

impl Value {
    /// Whether the value equals its type's zero value. Unsupported values are
    /// never considered zero since they cannot be compared.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::String(s) | Value::Text(s) => s.is_empty(),
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Duration(d) => d.is_zero(),
            Value::List(items) => items.is_empty(),
            Value::None => true,
            Value::Unsupported => false,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Duration(d) => write!(f, "{}", format_duration(*d)),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::None | Value::Unsupported => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) | Value::Text(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Duration(d) => serializer.serialize_str(&format_duration(*d)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::None => serializer.serialize_none(),
            Value::Unsupported => serializer.serialize_unit(),
        }
    }
}

/// A leaf type decoded through the kind rules.
pub trait Setting {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError>;

    /// Store an already-split list of items. Only sequences care about the
    /// split; everything else receives the items joined by `,`.
    fn set_items(&mut self, items: &[&str]) -> Result<(), ValueError> {
        self.set_text(&items.join(","))
    }

    fn value(&self) -> Value;
}

/// A type that decodes itself from text, taking precedence over the kind
/// rules. Fields of such types are marked `#[plugfig(text)]`.
pub trait TextDecode {
    fn decode_text(&mut self, text: &str) -> Result<(), ValueError>;

    fn encode_text(&self) -> String;
}

impl<T: TextDecode + Default> TextDecode for Option<T> {
    fn decode_text(&mut self, text: &str) -> Result<(), ValueError> {
        self.get_or_insert_with(T::default).decode_text(text)
    }

    fn encode_text(&self) -> String {
        self.as_ref().map(T::encode_text).unwrap_or_default()
    }
}

impl<T: TextDecode + Default> TextDecode for Vec<T> {
    fn decode_text(&mut self, text: &str) -> Result<(), ValueError> {
        let mut decoded = Vec::new();
        for piece in text.split(',') {
            let mut item = T::default();
            item.decode_text(piece.trim())?;
            decoded.push(item);
        }
        *self = decoded;
        Ok(())
    }

    fn encode_text(&self) -> String {
        self.iter()
            .map(T::encode_text)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Setting for String {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        text.clone_into(self);
        Ok(())
    }

    fn value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Setting for bool {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = parse_bool(text)?;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! signed_setting {
    ($($ty:ty),*) => {$(
        impl Setting for $ty {
            fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
                let wide = parse_signed(text)?;
                *self = <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                    value: text.to_string(),
                    kind: stringify!($ty),
                })?;
                Ok(())
            }

            fn value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }
    )*};
}

macro_rules! unsigned_setting {
    ($($ty:ty),*) => {$(
        impl Setting for $ty {
            fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
                let wide = parse_unsigned(text)?;
                *self = <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                    value: text.to_string(),
                    kind: stringify!($ty),
                })?;
                Ok(())
            }

            fn value(&self) -> Value {
                Value::Uint(*self as u64)
            }
        }
    )*};
}

signed_setting!(i8, i16, i32, i64, isize);
unsigned_setting!(u8, u16, u32, u64, usize);

impl Setting for f64 {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = parse_float(text)?;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Setting for f32 {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = parse_float(text)? as f32;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl Setting for Duration {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = parse_duration(text)?;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Duration(*self)
    }
}

impl Setting for PathBuf {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self = PathBuf::from(text);
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Text(self.to_string_lossy().into_owned())
    }
}

macro_rules! parsed_setting {
    ($($ty:ty => $kind:literal),*) => {$(
        impl Setting for $ty {
            fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
                *self = text
                    .parse()
                    .map_err(|e| ValueError::invalid($kind, text, e))?;
                Ok(())
            }

            fn value(&self) -> Value {
                Value::Text(self.to_string())
            }
        }
    )*};
}

parsed_setting!(
    IpAddr => "ip address",
    Ipv4Addr => "ipv4 address",
    Ipv6Addr => "ipv6 address",
    SocketAddr => "socket address"
);

impl<E: Setting + Default> Setting for Vec<E> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        let pieces: Vec<&str> = text.split(',').collect();
        self.set_items(&pieces)
    }

    fn set_items(&mut self, items: &[&str]) -> Result<(), ValueError> {
        let mut decoded = Vec::with_capacity(items.len());
        for item in items {
            let mut element = E::default();
            element.set_text(item.trim())?;
            decoded.push(element);
        }
        *self = decoded;
        Ok(())
    }

    fn value(&self) -> Value {
        Value::List(self.iter().map(Setting::value).collect())
    }
}

impl<T: Setting + Default> Setting for Option<T> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        let mut inner = T::default();
        inner.set_text(text)?;
        *self = Some(inner);
        Ok(())
    }

    fn set_items(&mut self, items: &[&str]) -> Result<(), ValueError> {
        let mut inner = T::default();
        inner.set_items(items)?;
        *self = Some(inner);
        Ok(())
    }

    fn value(&self) -> Value {
        match self {
            Some(inner) => inner.value(),
            None => Value::None,
        }
    }
}

impl<K, V, S> Setting for HashMap<K, V, S> {
    fn set_text(&mut self, _text: &str) -> Result<(), ValueError> {
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Unsupported
    }
}

impl<K, V> Setting for BTreeMap<K, V> {
    fn set_text(&mut self, _text: &str) -> Result<(), ValueError> {
        Ok(())
    }

    fn value(&self) -> Value {
        Value::Unsupported
    }
}

pub fn parse_bool(text: &str) -> Result<bool, ValueError> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ValueError::Bool(text.to_string())),
    }
}

/// Split an integer literal into sign, radix and digits.
fn integer_literal(text: &str) -> Result<(bool, u32, String), ValueError> {
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    if body.starts_with(['+', '-']) {
        return Err(ValueError::invalid("integer", text, "misplaced sign"));
    }

    let prefix = body.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits) = match prefix.as_deref() {
        Some("0x") => (16, &body[2..]),
        Some("0o") => (8, &body[2..]),
        Some("0b") => (2, &body[2..]),
        _ if body.len() > 1 && body.starts_with('0') => (8, &body[1..]),
        _ => (10, body),
    };

    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(ValueError::invalid("integer", text, "misplaced '_'"));
    }

    Ok((negative, radix, digits.replace('_', "")))
}

pub fn parse_signed(text: &str) -> Result<i64, ValueError> {
    let (negative, radix, digits) = integer_literal(text)?;
    let candidate = if negative { format!("-{digits}") } else { digits };
    i64::from_str_radix(&candidate, radix).map_err(|source| ValueError::Int {
        value: text.to_string(),
        source,
    })
}

pub fn parse_unsigned(text: &str) -> Result<u64, ValueError> {
    let (negative, radix, digits) = integer_literal(text)?;
    let candidate = if negative { format!("-{digits}") } else { digits };
    u64::from_str_radix(&candidate, radix).map_err(|source| ValueError::Int {
        value: text.to_string(),
        source,
    })
}

pub fn parse_float(text: &str) -> Result<f64, ValueError> {
    text.replace('_', "")
        .parse::<f64>()
        .map_err(|source| ValueError::Float {
            value: text.to_string(),
            source,
        })
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Negative durations are rejected since `std::time::Duration` cannot hold
/// them.
pub fn parse_duration(text: &str) -> Result<Duration, ValueError> {
    let fail = |reason| ValueError::Duration {
        value: text.to_string(),
        reason,
    };

    let mut rest = text.strip_prefix('+').unwrap_or(text);
    if rest.starts_with('-') {
        return Err(fail("negative durations are not supported"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(fail("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let whole = &rest[..int_len];
        rest = &rest[int_len..];

        let mut fraction = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            fraction = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }

        if whole.is_empty() && fraction.is_empty() {
            return Err(fail("expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            "" => return Err(fail("missing unit")),
            _ => return Err(fail("unknown unit")),
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| fail("number too large"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| fail("duration too large"))?;

        if !fraction.is_empty() {
            // Digits beyond nanosecond precision of an hour cannot matter.
            let fraction = &fraction[..fraction.len().min(18)];
            let numerator: u128 = fraction.parse().map_err(|_| fail("invalid fraction"))?;
            let denominator = 10u128.pow(fraction.len() as u32);
            nanos = nanos
                .checked_add(numerator * scale / denominator)
                .ok_or_else(|| fail("duration too large"))?;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| fail("duration too large"))?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| fail("duration too large"))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Render a duration in the same syntax [`parse_duration`] accepts, e.g.
/// `1h2m3.5s`, `250ms`, `0s`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = duration.as_secs();
    let (hours, minutes) = (secs / 3_600, (secs % 3_600) / 60);
    let seconds = decimal(
        u128::from(secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos()),
        NANOS_PER_SEC,
    );

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `value / unit` as a decimal with trailing zeros trimmed.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rest = value % unit;
    if rest == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let fraction = format!("{rest:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
