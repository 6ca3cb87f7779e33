//! Literal rendering for dumped column values.
//!
//! Every data column is classified into a [`ValueKind`] once, from its
//! declared type, before any row is read. Each driver cell is then decoded
//! into a [`SqlValue`] for that kind and rendered into the exact bytes that
//! go inside an `INSERT ... VALUES (...)` tuple.

use chrono::{NaiveDate, NaiveDateTime};

use crate::core::db::connection::Value;
use crate::core::{DumpError, Result};

/// Literal for zero/unset temporal values.
pub const ZERO_TIMESTAMP: &str = "'0000-00-00 00:00:00'";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The closed set of literal forms a column can render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Unsigned,
    Float,
    /// Exact numeric, rendered with the server's own digits.
    Decimal,
    Bool,
    Text,
    /// Binary strings (`BINARY`, `VARBINARY`, `BIT`), rendered as hex.
    Bytes,
    /// Blobs, rendered as escaped quoted strings.
    RawBytes,
    Timestamp,
}

impl ValueKind {
    /// Classifies a declared column type such as `int(11) unsigned`.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::UnsupportedType` for types without a literal form.
    pub fn classify(column: &str, type_name: &str) -> Result<Self> {
        let lower = type_name.trim().to_ascii_lowercase();
        let base: String = lower
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        let unsigned = lower.split_whitespace().any(|w| w == "unsigned");

        let kind = match base.as_str() {
            "tinyint" if lower.starts_with("tinyint(1)") => ValueKind::Bool,
            "bool" | "boolean" => ValueKind::Bool,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "year" => {
                if unsigned {
                    ValueKind::Unsigned
                } else {
                    ValueKind::Integer
                }
            }
            "float" | "double" | "real" => ValueKind::Float,
            "decimal" | "numeric" | "dec" | "fixed" => ValueKind::Decimal,
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum"
            | "set" | "json" | "time" => ValueKind::Text,
            "binary" | "varbinary" | "bit" => ValueKind::Bytes,
            "tinyblob" | "blob" | "mediumblob" | "longblob" => ValueKind::RawBytes,
            "date" | "datetime" | "timestamp" => ValueKind::Timestamp,
            _ => {
                return Err(DumpError::UnsupportedType {
                    column: column.to_string(),
                    type_name: type_name.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

/// A decoded column value, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Decimal(String),
    Bool(bool),
    /// Character data in the connection charset, not necessarily UTF-8.
    Text(Vec<u8>),
    Bytes(Vec<u8>),
    RawBytes(Vec<u8>),
    /// `None` is the zero timestamp.
    Timestamp(Option<NaiveDateTime>),
    /// Date with a zero month or day, normalized to `YYYY-MM-DD HH:MM:SS`.
    PartialTimestamp(String),
}

impl SqlValue {
    /// Decodes a driver cell for a column of the given kind.
    ///
    /// Text-protocol payloads (`Value::Bytes`) are parsed for numeric and
    /// temporal kinds; typed payloads must match the kind.
    pub fn decode(value: Value, kind: ValueKind, column: &str) -> Result<Self> {
        let decoded = match (kind, value) {
            (_, Value::Null) => SqlValue::Null,

            (ValueKind::Integer, Value::Int(i)) => SqlValue::Integer(i),
            (ValueKind::Integer, Value::UInt(u)) => i64::try_from(u)
                .map(SqlValue::Integer)
                .map_err(|_| DumpError::render(column, format!("{} overflows a signed integer", u)))?,
            (ValueKind::Integer, Value::Bytes(b)) => SqlValue::Integer(parse_text(&b, column)?),

            (ValueKind::Unsigned, Value::UInt(u)) => SqlValue::Unsigned(u),
            (ValueKind::Unsigned, Value::Int(i)) => u64::try_from(i)
                .map(SqlValue::Unsigned)
                .map_err(|_| DumpError::render(column, format!("{} is negative", i)))?,
            (ValueKind::Unsigned, Value::Bytes(b)) => SqlValue::Unsigned(parse_text(&b, column)?),

            (ValueKind::Float, Value::Float(f)) => finite(f as f64, column)?,
            (ValueKind::Float, Value::Double(d)) => finite(d, column)?,
            (ValueKind::Float, Value::Int(i)) => SqlValue::Float(i as f64),
            (ValueKind::Float, Value::UInt(u)) => SqlValue::Float(u as f64),
            (ValueKind::Float, Value::Bytes(b)) => finite(parse_text(&b, column)?, column)?,

            (ValueKind::Decimal, Value::Int(i)) => SqlValue::Decimal(i.to_string()),
            (ValueKind::Decimal, Value::UInt(u)) => SqlValue::Decimal(u.to_string()),
            (ValueKind::Decimal, Value::Bytes(b)) => {
                let digits = utf8(b, column)?;
                if !is_decimal_text(&digits) {
                    return Err(DumpError::render(column, format!("`{}` is not a decimal", digits)));
                }
                SqlValue::Decimal(digits)
            }

            (ValueKind::Bool, Value::Int(i)) => SqlValue::Bool(i != 0),
            (ValueKind::Bool, Value::UInt(u)) => SqlValue::Bool(u != 0),
            (ValueKind::Bool, Value::Bytes(b)) => SqlValue::Bool(parse_text::<i64>(&b, column)? != 0),

            (ValueKind::Text, Value::Bytes(b)) => SqlValue::Text(b),
            (ValueKind::Text, Value::Int(i)) => SqlValue::Text(i.to_string().into_bytes()),
            (ValueKind::Text, Value::UInt(u)) => SqlValue::Text(u.to_string().into_bytes()),

            (ValueKind::Bytes, Value::Bytes(b)) => SqlValue::Bytes(b),
            (ValueKind::RawBytes, Value::Bytes(b)) => SqlValue::RawBytes(b),

            (ValueKind::Timestamp, Value::DateTime(dt)) => SqlValue::Timestamp(Some(dt)),
            (ValueKind::Timestamp, Value::Bytes(b)) => {
                let text = utf8(b, column)?;
                match parse_timestamp(&text) {
                    Some(parsed) => SqlValue::Timestamp(parsed),
                    None => zero_in_date(&text)
                        .map(SqlValue::PartialTimestamp)
                        .ok_or_else(|| DumpError::render(column, format!("`{}` is not a timestamp", text)))?,
                }
            }

            (kind, other) => {
                return Err(DumpError::render(
                    column,
                    format!("cannot decode {:?} as {:?}", other, kind),
                ))
            }
        };
        Ok(decoded)
    }

    /// Appends the SQL literal for this value to `out`.
    pub fn render_into(&self, out: &mut Vec<u8>) {
        match self {
            SqlValue::Null => out.extend_from_slice(b"NULL"),
            SqlValue::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            SqlValue::Unsigned(u) => out.extend_from_slice(u.to_string().as_bytes()),
            SqlValue::Float(f) => out.extend_from_slice(format!("{:.6}", f).as_bytes()),
            SqlValue::Decimal(d) => out.extend_from_slice(d.as_bytes()),
            SqlValue::Bool(b) => out.push(if *b { b'1' } else { b'0' }),
            SqlValue::Text(b) => quote_into(b, out),
            SqlValue::RawBytes(b) => quote_into(b, out),
            // `0x` alone is not a literal
            SqlValue::Bytes(b) if b.is_empty() => out.extend_from_slice(b"''"),
            SqlValue::Bytes(b) => {
                out.extend_from_slice(b"0x");
                out.extend_from_slice(hex::encode_upper(b).as_bytes());
            }
            SqlValue::Timestamp(Some(dt)) => {
                out.extend_from_slice(format!("'{}'", dt.format(TIMESTAMP_FORMAT)).as_bytes())
            }
            SqlValue::Timestamp(None) => out.extend_from_slice(ZERO_TIMESTAMP.as_bytes()),
            SqlValue::PartialTimestamp(s) => quote_into(s.as_bytes(), out),
        }
    }

    /// Returns the SQL literal for this value.
    pub fn to_literal(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.render_into(&mut out);
        out
    }
}

/// Writes `bytes` as a single-quoted string literal with MySQL escaping.
pub fn quote_into(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'\'');
    escape_into(bytes, out);
    out.push(b'\'');
}

/// Backslash-escapes the bytes that are unsafe inside a quoted literal.
pub fn escape_into(bytes: &[u8], out: &mut Vec<u8>) {
    for &b in bytes {
        match b {
            0 => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
}

fn utf8(bytes: Vec<u8>, column: &str) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| DumpError::render(column, e.to_string()))
}

fn parse_text<T>(bytes: &[u8], column: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = std::str::from_utf8(bytes).map_err(|e| DumpError::render(column, e.to_string()))?;
    text.trim()
        .parse::<T>()
        .map_err(|e| DumpError::render(column, format!("`{}`: {}", text, e)))
}

fn finite(f: f64, column: &str) -> Result<SqlValue> {
    if f.is_finite() {
        Ok(SqlValue::Float(f))
    } else {
        Err(DumpError::render(column, format!("{} has no SQL literal", f)))
    }
}

fn is_decimal_text(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();

    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    match frac_part {
        Some(frac) => {
            !(int_part.is_empty() && frac.is_empty()) && all_digits(int_part) && all_digits(frac)
        }
        None => !int_part.is_empty() && all_digits(int_part),
    }
}

/// Parses a text-protocol temporal value. `Some(None)` is the zero timestamp.
fn parse_timestamp(text: &str) -> Option<Option<NaiveDateTime>> {
    if text.starts_with("0000-00-00") {
        return Some(None);
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Some(dt));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Some)
}

/// Accepts `YYYY-MM-DD[ HH:MM:SS[.f]]` with a zero month or day, which the
/// server stores when `NO_ZERO_IN_DATE` is off. Fractional seconds are dropped.
fn zero_in_date(text: &str) -> Option<String> {
    let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
    let (date, time) = match text.split_once(' ') {
        Some((date, time)) => (date, Some(time)),
        None => (text, None),
    };

    let mut parts = date.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !digits(year, 4) || !digits(month, 2) || !digits(day, 2) {
        return None;
    }
    if month != "00" && day != "00" {
        return None;
    }

    let time = match time {
        None => "00:00:00",
        Some(t) => {
            let (hms, frac) = t.split_once('.').unwrap_or((t, "0"));
            let mut fields = hms.split(':');
            let ok = (0..3).all(|_| fields.next().map_or(false, |f| digits(f, 2)))
                && fields.next().is_none()
                && !frac.is_empty()
                && frac.bytes().all(|b| b.is_ascii_digit());
            if !ok {
                return None;
            }
            hms
        }
    };
    Some(format!("{} {}", date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: Value, kind: ValueKind) -> String {
        let decoded = SqlValue::decode(value, kind, "c").unwrap();
        String::from_utf8(decoded.to_literal()).unwrap()
    }

    #[test]
    fn test_classify_declared_types() {
        let cases = [
            ("int(11)", ValueKind::Integer),
            ("INT(11) UNSIGNED", ValueKind::Unsigned),
            ("BIGINT UNSIGNED", ValueKind::Unsigned),
            ("TINYINT", ValueKind::Integer),
            ("tinyint(1)", ValueKind::Bool),
            ("BOOL", ValueKind::Bool),
            ("FLOAT", ValueKind::Float),
            ("double precision", ValueKind::Float),
            ("decimal(10,2)", ValueKind::Decimal),
            ("varchar(255)", ValueKind::Text),
            ("enum('a','b')", ValueKind::Text),
            ("VARBINARY", ValueKind::Bytes),
            ("BLOB", ValueKind::RawBytes),
            ("DATETIME", ValueKind::Timestamp),
            ("timestamp(6)", ValueKind::Timestamp),
        ];
        for (type_name, expected) in cases {
            assert_eq!(ValueKind::classify("c", type_name).unwrap(), expected, "{}", type_name);
        }
    }

    #[test]
    fn test_classify_rejects_unknown_types() {
        match ValueKind::classify("shape", "geometry") {
            Err(DumpError::UnsupportedType { column, type_name }) => {
                assert_eq!(column, "shape");
                assert_eq!(type_name, "geometry");
            }
            other => panic!("Expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_null_renders_unquoted() {
        for kind in [ValueKind::Integer, ValueKind::Text, ValueKind::Timestamp, ValueKind::Bytes] {
            assert_eq!(literal(Value::Null, kind), "NULL");
        }
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(literal(Value::Int(-42), ValueKind::Integer), "-42");
        assert_eq!(literal(Value::UInt(u64::MAX), ValueKind::Unsigned), "18446744073709551615");
        assert_eq!(literal(Value::text("17"), ValueKind::Integer), "17");
        assert_eq!(literal(Value::Float(1.0), ValueKind::Float), "1.000000");
        assert_eq!(literal(Value::Double(2.5), ValueKind::Float), "2.500000");
        assert_eq!(literal(Value::text("-0.125"), ValueKind::Float), "-0.125000");
        assert_eq!(literal(Value::text("12345.6789"), ValueKind::Decimal), "12345.6789");
    }

    #[test]
    fn test_bool_literals() {
        assert_eq!(literal(Value::Int(1), ValueKind::Bool), "1");
        assert_eq!(literal(Value::Int(0), ValueKind::Bool), "0");
        assert_eq!(literal(Value::text("1"), ValueKind::Bool), "1");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(
            literal(Value::text("it's \"a\"\n\\path\r\0\x1a"), ValueKind::Text),
            "'it\\'s \\\"a\\\"\\n\\\\path\\r\\0\\Z'"
        );
        assert_eq!(literal(Value::text(""), ValueKind::Text), "''");
    }

    #[test]
    fn test_non_utf8_text_is_escaped_bytewise() {
        // latin1 'café' with an embedded quote
        let latin1 = SqlValue::decode(Value::Bytes(b"caf\xE9 'x'".to_vec()), ValueKind::Text, "name")
            .unwrap()
            .to_literal();
        assert_eq!(latin1, b"'caf\xE9 \\'x\\''".to_vec());
    }

    #[test]
    fn test_zero_in_date_passes_through() {
        assert_eq!(
            literal(Value::text("2024-00-00 00:00:00"), ValueKind::Timestamp),
            "'2024-00-00 00:00:00'"
        );
        assert_eq!(literal(Value::text("2024-05-00"), ValueKind::Timestamp), "'2024-05-00 00:00:00'");
        assert_eq!(
            literal(Value::text("1999-00-17 08:30:00.125"), ValueKind::Timestamp),
            "'1999-00-17 08:30:00'"
        );
    }

    #[test]
    fn test_binary_literals() {
        assert_eq!(literal(Value::Bytes(vec![0xde, 0xad, 0x01]), ValueKind::Bytes), "0xDEAD01");
        assert_eq!(literal(Value::Bytes(Vec::new()), ValueKind::Bytes), "''");

        let raw = SqlValue::decode(Value::Bytes(vec![b'a', 0, b'\'', 0xff]), ValueKind::RawBytes, "c")
            .unwrap()
            .to_literal();
        assert_eq!(raw, b"'a\\0\\'\xff'".to_vec());
    }

    #[test]
    fn test_timestamp_literals() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(literal(Value::DateTime(epoch), ValueKind::Timestamp), "'1970-01-01 00:00:00'");
        assert_eq!(
            literal(Value::text("2024-02-29 13:14:15.250000"), ValueKind::Timestamp),
            "'2024-02-29 13:14:15'"
        );
        assert_eq!(literal(Value::text("2024-02-29"), ValueKind::Timestamp), "'2024-02-29 00:00:00'");
        assert_eq!(literal(Value::text("0000-00-00 00:00:00"), ValueKind::Timestamp), ZERO_TIMESTAMP);
    }

    #[test]
    fn test_decode_errors() {
        assert!(SqlValue::decode(Value::text("abc"), ValueKind::Integer, "c").is_err());
        assert!(SqlValue::decode(Value::Int(-1), ValueKind::Unsigned, "c").is_err());
        assert!(SqlValue::decode(Value::Double(f64::NAN), ValueKind::Float, "c").is_err());
        assert!(SqlValue::decode(Value::text("1e5"), ValueKind::Decimal, "c").is_err());
        assert!(SqlValue::decode(Value::Double(1.0), ValueKind::Text, "c").is_err());

        match SqlValue::decode(Value::text("2024-13-45"), ValueKind::Timestamp, "seen_at") {
            Err(DumpError::Render { column, .. }) => assert_eq!(column, "seen_at"),
            other => panic!("Expected Render error, got {:?}", other),
        }
        assert!(SqlValue::decode(Value::text("2024-00-00 25:61"), ValueKind::Timestamp, "c").is_err());
    }

    #[test]
    fn test_is_decimal_text() {
        assert!(is_decimal_text("0"));
        assert!(is_decimal_text("-12.50"));
        assert!(is_decimal_text(".5"));
        assert!(!is_decimal_text("-"));
        assert!(!is_decimal_text("."));
        assert!(!is_decimal_text("1.2.3"));
        assert!(!is_decimal_text(""));
    }
}
