//! Cell values.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("valid regex"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?$").expect("valid regex")
});
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// A single cell of a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
}

impl Scalar {
    /// Infer a scalar from raw text (as read from a CSV cell).
    ///
    /// Empty text is `Null`; integers, floats, `true`/`false` and ISO dates
    /// (`YYYY-MM-DD`) get their own variants; anything else stays a string.
    pub fn parse_inferred(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Scalar::Null;
        }
        if INT_RE.is_match(s) {
            if let Ok(n) = s.parse::<i64>() {
                return Scalar::Int(n);
            }
        }
        if FLOAT_RE.is_match(s) {
            if let Ok(f) = s.parse::<f64>() {
                return Scalar::Float(f);
            }
        }
        if s.eq_ignore_ascii_case("true") {
            return Scalar::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Scalar::Bool(false);
        }
        if DATE_RE.is_match(s) {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Scalar::Date(d);
            }
        }
        Scalar::Str(s.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view. Booleans count as 0/1; strings and dates are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => Some(*d),
            Scalar::Str(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// String form used when building row identity keys.
    pub fn key_string(&self) -> String {
        self.to_string()
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "string",
            Scalar::Date(_) => "date",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Int(i64::from(n))
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(d: NaiveDate) -> Self {
        Scalar::Date(d)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inferred() {
        assert_eq!(Scalar::parse_inferred(""), Scalar::Null);
        assert_eq!(Scalar::parse_inferred("  "), Scalar::Null);
        assert_eq!(Scalar::parse_inferred("600"), Scalar::Int(600));
        assert_eq!(Scalar::parse_inferred("-3"), Scalar::Int(-3));
        assert_eq!(Scalar::parse_inferred("2.5"), Scalar::Float(2.5));
        assert_eq!(Scalar::parse_inferred("1e3"), Scalar::Float(1000.0));
        assert_eq!(Scalar::parse_inferred("TRUE"), Scalar::Bool(true));
        assert_eq!(
            Scalar::parse_inferred("2020-01-10"),
            Scalar::Date(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap())
        );
        assert_eq!(Scalar::parse_inferred("2020-13-40"), Scalar::Str("2020-13-40".into()));
        assert_eq!(Scalar::parse_inferred(" abc "), Scalar::Str("abc".into()));
    }

    #[test]
    fn test_key_string() {
        assert_eq!(Scalar::Int(2).key_string(), "2");
        assert_eq!(Scalar::Null.key_string(), "");
        assert_eq!(Scalar::Float(600.0).key_string(), "600");
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(Scalar::Date(d).key_string(), "2020-01-01");
    }

    #[test]
    fn test_as_date_from_string() {
        let s = Scalar::Str("2021-06-30".into());
        assert_eq!(s.as_date(), NaiveDate::from_ymd_opt(2021, 6, 30));
        assert_eq!(Scalar::Int(3).as_date(), None);
    }
}
