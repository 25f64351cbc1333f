//! Literal and restricted values used by IDS facets.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A facet value: either a literal or an XSD-style restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Value {
    Simple { value: String },
    Pattern { regex: Pattern },
    Enumeration { options: Vec<String> },
    Bounds(Bounds),
    Length(LengthRestriction),
}

/// Numeric bounds. Each side is kept as written and parsed at match time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_exclusive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_exclusive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthRestriction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
}

/// A regular expression that is compiled on first use and then shared.
///
/// Matching is an unanchored search. A pattern that fails to compile never
/// matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Pattern {
    source: String,
    compiled: OnceLock<Option<Regex>>,
}

impl Pattern {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match Regex::new(&self.source) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(pattern = %self.source, error = %err, "invalid pattern");
                    None
                }
            })
            .as_ref()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.regex().is_some()
    }

    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex().is_some_and(|re| re.is_match(candidate))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl From<String> for Pattern {
    fn from(source: String) -> Self {
        Pattern::new(source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// Parses a number the way IFC and IDS write them (`10`, `-2.5`, `1.E-3`).
#[must_use]
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    // Only decimal notation: `f64::from_str` would also take `inf` and `NaN`
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        || !digits.chars().any(|c| c.is_ascii_digit())
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    if let Ok(n) = s.parse::<f64>() {
        return Some(n);
    }
    // STEP allows a bare trailing dot on the mantissa: `1.E-3`, `5.`
    let normalized = s.replacen(".E", ".0E", 1).replacen(".e", ".0e", 1);
    let normalized = normalized.strip_suffix('.').map_or(normalized.clone(), |m| format!("{m}.0"));
    normalized.parse::<f64>().ok()
}

impl Value {
    #[must_use]
    pub fn simple(value: impl Into<String>) -> Self {
        Value::Simple {
            value: value.into(),
        }
    }

    #[must_use]
    pub fn pattern(regex: impl Into<String>) -> Self {
        Value::Pattern {
            regex: Pattern::new(regex),
        }
    }

    #[must_use]
    pub fn enumeration<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Enumeration {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Short tag used in reports and round-trip checks.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Simple { .. } => "simple",
            Value::Pattern { .. } => "pattern",
            Value::Enumeration { .. } => "enumeration",
            Value::Bounds(_) => "bounds",
            Value::Length(_) => "length",
        }
    }

    /// The literal, when this is a simple value.
    #[must_use]
    pub fn as_simple(&self) -> Option<&str> {
        match self {
            Value::Simple { value } => Some(value),
            _ => None,
        }
    }

    /// True when the value names nothing (blank literal, empty pattern, no options).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Simple { value } => value.trim().is_empty(),
            Value::Pattern { regex } => regex.as_str().is_empty(),
            Value::Enumeration { options } => options.iter().all(|o| o.trim().is_empty()),
            Value::Bounds(b) => {
                b.min_inclusive.is_none()
                    && b.max_inclusive.is_none()
                    && b.min_exclusive.is_none()
                    && b.max_exclusive.is_none()
            }
            Value::Length(l) => l.min_length.is_none() && l.max_length.is_none() && l.length.is_none(),
        }
    }

    /// Tests a stringified model value against this value.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Value::Simple { value } => value == candidate,
            Value::Pattern { regex } => regex.is_match(candidate),
            Value::Enumeration { options } => options.iter().any(|o| o == candidate),
            Value::Bounds(bounds) => bounds.contains(candidate),
            Value::Length(length) => length.accepts(candidate),
        }
    }

    /// Like [`Value::matches`] but ignoring ASCII case for literals.
    ///
    /// Used for IFC type names, which STEP treats case-insensitively.
    #[must_use]
    pub fn matches_ignore_case(&self, candidate: &str) -> bool {
        match self {
            Value::Simple { value } => value.eq_ignore_ascii_case(candidate),
            Value::Enumeration { options } => options.iter().any(|o| o.eq_ignore_ascii_case(candidate)),
            _ => self.matches(candidate),
        }
    }
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        let Some(n) = parse_number(candidate) else {
            return false;
        };
        let check = |bound: &Option<String>, ok: fn(f64, f64) -> bool| match bound {
            None => true,
            Some(b) => parse_number(b).is_some_and(|b| ok(n, b)),
        };
        check(&self.min_inclusive, |n, b| n >= b)
            && check(&self.max_inclusive, |n, b| n <= b)
            && check(&self.min_exclusive, |n, b| n > b)
            && check(&self.max_exclusive, |n, b| n < b)
    }
}

impl LengthRestriction {
    #[must_use]
    pub fn accepts(&self, candidate: &str) -> bool {
        let len = candidate.chars().count();
        let check = |bound: &Option<String>, ok: fn(usize, usize) -> bool| match bound {
            None => true,
            Some(b) => b.trim().parse::<usize>().is_ok_and(|b| ok(len, b)),
        };
        check(&self.length, |l, b| l == b)
            && check(&self.min_length, |l, b| l >= b)
            && check(&self.max_length, |l, b| l <= b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Simple { value } => write!(f, "\"{value}\""),
            Value::Pattern { regex } => write!(f, "pattern /{}/", regex.as_str()),
            Value::Enumeration { options } => {
                let quoted: Vec<String> = options.iter().map(|o| format!("\"{o}\"")).collect();
                write!(f, "one of [{}]", quoted.join(", "))
            }
            Value::Bounds(b) => {
                let mut parts = Vec::new();
                if let Some(v) = &b.min_inclusive {
                    parts.push(format!(">= {v}"));
                }
                if let Some(v) = &b.min_exclusive {
                    parts.push(format!("> {v}"));
                }
                if let Some(v) = &b.max_inclusive {
                    parts.push(format!("<= {v}"));
                }
                if let Some(v) = &b.max_exclusive {
                    parts.push(format!("< {v}"));
                }
                write!(f, "value {}", parts.join(" and "))
            }
            Value::Length(l) => {
                let mut parts = Vec::new();
                if let Some(v) = &l.length {
                    parts.push(format!("== {v}"));
                }
                if let Some(v) = &l.min_length {
                    parts.push(format!(">= {v}"));
                }
                if let Some(v) = &l.max_length {
                    parts.push(format!("<= {v}"));
                }
                write!(f, "length {}", parts.join(" and "))
            }
        }
    }
}
