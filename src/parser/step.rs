//! STEP physical-file primitives: record lines, parameter lists and string decoding.
//!
//! This is a lenient reader. It understands `#id=TYPE(params);` data records and
//! ignores everything else; nothing here validates against an IFC schema.

/// One `#id = TYPE(params);` data record, parameters kept as raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStepRecord {
    pub id: u64,
    pub entity_type: String,
    pub params: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    /// Numeric literal exactly as written (`2.5`, `1.E-3`, `42`).
    Number(String),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// A select value such as `IFCLABEL('x')` or `IFCBOOLEAN(.T.)`.
    Typed {
        type_name: String,
        inner: Box<StepValue>,
    },
    Null,
    Derived,
}

impl StepValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            StepValue::Typed { inner, .. } => inner.as_str(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// References held directly or as members of a list.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        match self {
            StepValue::Reference(id) => vec![*id],
            StepValue::List(items) => items.iter().filter_map(StepValue::as_reference).collect(),
            _ => Vec::new(),
        }
    }

    /// Stringifies a property value the way validation compares it.
    ///
    /// Text types yield the decoded string, booleans and logicals yield
    /// `TRUE`/`FALSE`/`UNKNOWN`, measures yield the bare numeric literal and
    /// `$` yields an empty string.
    #[must_use]
    pub fn to_property_string(&self) -> String {
        match self {
            StepValue::String(s) | StepValue::Number(s) => s.clone(),
            StepValue::Enum(e) => match e.as_str() {
                "T" => "TRUE".to_string(),
                "F" => "FALSE".to_string(),
                "U" => "UNKNOWN".to_string(),
                other => other.to_string(),
            },
            StepValue::Reference(id) => format!("#{id}"),
            StepValue::List(items) => items
                .iter()
                .map(StepValue::to_property_string)
                .collect::<Vec<_>>()
                .join(", "),
            StepValue::Typed { inner, .. } => inner.to_property_string(),
            StepValue::Null | StepValue::Derived => String::new(),
        }
    }
}

/// Parses a single data line. Returns `None` for headers, comments and malformed lines.
#[must_use]
pub fn parse_record(line: &str) -> Option<RawStepRecord> {
    // Format: #123=IFCWALL('guid',#ref,'name',...);
    let line = line.trim();
    let rest = line.strip_prefix('#')?;

    let eq_pos = rest.find('=')?;
    let id_text = rest[..eq_pos].trim();
    if id_text.is_empty() || !id_text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: u64 = id_text.parse().ok()?;

    let rest = rest[eq_pos + 1..].trim_start();
    let paren_pos = rest.find('(')?;
    let entity_type = &rest[..paren_pos];
    if entity_type.is_empty()
        || !entity_type
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return None;
    }

    let body = rest[paren_pos + 1..].trim_end();
    let body = body.strip_suffix(';').unwrap_or(body).trim_end();
    let params = body.strip_suffix(')')?;

    Some(RawStepRecord {
        id,
        entity_type: entity_type.to_ascii_uppercase(),
        params: params.to_string(),
    })
}

/// Extracts the schema name from a `FILE_SCHEMA(('IFC4'));` header line.
#[must_use]
pub fn parse_file_schema(line: &str) -> Option<String> {
    let line = line.trim();
    if !line.starts_with("FILE_SCHEMA") {
        return None;
    }
    QuotedStrings::new(line).next()
}

/// Splits a parameter list at top-level commas.
///
/// Commas inside nested parentheses or string literals do not split. A doubled
/// quote (`''`) inside a string is an escaped apostrophe, not a string boundary.
#[must_use]
pub fn split_params(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_string = false;
            }
        } else {
            match b {
                b'\'' => in_string = true,
                b'(' => depth += 1,
                b')' => depth -= 1,
                b',' if depth == 0 => {
                    parts.push(s[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }

    let last = s[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

#[must_use]
pub fn parse_params(s: &str) -> Vec<StepValue> {
    split_params(s).into_iter().map(parse_value).collect()
}

#[must_use]
pub fn parse_value(s: &str) -> StepValue {
    let s = s.trim();

    if s.is_empty() || s == "$" {
        return StepValue::Null;
    }
    if s == "*" {
        return StepValue::Derived;
    }
    if let Some(stripped) = s.strip_prefix('#') {
        if let Ok(id) = stripped.parse::<u64>() {
            return StepValue::Reference(id);
        }
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        let inner = &s[1..s.len() - 1];
        if inner.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return StepValue::Enum(inner.to_string());
        }
    }
    if s.starts_with('(') && s.ends_with(')') {
        return StepValue::List(parse_params(&s[1..s.len() - 1]));
    }
    if s.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        && crate::model::value::parse_number(s).is_some()
    {
        return StepValue::Number(s.to_string());
    }
    // Typed value like IFCBOOLEAN(.T.)
    if let Some(paren_pos) = s.find('(') {
        let type_name = &s[..paren_pos];
        if s.ends_with(')')
            && !type_name.is_empty()
            && type_name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return StepValue::Typed {
                type_name: type_name.to_ascii_uppercase(),
                inner: Box::new(parse_value(&s[paren_pos + 1..s.len() - 1])),
            };
        }
    }

    StepValue::String(s.to_string())
}

/// Iterates the decoded string literals of a parameter text, in order.
pub struct QuotedStrings<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> QuotedStrings<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            text,
            pos: 0,
        }
    }
}

impl Iterator for QuotedStrings<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let open = self.pos + self.bytes[self.pos..].iter().position(|&b| b == b'\'')?;
        let mut i = open + 1;
        while i < self.bytes.len() {
            if self.bytes[i] == b'\'' {
                if self.bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                self.pos = i + 1;
                return Some(decode_step_string(&self.text[open + 1..i]));
            }
            i += 1;
        }
        // Unterminated literal
        self.pos = self.bytes.len();
        None
    }
}

/// Instance references (`#12`) appearing anywhere outside string literals.
#[must_use]
pub fn references_in(params: &str) -> Vec<u64> {
    let bytes = params.as_bytes();
    let mut refs = Vec::new();
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' => in_string = true,
            b'#' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if let Ok(id) = params[start..end].parse::<u64>() {
                    refs.push(id);
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    refs
}

/// Decode STEP/IFC encoded strings.
/// Supports:
/// - `\X\HH` - one ISO 8859-1 byte
/// - `\X2\HHHH...\X0\` - UTF-16 code units, 4 hex digits each
/// - `\X4\HHHHHHHH...\X0\` - Unicode code points, 8 hex digits each
/// - `\S\c` - ISO 8859 upper half (code of `c` + 128)
/// - `\P?\` - code page switch, dropped
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
#[must_use]
pub fn decode_step_string(raw: &str) -> String {
    if !raw.contains('\\') && !raw.contains('\'') {
        return raw.to_string();
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut result = String::with_capacity(raw.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\'' {
            result.push('\'');
            i += if chars.get(i + 1) == Some(&'\'') { 2 } else { 1 };
            continue;
        }
        if ch != '\\' {
            result.push(ch);
            i += 1;
            continue;
        }

        match (chars.get(i + 1), chars.get(i + 2), chars.get(i + 3)) {
            (Some('X'), Some('\\'), _) => {
                let hex: String = chars.iter().skip(i + 3).take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) if hex.len() == 2 => {
                        result.push(char::from(byte));
                        i += 5;
                    }
                    _ => {
                        result.push('\\');
                        i += 1;
                    }
                }
            }
            (Some('X'), Some(&width @ ('2' | '4')), Some('\\')) => {
                let start = i + 4;
                let (hex, next) = take_until_end_marker(&chars, start);
                if width == '2' {
                    decode_utf16_hex(&hex, &mut result);
                } else {
                    decode_utf32_hex(&hex, &mut result);
                }
                i = next;
            }
            (Some('S'), Some('\\'), Some(&c)) => {
                if let Some(decoded) = char::from_u32(c as u32 + 128) {
                    result.push(decoded);
                }
                i += 4;
            }
            (Some('P'), Some(_), Some('\\')) => i += 4,
            (Some('\\'), _, _) => {
                result.push('\\');
                i += 2;
            }
            _ => {
                result.push('\\');
                i += 1;
            }
        }
    }

    result
}

/// Collects hex digits up to the `\X0\` terminator; returns them and the index after it.
fn take_until_end_marker(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '\\'
            && chars.get(i + 1) == Some(&'X')
            && chars.get(i + 2) == Some(&'0')
            && chars.get(i + 3) == Some(&'\\')
        {
            return (chars[start..i].iter().collect(), i + 4);
        }
        i += 1;
    }
    (chars[start..].iter().collect(), chars.len())
}

fn decode_utf16_hex(hex: &str, out: &mut String) {
    let mut units = Vec::with_capacity(hex.len() / 4);
    let mut rest = hex;
    while rest.len() >= 4 && rest.is_char_boundary(4) {
        match u16::from_str_radix(&rest[..4], 16) {
            Ok(unit) => units.push(unit),
            Err(_) => break,
        }
        rest = &rest[4..];
    }
    out.extend(char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)));
    // Digits that do not form a full code unit are kept as written
    out.push_str(rest);
}

fn decode_utf32_hex(hex: &str, out: &mut String) {
    let mut rest = hex;
    while rest.len() >= 8 && rest.is_char_boundary(8) {
        match u32::from_str_radix(&rest[..8], 16) {
            Ok(code) => out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
            Err(_) => break,
        }
        rest = &rest[8..];
    }
    out.push_str(rest);
}
