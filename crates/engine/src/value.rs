//! Cell values and coercion rules
//!
//! Rows carry loosely typed values: text, numbers, or nothing. Filtering,
//! aggregation and sorting all go through the coercions defined here so that
//! a numeric-looking text and a real number behave the same wherever the
//! column is treated as numeric.
//!
//! Key invariants:
//! - `Empty` is the only representation of a missing value after normalization
//! - Values are totally ordered and hashable (numbers via `OrderedFloat`),
//!   so they can live in dropdown selection sets
//! - Integer comparison never goes through `f64` (see [`IntegerDigits`])

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Value
// =============================================================================

/// A single cell value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Missing, null, or empty-string input
    #[default]
    Empty,
    /// Numeric value (as produced by dynamic typing or a typed source)
    Number(f64),
    /// Anything else, stored raw
    Text(String),
}

impl Value {
    /// Dynamic typing for delimited text: trimmed, empty → Empty,
    /// a complete finite number → Number, otherwise Text.
    pub fn parse_typed(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        match parse_strict_number(trimmed) {
            Some(n) => Value::Number(n),
            None => Value::Text(trimmed.to_string()),
        }
    }

    /// Convert a JSON scalar. Strings are kept as text (no dynamic typing).
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(b) => Value::Text(b.to_string()),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Empty),
            serde_json::Value::String(s) if s.is_empty() => Value::Empty,
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// True for `Empty` and for empty text
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.is_empty(),
            Value::Number(_) => false,
        }
    }

    /// Loose numeric coercion ("parse float" semantics: longest numeric prefix)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Number(_) | Value::Empty => None,
            Value::Text(s) => parse_float_prefix(s),
        }
    }

    /// Strict numeric coercion: the whole (trimmed) value must be a finite number
    pub fn strict_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Number(_) | Value::Empty => None,
            Value::Text(s) => parse_strict_number(s.trim()),
        }
    }

    /// Exact integer form, if this value is integer-like
    pub fn integer_digits(&self) -> Option<IntegerDigits> {
        match self {
            Value::Number(n) => IntegerDigits::from_f64(*n),
            Value::Text(s) => IntegerDigits::parse(s),
            Value::Empty => None,
        }
    }

    /// Lowercased display string, used by case-insensitive comparisons
    pub fn folded(&self) -> String {
        self.to_string().to_lowercase()
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Structural order (Empty < Number < Text), used for sets and maps only.
/// Display ordering lives in [`compare_natural`].
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            Value::Empty => {}
            Value::Number(n) => OrderedFloat(*n).hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Value::Empty
        } else {
            Value::Text(s.to_string())
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        if s.is_empty() {
            Value::Empty
        } else {
            Value::Text(s)
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_str(""),
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&raw))
    }
}

// =============================================================================
// Number parsing and display
// =============================================================================

/// Parse a complete, finite number. Surrounding whitespace must already be trimmed.
pub fn parse_strict_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    // Rust accepts "inf"/"nan" spellings; those stay text
    if s.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse the longest numeric prefix, ignoring leading whitespace.
///
/// `"12.5kg"` → 12.5, `"  -3"` → -3, `"abc"` → None, `"Infinity"` → ∞.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    let negative = bytes.first() == Some(&b'-');
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if t[end..].starts_with("Infinity") {
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut j = end + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - (end + 1);
        if digits > 0 {
            end = j;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut j = end + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    t[..end].parse::<f64>().ok()
}

/// Display a number the way a script runtime would: no trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// IntegerDigits: exact integer comparison
// =============================================================================

/// Arbitrary-precision integer, stored as normalized decimal digits.
///
/// Used by the "numbers" sort modes so large whole numbers (ids, account
/// numbers) never lose precision through `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerDigits {
    negative: bool,
    /// No leading zeros; "0" for zero (which is never negative)
    digits: String,
}

impl IntegerDigits {
    /// Parse `^\s*-?\d+\s*$`
    pub fn parse(s: &str) -> Option<Self> {
        let t = s.trim();
        let (negative, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, t),
        };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let stripped = body.trim_start_matches('0');
        let digits = if stripped.is_empty() { "0" } else { stripped };
        Some(Self {
            negative: negative && digits != "0",
            digits: digits.to_string(),
        })
    }

    /// Whole, finite floats only
    pub fn from_f64(n: f64) -> Option<Self> {
        if n.is_finite() && n.fract() == 0.0 {
            Self::parse(&format!("{:.0}", n))
        } else {
            None
        }
    }

    /// Exact comparison against a float, by whole part then fraction sign
    pub fn cmp_f64(&self, n: f64) -> Ordering {
        if n.is_infinite() {
            return if n > 0.0 { Ordering::Less } else { Ordering::Greater };
        }
        match Self::from_f64(n.trunc()) {
            Some(whole) => self
                .cmp(&whole)
                .then_with(|| 0.0_f64.partial_cmp(&n.fract()).unwrap_or(Ordering::Equal)),
            None => Ordering::Equal,
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl PartialOrd for IntegerDigits {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntegerDigits {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

// =============================================================================
// Natural ordering
// =============================================================================

/// Exact numeric order. Integer-like values keep every digit, and an integer
/// meets a float through [`IntegerDigits::cmp_f64`] rather than a lossy cast,
/// so the order stays transitive across mixed inputs. `None` when either
/// side does not coerce to a number.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.integer_digits(), b.integer_digits()) {
        (Some(ai), Some(bi)) => Some(ai.cmp(&bi)),
        (Some(ai), None) => Some(ai.cmp_f64(b.as_number()?)),
        (None, Some(bi)) => Some(bi.cmp_f64(a.as_number()?).reverse()),
        (None, None) => a.as_number()?.partial_cmp(&b.as_number()?),
    }
}

/// Default value ordering: exact integers, then floats, then case-insensitive text.
///
/// Empty sorts after everything. Used by min/max reducers and for listing
/// distinct values in the dropdown filter.
pub fn compare_natural(a: &Value, b: &Value) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    if let Some(ord) = compare_numbers(a, b) {
        return ord;
    }
    a.folded().cmp(&b.folded())
}
