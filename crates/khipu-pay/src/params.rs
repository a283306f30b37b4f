//! Field sets exchanged with the gateway.
//!
//! A [`ParameterSet`] is the unit that gets signed: outgoing payment requests
//! and incoming notifications are both represented as one. Names are kept in
//! a `BTreeMap`, so iteration is already in byte-wise ascending order.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::RESERVED_SIGNATURE_FIELD;
use crate::error::KhipuError;

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Borrow the value as text if it is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders the value as it enters the signed string: booleans as
/// `true`/`false`, null as the empty string, numbers in shortest form.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => Ok(()),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(n) if n.unsigned_abs() <= MAX_SAFE_INTEGER => write!(f, "{n}"),
            ParamValue::Int(n) => write_number(f, *n as f64),
            ParamValue::Float(n) => write_number(f, *n),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Integers above this magnitude lose precision as IEEE doubles.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Writes a double the way a JavaScript `String(number)` does: shortest
/// round-trip digits, plain notation for decimal exponents in `-6..21`,
/// `d.ddde+N` otherwise, and `0` for both zeros.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n == 0.0 {
        return f.write_str("0");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n < 0.0 {
        f.write_str("-")?;
    }

    // `{:e}` yields the shortest round-trip digits as `d[.ddd]e[-]x`.
    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;
    let k = digits.len() as i32;
    let point = exp + 1;

    if k <= point && point <= 21 {
        write!(f, "{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        write!(f, "{int}.{frac}")
    } else if -6 < point && point <= 0 {
        write!(f, "0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            write!(f, "{lead}e{sign}{}", exp.abs())
        } else {
            write!(f, "{lead}.{rest}e{sign}{}", exp.abs())
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Int(n)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Float(n)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Mapping from unique field name to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    fields: BTreeMap<String, ParamValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing and returning any previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.fields.get(name)
    }

    /// Text value of a field, if present and a string.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_text)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending byte order of name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.fields.iter()
    }

    /// Fields that take part in signing, in ascending byte order of name.
    pub fn signable(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != RESERVED_SIGNATURE_FIELD)
    }

    /// Build a set from name/value pairs. A repeated name is an error rather
    /// than a silent overwrite.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, KhipuError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            let name = name.into();
            if set.contains(&name) {
                return Err(KhipuError::DuplicateField(name));
            }
            set.insert(name, value);
        }
        Ok(set)
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &[u8]) -> Result<Self, KhipuError> {
        Self::from_pairs(
            url::form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    /// Parse a flat JSON object. Nested arrays or objects are rejected.
    pub fn from_json(body: &[u8]) -> Result<Self, KhipuError> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
        let mut set = Self::new();
        for (name, value) in raw {
            let value = match value {
                serde_json::Value::Null => ParamValue::Null,
                serde_json::Value::Bool(b) => ParamValue::Bool(b),
                serde_json::Value::String(s) => ParamValue::Text(s),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => ParamValue::Int(i),
                    None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(KhipuError::UnsupportedValue(name));
                }
            };
            set.insert(name, value);
        }
        Ok(set)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_normalizes_scalars() {
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::Bool(false).to_string(), "false");
        assert_eq!(ParamValue::Null.to_string(), "");
        assert_eq!(ParamValue::Int(12345).to_string(), "12345");
        assert_eq!(ParamValue::Float(10.0).to_string(), "10");
        assert_eq!(ParamValue::Float(10.5).to_string(), "10.5");
        assert_eq!(ParamValue::from("a b").to_string(), "a b");
    }

    #[test]
    fn floats_render_like_js_numbers() {
        let cases = [
            (1e21, "1e+21"),
            (1.5e21, "1.5e+21"),
            (1e20, "100000000000000000000"),
            (1e-7, "1e-7"),
            (1.25e-7, "1.25e-7"),
            (1e-6, "0.000001"),
            (0.5, "0.5"),
            (123.456, "123.456"),
            (-0.0, "0"),
            (-2.5, "-2.5"),
            (0.1 + 0.2, "0.30000000000000004"),
            (f64::NAN, "NaN"),
            (f64::NEG_INFINITY, "-Infinity"),
        ];
        for (value, expected) in cases {
            assert_eq!(ParamValue::Float(value).to_string(), expected, "{value:e}");
        }
    }

    #[test]
    fn unsafe_integers_round_like_doubles() {
        assert_eq!(
            ParamValue::Int(9_007_199_254_740_993).to_string(),
            "9007199254740992"
        );
        assert_eq!(ParamValue::Int(i64::MIN).to_string(), "-9223372036854776000");
        assert_eq!(
            ParamValue::Int(9_007_199_254_740_991).to_string(),
            "9007199254740991"
        );
    }

    #[test]
    fn json_exponent_numbers_keep_their_notation() {
        let set = ParameterSet::from_json(br#"{"a":1e21,"b":1e-7,"c":-0.0}"#).unwrap();
        assert_eq!(set.get("a").map(ToString::to_string).as_deref(), Some("1e+21"));
        assert_eq!(set.get("b").map(ToString::to_string).as_deref(), Some("1e-7"));
        assert_eq!(set.get("c").map(ToString::to_string).as_deref(), Some("0"));
    }

    #[test]
    fn iteration_is_byte_ordered() {
        let set: ParameterSet = [("subject", "x"), ("amount", "1"), ("Zeta", "z"), ("_u", "u")]
            .into_iter()
            .collect();
        let names: Vec<&str> = set.iter().map(|(k, _)| k.as_str()).collect();
        // uppercase sorts before underscore, which sorts before lowercase
        assert_eq!(names, ["Zeta", "_u", "amount", "subject"]);
    }

    #[test]
    fn signable_skips_hash() {
        let set = ParameterSet::new()
            .with("payment_id", "abc")
            .with("hash", "deadbeef");
        let names: Vec<&str> = set.signable().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["payment_id"]);
        assert!(set.contains("hash"));
    }

    #[test]
    fn from_pairs_rejects_duplicates() {
        let err = ParameterSet::from_pairs([("a", "1"), ("a", "2")]).unwrap_err();
        assert!(matches!(err, KhipuError::DuplicateField(ref n) if n == "a"));
    }

    #[test]
    fn from_form_decodes_plus_and_escapes() {
        let set = ParameterSet::from_form(b"subject=Test+Order&note=a%2Bb&hash=ff").unwrap();
        assert_eq!(set.get_text("subject"), Some("Test Order"));
        assert_eq!(set.get_text("note"), Some("a+b"));
        assert_eq!(set.get_text("hash"), Some("ff"));
    }

    #[test]
    fn from_form_rejects_repeated_field() {
        assert!(ParameterSet::from_form(b"status=done&status=reversed").is_err());
    }

    #[test]
    fn from_json_maps_scalars() {
        let set = ParameterSet::from_json(
            br#"{"payment_id":"abc","count":3,"ratio":0.5,"ok":true,"note":null}"#,
        )
        .unwrap();
        assert_eq!(set.get("payment_id"), Some(&ParamValue::from("abc")));
        assert_eq!(set.get("count"), Some(&ParamValue::Int(3)));
        assert_eq!(set.get("ratio"), Some(&ParamValue::Float(0.5)));
        assert_eq!(set.get("ok"), Some(&ParamValue::Bool(true)));
        assert_eq!(set.get("note"), Some(&ParamValue::Null));
    }

    #[test]
    fn from_json_rejects_nested_values() {
        let err = ParameterSet::from_json(br#"{"items":[1,2]}"#).unwrap_err();
        assert!(matches!(err, KhipuError::UnsupportedValue(ref n) if n == "items"));
        assert!(matches!(
            ParameterSet::from_json(b"not json"),
            Err(KhipuError::SerdeError(_))
        ));
    }

    #[test]
    fn option_converts_to_null() {
        let set = ParameterSet::new().with("bank_id", None::<String>);
        assert_eq!(set.get("bank_id"), Some(&ParamValue::Null));
    }
}
