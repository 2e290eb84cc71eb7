//! Core domain types for simreport datasets.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::schema::ENTITY_ID_COLUMN;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one extraction run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single parameter or cell value.
///
/// Deserializes from the model's JSON reply: `null`, numbers, strings and
/// (nested) arrays map directly. Booleans and objects are kept as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerce to a float: numbers as-is, text parsed after trimming.
    ///
    /// Returns `None` for null, lists, and text that is not a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Type a raw spreadsheet cell: empty → null, finite float → number,
    /// anything else → text.
    pub fn from_cell_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Self::Null => f.write_str("null")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a parameter value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<FieldValue, D::Error> {
        FieldValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<FieldValue, E> {
        Ok(FieldValue::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<FieldValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<FieldValue>()? {
            items.push(item);
        }
        Ok(FieldValue::List(items))
    }

    /// Objects render as `{key: value, ...}` in input order.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<FieldValue, A::Error> {
        let mut rendered = String::from("{");
        while let Some((key, value)) = map.next_entry::<String, FieldValue>()? {
            if rendered.len() > 1 {
                rendered.push_str(", ");
            }
            rendered.push_str(&key);
            rendered.push_str(": ");
            match value {
                FieldValue::Null => rendered.push_str("null"),
                other => rendered.push_str(&other.to_string()),
            }
        }
        rendered.push('}');
        Ok(FieldValue::Text(rendered))
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        Self::List(items)
    }
}

/// Render a float for a text cell.
///
/// Integral values print without a fractional part; very small or very
/// large magnitudes use scientific notation.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".into();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e15 {
        format!("{n:.0}")
    } else if !(1e-4..1e15).contains(&abs) {
        format!("{n:e}")
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// ParameterSet
// ---------------------------------------------------------------------------

/// Named parameter values extracted from one report.
///
/// Keys carry their physical units, e.g. `"Applied Force (N)"`. The same
/// type holds the derived set once computed fields have been added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(HashMap<String, FieldValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Numeric value for `key`, if present and coercible.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One output record: ordered `(column, value)` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, FieldValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell, replacing the value if the column already exists.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn into_cells(self) -> Vec<(String, FieldValue)> {
        self.cells
    }

    /// The value of the identifier column, when it holds a non-negative integer.
    pub fn entity_id(&self) -> Option<u64> {
        self.get(ENTITY_ID_COLUMN)
            .and_then(FieldValue::as_f64)
            .filter(|n| *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_deserializes_untagged() {
        let json = r#"{"a": 1.5, "b": "text", "c": null, "d": [[0, 850, 0], [0, 850, 0]], "e": 6}"#;
        let params: ParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(params.get("a"), Some(&FieldValue::Number(1.5)));
        assert_eq!(params.get("b"), Some(&FieldValue::Text("text".into())));
        assert_eq!(params.get("c"), Some(&FieldValue::Null));
        assert!(matches!(params.get("d"), Some(FieldValue::List(rows)) if rows.len() == 2));
        assert_eq!(params.number("e"), Some(6.0));
    }

    #[test]
    fn booleans_and_objects_fall_back_to_text() {
        let json = r#"{"a": true, "b": {"x": 1, "y": null}, "c": [false, 2]}"#;
        let params: ParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(params.get("a"), Some(&FieldValue::Text("true".into())));
        assert_eq!(params.get("b"), Some(&FieldValue::Text("{x: 1, y: null}".into())));
        assert_eq!(
            params.get("c"),
            Some(&FieldValue::List(vec![FieldValue::Text("false".into()), 2.0.into()]))
        );
        assert_eq!(params.number("a"), None);
    }

    #[test]
    fn as_f64_coerces_text() {
        assert_eq!(FieldValue::from(" 9.5e6 ").as_f64(), Some(9.5e6));
        assert_eq!(FieldValue::from("N/A").as_f64(), None);
        assert_eq!(FieldValue::from("NaN").as_f64(), None);
        assert_eq!(FieldValue::Null.as_f64(), None);
    }

    #[test]
    fn from_cell_text_types_cells() {
        assert_eq!(FieldValue::from_cell_text(""), FieldValue::Null);
        assert_eq!(FieldValue::from_cell_text("164"), FieldValue::Number(164.0));
        assert_eq!(
            FieldValue::from_cell_text("[0.0, 0.00637]"),
            FieldValue::Text("[0.0, 0.00637]".into())
        );
    }

    #[test]
    fn display_renders_cells() {
        assert_eq!(FieldValue::Number(6.0).to_string(), "6");
        assert_eq!(FieldValue::Number(-1703.0).to_string(), "-1703");
        assert_eq!(FieldValue::Number(0.26).to_string(), "0.26");
        assert_eq!(FieldValue::Number(1.02e-9).to_string(), "1.02e-9");
        assert_eq!(FieldValue::Null.to_string(), "");

        let deformation = FieldValue::List(vec![0.0.into(), 0.00637.into()]);
        assert_eq!(deformation.to_string(), "[0, 0.00637]");

        let reactions = FieldValue::List(vec![
            FieldValue::List(vec![0.0.into(), 850.0.into(), 0.0.into()]),
            FieldValue::List(vec![0.0.into(), 850.0.into(), 0.0.into()]),
        ]);
        assert_eq!(reactions.to_string(), "[[0, 850, 0], [0, 850, 0]]");
    }

    #[test]
    fn row_push_replaces_existing_column() {
        let mut row = Row::new();
        row.push(ENTITY_ID_COLUMN, 3u64);
        row.push("Bridge Type", "Truss");
        row.push("Bridge Type", "Arch");
        assert_eq!(row.columns().count(), 2);
        assert_eq!(row.get("Bridge Type"), Some(&FieldValue::from("Arch")));
        assert_eq!(row.entity_id(), Some(3));
    }
}
