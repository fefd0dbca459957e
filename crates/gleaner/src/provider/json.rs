//! JSON response processing.
//!
//! Paths are slash separated object keys, with numeric segments indexing into arrays:
//! `message/author` or `result/hits/hit/0/info/title`. Whatever the path lands on is flattened
//! into a single string:
//!
//! - Strings, numbers and booleans as-is
//! - Arrays by joining their flattened elements with `", "`
//! - Person objects (`given`/`family`) as `"given family"`
//! - Other objects through their `name`, `text`, `value` or `title` member

use serde_json::Value;

use super::*;

/// Configuration for JSON response processing.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonConfig {
  /// How to extract each draft field
  pub field_maps: BTreeMap<DraftField, FieldMap>,
}

impl ResponseProcessor for JsonConfig {
  fn extract_fields(&self, data: &[u8]) -> Result<BTreeMap<DraftField, String>> {
    let json: Value = serde_json::from_slice(data)?;
    trace!("Processing JSON response: {}", json);

    let mut fields = BTreeMap::new();
    for (field, map) in &self.field_maps {
      if let Some(value) = get_by_path(&json, &map.path) {
        let value = finish_value(value, map)?;
        if !value.trim().is_empty() {
          fields.insert(*field, value);
        }
      }
    }
    Ok(fields)
  }
}

/// Follows `path` through `json` and flattens the value found there.
fn get_by_path(json: &Value, path: &str) -> Option<String> {
  let mut current = json;
  for part in path.split('/').filter(|part| !part.is_empty()) {
    current = match part.parse::<usize>() {
      Ok(index) => current.as_array()?.get(index)?,
      Err(_) => current.get(part)?,
    };
  }
  value_to_string(current)
}

/// Flattens a JSON value into a display string.
fn value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.trim().to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(items) => {
      let parts: Vec<String> =
        items.iter().filter_map(value_to_string).filter(|part| !part.is_empty()).collect();
      (!parts.is_empty()).then(|| parts.join(", "))
    },
    Value::Object(object) => match (object.get("given"), object.get("family")) {
      (Some(given), Some(family)) => {
        let name = format!(
          "{} {}",
          value_to_string(given).unwrap_or_default(),
          value_to_string(family).unwrap_or_default()
        );
        Some(name.trim().to_string())
      },
      (None, Some(family)) => value_to_string(family),
      _ => ["name", "text", "value", "title"]
        .iter()
        .find_map(|key| object.get(*key).and_then(value_to_string)),
    },
    Value::Null => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CROSSREF: &str = r#"{
    "message": {
      "title": ["Attention Is All You Need"],
      "author": [
        {"given": "Ashish", "family": "Vaswani"},
        {"given": "Noam", "family": "Shazeer"},
        {"name": "Google Brain"}
      ],
      "container-title": [],
      "published": {"date-parts": [[2017, 12, 4]]},
      "type": "proceedings-article"
    }
  }"#;

  fn config(maps: &[(DraftField, &str)]) -> JsonConfig {
    JsonConfig {
      field_maps: maps
        .iter()
        .map(|(field, path)| (*field, FieldMap { path: path.to_string(), transform: None }))
        .collect(),
    }
  }

  #[test]
  fn extracts_nested_and_indexed_values() {
    let config = config(&[
      (DraftField::Title, "message/title"),
      (DraftField::Authors, "message/author"),
      (DraftField::Year, "message/published/date-parts/0/0"),
      (DraftField::PubType, "message/type"),
    ]);
    let fields = config.extract_fields(CROSSREF.as_bytes()).unwrap();

    assert_eq!(fields[&DraftField::Title], "Attention Is All You Need");
    assert_eq!(fields[&DraftField::Authors], "Ashish Vaswani, Noam Shazeer, Google Brain");
    assert_eq!(fields[&DraftField::Year], "2017");
    assert_eq!(fields[&DraftField::PubType], "proceedings-article");
  }

  #[test]
  fn missing_and_empty_values_are_absent() {
    let config = config(&[
      (DraftField::Publication, "message/container-title"),
      (DraftField::Doi, "message/DOI"),
      (DraftField::Arxiv, "message/title/3"),
    ]);
    assert!(config.extract_fields(CROSSREF.as_bytes()).unwrap().is_empty());
  }

  #[test]
  fn transforms_are_applied() {
    let mut config = config(&[(DraftField::Year, "date")]);
    config.field_maps.get_mut(&DraftField::Year).unwrap().transform =
      Some(Transform::Date { from_format: "%Y-%m-%d".into(), to_format: "%Y".into() });

    let fields = config.extract_fields(br#"{"date": "2019-05-01"}"#).unwrap();
    assert_eq!(fields[&DraftField::Year], "2019");
  }

  #[test]
  fn malformed_json_is_an_error() {
    let config = config(&[(DraftField::Title, "title")]);
    assert!(matches!(config.extract_fields(b"<html>"), Err(GleanerError::Json(_))));
  }

  #[test]
  fn openreview_value_objects_are_unwrapped() {
    let json: Value =
      serde_json::from_str(r#"{"content": {"venue": {"value": "ICLR 2023 poster"}}}"#).unwrap();
    assert_eq!(get_by_path(&json, "content/venue").unwrap(), "ICLR 2023 poster");
  }
}
