//! XML response processing.
//!
//! Paths are the slash separated element names from the document root, e.g. `feed/entry/title`.
//! When an element occurs several times under the same path (authors, typically), the values are
//! joined with `", "`.

use quick_xml::{events::Event, Reader};

use super::*;

/// Configuration for XML response processing.
#[derive(Debug, Clone, Deserialize)]
pub struct XmlConfig {
  /// Whether to match elements by local name, ignoring namespace prefixes
  #[serde(default)]
  pub strip_namespaces: bool,
  /// How to extract each draft field
  pub field_maps:       BTreeMap<DraftField, FieldMap>,
}

impl ResponseProcessor for XmlConfig {
  fn extract_fields(&self, data: &[u8]) -> Result<BTreeMap<DraftField, String>> {
    let content = self.extract_content(&String::from_utf8_lossy(data))?;
    trace!("Processing XML response with {} distinct paths", content.len());

    let mut fields = BTreeMap::new();
    for (field, map) in &self.field_maps {
      if let Some(values) = content.get(&map.path) {
        let value = finish_value(values.join(", "), map)?;
        if !value.trim().is_empty() {
          fields.insert(*field, value);
        }
      }
    }
    Ok(fields)
  }
}

impl XmlConfig {
  /// Collects the text of every element, keyed by its path.
  fn extract_content(&self, xml: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut content: HashMap<String, Vec<String>> = HashMap::new();
    let mut path_stack: Vec<String> = Vec::new();
    // Text of the innermost open element, which may arrive in several events.
    let mut text = String::new();

    loop {
      let event =
        reader.read_event().map_err(|e| GleanerError::Parse(format!("Invalid XML: {e}")))?;
      match event {
        Event::Start(e) => {
          let name = if self.strip_namespaces {
            String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
          } else {
            String::from_utf8_lossy(e.name().as_ref()).into_owned()
          };
          path_stack.push(name);
          text.clear();
        },
        Event::Text(e) => {
          let unescaped =
            e.unescape().map_err(|e| GleanerError::Parse(format!("Invalid XML: {e}")))?;
          text.push_str(&unescaped);
        },
        Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
        Event::End(_) => {
          let trimmed = text.trim();
          if !trimmed.is_empty() {
            content.entry(path_stack.join("/")).or_default().push(trimmed.to_string());
          }
          text.clear();
          path_stack.pop();
        },
        Event::Eof => break,
        _ => (),
      }
    }

    Ok(content)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ARXIV: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title>ArXiv Query: id_list=1706.03762</title>
  <entry>
    <title>Attention Is All
      You Need</title>
    <published>2017-06-12T17:57:34Z</published>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:doi>10.48550/arXiv.1706.03762</arxiv:doi>
  </entry>
</feed>"#;

  fn config(strip_namespaces: bool, maps: &[(DraftField, &str)]) -> XmlConfig {
    XmlConfig {
      strip_namespaces,
      field_maps: maps
        .iter()
        .map(|(field, path)| (*field, FieldMap { path: path.to_string(), transform: None }))
        .collect(),
    }
  }

  #[test]
  fn repeated_elements_are_joined() {
    let config = config(true, &[(DraftField::Authors, "feed/entry/author/name")]);
    let fields = config.extract_fields(ARXIV.as_bytes()).unwrap();
    assert_eq!(fields[&DraftField::Authors], "Ashish Vaswani, Noam Shazeer");
  }

  #[test]
  fn namespaces_are_stripped_on_request() {
    let stripped = config(true, &[(DraftField::Doi, "feed/entry/doi")]);
    assert_eq!(
      stripped.extract_fields(ARXIV.as_bytes()).unwrap()[&DraftField::Doi],
      "10.48550/arXiv.1706.03762"
    );

    let qualified = config(false, &[(DraftField::Doi, "feed/entry/arxiv:doi")]);
    assert_eq!(
      qualified.extract_fields(ARXIV.as_bytes()).unwrap()[&DraftField::Doi],
      "10.48550/arXiv.1706.03762"
    );
  }

  #[test]
  fn whitespace_transform_cleans_wrapped_titles() {
    let mut config = config(true, &[(DraftField::Title, "feed/entry/title")]);
    config.field_maps.get_mut(&DraftField::Title).unwrap().transform =
      Some(Transform::Replace { pattern: r"\s+".parse().unwrap(), replacement: " ".into() });

    let fields = config.extract_fields(ARXIV.as_bytes()).unwrap();
    assert_eq!(fields[&DraftField::Title], "Attention Is All You Need");
  }

  #[test]
  fn empty_feed_has_no_fields() {
    let config = config(true, &[(DraftField::Title, "feed/entry/title")]);
    let fields = config.extract_fields(b"<feed><title>ArXiv Query</title></feed>").unwrap();
    assert!(fields.is_empty());
  }

  #[test]
  fn mismatched_tags_are_a_parse_error() {
    let config = config(true, &[(DraftField::Title, "feed/entry/title")]);
    let result = config.extract_fields(b"<feed><entry><title>x</entry></feed>");
    assert!(matches!(result, Err(GleanerError::Parse(_))));
  }
}
