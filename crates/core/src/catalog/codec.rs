//! JSON encoding of the catalog document.

use serde_json::Value;

use super::types::{Catalog, CatalogError, CatalogPage, CatalogRecord};

/// Serialize a catalog as pretty JSON with a trailing newline.
///
/// Output is a pure function of the catalog, so saving an unchanged catalog
/// reproduces the same bytes.
pub fn encode_catalog(catalog: &Catalog) -> Result<Vec<u8>, CatalogError> {
    let mut bytes =
        serde_json::to_vec_pretty(catalog).map_err(|e| CatalogError::Encode(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse and verify a persisted catalog.
///
/// Accepts the paginated document and the older flat-array layout; the flat
/// layout is returned as a single page and rewritten paginated on next save.
pub fn decode_catalog(bytes: &[u8], location: &str) -> Result<Catalog, CatalogError> {
    let corrupt = |reason: String| CatalogError::Corrupt {
        location: location.to_string(),
        reason,
    };

    let value: Value = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;

    let catalog = match value {
        Value::Object(_) => {
            serde_json::from_value::<Catalog>(value).map_err(|e| corrupt(e.to_string()))?
        }
        Value::Array(_) => {
            let records: Vec<CatalogRecord> =
                serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
            tracing::info!(
                location,
                records = records.len(),
                "Loaded legacy flat catalog; it will be rewritten paginated"
            );
            if records.is_empty() {
                Catalog::empty()
            } else {
                Catalog {
                    pages: vec![CatalogPage {
                        page: 1,
                        total: records.len() as u32,
                        images: records,
                    }],
                    ..Catalog::default()
                }
            }
        }
        other => {
            return Err(corrupt(format!(
                "expected an object or array at top level, found {}",
                json_kind(&other)
            )))
        }
    };

    catalog.verify().map_err(corrupt)?;
    Ok(catalog)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ItemIdentity;

    fn sample() -> Catalog {
        Catalog::paginate(
            vec![
                CatalogRecord::new(ItemIdentity::new("item003"), "u3", "2024-01-01T00:00:00.000Z"),
                CatalogRecord::new(ItemIdentity::new("item001"), "u1", "2024-01-01T00:00:01.000Z"),
            ],
            60,
        )
    }

    #[test]
    fn test_document_shape() {
        let bytes = encode_catalog(&sample()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["pages"][0]["page"], 1);
        assert_eq!(value["pages"][0]["total"], 2);
        assert_eq!(value["pages"][0]["images"][0]["publicId"], "item003");
        assert_eq!(value["pages"][0]["images"][1]["url"], "u1");
        assert!(bytes.ends_with(b"}\n"));
    }

    #[test]
    fn test_reencoding_is_byte_identical() {
        let first = encode_catalog(&sample()).unwrap();
        let decoded = decode_catalog(&first, "mem").unwrap();
        let second = encode_catalog(&decoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_top_level_keys_round_trip() {
        let json = br#"{"pages": [], "generatedBy": "gallery-builder", "version": 2}"#;
        let catalog = decode_catalog(json, "mem").unwrap();
        assert_eq!(catalog.extra["version"], 2);

        let value: Value = serde_json::from_slice(&encode_catalog(&catalog).unwrap()).unwrap();
        assert_eq!(value["generatedBy"], "gallery-builder");
        assert_eq!(value["version"], 2);
        assert_eq!(value["pages"], serde_json::json!([]));
    }

    #[test]
    fn test_unknown_page_keys_are_not_kept() {
        let json = br#"{"pages": [{"page": 1, "total": 0, "images": [], "title": "x"}]}"#;
        let catalog = decode_catalog(json, "mem").unwrap();

        let value: Value = serde_json::from_slice(&encode_catalog(&catalog).unwrap()).unwrap();
        assert!(value["pages"][0].get("title").is_none());
    }

    #[test]
    fn test_decode_legacy_flat_array() {
        let json = r#"[
            {"publicId": "item1", "url": "u1", "timestamp": "2023-06-01T12:00:00"},
            {"publicId": "item2", "url": "u2", "timestamp": "2023-06-01T12:00:05"}
        ]"#;
        let catalog = decode_catalog(json.as_bytes(), "legacy.json").unwrap();
        assert_eq!(catalog.record_count(), 2);
        assert_eq!(catalog.flatten()[1].identity.as_str(), "item2");
        // timestamps are preserved verbatim, even without an offset
        assert_eq!(catalog.flatten()[0].captured_at, "2023-06-01T12:00:00");
    }

    #[test]
    fn test_decode_empty_flat_array() {
        let catalog = decode_catalog(b"[]", "legacy.json").unwrap();
        assert_eq!(catalog.page_count(), 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_catalog(b"{not json", "bad.json").unwrap_err();
        assert!(err.is_corrupt());
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_decode_rejects_wrong_schema() {
        let err = decode_catalog(br#"{"pages": [{"page": "one"}]}"#, "bad.json").unwrap_err();
        assert!(err.is_corrupt());

        let err = decode_catalog(b"42", "bad.json").unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_decode_rejects_duplicate_identities() {
        let json = r#"{"pages": [
            {"page": 1, "total": 1, "images": [{"publicId": "item1", "url": "a", "timestamp": "t"}]},
            {"page": 2, "total": 1, "images": [{"publicId": "item1", "url": "b", "timestamp": "t"}]}
        ]}"#;
        let err = decode_catalog(json.as_bytes(), "dup.json").unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_decode_empty_document_is_corrupt() {
        assert!(decode_catalog(b"", "empty.json").unwrap_err().is_corrupt());
    }
}
