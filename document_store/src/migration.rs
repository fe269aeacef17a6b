//! Schema migration (§4.6): a one-shot upgrade from the legacy v0 row layout (metadata-embedded)
//! to v1 (`DocumentData`'s split fields). The store owns only the contract; a caller may register
//! a custom migration function before the store is first opened.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;

use crate::document::DocumentData;

/// The legacy v0 layout: everything but `provisioned`/`created` lived inside an opaque
/// `metadata` blob that the application itself used to pick apart.
#[derive(Debug, Clone, Deserialize)]
struct LegacyDocumentDataV0 {
    provisioned: bool,
    created: DateTime<Utc>,
    metadata: Option<serde_json::Value>,
}

pub type CustomMigration = Box<dyn Fn(&[u8]) -> Option<DocumentData> + Send + Sync>;

/// Attempts to decode a stored row as the current schema; on failure, falls back to the
/// registered custom migration (if any), then the built-in v0 decoder. Unparseable rows are
/// retained as not-provisioned with the original bytes preserved verbatim in `metadata` (§4.6,
/// §9: "(b) ... an application policy, not recovered here").
pub fn decode_row(bytes: &[u8], custom_migration: Option<&CustomMigration>) -> DocumentData {
    if let Ok(data) = serde_json::from_slice::<DocumentData>(bytes) {
        return data;
    }

    if let Some(migrate) = custom_migration {
        if let Some(data) = migrate(bytes) {
            return data;
        }
    }

    if let Ok(legacy) = serde_json::from_slice::<LegacyDocumentDataV0>(bytes) {
        return DocumentData {
            provisioned: legacy.provisioned,
            created: legacy.created,
            ordering_key: None,
            display_name: None,
            type_display_name: None,
            card_art: None,
            issuer_logo: None,
            authorization_data: None,
            metadata: legacy.metadata,
        };
    }

    let mut data = DocumentData::new(Utc::now());
    data.provisioned = false;
    data.metadata = Some(serde_json::Value::String(base64_encode(bytes)));
    data
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_schema_row_decodes_directly() {
        let data = DocumentData::new(Utc::now());
        let bytes = serde_json::to_vec(&data).unwrap();
        let decoded = decode_row(&bytes, None);
        assert_eq!(decoded.provisioned, data.provisioned);
    }

    #[test]
    fn legacy_v0_row_migrates_via_builtin_decoder() {
        let legacy = LegacyDocumentDataV0 {
            provisioned: true,
            created: Utc::now(),
            metadata: Some(serde_json::json!({"displayName": "Old Style"})),
        };
        let bytes = serde_json::to_vec(&legacy).unwrap();

        let decoded = decode_row(&bytes, None);
        assert!(decoded.provisioned);
        assert!(decoded.ordering_key.is_none());
        assert_eq!(decoded.metadata, legacy.metadata);
    }

    #[test]
    fn custom_migration_takes_priority_over_builtin_decoder() {
        let legacy = LegacyDocumentDataV0 { provisioned: false, created: Utc::now(), metadata: None };
        let bytes = serde_json::to_vec(&legacy).unwrap();

        let custom: CustomMigration = Box::new(|_bytes| {
            let mut data = DocumentData::new(Utc::now());
            data.display_name = Some("from custom migration".to_owned());
            Some(data)
        });

        let decoded = decode_row(&bytes, Some(&custom));
        assert_eq!(decoded.display_name.as_deref(), Some("from custom migration"));
    }

    #[test]
    fn unparseable_row_is_retained_not_provisioned() {
        let decoded = decode_row(b"not json at all", None);
        assert!(!decoded.provisioned);
        assert!(decoded.metadata.is_some());
    }
}
