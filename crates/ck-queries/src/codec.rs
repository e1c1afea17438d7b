//! Filter wire codec
//!
//! A single filter travels as `{"Filter": "<predicate text>"}`. Encoding
//! writes the canonical text; decoding parses and binds it back against the
//! target entity. Keys other than `Filter` are ignored.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as Json;

use ck_core::{Entity, FormatError};

use crate::filters::EntityFilterCriteria;
use crate::parser;

/// Key holding the predicate text
pub const FILTER_KEY: &str = "Filter";

/// Reads and writes filter criteria in the `{"Filter": "..."}` format
pub struct FilterCodec;

impl FilterCodec {
    /// `None` encodes to JSON `null`
    pub fn encode<T>(criteria: Option<&EntityFilterCriteria<T>>) -> Json {
        match criteria {
            Some(criteria) => {
                let mut object = serde_json::Map::new();
                object.insert(FILTER_KEY.to_string(), Json::String(criteria.text().to_string()));
                Json::Object(object)
            }
            None => Json::Null,
        }
    }

    pub fn encode_to_string<T>(criteria: Option<&EntityFilterCriteria<T>>) -> String {
        Self::encode(criteria).to_string()
    }

    /// Decode a JSON document; top-level `null` decodes to `None`
    pub fn decode<T: Entity>(json: &str) -> Result<Option<EntityFilterCriteria<T>>, FormatError> {
        let value: Json = serde_json::from_str(json).map_err(|e| {
            tracing::debug!(error = %e, "Filter payload is not valid JSON");
            FormatError::InvalidPayload(e.to_string())
        })?;
        Self::decode_value(&value)
    }

    pub fn decode_value<T: Entity>(
        value: &Json,
    ) -> Result<Option<EntityFilterCriteria<T>>, FormatError> {
        let object = match value {
            Json::Null => return Ok(None),
            Json::Object(object) => object,
            other => {
                return Err(FormatError::InvalidPayload(format!(
                    "expected an object, found {}",
                    json_kind(other)
                )))
            }
        };

        let text = match object.get(FILTER_KEY) {
            None => {
                return Err(FormatError::MissingKey {
                    key: FILTER_KEY.to_string(),
                })
            }
            Some(Json::Null) => return Err(FormatError::NullText),
            Some(Json::String(text)) => text,
            Some(other) => {
                return Err(FormatError::NotAString {
                    found: json_kind(other).to_string(),
                })
            }
        };

        Self::parse_text(text).map(Some)
    }

    /// Parse and bind predicate text against `T`
    pub fn parse_text<T: Entity>(text: &str) -> Result<EntityFilterCriteria<T>, FormatError> {
        if text.trim().is_empty() {
            return Err(FormatError::EmptyText);
        }

        let unparsable = |reason: String| {
            tracing::debug!(entity = T::TYPE_NAME, text, reason = %reason, "Rejected filter text");
            FormatError::Unparsable {
                text: text.to_string(),
                reason,
            }
        };

        let expr = parser::parse(text).map_err(|e| unparsable(e.to_string()))?;
        EntityFilterCriteria::new(expr).map_err(|e| unparsable(e.to_string()))
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl<T> Serialize for EntityFilterCriteria<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(FILTER_KEY, self.text())?;
        map.end()
    }
}

impl<'de, T: Entity> Deserialize<'de> for EntityFilterCriteria<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Json::deserialize(deserializer)?;
        FilterCodec::decode_value(&value)
            .map_err(de::Error::custom)?
            .ok_or_else(|| de::Error::custom(FormatError::NullText))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field;
    use crate::fixtures::{sample_customers, Customer};

    fn criteria(text: &str) -> EntityFilterCriteria<Customer> {
        EntityFilterCriteria::parse(text).unwrap()
    }

    #[test]
    fn test_filter_round_trip() {
        let original = EntityFilterCriteria::<Customer>::new(
            field("Age").gt(18).and(field("Name").equals("John")),
        )
        .unwrap();

        let json = FilterCodec::encode_to_string(Some(&original));
        assert_eq!(json, r#"{"Filter":"Age > 18 && Name == \"John\""}"#);

        let decoded = FilterCodec::decode::<Customer>(&json).unwrap().unwrap();
        for row in sample_customers() {
            assert_eq!(decoded.matches(&row), original.matches(&row), "{:?}", row.name);
        }
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_round_trip_preserves_matching() {
        for text in [
            "Age >= 25 || !Active",
            "x => x.Address.City == 'Oslo' && x.Email != null",
            "Name.ToUpper().Contains('JOHN')",
            "(Score > 1.5)",
            "Age > -9223372036854775808",
        ] {
            let original = criteria(text);
            let decoded = FilterCodec::decode::<Customer>(&FilterCodec::encode_to_string(Some(&original)))
                .unwrap()
                .unwrap();
            for row in sample_customers() {
                assert_eq!(decoded.matches(&row), original.matches(&row), "{text}");
            }
        }
    }

    #[test]
    fn test_null_round_trip() {
        assert_eq!(FilterCodec::encode::<Customer>(None), Json::Null);
        assert!(FilterCodec::decode::<Customer>("null").unwrap().is_none());
    }

    #[test]
    fn test_malformed_filters() {
        let cases: Vec<(&str, FormatError)> = vec![
            (r#"{"Filter": ""}"#, FormatError::EmptyText),
            (r#"{"Filter": "   "}"#, FormatError::EmptyText),
            (r#"{"Filter": null}"#, FormatError::NullText),
            (
                "{}",
                FormatError::MissingKey {
                    key: "Filter".to_string(),
                },
            ),
            (
                r#"{"Filter": 42}"#,
                FormatError::NotAString {
                    found: "number".to_string(),
                },
            ),
        ];
        for (json, expected) in cases {
            assert_eq!(FilterCodec::decode::<Customer>(json).unwrap_err(), expected, "{json}");
        }

        let err = FilterCodec::decode::<Customer>("{}").unwrap_err();
        assert!(err.to_string().contains("Filter"));
        let err = FilterCodec::decode::<Customer>(r#"{"Filter": ""}"#).unwrap_err();
        assert_eq!(err.to_string(), "predicate text cannot be empty");
    }

    #[test]
    fn test_unparsable_text() {
        for json in [
            r#"{"Filter": "Age >"}"#,
            r#"{"Filter": "Height > 3"}"#,
            r#"{"Filter": "Name.Substring(1) == 'a'"}"#,
        ] {
            let err = FilterCodec::decode::<Customer>(json).unwrap_err();
            assert!(matches!(err, FormatError::Unparsable { .. }), "{json}");
            assert!(err.to_string().starts_with("unable to parse filter expression"));
        }
    }

    #[test]
    fn test_empty_parentheses_are_unparsable() {
        let err = FilterCodec::decode::<Customer>(r#"{"Filter": "()"}"#).unwrap_err();
        assert!(matches!(err, FormatError::Unparsable { .. }), "{err:?}");
        let err = FilterCodec::decode::<Customer>(r#"{"Filter": " ( ) "}"#).unwrap_err();
        assert!(matches!(err, FormatError::Unparsable { .. }), "{err:?}");
    }

    #[test]
    fn test_deeply_nested_text_is_rejected() {
        let json = serde_json::json!({ "Filter": format!("{}Active", "!".repeat(20_000)) }).to_string();
        match FilterCodec::decode::<Customer>(&json).unwrap_err() {
            FormatError::Unparsable { reason, .. } => assert!(reason.contains("nested too deeply"), "{reason}"),
            other => panic!("unexpected error: {other:?}"),
        }

        let json = serde_json::json!({ "Filter": format!("{}Active", "!".repeat(200)) }).to_string();
        assert!(FilterCodec::decode::<Customer>(&json).unwrap().is_some());
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(matches!(
            FilterCodec::decode::<Customer>("not json"),
            Err(FormatError::InvalidPayload(_))
        ));
        assert!(matches!(
            FilterCodec::decode::<Customer>("[1, 2]"),
            Err(FormatError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_unknown_sibling_keys_are_ignored() {
        let json = r#"{"Version": 2, "Meta": {"by": "ui"}, "Tags": [1, 2], "Filter": "Age > 40"}"#;
        let decoded = FilterCodec::decode::<Customer>(json).unwrap().unwrap();
        assert_eq!(decoded.text(), "Age > 40");
    }

    #[test]
    fn test_serde_integration() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Saved {
            name: String,
            filter: Option<EntityFilterCriteria<Customer>>,
        }

        let saved = Saved {
            name: "adults".to_string(),
            filter: Some(criteria("Age >= 18")),
        };
        let json = serde_json::to_string(&saved).unwrap();
        assert_eq!(json, r#"{"name":"adults","filter":{"Filter":"Age >= 18"}}"#);

        let back: Saved = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filter.unwrap().text(), "Age >= 18");

        let empty: Saved = serde_json::from_str(r#"{"name":"all","filter":null}"#).unwrap();
        assert!(empty.filter.is_none());

        let bad = serde_json::from_str::<Saved>(r#"{"name":"x","filter":{}}"#);
        assert!(bad.is_err());
    }
}
