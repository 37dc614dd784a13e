use crate::types::{SchemaMapping, SchemaRef};
use crate::util;
use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Settings key holding the schema mapping
const SCHEMAS_KEY: &str = "yaml.schemas";
/// Settings key holding the YAML dialect version
const VERSION_KEY: &str = "yaml.yamlVersion";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid yamlSchemasJson")]
    InlineSchemas(#[from] serde_json::Error),
    #[error("Invalid yamlSchemasJson: expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Schema configuration pulled out of a settings document
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Settings {
    pub schemas: Option<SchemaMapping>,
    pub yaml_version: Option<String>,
}

impl Settings {
    /// Load settings from a JSON/JSONC file
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub async fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("Settings file {} not found, skipping", path.display());
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let document: Value = serde_json::from_str(&util::strip_jsonc(&content))
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        Ok(Some(Self::from_value(&document)))
    }

    /// Extract the fields we care about, treating any unexpected shape as absent
    pub fn from_value(document: &Value) -> Self {
        let schemas = match document.get(SCHEMAS_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Object(entries)) => Some(
                entries
                    .iter()
                    .map(|(pattern, value)| (pattern.clone(), schema_ref(value.clone())))
                    .collect(),
            ),
            Some(other) => {
                warn!(
                    "Ignoring '{}' in settings: expected an object, got {}",
                    SCHEMAS_KEY,
                    json_kind(other)
                );
                None
            }
        };

        let yaml_version = match document.get(VERSION_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                warn!("Ignoring '{}' in settings: expected a string, got {}", VERSION_KEY, other);
                None
            }
        };

        Self {
            schemas,
            yaml_version,
        }
    }
}

/// Effective configuration handed to the validation engine
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub schemas: SchemaMapping,
    pub version: Option<String>,
}

/// Combine settings-derived and inline configuration
///
/// Inline schemas are applied after the settings schemas, so an inline entry
/// replaces a settings entry with the same pattern. An explicit version wins over
/// the settings version.
pub fn merge(
    settings_schemas: Option<&SchemaMapping>,
    inline_schemas_json: Option<&str>,
    settings_version: Option<&str>,
    inline_version: Option<&str>,
) -> Result<EffectiveConfig, ConfigError> {
    let inline_schemas = inline_schemas_json
        .filter(|json| !json.is_empty())
        .map(parse_inline_schemas)
        .transpose()?;

    Ok(EffectiveConfig {
        schemas: merge_schemas(settings_schemas, inline_schemas.as_ref()),
        version: resolve_version(inline_version, settings_version),
    })
}

/// Parse inline schemas; only malformed JSON or a non-object is an error
pub fn parse_inline_schemas(json: &str) -> Result<SchemaMapping, ConfigError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(entries) => Ok(entries
            .into_iter()
            .map(|(pattern, value)| (pattern, schema_ref(value)))
            .collect()),
        other => Err(ConfigError::NotAnObject(json_kind(&other))),
    }
}

fn schema_ref(value: Value) -> SchemaRef {
    match value {
        Value::String(s) => SchemaRef::One(s),
        Value::Array(items) if items.iter().all(Value::is_string) => SchemaRef::Many(
            items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        other => SchemaRef::Other(other),
    }
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

pub fn merge_schemas(
    settings: Option<&SchemaMapping>,
    inline: Option<&SchemaMapping>,
) -> SchemaMapping {
    let mut merged = SchemaMapping::new();
    for source in [settings, inline].into_iter().flatten() {
        for (pattern, schema) in source {
            // insert keeps the original slot on collision, so order follows first appearance
            merged.insert(pattern.clone(), schema.clone());
        }
    }
    merged
}

pub fn resolve_version(explicit: Option<&str>, settings: Option<&str>) -> Option<String> {
    match explicit {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => settings.map(str::to_string),
    }
}

/// Render a mapping for logs
pub fn describe(schemas: &SchemaMapping) -> String {
    schemas
        .iter()
        .map(|(pattern, schema)| match schema {
            SchemaRef::One(s) => format!("{} -> {}", pattern, s),
            SchemaRef::Many(ss) => format!("{} -> [{}]", pattern, ss.join(", ")),
            SchemaRef::Other(v) => format!("{} -> {} (ignored)", pattern, v),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one(s: &str) -> SchemaRef {
        SchemaRef::One(s.into())
    }

    #[test]
    fn test_merge_inline_overrides_settings() {
        let mut settings = SchemaMapping::new();
        settings.insert("a".into(), one("1"));

        let config = merge(Some(&settings), Some(r#"{"a":"2","b":"3"}"#), None, None).unwrap();

        assert_eq!(config.schemas.len(), 2);
        assert_eq!(config.schemas["a"], one("2"));
        assert_eq!(config.schemas["b"], one("3"));
    }

    #[test]
    fn test_merge_keeps_non_string_values() {
        let mut settings = SchemaMapping::new();
        settings.insert("a".into(), SchemaRef::Other(json!(1)));

        let config = merge(Some(&settings), Some(r#"{"a":2,"b":3}"#), None, None).unwrap();

        let keys: Vec<_> = config.schemas.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(config.schemas["a"], SchemaRef::Other(json!(2)));
        assert_eq!(config.schemas["b"], SchemaRef::Other(json!(3)));
    }

    #[test]
    fn test_merge_non_object_inline_fails() {
        let err = merge(None, Some(r#"["a.json"]"#), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::NotAnObject("an array")));
    }

    #[test]
    fn test_merge_nothing_is_empty() {
        let config = merge(None, None, None, None).unwrap();
        assert!(config.schemas.is_empty());
        assert_eq!(config.version, None);
    }

    #[test]
    fn test_merge_empty_inline_is_absent() {
        let mut settings = SchemaMapping::new();
        settings.insert("*.yaml".into(), one("schema.json"));

        let config = merge(Some(&settings), Some(""), None, None).unwrap();
        assert_eq!(config.schemas, settings);
    }

    #[test]
    fn test_merge_array_refs() {
        let config = merge(None, Some(r#"{"ci/*.yml": ["a.json", "b.json"]}"#), None, None).unwrap();
        assert_eq!(
            config.schemas["ci/*.yml"],
            SchemaRef::Many(vec!["a.json".into(), "b.json".into()])
        );
    }

    #[test]
    fn test_merge_malformed_inline_fails() {
        let err = merge(None, Some("{not json"), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::InlineSchemas(_)));
        assert_eq!(err.to_string(), "Invalid yamlSchemasJson");
        assert!(format!("{:#}", anyhow::Error::from(err)).starts_with("Invalid yamlSchemasJson: "));
    }

    #[test]
    fn test_resolve_version() {
        assert_eq!(resolve_version(Some("1.1"), Some("1.2")), Some("1.1".into()));
        assert_eq!(resolve_version(Some(""), Some("1.2")), Some("1.2".into()));
        assert_eq!(resolve_version(None, Some("1.2")), Some("1.2".into()));
        assert_eq!(resolve_version(Some(""), None), None);
    }

    #[test]
    fn test_settings_from_value() {
        let settings = Settings::from_value(&json!({
            "yaml.schemas": { "*.yaml": "schema.json", "ci/*.yml": ["a.json"] },
            "yaml.yamlVersion": "1.1",
            "editor.tabSize": 2
        }));
        let schemas = settings.schemas.unwrap();
        assert_eq!(schemas["*.yaml"], one("schema.json"));
        assert_eq!(settings.yaml_version.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_settings_from_value_wrong_shapes() {
        let settings = Settings::from_value(&json!({
            "yaml.schemas": ["not", "an", "object"],
            "yaml.yamlVersion": 1.2
        }));
        assert_eq!(settings, Settings::default());

        let settings = Settings::from_value(&json!({ "yaml.schemas": null }));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_from_value_keeps_good_entries() {
        let settings = Settings::from_value(&json!({
            "yaml.schemas": { "*.yaml": "schema.json", "odd/*.yaml": { "url": "x" } }
        }));
        let schemas = settings.schemas.unwrap();
        assert_eq!(schemas["*.yaml"], one("schema.json"));
        assert_eq!(schemas["odd/*.yaml"], SchemaRef::Other(json!({ "url": "x" })));
    }

    #[tokio::test]
    async fn test_settings_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("missing.json")).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_settings_load_jsonc() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            "{\n  // schemas\n  \"yaml.schemas\": { \"*.yaml\": \"s.json\", },\n}\n",
        )
        .unwrap();

        let loaded = Settings::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded.schemas.unwrap()["*.yaml"], one("s.json"));
    }

    #[tokio::test]
    async fn test_settings_load_malformed_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ \"yaml.schemas\": ").unwrap();

        let err = Settings::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }
}
