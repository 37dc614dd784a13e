use crate::types::{SchemaMapping, SchemaRef};
use anyhow::{Context, anyhow};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps workspace-relative file paths to the schema references that apply
pub struct SchemaMatcher {
    globset: GlobSet,
    /// Schema references for each glob added to the set, by glob index
    refs: Vec<Vec<String>>,
}

impl SchemaMatcher {
    pub fn new(schemas: &SchemaMapping) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut refs = Vec::new();

        for (pattern, schema) in schemas {
            if let SchemaRef::Other(value) = schema {
                warn!(
                    "Ignoring schema pattern '{}': expected a string or an array of strings, got {}",
                    pattern, value
                );
                continue;
            }
            let normalized = normalize_pattern(pattern);
            match GlobBuilder::new(&normalized).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    refs.push(schema.iter().map(str::to_string).collect());
                }
                Err(e) => warn!("Invalid schema pattern '{}': {}", pattern, e),
            }
        }

        let globset = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build schema globset: {}", e);
            GlobSet::empty()
        });

        Self { globset, refs }
    }

    /// Schema references for `path`, in mapping order, without duplicates
    pub fn schemas_for(&self, path: &str) -> Vec<&str> {
        let mut matched: Vec<&str> = Vec::new();
        for idx in self.globset.matches(path) {
            for reference in &self.refs[idx] {
                if !matched.contains(&reference.as_str()) {
                    matched.push(reference);
                }
            }
        }
        matched
    }
}

/// Anchor `/` and `./` patterns at the workspace root; match others at any depth
fn normalize_pattern(pattern: &str) -> String {
    if let Some(anchored) = pattern.strip_prefix("./").or_else(|| pattern.strip_prefix('/')) {
        anchored.to_string()
    } else if pattern.starts_with("**/") {
        pattern.to_string()
    } else {
        format!("**/{}", pattern)
    }
}

/// Loads and compiles schemas, once per reference
pub struct SchemaStore {
    workspace: PathBuf,
    client: reqwest::Client,
    compiled: HashMap<String, Arc<Validator>>,
}

impl SchemaStore {
    pub fn new(workspace: &Path, client: reqwest::Client) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            client,
            compiled: HashMap::new(),
        }
    }

    pub async fn validator(&mut self, reference: &str) -> anyhow::Result<Arc<Validator>> {
        if let Some(validator) = self.compiled.get(reference) {
            return Ok(validator.clone());
        }

        info!("Loading schema {}", reference);
        let schema = self.load(reference).await?;

        // Compilation may resolve remote $refs with a blocking client
        let owned_ref = reference.to_string();
        let validator = tokio::task::spawn_blocking(move || {
            jsonschema::validator_for(&schema)
                .map_err(|e| anyhow!("Failed to compile schema {}: {}", owned_ref, e))
        })
        .await
        .context("Schema compilation task failed")??;

        let validator = Arc::new(validator);
        self.compiled.insert(reference.to_string(), validator.clone());
        Ok(validator)
    }

    async fn load(&self, reference: &str) -> anyhow::Result<Value> {
        let content = if reference.starts_with("http://") || reference.starts_with("https://") {
            debug!("Fetching schema {}", reference);
            self.client
                .get(reference)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("Failed to fetch schema {}", reference))?
                .text()
                .await
                .with_context(|| format!("Failed to read schema {}", reference))?
        } else {
            let path = self.local_path(reference);
            debug!("Reading schema {}", path.display());
            tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read schema {}", path.display()))?
        };

        parse_schema(reference, &content)
    }

    fn local_path(&self, reference: &str) -> PathBuf {
        let path = reference.strip_prefix("file://").unwrap_or(reference);
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}

fn parse_schema(reference: &str, content: &str) -> anyhow::Result<Value> {
    let lower = reference.to_lowercase();
    if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        serde_yaml_ng::from_str(content)
            .with_context(|| format!("Failed to parse YAML schema {}", reference))
    } else {
        serde_json::from_str(content)
            .with_context(|| format!("Failed to parse JSON schema {}", reference))
    }
}
