//! YAML validation against JSON Schemas.

pub mod discover;
pub mod document;
pub mod schema;

use crate::types::{Diagnostic, Range, SchemaMapping, ValidationResult};
use anyhow::Context;
use async_trait::async_trait;
use document::{Document, YamlVersion};
use schema::{SchemaMatcher, SchemaStore};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Validates the YAML files of a workspace
#[async_trait]
pub trait ValidationEngine: Send + Sync {
    /// One result per file, in a stable order
    async fn validate(
        &self,
        workspace: &Path,
        schemas: &SchemaMapping,
        version: Option<&str>,
    ) -> anyhow::Result<Vec<ValidationResult>>;
}

/// Engine backed by `yaml-rust2` for loading and `jsonschema` for evaluation
#[derive(Default)]
pub struct YamlSchemaEngine {
    client: reqwest::Client,
}

impl YamlSchemaEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValidationEngine for YamlSchemaEngine {
    async fn validate(
        &self,
        workspace: &Path,
        schemas: &SchemaMapping,
        version: Option<&str>,
    ) -> anyhow::Result<Vec<ValidationResult>> {
        let version = YamlVersion::parse(version);
        debug!("Using YAML version {:?}", version);

        let matcher = SchemaMatcher::new(schemas);
        let mut store = SchemaStore::new(workspace, self.client.clone());

        let files = discover::yaml_files(workspace)
            .with_context(|| format!("Failed to scan workspace {}", workspace.display()))?;
        info!("Validating {} YAML files", files.len());

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let bytes = tokio::fs::read(workspace.join(&file))
                .await
                .with_context(|| format!("Failed to read {}", file))?;
            let source = match String::from_utf8(bytes) {
                Ok(source) => source,
                Err(e) => {
                    warn!("{} is not valid UTF-8", file);
                    let diagnostic = Diagnostic {
                        message: format!("File is not valid UTF-8: {}", e.utf8_error()),
                        range: Range::default(),
                    };
                    results.push(ValidationResult::invalid(file, vec![diagnostic]));
                    continue;
                }
            };
            let diagnostics = check_file(&mut store, &matcher, &file, &source, version).await?;
            debug!("{}: {} diagnostics", file, diagnostics.len());
            results.push(ValidationResult::from_diagnostics(file, diagnostics));
        }

        Ok(results)
    }
}

async fn check_file(
    store: &mut SchemaStore,
    matcher: &SchemaMatcher,
    file: &str,
    source: &str,
    version: YamlVersion,
) -> anyhow::Result<Vec<Diagnostic>> {
    let document = match Document::parse(source, version) {
        Ok(Some(document)) => document,
        Ok(None) => {
            trace!("{} is empty", file);
            return Ok(vec![]);
        }
        Err(e) => return Ok(vec![e.into_diagnostic()]),
    };

    let mut diagnostics = Vec::new();
    for reference in matcher.schemas_for(file) {
        trace!("Checking {} against {}", file, reference);
        let validator = store.validator(reference).await?;
        for error in validator.iter_errors(&document.value) {
            let pointer = error.instance_path.to_string();
            diagnostics.push(Diagnostic {
                message: error.to_string(),
                range: document.locate(&pointer),
            });
        }
    }
    Ok(diagnostics)
}
