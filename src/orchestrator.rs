use crate::actions::ActionSink;
use crate::config::{self, Settings};
use crate::engine::ValidationEngine;
use crate::{annotate, partition, report};
use anyhow::Context;
use std::path::PathBuf;
use tracing::{debug, error, info};

pub const FAILURE_MESSAGE: &str = "Schema validation failed on one or more YAML files.";
pub const SUCCESS_MESSAGE: &str = "✅ YAML Schema validation completed successfully";

/// Raw inputs for one run
#[derive(Debug, Default, Clone)]
pub struct Inputs {
    pub workspace: Option<PathBuf>,
    /// Settings file path relative to the workspace; empty for none
    pub settings_file: String,
    pub yaml_schemas_json: String,
    pub yaml_version: String,
    /// Optional report path (.md or .json)
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
}

/// Run one validation pass and report it to `sink`
///
/// Any error along the way becomes a failed run carrying the error's message.
pub async fn run(
    inputs: &Inputs,
    engine: &dyn ValidationEngine,
    sink: &mut dyn ActionSink,
) -> Outcome {
    match execute(inputs, engine, sink).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // {:#} includes the cause chain
            let message = format!("{:#}", e);
            error!("Run failed: {}", message);
            sink.set_failed(&message);
            Outcome::Failed(message)
        }
    }
}

async fn execute(
    inputs: &Inputs,
    engine: &dyn ValidationEngine,
    sink: &mut dyn ActionSink,
) -> anyhow::Result<Outcome> {
    let workspace = inputs
        .workspace
        .as_deref()
        .context("GITHUB_WORKSPACE is not set")?;
    debug!("Workspace: {}", workspace.display());

    let settings = if inputs.settings_file.is_empty() {
        None
    } else {
        Settings::load(&workspace.join(&inputs.settings_file)).await?
    };
    let settings = settings.unwrap_or_default();

    let config = config::merge(
        settings.schemas.as_ref(),
        Some(inputs.yaml_schemas_json.as_str()),
        settings.yaml_version.as_deref(),
        Some(inputs.yaml_version.as_str()),
    )?;
    info!("Using {} schema mappings", config.schemas.len());
    debug!("Schemas: {}", config::describe(&config.schemas));

    let results = engine
        .validate(workspace, &config.schemas, config.version.as_deref())
        .await?;

    let partition = partition::partition(&results);
    let annotations = annotate::project(&results);
    info!(
        "Validated {} files: {} valid, {} invalid",
        results.len(),
        partition.valid_paths.len(),
        partition.invalid_paths.len()
    );

    let invalid_files = partition.invalid_files();
    sink.set_output("validFiles", &partition.valid_files())?;
    sink.set_output("invalidFiles", &invalid_files)?;

    if let Some(path) = &inputs.output {
        report::write_output(path, &results, &partition, &annotations)?;
    }

    if partition.has_invalid() {
        sink.warning(&format!("Invalid Files: {}", invalid_files));
        for annotation in &annotations {
            sink.error(annotation);
        }
        sink.set_failed(FAILURE_MESSAGE);
        Ok(Outcome::Failed(FAILURE_MESSAGE.to_string()))
    } else {
        sink.info(SUCCESS_MESSAGE);
        Ok(Outcome::Succeeded)
    }
}
