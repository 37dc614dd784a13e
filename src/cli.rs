use crate::orchestrator::Inputs;
use clap::Parser;
use std::path::PathBuf;

// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
///
/// Each input also reads the environment variable GitHub Actions sets for it.
#[derive(Parser, Debug)]
#[command(
    name = "yaml-schema-check",
    version,
    about = "Validate workspace YAML files against JSON Schemas",
    long_about = None
)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: YAML_SCHEMA_CHECK_LOG=] [default: info]
    #[arg(
        long,
        env = "YAML_SCHEMA_CHECK_LOG",
        default_value = "info",
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    /// Workspace root; all relative paths resolve against it
    #[arg(long, env = "GITHUB_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Settings file (JSON or JSONC) relative to the workspace
    #[arg(long, env = "INPUT_SETTINGSFILE", default_value = ".vscode/settings.json")]
    pub settings_file: String,

    /// Inline schema mapping as JSON, e.g. {"config/*.yaml": "schema.json"}
    #[arg(long, env = "INPUT_YAMLSCHEMASJSON", default_value = "")]
    pub yaml_schemas_json: String,

    /// YAML version (1.1 or 1.2), overrides the settings file
    #[arg(long, env = "INPUT_YAMLVERSION", default_value = "")]
    pub yaml_version: String,

    /// Report file path (.md or .json)
    #[arg(long)]
    pub output: Option<String>,
}

impl Cli {
    pub fn inputs(&self) -> Inputs {
        Inputs {
            workspace: self.workspace.clone(),
            settings_file: self.settings_file.trim().to_string(),
            yaml_schemas_json: self.yaml_schemas_json.trim().to_string(),
            yaml_version: self.yaml_version.trim().to_string(),
            output: self.output.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_from_args() {
        let cli = Cli::try_parse_from([
            "yaml-schema-check",
            "--workspace",
            "/work",
            "--settings-file",
            " ci/settings.json ",
            "--yaml-schemas-json",
            r#"{"*.yaml": "s.json"}"#,
            "--yaml-version",
            "1.1",
            "--output",
            "report.md",
        ])
        .unwrap();

        let inputs = cli.inputs();
        assert_eq!(inputs.workspace, Some(PathBuf::from("/work")));
        assert_eq!(inputs.settings_file, "ci/settings.json");
        assert_eq!(inputs.yaml_schemas_json, r#"{"*.yaml": "s.json"}"#);
        assert_eq!(inputs.yaml_version, "1.1");
        assert_eq!(inputs.output.as_deref(), Some("report.md"));
    }
}
