//! GitHub Actions workflow-command output
//!
//! Messages, annotations and failure go to stdout as workflow commands. Step
//! outputs are appended to the `GITHUB_OUTPUT` file when the runner provides one.

use crate::types::AnnotationRequest;
use anyhow::Context;
use std::io::Write;
use std::path::PathBuf;

/// Where the run reports its results
pub trait ActionSink {
    fn info(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    /// Emit an error-level annotation
    fn error(&mut self, annotation: &AnnotationRequest);
    fn set_output(&mut self, name: &str, value: &str) -> anyhow::Result<()>;
    /// Mark the run failed
    fn set_failed(&mut self, message: &str);
}

pub struct GithubActions<W: Write> {
    out: W,
    output_file: Option<PathBuf>,
}

impl GithubActions<std::io::Stdout> {
    /// Sink writing to stdout, with outputs going to `GITHUB_OUTPUT` if set
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(std::io::stdout(), output_file)
    }
}

impl<W: Write> GithubActions<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self { out, output_file }
    }

    fn emit(&mut self, line: &str) {
        // Nothing sensible to do if stdout is gone
        let _ = writeln!(self.out, "{}", line);
    }
}

impl<W: Write> ActionSink for GithubActions<W> {
    fn info(&mut self, message: &str) {
        self.emit(message);
    }

    fn warning(&mut self, message: &str) {
        let line = command("warning", &[], message);
        self.emit(&line);
    }

    fn error(&mut self, annotation: &AnnotationRequest) {
        let line = command("error", &annotation_properties(annotation), &annotation.message);
        self.emit(&line);
    }

    fn set_output(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        let Some(path) = self.output_file.clone() else {
            let line = command("set-output", &[("name", name.to_string())], value);
            self.emit(&line);
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open output file {}", path.display()))?;
        write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")
            .with_context(|| format!("Failed to write output '{}'", name))?;
        Ok(())
    }

    fn set_failed(&mut self, message: &str) {
        let line = command("error", &[], message);
        self.emit(&line);
    }
}

fn annotation_properties(annotation: &AnnotationRequest) -> Vec<(&'static str, String)> {
    let mut props = vec![("file", annotation.file.clone())];
    let numbered = [
        ("line", annotation.start_line),
        ("endLine", annotation.end_line),
        ("col", annotation.start_column),
        ("endColumn", annotation.end_column),
    ];
    props.extend(
        numbered
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v.to_string()))),
    );
    props
}

/// Format a `::name key=value,...::message` workflow command
fn command(name: &str, properties: &[(&str, String)], message: &str) -> String {
    let props = properties
        .iter()
        .map(|(key, value)| format!("{}={}", key, escape_property(value)))
        .collect::<Vec<_>>()
        .join(",");
    if props.is_empty() {
        format!("::{}::{}", name, escape_data(message))
    } else {
        format!("::{} {}::{}", name, props, escape_data(message))
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> GithubActions<Vec<u8>> {
        GithubActions::new(Vec::new(), None)
    }

    fn written(sink: GithubActions<Vec<u8>>) -> String {
        String::from_utf8(sink.out).unwrap()
    }

    fn annotation() -> AnnotationRequest {
        AnnotationRequest {
            file: "b.yaml".into(),
            message: "type mismatch".into(),
            start_line: Some(3),
            end_line: Some(3),
            start_column: Some(5),
            end_column: Some(10),
        }
    }

    #[test]
    fn test_error_annotation_with_full_range() {
        let mut s = sink();
        s.error(&annotation());
        assert_eq!(
            written(s),
            "::error file=b.yaml,line=3,endLine=3,col=5,endColumn=10::type mismatch\n"
        );
    }

    #[test]
    fn test_error_annotation_omits_missing_fields() {
        let mut s = sink();
        s.error(&AnnotationRequest {
            start_line: Some(2),
            end_line: Some(4),
            start_column: None,
            end_column: None,
            ..annotation()
        });
        assert_eq!(written(s), "::error file=b.yaml,line=2,endLine=4::type mismatch\n");
    }

    #[test]
    fn test_escaping() {
        let mut s = sink();
        s.error(&AnnotationRequest {
            file: "dir,x/a:b.yaml".into(),
            message: "50% bad\nline two".into(),
            start_line: None,
            end_line: None,
            start_column: None,
            end_column: None,
        });
        assert_eq!(
            written(s),
            "::error file=dir%2Cx/a%3Ab.yaml::50%25 bad%0Aline two\n"
        );
    }

    #[test]
    fn test_warning_info_and_failed() {
        let mut s = sink();
        s.info("all good");
        s.warning("Invalid Files: b.yaml");
        s.set_failed("boom");
        assert_eq!(
            written(s),
            "all good\n::warning::Invalid Files: b.yaml\n::error::boom\n"
        );
    }

    #[test]
    fn test_set_output_legacy_command() {
        let mut s = sink();
        s.set_output("validFiles", "a.yaml,c.yaml").unwrap();
        assert_eq!(written(s), "::set-output name=validFiles::a.yaml,c.yaml\n");
    }

    #[test]
    fn test_set_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        let mut s = GithubActions::new(Vec::new(), Some(path.clone()));
        s.set_output("validFiles", "a.yaml").unwrap();
        s.set_output("invalidFiles", "").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("validFiles<<ghadelimiter_"));
        assert_eq!(lines[1], "a.yaml");
        assert_eq!(lines[2], lines[0].trim_start_matches("validFiles<<"));
        assert!(lines[3].starts_with("invalidFiles<<ghadelimiter_"));
        assert_eq!(lines[4], "");
        assert!(written(s).is_empty());
    }
}
