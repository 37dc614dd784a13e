use crate::partition::Partition;
use crate::types::{AnnotationRequest, ValidationResult};
use anyhow::{Context, bail};
use tracing::info;

/// Write a run report as JSON or Markdown, chosen by extension
pub fn write_output(
    path: &str,
    results: &[ValidationResult],
    partition: &Partition,
    annotations: &[AnnotationRequest],
) -> anyhow::Result<()> {
    let content = if path.ends_with(".json") {
        let output = serde_json::json!({
            "validFiles": partition.valid_paths,
            "invalidFiles": partition.invalid_paths,
            "results": results,
            "annotations": annotations,
        });
        serde_json::to_string_pretty(&output)?
    } else if path.ends_with(".md") {
        format_markdown(partition, annotations)
    } else {
        bail!("Output file must end with .md or .json");
    };

    std::fs::write(path, content).with_context(|| format!("Failed to write output file {}", path))?;
    info!("Results written to {}", path);
    Ok(())
}

pub fn format_markdown(partition: &Partition, annotations: &[AnnotationRequest]) -> String {
    let mut output = String::from("# YAML Schema Validation\n\n");
    output.push_str(&format!(
        "**Valid:** {} **Invalid:** {}\n\n",
        partition.valid_paths.len(),
        partition.invalid_paths.len()
    ));

    if !partition.has_invalid() {
        output.push_str("All files are valid\n");
        return output;
    }

    // Annotations are grouped by file in the order the files were reported
    for file in &partition.invalid_paths {
        output.push_str(&format!("## {}\n\n", file));
        for annotation in annotations.iter().filter(|a| &a.file == file) {
            output.push_str(&format!("- {}{}\n", location(annotation), annotation.message));
        }
        output.push('\n');
    }
    output.trim_end().to_string() + "\n"
}

fn location(annotation: &AnnotationRequest) -> String {
    match (annotation.start_line, annotation.end_line) {
        (Some(start), Some(end)) if start != end => format!("Lines {}-{}: ", start, end),
        (Some(start), _) => match annotation.start_column {
            Some(col) => format!("Line {}:{}: ", start, col),
            None => format!("Line {}: ", start),
        },
        _ => String::new(),
    }
}
