use crate::types::{AnnotationRequest, Diagnostic, ValidationResult};

/// Message used when a file failed without any located diagnostics
pub const INVALID_FILE_MESSAGE: &str = "Invalid File";

/// Project the diagnostics of every invalid result into annotations
///
/// Output order follows the invalid results as received, then each file's
/// diagnostics as received. Nothing is re-sorted by line.
pub fn project(results: &[ValidationResult]) -> Vec<AnnotationRequest> {
    results
        .iter()
        .filter(|r| !r.valid)
        .flat_map(project_result)
        .collect()
}

fn project_result(result: &ValidationResult) -> Vec<AnnotationRequest> {
    match result.results.as_deref() {
        None | Some([]) => vec![AnnotationRequest {
            file: result.file_path.clone(),
            message: INVALID_FILE_MESSAGE.to_string(),
            start_line: None,
            end_line: None,
            start_column: None,
            end_column: None,
        }],
        Some(diagnostics) => diagnostics
            .iter()
            .map(|d| project_diagnostic(&result.file_path, d))
            .collect(),
    }
}

fn project_diagnostic(file: &str, diagnostic: &Diagnostic) -> AnnotationRequest {
    let range = &diagnostic.range;

    // A column only means something relative to one known line, so a range that
    // spans lines or has an unknown line never carries columns.
    let (start_column, end_column) = if range.single_line().is_some() {
        (range.start.character, range.end.character)
    } else {
        (None, None)
    };

    AnnotationRequest {
        file: file.to_string(),
        message: diagnostic.message.clone(),
        start_line: range.start.line,
        end_line: range.end.line,
        start_column,
        end_column,
    }
}
