use crate::types::ValidationResult;

/// File paths split by validation outcome, in the order received
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    pub valid_paths: Vec<String>,
    pub invalid_paths: Vec<String>,
}

impl Partition {
    /// Comma-joined valid paths, empty when there are none
    pub fn valid_files(&self) -> String {
        self.valid_paths.join(",")
    }

    /// Comma-joined invalid paths, empty when there are none
    pub fn invalid_files(&self) -> String {
        self.invalid_paths.join(",")
    }

    pub fn has_invalid(&self) -> bool {
        !self.invalid_paths.is_empty()
    }
}

pub fn partition(results: &[ValidationResult]) -> Partition {
    let (valid, invalid): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.valid);
    Partition {
        valid_paths: valid.into_iter().map(|r| r.file_path.clone()).collect(),
        invalid_paths: invalid.into_iter().map(|r| r.file_path.clone()).collect(),
    }
}
