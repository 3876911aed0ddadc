use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One problem found in a manifest, addressed by a JSON-path-like location
/// such as `columns[2].constraints.pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestIssue {
    pub path: String,
    pub message: String,
}

impl ManifestIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found by [`crate::Manifest::validate`], in discovery order.
#[derive(Debug, Clone, Error)]
#[error("manifest validation failed with {} issue(s)", .issues.len())]
pub struct ValidationError {
    issues: Vec<ManifestIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ManifestIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ManifestIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<ManifestIssue> {
        self.issues
    }
}
