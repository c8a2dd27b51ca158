use thiserror::Error;

/// A store post-condition failed after an operation the store performed itself.
/// Never caused by caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("a student with the same {field} already exists")]
    DuplicateStudent { field: &'static str },

    #[error("tutorial {0} already exists")]
    DuplicateTutorial(String),

    #[error("tutorial {tutorial} already has an assignment named {assignment}")]
    DuplicateAssignment {
        tutorial: String,
        assignment: String,
    },

    #[error("tutorial not found: {0}")]
    TutorialNotFound(String),

    #[error("assignment {assignment} not found in tutorial {tutorial}")]
    AssignmentNotFound {
        tutorial: String,
        assignment: String,
    },

    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("student key {key:?} matches {} students", .candidates.len())]
    AmbiguousStudent { key: String, candidates: Vec<String> },

    #[error("student {student} is not enrolled in tutorial {tutorial}")]
    NotEnrolled { tutorial: String, student: String },

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl StoreError {
    /// Stable code used in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateStudent { .. }
            | StoreError::DuplicateTutorial(_)
            | StoreError::DuplicateAssignment { .. } => "duplicate",
            StoreError::TutorialNotFound(_)
            | StoreError::AssignmentNotFound { .. }
            | StoreError::StudentNotFound(_) => "not_found",
            StoreError::NotEnrolled { .. } => "not_enrolled",
            StoreError::AmbiguousStudent { .. } => "bad_params",
            StoreError::Invariant(_) => "internal",
        }
    }
}
