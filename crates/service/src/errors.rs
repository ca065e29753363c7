use thiserror::Error;

/// Minimum keyword length accepted by the free-text search operations.
pub const MIN_KEYWORD_LEN: usize = 2;

/// Upper bound on concurrently assigned courses per trainer.
pub const MAX_COURSES_PER_TRAINER: u64 = 5;

/// The entity a failure belongs to; drives the machine-readable error code
/// prefix (`CLS-404`, `STD-409`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    ClassRoom,
    Course,
    Student,
    Trainer,
}

impl EntityKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ClassRoom => "Classroom",
            Self::Course => "Course",
            Self::Student => "Student",
            Self::Trainer => "Trainer",
        }
    }

    pub fn code_prefix(&self) -> &'static str {
        match self {
            Self::ClassRoom => "CLS",
            Self::Course => "CRS",
            Self::Student => "STD",
            Self::Trainer => "TRN",
        }
    }
}

/// Every failure a service operation can raise. One flat enum; the HTTP layer
/// owns the kind-to-status translation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{} not found with id: {id}", .entity.display_name())]
    NotFound { entity: EntityKind, id: i64 },

    #[error("{message}")]
    Duplicate { entity: EntityKind, message: String },

    #[error("{message}")]
    InUse { entity: EntityKind, message: String },

    #[error("{}", .violations.join(", "))]
    Validation { entity: Option<EntityKind>, violations: Vec<String> },

    #[error("database error: {0}")]
    Db(String),
}

impl ServiceError {
    pub fn not_found(entity: EntityKind, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn duplicate(entity: EntityKind, message: impl Into<String>) -> Self {
        Self::Duplicate { entity, message: message.into() }
    }

    pub fn in_use(entity: EntityKind, message: impl Into<String>) -> Self {
        Self::InUse { entity, message: message.into() }
    }

    /// Single-violation validation failure attributed to an entity.
    pub fn invalid(entity: EntityKind, message: impl Into<String>) -> Self {
        Self::Validation { entity: Some(entity), violations: vec![message.into()] }
    }

    /// All field violations collected for one payload.
    pub fn violations(entity: EntityKind, violations: Vec<String>) -> Self {
        Self::Validation { entity: Some(entity), violations }
    }

    /// Validation failure not tied to a specific entity (pagination, keyword).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation { entity: None, violations: vec![message.into()] }
    }

    pub fn db(err: sea_orm::DbErr) -> Self {
        Self::Db(err.to_string())
    }

    /// Machine-readable code: entity prefix plus the HTTP class of the kind.
    /// Unexpected database failures carry no code.
    pub fn code(&self) -> Option<String> {
        let (prefix, class) = match self {
            Self::NotFound { entity, .. } => (entity.code_prefix(), "404"),
            Self::Duplicate { entity, .. } | Self::InUse { entity, .. } => (entity.code_prefix(), "409"),
            Self::Validation { entity: Some(entity), .. } => (entity.code_prefix(), "400"),
            Self::Validation { entity: None, .. } => ("VAL", "400"),
            Self::Db(_) => return None,
        };
        Some(format!("{prefix}-{class}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = ServiceError::not_found(EntityKind::Course, 7);
        assert_eq!(err.to_string(), "Course not found with id: 7");
        assert_eq!(err.code().as_deref(), Some("CRS-404"));
    }

    #[test]
    fn duplicate_and_in_use_carry_conflict_codes() {
        let dup = ServiceError::duplicate(EntityKind::ClassRoom, "A classroom with room number R1 already exists");
        assert_eq!(dup.code().as_deref(), Some("CLS-409"));

        let in_use = ServiceError::in_use(EntityKind::Trainer, "Cannot delete trainer with assigned courses");
        assert_eq!(in_use.code().as_deref(), Some("TRN-409"));
    }

    #[test]
    fn validation_joins_all_violations() {
        let err = ServiceError::violations(
            EntityKind::Student,
            vec!["First name must be between 2 and 50 characters".into(), "Email must be valid".into()],
        );
        assert_eq!(err.code().as_deref(), Some("STD-400"));
        assert!(err.to_string().contains("Email must be valid"));
    }

    #[test]
    fn bad_request_uses_generic_prefix() {
        let err = ServiceError::bad_request("Search term must be at least 2 characters long");
        assert_eq!(err.code().as_deref(), Some("VAL-400"));
    }

    #[test]
    fn db_errors_expose_no_code() {
        assert!(ServiceError::Db("boom".into()).code().is_none());
    }
}
