//! Model error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValidationError>;

/// A malformed type model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{entity}.{member} references undeclared entity `{referenced}`")]
    UndeclaredEntity {
        entity: String,
        member: String,
        referenced: String,
    },

    #[error("entity `{entity}` is declared more than once")]
    DuplicateEntity { entity: String },

    #[error("entity `{entity}` declares member `{member}` more than once")]
    DuplicateMember { entity: String, member: String },

    #[error("{entity}.{member} declares parameter `{param}` more than once")]
    DuplicateParameter {
        entity: String,
        member: String,
        param: String,
    },

    #[error("constructors `{first}` and `{second}` of `{entity}` share the parameter signature ({signature})")]
    DuplicateConstructorSignature {
        entity: String,
        first: String,
        second: String,
        signature: String,
    },

    #[error("{entity}.{member}: {message}")]
    ConstructorFlagMismatch {
        entity: String,
        member: String,
        message: String,
    },

    #[error("constructor {entity}.{member} must return void or `{entity}`, found `{found}`")]
    ConstructorReturn {
        entity: String,
        member: String,
        found: String,
    },

    #[error("{entity}.{member} uses `void` outside of a return position")]
    MisplacedVoid { entity: String, member: String },

    #[error("`{name}` is not a valid identifier")]
    InvalidName { name: String },

    #[error("{entity}.{member}: `{name}` is reserved by the generated wrappers")]
    ReservedName {
        entity: String,
        member: String,
        name: String,
    },
}

impl ValidationError {
    pub fn undeclared_entity(
        entity: impl Into<String>,
        member: impl Into<String>,
        referenced: impl Into<String>,
    ) -> Self {
        Self::UndeclaredEntity {
            entity: entity.into(),
            member: member.into(),
            referenced: referenced.into(),
        }
    }

    pub fn duplicate_member(entity: impl Into<String>, member: impl Into<String>) -> Self {
        Self::DuplicateMember {
            entity: entity.into(),
            member: member.into(),
        }
    }

    pub fn flag_mismatch(
        entity: impl Into<String>,
        member: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConstructorFlagMismatch {
            entity: entity.into(),
            member: member.into(),
            message: message.into(),
        }
    }

    pub fn misplaced_void(entity: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MisplacedVoid {
            entity: entity.into(),
            member: member.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    pub fn reserved_name(
        entity: impl Into<String>,
        member: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::ReservedName {
            entity: entity.into(),
            member: member.into(),
            name: name.into(),
        }
    }

    /// Entity the error was raised for, if any
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::UndeclaredEntity { entity, .. }
            | Self::DuplicateEntity { entity }
            | Self::DuplicateMember { entity, .. }
            | Self::DuplicateParameter { entity, .. }
            | Self::DuplicateConstructorSignature { entity, .. }
            | Self::ConstructorFlagMismatch { entity, .. }
            | Self::ConstructorReturn { entity, .. }
            | Self::MisplacedVoid { entity, .. }
            | Self::ReservedName { entity, .. } => Some(entity),
            Self::InvalidName { .. } => None,
        }
    }
}

/// Failure loading a model document
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid model document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
