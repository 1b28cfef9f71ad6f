//! Errors raised while checking a model against its targets

use std::fmt;
use thiserror::Error;
use wrapgen_model::TypeRef;

use crate::target::TargetLanguage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown target language `{target}`")]
pub struct UnknownTargetError {
    pub target: String,
}

/// A target language cannot express a mapped type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("target `{target}` cannot express `{ty}`: {reason}")]
pub struct UnsupportedTypeError {
    pub ty: TypeRef,
    pub target: TargetLanguage,
    pub reason: String,
}

impl UnsupportedTypeError {
    pub fn new(ty: &TypeRef, target: TargetLanguage, reason: impl Into<String>) -> Self {
        Self {
            ty: ty.clone(),
            target,
            reason: reason.into(),
        }
    }
}

/// The model does not say who owns a returned handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ownership of the handle returned by {entity}.{member} is ambiguous: {reason}")]
pub struct OwnershipAmbiguityError {
    pub entity: String,
    pub member: String,
    pub reason: String,
}

impl OwnershipAmbiguityError {
    pub fn new(
        entity: impl Into<String>,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            member: member.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    UnsupportedType(UnsupportedTypeError),
    Ownership(OwnershipAmbiguityError),
    /// Emitted output does not carry the members the model declares
    Parity { expected: String, found: String },
}

/// One reason an (entity, member, target) triple cannot be rendered. A
/// triple failing for several reasons appears once per reason, adjacently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub entity: String,
    pub member: String,
    pub target: TargetLanguage,
    pub kind: IssueKind,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}.{}: ", self.target, self.entity, self.member)?;
        match &self.kind {
            IssueKind::UnsupportedType(err) => write!(f, "cannot express `{}`: {}", err.ty, err.reason),
            IssueKind::Ownership(err) => write!(f, "ambiguous ownership: {}", err.reason),
            IssueKind::Parity { expected, found } => {
                write!(f, "expected {expected}, emitted {found}")
            }
        }
    }
}

/// Every member that could not be rendered for every target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyError {
    pub issues: Vec<Issue>,
}

impl ConsistencyError {
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Offending triples as `(entity, member, target)`, each listed once
    pub fn triples(&self) -> Vec<(&str, &str, TargetLanguage)> {
        let mut triples: Vec<_> = self
            .issues
            .iter()
            .map(|issue| (issue.entity.as_str(), issue.member.as_str(), issue.target))
            .collect();
        triples.dedup();
        triples
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} member(s) cannot be rendered for every target", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConsistencyError {}
