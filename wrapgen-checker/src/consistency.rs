//! Cross-target consistency checking
//!
//! Before anything is emitted, every member of every entity is mapped for every
//! requested target and its ownership resolved. Failures are collected rather
//! than returned one at a time, so a single run reports every offending
//! (entity, member, target) triple.

use std::collections::BTreeMap;
use std::fmt;

use wrapgen_model::{Entity, Member, TypeModel};

use crate::error::{ConsistencyError, Issue, IssueKind, OwnershipAmbiguityError, UnsupportedTypeError};
use crate::mapper::TypeMapper;
use crate::ownership::{resolve_method, resolve_property, OwnershipTable};
use crate::target::{StringBridge, TargetLanguage};

/// Member counts of one emitted wrapper
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MemberSummary {
    /// Declared constructors (the raw-handle initializer is not counted)
    pub initializers: usize,
    pub finalizers: usize,
    pub functions: usize,
    pub accessors: usize,
    pub setters: usize,
}

impl MemberSummary {
    /// What a wrapper for `entity` must contain
    pub fn expected(entity: &Entity) -> Self {
        Self {
            initializers: entity.constructors().count(),
            finalizers: 1,
            functions: entity.methods.len(),
            accessors: entity.properties.len(),
            setters: entity.properties.iter().filter(|p| p.writable).count(),
        }
    }
}

impl fmt::Display for MemberSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} initializer(s), {} finalizer(s), {} function(s), {} accessor(s), {} setter(s)",
            self.initializers, self.finalizers, self.functions, self.accessors, self.setters
        )
    }
}

/// Outcome of a passing check
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub targets: Vec<TargetLanguage>,
    pub ownership: OwnershipTable,
    pub members_checked: usize,
}

pub struct ConsistencyChecker<'a> {
    model: &'a TypeModel,
    bridges: &'a BTreeMap<TargetLanguage, StringBridge>,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(model: &'a TypeModel, bridges: &'a BTreeMap<TargetLanguage, StringBridge>) -> Self {
        Self { model, bridges }
    }

    pub fn check(&self, targets: &[TargetLanguage]) -> Result<CheckReport, ConsistencyError> {
        let mut issues = Vec::new();
        let mut members_checked = 0;

        for entity in self.model.entities() {
            for member in entity.members() {
                members_checked += 1;
                let ownership = match member {
                    Member::Constructor(method) | Member::Method(method) => {
                        resolve_method(entity, method).err()
                    }
                    Member::Property(property) => resolve_property(entity, property).err(),
                };

                for &target in targets {
                    for kind in self.member_issues(target, member, ownership.as_ref()) {
                        issues.push(Issue {
                            entity: entity.name.clone(),
                            member: member.name().to_string(),
                            target,
                            kind,
                        });
                    }
                }
            }
        }

        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "consistency check failed");
            return Err(ConsistencyError { issues });
        }

        // Every ambiguity would have produced an issue above.
        let ownership = OwnershipTable::build(self.model).map_err(|errors| ConsistencyError {
            issues: ambiguity_issues(&errors, targets),
        })?;

        tracing::debug!(members_checked, targets = targets.len(), "consistency check passed");
        Ok(CheckReport {
            targets: targets.to_vec(),
            ownership,
            members_checked,
        })
    }

    /// Every reason `member` cannot be rendered for `target`
    fn member_issues(
        &self,
        target: TargetLanguage,
        member: Member<'_>,
        ownership: Option<&OwnershipAmbiguityError>,
    ) -> Vec<IssueKind> {
        let mapping = self.map_member(target, member).err();
        mapping
            .map(IssueKind::UnsupportedType)
            .into_iter()
            .chain(ownership.map(|err| IssueKind::Ownership(err.clone())))
            .collect()
    }

    fn map_member(&self, target: TargetLanguage, member: Member<'_>) -> Result<(), UnsupportedTypeError> {
        let mapper = TypeMapper::new(target, self.bridges.get(&target));
        match member {
            Member::Constructor(method) => {
                for param in &method.params {
                    mapper.map_param(param)?;
                }
            }
            Member::Method(method) => {
                for param in &method.params {
                    mapper.map_param(param)?;
                }
                mapper.map_return(&method.returns)?;
            }
            Member::Property(property) => {
                mapper.map_return(&property.ty)?;
                if property.writable {
                    mapper.map_type(&property.ty, crate::mapper::Direction::Argument)?;
                }
            }
        }
        Ok(())
    }
}

fn ambiguity_issues(errors: &[OwnershipAmbiguityError], targets: &[TargetLanguage]) -> Vec<Issue> {
    errors
        .iter()
        .flat_map(|err| {
            targets.iter().map(move |&target| Issue {
                entity: err.entity.clone(),
                member: err.member.clone(),
                target,
                kind: IssueKind::Ownership(err.clone()),
            })
        })
        .collect()
}

/// Compare the member counts of emitted wrappers against the model
pub fn check_parity<'e>(
    model: &TypeModel,
    emitted: impl IntoIterator<Item = (TargetLanguage, &'e str, MemberSummary)>,
) -> Result<(), ConsistencyError> {
    let mut issues = Vec::new();
    for (target, entity_name, found) in emitted {
        let expected = match model.entity(entity_name) {
            Some(entity) => MemberSummary::expected(entity),
            None => MemberSummary::default(),
        };
        if expected != found {
            issues.push(Issue {
                entity: entity_name.to_string(),
                member: "*".to_string(),
                target,
                kind: IssueKind::Parity {
                    expected: expected.to_string(),
                    found: found.to_string(),
                },
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConsistencyError { issues })
    }
}
