//! Ownership resolution for returned handles
//!
//! Every handle that comes back from a native call is either owned by the
//! wrapper that adopts it (released exactly once by the entity destructor) or
//! borrowed from the receiver (never released by the wrapper). The decision is
//! taken here, from declared attributes only.

use std::collections::{BTreeMap, BTreeSet};

use wrapgen_model::{Entity, Method, OwnershipHint, Property, TypeModel};

use crate::error::OwnershipAmbiguityError;

/// Method names starting with one of these words create a fresh handle
const CREATION_PREFIXES: &[&str] = &["create", "make", "new", "copy", "clone", "load", "import"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Fresh handle, paired with the entity destructor
    Owned,
    /// Handle owned by the receiver; must not be released by the wrapper
    Borrowed,
    /// No handle is returned
    NotApplicable,
}

impl Ownership {
    pub fn is_owned(self) -> bool {
        matches!(self, Ownership::Owned)
    }

    pub fn is_borrowed(self) -> bool {
        matches!(self, Ownership::Borrowed)
    }
}

/// Whether a member name reads as a factory (`create`, `makeKey`, `clone` ...)
pub fn indicates_creation(name: &str) -> bool {
    CREATION_PREFIXES.iter().any(|prefix| match name.strip_prefix(prefix) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
        None => false,
    })
}

pub fn resolve_method(
    entity: &Entity,
    method: &Method,
) -> Result<Ownership, OwnershipAmbiguityError> {
    let ambiguous = |reason: &str| OwnershipAmbiguityError::new(&entity.name, &method.name, reason);

    if method.is_constructor {
        return match method.ownership {
            Some(OwnershipHint::Borrow) => Err(ambiguous("constructors always produce an owned handle")),
            _ => Ok(Ownership::Owned),
        };
    }
    if !method.returns.is_handle() {
        return Ok(Ownership::NotApplicable);
    }

    let creates = indicates_creation(&method.name);
    match method.ownership {
        Some(OwnershipHint::Transfer) => Ok(Ownership::Owned),
        Some(OwnershipHint::Borrow) if creates => {
            Err(ambiguous("the name indicates creation but the handle is declared borrowed"))
        }
        Some(OwnershipHint::Borrow) if method.is_static => {
            Err(ambiguous("a static method has no receiver to borrow from"))
        }
        Some(OwnershipHint::Borrow) => Ok(Ownership::Borrowed),
        None if creates => Ok(Ownership::Owned),
        None if !method.is_static => Ok(Ownership::Borrowed),
        None => Err(ambiguous(
            "static method returns a handle without declaring transfer or creation semantics",
        )),
    }
}

pub fn resolve_property(
    _entity: &Entity,
    property: &Property,
) -> Result<Ownership, OwnershipAmbiguityError> {
    if !property.ty.is_handle() {
        return Ok(Ownership::NotApplicable);
    }
    match property.ownership {
        Some(OwnershipHint::Transfer) => Ok(Ownership::Owned),
        Some(OwnershipHint::Borrow) | None => Ok(Ownership::Borrowed),
    }
}

/// Resolved ownership for every member of a model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipTable {
    members: BTreeMap<(String, String), Ownership>,
    borrowed_targets: BTreeSet<String>,
}

impl OwnershipTable {
    /// Resolve the whole model, collecting every ambiguity
    pub fn build(model: &TypeModel) -> Result<Self, Vec<OwnershipAmbiguityError>> {
        let mut table = Self::default();
        let mut errors = Vec::new();

        for entity in model.entities() {
            let resolved = entity
                .constructors()
                .chain(entity.methods.iter())
                .map(|method| (method.name.as_str(), &method.returns, resolve_method(entity, method)))
                .chain(entity.properties.iter().map(|property| {
                    (property.name.as_str(), &property.ty, resolve_property(entity, property))
                }));

            for (member, returns, ownership) in resolved {
                match ownership {
                    Ok(ownership) => {
                        if ownership.is_borrowed() {
                            if let Some(target) = returns.referenced_entity() {
                                table.borrowed_targets.insert(target.to_string());
                            }
                        }
                        table
                            .members
                            .insert((entity.name.clone(), member.to_string()), ownership);
                    }
                    Err(err) => errors.push(err),
                }
            }
        }

        if errors.is_empty() {
            tracing::debug!(
                members = table.members.len(),
                borrowed = table.borrowed_targets.len(),
                "ownership resolved"
            );
            Ok(table)
        } else {
            Err(errors)
        }
    }

    pub fn get(&self, entity: &str, member: &str) -> Option<Ownership> {
        self.members
            .get(&(entity.to_string(), member.to_string()))
            .copied()
    }

    /// Whether some member hands out borrowed handles of this entity
    pub fn is_borrowed_target(&self, entity: &str) -> bool {
        self.borrowed_targets.contains(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_model::TypeRef;

    fn wallet() -> Entity {
        Entity::new("Wallet", Method::constructor("create"))
    }

    #[test]
    fn test_creation_names() {
        assert!(indicates_creation("create"));
        assert!(indicates_creation("createWithMnemonic"));
        assert!(indicates_creation("clone"));
        assert!(indicates_creation("new_key"));
        assert!(!indicates_creation("newest"));
        assert!(!indicates_creation("copyright"));
        assert!(!indicates_creation("account"));
    }

    #[test]
    fn test_constructors_are_owned() {
        let entity = wallet();
        assert_eq!(resolve_method(&entity, &entity.constructor), Ok(Ownership::Owned));

        let borrowed = Method::constructor("create").borrowed();
        assert!(resolve_method(&entity, &borrowed).is_err());
    }

    #[test]
    fn test_non_handle_returns() {
        let entity = wallet();
        let method = Method::static_fn("version").returning(TypeRef::string());
        assert_eq!(resolve_method(&entity, &method), Ok(Ownership::NotApplicable));
    }

    #[test]
    fn test_instance_accessor_is_borrowed() {
        let entity = wallet();
        let method = Method::new("account").returning(TypeRef::handle("Account"));
        assert_eq!(resolve_method(&entity, &method), Ok(Ownership::Borrowed));

        let transferred = Method::new("account").returning(TypeRef::handle("Account")).transfer();
        assert_eq!(resolve_method(&entity, &transferred), Ok(Ownership::Owned));
    }

    #[test]
    fn test_creation_named_method_is_owned() {
        let entity = wallet();
        let method = Method::static_fn("createFromSeed").returning(TypeRef::handle("Wallet"));
        assert_eq!(resolve_method(&entity, &method), Ok(Ownership::Owned));
    }

    #[test]
    fn test_ambiguous_cases() {
        let entity = wallet();
        let unhinted_static = Method::static_fn("shared").returning(TypeRef::handle("Wallet"));
        let err = resolve_method(&entity, &unhinted_static).unwrap_err();
        assert_eq!(err.entity, "Wallet");
        assert_eq!(err.member, "shared");

        let static_borrow = Method::static_fn("shared")
            .returning(TypeRef::handle("Wallet"))
            .borrowed();
        assert!(resolve_method(&entity, &static_borrow).is_err());

        let conflicting = Method::new("clone").returning(TypeRef::handle("Wallet")).borrowed();
        assert!(resolve_method(&entity, &conflicting).is_err());
    }

    #[test]
    fn test_properties() {
        let entity = wallet();
        let key = Property::new("key", TypeRef::optional(TypeRef::handle("Key")));
        assert_eq!(resolve_property(&entity, &key), Ok(Ownership::Borrowed));
        let flag = Property::new("flag", TypeRef::bool());
        assert_eq!(resolve_property(&entity, &flag), Ok(Ownership::NotApplicable));
        assert_eq!(resolve_property(&entity, &key.transfer()), Ok(Ownership::Owned));
    }

    #[test]
    fn test_table_collects_every_ambiguity() {
        let model = TypeModel::new(vec![
            Entity::new("Key", Method::constructor("create")),
            wallet()
                .with_method(Method::static_fn("shared").returning(TypeRef::handle("Wallet")))
                .with_method(Method::static_fn("default").returning(TypeRef::handle("Key")))
                .with_property(Property::new("key", TypeRef::handle("Key"))),
        ])
        .unwrap();
        let errors = OwnershipTable::build(&model).unwrap_err();
        let members: Vec<_> = errors.iter().map(|e| e.member.as_str()).collect();
        assert_eq!(members, vec!["shared", "default"]);
    }

    #[test]
    fn test_table_tracks_borrowed_targets() {
        let model = TypeModel::new(vec![
            Entity::new("Key", Method::constructor("create")),
            wallet()
                .with_property(Property::new("key", TypeRef::handle("Key")))
                .with_method(Method::new("cloneKey").returning(TypeRef::handle("Key"))),
        ])
        .unwrap();
        let table = OwnershipTable::build(&model).unwrap();
        assert_eq!(table.get("Wallet", "key"), Some(Ownership::Borrowed));
        assert_eq!(table.get("Wallet", "cloneKey"), Some(Ownership::Owned));
        assert_eq!(table.get("Wallet", "create"), Some(Ownership::Owned));
        assert!(table.is_borrowed_target("Key"));
        assert!(!table.is_borrowed_target("Wallet"));
    }
}
