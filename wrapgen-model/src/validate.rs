//! Structural validation of a type model
//!
//! Runs once when a [`TypeModel`](crate::TypeModel) is built. Entities are
//! walked in declaration order and the first violation is returned.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Result, ValidationError};
use crate::model::{Entity, Member, Method, TypeRef};
use crate::naming::capitalize;

/// Locals declared inside generated function bodies
const RESERVED_PARAMETERS: &[&str] = &["obj", "result", "resultGuard", "ptr", "rawValue", "owner"];

/// Suffix of the local holding a bridged native string
const NATIVE_LOCAL_SUFFIX: &str = "Native";

/// Members every generated wrapper declares itself
const RESERVED_MEMBERS: &[&str] = &["rawValue", "owner", "cleaner", "ptr", "adopt", "borrowed"];

pub(crate) fn validate_entities(entities: &[Entity]) -> Result<()> {
    let mut declared = BTreeSet::new();
    for entity in entities {
        check_identifier(&entity.name)?;
        if !declared.insert(entity.name.as_str()) {
            return Err(ValidationError::DuplicateEntity {
                entity: entity.name.clone(),
            });
        }
    }

    for entity in entities {
        validate_entity(entity, &declared)?;
    }
    Ok(())
}

fn validate_entity(entity: &Entity, declared: &BTreeSet<&str>) -> Result<()> {
    let mut names = HashSet::new();
    let helpers: HashSet<String> = entity
        .constructors()
        .map(|constructor| format!("native{}", capitalize(&constructor.name)))
        .collect();
    for member in entity.members() {
        check_identifier(member.name())?;
        if !names.insert(member.name()) {
            return Err(ValidationError::duplicate_member(&entity.name, member.name()));
        }
        let name = member.name();
        if RESERVED_MEMBERS.contains(&name) || helpers.contains(name) {
            return Err(ValidationError::reserved_name(&entity.name, name, name));
        }

        match member {
            Member::Constructor(method) => {
                check_constructor(entity, method)?;
                check_params(entity, method, declared)?;
            }
            Member::Method(method) => {
                if method.is_constructor {
                    return Err(ValidationError::flag_mismatch(
                        &entity.name,
                        &method.name,
                        "constructors must be declared as construction paths, not methods",
                    ));
                }
                if method.fallible {
                    return Err(ValidationError::flag_mismatch(
                        &entity.name,
                        &method.name,
                        "only constructors are fallible; declare an optional return instead",
                    ));
                }
                check_params(entity, method, declared)?;
                check_nested_void(entity, &method.name, &method.returns)?;
                check_reference(entity, &method.name, &method.returns, declared)?;
            }
            Member::Property(property) => {
                if property.ty.contains_void() {
                    return Err(ValidationError::misplaced_void(&entity.name, &property.name));
                }
                check_reference(entity, &property.name, &property.ty, declared)?;
            }
        }
    }

    check_constructor_signatures(entity)
}

fn check_constructor(entity: &Entity, method: &Method) -> Result<()> {
    if !method.is_constructor {
        return Err(ValidationError::flag_mismatch(
            &entity.name,
            &method.name,
            "construction path is not flagged as a constructor",
        ));
    }
    if method.is_static {
        return Err(ValidationError::flag_mismatch(
            &entity.name,
            &method.name,
            "constructors cannot be static",
        ));
    }
    match &method.returns {
        TypeRef::Void => Ok(()),
        TypeRef::Handle(name) if *name == entity.name => Ok(()),
        other => Err(ValidationError::ConstructorReturn {
            entity: entity.name.clone(),
            member: method.name.clone(),
            found: other.to_string(),
        }),
    }
}

fn check_params(entity: &Entity, method: &Method, declared: &BTreeSet<&str>) -> Result<()> {
    let mut seen = HashSet::new();
    for param in &method.params {
        check_identifier(&param.name)?;
        if RESERVED_PARAMETERS.contains(&param.name.as_str())
            || param.name.ends_with(NATIVE_LOCAL_SUFFIX)
        {
            return Err(ValidationError::reserved_name(
                &entity.name,
                &method.name,
                &param.name,
            ));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(ValidationError::DuplicateParameter {
                entity: entity.name.clone(),
                member: method.name.clone(),
                param: param.name.clone(),
            });
        }
        if param.ty.contains_void() {
            return Err(ValidationError::misplaced_void(&entity.name, &method.name));
        }
        check_reference(entity, &method.name, &param.ty, declared)?;
    }
    Ok(())
}

/// `void` is a whole return type or nothing
fn check_nested_void(entity: &Entity, member: &str, returns: &TypeRef) -> Result<()> {
    if !returns.is_void() && returns.contains_void() {
        return Err(ValidationError::misplaced_void(&entity.name, member));
    }
    Ok(())
}

fn check_reference(
    entity: &Entity,
    member: &str,
    ty: &TypeRef,
    declared: &BTreeSet<&str>,
) -> Result<()> {
    match ty.referenced_entity() {
        Some(name) if !declared.contains(name) => Err(ValidationError::undeclared_entity(
            &entity.name,
            member,
            name,
        )),
        _ => Ok(()),
    }
}

fn check_constructor_signatures(entity: &Entity) -> Result<()> {
    let mut seen: HashMap<Vec<TypeRef>, &str> = HashMap::new();
    for constructor in entity.constructors() {
        let signature = constructor.signature();
        if let Some(first) = seen.get(&signature) {
            let rendered = signature
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::DuplicateConstructorSignature {
                entity: entity.name.clone(),
                first: (*first).to_string(),
                second: constructor.name.clone(),
                signature: rendered,
            });
        }
        seen.insert(signature, &constructor.name);
    }
    Ok(())
}

fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::invalid_name(name))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Entity, Method, Parameter, Property, TypeModel, TypeRef};
    use crate::ValidationError;

    fn entity(name: &str) -> Entity {
        Entity::new(name, Method::constructor("create"))
    }

    #[test]
    fn test_undeclared_handle_is_rejected() {
        let model = vec![entity("Wallet").with_method(
            Method::new("account").returning(TypeRef::handle("Account")),
        )];
        let err = TypeModel::new(model).unwrap_err();
        assert_eq!(
            err,
            ValidationError::undeclared_entity("Wallet", "account", "Account")
        );
        assert_eq!(err.entity(), Some("Wallet"));
    }

    #[test]
    fn test_undeclared_handle_inside_collection_parameter() {
        let model = vec![entity("Wallet").with_method(
            Method::new("sign").param("keys", TypeRef::collection(TypeRef::handle("Key"))),
        )];
        assert!(matches!(
            TypeModel::new(model),
            Err(ValidationError::UndeclaredEntity { referenced, .. }) if referenced == "Key"
        ));
    }

    #[test]
    fn test_duplicate_entity() {
        let err = TypeModel::new(vec![entity("Wallet"), entity("Wallet")]).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateEntity { .. }));
    }

    #[test]
    fn test_duplicate_member_across_kinds() {
        let model = vec![entity("Wallet")
            .with_method(Method::new("balance").returning(TypeRef::int64()))
            .with_property(Property::new("balance", TypeRef::int64()))];
        assert_eq!(
            TypeModel::new(model).unwrap_err(),
            ValidationError::duplicate_member("Wallet", "balance")
        );
    }

    #[test]
    fn test_constructor_signatures_must_differ() {
        let model = vec![Entity::new(
            "Key",
            Method::constructor("create").param("hex", TypeRef::string()),
        )
        .with_named_constructor(
            Method::constructor("withBase64").param("base64", TypeRef::string()),
        )];
        let err = TypeModel::new(model).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::DuplicateConstructorSignature { ref first, ref second, .. }
                if first == "create" && second == "withBase64"
        ));
    }

    #[test]
    fn test_nullable_changes_constructor_signature() {
        let model = vec![Entity::new(
            "Key",
            Method::constructor("create").param("hex", TypeRef::string()),
        )
        .with_named_constructor(
            Method::constructor("withOptional")
                .with_param(Parameter::nullable("hex", TypeRef::string())),
        )];
        assert!(TypeModel::new(model).is_ok());
    }

    #[test]
    fn test_constructor_flags() {
        let unflagged = vec![Entity::new("Key", Method::new("create"))];
        assert!(matches!(
            TypeModel::new(unflagged),
            Err(ValidationError::ConstructorFlagMismatch { .. })
        ));

        let ctor_as_method = vec![entity("Key").with_method(Method::constructor("other"))];
        assert!(matches!(
            TypeModel::new(ctor_as_method),
            Err(ValidationError::ConstructorFlagMismatch { .. })
        ));

        let wrong_return =
            vec![Entity::new("Key", Method::constructor("create").returning(TypeRef::bool()))];
        assert!(matches!(
            TypeModel::new(wrong_return),
            Err(ValidationError::ConstructorReturn { .. })
        ));
    }

    #[test]
    fn test_fallible_methods_are_rejected() {
        let model = vec![entity("Key").with_method(
            Method::new("parse").returning(TypeRef::handle("Key")).fallible(),
        )];
        assert!(matches!(
            TypeModel::new(model),
            Err(ValidationError::ConstructorFlagMismatch { .. })
        ));
    }

    #[test]
    fn test_void_only_in_return_position() {
        let param = vec![entity("Key").with_method(Method::new("f").param("x", TypeRef::Void))];
        assert!(matches!(
            TypeModel::new(param),
            Err(ValidationError::MisplacedVoid { .. })
        ));

        let nested = vec![
            entity("Key").with_method(Method::new("f").returning(TypeRef::optional(TypeRef::Void)))
        ];
        assert!(matches!(
            TypeModel::new(nested),
            Err(ValidationError::MisplacedVoid { .. })
        ));
    }

    #[test]
    fn test_names_used_by_generated_code_are_rejected() {
        let local = vec![entity("Wallet").with_method(
            Method::new("lookup")
                .param("result", TypeRef::int32())
                .returning(TypeRef::bool()),
        )];
        assert_eq!(
            TypeModel::new(local).unwrap_err(),
            ValidationError::reserved_name("Wallet", "lookup", "result")
        );

        let member = vec![entity("Wallet").with_property(Property::new("rawValue", TypeRef::int64()))];
        assert_eq!(
            TypeModel::new(member).unwrap_err(),
            ValidationError::reserved_name("Wallet", "rawValue", "rawValue")
        );

        let bridged_local = vec![entity("Wallet").with_method(
            Method::new("rename")
                .param("name", TypeRef::string())
                .param("nameNative", TypeRef::string()),
        )];
        assert!(matches!(
            TypeModel::new(bridged_local),
            Err(ValidationError::ReservedName { .. })
        ));

        let helper = vec![entity("Wallet").with_method(Method::new("nativeCreate"))];
        assert!(matches!(
            TypeModel::new(helper),
            Err(ValidationError::ReservedName { .. })
        ));

        let constructor_param = vec![Entity::new(
            "Wallet",
            Method::constructor("create").param("owner", TypeRef::string()),
        )];
        assert!(matches!(
            TypeModel::new(constructor_param),
            Err(ValidationError::ReservedName { .. })
        ));
    }

    #[test]
    fn test_identifiers() {
        assert!(matches!(
            TypeModel::new(vec![entity("1Key")]),
            Err(ValidationError::InvalidName { .. })
        ));
        assert!(matches!(
            TypeModel::new(vec![entity("Key").with_method(Method::new("do-it"))]),
            Err(ValidationError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_duplicate_parameter() {
        let model = vec![entity("Key").with_method(
            Method::new("f").param("x", TypeRef::bool()).param("x", TypeRef::int32()),
        )];
        assert!(matches!(
            TypeModel::new(model),
            Err(ValidationError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn test_empty_model_is_valid() {
        assert!(TypeModel::new(Vec::new()).unwrap().is_empty());
    }
}
