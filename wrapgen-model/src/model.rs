//! Type model definitions
//!
//! The model describes the native surface of a library without committing to
//! any target language: entities wrapping an opaque handle, their constructors,
//! methods and properties, and the type references flowing through them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ModelError, ValidationError};
use crate::validate;

/// Scalar kinds understood by the native ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    String,
}

impl PrimitiveKind {
    pub fn is_string(self) -> bool {
        matches!(self, PrimitiveKind::String)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int32 => "int32",
            PrimitiveKind::Int64 => "int64",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "string",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a type at a parameter, return or property position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// No value. Only legal as a return type.
    #[default]
    Void,
    Primitive(PrimitiveKind),
    /// Opaque handle to a declared entity
    Handle(String),
    Optional(Box<TypeRef>),
    Collection(Box<TypeRef>),
}

impl TypeRef {
    pub fn bool() -> Self {
        TypeRef::Primitive(PrimitiveKind::Bool)
    }

    pub fn int32() -> Self {
        TypeRef::Primitive(PrimitiveKind::Int32)
    }

    pub fn int64() -> Self {
        TypeRef::Primitive(PrimitiveKind::Int64)
    }

    pub fn float() -> Self {
        TypeRef::Primitive(PrimitiveKind::Float)
    }

    pub fn double() -> Self {
        TypeRef::Primitive(PrimitiveKind::Double)
    }

    pub fn string() -> Self {
        TypeRef::Primitive(PrimitiveKind::String)
    }

    pub fn handle(entity: impl Into<String>) -> Self {
        TypeRef::Handle(entity.into())
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    pub fn collection(inner: TypeRef) -> Self {
        TypeRef::Collection(Box::new(inner))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Optional(_))
    }

    /// The type with one level of `Optional` removed
    pub fn non_optional(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner,
            other => other,
        }
    }

    /// Entity named by this reference, looking through optionals and collections
    pub fn referenced_entity(&self) -> Option<&str> {
        match self {
            TypeRef::Handle(name) => Some(name),
            TypeRef::Optional(inner) | TypeRef::Collection(inner) => inner.referenced_entity(),
            TypeRef::Void | TypeRef::Primitive(_) => None,
        }
    }

    /// Whether a handle crosses the boundary at this position (directly or nullable)
    pub fn is_handle(&self) -> bool {
        matches!(self.non_optional(), TypeRef::Handle(_))
    }

    /// Whether `Void` appears anywhere inside this reference
    pub fn contains_void(&self) -> bool {
        match self {
            TypeRef::Void => true,
            TypeRef::Optional(inner) | TypeRef::Collection(inner) => inner.contains_void(),
            TypeRef::Primitive(_) | TypeRef::Handle(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(kind) => write!(f, "{kind}"),
            TypeRef::Handle(name) => f.write_str(name),
            TypeRef::Optional(inner) => write!(f, "{inner}?"),
            TypeRef::Collection(inner) => write!(f, "[{inner}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub nullable: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    pub fn nullable(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }

    /// Type as seen at the boundary: a nullable parameter is an optional one
    pub fn effective_type(&self) -> TypeRef {
        if self.nullable && !self.ty.is_optional() {
            TypeRef::optional(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Declared ownership of a returned handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipHint {
    /// The caller receives a fresh handle and must release it
    Transfer,
    /// The handle stays owned by the receiver
    Borrow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub returns: TypeRef,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_constructor: bool,
    /// The native call may fail by returning null
    #[serde(default)]
    pub fallible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<OwnershipHint>,
}

impl Method {
    /// Instance method returning nothing
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: TypeRef::Void,
            is_static: false,
            is_constructor: false,
            fallible: false,
            ownership: None,
        }
    }

    pub fn static_fn(name: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::new(name)
        }
    }

    pub fn constructor(name: impl Into<String>) -> Self {
        Self {
            is_constructor: true,
            ..Self::new(name)
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(Parameter::new(name, ty));
        self
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.returns = ty;
        self
    }

    pub fn fallible(mut self) -> Self {
        self.fallible = true;
        self
    }

    pub fn transfer(mut self) -> Self {
        self.ownership = Some(OwnershipHint::Transfer);
        self
    }

    pub fn borrowed(mut self) -> Self {
        self.ownership = Some(OwnershipHint::Borrow);
        self
    }

    /// Parameter types in order, used to tell constructors apart
    pub fn signature(&self) -> Vec<TypeRef> {
        self.params.iter().map(Parameter::effective_type).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub writable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<OwnershipHint>,
}

impl Property {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            writable: false,
            ownership: None,
        }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    pub fn transfer(mut self) -> Self {
        self.ownership = Some(OwnershipHint::Transfer);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Internal,
    Public,
}

/// A native object exposed through one wrapper type per target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Designated default construction path
    pub constructor: Method,
    #[serde(default)]
    pub named_constructors: Vec<Method>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Entity {
    pub fn new(name: impl Into<String>, constructor: Method) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Internal,
            constructor,
            named_constructors: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }

    pub fn with_named_constructor(mut self, constructor: Method) -> Self {
        self.named_constructors.push(constructor);
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Default constructor first, then named constructors in declaration order
    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        std::iter::once(&self.constructor).chain(self.named_constructors.iter())
    }

    /// Every member in emission order
    pub fn members(&self) -> impl Iterator<Item = Member<'_>> {
        self.constructors()
            .map(Member::Constructor)
            .chain(self.methods.iter().map(Member::Method))
            .chain(self.properties.iter().map(Member::Property))
    }

    /// Entities named by any member signature, excluding this one
    pub fn referenced_entities(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        for member in self.members() {
            for ty in member.types() {
                if let Some(name) = ty.referenced_entity() {
                    if name != self.name {
                        names.insert(name);
                    }
                }
            }
        }
        names
    }
}

/// Borrowed view of one entity member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    Constructor(&'a Method),
    Method(&'a Method),
    Property(&'a Property),
}

impl<'a> Member<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Member::Constructor(method) | Member::Method(method) => &method.name,
            Member::Property(property) => &property.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Member::Constructor(_) => "constructor",
            Member::Method(_) => "method",
            Member::Property(_) => "property",
        }
    }

    /// Every type reference the member carries across the boundary
    pub fn types(&self) -> Vec<&'a TypeRef> {
        match self {
            Member::Constructor(method) | Member::Method(method) => method
                .params
                .iter()
                .map(|param| &param.ty)
                .chain(std::iter::once(&method.returns))
                .collect(),
            Member::Property(property) => vec![&property.ty],
        }
    }
}

/// Deserialization shape of a model document; validated into a [`TypeModel`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// Validated, immutable model for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeModel {
    entities: Vec<Entity>,
}

impl TypeModel {
    pub fn new(entities: Vec<Entity>) -> Result<Self, ValidationError> {
        validate::validate_entities(&entities)?;
        tracing::debug!(entities = entities.len(), "type model validated");
        Ok(Self { entities })
    }

    pub fn from_document(document: ModelDocument) -> Result<Self, ValidationError> {
        Self::new(document.entities)
    }

    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        let document: ModelDocument = serde_json::from_str(source)?;
        Ok(Self::from_document(document)?)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_struct() -> Entity {
        Entity::new(
            "FirstStruct",
            Method::constructor("create").param("string", TypeRef::string()),
        )
        .with_method(
            Method::static_fn("firstFunction")
                .param("first_param", TypeRef::int32())
                .returning(TypeRef::bool()),
        )
        .with_property(Property::new("firstProperty", TypeRef::bool()))
    }

    #[test]
    fn test_members_keep_declaration_order() {
        let entity = first_struct()
            .with_named_constructor(Method::constructor("withNumber").param("n", TypeRef::int64()));
        let names: Vec<_> = entity.members().map(|m| (m.kind(), m.name())).collect();
        assert_eq!(
            names,
            vec![
                ("constructor", "create"),
                ("constructor", "withNumber"),
                ("method", "firstFunction"),
                ("property", "firstProperty"),
            ]
        );
    }

    #[test]
    fn test_type_ref_display() {
        assert_eq!(TypeRef::string().to_string(), "string");
        assert_eq!(TypeRef::optional(TypeRef::handle("Key")).to_string(), "Key?");
        assert_eq!(TypeRef::collection(TypeRef::int32()).to_string(), "[int32]");
        assert_eq!(TypeRef::Void.to_string(), "void");
    }

    #[test]
    fn test_referenced_entity_looks_through_wrappers() {
        let ty = TypeRef::collection(TypeRef::optional(TypeRef::handle("Key")));
        assert_eq!(ty.referenced_entity(), Some("Key"));
        assert!(!ty.is_handle());
        assert!(TypeRef::optional(TypeRef::handle("Key")).is_handle());
    }

    #[test]
    fn test_nullable_parameter_is_optional() {
        let param = Parameter::nullable("key", TypeRef::handle("Key"));
        assert_eq!(param.effective_type(), TypeRef::optional(TypeRef::handle("Key")));

        let already = Parameter::nullable("key", TypeRef::optional(TypeRef::handle("Key")));
        assert_eq!(already.effective_type(), TypeRef::optional(TypeRef::handle("Key")));
    }

    #[test]
    fn test_referenced_entities_excludes_self() {
        let entity = first_struct()
            .with_method(Method::new("clone").returning(TypeRef::handle("FirstStruct")))
            .with_method(Method::new("key").returning(TypeRef::handle("PublicKey")));
        let refs: Vec<_> = entity.referenced_entities().into_iter().collect();
        assert_eq!(refs, vec!["PublicKey"]);
    }

    #[test]
    fn test_model_json_roundtrip() {
        let model = TypeModel::new(vec![first_struct()]).unwrap();
        let json = model.to_json().unwrap();
        let loaded = TypeModel::from_json(&json).unwrap();
        assert_eq!(model, loaded);
    }

    #[test]
    fn test_json_defaults() {
        let source = r#"{
            "entities": [{
                "name": "Empty",
                "constructor": { "name": "create", "is_constructor": true }
            }]
        }"#;
        let model = TypeModel::from_json(source).unwrap();
        let entity = model.entity("Empty").unwrap();
        assert_eq!(entity.visibility, Visibility::Internal);
        assert!(entity.methods.is_empty());
        assert!(entity.constructor.returns.is_void());
    }
}
