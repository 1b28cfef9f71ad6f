//! Type mapping from model references to target and native types
//!
//! A mapping is a pure function of the type reference, the target language and
//! the target's string bridge. The returned [`Marshalling`] tells emitters what
//! has to happen at the boundary.

use wrapgen_model::{Parameter, PrimitiveKind, TypeRef};

use crate::error::UnsupportedTypeError;
use crate::target::{StringBridge, TargetLanguage};

/// Position of a value relative to the native call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Passed into the native call
    Argument,
    /// Returned from the native call
    Return,
}

/// Conversion applied when a value crosses the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marshalling {
    /// Same representation on both sides
    PassThrough,
    /// Host string to native string (released after the call) or back
    StringBridge,
    /// Returned native pointer adopted into a wrapper instance
    HandleWrap,
    /// Wrapper argument contributes its raw pointer and keeps ownership
    HandleUnwrap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// Type name in the target language
    pub host: String,
    /// Type name in the C ABI
    pub native: String,
    pub marshalling: Marshalling,
    /// The value may be absent (nullable pointer on the native side)
    pub nullable: bool,
    /// Wrapped entity for handle types
    pub entity: Option<String>,
}

impl MappedType {
    pub fn is_void(&self) -> bool {
        self.native == "void"
    }
}

/// Maps type references for one target language
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    target: TargetLanguage,
    bridge: Option<&'a StringBridge>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(target: TargetLanguage, bridge: Option<&'a StringBridge>) -> Self {
        Self { target, bridge }
    }

    pub fn target(&self) -> TargetLanguage {
        self.target
    }

    pub fn bridge(&self) -> Option<&'a StringBridge> {
        self.bridge
    }

    pub fn map_param(&self, param: &Parameter) -> Result<MappedType, UnsupportedTypeError> {
        self.map_type(&param.effective_type(), Direction::Argument)
    }

    pub fn map_return(&self, ty: &TypeRef) -> Result<MappedType, UnsupportedTypeError> {
        self.map_type(ty, Direction::Return)
    }

    pub fn map_type(
        &self,
        ty: &TypeRef,
        direction: Direction,
    ) -> Result<MappedType, UnsupportedTypeError> {
        match ty {
            TypeRef::Void => match direction {
                Direction::Return => Ok(MappedType {
                    host: self.void_name().to_string(),
                    native: "void".to_string(),
                    marshalling: Marshalling::PassThrough,
                    nullable: false,
                    entity: None,
                }),
                Direction::Argument => Err(self.unsupported(ty, "void cannot be passed as a value")),
            },
            TypeRef::Primitive(kind) => self.map_primitive(ty, *kind),
            TypeRef::Handle(entity) => Ok(MappedType {
                host: entity.clone(),
                native: format!("struct {entity} *"),
                marshalling: match direction {
                    Direction::Argument => Marshalling::HandleUnwrap,
                    Direction::Return => Marshalling::HandleWrap,
                },
                nullable: false,
                entity: Some(entity.clone()),
            }),
            TypeRef::Optional(inner) => {
                match inner.as_ref() {
                    TypeRef::Handle(_) | TypeRef::Primitive(PrimitiveKind::String) => {}
                    TypeRef::Optional(_) => {
                        return Err(self.unsupported(ty, "nested optionals collapse to one nullable pointer"))
                    }
                    _ => {
                        return Err(self.unsupported(
                            ty,
                            "the C ABI has no nullable representation for this type",
                        ))
                    }
                }
                let mapped = self.map_type(inner, direction)?;
                Ok(MappedType {
                    host: self.optional_name(&mapped.host),
                    nullable: true,
                    ..mapped
                })
            }
            TypeRef::Collection(_) => {
                Err(self.unsupported(ty, "the C ABI has no collection type"))
            }
        }
    }

    fn map_primitive(
        &self,
        ty: &TypeRef,
        kind: PrimitiveKind,
    ) -> Result<MappedType, UnsupportedTypeError> {
        let (native, marshalling) = match kind {
            PrimitiveKind::Bool => ("bool".to_string(), Marshalling::PassThrough),
            PrimitiveKind::Int32 => ("int32_t".to_string(), Marshalling::PassThrough),
            PrimitiveKind::Int64 => ("int64_t".to_string(), Marshalling::PassThrough),
            PrimitiveKind::Float => ("float".to_string(), Marshalling::PassThrough),
            PrimitiveKind::Double => ("double".to_string(), Marshalling::PassThrough),
            PrimitiveKind::String => {
                let bridge = self
                    .bridge
                    .ok_or_else(|| self.unsupported(ty, "no native string bridge is configured"))?;
                (bridge.native_type.clone(), Marshalling::StringBridge)
            }
        };
        Ok(MappedType {
            host: self.primitive_name(kind).to_string(),
            native,
            marshalling,
            nullable: false,
            entity: None,
        })
    }

    fn primitive_name(&self, kind: PrimitiveKind) -> &'static str {
        match (self.target, kind) {
            (TargetLanguage::Swift, PrimitiveKind::Bool) => "Bool",
            (TargetLanguage::Swift, PrimitiveKind::Int32) => "Int32",
            (TargetLanguage::Swift, PrimitiveKind::Int64) => "Int64",
            (TargetLanguage::Swift, PrimitiveKind::Float) => "Float",
            (TargetLanguage::Swift, PrimitiveKind::Double) => "Double",
            (TargetLanguage::Swift, PrimitiveKind::String) => "String",
            (TargetLanguage::Kotlin, PrimitiveKind::Bool) => "Boolean",
            (TargetLanguage::Kotlin, PrimitiveKind::Int32) => "Int",
            (TargetLanguage::Kotlin, PrimitiveKind::Int64) => "Long",
            (TargetLanguage::Kotlin, PrimitiveKind::Float) => "Float",
            (TargetLanguage::Kotlin, PrimitiveKind::Double) => "Double",
            (TargetLanguage::Kotlin, PrimitiveKind::String) => "String",
            (TargetLanguage::Cpp, PrimitiveKind::Bool) => "bool",
            (TargetLanguage::Cpp, PrimitiveKind::Int32) => "int32_t",
            (TargetLanguage::Cpp, PrimitiveKind::Int64) => "int64_t",
            (TargetLanguage::Cpp, PrimitiveKind::Float) => "float",
            (TargetLanguage::Cpp, PrimitiveKind::Double) => "double",
            (TargetLanguage::Cpp, PrimitiveKind::String) => "std::string",
        }
    }

    fn void_name(&self) -> &'static str {
        match self.target {
            TargetLanguage::Swift => "Void",
            TargetLanguage::Kotlin => "Unit",
            TargetLanguage::Cpp => "void",
        }
    }

    fn optional_name(&self, host: &str) -> String {
        match self.target {
            TargetLanguage::Swift | TargetLanguage::Kotlin => format!("{host}?"),
            TargetLanguage::Cpp => format!("std::optional<{host}>"),
        }
    }

    fn unsupported(&self, ty: &TypeRef, reason: &str) -> UnsupportedTypeError {
        UnsupportedTypeError::new(ty, self.target, reason)
    }
}
