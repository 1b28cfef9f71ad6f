//! Intermediate representation for wrapper emission
//!
//! Lowering resolves everything that does not depend on target syntax: native
//! symbol names, mapped types and handle ownership. Emitters only render an
//! [`IRWrapper`]; they never consult the model, the mapper or the resolver.

use wrapgen_checker::{
    MappedType, Marshalling, Ownership, OwnershipTable, TargetLanguage, TypeMapper,
};
use wrapgen_model::{Entity, Method, NativeBinding, NamingOverrides, Property, Visibility};

use crate::backend::{EmitContext, EmitError};

/// Everything an emitter needs to render one entity
#[derive(Debug, Clone)]
pub struct IRWrapper {
    pub name: String,
    pub visibility: Visibility,
    /// Native destructor, called from the single finalization path
    pub destructor: String,
    /// Some member hands out borrowed handles of this entity, so wrappers
    /// may have to keep an owner alive instead of releasing
    pub retains_owner: bool,
    pub initializers: Vec<IRInitializer>,
    pub functions: Vec<IRFunction>,
    pub properties: Vec<IRProperty>,
    /// Other entities named in member signatures, sorted
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IRParameter {
    pub name: String,
    pub ty: MappedType,
}

impl IRParameter {
    pub fn is_bridged(&self) -> bool {
        self.ty.marshalling == Marshalling::StringBridge
    }
}

#[derive(Debug, Clone)]
pub struct IRInitializer {
    pub name: String,
    pub native: String,
    pub parameters: Vec<IRParameter>,
    /// The native call may return null; no handle is adopted then
    pub fallible: bool,
}

#[derive(Debug, Clone)]
pub struct IRReturn {
    pub ty: MappedType,
    pub ownership: Ownership,
}

impl IRReturn {
    pub fn is_void(&self) -> bool {
        self.ty.is_void()
    }

    pub fn is_bridged(&self) -> bool {
        self.ty.marshalling == Marshalling::StringBridge
    }

    pub fn is_handle(&self) -> bool {
        self.ty.marshalling == Marshalling::HandleWrap
    }

    /// Wrapped entity name for handle returns
    pub fn entity(&self) -> Option<&str> {
        self.ty.entity.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct IRFunction {
    pub name: String,
    pub native: String,
    pub parameters: Vec<IRParameter>,
    pub returns: IRReturn,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct IRProperty {
    pub name: String,
    pub getter: String,
    pub returns: IRReturn,
    pub setter: Option<IRSetter>,
}

/// Setter of a writable property; the value name is chosen by each target
#[derive(Debug, Clone)]
pub struct IRSetter {
    pub native: String,
    pub ty: MappedType,
}

/// Lowers entities for one target
pub struct IRBuilder<'a> {
    mapper: TypeMapper<'a>,
    overrides: &'a NamingOverrides,
    ownership: &'a OwnershipTable,
}

impl<'a> IRBuilder<'a> {
    pub fn new(target: TargetLanguage, ctx: &EmitContext<'a>) -> Self {
        Self {
            mapper: TypeMapper::new(target, ctx.bridge),
            overrides: ctx.overrides,
            ownership: ctx.ownership,
        }
    }

    pub fn build(&self, entity: &Entity) -> Result<IRWrapper, EmitError> {
        let binding = NativeBinding::new(entity, self.overrides);

        let initializers = entity
            .constructors()
            .map(|method| {
                Ok(IRInitializer {
                    name: method.name.clone(),
                    native: binding.constructor(method),
                    parameters: self.parameters(method)?,
                    fallible: method.fallible,
                })
            })
            .collect::<Result<Vec<_>, EmitError>>()?;

        let functions = entity
            .methods
            .iter()
            .map(|method| self.function(entity, &binding, method))
            .collect::<Result<Vec<_>, _>>()?;

        let properties = entity
            .properties
            .iter()
            .map(|property| self.property(entity, &binding, property))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IRWrapper {
            name: entity.name.clone(),
            visibility: entity.visibility,
            destructor: binding.destructor(),
            retains_owner: self.ownership.is_borrowed_target(&entity.name),
            initializers,
            functions,
            properties,
            dependencies: entity
                .referenced_entities()
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }

    fn parameters(&self, method: &Method) -> Result<Vec<IRParameter>, EmitError> {
        method
            .params
            .iter()
            .map(|param| {
                Ok(IRParameter {
                    name: param.name.clone(),
                    ty: self.mapper.map_param(param)?,
                })
            })
            .collect()
    }

    fn function(
        &self,
        entity: &Entity,
        binding: &NativeBinding<'_>,
        method: &Method,
    ) -> Result<IRFunction, EmitError> {
        Ok(IRFunction {
            name: method.name.clone(),
            native: binding.method(method),
            parameters: self.parameters(method)?,
            returns: IRReturn {
                ty: self.mapper.map_return(&method.returns)?,
                ownership: self.ownership_of(entity, &method.name)?,
            },
            is_static: method.is_static,
        })
    }

    fn property(
        &self,
        entity: &Entity,
        binding: &NativeBinding<'_>,
        property: &Property,
    ) -> Result<IRProperty, EmitError> {
        let setter = if property.writable {
            Some(IRSetter {
                native: binding.setter(property),
                ty: self
                    .mapper
                    .map_type(&property.ty, wrapgen_checker::Direction::Argument)?,
            })
        } else {
            None
        };

        Ok(IRProperty {
            name: property.name.clone(),
            getter: binding.getter(property),
            returns: IRReturn {
                ty: self.mapper.map_return(&property.ty)?,
                ownership: self.ownership_of(entity, &property.name)?,
            },
            setter,
        })
    }

    fn ownership_of(&self, entity: &Entity, member: &str) -> Result<Ownership, EmitError> {
        self.ownership
            .get(&entity.name, member)
            .ok_or_else(|| EmitError::missing_ownership(&entity.name, member))
    }
}
