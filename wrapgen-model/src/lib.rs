//! wrapgen Type Model
//!
//! This crate holds the language-neutral description of a native library
//! surface: entities wrapping opaque handles, their constructors, methods and
//! properties, and the native function naming convention. A [`TypeModel`] can
//! only be obtained through validation and is immutable afterwards.

pub mod error;
pub mod model;
pub mod naming;
mod validate;

pub use error::{ModelError, Result, ValidationError};
pub use model::{
    Entity, Member, Method, ModelDocument, OwnershipHint, Parameter, PrimitiveKind, Property,
    TypeModel, TypeRef, Visibility,
};
pub use naming::{capitalize, NamingOverrides, NativeBinding};
