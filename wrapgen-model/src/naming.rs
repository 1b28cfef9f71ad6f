//! Native ABI naming convention
//!
//! For entity `E` with member `m` the native function is `E` followed by `m`
//! with its first letter upper-cased (`FirstStruct` + `firstFunction` gives
//! `FirstStructFirstFunction`). Constructors are `ECreate` (named ones
//! `ECreate<Name>`), the destructor is `EDelete`, property setters are
//! `ESet<Prop>`. An explicit override is always consulted first.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{Entity, Method, Property};

const CREATE_SUFFIX: &str = "Create";
const DELETE_SUFFIX: &str = "Delete";
const SETTER_INFIX: &str = "Set";

/// Override key for an entity's destructor
pub const DESTRUCTOR_KEY: &str = ":delete";

/// Override key for a property setter
pub fn setter_key(property: &str) -> String {
    format!("{property}:set")
}

/// Upper-case the first character, leaving the rest untouched
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Explicit native names for members that break the convention
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamingOverrides {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl NamingOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        entity: impl Into<String>,
        member: impl Into<String>,
        native: impl Into<String>,
    ) {
        self.entries
            .entry(entity.into())
            .or_default()
            .insert(member.into(), native.into());
    }

    pub fn with(mut self, entity: &str, member: &str, native: &str) -> Self {
        self.insert(entity, member, native);
        self
    }

    pub fn get(&self, entity: &str, member: &str) -> Option<&str> {
        self.entries.get(entity)?.get(member).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every `(entity, member)` key, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(entity, members)| {
            members
                .keys()
                .map(move |member| (entity.as_str(), member.as_str()))
        })
    }

    /// Later entries win
    pub fn merge(&mut self, other: NamingOverrides) {
        for (entity, members) in other.entries {
            self.entries.entry(entity).or_default().extend(members);
        }
    }
}

/// Native function names for one entity
#[derive(Debug, Clone, Copy)]
pub struct NativeBinding<'a> {
    entity: &'a Entity,
    overrides: &'a NamingOverrides,
}

impl<'a> NativeBinding<'a> {
    pub fn new(entity: &'a Entity, overrides: &'a NamingOverrides) -> Self {
        Self { entity, overrides }
    }

    fn resolve(&self, key: &str, derived: impl FnOnce() -> String) -> String {
        self.overrides
            .get(&self.entity.name, key)
            .map_or_else(derived, str::to_string)
    }

    pub fn destructor(&self) -> String {
        self.resolve(DESTRUCTOR_KEY, || {
            format!("{}{}", self.entity.name, DELETE_SUFFIX)
        })
    }

    /// The default constructor is `ECreate`; named constructors get a suffix
    pub fn constructor(&self, method: &Method) -> String {
        self.resolve(&method.name, || {
            if method.name == self.entity.constructor.name {
                format!("{}{}", self.entity.name, CREATE_SUFFIX)
            } else {
                format!(
                    "{}{}{}",
                    self.entity.name,
                    CREATE_SUFFIX,
                    capitalize(&method.name)
                )
            }
        })
    }

    pub fn method(&self, method: &Method) -> String {
        self.resolve(&method.name, || {
            format!("{}{}", self.entity.name, capitalize(&method.name))
        })
    }

    pub fn getter(&self, property: &Property) -> String {
        self.resolve(&property.name, || {
            format!("{}{}", self.entity.name, capitalize(&property.name))
        })
    }

    pub fn setter(&self, property: &Property) -> String {
        self.resolve(&setter_key(&property.name), || {
            format!(
                "{}{}{}",
                self.entity.name,
                SETTER_INFIX,
                capitalize(&property.name)
            )
        })
    }
}
