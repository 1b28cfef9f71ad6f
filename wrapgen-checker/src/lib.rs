//! wrapgen Checker
//!
//! Analysis passes that run between the type model and the emitters: mapping
//! model types to each target language, resolving who owns returned handles,
//! and verifying up front that every member can be rendered for every target.

pub mod consistency;
pub mod error;
pub mod mapper;
pub mod ownership;
pub mod target;

pub use consistency::{check_parity, CheckReport, ConsistencyChecker, MemberSummary};
pub use error::{
    ConsistencyError, Issue, IssueKind, OwnershipAmbiguityError, UnknownTargetError,
    UnsupportedTypeError,
};
pub use mapper::{Direction, MappedType, Marshalling, TypeMapper};
pub use ownership::{indicates_creation, resolve_method, resolve_property, Ownership, OwnershipTable};
pub use target::{StringBridge, TargetLanguage};
