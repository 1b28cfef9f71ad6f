//! Emitter interface shared by every target language

use wrapgen_checker::{
    MemberSummary, OwnershipTable, StringBridge, TargetLanguage, UnsupportedTypeError,
};
use wrapgen_model::{Entity, NamingOverrides};

use crate::config::{option_keys, GeneratorConfig};
use crate::cpp::CppEmitter;
use crate::kotlin::KotlinEmitter;
use crate::swift::SwiftEmitter;

/// Inputs shared by every entity emitted for one target
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Banner template, rendered above the generated-file notice
    pub banner: &'a str,
    pub bridge: Option<&'a StringBridge>,
    pub overrides: &'a NamingOverrides,
    pub ownership: &'a OwnershipTable,
}

/// Source of one wrapper, with the member counts the emitter actually wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub summary: MemberSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedTypeError),

    #[error("no ownership was resolved for {entity}.{member}")]
    MissingOwnership { entity: String, member: String },

    #[error("no string bridge is configured for target `{target}`")]
    MissingBridge { target: TargetLanguage },

    #[error("failed to format generated code")]
    Format(#[from] std::fmt::Error),
}

impl EmitError {
    pub fn missing_ownership(entity: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MissingOwnership {
            entity: entity.into(),
            member: member.into(),
        }
    }
}

/// One wrapper per entity for a single target language
pub trait Emitter {
    fn target(&self) -> TargetLanguage;

    /// Render the wrapper for `entity`. No I/O happens here.
    fn emit(&self, entity: &Entity, ctx: &EmitContext<'_>) -> Result<SourceText, EmitError>;

    /// Output path relative to the output root
    fn file_name(&self, entity: &Entity) -> String {
        let target = self.target();
        format!("{}/{}.{}", target.name(), entity.name, target.file_extension())
    }
}

/// Closed set of emitters, selected by configuration
#[derive(Debug, Clone)]
pub enum Backend {
    Swift(SwiftEmitter),
    Kotlin(KotlinEmitter),
    Cpp(CppEmitter),
}

impl Backend {
    /// Build the emitter for `target` with its per-target options applied
    pub fn for_target(target: TargetLanguage, config: &GeneratorConfig) -> Self {
        let options = config.target_config(target);
        match target {
            TargetLanguage::Swift => Backend::Swift(SwiftEmitter::new()),
            TargetLanguage::Kotlin => {
                let mut emitter = KotlinEmitter::new();
                if let Some(package) = options.get_string(option_keys::KOTLIN_PACKAGE) {
                    emitter = emitter.with_package(package);
                }
                if let Some(native) = options.get_string(option_keys::KOTLIN_NATIVE_PACKAGE) {
                    emitter = emitter.with_native_package(native);
                }
                if let Some(opt_in) = options.get_bool(option_keys::KOTLIN_OPT_IN) {
                    emitter = emitter.with_opt_in(opt_in);
                }
                Backend::Kotlin(emitter)
            }
            TargetLanguage::Cpp => {
                let mut emitter = CppEmitter::new();
                if let Some(namespace) = options.get_string(option_keys::CPP_NAMESPACE) {
                    emitter = emitter.with_namespace(namespace);
                }
                if let Some(header) = options.get_string(option_keys::CPP_NATIVE_HEADER) {
                    emitter = emitter.with_native_header(header);
                }
                Backend::Cpp(emitter)
            }
        }
    }

    /// Every target a backend exists for
    pub fn available_targets() -> &'static [TargetLanguage] {
        &TargetLanguage::ALL
    }
}

impl Emitter for Backend {
    fn target(&self) -> TargetLanguage {
        match self {
            Backend::Swift(emitter) => emitter.target(),
            Backend::Kotlin(emitter) => emitter.target(),
            Backend::Cpp(emitter) => emitter.target(),
        }
    }

    fn emit(&self, entity: &Entity, ctx: &EmitContext<'_>) -> Result<SourceText, EmitError> {
        match self {
            Backend::Swift(emitter) => emitter.emit(entity, ctx),
            Backend::Kotlin(emitter) => emitter.emit(entity, ctx),
            Backend::Cpp(emitter) => emitter.emit(entity, ctx),
        }
    }
}
