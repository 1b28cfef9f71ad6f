//! wrapgen
//!
//! Generates Swift, Kotlin and C++ wrappers from one language-neutral type
//! model. Every wrapper owns an opaque handle into a shared C ABI, bridges
//! strings across the boundary and releases native resources exactly once.
//!
//! ```no_run
//! use wrapgen::{generate, presets, Entity, Method, TypeModel, TypeRef};
//!
//! let model = TypeModel::new(vec![Entity::new(
//!     "PrivateKey",
//!     Method::constructor("create").param("hex", TypeRef::string()),
//! )])?;
//! let report = generate(&model, presets::trust_wallet())?;
//! for file in &report.files {
//!     println!("{}", file.path.display());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use wrapgen_checker::{
    check_parity, CheckReport, ConsistencyChecker, ConsistencyError, Issue, IssueKind,
    MemberSummary, Ownership, OwnershipAmbiguityError, OwnershipTable, StringBridge,
    TargetLanguage, TypeMapper, UnsupportedTypeError,
};
pub use wrapgen_compiler::{
    diff_outputs, generate, presets, Backend, ConfigError, ConfigOverride, EmitError, Emitter,
    GeneratedFile, GenerationReport, Generator, GeneratorConfig, GeneratorError, PipelineStage,
    GENERATED_NOTICE,
};
pub use wrapgen_model::{
    Entity, Method, ModelDocument, NamingOverrides, NativeBinding, OwnershipHint, Parameter,
    PrimitiveKind, Property, TypeModel, TypeRef, ValidationError, Visibility,
};

/// Load a JSON model document and generate with `config`
pub fn generate_from_json(source: &str, config: GeneratorConfig) -> anyhow::Result<GenerationReport> {
    let generator = Generator::new(config)?;
    Ok(generator.generate_json(source)?)
}
