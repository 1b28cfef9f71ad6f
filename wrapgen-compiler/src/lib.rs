//! wrapgen Compiler
//!
//! Turns a validated type model into wrapper sources for Swift, Kotlin and C++.
//! Every wrapper owns one opaque native handle and forwards its members to the
//! shared C ABI. Generation is a pure transform: files are returned in a
//! [`GenerationReport`] and written only by the `wrapgen` binary.

pub mod backend;
pub mod config;
pub mod cpp;
pub mod ir;
pub mod kotlin;
pub mod pipeline;
pub mod swift;
pub mod utils;

// Re-export main types
pub use backend::{Backend, EmitContext, EmitError, Emitter, SourceText};
pub use config::{
    presets, ConfigError, ConfigOverride, ConfigValue, GeneratorConfig, TargetConfig,
};
pub use cpp::CppEmitter;
pub use ir::{IRBuilder, IRWrapper};
pub use kotlin::KotlinEmitter;
pub use pipeline::{
    diff_outputs, GeneratedFile, GenerationMetadata, GenerationReport, Generator, GeneratorError,
    PipelineResult, PipelineStage,
};
pub use swift::SwiftEmitter;
pub use utils::GENERATED_NOTICE;

use wrapgen_model::TypeModel;

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// High-level generation function
pub fn generate(model: &TypeModel, config: GeneratorConfig) -> Result<GenerationReport> {
    Generator::new(config)?.generate(model)
}
