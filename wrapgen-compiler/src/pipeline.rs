//! Generation pipeline for orchestrating a run
//!
//! A run validates the model, checks every member against every configured
//! target, emits one file per (entity, target) pair in parallel and finally
//! verifies that every wrapper carries the members the model declares. Nothing
//! is returned unless every stage passes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use wrapgen_checker::{
    check_parity, CheckReport, ConsistencyChecker, ConsistencyError, Issue, IssueKind,
    MemberSummary, StringBridge, TargetLanguage,
};
use wrapgen_model::{Entity, ModelDocument, ModelError, TypeModel, ValidationError};

use crate::backend::{Backend, EmitContext, EmitError, Emitter};
use crate::config::{ConfigError, GeneratorConfig};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Validate,
    Check,
    Emit,
    Parity,
}

/// Pipeline stage result
#[derive(Debug)]
pub struct PipelineResult<T> {
    pub stage: PipelineStage,
    pub result: T,
    pub duration: Duration,
}

/// One wrapper source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub target: TargetLanguage,
    pub entity: String,
    /// Relative to the output root, e.g. `swift/Wallet.swift`
    pub path: PathBuf,
    pub contents: String,
    /// Members actually written
    pub summary: MemberSummary,
    /// Lowercase hex SHA-256 of `contents`
    pub fingerprint: String,
}

impl GeneratedFile {
    fn new(target: TargetLanguage, entity: &str, path: PathBuf, contents: String, summary: MemberSummary) -> Self {
        let fingerprint = fingerprint(contents.as_bytes());
        Self {
            target,
            entity: entity.to_string(),
            path,
            contents,
            summary,
            fingerprint,
        }
    }
}

fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Generation metadata
#[derive(Debug, Clone, Default)]
pub struct GenerationMetadata {
    pub check_time: Duration,
    pub emit_time: Duration,
    pub total_time: Duration,
    pub entities: usize,
    pub members_checked: usize,
    pub generated_files: usize,
    pub total_output_size: usize,
}

/// Output of a successful run; files are ordered by path
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub targets: Vec<TargetLanguage>,
    pub files: Vec<GeneratedFile>,
    pub metadata: GenerationMetadata,
}

impl GenerationReport {
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&GeneratedFile> {
        let path = path.as_ref();
        self.files.iter().find(|file| file.path == path)
    }

    pub fn files_for(&self, target: TargetLanguage) -> impl Iterator<Item = &GeneratedFile> {
        self.files.iter().filter(move |file| file.target == target)
    }

    /// Hash over every path and fingerprint; equal for byte-identical runs
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for file in &self.files {
            hasher.update(file.path.to_string_lossy().as_bytes());
            hasher.update([0]);
            hasher.update(file.fingerprint.as_bytes());
            hasher.update([0]);
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid model document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("model validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("consistency check failed: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("internal error during emission: {0}")]
    Internal(#[from] EmitError),

    #[error("emitted wrappers diverge from the model: {0}")]
    Parity(ConsistencyError),
}

impl From<ModelError> for GeneratorError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::Json(error) => GeneratorError::Document(error),
            ModelError::Validation(error) => GeneratorError::Validation(error),
        }
    }
}

impl GeneratorError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            GeneratorError::Config(_)
            | GeneratorError::Document(_)
            | GeneratorError::Validation(_) => PipelineStage::Validate,
            GeneratorError::Consistency(_) => PipelineStage::Check,
            GeneratorError::Internal(_) => PipelineStage::Emit,
            GeneratorError::Parity(_) => PipelineStage::Parity,
        }
    }
}

/// Runs the pipeline for one validated configuration
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    bridges: BTreeMap<TargetLanguage, StringBridge>,
    backends: Vec<Backend>,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        let bridges = config.bridges();
        let backends = config
            .targets
            .iter()
            .map(|&target| Backend::for_target(target, &config))
            .collect();
        Ok(Self {
            config,
            bridges,
            backends,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn targets(&self) -> &[TargetLanguage] {
        &self.config.targets
    }

    /// Validation and consistency only; nothing is emitted
    pub fn check(&self, model: &TypeModel) -> Result<CheckReport, GeneratorError> {
        Ok(self.run_check_stage(model)?.result)
    }

    /// Run every stage and return all files, or nothing
    pub fn generate(&self, model: &TypeModel) -> Result<GenerationReport, GeneratorError> {
        let total_start = Instant::now();

        let check = self.run_check_stage(model)?;
        let report = check.result;
        let emit = self.run_emit_stage(model, &report)?;
        let files = emit.result;
        self.run_parity_stage(model, &files)?;

        let metadata = GenerationMetadata {
            check_time: check.duration,
            emit_time: emit.duration,
            total_time: total_start.elapsed(),
            entities: model.len(),
            members_checked: report.members_checked,
            generated_files: files.len(),
            total_output_size: files.iter().map(|file| file.contents.len()).sum(),
        };
        tracing::info!(
            entities = metadata.entities,
            files = metadata.generated_files,
            bytes = metadata.total_output_size,
            elapsed = ?metadata.total_time,
            "generation finished"
        );

        Ok(GenerationReport {
            targets: self.config.targets.clone(),
            files,
            metadata,
        })
    }

    pub fn generate_document(&self, document: ModelDocument) -> Result<GenerationReport, GeneratorError> {
        let model = self.run_validate_stage(document)?.result;
        self.generate(&model)
    }

    /// Deserialize and validate a JSON model document, then generate
    pub fn generate_json(&self, source: &str) -> Result<GenerationReport, GeneratorError> {
        let document: ModelDocument = serde_json::from_str(source)?;
        self.generate_document(document)
    }

    fn run_validate_stage(&self, document: ModelDocument) -> Result<PipelineResult<TypeModel>, GeneratorError> {
        let start = Instant::now();
        let model = TypeModel::from_document(document)?;
        Ok(PipelineResult {
            stage: PipelineStage::Validate,
            result: model,
            duration: start.elapsed(),
        })
    }

    fn run_check_stage(&self, model: &TypeModel) -> Result<PipelineResult<CheckReport>, GeneratorError> {
        let start = Instant::now();
        let report = ConsistencyChecker::new(model, &self.bridges).check(&self.config.targets)?;
        Ok(PipelineResult {
            stage: PipelineStage::Check,
            result: report,
            duration: start.elapsed(),
        })
    }

    fn run_emit_stage(
        &self,
        model: &TypeModel,
        report: &CheckReport,
    ) -> Result<PipelineResult<Vec<GeneratedFile>>, GeneratorError> {
        let start = Instant::now();

        let jobs: Vec<(&Entity, &Backend)> = model
            .entities()
            .iter()
            .flat_map(|entity| self.backends.iter().map(move |backend| (entity, backend)))
            .collect();

        let emitted = jobs
            .par_iter()
            .map(|&(entity, backend)| {
                let target = backend.target();
                let ctx = EmitContext {
                    banner: &self.config.header_banner,
                    bridge: self.bridges.get(&target),
                    overrides: &self.config.naming_overrides,
                    ownership: &report.ownership,
                };
                let source = backend.emit(entity, &ctx)?;
                let path = PathBuf::from(backend.file_name(entity));
                tracing::debug!(path = %path.display(), bytes = source.text.len(), "emitted wrapper");
                Ok(GeneratedFile::new(target, &entity.name, path, source.text, source.summary))
            })
            .collect::<Result<Vec<_>, EmitError>>()?;

        let files: BTreeMap<PathBuf, GeneratedFile> = emitted
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect();

        Ok(PipelineResult {
            stage: PipelineStage::Emit,
            result: files.into_values().collect(),
            duration: start.elapsed(),
        })
    }

    fn run_parity_stage(
        &self,
        model: &TypeModel,
        files: &[GeneratedFile],
    ) -> Result<PipelineResult<()>, GeneratorError> {
        let start = Instant::now();
        check_parity(
            model,
            files
                .iter()
                .map(|file| (file.target, file.entity.as_str(), file.summary)),
        )
        .map_err(GeneratorError::Parity)?;
        diff_outputs(files).map_err(GeneratorError::Parity)?;
        Ok(PipelineResult {
            stage: PipelineStage::Parity,
            result: (),
            duration: start.elapsed(),
        })
    }
}

/// Compare member counts of the same entity across targets.
///
/// The first target seen for an entity is the reference; every other target
/// whose wrapper differs is reported.
pub fn diff_outputs(files: &[GeneratedFile]) -> Result<(), ConsistencyError> {
    let mut reference: BTreeMap<&str, &GeneratedFile> = BTreeMap::new();
    let mut issues = Vec::new();
    let mut seen = BTreeSet::new();

    for file in files {
        if !seen.insert((file.entity.as_str(), file.target)) {
            continue;
        }
        match reference.get(file.entity.as_str()) {
            None => {
                reference.insert(&file.entity, file);
            }
            Some(first) if first.summary != file.summary => issues.push(Issue {
                entity: file.entity.clone(),
                member: "*".to_string(),
                target: file.target,
                kind: IssueKind::Parity {
                    expected: format!("{} ({})", first.summary, first.target),
                    found: file.summary.to_string(),
                },
            }),
            Some(_) => {}
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ConsistencyError { issues })
    }
}
