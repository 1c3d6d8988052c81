//! StratGate Runner — model risk, lifecycle governance, and orchestration.
//!
//! This crate builds on `stratgate-core` to provide:
//! - Five independent model-risk detectors and a rating composer
//! - The strategy lifecycle state machine with persisted status records
//! - Atomic per-strategy status stores (JSON file and in-memory)
//! - Markdown validation reports
//! - Single-strategy and rayon-parallel batch validation pipelines
//! - TOML-loadable configuration with a blake3 content hash

pub mod config;
pub mod lifecycle;
pub mod pipeline;
pub mod report;
pub mod risk;

pub use config::{ConfigError, ValidationConfig};
pub use lifecycle::{
    CycleInputs, GateCheck, HealthRecord, HealthState, JsonStatusStore, LifecycleConfig,
    LifecycleError, LifecycleState, LifecycleStateMachine, LiveMetrics, MemoryStatusStore,
    PaperMetrics, StatusMetadata, StatusStore, StoreError, StrategyStatus, TransitionDecision,
};
pub use pipeline::{
    run_validation_batch, run_validation_cycle, run_wfa, Candidate, CycleContext, PipelineError,
    ValidationOutcome, WfaRun,
};
pub use report::ValidationReport;
pub use risk::{
    compose_rating, Detector, DriftConfig, DriftDetector, FragilityConfig, FragilityDetector,
    FragilityEvidence, ModelRiskAnalyzer, ModelRiskReport, OverfitConfig, OverfitDetector,
    Perturbation, PerturbationKind, RegimeDependencyConfig, RegimeDependencyDetector, RiskConfig,
    RiskError, RiskEvidence, RiskFinding, RiskRating, StabilityConfig, StabilityDetector,
};
