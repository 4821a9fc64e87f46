//! Fraud Scoring Pipeline Library
//!
//! Rule-based fraud scoring over per-client behavioral features, with two
//! closed-form comparison strategies, metric-driven strategy selection and a
//! streaming scorer fed from NATS.

pub mod config;
pub mod consumer;
pub mod evaluation;
pub mod export;
pub mod feature_extractor;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod report;
pub mod scoring;
pub mod service;
pub mod stats;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use evaluation::{GroundTruth, MetricsEvaluator, ModelMetrics};
pub use feature_extractor::{ClientStateStore, FeatureEngineer};
pub use models::{ModelSelector, Stage3Results, Strategy};
pub use pipeline::{BatchEvaluation, BatchPipeline, StreamScorer};
pub use producer::AlertProducer;
pub use report::{DashboardSummary, LlmReportGenerator, ReportGenerator};
pub use scoring::RuleScorer;
pub use types::{
    alert::{FraudAlert, RiskLevel},
    enriched::EnrichedTransaction,
    transaction::Transaction,
};
