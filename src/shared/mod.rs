//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the core subsystems and the HTTP/WebSocket API surface. All types are
//! designed for serialization and transmission over HTTP.

/// Dream records, analysis results, and risk flags
pub mod dream;

/// Group sessions and presence snapshots
pub mod group;

/// Wire messages and registry events
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use dream::{
    AnalysisFailure, AnalysisResult, DreamRecord, DreamStatus, FailureReason, RiskFlags,
    RiskTier, SharePolicy, SymbolEntry,
};
pub use event::{DisconnectReason, RegistryEvent, WireMessage, WireMessageKind};
pub use group::{GroupSession, PresenceSnapshot};
pub use error::SharedError;
pub use config::{AnalysisConfig, AppConfig, ConfigError, ModelConfig, RealtimeConfig, RiskThresholds};
