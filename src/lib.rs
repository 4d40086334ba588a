//! # apidump-base
//!
//! Core library for extracting the public API surface of compiled Kotlin
//! modules (JVM bytecode, JS module metadata, native klibs), rendering it
//! as deterministic text and checking it against a checked-in baseline.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! dispatch   → build / check / sync / publish, parallel batches
//!   ↓
//! check      → Directory comparison, mismatch report
//!   ↓
//! render     → Canonical `.api` text, output directory writer
//!   ↓
//! extract    → JVM, JS and native extractors
//!   ↓
//! metadata   → Kotlin descriptor protobuf decoding
//!   ↓
//! visibility → Effective-visibility predicate
//!   ↓
//! model      → Symbol model (pure data)
//!   ↓
//! base       → Platform tags, native targets, constants
//! ```
//!
//! `config` sits beside `dispatch` and is the only module that reads user
//! configuration.

// ============================================================================
// MODULES (dependency order: base → model → visibility → metadata → extract
//          → render → check → dispatch)
// ============================================================================

/// Foundation types: platforms, native targets, constants
pub mod base;

/// Symbol model produced by extractors
pub mod model;

/// Visibility resolver
pub mod visibility;

/// Kotlin descriptor metadata shared by all extractors
pub mod metadata;

/// Platform extractors
pub mod extract;

/// Canonical renderer
pub mod render;

/// Directory comparator
pub mod check;

/// Extraction dispatcher
pub mod dispatch;

/// User configuration
pub mod config;

// Re-export foundation types
pub use base::{NativeTarget, Platform};

// Re-export the orchestrator-facing surface
pub use check::{ApiMismatch, CompareError, DirectoryRole, compare};
pub use config::{ApiCheckConfig, ConfigError};
pub use dispatch::{
    ApiError, ApiTarget, BuildOutcome, CheckOutcome, build_all, build_api, check_all, check_api,
    publish_api, sync_api,
};
pub use extract::{ExtractionError, ExtractionInput, extract};
pub use model::Module;
pub use render::{RenderError, render, write_output};
