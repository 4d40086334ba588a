//! Pipeline tests
//!
//! Extraction, rendering and comparison driven through the dispatcher:
//! - Build determinism and baseline checks
//! - Directory comparison over generated trees
//! - Configuration-driven layouts

mod tests_check;
mod tests_dispatch;
