//! Foundation types for the apidump toolchain.
//!
//! This module provides fundamental types used throughout the engine:
//! - [`Platform`] - The closed set of compilation platforms
//! - [`NativeTarget`] - Recognized native target identifiers
//! - Domain constants (file extensions, synthetic name suffixes, well-known names)
//!
//! This module has NO dependencies on other apidump modules.

pub mod constants;
mod platform;
mod target;

pub use platform::Platform;
pub use target::NativeTarget;
