//! Extractor tests
//!
//! Real artifacts assembled on disk, extracted and rendered:
//! - JVM class directories and jars
//! - JS module metadata
//! - Native klibs, packed and unpacked

mod tests_jvm;
mod tests_native;
