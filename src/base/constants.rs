//! Domain constants shared across extractors, renderer and comparator.

/// Extension of a rendered API file.
pub const API_FILE_EXTENSION: &str = "api";

/// Default name of the API directory inside a project or build directory.
pub const DEFAULT_API_DIR: &str = "api";

// ============================================================================
// JVM
// ============================================================================

/// Extension of a compiled JVM class.
pub const CLASS_FILE_EXTENSION: &str = "class";

/// Extension of a JVM archive.
pub const JAR_FILE_EXTENSION: &str = "jar";

/// Archive directory that never contains API classes.
pub const META_INF_DIR: &str = "META-INF/";

/// Internal name of the Kotlin metadata annotation.
pub const KOTLIN_METADATA_ANNOTATION: &str = "kotlin/Metadata";

/// Internal name of the published-API escape annotation.
pub const PUBLISHED_API_ANNOTATION: &str = "kotlin/PublishedApi";

/// Suffix of synthetic classes holding `when` dispatch tables.
pub const WHEN_MAPPINGS_SUFFIX: &str = "$WhenMappings";

/// Suffix of synthetic classes holding default interface method bodies.
pub const DEFAULT_IMPLS_SUFFIX: &str = "$DefaultImpls";

/// Prefix of synthetic accessor methods generated for private access.
pub const ACCESS_METHOD_PREFIX: &str = "access$";

/// Suffix of synthetic methods carrying property annotations.
pub const ANNOTATIONS_METHOD_SUFFIX: &str = "$annotations";

/// Name of the JVM constructor method.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of the JVM static initializer.
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

// ============================================================================
// DESCRIPTOR METADATA (JS / NATIVE)
// ============================================================================

/// Fully qualified name of the published-API escape annotation.
pub const PUBLISHED_API_FQ_NAME: &str = "kotlin.PublishedApi";

/// Name of the builtins module every JS module implicitly depends on.
pub const JS_BUILTINS_MODULE: &str = "kotlin";

/// Extension of a JS output file that may carry module metadata.
pub const JS_FILE_EXTENSION: &str = "js";

/// Extension of a native library archive.
pub const KLIB_FILE_EXTENSION: &str = "klib";

/// Extension of a serialized package fragment inside a klib.
pub const KNM_FILE_EXTENSION: &str = "knm";

/// Prefix of package fragment directories inside `linkdata`.
pub const KLIB_PACKAGE_DIR_PREFIX: &str = "package_";

/// Members every class inherits from `Any`.
pub const ANY_MEMBER_NAMES: &[&str] = &["equals", "hashCode", "toString"];
