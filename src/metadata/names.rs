//! Resolution of string and class-name indices.
//!
//! Descriptor messages never carry names inline. They refer to a string
//! table by index, and to class names either through the same table (JVM)
//! or through a qualified-name table of `(parent, short name, kind)`
//! triples (JS and klib fragments).

use super::MetadataError;
use super::proto::{QualifiedNameKind, QualifiedNameProto, StringOperation, StringTableTypes};
use rustc_hash::FxHashSet;

/// A class reference split into package and nested path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassName {
    /// Dotted package name, empty for the root package
    pub package: String,
    /// Dotted nesting path inside the package (`Outer.Inner`)
    pub relative: String,
    /// Declared inside a function body
    pub local: bool,
}

impl ClassName {
    /// Parse the `pkg/path/Outer.Inner` form used by the JVM string table.
    /// A leading `.` marks a local class.
    pub fn from_internal(internal: &str) -> Self {
        let (local, internal) = match internal.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, internal),
        };
        let (package, relative) = match internal.rfind('/') {
            Some(slash) => (internal[..slash].replace('/', "."), &internal[slash + 1..]),
            None => (String::new(), internal),
        };
        Self {
            package,
            relative: relative.to_string(),
            local,
        }
    }

    /// Fully qualified dotted name.
    pub fn fq_name(&self) -> String {
        if self.package.is_empty() {
            self.relative.clone()
        } else {
            format!("{}.{}", self.package, self.relative)
        }
    }

    /// Last segment of the nesting path.
    pub fn short_name(&self) -> &str {
        self.relative.rsplit('.').next().unwrap_or(&self.relative)
    }
}

/// Index lookups shared by every metadata dialect.
pub trait NameResolver {
    fn string(&self, index: i32) -> Result<String, MetadataError>;
    fn class_name(&self, index: i32) -> Result<ClassName, MetadataError>;
}

fn lookup<'a, T>(table: &'a [T], name: &'static str, index: i32) -> Result<&'a T, MetadataError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .ok_or(MetadataError::invalid_index(name, index))
}

// ============================================================================
// JVM
// ============================================================================

/// Strings the compiler may reference by predefined index instead of
/// storing them in `d2`.
pub const PREDEFINED_STRINGS: &[&str] = &[
    "kotlin/Any",
    "kotlin/Nothing",
    "kotlin/Unit",
    "kotlin/Throwable",
    "kotlin/Number",
    "kotlin/Byte",
    "kotlin/Double",
    "kotlin/Float",
    "kotlin/Int",
    "kotlin/Long",
    "kotlin/Short",
    "kotlin/Boolean",
    "kotlin/Char",
    "kotlin/CharSequence",
    "kotlin/String",
    "kotlin/Comparable",
    "kotlin/Enum",
    "kotlin/Array",
    "kotlin/ByteArray",
    "kotlin/DoubleArray",
    "kotlin/FloatArray",
    "kotlin/IntArray",
    "kotlin/LongArray",
    "kotlin/ShortArray",
    "kotlin/BooleanArray",
    "kotlin/CharArray",
    "kotlin/Cloneable",
    "kotlin/Annotation",
    "kotlin/collections/Iterable",
    "kotlin/collections/MutableIterable",
    "kotlin/collections/Collection",
    "kotlin/collections/MutableCollection",
    "kotlin/collections/List",
    "kotlin/collections/MutableList",
    "kotlin/collections/Set",
    "kotlin/collections/MutableSet",
    "kotlin/collections/Map",
    "kotlin/collections/MutableMap",
    "kotlin/collections/Map.Entry",
    "kotlin/collections/MutableMap.MutableEntry",
    "kotlin/collections/Iterator",
    "kotlin/collections/MutableIterator",
    "kotlin/collections/ListIterator",
    "kotlin/collections/MutableListIterator",
];

/// Resolver over a JVM `StringTableTypes` record list and the `d2` array.
#[derive(Debug, Clone)]
pub struct JvmNameResolver {
    strings: Vec<String>,
    /// Record index per string, after expanding ranges
    records: Vec<usize>,
    types: StringTableTypes,
    local_names: FxHashSet<i32>,
}

impl JvmNameResolver {
    pub fn new(types: StringTableTypes, strings: Vec<String>) -> Self {
        let mut records = Vec::with_capacity(strings.len());
        for (index, record) in types.records.iter().enumerate() {
            for _ in 0..record.range.max(0) {
                records.push(index);
            }
        }
        let local_names = types.local_names.iter().copied().collect();
        Self {
            strings,
            records,
            types,
            local_names,
        }
    }

    pub fn is_local_class_name(&self, index: i32) -> bool {
        self.local_names.contains(&index)
    }
}

impl NameResolver for JvmNameResolver {
    fn string(&self, index: i32) -> Result<String, MetadataError> {
        let record = usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get(i))
            .and_then(|r| self.types.records.get(*r));

        let Some(record) = record else {
            return lookup(&self.strings, "string", index).cloned();
        };

        let mut string = if let Some(string) = &record.string {
            string.clone()
        } else if let Some(predefined) = record
            .predefined_index
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| PREDEFINED_STRINGS.get(i))
        {
            (*predefined).to_string()
        } else {
            lookup(&self.strings, "string", index)?.clone()
        };

        if let [begin, end, ..] = record.substring_index[..] {
            let chars: Vec<char> = string.chars().collect();
            if 0 <= begin && begin <= end && (end as usize) <= chars.len() {
                string = chars[begin as usize..end as usize].iter().collect();
            }
        }

        if let [from, to, ..] = record.replace_char[..] {
            if let (Some(from), Some(to)) = (
                char::from_u32(from as u32),
                char::from_u32(to as u32),
            ) {
                string = string.replace(from, &to.to_string());
            }
        }

        match record.operation {
            StringOperation::None => {}
            StringOperation::InternalToClassId => string = string.replace('$', "."),
            StringOperation::DescToClassId => {
                let chars: Vec<char> = string.chars().collect();
                if chars.len() >= 2 {
                    string = chars[1..chars.len() - 1].iter().collect();
                }
                string = string.replace('$', ".");
            }
        }

        Ok(string)
    }

    fn class_name(&self, index: i32) -> Result<ClassName, MetadataError> {
        let mut name = ClassName::from_internal(&self.string(index)?);
        name.local |= self.is_local_class_name(index);
        Ok(name)
    }
}

// ============================================================================
// FRAGMENTS (JS, klib)
// ============================================================================

/// Resolver over a fragment's string table and qualified-name table.
#[derive(Debug, Clone, Default)]
pub struct FragmentNameResolver {
    strings: Vec<String>,
    qualified_names: Vec<QualifiedNameProto>,
}

impl FragmentNameResolver {
    pub fn new(strings: Vec<String>, qualified_names: Vec<QualifiedNameProto>) -> Self {
        Self {
            strings,
            qualified_names,
        }
    }
}

impl NameResolver for FragmentNameResolver {
    fn string(&self, index: i32) -> Result<String, MetadataError> {
        lookup(&self.strings, "string", index).cloned()
    }

    fn class_name(&self, index: i32) -> Result<ClassName, MetadataError> {
        let mut package = Vec::new();
        let mut relative = Vec::new();
        let mut local = false;

        let mut current = index;
        // Bounded by the table size so a cyclic table cannot loop forever.
        for _ in 0..=self.qualified_names.len() {
            if current == -1 {
                break;
            }
            let entry = lookup(&self.qualified_names, "qualified name", current)?;
            let short = self.string(entry.short_name)?;
            match entry.kind {
                QualifiedNameKind::Class => relative.push(short),
                QualifiedNameKind::Local => {
                    relative.push(short);
                    local = true;
                }
                QualifiedNameKind::Package => package.push(short),
            }
            current = entry.parent;
        }
        if current != -1 {
            return Err(MetadataError::invalid_index("qualified name", index));
        }

        package.reverse();
        relative.reverse();
        Ok(ClassName {
            package: package.join("."),
            relative: relative.join("."),
            local,
        })
    }
}
