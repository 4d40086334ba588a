//! Canonical renderer: [`Module`] to deterministic `.api` text.
//!
//! One file per compiled unit, named `<unit>.api`. Inside a file:
//!
//! ```text
//! package demo {
//!     public final class demo.Foo : demo.Base {
//!         public final val size: kotlin.Int { get; }
//!         public constructor()
//!         public final fun bar(x: kotlin.Int): kotlin.Unit
//!         public final companion object demo.Foo.Companion {
//!         }
//!     }
//! }
//!
//! ```
//!
//! Packages are sorted by name. Declarations in a package or class are
//! sorted by `(kind, name, parameter signature, return type, line)` with
//! properties first, then constructors, functions and classes.

mod error;

pub use error::RenderError;

use crate::base::constants::API_FILE_EXTENSION;
use crate::model::{
    Class, ClassKind, ClassModifiers, Declaration, DeclarationKind, Function, FunctionModifiers,
    Module, Package, Parameter, Property, PropertyModifiers, TypeParameter, Variance,
};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const INDENT: &str = "    ";
const ROOT_PACKAGE: &str = "<root>";
const PUBLISHED_API: &str = "@PublishedApi ";

/// Rendered files of one module, keyed by relative file name.
pub type RenderedFiles = BTreeMap<String, String>;

/// Render every unit of `module`. A unit with no public declaration
/// still produces its (empty) file.
pub fn render(module: &Module) -> RenderedFiles {
    let mut files = RenderedFiles::new();
    for unit in module.units() {
        files.insert(file_name(&unit), render_unit(module, &unit));
    }
    debug!(module = %module.name, files = files.len(), "rendered module");
    files
}

/// Render the packages of one unit, or an empty string when none has
/// declarations.
pub fn render_unit(module: &Module, unit: &str) -> String {
    let mut packages: Vec<&Package> = module
        .packages
        .iter()
        .filter(|p| p.unit == unit && !p.declarations.is_empty())
        .collect();
    packages.sort_by(|a, b| a.name.cmp(&b.name));

    let mut ctx = RenderContext::new();
    for package in packages {
        ctx.render_package(package);
    }
    ctx.output
}

/// `<unit>.api`, with path separators and `:` replaced.
pub fn file_name(unit: &str) -> String {
    let stem: String = unit
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{stem}.{API_FILE_EXTENSION}")
}

/// Replace the contents of `dir` with `files`.
///
/// Anything already in `dir` is removed first so no stale file survives.
pub fn write_output(dir: &Path, files: &RenderedFiles) -> Result<(), RenderError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;
    for (name, text) in files {
        let path = dir.join(name);
        fs::write(&path, text).map_err(|e| RenderError::io(&path, e))?;
    }
    info!(dir = %dir.display(), files = files.len(), "wrote API files");
    Ok(())
}

// ============================================================================
// CONTEXT
// ============================================================================

/// A rendered declaration with its sort key.
struct Rendered {
    kind: DeclarationKind,
    name: String,
    signature: String,
    return_type: String,
    lines: Vec<String>,
}

impl Rendered {
    fn key(&self) -> (DeclarationKind, &str, &str, &str, &[String]) {
        (
            self.kind,
            &self.name,
            &self.signature,
            &self.return_type,
            &self.lines,
        )
    }
}

struct RenderContext {
    output: String,
    indent_level: usize,
}

impl RenderContext {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
        }
    }

    fn write_line(&mut self, text: &str) {
        let _ = writeln!(self.output, "{}{}", INDENT.repeat(self.indent_level), text);
    }

    fn write_blank_line(&mut self) {
        let _ = writeln!(self.output);
    }

    fn render_package(&mut self, package: &Package) {
        let name = if package.is_root() {
            ROOT_PACKAGE
        } else {
            package.name.as_str()
        };
        self.write_line(&format!("package {name} {{"));
        self.indent_level += 1;
        for rendered in sorted(&package.declarations) {
            for line in &rendered.lines {
                self.write_line(line);
            }
        }
        self.indent_level -= 1;
        self.write_line("}");
        self.write_blank_line();
    }
}

fn sorted(declarations: &[Declaration]) -> Vec<Rendered> {
    let mut rendered: Vec<Rendered> = declarations.iter().map(render_declaration).collect();
    rendered.sort_by(|a, b| a.key().cmp(&b.key()));
    rendered
}

/// Lines are relative to the declaration's own indentation.
fn render_declaration(declaration: &Declaration) -> Rendered {
    match declaration {
        Declaration::Class(class) => Rendered {
            kind: DeclarationKind::Class,
            name: class.qualified_name.clone(),
            signature: String::new(),
            return_type: String::new(),
            lines: class_lines(class),
        },
        Declaration::Function(function) => Rendered {
            kind: declaration.kind(),
            name: function.name.to_string(),
            signature: function.parameter_signature(),
            return_type: function.return_type.clone().unwrap_or_default(),
            lines: vec![function_line(function)],
        },
        Declaration::Property(property) => Rendered {
            kind: DeclarationKind::Property,
            name: property.name.to_string(),
            signature: property.receiver.clone().unwrap_or_default(),
            return_type: property.ty.clone(),
            lines: vec![property_line(property)],
        },
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

fn class_lines(class: &Class) -> Vec<String> {
    let mut header = String::new();
    if class.published {
        header.push_str(PUBLISHED_API);
    }
    header.push_str(class.visibility.keyword());
    header.push(' ');

    if class.kind == ClassKind::EnumEntry {
        let _ = write!(header, "{} {}", class.kind.keyword(), class.qualified_name);
        return vec![header];
    }

    header.push_str(class.modality.keyword());
    header.push(' ');
    for (flag, keyword) in CLASS_MODIFIERS {
        if class.modifiers.contains(*flag) {
            header.push_str(keyword);
            header.push(' ');
        }
    }
    let _ = write!(
        header,
        "{} {}{}",
        class.kind.keyword(),
        class.qualified_name,
        type_parameters(&class.type_parameters)
    );
    if !class.supertypes.is_empty() {
        let _ = write!(header, " : {}", class.supertypes.join(", "));
    }
    header.push_str(" {");

    let mut lines = vec![header];
    for rendered in sorted(&class.members) {
        lines.extend(rendered.lines.iter().map(|line| format!("{INDENT}{line}")));
    }
    lines.push("}".to_string());
    lines
}

fn function_line(function: &Function) -> String {
    let mut line = String::new();
    if function.published {
        line.push_str(PUBLISHED_API);
    }
    line.push_str(function.visibility.keyword());
    line.push(' ');

    if function.is_constructor() {
        let _ = write!(line, "constructor({})", parameters(&function.parameters));
        return line;
    }

    line.push_str(function.modality.keyword());
    line.push(' ');
    for (flag, keyword) in FUNCTION_MODIFIERS {
        if function.modifiers.contains(*flag) {
            line.push_str(keyword);
            line.push(' ');
        }
    }
    line.push_str("fun ");
    if !function.type_parameters.is_empty() {
        line.push_str(&type_parameters(&function.type_parameters));
        line.push(' ');
    }
    if let Some(receiver) = &function.receiver {
        line.push_str(receiver);
        line.push('.');
    }
    let _ = write!(
        line,
        "{}({}): {}",
        function.name,
        parameters(&function.parameters),
        function.return_type.as_deref().unwrap_or_default()
    );
    line
}

fn property_line(property: &Property) -> String {
    let mut line = String::new();
    if property.published {
        line.push_str(PUBLISHED_API);
    }
    let _ = write!(
        line,
        "{} {} ",
        property.visibility.keyword(),
        property.modality.keyword()
    );
    for (flag, keyword) in PROPERTY_MODIFIERS {
        if property.modifiers.contains(*flag) {
            line.push_str(keyword);
            line.push(' ');
        }
    }
    line.push_str(property.mutability.keyword());
    line.push(' ');
    if !property.type_parameters.is_empty() {
        line.push_str(&type_parameters(&property.type_parameters));
        line.push(' ');
    }
    if let Some(receiver) = &property.receiver {
        line.push_str(receiver);
        line.push('.');
    }
    let _ = write!(line, "{}: {}", property.name, property.ty);

    let accessors = property.accessors;
    if accessors.any() {
        line.push_str(" { ");
        for (present, marker) in [
            (accessors.field, "field; "),
            (accessors.getter, "get; "),
            (accessors.setter, "set; "),
        ] {
            if present {
                line.push_str(marker);
            }
        }
        line.push('}');
    }
    line
}

const CLASS_MODIFIERS: &[(ClassModifiers, &str)] = &[
    (ClassModifiers::STATIC, "static"),
    (ClassModifiers::EXTERNAL, "external"),
    (ClassModifiers::EXPECT, "expect"),
    (ClassModifiers::INNER, "inner"),
    (ClassModifiers::DATA, "data"),
    (ClassModifiers::VALUE, "value"),
    (ClassModifiers::FUN, "fun"),
];

const FUNCTION_MODIFIERS: &[(FunctionModifiers, &str)] = &[
    (FunctionModifiers::STATIC, "static"),
    (FunctionModifiers::SYNTHETIC, "synthetic"),
    (FunctionModifiers::EXTERNAL, "external"),
    (FunctionModifiers::EXPECT, "expect"),
    (FunctionModifiers::INLINE, "inline"),
    (FunctionModifiers::TAILREC, "tailrec"),
    (FunctionModifiers::SUSPEND, "suspend"),
    (FunctionModifiers::OPERATOR, "operator"),
    (FunctionModifiers::INFIX, "infix"),
];

const PROPERTY_MODIFIERS: &[(PropertyModifiers, &str)] = &[
    (PropertyModifiers::STATIC, "static"),
    (PropertyModifiers::CONST, "const"),
    (PropertyModifiers::LATEINIT, "lateinit"),
    (PropertyModifiers::EXTERNAL, "external"),
    (PropertyModifiers::EXPECT, "expect"),
];

// ============================================================================
// PARTS
// ============================================================================

/// `<reified in T : A & B, R>`, or nothing.
fn type_parameters(parameters: &[TypeParameter]) -> String {
    if parameters.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = parameters
        .iter()
        .map(|p| {
            let mut s = String::new();
            if p.reified {
                s.push_str("reified ");
            }
            match p.variance {
                Variance::In => s.push_str("in "),
                Variance::Out => s.push_str("out "),
                Variance::Invariant => {}
            }
            s.push_str(&p.name);
            if !p.upper_bounds.is_empty() {
                let _ = write!(s, " : {}", p.upper_bounds.join(" & "));
            }
            s
        })
        .collect();
    format!("<{}>", rendered.join(", "))
}

fn parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(parameter)
        .collect::<Vec<_>>()
        .join(", ")
}

fn parameter(parameter: &Parameter) -> String {
    let mut s = String::new();
    if parameter.vararg {
        s.push_str("vararg ");
    }
    if parameter.crossinline {
        s.push_str("crossinline ");
    }
    if parameter.noinline {
        s.push_str("noinline ");
    }
    match &parameter.name {
        Some(name) => {
            let _ = write!(s, "{name}: {}", parameter.ty);
        }
        None => s.push_str(&parameter.ty),
    }
    if parameter.has_default {
        s.push_str(" = ...");
    }
    s
}
