//! The ordered rewrite rules of the assignment-form conversion.
//!
//! Every rule is a single pattern substitution over the whole unit. Order matters: the
//! default-identifier rule and the export-list rule are permissive and must only see text the
//! declaration rules before them left untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

use crate::util::is_reserved_word;

/// A JavaScript identifier, restricted to ASCII.
const IDENT: &str = r"[A-Za-z_$][\w$]*";

/// Declaration keyword of an exported binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    Class,
    Function,
    Var,
    Const,
    Let,
}

impl ExportKind {
    /// Whether an export of this kind is bound onto the runtime export table.
    ///
    /// Only classes and functions are; var/const/let exports are collected but left
    /// unassigned.
    pub const fn is_reexported(self) -> bool {
        matches!(self, Self::Class | Self::Function)
    }

    const fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Var => "var",
            Self::Const => "const",
            Self::Let => "let",
        }
    }
}

/// A symbol exported by the unit being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub symbol: String,
    pub kind: ExportKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewrite {
    /// `export [default] <keyword> <Name>` to `<keyword> <Name>`, recording the export.
    Declaration(ExportKind),
    /// `export default <Name>` to `<Name>`.
    DefaultIdentifier,
    /// `export { A, B };` to `A, B;`.
    ExportList,
    /// `import { A, B } from "path";` to `const { A, B } = require("path");`.
    NamedImport,
}

/// One named pattern substitution of the conversion.
#[derive(Debug)]
pub struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    rewrite: Rewrite,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, rewrite: Rewrite) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("Invalid regex pattern for rewrite rule"),
            rewrite,
        }
    }

    fn declaration(name: &'static str, prefix: &str, kind: ExportKind) -> Self {
        let pattern = format!(r"\bexport\s+{prefix}({}\s+({IDENT}))", kind.keyword());
        Self::new(name, &pattern, Rewrite::Declaration(kind))
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Apply this rule to every match in `text`, appending any exports it consumes.
    pub fn apply<'t>(&self, text: &'t str, exports: &mut Vec<ExportRecord>) -> Cow<'t, str> {
        match self.rewrite {
            Rewrite::Declaration(kind) => {
                self.pattern.replace_all(text, |caps: &Captures<'_>| {
                    exports.push(ExportRecord {
                        symbol: caps[2].to_owned(),
                        kind,
                    });
                    caps[1].to_owned()
                })
            }
            Rewrite::DefaultIdentifier => {
                self.pattern.replace_all(text, |caps: &Captures<'_>| {
                    if is_reserved_word(&caps[1]) {
                        caps[0].to_owned()
                    } else {
                        caps[1].to_owned()
                    }
                })
            }
            Rewrite::ExportList => self
                .pattern
                .replace_all(text, |caps: &Captures<'_>| format!("{};", caps[1].trim())),
            Rewrite::NamedImport => self.pattern.replace_all(text, |caps: &Captures<'_>| {
                format!(
                    "const {{ {} }} = require({quote}{path}{quote});",
                    destructure_bindings(&caps[1]),
                    quote = &caps[2],
                    path = &caps[3],
                )
            }),
        }
    }
}

/// `A, B as C` to `A, B: C`.
fn destructure_bindings(specifiers: &str) -> String {
    specifiers
        .split(',')
        .map(str::trim)
        .filter(|specifier| !specifier.is_empty())
        .map(|specifier| match specifier.split_once(" as ") {
            Some((imported, local)) => format!("{}: {}", imported.trim(), local.trim()),
            None => specifier.to_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// All rules, in the order they must be applied.
pub static RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::declaration("export-default-class", r"default\s+", ExportKind::Class),
        RewriteRule::declaration("export-class", "", ExportKind::Class),
        RewriteRule::declaration("export-var", "", ExportKind::Var),
        RewriteRule::declaration("export-const", "", ExportKind::Const),
        RewriteRule::declaration("export-let", "", ExportKind::Let),
        RewriteRule::new(
            "export-default-identifier",
            &format!(r"\bexport\s+default\s+({IDENT})"),
            Rewrite::DefaultIdentifier,
        ),
        RewriteRule::declaration("export-function", "", ExportKind::Function),
        RewriteRule::new(
            "export-list",
            r"\bexport\s*\{([^}]*)\}\s*;",
            Rewrite::ExportList,
        ),
        RewriteRule::new(
            "named-import",
            r#"\bimport\s*\{([^}]*)\}\s*from\s*(["'])([^"'\n]*)["']\s*;"#,
            Rewrite::NamedImport,
        ),
    ]
});
