//! Conversion of ES-module syntax into assignment-form exports for a host runtime that has no
//! native module support, plus conditional regions keyed by output variant.
//!
//! Conversion is best-effort text rewriting: input that matches no rule passes through
//! unchanged and nothing here ever fails.

pub mod regions;
pub mod rules;

use indexmap::IndexSet;
use log::{debug, trace};
use std::fmt::Write as _;

pub use regions::apply_regions;
pub use rules::{ExportKind, ExportRecord, RULES, RewriteRule};

pub const DEFAULT_EXPORT_TABLE: &str = "module.exports";

/// Result of [`ModuleFormatTransformer::convert_to_assignment_form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub text: String,
    /// Every export consumed by a declaration rule, in the order recorded.
    pub exports: Vec<ExportRecord>,
}

#[derive(Debug, Clone)]
pub struct ModuleFormatTransformer {
    export_table: String,
}

impl Default for ModuleFormatTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_TABLE)
    }
}

impl ModuleFormatTransformer {
    pub fn new(export_table: impl Into<String>) -> Self {
        Self {
            export_table: export_table.into(),
        }
    }

    pub fn export_table(&self) -> &str {
        &self.export_table
    }

    /// Run every rule over `unit` in order, then append one export-table assignment for each
    /// class or function export.
    ///
    /// Converting already converted text is a no-op: it holds no `export` keywords, so no
    /// records are produced and no assignments are appended a second time.
    pub fn convert_to_assignment_form(&self, unit: &str) -> Conversion {
        let mut exports = Vec::new();
        let mut text = unit.to_owned();

        for rule in RULES.iter() {
            let before = exports.len();
            let rewritten = rule.apply(&text, &mut exports).into_owned();
            if rewritten != text {
                trace!(
                    "Rule {} rewrote {} export(s)",
                    rule.name(),
                    exports.len() - before
                );
            }
            text = rewritten;
        }

        let assignments = self.export_assignments(&exports);
        if !assignments.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&assignments);
        }

        debug!(
            "Converted unit: {} export(s) recorded, {} bound to {}",
            exports.len(),
            exports.iter().filter(|e| e.kind.is_reexported()).count(),
            self.export_table
        );

        Conversion { text, exports }
    }

    /// `<table>.<Name> = <Name>;` per class or function export, first occurrence wins.
    pub fn export_assignments(&self, exports: &[ExportRecord]) -> String {
        let symbols: IndexSet<&str> = exports
            .iter()
            .filter(|record| record.kind.is_reexported())
            .map(|record| record.symbol.as_str())
            .collect();

        let mut assignments = String::new();
        for symbol in symbols {
            let _ = writeln!(assignments, "{}.{symbol} = {symbol};", self.export_table);
        }
        assignments
    }
}
