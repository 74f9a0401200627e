//! Conditional regions bracketed by marker comments:
//!
//! ```text
//! //#if runtime
//! // const os = require("os");
//! //#endif
//! ```
//!
//! A region whose condition holds for the variant being emitted has its body uncommented; any
//! other region has its body commented out. Marker lines are always kept verbatim, so the same
//! source can be fed through every variant. `//#if !runtime` negates the condition.

use once_cell::sync::Lazy;
use regex::Regex;

static OPEN_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*//[ \t]*#if[ \t]+(!?)[ \t]*([A-Za-z][\w-]*)[ \t]*$")
        .expect("Invalid regex pattern for region opening marker")
});

static CLOSE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*//[ \t]*#endif[ \t]*$")
        .expect("Invalid regex pattern for region closing marker")
});

const COMMENT: &str = "//";

struct OpenRegion<'a> {
    active: bool,
    marker: &'a str,
    body: Vec<&'a str>,
}

impl OpenRegion<'_> {
    fn write_verbatim(&self, out: &mut String) {
        out.push_str(self.marker);
        for line in &self.body {
            out.push_str(line);
        }
    }
}

/// Resolve every region in `text` for the variant whose flag is `flag`.
///
/// Regions do not nest: an opening marker inside an open region leaves the open region
/// untouched and starts a new one. A region that is never closed is left untouched.
pub fn apply_regions(text: &str, flag: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Option<OpenRegion<'_>> = None;

    for line in text.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);

        if let Some(caps) = OPEN_MARKER.captures(content) {
            if let Some(abandoned) = open.take() {
                abandoned.write_verbatim(&mut out);
            }
            let negated = !caps[1].is_empty();
            open = Some(OpenRegion {
                active: (&caps[2] == flag) != negated,
                marker: line,
                body: Vec::new(),
            });
            continue;
        }

        match open.as_mut() {
            Some(region) if CLOSE_MARKER.is_match(content) => {
                out.push_str(region.marker);
                for body_line in &region.body {
                    if region.active {
                        out.push_str(&uncomment(body_line));
                    } else {
                        out.push_str(&comment_out(body_line));
                    }
                }
                out.push_str(line);
                open = None;
            }
            Some(region) => region.body.push(line),
            None => out.push_str(line),
        }
    }

    if let Some(unterminated) = open {
        unterminated.write_verbatim(&mut out);
    }

    out
}

fn split_indent(line: &str) -> (&str, &str) {
    let rest = line.trim_start_matches([' ', '\t']);
    line.split_at(line.len() - rest.len())
}

/// `    // foo();` to `    foo();`. Lines without a leading comment are returned as-is.
fn uncomment(line: &str) -> String {
    let (indent, rest) = split_indent(line);
    match rest.strip_prefix(COMMENT) {
        Some(code) => {
            let code = code.strip_prefix(' ').unwrap_or(code);
            format!("{indent}{code}")
        }
        None => line.to_owned(),
    }
}

/// `    foo();` to `    // foo();`. Blank and already commented lines are returned as-is.
fn comment_out(line: &str) -> String {
    let (indent, rest) = split_indent(line);
    if rest.trim().is_empty() || rest.starts_with(COMMENT) {
        line.to_owned()
    } else {
        format!("{indent}{COMMENT} {rest}")
    }
}
