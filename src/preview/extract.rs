//! Locate the markup a component returns
//!
//! This is pattern matching, not parsing: it looks for the usual return shapes
//! and reports `Unmatched` when none yields markup, which callers render as a
//! placeholder.

use std::sync::OnceLock;

use regex::Regex;

/// Result of looking for a component's returned markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Matched(String),
    Unmatched,
}

impl Extraction {
    pub fn is_matched(&self) -> bool {
        matches!(self, Extraction::Matched(_))
    }

    pub fn into_markup(self) -> Option<String> {
        match self {
            Extraction::Matched(markup) => Some(markup),
            Extraction::Unmatched => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    /// `(` at the given offset opens the expression
    Paren(usize),
    /// `<` at the given offset starts bare markup
    Bare(usize),
}

fn return_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\breturn\s*\(").expect("valid return regex"))
}

fn return_bare() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\breturn\s+<").expect("valid return regex"))
}

fn arrow_paren() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=>\s*\(").expect("valid arrow regex"))
}

fn arrow_bare() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=>\s*<").expect("valid arrow regex"))
}

fn bare_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r">\s*(;|\n\s*\})").expect("valid terminator regex"))
}

/// Find the markup returned by the default export, falling back to the first
/// component-looking return anywhere in the source.
pub fn extract_markup(source: &str) -> Extraction {
    if let Some(start) = source.find("export default") {
        if let Some(markup) = find_markup(&source[start..]) {
            return Extraction::Matched(markup);
        }
    }

    match find_markup(source) {
        Some(markup) => Extraction::Matched(markup),
        None => Extraction::Unmatched,
    }
}

fn find_markup(src: &str) -> Option<String> {
    // Explicit returns win over arrow bodies, which are just as likely to be
    // `.map(item => (...))` callbacks inside the markup.
    let mut returns: Vec<Shape> = return_paren()
        .find_iter(src)
        .map(|m| Shape::Paren(m.end() - 1))
        .chain(return_bare().find_iter(src).map(|m| Shape::Bare(m.end() - 1)))
        .collect();
    returns.sort_by_key(shape_offset);

    let mut arrows: Vec<Shape> = arrow_paren()
        .find_iter(src)
        .map(|m| Shape::Paren(m.end() - 1))
        .chain(arrow_bare().find_iter(src).map(|m| Shape::Bare(m.end() - 1)))
        .collect();
    arrows.sort_by_key(shape_offset);

    returns
        .into_iter()
        .chain(arrows)
        .find_map(|shape| markup_at(src, shape))
}

fn shape_offset(shape: &Shape) -> usize {
    match shape {
        Shape::Paren(offset) | Shape::Bare(offset) => *offset,
    }
}

fn markup_at(src: &str, shape: Shape) -> Option<String> {
    let candidate = match shape {
        Shape::Paren(open) => balanced_parens(src, open)?,
        Shape::Bare(start) => {
            let rest = &src[start..];
            let end = bare_end().find(rest)?.start() + 1;
            &rest[..end]
        }
    };

    let candidate = candidate.trim();
    if candidate.starts_with('<') {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// Contents between the `(` at `open` and its matching `)`.
///
/// Returns `None` when the expression is still unterminated, as it is while
/// a file is mid-stream.
fn balanced_parens(src: &str, open: usize) -> Option<&str> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&src[open + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}
