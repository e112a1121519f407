//! Rewrite component markup into static HTML
//!
//! A single forward scan over the markup: tags are re-emitted with HTML
//! attribute names, handlers and runtime expressions are dropped, and
//! self-closing shorthand is expanded. Anything the scanner cannot make sense
//! of (an unterminated tag at the end of a half-streamed file, say) is dropped
//! rather than emitted broken.

use std::sync::OnceLock;

use regex::{Captures, Regex};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Attributes that only mean something to the component runtime
const RUNTIME_ATTRIBUTES: &[&str] = &["key", "ref", "dangerouslySetInnerHTML"];

fn jsx_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\s*/\*[\s\S]*?\*/\s*\}").expect("valid comment regex"))
}

fn newline_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\r]*\n\s*").expect("valid whitespace regex"))
}

fn space_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\r\f]{2,}").expect("valid whitespace regex"))
}

/// Full markup pipeline: comments, tags and attributes, interpolations,
/// then whitespace.
pub fn transform_markup(markup: &str) -> String {
    let without_comments = jsx_comment().replace_all(markup, "");
    let html = Scanner::new(&without_comments).run();
    collapse_whitespace(&html)
}

/// JSX whitespace rules: runs containing a newline vanish next to tags and
/// become a single space between text; other runs shrink to one space.
pub fn collapse_whitespace(html: &str) -> String {
    let joined = newline_run().replace_all(html, |caps: &Captures| {
        let m = caps.get(0).map(|m| (m.start(), m.end()));
        let Some((start, end)) = m else {
            return String::new();
        };
        let before = html[..start].chars().next_back();
        let after = html[end..].chars().next();
        match (before, after) {
            (None, _) | (_, None) | (Some('>'), _) | (_, Some('<')) => String::new(),
            _ => " ".to_string(),
        }
    });
    space_run().replace_all(&joined, " ").trim().to_string()
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    out: String,
}

#[derive(Debug)]
struct Attribute {
    name: String,
    value: AttrValue,
}

#[derive(Debug)]
enum AttrValue {
    None,
    Quoted(String),
    Expression(String),
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            out: String::with_capacity(src.len()),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    fn run(mut self) -> String {
        while let Some(b) = self.peek() {
            match b {
                b'<' if self.starts_tag() => {
                    if !self.tag() {
                        // unterminated tag: drop the remainder
                        break;
                    }
                }
                b'<' => {
                    self.out.push_str("&lt;");
                    self.pos += 1;
                }
                b'{' => match self.braced() {
                    Some(expr) => {
                        if let Some(text) = string_literal(expr) {
                            self.out.push_str(&escape_text(&text));
                        }
                    }
                    None => break,
                },
                _ => self.copy_text(),
            }
        }
        self.out
    }

    fn starts_tag(&self) -> bool {
        matches!(
            self.peek_at(1),
            Some(b'/') | Some(b'>') | Some(b'a'..=b'z') | Some(b'A'..=b'Z')
        )
    }

    /// Copy plain text up to the next `<` or `{`
    fn copy_text(&mut self) {
        let rest = &self.src[self.pos..];
        let end = rest.find(['<', '{']).unwrap_or(rest.len());
        self.out.push_str(&rest[..end]);
        self.pos += end;
    }

    /// Scan a `{...}` expression starting at the current `{`; returns its
    /// inner text, or `None` when it never closes.
    fn braced(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let end = matching_brace(self.src, start)?;
        self.pos = end + 1;
        Some(&self.src[start + 1..end])
    }

    /// Handle one tag at the current `<`. Returns false if it never closes.
    fn tag(&mut self) -> bool {
        self.pos += 1;
        let closing = self.peek() == Some(b'/');
        if closing {
            self.pos += 1;
        }

        let name = self.take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':'));
        let mut attributes = Vec::new();
        let self_closing;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return false,
                Some(b'>') => {
                    self.pos += 1;
                    self_closing = false;
                    break;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    self_closing = true;
                    break;
                }
                Some(b'{') => {
                    // spread props: `{...rest}`
                    if self.braced().is_none() {
                        return false;
                    }
                }
                Some(_) => match self.attribute() {
                    Some(Some(attr)) => attributes.push(attr),
                    Some(None) => {}
                    None => return false,
                },
            }
        }

        self.emit_tag(&name, closing, self_closing, &attributes);
        true
    }

    /// `Some(None)` skips a stray byte; `None` means the input ran out.
    fn attribute(&mut self) -> Option<Option<Attribute>> {
        let name = self.take_while(|b| {
            !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'{' | b'"' | b'\'')
        });
        if name.is_empty() {
            self.pos += 1;
            return Some(None);
        }

        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Some(Some(Attribute {
                name,
                value: AttrValue::None,
            }));
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek()? {
            quote @ (b'"' | b'\'') => {
                let start = self.pos + 1;
                let len = self.src[start..].find(quote as char)?;
                self.pos = start + len + 1;
                AttrValue::Quoted(self.src[start..start + len].to_string())
            }
            b'{' => AttrValue::Expression(self.braced()?.to_string()),
            _ => {
                let raw = self.take_while(|b| !b.is_ascii_whitespace() && b != b'>');
                AttrValue::Quoted(raw)
            }
        };

        Some(Some(Attribute { name, value }))
    }

    fn emit_tag(&mut self, name: &str, closing: bool, self_closing: bool, attributes: &[Attribute]) {
        // fragments and scripts are dropped; their children stay
        if name.is_empty() || name.eq_ignore_ascii_case("script") {
            return;
        }

        let component = is_component_tag(name);
        let tag = if component {
            "div".to_string()
        } else {
            name.to_ascii_lowercase()
        };

        if closing {
            self.out.push_str("</");
            self.out.push_str(&tag);
            self.out.push('>');
            return;
        }

        self.out.push('<');
        self.out.push_str(&tag);
        if component {
            self.out.push_str(" data-component=\"");
            self.out.push_str(&escape_attr(name));
            self.out.push('"');
        }
        for attr in attributes {
            if let Some(rendered) = render_attribute(attr) {
                self.out.push(' ');
                self.out.push_str(&rendered);
            }
        }
        self.out.push('>');

        if self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            self.out.push_str("</");
            self.out.push_str(&tag);
            self.out.push('>');
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
        self.src[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

fn render_attribute(attr: &Attribute) -> Option<String> {
    if is_event_handler(&attr.name) || RUNTIME_ATTRIBUTES.contains(&attr.name.as_str()) {
        return None;
    }

    let name = html_attribute_name(&attr.name);
    match &attr.value {
        AttrValue::None => Some(name.to_string()),
        AttrValue::Quoted(value) => Some(format!("{}=\"{}\"", name, escape_attr(value))),
        AttrValue::Expression(expr) => {
            let literal = string_literal(expr)?;
            Some(format!("{}=\"{}\"", name, escape_attr(&literal)))
        }
    }
}

/// `onClick`, `onSubmit`, ... (`on` followed by an uppercase letter)
pub fn is_event_handler(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 2 && name.starts_with("on") && bytes[2].is_ascii_uppercase()
}

pub fn html_attribute_name(name: &str) -> &str {
    match name {
        "className" => "class",
        "htmlFor" => "for",
        "tabIndex" => "tabindex",
        "readOnly" => "readonly",
        "autoComplete" => "autocomplete",
        "autoFocus" => "autofocus",
        "srcSet" => "srcset",
        "viewBox" => "viewBox",
        "strokeWidth" => "stroke-width",
        "strokeLinecap" => "stroke-linecap",
        "strokeLinejoin" => "stroke-linejoin",
        "fillRule" => "fill-rule",
        "clipRule" => "clip-rule",
        other => other,
    }
}

fn is_component_tag(name: &str) -> bool {
    name.contains('.') || name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Literal content of `"..."`, `'...'` or an interpolation-free template
fn string_literal(expr: &str) -> Option<String> {
    let expr = expr.trim();
    let mut chars = expr.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if first != last || !matches!(first, '"' | '\'' | '`') {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    if first == '`' && inner.contains("${") {
        return None;
    }
    Some(inner.to_string())
}

/// Index of the `}` matching the `{` at `open`, skipping string literals
fn matching_brace(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
