//! Language and file-type inference from paths

use serde::{Deserialize, Serialize};

/// Editor language of a project file, inferred from its extension
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Css,
    Scss,
    Html,
    Json,
    Markdown,
    Svg,
    PlainText,
}

impl Language {
    pub fn from_path(path: &str) -> Self {
        match extension(path).as_deref() {
            Some("ts") | Some("tsx") | Some("mts") | Some("cts") => Language::TypeScript,
            Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Language::JavaScript,
            Some("css") => Language::Css,
            Some("scss") | Some("sass") => Language::Scss,
            Some("html") | Some("htm") => Language::Html,
            Some("json") => Language::Json,
            Some("md") | Some("mdx") => Language::Markdown,
            Some("svg") => Language::Svg,
            _ => Language::PlainText,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Css => "css",
            Language::Scss => "scss",
            Language::Html => "html",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::Svg => "svg",
            Language::PlainText => "plaintext",
        }
    }
}

/// Classification stored alongside persisted file records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Page,
    Component,
    Style,
    Script,
    Config,
    Markup,
    Document,
    Asset,
    Other,
}

impl FileType {
    pub fn from_path(path: &str) -> Self {
        let ext = extension(path);
        let is_component = matches!(ext.as_deref(), Some("tsx") | Some("jsx"));

        if is_component && is_page_path(path) {
            return FileType::Page;
        }

        match ext.as_deref() {
            Some("tsx") | Some("jsx") => FileType::Component,
            Some("css") | Some("scss") | Some("sass") => FileType::Style,
            Some("ts") | Some("js") | Some("mjs") | Some("cjs") | Some("mts") | Some("cts") => {
                if is_config_name(path) {
                    FileType::Config
                } else {
                    FileType::Script
                }
            }
            Some("json") | Some("toml") | Some("yaml") | Some("yml") => FileType::Config,
            Some("html") | Some("htm") => FileType::Markup,
            Some("md") | Some("mdx") | Some("txt") => FileType::Document,
            Some("svg") | Some("png") | Some("jpg") | Some("jpeg") | Some("gif") | Some("webp")
            | Some("ico") => FileType::Asset,
            _ => FileType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Page => "page",
            FileType::Component => "component",
            FileType::Style => "style",
            FileType::Script => "script",
            FileType::Config => "config",
            FileType::Markup => "markup",
            FileType::Document => "document",
            FileType::Asset => "asset",
            FileType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "page" => FileType::Page,
            "component" => FileType::Component,
            "style" => FileType::Style,
            "script" => FileType::Script,
            "config" => FileType::Config,
            "markup" => FileType::Markup,
            "document" => FileType::Document,
            "asset" => FileType::Asset,
            _ => FileType::Other,
        }
    }
}

/// Lowercased extension of the last path segment, if any
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Last segment of a slash-separated path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name without its final extension
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

fn is_page_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    let in_pages = segments[..segments.len().saturating_sub(1)]
        .iter()
        .any(|s| matches!(*s, "pages" | "routes"));
    let app_page = segments.contains(&"app") && file_stem(path) == "page";
    in_pages || app_page
}

fn is_config_name(path: &str) -> bool {
    let stem = file_stem(path);
    stem.ends_with(".config") || stem.ends_with("rc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_language_from_extension() {
        assert_eq!(Language::from_path("src/App.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("src/index.JS"), Language::JavaScript);
        assert_eq!(Language::from_path("styles/globals.css"), Language::Css);
        assert_eq!(Language::from_path("README"), Language::PlainText);
        assert_eq!(Language::from_path(".gitignore"), Language::PlainText);
    }

    #[test]
    fn classifies_pages_and_components() {
        assert_eq!(FileType::from_path("src/pages/About.tsx"), FileType::Page);
        assert_eq!(FileType::from_path("app/pricing/page.tsx"), FileType::Page);
        assert_eq!(FileType::from_path("src/components/Nav.tsx"), FileType::Component);
        assert_eq!(FileType::from_path("tailwind.config.js"), FileType::Config);
        assert_eq!(FileType::from_path("src/lib/utils.ts"), FileType::Script);
    }
}
