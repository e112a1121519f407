//! Self-contained HTML document shell for the sandboxed preview frame

use super::compiler::PreviewOptions;

pub const PLACEHOLDER_MESSAGE: &str = "Preview loading...";

const TAILWIND_CONFIG: &str = r#"tailwind.config = {
  darkMode: 'class',
  theme: {
    extend: {
      colors: {
        background: '#09090b',
        foreground: '#fafafa',
        card: '#18181b',
        muted: '#27272a',
        'muted-foreground': '#a1a1aa',
        border: '#27272a',
        primary: { DEFAULT: '#8b5cf6', foreground: '#fafafa' },
        accent: { DEFAULT: '#22d3ee', foreground: '#09090b' },
      },
    },
  },
};"#;

const BASE_STYLES: &str = r#"*, *::before, *::after { box-sizing: border-box; }
html, body { margin: 0; padding: 0; min-height: 100%; }
body { background: #09090b; color: #fafafa; font-family: ui-sans-serif, system-ui, -apple-system, 'Segoe UI', sans-serif; -webkit-font-smoothing: antialiased; }"#;

/// Wrap a markup fragment in a complete document
pub fn render_document(fragment: &str, css: &str, options: &PreviewOptions) -> String {
    let mut html = String::with_capacity(fragment.len() + css.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\" class=\"dark\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>");
    html.push_str(&escape(&options.title));
    html.push_str("</title>\n");
    html.push_str("<script src=\"");
    html.push_str(&escape(&options.tailwind_cdn));
    html.push_str("\"></script>\n<script>\n");
    html.push_str(TAILWIND_CONFIG);
    html.push_str("\n</script>\n<style>\n");
    html.push_str(BASE_STYLES);
    if !css.trim().is_empty() {
        html.push('\n');
        html.push_str(&inline_css(css));
    }
    html.push_str("\n</style>\n</head>\n<body class=\"bg-background text-foreground\">\n");
    html.push_str(fragment);
    html.push_str("\n</body>\n</html>\n");
    html
}

/// Minimal valid document shown while nothing renderable exists yet
pub fn placeholder_document(options: &PreviewOptions) -> String {
    let fragment = format!(
        "<div class=\"flex min-h-screen items-center justify-center\"><p class=\"text-muted-foreground animate-pulse\">{}</p></div>",
        PLACEHOLDER_MESSAGE
    );
    render_document(&fragment, "", options)
}

/// Stylesheet text that is safe to embed inside `<style>`.
///
/// Tailwind directives only mean something to a build step, and a literal
/// `</style` would end the element early.
fn inline_css(css: &str) -> String {
    css.lines()
        .filter(|line| !line.trim_start().starts_with("@tailwind"))
        .collect::<Vec<_>>()
        .join("\n")
        .replace("</style", "<\\/style")
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
