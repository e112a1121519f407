//! Route-aware selection of the file to preview

use crate::store::language::{extension, file_stem};
use crate::store::ProjectFile;

const PAGE_DIRS: &[&str] = &["pages", "routes", "app"];
const ROOT_NAMES: &[&str] = &["index", "home", "page"];

/// Pick the component that renders `route`.
///
/// Preference: a page-directory file whose routed path equals the route, then
/// a page-directory file named after the last segment, then any component
/// named after it, then the generic entry (`App`, `index`/`main`), then the
/// first component file.
pub fn select_entry<'a>(files: &'a [ProjectFile], route: &str) -> Option<&'a ProjectFile> {
    let components: Vec<&ProjectFile> = files.iter().filter(|f| is_component_file(&f.path)).collect();
    if components.is_empty() {
        return None;
    }

    let segments = route_segments(route);
    let best = components
        .iter()
        .map(|f| (route_score(&f.path, &segments), *f))
        .filter(|(score, _)| *score > 0)
        .max_by(|(a, fa), (b, fb)| a.cmp(b).then_with(|| fb.path.cmp(&fa.path)));
    if let Some((_, file)) = best {
        return Some(file);
    }

    fallback_entry(&components)
}

pub fn is_component_file(path: &str) -> bool {
    matches!(extension(path).as_deref(), Some("tsx") | Some("jsx"))
}

/// Lowercased, separator-free route segments; dynamic segments are dropped
pub fn route_segments(route: &str) -> Vec<String> {
    route
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with(':') && !s.starts_with('['))
        .map(normalize_name)
        .collect()
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Route a page-directory file would serve, if it lives under one
fn routed_segments(path: &str) -> Option<Vec<String>> {
    let parts: Vec<&str> = path.split('/').collect();
    let dir_index = parts[..parts.len().saturating_sub(1)]
        .iter()
        .position(|p| PAGE_DIRS.contains(p))?;

    let mut routed: Vec<String> = parts[dir_index + 1..parts.len() - 1]
        .iter()
        .filter(|p| !(p.starts_with('(') && p.ends_with(')')))
        .map(|p| normalize_name(p))
        .collect();

    let stem = normalize_name(file_stem(path));
    if !ROOT_NAMES.contains(&stem.as_str()) {
        routed.push(stem);
    }
    Some(routed)
}

fn route_score(path: &str, segments: &[String]) -> u8 {
    let stem = normalize_name(file_stem(path));

    if let Some(routed) = routed_segments(path) {
        if routed == segments {
            return 4;
        }
        if segments.is_empty() && routed.len() == 1 && routed[0] == "home" {
            return 3;
        }
        if let Some(last) = segments.last() {
            if stem == *last || stem == format!("{}page", last) {
                return 2;
            }
        }
        return 0;
    }

    match segments.last() {
        Some(last) if stem == format!("{}page", last) || stem == *last => 1,
        _ => 0,
    }
}

fn fallback_entry<'a>(components: &[&'a ProjectFile]) -> Option<&'a ProjectFile> {
    let by_stem = |names: &[&str]| {
        components
            .iter()
            .find(|f| names.contains(&normalize_name(file_stem(&f.path)).as_str()))
            .copied()
    };

    by_stem(&["app"])
        .or_else(|| by_stem(&["index", "main", "home"]))
        .or_else(|| components.first().copied())
}
