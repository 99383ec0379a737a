use regex::Regex;
use std::collections::HashSet;
use url::Url;

use crate::url_mapper::{canonicalize, same_host};

const URL_TOKEN: &str = r#"(?i)url\(\s*["']?(.*?)["']?\s*\)"#;

/// Collects every in-scope asset referenced through `url(...)` in `css_text`.
///
/// `base_url` is the page the stylesheet belongs to and only decides scope.
/// `css_url` is where the stylesheet itself lives; relative references are
/// resolved against its directory. Malformed tokens are skipped, never fatal.
pub fn extract_css_urls(css_text: &str, base_url: &Url, css_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    if let Ok(regex) = Regex::new(URL_TOKEN) {
        for cap in regex.captures_iter(css_text) {
            let Some(raw) = cap.get(1) else { continue };
            let Some(resolved) = resolve_reference(raw.as_str(), base_url, css_url) else {
                continue;
            };

            if same_host(&resolved, base_url) && seen.insert(resolved.as_str().to_string()) {
                urls.push(resolved);
            }
        }
    }

    urls
}

fn resolve_reference(raw: &str, base_url: &Url, css_url: &Url) -> Option<Url> {
    let reference: String = raw.trim().chars().filter(|c| *c != '"' && *c != '\'').collect();

    // Fragment-only references point into the same document (SVG filters, markers).
    if reference.is_empty() || reference.starts_with('#') || has_prefix(&reference, "data:") {
        return None;
    }

    let is_absolute = has_prefix(&reference, "http");
    if is_absolute && !Url::parse(&reference).is_ok_and(|u| same_host(&u, base_url)) {
        return None;
    }

    let reference = reference.split('?').next().unwrap_or_default();

    if is_absolute {
        return Url::parse(reference).ok().map(canonicalize);
    }

    if reference.starts_with("//") {
        let with_scheme = format!("{}:{}", css_url.scheme(), reference);
        return Url::parse(&with_scheme).ok().map(canonicalize);
    }

    let css_path = css_url.path();
    let css_dir = &css_path[..css_path.rfind('/').unwrap_or(0)];

    let final_path = if reference.starts_with('/') {
        reference.to_string()
    } else if reference.starts_with("../") {
        let mut dir = css_dir;
        let mut rest = reference;
        while let Some(stripped) = rest.strip_prefix("../") {
            dir = &dir[..dir.rfind('/').unwrap_or(0)];
            rest = stripped;
        }
        format!("{}/{}", dir, rest)
    } else if let Some(rest) = reference.strip_prefix("./") {
        format!("{}/{}", css_dir, rest)
    } else {
        format!("{}/{}", css_dir, reference)
    };

    base_url.join(&final_path).ok().map(canonicalize)
}

fn has_prefix(reference: &str, prefix: &str) -> bool {
    reference
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
