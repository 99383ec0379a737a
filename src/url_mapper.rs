use url::Url;

/// File name used when a URL path has no last segment (`/`, `/docs/`).
pub const INDEX_NAME: &str = "index";

/// Extension forced onto every saved page.
pub const PAGE_EXTENSION: &str = "html";

/// Drops the fragment so `page.html#top` and `page.html` share one dedup entry.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

/// Maps the URL path to a relative, slash-separated local path.
///
/// Leading slashes are stripped and every character that is not allowed in a
/// file name (`/ : * ? " < > |`) becomes a directory separator.
pub fn canonical_path(url: &Url) -> String {
    url.path()
        .trim_start_matches('/')
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '/',
            c => c,
        })
        .collect()
}

/// Last segment of [`canonical_path`], or [`INDEX_NAME`] when it is empty.
///
/// With `default_ext` set, the extension is appended unless the name already
/// ends with it, so `/about` becomes `about.html` while `/about.html` is kept.
pub fn file_name(url: &Url, default_ext: Option<&str>) -> String {
    let path = canonical_path(url);
    let last = path.rsplit('/').next().unwrap_or_default();
    let mut name = if last.is_empty() {
        INDEX_NAME.to_string()
    } else {
        last.to_string()
    };

    if let Some(ext) = default_ext {
        let suffix = format!(".{}", ext);
        if !name.ends_with(&suffix) {
            name.push_str(&suffix);
        }
    }

    name
}

/// True when both URLs point at the same host. Scheme, port and path are ignored.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Directory name of the Site Root for a seed URL.
pub fn site_root_name(seed: &Url) -> Option<String> {
    let host = seed.host_str()?;
    Some(match seed.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host.to_string(),
    })
}

/// An absolute URL together with the place it is stored under the Site Root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: Url,
    pub directories: Vec<String>,
    pub file_name: String,
}

impl ResolvedUrl {
    /// Pages always end in `.html`.
    pub fn page(url: &Url) -> Self {
        Self::resolve(url, Some(PAGE_EXTENSION))
    }

    /// Assets keep their last path segment verbatim.
    pub fn asset(url: &Url) -> Self {
        Self::resolve(url, None)
    }

    fn resolve(url: &Url, default_ext: Option<&str>) -> Self {
        let path = canonical_path(url);
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();

        Self {
            url: url.clone(),
            directories: segments
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            file_name: file_name(url, default_ext),
        }
    }

    /// Slash-joined path relative to the Site Root.
    pub fn local_path(&self) -> String {
        let mut parts: Vec<&str> = self.directories.iter().map(String::as_str).collect();
        parts.push(&self.file_name);
        parts.join("/")
    }
}
