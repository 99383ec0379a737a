use anyhow::{Context, Result};
use select::document::Document;
use select::predicate::{Attr, Name, Predicate};
use std::collections::HashSet;
use url::Url;

use crate::css_parser::extract_css_urls;
use crate::error::Skipped;
use crate::fetcher::Fetcher;
use crate::url_mapper::{canonicalize, same_host};

/// Where an asset reference was found. Only affects traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Markup,
    InlineStyle,
    Stylesheet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub url: Url,
    pub origin: AssetOrigin,
}

/// Everything in scope that one page points at, in discovery order.
#[derive(Debug, Default)]
pub struct PageResources {
    pub assets: Vec<AssetRef>,
    pub links: Vec<Url>,
    pub stylesheets: Vec<Url>,
    seen_assets: HashSet<String>,
    seen_links: HashSet<String>,
}

impl PageResources {
    fn add_asset(&mut self, url: Url, origin: AssetOrigin) {
        if self.seen_assets.insert(url.as_str().to_string()) {
            self.assets.push(AssetRef { url, origin });
        }
    }

    fn add_link(&mut self, url: Url) {
        if self.seen_links.insert(url.as_str().to_string()) {
            self.links.push(url);
        }
    }

    pub fn asset_urls(&self) -> impl Iterator<Item = &Url> {
        self.assets.iter().map(|asset| &asset.url)
    }
}

#[derive(Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Failed to parse base URL: {}", base_url))?;

        Ok(Self::for_page(base_url))
    }

    pub fn for_page(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Pulls same-host assets, links, and stylesheet URLs out of the markup.
    ///
    /// Linked stylesheets are listed in `stylesheets` but not fetched here;
    /// see [`HtmlParser::extract_with_stylesheets`].
    pub fn extract_resources(&self, html_content: &str) -> PageResources {
        let document = Document::from(html_content);
        let mut resources = PageResources::default();

        // img[src], link[href], script[src]
        for element in document.find(Name("img").or(Name("link")).or(Name("script"))) {
            let reference = match element.name() {
                Some("link") => element.attr("href"),
                _ => element.attr("src"),
            };
            if let Some(url) = reference.and_then(|r| self.resolve_in_scope(r)) {
                resources.add_asset(url, AssetOrigin::Markup);
            }
        }

        for anchor in document.find(Name("a")) {
            let Some(href) = anchor.attr("href") else { continue };
            if href.starts_with('#') {
                continue;
            }
            if let Some(url) = self.resolve_in_scope(href) {
                resources.add_link(url);
            }
        }

        for element in document.find(Attr("style", ())) {
            if let Some(style) = element.attr("style") {
                for url in extract_css_urls(style, &self.base_url, &self.base_url) {
                    resources.add_asset(url, AssetOrigin::InlineStyle);
                }
            }
        }

        for link in document.find(Name("link")) {
            let is_stylesheet = link.attr("rel").is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("stylesheet"))
            });
            if !is_stylesheet {
                continue;
            }
            if let Some(url) = link.attr("href").and_then(|href| self.resolve_in_scope(href)) {
                resources.add_asset(url.clone(), AssetOrigin::Markup);
                if !resources.stylesheets.contains(&url) {
                    resources.stylesheets.push(url);
                }
            }
        }

        resources
    }

    /// [`HtmlParser::extract_resources`] plus the assets referenced from inside
    /// each linked stylesheet.
    ///
    /// Every stylesheet is fetched here as text even though the crawl will fetch
    /// it again as an asset to save it. A stylesheet that cannot be read is
    /// returned as a [`Skipped`] and the page keeps what was found so far.
    pub async fn extract_with_stylesheets<F: Fetcher + ?Sized>(
        &self,
        html_content: &str,
        fetcher: &F,
    ) -> (PageResources, Vec<Skipped>) {
        let mut resources = self.extract_resources(html_content);
        let mut skipped = Vec::new();

        for css_url in resources.stylesheets.clone() {
            match fetcher.fetch_text(&css_url).await {
                Ok(css) => {
                    for url in extract_css_urls(&css, &self.base_url, &css_url) {
                        resources.add_asset(url, AssetOrigin::Stylesheet);
                    }
                }
                Err(source) => skipped.push(Skipped::Stylesheet { url: css_url, source }),
            }
        }

        (resources, skipped)
    }

    fn resolve_in_scope(&self, reference: &str) -> Option<Url> {
        let url = self.resolve_url(reference.trim())?;
        same_host(&url, &self.base_url).then_some(url)
    }

    fn resolve_url(&self, reference: &str) -> Option<Url> {
        if reference.is_empty() {
            return None;
        }
        self.base_url.join(reference).ok().map(canonicalize)
    }
}
