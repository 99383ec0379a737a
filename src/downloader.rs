use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{CrawlError, Skipped};
use crate::fetcher::Fetcher;
use crate::file_manager::{persist, StorageSink};
use crate::html_parser::HtmlParser;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::url_mapper::{canonicalize, site_root_name, ResolvedUrl};

/// Order in which discovered links and assets are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    /// A link's whole subtree completes before its next sibling; a page's
    /// assets follow all of its links.
    #[default]
    DepthFirst,
    /// Level by level, in discovery order.
    BreadthFirst,
}

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub output_dir: PathBuf,
    pub order: TraversalOrder,
    /// Report page failures and carry on instead of aborting the crawl.
    pub keep_going: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./mirrored_site"),
            order: TraversalOrder::default(),
            keep_going: false,
        }
    }
}

/// A set of absolute URLs already fetched or queued for fetch.
#[derive(Debug, Default)]
pub struct DedupSet {
    urls: HashSet<String>,
}

impl DedupSet {
    /// Marks `url` and returns true if it was not marked before.
    ///
    /// Check and insert are one step, so this stays the only synchronization
    /// point if the set is ever put behind a lock.
    pub fn mark(&mut self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTask {
    Page(Url),
    Asset(Url),
}

/// Outcome of a single traversal step that did not abort the crawl.
#[derive(Debug)]
pub enum Step {
    Completed,
    AlreadySeen,
    Skipped(Skipped),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub seed: String,
    pub site_root: PathBuf,
    pub pages: Vec<String>,
    pub assets: Vec<String>,
    pub skipped: Vec<String>,
}

/// State owned by one crawl: the Site Root, both dedup sets, and pending work.
#[derive(Debug)]
pub struct CrawlSession {
    seed: Url,
    site_root: PathBuf,
    pub visited_pages: DedupSet,
    pub downloaded_assets: DedupSet,
    pending: VecDeque<DownloadTask>,
    report: CrawlReport,
}

impl CrawlSession {
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    pub fn pending(&self) -> impl Iterator<Item = &DownloadTask> {
        self.pending.iter()
    }

    pub fn report(&self) -> &CrawlReport {
        &self.report
    }

    pub fn into_report(self) -> CrawlReport {
        self.report
    }

    /// Queues what a page discovered. URLs already marked are left out here;
    /// the dedup check at dequeue time still decides.
    fn schedule(&mut self, links: Vec<Url>, assets: Vec<Url>, order: TraversalOrder) {
        let links = links
            .into_iter()
            .filter(|url| !self.visited_pages.contains(url))
            .map(DownloadTask::Page);
        let assets = assets
            .into_iter()
            .filter(|url| !self.downloaded_assets.contains(url))
            .map(DownloadTask::Asset);
        let tasks: Vec<_> = links.chain(assets).collect();

        match order {
            TraversalOrder::DepthFirst => {
                for task in tasks.into_iter().rev() {
                    self.pending.push_front(task);
                }
            }
            TraversalOrder::BreadthFirst => self.pending.extend(tasks),
        }
    }

    fn skip(&mut self, skipped: &Skipped, progress: &dyn ProgressSink) {
        let reason = skipped.to_string();
        self.report.skipped.push(reason.clone());
        progress.emit(ProgressEvent::Skipped { reason });
    }
}

pub struct WebsiteMirror<F, S, P> {
    fetcher: F,
    storage: S,
    progress: P,
    options: MirrorOptions,
}

impl<F, S, P> WebsiteMirror<F, S, P>
where
    F: Fetcher,
    S: StorageSink,
    P: ProgressSink,
{
    pub fn new(fetcher: F, storage: S, progress: P, options: MirrorOptions) -> Self {
        Self {
            fetcher,
            storage,
            progress,
            options,
        }
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Crawls everything reachable on the seed's host and returns what was saved.
    pub async fn mirror_website(&self, seed: &str) -> Result<CrawlReport, CrawlError> {
        let mut session = self.start_session(seed)?;
        self.run(&mut session).await?;

        let report = session.into_report();
        self.progress.emit(ProgressEvent::Finished {
            pages: report.pages.len(),
            assets: report.assets.len(),
            skipped: report.skipped.len(),
        });
        Ok(report)
    }

    /// Validates the seed, creates the Site Root and queues the seed page.
    pub fn start_session(&self, seed: &str) -> Result<CrawlSession, CrawlError> {
        let seed = parse_seed(seed)?;
        let root_name = site_root_name(&seed).ok_or_else(|| CrawlError::InvalidSeed {
            seed: seed.to_string(),
            reason: "URL has no host".to_string(),
        })?;

        let site_root = self
            .storage
            .ensure_directory(&self.options.output_dir, &root_name)
            .map_err(|source| CrawlError::SiteRoot {
                path: self.options.output_dir.join(&root_name),
                source,
            })?;

        self.progress.emit(ProgressEvent::Started {
            seed: seed.clone(),
            site_root: site_root.clone(),
        });

        let mut pending = VecDeque::new();
        pending.push_back(DownloadTask::Page(seed.clone()));

        Ok(CrawlSession {
            report: CrawlReport {
                seed: seed.to_string(),
                site_root: site_root.clone(),
                ..CrawlReport::default()
            },
            seed,
            site_root,
            visited_pages: DedupSet::default(),
            downloaded_assets: DedupSet::default(),
            pending,
        })
    }

    /// Works through the queue until it is empty or a page failure aborts the crawl.
    pub async fn run(&self, session: &mut CrawlSession) -> Result<(), CrawlError> {
        while let Some(task) = session.pending.pop_front() {
            match task {
                DownloadTask::Page(url) => match self.fetch_page(session, url).await {
                    Ok(_) => {}
                    Err(err) if self.options.keep_going => {
                        let reason = err.to_string();
                        session.report.skipped.push(reason.clone());
                        self.progress.emit(ProgressEvent::PageFailed { reason });
                    }
                    Err(err) => return Err(err),
                },
                DownloadTask::Asset(url) => {
                    self.download_asset(session, url).await;
                }
            }
        }
        Ok(())
    }

    /// Fetches, saves and scans one page, then queues its links and assets.
    ///
    /// The URL is marked visited before the request goes out, so a page that
    /// fails is never retried within the same crawl.
    pub async fn fetch_page(
        &self,
        session: &mut CrawlSession,
        url: Url,
    ) -> Result<Step, CrawlError> {
        if !session.visited_pages.mark(&url) {
            return Ok(Step::AlreadySeen);
        }

        let html = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|source| CrawlError::Page {
                url: url.clone(),
                source,
            })?;

        let parser = HtmlParser::for_page(url.clone());
        let (resources, stylesheet_failures) =
            parser.extract_with_stylesheets(&html, &self.fetcher).await;
        for skipped in &stylesheet_failures {
            session.skip(skipped, &self.progress);
        }

        let resolved = ResolvedUrl::page(&url);
        let persisted = persist(&self.storage, &session.site_root, &resolved, html.as_bytes())
            .map_err(|source| CrawlError::PageWrite {
                url: url.clone(),
                source,
            })?;
        for skipped in &persisted.warnings {
            session.skip(skipped, &self.progress);
        }

        session.report.pages.push(url.to_string());
        self.progress.emit(ProgressEvent::PageSaved {
            url,
            path: persisted.path,
        });

        let assets = resources.asset_urls().cloned().collect();
        session.schedule(resources.links, assets, self.options.order);
        Ok(Step::Completed)
    }

    /// Fetches and saves one asset. Failures are reported and never abort the crawl.
    pub async fn download_asset(&self, session: &mut CrawlSession, url: Url) -> Step {
        if !session.downloaded_assets.mark(&url) {
            return Step::AlreadySeen;
        }

        let content = match self.fetcher.fetch_bytes(&url).await {
            Ok(content) => content,
            Err(source) => {
                let skipped = Skipped::Asset { url, source };
                session.skip(&skipped, &self.progress);
                return Step::Skipped(skipped);
            }
        };

        let resolved = ResolvedUrl::asset(&url);
        let persisted = match persist(&self.storage, &session.site_root, &resolved, &content) {
            Ok(persisted) => persisted,
            Err(source) => {
                let skipped = Skipped::AssetWrite { url, source };
                session.skip(&skipped, &self.progress);
                return Step::Skipped(skipped);
            }
        };
        for skipped in &persisted.warnings {
            session.skip(skipped, &self.progress);
        }

        session.report.assets.push(url.to_string());
        self.progress.emit(ProgressEvent::AssetSaved {
            url,
            path: persisted.path,
        });
        Step::Completed
    }
}

/// Rejects empty input before anything touches the network.
pub fn parse_seed(seed: &str) -> Result<Url, CrawlError> {
    let seed = seed.trim();
    if seed.is_empty() {
        return Err(CrawlError::EmptySeed);
    }

    let url = Url::parse(seed).map_err(|e| CrawlError::InvalidSeed {
        seed: seed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CrawlError::InvalidSeed {
            seed: seed.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }

    Ok(canonicalize(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::file_manager::FileManager;
    use crate::progress::SilentProgress;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeSite {
        bodies: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), body.to_string());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn lookup(&self, url: &Url) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.bodies.get(url.as_str()).cloned().ok_or(FetchError::Status {
                status: "404 Not Found".to_string(),
            })
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
            self.lookup(url)
        }

        async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            self.lookup(url).map(String::into_bytes)
        }
    }

    fn options(dir: &Path, order: TraversalOrder) -> MirrorOptions {
        MirrorOptions {
            output_dir: dir.to_path_buf(),
            order,
            keep_going: false,
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn tree_site() -> FakeSite {
        FakeSite::default()
            .with(
                "https://a.com/",
                r#"<a href="/one">1</a><a href="/two">2</a><img src="/root.png">"#,
            )
            .with("https://a.com/one", r#"<a href="/one/deep">d</a><img src="/one.png">"#)
            .with("https://a.com/one/deep", "<p>deep</p>")
            .with("https://a.com/two", "<p>two</p>")
            .with("https://a.com/root.png", "R")
            .with("https://a.com/one.png", "O")
    }

    #[test]
    fn test_dedup_set_marks_once() {
        let mut set = DedupSet::default();
        let u = url("https://a.com/x");
        assert!(set.mark(&u));
        assert!(!set.mark(&u));
        assert!(set.contains(&u));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_seed() {
        assert!(matches!(parse_seed(""), Err(CrawlError::EmptySeed)));
        assert!(matches!(parse_seed("   "), Err(CrawlError::EmptySeed)));
        assert!(matches!(parse_seed("example.com"), Err(CrawlError::InvalidSeed { .. })));
        assert!(matches!(parse_seed("ftp://example.com/"), Err(CrawlError::InvalidSeed { .. })));
        assert_eq!(parse_seed(" https://a.com/#x ").unwrap().as_str(), "https://a.com/");
    }

    #[tokio::test]
    async fn test_empty_seed_makes_no_request() {
        let temp_dir = tempdir().unwrap();
        let site = FakeSite::default();
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );

        assert!(matches!(mirror.mirror_website("").await, Err(CrawlError::EmptySeed)));
        assert!(site.requests().is_empty());
    }

    #[tokio::test]
    async fn test_second_fetch_page_is_a_no_op() {
        let temp_dir = tempdir().unwrap();
        let site = FakeSite::default().with("https://a.com/", "<p>hi</p>");
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );
        let mut session = mirror.start_session("https://a.com/").unwrap();
        assert_eq!(session.seed(), &url("https://a.com/"));
        assert_eq!(
            session.pending().collect::<Vec<_>>(),
            vec![&DownloadTask::Page(url("https://a.com/"))]
        );

        let first = mirror.fetch_page(&mut session, url("https://a.com/")).await.unwrap();
        let second = mirror.fetch_page(&mut session, url("https://a.com/")).await.unwrap();

        assert!(matches!(first, Step::Completed));
        assert!(matches!(second, Step::AlreadySeen));
        assert!(session.visited_pages.contains(&url("https://a.com/")));
        assert_eq!(site.requests(), vec!["https://a.com/"]);
    }

    #[tokio::test]
    async fn test_second_download_asset_is_a_no_op_even_after_failure() {
        let temp_dir = tempdir().unwrap();
        let site = FakeSite::default();
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );
        let mut session = mirror.start_session("https://a.com/").unwrap();
        let missing = url("https://a.com/missing.png");

        let first = mirror.download_asset(&mut session, missing.clone()).await;
        let second = mirror.download_asset(&mut session, missing.clone()).await;

        assert!(matches!(first, Step::Skipped(Skipped::Asset { .. })));
        assert!(matches!(second, Step::AlreadySeen));
        assert!(session.downloaded_assets.contains(&missing));
        assert_eq!(site.requests().len(), 1);
        assert_eq!(session.report().skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let temp_dir = tempdir().unwrap();
        let site = tree_site();
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );

        mirror.mirror_website("https://a.com/").await.unwrap();

        assert_eq!(
            site.requests(),
            vec![
                "https://a.com/",
                "https://a.com/one",
                "https://a.com/one/deep",
                "https://a.com/one.png",
                "https://a.com/two",
                "https://a.com/root.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let temp_dir = tempdir().unwrap();
        let site = tree_site();
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::BreadthFirst),
        );

        mirror.mirror_website("https://a.com/").await.unwrap();

        assert_eq!(
            site.requests(),
            vec![
                "https://a.com/",
                "https://a.com/one",
                "https://a.com/two",
                "https://a.com/root.png",
                "https://a.com/one/deep",
                "https://a.com/one.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_page_failure_aborts_unless_keep_going() {
        let site = FakeSite::default()
            .with("https://a.com/", r#"<a href="/gone">x</a><a href="/ok">y</a>"#)
            .with("https://a.com/ok", "<p>ok</p>");

        let temp_dir = tempdir().unwrap();
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );
        let err = mirror.mirror_website("https://a.com/").await.unwrap_err();
        assert!(matches!(err, CrawlError::Page { ref url, .. } if url.path() == "/gone"));
        assert!(!site.requests().contains(&"https://a.com/ok".to_string()));

        let site = FakeSite {
            requests: Mutex::new(Vec::new()),
            bodies: site.bodies.clone(),
        };
        let temp_dir = tempdir().unwrap();
        let mut opts = options(temp_dir.path(), TraversalOrder::DepthFirst);
        opts.keep_going = true;
        let mirror = WebsiteMirror::new(&site, FileManager::new(), SilentProgress, opts);
        assert!(mirror.options().keep_going);

        let report = mirror.mirror_website("https://a.com/").await.unwrap();
        assert_eq!(report.pages, vec!["https://a.com/", "https://a.com/ok"]);
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_already_marked_urls_are_not_queued_again() {
        let temp_dir = tempdir().unwrap();
        let site = FakeSite::default()
            .with(
                "https://a.com/",
                r#"<a href="/">Home</a><a href="/news">News</a>
                   <img src="/logo.png"><img src="/hero.png">"#,
            )
            .with("https://a.com/logo.png", "L");
        let mirror = WebsiteMirror::new(
            &site,
            FileManager::new(),
            SilentProgress,
            options(temp_dir.path(), TraversalOrder::DepthFirst),
        );
        let mut session = mirror.start_session("https://a.com/").unwrap();
        session.pending.clear();

        mirror.download_asset(&mut session, url("https://a.com/logo.png")).await;
        mirror.fetch_page(&mut session, url("https://a.com/")).await.unwrap();

        assert_eq!(
            session.pending().cloned().collect::<Vec<_>>(),
            vec![
                DownloadTask::Page(url("https://a.com/news")),
                DownloadTask::Asset(url("https://a.com/hero.png")),
            ]
        );
    }
}
