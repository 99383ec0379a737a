pub mod cli;
pub mod css_parser;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod progress;
pub mod url_mapper;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use css_parser::extract_css_urls;
pub use downloader::{
    CrawlReport, CrawlSession, DedupSet, DownloadTask, MirrorOptions, Step, TraversalOrder,
    WebsiteMirror,
};
pub use error::{CrawlError, FetchError, Skipped};
pub use fetcher::{Fetcher, HttpFetcher};
pub use file_manager::{FileManager, StorageSink};
pub use html_parser::{AssetOrigin, AssetRef, HtmlParser, PageResources};
pub use progress::{ConsoleProgress, ProgressEvent, ProgressSink, SilentProgress};
pub use url_mapper::{canonical_path, file_name, same_host, ResolvedUrl};
