use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { seed: Url, site_root: PathBuf },
    PageSaved { url: Url, path: PathBuf },
    AssetSaved { url: Url, path: PathBuf },
    Skipped { reason: String },
    PageFailed { reason: String },
    Finished { pages: usize, assets: usize, skipped: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Started { seed, .. } => write!(f, "Starting download for: {}", seed),
            ProgressEvent::PageSaved { url, .. } => write!(f, "Downloaded page: {}", url),
            ProgressEvent::AssetSaved { url, .. } => write!(f, "Downloaded asset: {}", url),
            ProgressEvent::Skipped { reason } | ProgressEvent::PageFailed { reason } => {
                write!(f, "{}", reason)
            }
            ProgressEvent::Finished { .. } => write!(f, "Download complete!"),
        }
    }
}

/// Fire-and-forget log of what the crawl is doing.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<'a, T: ProgressSink + ?Sized> ProgressSink for &'a T {
    fn emit(&self, event: ProgressEvent) {
        (**self).emit(event)
    }
}

/// Drops every event.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Terminal output: colored log lines above a spinner that shows the current URL.
///
/// Lines go to the writer whether or not the spinner is drawn, so nothing is
/// lost when output is redirected.
pub struct ConsoleProgress {
    spinner: ProgressBar,
    out: Mutex<Box<dyn Write + Send>>,
    quiet: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        Self::with_writer(spinner, Box::new(io::stdout()), quiet)
    }

    pub fn with_writer(spinner: ProgressBar, out: Box<dyn Write + Send>, quiet: bool) -> Self {
        Self {
            spinner,
            out: Mutex::new(out),
            quiet,
        }
    }

    fn write_line(&self, text: &str) {
        let write = || {
            if let Ok(mut out) = self.out.lock() {
                let _ = writeln!(out, "{}", text);
            }
        };
        if self.spinner.is_hidden() {
            write();
        } else {
            self.spinner.suspend(write);
        }
    }

    fn detail(&self, text: &str) {
        if !self.quiet {
            self.write_line(text);
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Started { seed, site_root } => {
                self.write_line(&format!(
                    "🚀 Starting website mirroring for: {}",
                    seed.as_str().blue()
                ));
                self.write_line(&format!("📁 Site folder: {:?}", site_root));
            }
            ProgressEvent::PageSaved { url, path } => {
                self.spinner.set_message(format!("Downloading: {}", url));
                self.detail(&format!("{} {} → {:?}", "📄".green(), event, path));
            }
            ProgressEvent::AssetSaved { url, path } => {
                self.spinner.set_message(format!("Downloading: {}", url));
                self.detail(&format!("{} {} → {:?}", "📦".green(), event, path));
            }
            ProgressEvent::Skipped { reason } => {
                self.detail(&format!("⚠️  {}", reason.yellow()));
            }
            ProgressEvent::PageFailed { reason } => {
                self.write_line(&format!("❌ {}", reason.red()));
            }
            ProgressEvent::Finished { pages, assets, skipped } => {
                self.spinner.finish_with_message("✅ All downloads completed!");
                self.write_line(&format!(
                    "📊 Pages: {}, assets: {}, skipped: {}",
                    pages, assets, skipped
                ));
            }
        }
    }
}
