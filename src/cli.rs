use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::downloader::{MirrorOptions, TraversalOrder};

#[derive(Parser, Debug)]
#[command(
    name = "site-mirror",
    about = "A CLI utility to mirror one website host to a local folder",
    version,
    long_about = "Starts at a seed page, follows every same-host link, and downloads each page \
                  plus the images, scripts, stylesheets and stylesheet-referenced files it uses. \
                  The site's URL paths are reproduced as a directory tree under a folder named \
                  after the host."
)]
pub struct MirrorCommand {
    /// The URL of the page to start from
    #[arg(required = true)]
    pub url: String,

    /// Directory in which the site folder is created
    #[arg(short, long, default_value = "./mirrored_site")]
    pub output_dir: PathBuf,

    /// Order in which discovered pages and assets are visited
    #[arg(long, value_enum, default_value_t = OrderArg::DepthFirst)]
    pub order: OrderArg,

    /// Report pages that fail to download and continue instead of aborting
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// User agent string to use for requests
    #[arg(long, default_value = "SiteMirror/1.0")]
    pub user_agent: String,

    /// Timeout for requests in seconds (0 = wait forever)
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Write a JSON summary of the crawl to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Only print the final summary and failures
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderArg {
    DepthFirst,
    BreadthFirst,
}

impl From<OrderArg> for TraversalOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::DepthFirst => TraversalOrder::DepthFirst,
            OrderArg::BreadthFirst => TraversalOrder::BreadthFirst,
        }
    }
}

impl MirrorCommand {
    pub fn options(&self) -> MirrorOptions {
        MirrorOptions {
            output_dir: self.output_dir.clone(),
            order: self.order.into(),
            keep_going: self.keep_going,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}
