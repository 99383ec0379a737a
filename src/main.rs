use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;

use site_mirror::{ConsoleProgress, FileManager, HttpFetcher, MirrorCommand, WebsiteMirror};

#[tokio::main]
async fn main() -> Result<()> {
    let args = MirrorCommand::parse();

    let fetcher = HttpFetcher::new(&args.user_agent, args.request_timeout())?;
    let mirror = WebsiteMirror::new(
        fetcher,
        FileManager::new(),
        ConsoleProgress::new(args.quiet),
        args.options(),
    );

    let report = match mirror.mirror_website(&args.url).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".red(), e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("📝 Report written to {:?}", path);
    }

    println!("✅ Website mirroring completed successfully!");
    Ok(())
}
