#![forbid(unsafe_code)]

//! Downloads every movie listed in the portal's catalog into the output
//! directory, one folder per movie. Runs without arguments; everything is
//! read from the environment or `.env`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mediathek_mirror::catalog::CatalogDiscoverer;
use mediathek_mirror::config::{ConfigOverrides, MirrorConfig, resolve_config};
use mediathek_mirror::fetcher::YtDlpFetcher;
use mediathek_mirror::http::{HttpClient, UreqClient};
use mediathek_mirror::orchestrator::{BatchReport, DownloadOrchestrator};
use mediathek_mirror::persistence::PersistenceWriter;
use mediathek_mirror::resolver::ItemResolver;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Mirror a movie catalog to local storage")]
struct Args {
    /// Alternative `.env` file.
    #[arg(long)]
    env_file: Option<PathBuf>,
    #[arg(long)]
    output_directory: Option<PathBuf>,
    #[arg(long)]
    max_workers: Option<usize>,
}

impl Args {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            output_directory: self.output_directory,
            max_workers: self.max_workers,
            env_path: self.env_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    let config = resolve_config(Args::parse().overrides())?;

    let fetcher = YtDlpFetcher::new(&config.yt_dlp_path, config.quiet_mode);
    fetcher.ensure_available()?;
    fs::create_dir_all(&config.output_directory)
        .with_context(|| format!("creating {}", config.output_directory.display()))?;

    let client: Arc<dyn HttpClient> = Arc::new(UreqClient::new(config.http_timeout));
    let discoverer = CatalogDiscoverer::new(
        client.clone(),
        config.catalog_url.clone(),
        config.site_origin.clone(),
    );
    let entries = tokio::task::spawn_blocking(move || discoverer.discover())
        .await
        .context("catalog discovery task")?
        .with_context(|| format!("fetching catalog {}", config.catalog_url))?;

    print_banner(&config, entries.len());

    let orchestrator = DownloadOrchestrator::new(
        ItemResolver::new(client.clone(), config.platform_api_base.clone()),
        PersistenceWriter::new(
            Arc::new(fetcher),
            client,
            config.save_json,
            config.download_cover,
        ),
        config.output_directory.clone(),
        config.skip_existing,
        config.max_workers,
    );
    let report = orchestrator.run(entries).await;

    print_summary(&config, &report);
    Ok(())
}

fn print_banner(config: &MirrorConfig, found: usize) {
    println!("===================================");
    println!("Catalog Mirror");
    println!("===================================");
    println!("Catalog: {}", config.catalog_url);
    println!("Output directory: {}", config.output_directory.display());
    println!(
        "Found {} movies. Starting download with {} parallel workers...",
        found, config.max_workers
    );
    println!();
}

fn print_summary(config: &MirrorConfig, report: &BatchReport) {
    println!();
    println!("===================================");
    println!("Mirror run complete!");
    println!("===================================");
    println!("Downloaded: {}", report.succeeded());
    println!("Skipped:    {}", report.skipped());
    println!("Failed:     {}", report.failed());
    for (entry, err) in report.failures() {
        println!("  - {entry}: {err}");
    }
    println!("Files: {}", config.output_directory.display());
}
