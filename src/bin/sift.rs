//! Command-line front end: runs a JSON extraction schema over a page and
//! prints one JSON record per line.

use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rs_sift::fetch::Fetcher;
use rs_sift::{paginate, Context, Extract, Options, Page, Record, Schema};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Extract records from an HTML or JSON page with a JSON schema
#[derive(Parser, Debug)]
#[command(name = "rs-sift")]
#[command(version)]
#[command(about = "Extract records from HTML or JSON pages", long_about = None)]
struct Cli {
    /// Path to the JSON extraction schema
    #[arg(short, long, value_name = "SCHEMA")]
    schema: PathBuf,

    /// Page to read; stdin when absent or `-`
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// URL of the page, used to resolve relative links. Fetched when no
    /// input is given and the `http` feature is enabled.
    #[arg(short, long)]
    url: Option<Url>,

    /// Parse the input as JSON instead of HTML
    #[arg(long)]
    json: bool,

    /// Follow next-page links at most this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Drop fields whose value is empty
    #[arg(long)]
    skip_empty: bool,

    /// Pretty-print records
    #[arg(long)]
    pretty: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("rs_sift=warn"),
        1 => EnvFilter::new("rs_sift=info"),
        2 => EnvFilter::new("rs_sift=debug"),
        _ => EnvFilter::new("rs_sift=trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose > 2)
        .init();
}

#[cfg(feature = "http")]
fn fetcher() -> rs_sift::Result<Option<Arc<dyn Fetcher>>> {
    Ok(Some(Arc::new(rs_sift::fetch::HttpFetcher::new()?)))
}

#[cfg(not(feature = "http"))]
#[allow(clippy::unnecessary_wraps)]
fn fetcher() -> rs_sift::Result<Option<Arc<dyn Fetcher>>> {
    Ok(None)
}

fn read_page(cli: &Cli, fetcher: Option<&Arc<dyn Fetcher>>) -> Result<Page, Box<dyn std::error::Error>> {
    let content_type = cli.json.then_some("application/json");
    let from_stdin = cli.input.as_ref().is_none_or(|p| p.as_os_str() == "-");

    let page = match (&cli.url, fetcher) {
        (Some(url), Some(fetcher)) if cli.input.is_none() => {
            tracing::info!("Fetching {}", url);
            return Ok(fetcher.open(url.as_str())?.wait()?.into_page()?);
        }
        _ if from_stdin => {
            let mut body = Vec::new();
            io::stdin().read_to_end(&mut body)?;
            Page::from_bytes(&body, content_type)?
        }
        _ => {
            let path = cli.input.as_deref().unwrap_or_else(|| std::path::Path::new("-"));
            let body = std::fs::read(path)?;
            let is_json = cli.json || path.extension().is_some_and(|ext| ext == "json");
            Page::from_bytes(&body, is_json.then_some("application/json"))?
        }
    };

    Ok(match &cli.url {
        Some(url) => page.with_url(url.clone()),
        None => page,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let schema = Schema::load(&cli.schema).inspect_err(|e| {
        tracing::error!("Failed to load schema {}: {}", cli.schema.display(), e);
    })?;
    let element = schema.compile()?;
    let options = Options {
        max_pages: cli.max_pages,
        keep_empty: !cli.skip_empty,
        pretty: cli.pretty,
    };

    let fetcher = fetcher()?;
    let page = read_page(&cli, fetcher.as_ref())?;

    let records: Vec<Record<'static>> = match fetcher {
        Some(fetcher) => paginate(&element, page, fetcher, &options)?,
        None => {
            let listing = element.extract(&Context::new(&page))?;
            if let Some(next) = listing.next_page {
                tracing::warn!(next = %next, "next page not followed, built without the `http` feature");
            }
            listing.items
        }
    };
    tracing::info!(records = records.len(), "extraction done");

    let mut out = BufWriter::new(io::stdout().lock());
    for record in &records {
        let json = options.render(record);
        if options.pretty {
            serde_json::to_writer_pretty(&mut out, &json)?;
        } else {
            serde_json::to_writer(&mut out, &json)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
