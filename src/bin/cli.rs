use anyhow::Result;
use colored::*;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use mdna::{
    core::MdnaConfig,
    edgar::SecFilingProvider,
    query::{CalendarPeriod, MdnaQuery, Strategy},
    utils::{cache::ResponseCache, dirs, http::Fetcher},
    MdnaExtractor,
};
use std::{fs, path::PathBuf, time::Duration};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mdna-cli",
    about = "Extract Management's Discussion and Analysis from SEC 10-K/10-Q filings"
)]
struct Opt {
    /// Ticker symbol or numeric CIK
    symbol: String,

    /// Calendar year the filing was filed in
    #[structopt(short, long)]
    year: Option<i32>,

    /// Calendar quarter (Q1..Q4)
    #[structopt(short, long)]
    period: Option<CalendarPeriod>,

    /// Extraction strategy: trafilatura or inscriptis
    #[structopt(short, long, default_value = "trafilatura")]
    strategy: Strategy,

    #[structopt(short, long, default_value = "120")]
    wrap_length: usize,

    /// Keep markdown tables in the output
    #[structopt(long)]
    include_tables: bool,

    /// Bypass the HTTP response cache
    #[structopt(long)]
    no_cache: bool,

    /// Return the filing HTML without processing it
    #[structopt(long)]
    raw_html: bool,

    /// Print the whole document record as JSON
    #[structopt(long)]
    json: bool,

    /// Drop every cached response before fetching
    #[structopt(long)]
    prune_cache: bool,

    /// Also save the content under the data directory
    #[structopt(long)]
    save: bool,

    /// Write the output to this file instead of stdout
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

impl Opt {
    fn query(&self) -> MdnaQuery {
        let mut query = MdnaQuery::new(self.symbol.trim())
            .with_period(self.year, self.period)
            .with_strategy(self.strategy)
            .with_tables(self.include_tables);
        query.wrap_length = self.wrap_length;
        query.use_cache = !self.no_cache;
        query.raw_html = self.raw_html;
        query
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let opt = Opt::from_args();
    let config = MdnaConfig::from_env()?;
    dirs::ensure_data_dirs(&config)?;

    let cache = ResponseCache::open(&config.cache_dir(), config.cache_ttl)?;
    if opt.prune_cache {
        let dropped = cache.len();
        cache.clear()?;
        eprintln!("{} {} cached responses", "Pruned".yellow(), dropped);
    }

    let fetcher = Fetcher::new(&config, Some(cache))?;
    let extractor = MdnaExtractor::new(SecFilingProvider::new(fetcher.clone()), fetcher);
    let query = opt.query();

    let pb = spinner(format!("Extracting MD&A for {}", query.symbol.to_uppercase()))?;
    let result = extractor.extract(&query).await;
    pb.finish_and_clear();

    let document = match result {
        Ok(document) => document,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    eprintln!("{} {}", "Extracted".green().bold(), document);
    eprintln!("{}", document.url.dimmed());

    if opt.save {
        let path = document.save(&config.edgar_dir())?;
        eprintln!("{} {}", "Saved".green(), path.display());
    }

    let rendered = if opt.json {
        serde_json::to_string_pretty(&document)?
    } else {
        document.content
    };
    match opt.output {
        Some(path) => fs::write(&path, rendered)?,
        None => println!("{}", rendered),
    }
    Ok(())
}
