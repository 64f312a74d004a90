//! token-pricer CLI: quote, sheet, verify, config.

use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use token_pricer::chain::{format_address, parse_address, parse_block, Address, CallCache};
use token_pricer::config::ChainConfigFile;
use token_pricer::sheet::hash_path_for;
use token_pricer::{
    sheet_hash, verify_sheet_hash, PriceCache, PriceSheet, Registry, ReportData, Resolver,
    RpcConfig, RpcReader, Settings,
};
use token_pricer_report::render_report;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    match cli.command {
        Command::Quote(args) => run_quote(args),
        Command::Sheet(args) => run_sheet(args),
        Command::Verify(args) => run_verify(args),
        Command::Config(args) => run_config(args),
    }
}

#[derive(Parser)]
#[command(name = "token-pricer")]
#[command(author = "gorusys <goru.connector@outlook.com>")]
#[command(about = "USD prices for ERC-20 tokens from an ordered cascade of on-chain oracles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the USD price of one token.
    Quote(QuoteArgs),
    /// Price a token list at one block and write sheet, hash and HTML report.
    Sheet(SheetArgs),
    /// Verify a price sheet against its .sha256 file.
    Verify(VerifyArgs),
    /// Print the effective network config as JSON.
    Config(ConfigArgs),
}

/// Overrides layered over the settings file.
#[derive(Args)]
struct ChainArgs {
    #[arg(long)]
    network: Option<String>,
    #[arg(long)]
    rpc_url: Option<String>,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Serve calls from the cache only.
    #[arg(long)]
    offline: bool,
    #[arg(long)]
    max_age_blocks: Option<u64>,
}

impl ChainArgs {
    fn settings(&self) -> Settings {
        let mut settings = Settings::load();
        if let Some(n) = &self.network {
            settings.network = n.to_lowercase();
        }
        if let Some(url) = &self.rpc_url {
            settings.rpc_url = Some(url.clone());
        }
        if let Some(dir) = &self.cache_dir {
            settings.cache_dir = dir.clone();
        }
        if let Some(age) = self.max_age_blocks {
            settings.max_age_blocks = age;
        }
        settings.offline |= self.offline;
        settings
    }
}

#[derive(Args)]
struct QuoteArgs {
    #[command(flatten)]
    chain: ChainArgs,
    #[arg(long)]
    token: String,
    /// Block number (decimal or 0x hex); latest when omitted.
    #[arg(long)]
    block: Option<String>,
    /// Query every source and average the K closest quotes.
    #[arg(long)]
    consensus: Option<usize>,
    /// Token amount (already decimal-adjusted) to value in USD.
    #[arg(long)]
    amount: Option<String>,
}

#[derive(Args)]
struct SheetArgs {
    #[command(flatten)]
    chain: ChainArgs,
    /// Comma-separated token addresses.
    #[arg(long, value_delimiter = ',')]
    tokens: Vec<String>,
    /// File with one token address per line; `#` starts a comment.
    #[arg(long)]
    tokens_file: Option<PathBuf>,
    #[arg(long)]
    block: Option<String>,
    #[arg(long, default_value = "./reports")]
    reports_dir: PathBuf,
    /// HTML report path; defaults to `<reports-dir>/<network>-<block>.html`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct VerifyArgs {
    #[arg(long)]
    sheet: PathBuf,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    network: Option<String>,
}

fn resolver(settings: &Settings) -> Result<Resolver<RpcReader>, Box<dyn std::error::Error>> {
    let config = Registry::from_settings(settings)
        .config(&settings.network)
        .clone();
    let url = match (&settings.rpc_url, settings.offline) {
        (Some(url), _) => url.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err("no rpc url: pass --rpc-url or set rpc_url in settings".into());
        }
    };
    let rpc = RpcConfig {
        rate_limit_ms: settings.rate_limit_ms,
        max_retries: settings.max_retries,
        retry_backoff_ms: settings.retry_backoff_ms,
        offline: settings.offline,
        ..RpcConfig::new(url, config.network.clone())
    };
    std::fs::create_dir_all(&settings.cache_dir)?;
    let cache = CallCache::open(settings.call_cache_path())?;
    let reader = RpcReader::new(rpc, Some(cache))?;
    Ok(Resolver::new(config, reader))
}

fn parse_tokens(args: &SheetArgs) -> Result<Vec<Address>, Box<dyn std::error::Error>> {
    let mut raw: Vec<String> = args.tokens.clone();
    if let Some(path) = &args.tokens_file {
        let text = std::fs::read_to_string(path)?;
        raw.extend(
            text.lines()
                .map(|l| l.split('#').next().unwrap_or_default().trim().to_string())
                .filter(|l| !l.is_empty()),
        );
    }
    let mut tokens = Vec::with_capacity(raw.len());
    for t in &raw {
        tokens.push(parse_address(t)?);
    }
    Ok(tokens)
}

fn run_quote(args: QuoteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.chain.settings();
    let token = parse_address(&args.token)?;
    let block = match &args.block {
        Some(b) => parse_block(b)?,
        None => None,
    };
    let resolver = resolver(&settings)?;
    let quote = match args.consensus {
        Some(k) => resolver.resolve_consensus(&token, block, k),
        None => {
            let cache = PriceCache::open(settings.price_cache_path())?;
            resolver.resolve_cached(&cache, &token, block, settings.max_age_blocks)
        }
    };
    info!(
        requests = resolver.reader().request_count(),
        oracle = ?quote.oracle(),
        "quote complete"
    );
    let Some(price) = quote.usd_price() else {
        eprintln!("UNPRICED\t{}", format_address(&token));
        std::process::exit(1);
    };
    let source = quote
        .oracle()
        .map(|o| o.to_string())
        .unwrap_or_else(|| "consensus".to_string());
    println!("{}\t{}\t{}", format_address(&token), price.normalized(), source);
    if let Some(amount) = &args.amount {
        let amount = BigDecimal::from_str(amount)?;
        println!("value\t{}", (price * amount).normalized());
    }
    Ok(())
}

fn run_sheet(args: SheetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = args.chain.settings();
    let tokens = parse_tokens(&args)?;
    if tokens.is_empty() {
        return Err("no tokens: pass --tokens or --tokens-file".into());
    }
    let block = match &args.block {
        Some(b) => parse_block(b)?,
        None => None,
    };
    let resolver = resolver(&settings)?;
    let sheet = PriceSheet::build(&resolver, &tokens, block);
    info!(
        tokens = sheet.entries.len(),
        priced = sheet.priced_count(),
        requests = resolver.reader().request_count(),
        "sheet built"
    );

    std::fs::create_dir_all(&args.reports_dir)?;
    let stem = sheet.file_stem();
    let sheet_path = args.reports_dir.join(format!("{}.sheet.json", stem));
    let hash_path = hash_path_for(&sheet_path);
    let html_path = args
        .out
        .clone()
        .unwrap_or_else(|| args.reports_dir.join(format!("{}.html", stem)));
    let data = ReportData::new(sheet)?;
    std::fs::write(&sheet_path, serde_json::to_string_pretty(&data.sheet)?)?;
    std::fs::write(&hash_path, format!("{}\n", data.sheet_hash_sha256))?;
    render_report(&data, &html_path)?;
    info!(?sheet_path, ?hash_path, ?html_path, "sheet complete");
    println!("{}", data.sheet_hash_sha256);
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let sheet_json = std::fs::read_to_string(&args.sheet)?;
    let sheet: PriceSheet = serde_json::from_str(&sheet_json)?;
    let expected = std::fs::read_to_string(hash_path_for(&args.sheet)).ok();
    match expected {
        Some(exp) => {
            let result = verify_sheet_hash(&sheet, &exp)?;
            if result.matches {
                println!("OK\t{}", result.sheet_hash);
            } else {
                eprintln!(
                    "MISMATCH\tcomputed={}\texpected={}",
                    result.sheet_hash, result.expected_hash
                );
                std::process::exit(1);
            }
        }
        None => {
            eprintln!("MISMATCH\tcomputed={}\texpected=None", sheet_hash(&sheet)?);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load();
    let network = args.network.unwrap_or_else(|| settings.network.clone());
    let registry = Registry::from_settings(&settings);
    let file = ChainConfigFile::from(registry.config(&network.to_lowercase()));
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}
