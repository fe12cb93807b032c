//! ytguard CLI
//!
//! Inspect and edit ytguard settings, test URLs against the filter lists and
//! talk to the segment service from a terminal.

mod client;
mod store;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;

use yg_core::notify::LogNotifier;
use yg_core::player::MediaState;
use yg_core::scheduler::{format_time, SystemClock};
use yg_core::segments::{LoadOutcome, SkipSettingsPatch};
use yg_core::suppressor::SettingsPatch;
use yg_core::{Context, Document, EngineConfig, SegmentCategory, SkipController, Suppressor};
use yg_rules::{build_filter_set, build_selector_set, optimize_rules, parse_filter_list};

use crate::client::SegmentClient;
use crate::store::FileStore;

#[derive(Parser)]
#[command(name = "yg-cli")]
#[command(about = "ytguard ad suppressor and segment skipper tools")]
struct Cli {
    /// Settings store (JSON object, created on first write)
    #[arg(long, global = true, default_value = "ytguard-store.json")]
    store: PathBuf,

    /// Engine config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test a request URL against the filter lists
    CheckUrl {
        url: String,

        /// Filter-list file to test instead of the stored custom filters
        #[arg(short, long)]
        list: Option<String>,
    },

    /// Show the effective cosmetic selectors
    Selectors,

    /// Replace the stored custom filters with a filter-list file
    ImportFilters {
        input: String,
    },

    /// Fetch the skippable segments of a video
    Segments {
        video_id: String,

        /// Report which segment would be skipped at this time (seconds)
        #[arg(long)]
        at: Option<f64>,
    },

    /// Submit a segment for a video
    Submit {
        video_id: String,
        start: f64,
        end: f64,
        #[arg(default_value = "sponsor")]
        category: String,
    },

    /// Whitelist a channel, or remove it if already whitelisted
    Whitelist {
        channel: String,
    },

    /// Change suppressor and skipper switches
    Settings {
        #[arg(long)]
        adblock: Option<bool>,
        #[arg(long)]
        dom: Option<bool>,
        #[arg(long)]
        network: Option<bool>,
        #[arg(long)]
        anti_detection: Option<bool>,
        #[arg(long)]
        sponsorblock: Option<bool>,
        /// Enable a segment category
        #[arg(long)]
        enable_category: Vec<String>,
        /// Disable a segment category
        #[arg(long)]
        disable_category: Vec<String>,
    },

    /// Print counters and switches as JSON
    Stats,

    /// Reset the blocked-ads counter
    ResetCount,
}

fn init_logger(verbose: bool) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }
    Builder::new()
        .target(Target::Stderr)
        .filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn })
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = load_config(cli.config.as_deref())?;
    let mut store = FileStore::open(&cli.store)?;

    match cli.command {
        Commands::CheckUrl { url, list } => cmd_check_url(&config, &store, &url, list.as_deref()),
        Commands::Selectors => cmd_selectors(&config),
        Commands::ImportFilters { input } => cmd_import_filters(&config, &mut store, &input),
        Commands::Segments { video_id, at } => cmd_segments(&config, &mut store, &video_id, at).await,
        Commands::Submit {
            video_id,
            start,
            end,
            category,
        } => cmd_submit(&config, &mut store, &video_id, start, end, &category).await,
        Commands::Whitelist { channel } => cmd_whitelist(&config, &mut store, &channel),
        Commands::Settings {
            adblock,
            dom,
            network,
            anti_detection,
            sponsorblock,
            enable_category,
            disable_category,
        } => {
            let adblock = SettingsPatch {
                enabled: adblock,
                dom_blocking: dom,
                network_blocking: network,
                anti_detection,
            };
            cmd_settings(&config, &mut store, adblock, sponsorblock, &enable_category, &disable_category)
        }
        Commands::Stats => cmd_stats(&config, &store),
        Commands::ResetCount => cmd_reset_count(&config, &mut store),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    EngineConfig::from_json(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn load_suppressor(config: &EngineConfig, store: &FileStore) -> Suppressor {
    let build = build_selector_set(&config.extra_selectors);
    Suppressor::load(config, build.set, store)
}

fn cmd_check_url(config: &EngineConfig, store: &FileStore, url: &str, list: Option<&str>) -> Result<(), String> {
    let verdict = match list {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
            let (filters, _) = build_filter_set(&text);
            filters
                .find_match(url)
                .map(|(list, rule)| (list.as_str(), rule.raw().to_string()))
        }
        None => {
            let suppressor = load_suppressor(config, store);
            if !suppressor.should_block(url) {
                None
            } else {
                suppressor
                    .filters()
                    .find_match(url)
                    .map(|(list, rule)| (list.as_str(), rule.raw().to_string()))
            }
        }
    };

    match verdict {
        Some((list, rule)) => println!("BLOCK  {}\n  rule: {} ({} list)", url, rule, list),
        None => println!("ALLOW  {}", url),
    }
    Ok(())
}

fn cmd_selectors(config: &EngineConfig) -> Result<(), String> {
    let build = build_selector_set(&config.extra_selectors);
    for (category, selectors) in build.set.iter() {
        println!("{} ({} selectors)", category.as_str(), selectors.len());
        for selector in selectors {
            println!("  {}", selector.as_str());
        }
    }
    if !build.rejected.is_empty() {
        println!();
        println!("Rejected:");
        for reject in &build.rejected {
            println!("  {}", reject);
        }
    }
    Ok(())
}

fn cmd_import_filters(config: &EngineConfig, store: &mut FileStore, input: &str) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input, e))?;
    let parsed = parse_filter_list(&text);
    let mut rules = parsed.rules;

    let mut suppressor = load_suppressor(config, store);
    let stats = optimize_rules(&mut rules, suppressor.filters().list(yg_core::ListName::Builtin));
    let raw: Vec<String> = rules.iter().map(|rule| rule.raw().to_string()).collect();

    let clock = SystemClock;
    let mut notifier = LogNotifier;
    let mut ctx = Context::new(store, &mut notifier, &clock);
    let kept = suppressor.set_custom_filters(&mut ctx, raw);

    println!("Imported '{}'", input);
    println!("  Rules:    {} -> {} ({} duplicates, {} built in)", stats.before, kept, stats.deduped, stats.shadowed);
    println!("  Skipped:  {} lines", parsed.skipped.len());
    for (line, reason) in &parsed.skipped {
        log::debug!("line {}: {:?}", line, reason);
    }
    Ok(())
}

async fn cmd_segments(config: &EngineConfig, store: &mut FileStore, video_id: &str, at: Option<f64>) -> Result<(), String> {
    let mut skipper = SkipController::load(config, &*store);
    let ticket = match skipper.load_segments(video_id) {
        LoadOutcome::Fetch(ticket) => ticket,
        LoadOutcome::Empty | LoadOutcome::Cached => {
            println!("Segment skipping is disabled or no category is enabled");
            return Ok(());
        }
    };

    let client = SegmentClient::new()?;
    let result = client.fetch(&ticket).await;
    if let Err(e) = &result {
        return Err(format!("Failed to fetch segments: {}", e));
    }
    skipper.complete_load(&ticket, result, &mut Document::new(), &MediaState::default());

    println!("{} segments for {}", skipper.segments().len(), video_id);
    for segment in skipper.segments() {
        println!(
            "  {:>8} - {:<8} {:<16} votes {:>4}{}",
            format_time(segment.start_time),
            format_time(segment.end_time),
            segment.category.as_str(),
            segment.votes,
            if segment.locked { "  locked" } else { "" }
        );
    }

    if let Some(time) = at {
        match skipper.check_position(time) {
            Some(segment) => println!(
                "At {}: skip {} to {}",
                format_time(time),
                segment.category.label(),
                format_time(segment.end_time)
            ),
            None => println!("At {}: nothing to skip", format_time(time)),
        }
    }
    Ok(())
}

async fn cmd_submit(
    config: &EngineConfig,
    store: &mut FileStore,
    video_id: &str,
    start: f64,
    end: f64,
    category: &str,
) -> Result<(), String> {
    let mut skipper = SkipController::load(config, &*store);
    // Only the current item is needed; the returned fetch is not performed
    let _ = skipper.load_segments(video_id);

    let clock = SystemClock;
    let mut notifier = LogNotifier;
    let mut ctx = Context::new(store, &mut notifier, &clock);
    let submission = skipper
        .prepare_submission(&mut ctx, start, end, SegmentCategory::parse(category))
        .map_err(|e| e.to_string())?;

    let client = SegmentClient::new()?;
    let result = client.submit(&submission).await;
    let failure = result.as_ref().err().map(ToString::to_string);
    if skipper.finish_submission(&mut ctx, result) {
        println!("Submitted {} {}..{} for {}", category, start, end, video_id);
        Ok(())
    } else {
        Err(format!("Submission failed: {}", failure.unwrap_or_default()))
    }
}

fn cmd_whitelist(config: &EngineConfig, store: &mut FileStore, channel: &str) -> Result<(), String> {
    let mut suppressor = load_suppressor(config, store);
    let clock = SystemClock;
    let mut notifier = LogNotifier;
    let mut ctx = Context::new(store, &mut notifier, &clock);
    if suppressor.toggle_whitelist(&mut ctx, channel) {
        println!("Whitelisted {}", channel);
    } else {
        println!("Removed {} from the whitelist", channel);
    }
    Ok(())
}

fn cmd_settings(
    config: &EngineConfig,
    store: &mut FileStore,
    adblock: SettingsPatch,
    sponsorblock: Option<bool>,
    enable: &[String],
    disable: &[String],
) -> Result<(), String> {
    let mut suppressor = load_suppressor(config, store);
    let mut skipper = SkipController::load(config, &*store);

    let mut patch = SkipSettingsPatch {
        enabled: sponsorblock,
        ..SkipSettingsPatch::default()
    };
    for (names, enabled) in [(enable, true), (disable, false)] {
        for name in names {
            let category = SegmentCategory::parse(name);
            let Some(policy) = skipper.policy(category) else {
                return Err(format!("Unknown segment category '{}'", name));
            };
            let mut policy = policy.clone();
            policy.enabled = enabled;
            patch.categories.insert(category, policy);
        }
    }

    let clock = SystemClock;
    let mut notifier = LogNotifier;
    let mut ctx = Context::new(store, &mut notifier, &clock);
    if adblock != SettingsPatch::default() {
        suppressor.update_settings(&mut Document::new(), &mut ctx, adblock);
    }
    if patch != SkipSettingsPatch::default() {
        skipper.update_settings(&mut ctx, patch);
    }

    print_stats(&suppressor, &skipper)
}

fn cmd_stats(config: &EngineConfig, store: &FileStore) -> Result<(), String> {
    let suppressor = load_suppressor(config, store);
    let skipper = SkipController::load(config, &*store);
    print_stats(&suppressor, &skipper)
}

fn print_stats(suppressor: &Suppressor, skipper: &SkipController) -> Result<(), String> {
    let stats = serde_json::json!({
        "adblock": suppressor.stats(),
        "sponsorblock": skipper.stats(),
        "categories": skipper.enabled_categories(),
    });
    let text = serde_json::to_string_pretty(&stats)
        .map_err(|e| format!("Failed to serialize stats: {}", e))?;
    println!("{}", text);
    Ok(())
}

fn cmd_reset_count(config: &EngineConfig, store: &mut FileStore) -> Result<(), String> {
    let mut suppressor = load_suppressor(config, store);
    let clock = SystemClock;
    let mut notifier = LogNotifier;
    let mut ctx = Context::new(store, &mut notifier, &clock);
    suppressor.reset_count(&mut ctx);
    println!("Blocked-ads counter reset");
    Ok(())
}
