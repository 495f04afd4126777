//! OGS Insight - command-line front end
//!
//! Loads a player's AI-reviewed games from online-go.com and prints
//! move-quality statistics, or analyzes a single game.

use clap::{Args, Parser, Subcommand};
use ogs_insight_core::{
    analysis::{annotations, build_report, move_quality, position_metrics, Phase, PhaseStats, SCORE_BUCKETS},
    error::{InsightError, Result},
    parse_player_id,
    utils::format::truncate_chars,
    next_progress, GameFilter, GameId, IngestionPipeline, InsightConfig, PlayerId,
    ProfileSummary, ProgressEvent, RunStatus, SessionHandle, SideAggregate,
};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ogs-insight")]
#[command(about = "Move-quality statistics from online-go.com AI reviews", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (overrides OGS_INSIGHT_CONFIG env var and default)
    #[arg(long, env = "OGS_INSIGHT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a player's recent AI-reviewed games
    Profile {
        /// Player id or profile URL
        player: String,

        /// Number of analyzed games to stop at
        #[arg(short, long)]
        target: Option<u32>,

        #[command(flatten)]
        filter: FilterArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze one game
    Game {
        game_id: u64,

        /// Player whose moves are reported
        #[arg(short, long)]
        player: String,

        /// Also show the evaluation after this move
        #[arg(short = 'm', long = "move")]
        move_number: Option<usize>,

        /// Print report, quality and annotations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config path
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args)]
#[group(multiple = false)]
struct FilterArgs {
    /// Only ranked games
    #[arg(long)]
    ranked_only: bool,

    /// Only free (unranked) games
    #[arg(long)]
    free_only: bool,
}

impl FilterArgs {
    fn to_filter(&self) -> GameFilter {
        if self.ranked_only {
            GameFilter::ranked_only()
        } else if self.free_only {
            GameFilter::free_only()
        } else {
            GameFilter::default()
        }
    }
}

fn parse_player(input: &str) -> Result<PlayerId> {
    parse_player_id(input).ok_or_else(|| InsightError::InvalidPlayer(input.to_string()))
}

fn print_phase_table(title: &str, side: &SideAggregate) {
    println!();
    println!(
        "{} ({} games, {}W / {}L)",
        title, side.games, side.wins, side.losses
    );
    print_phase_rows(&side.phases.iter().collect::<Vec<_>>());
}

fn print_phase_rows(rows: &[(&str, &PhaseStats)]) {
    println!(
        "  {:<8} {:>6} {:>9} {:>10} {:>10} {:>9}",
        "phase", "moves", "accuracy", "avg pts", "avg win%", "M/S/B"
    );
    for (name, stats) in rows {
        println!(
            "  {:<8} {:>6} {:>8.1}% {:>10.2} {:>10.1} {:>9}",
            name,
            stats.moves,
            stats.accuracy,
            stats.avg_score_loss,
            stats.avg_win_loss,
            format!(
                "{}/{}/{}",
                stats.mistakes.total, stats.mistakes.severe, stats.mistakes.blunder
            )
        );
    }
}

fn print_summary(summary: &ProfileSummary) {
    println!(
        "Games: {} (ranked {}, free {})  Wins: {}  Losses: {}  Accuracy: {}%",
        summary.total_games,
        summary.ranked_games,
        summary.free_games,
        summary.wins,
        summary.losses,
        summary.accuracy
    );
    print_phase_table("Combined", &summary.aggregate.combined);
    print_phase_table("As black", &summary.aggregate.black);
    print_phase_table("As white", &summary.aggregate.white);

    println!();
    println!("Score-loss distribution (all moves):");
    for (bucket, count) in summary
        .aggregate
        .combined
        .phases
        .total
        .score_buckets
        .labeled(&SCORE_BUCKETS)
    {
        println!("  {:<12} {}", bucket.label, count);
    }
}

async fn run_profile(
    config: &InsightConfig,
    player: &str,
    target: Option<u32>,
    filter: GameFilter,
    json: bool,
) -> Result<()> {
    let player = parse_player(player)?;
    let mut config = config.clone();
    if let Some(target) = target {
        config.ingestion.target_games = target;
    }

    let pipeline = IngestionPipeline::from_config(&config)?;
    let mut events = pipeline.subscribe();
    let progress = tokio::spawn(async move {
        while let Some(event) = next_progress(&mut events).await {
            match event {
                ProgressEvent::GameAnalyzed {
                    analyzed, target, ..
                } => info!("Analyzed {} of {}...", analyzed, target),
                ProgressEvent::ReviewListThrottled { game_id, .. } => {
                    warn!("Throttled on reviews (game {}). Waiting...", game_id)
                }
                ProgressEvent::GameFailed { game_id, message } => {
                    warn!("Game {} failed: {}", game_id, message)
                }
                ProgressEvent::Finished { .. } => break,
                other => debug!("{:?}", other),
            }
        }
    });

    let session = SessionHandle::new();
    let outcome = pipeline.load_profile(&session, player, filter).await;
    if let Err(e) = progress.await {
        warn!("Progress reporter stopped: {}", e);
    }

    let snapshot = session.snapshot().await;
    let summary = snapshot.summary(filter);

    if json {
        let report = serde_json::json!({
            "status": outcome.status,
            "profile": snapshot.profile,
            "summary": summary,
            "errors": snapshot
                .errors
                .iter()
                .map(|(id, message)| (id.to_string(), message.clone()))
                .collect::<std::collections::BTreeMap<_, _>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(profile) = &snapshot.profile {
            println!(
                "{} [{}]",
                profile.name,
                profile.rank.as_deref().unwrap_or("Unknown rank")
            );
        }
        if let Some(summary) = &summary {
            print_summary(summary);
        }
        if !snapshot.errors.is_empty() {
            println!();
            println!("Games that could not be analyzed:");
            for (game_id, message) in &snapshot.errors {
                println!("  {}: {}", game_id, truncate_chars(message, 100));
            }
        }
    }

    match outcome.status {
        RunStatus::Failed(message) => Err(InsightError::Other(message)),
        RunStatus::Completed | RunStatus::Exhausted | RunStatus::Superseded => {
            info!("Loaded {} games.", outcome.analyzed);
            Ok(())
        }
    }
}

async fn run_game(
    config: &InsightConfig,
    game_id: u64,
    player: &str,
    move_number: Option<usize>,
    json: bool,
) -> Result<()> {
    let player = parse_player(player)?;
    let pipeline = IngestionPipeline::from_config(config)?;
    let single = pipeline.analyze_single_game(GameId(game_id)).await?;

    let report = build_report(&single.game, Some(&single.analysis), player);
    let quality = move_quality(&single.analysis);
    let metrics = move_number.map(|n| position_metrics(&single.analysis, n));

    if json {
        let out = serde_json::json!({
            "game": single.game,
            "report": report,
            "quality": quality,
            "annotations": annotations(&single.analysis),
            "position": metrics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{}", single.game.label());
    if let Some(date) = single.game.ended_date() {
        println!("Ended: {}", date);
    }
    println!("Result: {}", single.game.result_summary_for(player));

    match &report {
        Some(report) => {
            println!("Playing {}", report.player_side.as_str());
            print_phase_rows(&report.phases.iter().collect::<Vec<_>>());

            println!();
            println!("Score-loss distribution ({}):", report.player_side.as_str());
            for phase in Phase::ALL {
                let histogram = quality.phase(phase).side(report.player_side);
                let counts: Vec<String> = histogram
                    .labeled(&SCORE_BUCKETS)
                    .map(|(bucket, count)| format!("{} {}", bucket.label, count))
                    .collect();
                println!("  {:<16} {}", phase.label(), counts.join(", "));
            }
        }
        None => println!("Player {} did not play this game", player),
    }

    if let (Some(n), Some(metrics)) = (move_number, metrics) {
        println!();
        println!(
            "After move {}: score {}, win rate {}",
            n,
            metrics
                .score
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "?".to_string()),
            metrics
                .win_rate
                .map(|w| format!("{:.1}%", w * 100.0))
                .unwrap_or_else(|| "?".to_string())
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Our crate at the requested level, noisy dependencies at warn
    let filter = EnvFilter::new(format!(
        "ogs_insight={level},ogs_insight_core={level},tungstenite=warn,reqwest=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("OGS Insight v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.unwrap_or_else(InsightConfig::default_path);
    let config = InsightConfig::load(&config_path)?;

    match cli.command {
        Commands::Profile {
            player,
            target,
            filter,
            json,
        } => run_profile(&config, &player, target, filter.to_filter(), json).await,
        Commands::Game {
            game_id,
            player,
            move_number,
            json,
        } => run_game(&config, game_id, &player, move_number, json).await,
        Commands::Config { write } => {
            if write {
                config.save(&config_path)?;
            }
            let rendered = toml::to_string_pretty(&config.redacted())
                .map_err(|e| InsightError::Other(format!("Failed to render config: {}", e)))?;
            print!("{}", rendered);
            Ok(())
        }
    }
}
