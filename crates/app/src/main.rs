use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dance_avatar_core::{
    catalog::{MoveCatalog, StyleCatalog},
    timeline::MoveSchedule,
    AppConfig, PoseSynthesizer, ScoreRequest, Timeline,
};
use tracing_subscriber::EnvFilter;

mod server;

#[tokio::main]
async fn main() -> dance_avatar_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve { bind } => run_serve(config, bind).await,
        Commands::Styles => print_json(&StyleCatalog::list_style_ids()),
        Commands::Moves => print_json(&MoveCatalog::list_move_ids()),
        Commands::Pose {
            id,
            time,
            intensity,
        } => run_pose(&id, time, intensity),
        Commands::Bake { output, seconds } => run_bake(&config, &output, seconds),
        Commands::Score { input } => run_score(&input),
    }
}

fn load_config(path: Option<&PathBuf>) -> dance_avatar_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

async fn run_serve(mut config: AppConfig, bind: Option<String>) -> dance_avatar_core::Result<()> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    tracing::info!(bind = %config.server.bind_addr, "starting server");
    server::serve(config).await
}

fn run_pose(id: &str, time: f32, intensity: f32) -> dance_avatar_core::Result<()> {
    let pose = PoseSynthesizer::new().synthesize(id, time, intensity);
    print_json(&pose)
}

fn run_bake(config: &AppConfig, output: &PathBuf, seconds: Option<f32>) -> dance_avatar_core::Result<()> {
    let total = seconds.unwrap_or(config.timeline.total_duration_seconds);
    tracing::info!(?output, total, "baking sequence timeline");

    let schedule = MoveSchedule::catalog(config.timeline.move_duration_seconds);
    let timeline = Timeline::build_with(total, &schedule, config.stream.frame_rate);
    let file = std::fs::File::create(output)?;
    serde_json::to_writer(std::io::BufWriter::new(file), &timeline)?;

    tracing::info!(frames = timeline.len(), "timeline written");
    Ok(())
}

fn run_score(input: &PathBuf) -> dance_avatar_core::Result<()> {
    let text = std::fs::read_to_string(input)?;
    let request: ScoreRequest = serde_json::from_str(&text)?;
    print_json(&request.evaluate())
}

fn print_json<T: serde::Serialize>(value: &T) -> dance_avatar_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Procedural dance avatar server", long_about = None)]
struct Cli {
    /// JSON configuration file. Missing fields use built-in defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP and WebSocket server.
    Serve {
        /// Address to listen on, overriding the configuration file.
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// List dance style ids.
    Styles,
    /// List move ids.
    Moves,
    /// Print one synthesized pose as JSON.
    Pose {
        /// Style or move id.
        id: String,
        /// Elapsed seconds.
        #[arg(short, long, default_value_t = 0.0)]
        time: f32,
        #[arg(short, long, default_value_t = 1.0)]
        intensity: f32,
    },
    /// Pre-compute the sequence timeline and write it to a JSON file.
    Bake {
        output: PathBuf,
        /// Length of the baked loop, overriding the configuration file.
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Grade a performance from a JSON request file.
    Score {
        input: PathBuf,
    },
}
