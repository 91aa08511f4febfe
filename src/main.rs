use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loqa_podcast::{create_router, AppState, Config, PodcastGenerator};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "loqa-podcast")]
#[command(about = "Generate two-host podcasts from text")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/loqa-podcast")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one podcast and print the audio file name
    Generate {
        /// Source text for the conversation
        text: String,

        /// Output file name inside the audio directory
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run the HTTP service
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    info!("Loaded config: {}", cfg.service.name);

    let generator = PodcastGenerator::from_config(&cfg)?;

    match args.command {
        Command::Generate { text, output } => {
            let report = generator.generate(&text, output.as_deref()).await?;
            info!(
                termination = ?report.termination,
                rounds = report.stats.rounds_flushed,
                transcript = ?report.transcript,
                "Generation finished"
            );

            match report.audio_file_name() {
                Some(name) => println!("{}", name),
                None => bail!("No podcast audio was produced"),
            }
        }
        Command::Serve => {
            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let app = create_router(AppState::new(generator));

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("HTTP server listening on {}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
