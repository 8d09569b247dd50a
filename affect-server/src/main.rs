use std::sync::Arc;

use affect_core::inference::EmotionPredictor;
use affect_core::{AffectConfig, OnnxEmotionPredictor};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "affect.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match AffectConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging — RUST_LOG overrides the configured default level
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    // Connect to DB
    let pool = match affect_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match affect_core::db::health_check(&pool).await {
            Ok(v) => println!("PostgreSQL connected: {}", v),
            Err(e) => {
                println!("PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("Affect DB health check passed");
        return Ok(());
    }

    // Create-if-missing schema
    affect_core::db::init_schema(&pool).await?;

    // Load both model assets once at startup; a missing file is fatal.
    let predictor: Arc<dyn EmotionPredictor> =
        match OnnxEmotionPredictor::new(&config.model, config.detector.clone()) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                eprintln!("Failed to load model assets: {}", e);
                std::process::exit(1);
            }
        };
    tracing::info!(
        "Loaded '{}' predictor (classifier: {}, detector: {})",
        predictor.name(),
        config.model.classifier_path,
        config.model.detector_path
    );

    // Shutdown signal
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    affect_server::http::start_http_server(pool, config, predictor, tx.subscribe()).await?;

    Ok(())
}
