//! Status monitor binary

use actix_web::{web, App, HttpServer};
use clap::Parser;
use status_monitor::{compile, controllers, AppState, Config, Registry, Result, Scheduler};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Self-hosted status dashboard backend")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "STATUS_MONITOR_CONFIG", default_value = "conf.yml")]
    config: PathBuf,

    /// Address to bind the JSON API to, overriding the configuration
    #[arg(short, long)]
    listen: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match Config::from_file(&args.config).and_then(Config::apply_env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    initialize_tracing(&config.log_level, &config.log_format);

    info!("Starting status monitor v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let descriptors = match compile(&config.services) {
        Ok(descriptors) => descriptors,
        Err(e) => {
            error!("Configuration rejected: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Registry::new(descriptors);
    info!(
        "Monitoring {} services, status every {}, repositories every {}",
        registry.len(),
        humantime::format_duration(config.service_interval),
        humantime::format_duration(config.repo_interval)
    );

    let scheduler = Scheduler::new(&config, registry.clone())?.start();

    let state = web::Data::new(AppState::new(registry));
    info!("Listening on http://{}", config.listen);

    let served = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(controllers::configure)
    })
    .bind(&config.listen)?
    .run()
    .await;

    scheduler.shutdown();
    served?;
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing(log_level: &str, log_format: &str) {
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter_layer);

    if log_format == "text" {
        registry.with(fmt_layer).init();
    } else {
        registry.with(fmt_layer.json()).init();
    }
}
