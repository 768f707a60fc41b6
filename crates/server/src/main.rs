use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use veille_core::{
    config::LogFormat,
    load_config,
    scheduler::ScheduledJob,
    validate_config, Config, DailySchedule, DigestService, ExecutionStatus, ExecutionTracker,
    GeminiClient, JsonlHistoryStore, LlmProvider, MessengerBackend, PipelineOrchestrator,
    Scheduler, TelegramMessenger, TheNewsApiClient, TriggerSource,
};

use veille_server::api::create_router;
use veille_server::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "veille", version, about = "Daily LLM news digest")]
struct Cli {
    /// Configuration file (defaults to $VEILLE_CONFIG, then config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API and the daily scheduler (default)
    Serve,
    /// Run one execution now and exit; exit code 1 if it failed
    RunOnce,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Determine config path
    let config_path = cli
        .config
        .or_else(|| std::env::var("VEILLE_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    init_logging(&config);
    info!("Loaded configuration from {:?}", config_path);

    validate_config(&config).context("Configuration validation failed")?;
    let schedule =
        DailySchedule::from_config(&config.schedule).context("Invalid schedule configuration")?;

    let service = Arc::new(build_service(&config, schedule)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, service, schedule).await,
        Command::RunOnce => run_once(&service).await,
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},tower_http=debug", config.logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

fn build_service(config: &Config, schedule: DailySchedule) -> Result<DigestService> {
    let news = Arc::new(
        TheNewsApiClient::new(config.news.clone()).context("Failed to create news client")?,
    );
    info!(api_base = %config.news.api_base, limit = config.news.limit, "News source ready");

    let model = match config.llm.provider {
        LlmProvider::Gemini => {
            Arc::new(GeminiClient::new(&config.llm).context("Failed to create Gemini client")?)
        }
    };
    info!(provider = ?config.llm.provider, model = %config.llm.model, "Language model ready");

    let messenger = match config.messenger.backend {
        MessengerBackend::Telegram => Arc::new(
            TelegramMessenger::new(&config.messenger)
                .context("Failed to create Telegram messenger")?,
        ),
    };

    let tracker = match &config.history.path {
        Some(path) => {
            let store = Arc::new(JsonlHistoryStore::new(path));
            let tracker = ExecutionTracker::with_store(config.history.retain, store)
                .with_context(|| format!("Failed to load execution history from {:?}", path))?;
            info!("Execution history persisted to {:?}", path);
            tracker
        }
        None => {
            info!("Execution history kept in memory only");
            ExecutionTracker::new(config.history.retain)
        }
    };

    let orchestrator = PipelineOrchestrator::new(
        config.pipeline.clone(),
        config.news.limit,
        news,
        model,
        messenger,
        Arc::new(tracker),
    )
    .with_display_offset(schedule.offset);

    let service = DigestService::new(Arc::new(orchestrator));
    Ok(if config.schedule.enabled {
        service.with_schedule(schedule)
    } else {
        service
    })
}

async fn serve(config: Config, service: Arc<DigestService>, schedule: DailySchedule) -> Result<()> {
    let scheduler = if config.schedule.enabled {
        let job: Arc<dyn ScheduledJob> = Arc::clone(&service) as Arc<dyn ScheduledJob>;
        let scheduler = Scheduler::new(schedule, job);
        scheduler.start();
        Some(scheduler)
    } else {
        info!("Scheduler disabled in config");
        None
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    if config.server.api_key.is_none() {
        warn!("No server.api_key set, POST /api/v1/pipeline/trigger is unauthenticated");
    }

    let state = Arc::new(AppState::new(config, Arc::clone(&service)));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(scheduler) = scheduler {
        info!("Stopping scheduler...");
        scheduler.stop();
    }

    if let Some(running) = service.status().current {
        warn!(execution_id = %running.id, phase = %running.phase, "Exiting with an execution in flight");
    }

    Ok(())
}

async fn run_once(service: &DigestService) -> Result<()> {
    let execution = service
        .trigger(TriggerSource::Manual)
        .await
        .context("Could not start execution")?;

    let counters = &execution.counters;
    info!(
        execution_id = %execution.id,
        status = %execution.status,
        articles = counters.articles_fetched,
        ideas = counters.ideas_extracted,
        selected = counters.ideas_selected,
        translated = counters.ideas_translated,
        delivered = execution.delivered,
        "Execution finished"
    );

    if execution.status == ExecutionStatus::Failed {
        bail!(
            "execution {} failed at {}: {}",
            execution.id,
            execution
                .failed_stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown stage".to_string()),
            execution.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
