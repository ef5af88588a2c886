use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use subtrans::config::{load_vocabulary, Config};
use subtrans::pipeline::{print_summary, translate_files, PipelineConfig};
use subtrans::progress::{BarReporter, LogReporter, ProgressReporter};
use subtrans::translate::{OpenAiTranslator, Translator};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subtrans")]
#[command(version, about = "Speaker-aware subtitle translation")]
#[command(long_about = "Translate SRT files group by group, using the surrounding dialogue as context, \
while keeping every index and timestamp of the original.")]
struct Cli {
    /// SRT files to translate
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Target language code (e.g., zh, ja, fr)
    #[arg(short, long)]
    target: Option<String>,

    /// Number of concurrent translation requests (1 = sequential)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Sampling temperature for translation
    #[arg(long)]
    temperature: Option<f32>,

    /// Speaker groups of context on each side
    #[arg(short, long)]
    window: Option<usize>,

    /// Custom vocabulary file, one entry per line
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Log progress instead of drawing a progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref target) = cli.target {
        config.target_language = target.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(temperature) = cli.temperature {
        config.temperature = temperature;
    }
    if let Some(window) = cli.window {
        config.context_window = window;
    }
    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }
    if let Some(ref base_url) = cli.base_url {
        config.base_url = base_url.clone();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config
        .validate()
        .context("Configuration validation failed")?;

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(ref path) = cli.vocab {
        pipeline_config.vocabulary = load_vocabulary(path)
            .with_context(|| format!("Failed to read vocabulary {}", path.display()))?;
    }

    let api_key = config.api_key.clone().unwrap_or_default();
    let translator: Arc<dyn Translator> = Arc::new(
        OpenAiTranslator::new(api_key)
            .with_base_url(config.base_url.clone())
            .with_model(config.model.clone()),
    );

    info!("Files:    {}", cli.files.len());
    info!("Target:   {}", config.target_language);
    info!("Model:    {} ({})", config.model, translator.name());
    info!("Workers:  {}", config.concurrency.max(1));
    info!("Window:   {}", config.context_window);
    if !pipeline_config.vocabulary.is_empty() {
        info!("Vocabulary: {} entries", pipeline_config.vocabulary.len());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupted, finishing in-flight requests...");
        flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    let reporter: Arc<dyn ProgressReporter> = if cli.no_progress {
        Arc::new(LogReporter)
    } else {
        Arc::new(BarReporter::new())
    };

    let results = translate_files(
        &cli.files,
        translator,
        &pipeline_config,
        Some(reporter),
        cancelled,
    )
    .await;

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(result) => print_summary(result),
            Err(e) => {
                failed += 1;
                error!("{}: {}", path.display(), e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, results.len());
    }

    Ok(())
}
