use ragops::cli::{Cli, Commands, ConfigAction};
use ragops::config::{Config, ConfigValidator};
use ragops::embedding::{EmbeddingProvider, FastEmbedProvider};
use ragops::error::{RagError, Result};
use ragops::evaluation::{load_dataset, Evaluator, LlmJudge};
use ragops::gate::compare_report_files;
use ragops::generation::OpenAiGenerator;
use ragops::ingest::{ingest_document, IngestOptions};
use ragops::pipeline::{AnswerPipeline, PipelineTrace};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match run(cli.command, cli.config, cli.profile, cli.verbose).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&e, cli.verbose);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config_path: Option<PathBuf>,
    profile: Option<String>,
    verbose: bool,
) -> Result<ExitCode> {
    match command {
        Commands::Ingest {
            source,
            output,
            chunk_size,
            chunk_overlap,
            force,
        } => {
            let config = load_config(config_path, profile)?;
            let mut options = IngestOptions::from_config(&config);
            if let Some(source) = source {
                options.source_path = source;
            }
            if let Some(output) = output {
                options.index_path = output;
            }
            if let Some(size) = chunk_size {
                options.chunk_size = size;
            }
            if let Some(overlap) = chunk_overlap {
                options.chunk_overlap = overlap;
            }
            options.force = force;
            cmd_ingest(&options)
        }
        Commands::Ask {
            question,
            show_context,
            top_k,
        } => {
            let mut config = load_config(config_path, profile)?;
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
            }
            cmd_ask(&config, &question, show_context).await
        }
        Commands::Chat { show_context } => {
            let config = load_config(config_path, profile)?;
            cmd_chat(&config, show_context, verbose).await
        }
        Commands::Evaluate {
            dataset,
            output,
            judge_model,
        } => {
            let mut config = load_config(config_path, profile)?;
            if let Some(dataset) = dataset {
                config.evaluation.dataset_path = dataset;
            }
            if let Some(output) = output {
                config.evaluation.report_path = output;
            }
            if let Some(model) = judge_model {
                config.evaluation.judge_model = model;
            }
            cmd_evaluate(&config).await
        }
        Commands::Compare {
            baseline,
            current,
            threshold,
        } => {
            let config = load_config(config_path, profile)?;
            let threshold = threshold.unwrap_or(config.gate.degradation_threshold);
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(RagError::InvalidInput(format!(
                    "threshold must be a non-negative number, got {threshold}"
                )));
            }
            cmd_compare(&config, &baseline, &current, threshold)
        }
        Commands::Config { action } => cmd_config(config_path, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "ragops=debug" } else { "ragops=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// One-line error, plus the cause chain when verbose
fn print_error(err: &RagError, verbose: bool) {
    eprintln!("❌ Error: {err}");
    if verbose {
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            eprintln!("   caused by: {cause}");
            source = cause.source();
        }
    }
}

fn cmd_ingest(options: &IngestOptions) -> Result<ExitCode> {
    println!("📚 Ingesting {}", options.source_path.display());

    let model = options.embedding_model.clone();
    let summary = ingest_document(options, || {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(FastEmbedProvider::new(&model)?);
        Ok(provider)
    })?;

    if summary.skipped {
        println!("✓ Index is up to date with the source (use --force to rebuild)");
    } else {
        println!("✓ Ingestion complete in {:.1}s", summary.duration_ms as f64 / 1000.0);
        println!(
            "  Embedded in {} batches ({:.1}s)",
            summary.batches,
            summary.embed_ms as f64 / 1000.0
        );
    }
    println!("  Pages:  {}", summary.pages);
    println!("  Chunks: {}", summary.chunks);
    println!("  Model:  {}", summary.embedding_model);
    println!("  Index:  {}", summary.index_path.display());

    Ok(ExitCode::SUCCESS)
}

fn print_trace(trace: &PipelineTrace, show_context: bool) {
    println!("{}", trace.text);

    if show_context {
        println!("\n📄 Context ({} chunks)", trace.retrieved.len());
        for (i, chunk) in trace.retrieved.iter().enumerate() {
            println!(
                "  [{}] page {}, score {:.3}: {}",
                i + 1,
                chunk.chunk.page,
                chunk.score,
                chunk.preview(200).replace('\n', " ")
            );
        }
    }
}

async fn cmd_ask(config: &Config, question: &str, show_context: bool) -> Result<ExitCode> {
    let pipeline = AnswerPipeline::from_config(config)?;
    let trace = pipeline.trace(question).await?;
    print_trace(&trace, show_context);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_chat(config: &Config, show_context: bool, verbose: bool) -> Result<ExitCode> {
    let pipeline = AnswerPipeline::from_config(config)?;
    println!(
        "💬 Ask questions about {} (model {}). Type 'exit' to quit.",
        config.ingestion.source_path.display(),
        pipeline.generator_model()
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|e| RagError::Io {
            source: e,
            context: "Failed to read from stdin".to_string(),
        })?;

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        match pipeline.trace(question).await {
            Ok(trace) => print_trace(&trace, show_context),
            Err(e) => print_error(&e, verbose),
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_evaluate(config: &Config) -> Result<ExitCode> {
    println!("{}", "=".repeat(60));
    println!("🔬 RAG System Evaluation");
    println!("{}", "=".repeat(60));

    let cases = load_dataset(&config.evaluation.dataset_path)?;
    println!("✓ Loaded {} test cases", cases.len());

    let pipeline = Arc::new(AnswerPipeline::from_config(config)?);

    let judge_client =
        OpenAiGenerator::from_config_with_model(&config.generation, &config.evaluation.judge_model)
            .map_err(|source| RagError::GenerationFailed {
                context: format!("initialising judge {}", config.evaluation.judge_model),
                source,
            })?;
    let judge = Arc::new(LlmJudge::new(Arc::new(judge_client)));

    let evaluator = Evaluator::from_config(config, pipeline, judge);
    let run = evaluator
        .evaluate_to_file(&cases, &config.evaluation.report_path)
        .await?;

    println!("\n{}", "=".repeat(60));
    println!("📊 Evaluation Results");
    println!("{}", "=".repeat(60));
    for (metric, score, threshold, passed) in run.report.metric_results() {
        let status = if passed { "✅" } else { "⚠️ " };
        println!("{status} {metric:<20}: {score:.3} (target: ≥{threshold:.2})");
    }
    println!("{}", "=".repeat(60));

    if run.failed_cases() > 0 {
        println!("⚠️  {} case(s) failed and were scored 0", run.failed_cases());
    }
    println!(
        "\n📈 Overall: {}/{} metrics passed ({:.0}%)",
        run.report.passes(),
        run.report.metric_results().len(),
        run.report.pass_rate
    );
    println!("💾 Report saved to {}", config.evaluation.report_path.display());

    if run.passed() {
        println!("\n✅ All quality gates passed!");
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "\n⚠️  Pass rate {:.0}% below {:.0}% threshold",
            run.report.pass_rate, run.min_pass_rate
        );
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_compare(
    config: &Config,
    baseline: &std::path::Path,
    current: &std::path::Path,
    threshold: f64,
) -> Result<ExitCode> {
    println!("{}", "=".repeat(60));
    println!("🔍 Comparing Evaluation Metrics");
    println!("{}", "=".repeat(60));

    let gate = compare_report_files(baseline, current, threshold, &config.gate.metrics)?;
    println!("\n{gate}");

    if gate.regressed {
        println!("\n❌ QUALITY GATE FAILED: One or more metrics regressed beyond threshold");
        println!("   Maximum allowed degradation: {:.0}%", threshold * 100.0);
        println!("\n💡 Actions:");
        println!("   1. Review recent changes that might affect quality");
        println!("   2. Check if the golden dataset has changed");
        println!("   3. Validate judge model connectivity");
        println!("   4. Compare the full evaluation reports for details");
    } else {
        println!("\n✅ QUALITY GATE PASSED: All metrics within acceptable range");
    }

    Ok(ExitCode::from(gate.exit_code()))
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<ExitCode> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, None)?;
            let value = serde_json::to_value(&config).map_err(|e| RagError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let shown = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    RagError::InvalidInput(format!("Unknown config section: {section}"))
                })?,
                None => value,
            };

            let json = serde_json::to_string_pretty(&shown).map_err(|e| RagError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            ConfigValidator::validate(&config)?;
            println!("✓ Configuration is valid");
            println!("  File: {}", path.display());
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = config_path.unwrap_or_else(|| PathBuf::from(ragops::config::LOCAL_CONFIG_FILE));

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(ExitCode::SUCCESS);
            }

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!("Config file not found, using defaults. Run 'ragops config init' to create one.");
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
