mod render;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ollabench_benchmark::{BenchmarkEvent, BenchmarkRunner, OllamaClient, SessionHistory};
use ollabench_core::{BenchConfig, BenchmarkRun, PromptPool, RunStatus};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ollabench")]
#[command(about = "Ollama concurrency benchmark", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ollama host URL (overrides OLLAMA_HOST and the config file)
    #[arg(long, global = true)]
    ollama_host: Option<String>,

    /// Newline-separated prompts replacing the built-in set
    #[arg(long, global = true)]
    prompts_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models
    Models,

    /// Run a concurrent benchmark
    Benchmark {
        /// Model name to benchmark
        #[arg(short, long)]
        model: String,

        /// Number of tasks (distinct prompts)
        #[arg(short = 'n', long, default_value = "10")]
        tasks: usize,

        /// Maximum in-flight requests
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Number of warmup runs
        #[arg(short, long)]
        warmup: Option<u32>,

        /// Output format (table, json, csv)
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Save the result as a timestamped JSON file
        #[arg(long)]
        save: bool,
    },

    /// Show system status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct BenchOptions {
    tasks: Option<usize>,
    concurrency: Option<usize>,
    warmup: Option<u32>,
}

struct Session {
    config: BenchConfig,
    pool: PromptPool,
    history: SessionHistory,
}

impl Session {
    fn load(cli: &Cli) -> Result<Self> {
        let config = BenchConfig::load(cli.config.as_deref(), cli.ollama_host.as_deref())?;

        let pool = match &cli.prompts_file {
            Some(path) => PromptPool::from_file(path)
                .with_context(|| format!("loading prompts from {}", path.display()))?,
            None => PromptPool::builtin(),
        };
        tracing::debug!("Prompt pool holds {} prompts", pool.len());

        Ok(Self {
            config,
            pool,
            history: SessionHistory::new(),
        })
    }

    fn client(&self) -> Result<OllamaClient> {
        Ok(OllamaClient::from_config(&self.config.ollama)?)
    }

    fn save_history(&self) -> Result<()> {
        let dir = Path::new(&self.config.output.results_dir);
        match self.history.save_to(dir)? {
            Some(path) => println!("  Saved {} result(s) to {}", self.history.len(), path.display()),
            None => println!("  No results to save"),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut session = Session::load(&cli)?;

    match cli.command {
        Some(Commands::Models) => cmd_models(&session).await?,
        Some(Commands::Benchmark {
            model,
            tasks,
            concurrency,
            warmup,
            output,
            save,
        }) => {
            let options = BenchOptions {
                tasks: Some(tasks),
                concurrency,
                warmup,
            };
            let run = cmd_benchmark(&session, &model, options, &output).await?;
            if let (true, Some(run)) = (save, run) {
                session.history.push(run);
                session.save_history()?;
            }
        }
        Some(Commands::Status) => cmd_status(&session).await?,
        None => run_interactive(&mut session).await?,
    }

    Ok(())
}

async fn run_interactive(session: &mut Session) -> Result<()> {
    display_welcome();
    cmd_status(session).await?;
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "help" | "h" | "?" => display_help(),
            "models" | "m" => {
                if let Err(e) = cmd_models(session).await {
                    println!("Error: {}", e);
                }
            }
            "status" | "s" => {
                if let Err(e) = cmd_status(session).await {
                    println!("Error: {}", e);
                }
            }
            "benchmark" | "bench" | "b" => match handle_benchmark_command(session, &parts[1..]).await {
                Ok(Some(run)) => {
                    session.history.push(run);
                }
                Ok(None) => {}
                Err(e) => println!("Error: {:#}", e),
            },
            "history" | "hist" => {
                println!();
                match session.history.is_empty() {
                    true => println!("  No completed runs in this session"),
                    false => print!("{}", render::history_table(session.history.entries())),
                }
                println!();
            }
            "save" => {
                if let Err(e) = session.save_history() {
                    println!("Error: {}", e);
                }
            }
            "exit" | "quit" | "q" => break,
            "clear" | "cls" => {
                print!("\x1B[2J\x1B[1;1H");
                stdout.flush()?;
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", cmd);
            }
        }
    }

    if session.config.output.save_on_exit {
        session.save_history()?;
    }
    println!("  Goodbye!");

    Ok(())
}

fn display_welcome() {
    println!();
    println!("  ollabench - Ollama concurrency benchmark");
    println!();
    println!("  models, m              # List available Ollama models");
    println!("  benchmark, b <#|name>  # Run benchmark (e.g., `b 1 -n 20` or `b llama3.1:8b`)");
    println!("  history                # Show runs from this session");
    println!("  status, s              # Show system status");
    println!("  help                   # Show all command options");
    println!("  exit, quit, q          # Save results and exit");
    println!();
}

fn display_help() {
    println!();
    println!("Available Commands:");
    println!("  models, m              List available Ollama models (with index numbers)");
    println!("  benchmark, b <#|name>  Run benchmark by index or model name");
    println!("    Examples:");
    println!("      b 1                Benchmark model #1 from list");
    println!("      b llama3.1:8b -n 50 -c 8");
    println!("    Options:");
    println!("      -n, --tasks        Number of tasks (default: 10)");
    println!("      -c, --concurrency  Maximum in-flight requests");
    println!("      -w, --warmup       Warmup runs");
    println!("  history, hist          Show completed runs from this session");
    println!("  save                   Write session results to a JSON file now");
    println!("  status, s              Show system status");
    println!("  clear, cls             Clear screen");
    println!("  help, h                Show this help message");
    println!("  exit, quit, q          Exit (results are saved unless disabled in config)");
    println!();
    println!("Tip: Ctrl+C during a benchmark cancels the run");
    println!();
}

async fn resolve_model_id(session: &Session, input: &str) -> Result<String> {
    if let Ok(index) = input.parse::<usize>() {
        let models = session.client()?.list_models().await?;
        if index == 0 || index > models.len() {
            bail!("Invalid model index: {}. Use 1-{}", index, models.len());
        }
        return Ok(models[index - 1].clone());
    }
    Ok(input.to_string())
}

fn parse_benchmark_options(args: &[&str]) -> Result<BenchOptions> {
    let mut options = BenchOptions::default();

    let mut i = 0;
    while i < args.len() {
        let flag = args[i];
        let value = || {
            args.get(i + 1)
                .copied()
                .with_context(|| format!("{} requires a value", flag))
        };

        match flag {
            "-n" | "--tasks" => {
                options.tasks = Some(value()?.parse().with_context(|| format!("invalid {}", flag))?);
                i += 1;
            }
            "-c" | "--concurrency" => {
                options.concurrency =
                    Some(value()?.parse().with_context(|| format!("invalid {}", flag))?);
                i += 1;
            }
            "-w" | "--warmup" => {
                options.warmup = Some(value()?.parse().with_context(|| format!("invalid {}", flag))?);
                i += 1;
            }
            other => bail!("Unknown option: {}", other),
        }
        i += 1;
    }

    Ok(options)
}

async fn handle_benchmark_command(session: &Session, args: &[&str]) -> Result<Option<BenchmarkRun>> {
    if args.is_empty() {
        println!("Usage: benchmark <model> [options]");
        println!("  Example: benchmark 1 -n 20  (by index)");
        println!("  Example: benchmark llama3.1:8b -n 20 -c 4  (by name)");
        return Ok(None);
    }

    let options = parse_benchmark_options(&args[1..])?;
    let model = resolve_model_id(session, args[0]).await?;
    cmd_benchmark(session, &model, options, "table").await
}

async fn cmd_models(session: &Session) -> Result<()> {
    let models = session.client()?.list_models().await?;

    println!();
    println!("Available Models:");
    println!("{:-<50}", "");
    println!("  {:<4} {}", "#", "Name");
    println!("{:-<50}", "");
    for (i, m) in models.iter().enumerate() {
        println!("  {:<4} {}", i + 1, m);
    }
    if models.is_empty() {
        println!("  (none - pull one with `ollama pull <model>`)");
    }
    println!();
    println!("  Use: benchmark <#> or <name> (e.g., `b 1` or `b llama3.2:latest`)");
    println!();

    Ok(())
}

/// Run one benchmark, printing progress as it arrives. Returns the run when it completed.
async fn cmd_benchmark(
    session: &Session,
    model: &str,
    options: BenchOptions,
    output_format: &str,
) -> Result<Option<BenchmarkRun>> {
    let mut config = session.config.clone();
    if let Some(concurrency) = options.concurrency {
        config.runner.concurrency = concurrency;
    }
    if let Some(warmup) = options.warmup {
        config.runner.warmup_runs = warmup;
    }
    let tasks = options.tasks.unwrap_or(10);

    let runner = BenchmarkRunner::ollama(&config, session.pool.clone())?;

    let quiet = output_format != "table";
    if !quiet {
        println!();
        println!("Running benchmark...");
        println!("  Model: {}", model);
        println!("  Tasks: {}", tasks);
        println!("  Concurrency: {}", config.runner.concurrency);
        println!("  Warmup: {}", config.runner.warmup_runs);
        println!();
    }

    let mut handle = runner.start(model, tasks)?;
    let mut interrupted = false;
    let mut completed_run = None;
    let mut failure = None;

    loop {
        let next = tokio::select! {
            event = handle.recv() => Some(event),
            _ = tokio::signal::ctrl_c(), if !interrupted => None,
        };

        let event = match next {
            Some(Some(event)) => event,
            Some(None) => break,
            None => {
                interrupted = true;
                eprintln!("  Cancelling...");
                handle.cancel();
                continue;
            }
        };

        match event {
            BenchmarkEvent::Progress { percentage, message } => {
                eprintln!("  [{:>3}%] {}", percentage, message)
            }
            BenchmarkEvent::TaskFailed { prompt, message } => {
                eprintln!("  Task failed ({}): {}", render::truncate_prompt(&prompt), message)
            }
            BenchmarkEvent::Done { run } => completed_run = Some(run),
            BenchmarkEvent::Cancelled { completed } => {
                eprintln!("  Benchmark cancelled after {} completed task(s)", completed)
            }
            BenchmarkEvent::Error { message } => failure = Some(message),
        }
    }

    let status = handle.wait().await;
    tracing::debug!("Benchmark finished with status {}", status.label());

    if let Some(message) = failure {
        bail!("Benchmark failed: {}", message);
    }
    if status != RunStatus::Completed {
        return Ok(None);
    }
    let Some(run) = completed_run else {
        bail!("Benchmark finished without a result");
    };

    match output_format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        "csv" => {
            print!("{}", render::csv(&run));
        }
        _ => {
            println!();
            println!("Summary:");
            print!("{}", render::summary_table(&run));
            println!();
            println!("Tasks:");
            print!("{}", render::task_table(&run));
            println!();
        }
    }

    Ok(Some(run))
}

async fn cmd_status(session: &Session) -> Result<()> {
    let config = &session.config;
    println!("System Status:");
    println!("{:-<40}", "");
    println!("  Ollama Host: {}", config.ollama.host);
    println!("  Prompts: {}", session.pool.len());
    println!("  Concurrency: {}", config.runner.concurrency);

    match session.client()?.list_models().await {
        Ok(models) => {
            println!("  Ollama: connected ({} models available)", models.len());
        }
        Err(e) => {
            println!("  Ollama: disconnected ({})", e);
        }
    }

    Ok(())
}
