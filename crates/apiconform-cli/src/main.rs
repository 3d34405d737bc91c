//! apiconform CLI - positive/negative conformance runs against a stub target

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use apiconform_core::verdict::{EXIT_TOOL_ERROR, Verdict, VerdictStatus};
use apiconform_core::{Config, to_http_file};
use apiconform_runner::ScenarioRunner;

const CONFIG_FILE: &str = ".apiconform.toml";

#[derive(Parser)]
#[command(name = "apiconform")]
#[command(about = "Positive/negative conformance checks against schema-described HTTP services")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Debug-level logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate cases, send them and check every response
    Run {
        /// Config file (default: .apiconform.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Scenario file (overrides config)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Target base URL (overrides config and BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Show the case plan without sending requests
        #[arg(long)]
        dry_run: bool,

        /// Dump all request/response pairs to JSONL files
        #[arg(long)]
        dump: bool,

        /// Directory for dump files (default: .apiconform/dumps)
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// RNG seed for reproducible values
        #[arg(long)]
        seed: Option<u64>,

        /// Parallel virtual users
        #[arg(long)]
        vus: Option<u32>,

        /// Iterations per virtual user
        #[arg(long)]
        iterations: Option<u32>,

        /// Directory for the .http reproduction file
        #[arg(short, long, default_value = ".apiconform")]
        output_dir: PathBuf,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for the scenario file format
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "warn,apiconform_runner=debug,apiconform_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            scenario,
            base_url,
            dry_run,
            dump,
            dump_dir,
            seed,
            vus,
            iterations,
            output_dir,
        } => {
            let mut cfg = match config {
                Some(path) => Config::load(&path)?,
                None => Config::load_default()?,
            }
            .with_env()
            .with_base_url_override(base_url);
            if let Some(scenario) = scenario {
                cfg.scenario = scenario;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            if let Some(vus) = vus {
                cfg.vus = vus;
            }
            if let Some(iterations) = iterations {
                cfg.iterations = iterations;
            }
            if dump_dir.is_some() {
                cfg.dump_dir = dump_dir;
            }
            cfg.dump |= dump;

            let runner = ScenarioRunner::from_config(&cfg)
                .with_context(|| format!("loading scenario {}", cfg.scenario.display()))?;

            if dry_run {
                let plan = runner.plan(&cfg)?;
                match cli.output {
                    OutputFormat::Terminal => println!("{}", plan.to_terminal()),
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                    OutputFormat::Silent => {}
                }
                return Ok(i32::from(plan.has_errors()));
            }

            if cli.output != OutputFormat::Silent {
                eprintln!("Config:");
                eprintln!("  scenario:   {}", cfg.scenario.display());
                eprintln!("  base_url:   {}", cfg.base_url);
                eprintln!("  vus:        {}", cfg.vus);
                eprintln!("  iterations: {}", cfg.iterations);
                if let Some(seed) = cfg.seed {
                    eprintln!("  seed:       {seed}");
                }
                eprintln!();
            }

            let started = Instant::now();
            let output = runner.run()?;
            let duration_secs = started.elapsed().as_secs_f64();

            let report = &output.report;
            let verdict = Verdict::from_report(report);
            if verdict.exit_code == EXIT_TOOL_ERROR {
                eprintln!("Error: {}. Check the scenario's groups.", verdict.reason);
                return Ok(verdict.exit_code);
            }

            let failures: Vec<_> = report.failures().cloned().collect();

            match cli.output {
                OutputFormat::Terminal => {
                    for group in &report.groups {
                        println!(
                            "[{}] {} cases: {} passed, {} failed",
                            group.group, group.total, group.passed, group.failed
                        );
                        for failure in &group.failures {
                            println!("  FAIL (vu {} iter {}) {failure}", failure.vu, failure.iteration);
                        }
                    }
                    println!("\n{}: {}", verdict.status, verdict.reason);
                    println!(
                        "  Cases: {} total, {} passed in {duration_secs:.2}s",
                        report.total(),
                        report.passed()
                    );
                    println!("  Exit code: {}", verdict.exit_code);
                }
                OutputFormat::Json => {
                    let json_output = serde_json::json!({
                        "verdict": {
                            "status": verdict.status.to_string(),
                            "exit_code": verdict.exit_code,
                            "reason": verdict.reason,
                        },
                        "report": report,
                        "duration_secs": duration_secs,
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }

            if verdict.status == VerdictStatus::Fail && !failures.is_empty() {
                write_reproductions(&failures, &cfg.base_url, &output_dir, cli.output);
            }

            if cfg.dump {
                let dump_path = cfg.dump_dir();
                match apiconform_core::dump::write_dump(&output.interactions, &dump_path, true) {
                    Ok(index) => {
                        if cli.output != OutputFormat::Silent {
                            eprintln!(
                                "Dump: {} interactions → {} ({})",
                                index.total,
                                dump_path.display(),
                                index
                                    .groups
                                    .iter()
                                    .map(|e| e.file.as_str())
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            );
                        }
                    }
                    Err(e) => eprintln!("Warning: failed to write dump: {e}"),
                }
            }

            Ok(verdict.exit_code)
        }

        Commands::Init => {
            if Path::new(CONFIG_FILE).exists() {
                eprintln!("{CONFIG_FILE} already exists");
                return Ok(1);
            }

            std::fs::write(CONFIG_FILE, Config::example())?;
            println!("Created {CONFIG_FILE}");
            println!("\nEdit the file to configure:");
            println!("  - scenario: path to your scenario file");
            println!("  - base_url: target to check");
            println!("  - cookies: session cookies sent with every case");
            println!("  - vus / iterations: parallel load");
            Ok(0)
        }

        Commands::Schema => {
            let schema = apiconform_core::scenario::generate_schema();
            println!("{schema}");
            Ok(0)
        }
    }
}

fn write_reproductions(
    failures: &[apiconform_core::Failure],
    base_url: &str,
    output_dir: &Path,
    output: OutputFormat,
) {
    let http_path = output_dir.join("failures.http");
    let content = to_http_file(failures, base_url, "base_url");
    let written = std::fs::create_dir_all(output_dir).and_then(|()| std::fs::write(&http_path, content));
    match written {
        Ok(()) => {
            if output == OutputFormat::Terminal {
                println!("Reproductions: {}", http_path.display());
            }
        }
        Err(e) => eprintln!("Warning: failed to write .http file: {e}"),
    }
}
