#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use possibilist_harness::elicitation::{ElicitationConfig, JsonlTraceSink, TraceSink};
use possibilist_harness::simulation::{batch_specs, run_batch, ConfidenceProfile, RunStatus, Scenario};

#[derive(Parser)]
#[command(name = "elicit", version, about = "Possibilistic preference elicitation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of synthetic scenarios and write one summary per line
    Simulate {
        #[arg(long, default_value_t = 10)]
        runs: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 20)]
        alternatives: usize,
        #[arg(long, default_value_t = 4)]
        criteria: usize,
        #[arg(long, default_value_t = 10)]
        questions: usize,
        /// strong | weak | intermediate | uniform
        #[arg(long, default_value = "uniform")]
        confidence: String,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run one scenario from JSON input
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        trace: Option<PathBuf>,
    },
    /// Print the default configuration as JSON
    Config,
}

fn load_config(path: Option<PathBuf>) -> Result<ElicitationConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => ElicitationConfig::from_path(path)?,
        None => ElicitationConfig::default(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            runs,
            seed,
            alternatives,
            criteria,
            questions,
            confidence,
            config,
            threads,
            out,
        } => {
            let config = load_config(config)?;
            let profile: ConfidenceProfile = confidence.parse()?;
            let specs = batch_specs(runs, seed, alternatives, criteria, questions, profile);
            let summaries = run_batch(&specs, &config, threads)?;

            let mut writer = BufWriter::new(File::create(out)?);
            for summary in &summaries {
                writeln!(writer, "{}", serde_json::to_string(summary)?)?;
            }
            writer.flush()?;

            let completed = summaries
                .iter()
                .filter(|s| s.status == RunStatus::Completed)
                .count();
            println!("{completed}/{} runs completed", summaries.len());
        }
        Commands::Run {
            input,
            out,
            config,
            trace,
        } => {
            let config = load_config(config)?;
            let scenario: Scenario = serde_json::from_str(&std::fs::read_to_string(input)?)?;

            let (alternatives, outcome) = match trace {
                Some(path) => {
                    let sink = JsonlTraceSink::create(path)?;
                    let result = scenario.run(&config, Some(&sink as &dyn TraceSink));
                    sink.finish()?;
                    result?
                }
                None => scenario.run(&config, None)?,
            };

            std::fs::write(&out, serde_json::to_string_pretty(&outcome)?)?;
            println!(
                "best alternative {} (input row {}), estimated regret {:.6}, {} rounds, {} of {} alternatives kept",
                outcome.best_alternative,
                outcome.best_original_index,
                outcome.estimated_regret,
                outcome.rounds,
                alternatives.len(),
                scenario.alternatives.len()
            );
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&ElicitationConfig::default())?);
        }
    }

    Ok(())
}
