//! huginn: run queries through the pipeline from stdin.
//!
//! Reads one query per line, prints each response, and prints a metrics
//! snapshot at end of input. Useful for tuning thresholds and rules against
//! a real backend.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use huginn::{Config, HuginnBuilder, PipelineResponse, ResponseSource};

/// Query intake pipeline driver.
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version)]
#[command(about = "Run queries from stdin through the huginn pipeline")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "HUGINN_CONFIG")]
    config: Option<PathBuf>,

    /// Print one JSON object per response instead of plain text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::load_or_default(args.config.as_deref())?;
    let pipeline = HuginnBuilder::from_config(&config)?.build()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        match pipeline.process(query).await {
            Ok(response) if args.json => println!("{}", serde_json::to_string(&response)?),
            Ok(response) => print_response(&response),
            Err(e) if args.json => {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    let snapshot = pipeline.metrics().snapshot();
    if args.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("---");
        println!("queries:             {}", snapshot.total_queries);
        println!(
            "cache hits/misses:   {}/{} ({:.1}%)",
            snapshot.cache_hits,
            snapshot.cache_misses,
            snapshot.cache_hit_rate * 100.0
        );
        println!(
            "routes fast/smart:   {}/{}",
            snapshot.fast_routes, snapshot.smart_routes
        );
        println!(
            "guardrail triggers:  {} ({} rejected, {} flagged)",
            snapshot.guardrail_triggers, snapshot.input_rejections, snapshot.output_flags
        );
        println!("generation failures: {}", snapshot.generation_failures);
        println!("average latency:     {:.1} ms", snapshot.average_latency_ms);
    }

    Ok(())
}

fn print_response(response: &PipelineResponse) {
    let origin = match (&response.source, &response.routing) {
        (ResponseSource::Cache { similarity }, _) => format!("cache, similarity {similarity:.3}"),
        (ResponseSource::Guardrail, _) => "rejected".to_string(),
        (ResponseSource::Generated, Some(routing)) => {
            format!("{} tier, {}", routing.tier, routing.model)
        }
        (ResponseSource::Generated, None) => "generated".to_string(),
    };
    let flag = if response.flagged { " [flagged]" } else { "" };
    println!(
        "[{origin}, {} ms]{flag} {}",
        response.latency.as_millis(),
        response.content
    );
}
