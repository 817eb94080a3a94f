use std::path::PathBuf;
use std::process::ExitCode;

use changecheck_harness::report::error_chain;
use changecheck_harness::{HarnessConfig, Reporting, run_suite};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Format {
	Text,
	Json,
}

/// Run statement sequences against SQLite and check every reported change count.
#[derive(Debug, Parser)]
#[command(name = "changecheck", version)]
struct Cli {
	/// TOML file with harness settings
	#[arg(long)]
	config: Option<PathBuf>,

	/// Where reported changes are read from
	#[arg(long, value_enum)]
	reporting: Option<Reporting>,

	/// Longest enumerated statement sequence
	#[arg(long)]
	depth: Option<usize>,

	/// Skip the enumerated sequences
	#[arg(long)]
	catalog_only: bool,

	#[arg(long, value_enum, default_value_t = Format::Text)]
	format: Format,

	/// List passing scenarios too
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> ExitCode {
	init_tracing();
	let cli = Cli::parse();

	let config = match load_config(&cli) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("error: {}", error_chain(&err));
			return ExitCode::from(2);
		}
	};

	let scenarios = config.scenarios();
	let report = run_suite(&config, &scenarios);

	match cli.format {
		Format::Text => print!("{}", report.render_text(cli.verbose)),
		Format::Json => match report.to_json() {
			Ok(json) => println!("{json}"),
			Err(err) => {
				eprintln!("error: failed to serialize report: {err}");
				return ExitCode::from(2);
			}
		},
	}

	match report.into_result() {
		Ok(_) => ExitCode::SUCCESS,
		Err(err) if err.is_expectation_failure() => ExitCode::from(1),
		Err(_) => ExitCode::from(2),
	}
}

fn load_config(cli: &Cli) -> changecheck_harness::Result<HarnessConfig> {
	let mut config = match &cli.config {
		Some(path) => HarnessConfig::load(path)?,
		None => HarnessConfig::default(),
	};

	if let Some(reporting) = cli.reporting {
		config.reporting = reporting;
	}
	if let Some(depth) = cli.depth {
		config.depth = depth;
	}
	if cli.catalog_only {
		config.permutations = false;
	}

	config.validate()?;
	Ok(config)
}

fn init_tracing() {
	let _ = tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_ansi(false))
		.with(EnvFilter::from_default_env())
		.try_init();
}
