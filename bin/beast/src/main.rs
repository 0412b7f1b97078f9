//! Command-line tooling for BeaST bibliography styles.
//!
//! `beast check` runs the grammar load verification; `beast dump` and
//! `beast eval` parse a style file through the loaded grammar and work on
//! the lowered functions.

mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use beast_grammar::{BST_DISPLAY_NAME, GrammarProvider, Outcome, bst_provider, verify_bst};
use beast_ir::{Module, StackMachine, Value};
use clap::Parser;
use cli::{Cli, Command};
use serde::Serialize;
use tracing::info;

fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	match cli.command {
		Command::Check => check(),
		Command::Dump { path, json } => dump(&path, json),
		Command::Eval {
			path,
			function,
			args,
		} => eval(&path, &function, &args),
	}
}

/// Runs the load-verification harness for the BST grammar.
fn check() -> anyhow::Result<ExitCode> {
	match verify_bst() {
		Outcome::Passed => {
			let grammar = bst_provider().load()?;
			println!(
				"{BST_DISPLAY_NAME} grammar loaded (ABI v{})",
				grammar.abi_version()
			);
			Ok(ExitCode::SUCCESS)
		}
		Outcome::Failed { diagnostic } => {
			eprintln!("{diagnostic}");
			Ok(ExitCode::FAILURE)
		}
	}
}

#[derive(Serialize)]
struct FunctionSummary<'a> {
	name: &'a str,
	signature: String,
	equations: usize,
}

fn dump(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
	let module = load_module(path)?;

	if json {
		let summaries: Vec<FunctionSummary<'_>> = module
			.functions()
			.map(|func| FunctionSummary {
				name: &func.name,
				signature: func.expr.signature(),
				equations: func.expr.equations.len(),
			})
			.collect();
		println!("{}", serde_json::to_string_pretty(&summaries)?);
	} else {
		for func in module.functions() {
			println!("{func}");
		}
	}

	Ok(ExitCode::SUCCESS)
}

fn eval(path: &Path, function: &str, args: &[String]) -> anyhow::Result<ExitCode> {
	let module = load_module(path)?;
	let func = module
		.get_function(function)
		.with_context(|| format!("no function `{function}` in {}", path.display()))?;

	info!(function, signature = %func.expr.signature(), "evaluating");

	let mut stack: Vec<Value> = args.iter().map(|arg| parse_value(arg)).collect();
	let mut machine = StackMachine::new();
	machine
		.run(&func.expr, &mut stack)
		.with_context(|| format!("evaluating `{function}`"))?;

	if !machine.output().is_empty() {
		print!("{}", machine.output());
	}
	for value in &stack {
		println!("{value}");
	}

	Ok(ExitCode::SUCCESS)
}

fn load_module(path: &Path) -> anyhow::Result<Module> {
	let grammar = bst_provider()
		.load()
		.with_context(|| format!("loading the {BST_DISPLAY_NAME} grammar"))?;
	Module::from_path(path, grammar).with_context(|| format!("parsing {}", path.display()))
}

fn parse_value(arg: &str) -> Value {
	match arg.parse() {
		Ok(int) => Value::Int(int),
		Err(_) => Value::Str(arg.to_string()),
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("beast=debug,beast_grammar=debug,beast_ir=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
