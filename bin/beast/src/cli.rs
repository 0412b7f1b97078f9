use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "beast")]
#[command(about = "Tooling for the BeaST bibliography style language")]
#[command(version)]
pub struct Cli {
	/// Verbose logging
	#[arg(long, short = 'v', global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Verify that the compiled BST grammar loads
	Check,
	/// Parse a style file and print its lowered functions
	Dump {
		/// Style file to parse
		path: PathBuf,

		/// Emit machine-readable summaries instead of pretty-printing
		#[arg(long)]
		json: bool,
	},
	/// Evaluate one function from a style file
	Eval {
		/// Style file to parse
		path: PathBuf,

		/// Function to evaluate
		#[arg(long, short = 'f')]
		function: String,

		/// Initial stack values, bottom first; integers where they parse,
		/// strings otherwise
		args: Vec<String>,
	},
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::Cli;

	#[test]
	fn test_cli_is_well_formed() {
		Cli::command().debug_assert();
	}
}
