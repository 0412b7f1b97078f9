//! Load verification harness.
//!
//! Loads a grammar through a provider and reports whether a valid
//! descriptor came back. A load failure is structural (a bad or missing
//! build artifact), not transient, so there is exactly one attempt and no
//! retry. The outcome is terminal on first evaluation.

use tracing::{debug, error};

use crate::provider::{GrammarProvider, bst_provider};

/// Result of a single verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// The provider produced a valid descriptor.
	Passed,
	/// The provider failed; the diagnostic names the grammar.
	Failed {
		/// Human-readable failure description.
		diagnostic: String,
	},
}

impl Outcome {
	/// True if the grammar loaded.
	pub fn passed(&self) -> bool {
		matches!(self, Outcome::Passed)
	}

	/// The diagnostic, if the verification failed.
	pub fn diagnostic(&self) -> Option<&str> {
		match self {
			Outcome::Passed => None,
			Outcome::Failed { diagnostic } => Some(diagnostic),
		}
	}
}

/// Verifies that the provider's grammar loads.
pub fn verify(provider: &dyn GrammarProvider) -> Outcome {
	match provider.load() {
		Ok(grammar) => {
			debug!(
				grammar = grammar.name(),
				abi = grammar.abi_version(),
				"grammar loaded"
			);
			Outcome::Passed
		}
		Err(err) => {
			error!(grammar = provider.name(), %err, "grammar failed to load");
			Outcome::Failed {
				diagnostic: format!("Error loading {} grammar: {err}", provider.display_name()),
			}
		}
	}
}

/// Verifies the default BST grammar.
pub fn verify_bst() -> Outcome {
	verify(bst_provider())
}
