//! Capability interface over grammar sources.
//!
//! The harness and every other consumer go through [`GrammarProvider`], so
//! the grammar can come from a shared library on disk, a grammar crate
//! linked into the binary, or a substitute in tests.

use std::path::PathBuf;
use std::sync::OnceLock;

use tree_sitter::Language;

use crate::{Grammar, GrammarError, load};

/// Display name of the grammar this workspace exists for.
pub const BST_DISPLAY_NAME: &str = "BeaST: Bibliography STyle Language";

/// A source of loaded grammars.
///
/// Implementations cache the descriptor: within one provider, every call
/// to [`GrammarProvider::load`] observes the same handle. Failure is
/// reported through [`GrammarError`]; a failed load is structural (bad or
/// missing artifact), so implementations never retry.
pub trait GrammarProvider {
	/// Grammar identifier, e.g. `"bst"`.
	fn name(&self) -> &str;

	/// Human-readable name used in diagnostics.
	fn display_name(&self) -> &str {
		self.name()
	}

	/// Returns the loaded descriptor, loading on first use.
	fn load(&self) -> Result<&Grammar, GrammarError>;
}

/// Loads a grammar from a shared library on the search paths.
#[derive(Debug)]
pub struct DylibGrammar {
	name: String,
	display_name: Option<String>,
	search_paths: Vec<PathBuf>,
	cell: OnceLock<Grammar>,
}

impl DylibGrammar {
	/// Creates a provider over the default search paths.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			display_name: None,
			search_paths: load::grammar_search_paths(),
			cell: OnceLock::new(),
		}
	}

	/// Overrides the name used in diagnostics.
	#[must_use]
	pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
		self.display_name = Some(display_name.into());
		self
	}

	/// Replaces the search paths, e.g. with a test fixture directory.
	#[must_use]
	pub fn with_search_paths(mut self, search_paths: Vec<PathBuf>) -> Self {
		self.search_paths = search_paths;
		self
	}
}

impl GrammarProvider for DylibGrammar {
	fn name(&self) -> &str {
		&self.name
	}

	fn display_name(&self) -> &str {
		self.display_name.as_deref().unwrap_or(&self.name)
	}

	fn load(&self) -> Result<&Grammar, GrammarError> {
		if let Some(grammar) = self.cell.get() {
			return Ok(grammar);
		}

		let grammar = load::load_grammar_from(&self.name, &self.search_paths)?;
		Ok(self.cell.get_or_init(|| grammar))
	}
}

/// A grammar linked into the binary, e.g. from a grammar crate.
#[derive(Debug)]
pub struct StaticGrammar {
	display_name: Option<String>,
	grammar: Grammar,
}

impl StaticGrammar {
	/// Wraps a compiled-in language handle.
	pub fn new(name: impl Into<String>, language: Language) -> Result<Self, GrammarError> {
		Ok(Self {
			display_name: None,
			grammar: Grammar::new(name, language)?,
		})
	}

	/// Overrides the name used in diagnostics.
	#[must_use]
	pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
		self.display_name = Some(display_name.into());
		self
	}
}

impl GrammarProvider for StaticGrammar {
	fn name(&self) -> &str {
		self.grammar.name()
	}

	fn display_name(&self) -> &str {
		self.display_name.as_deref().unwrap_or_else(|| self.grammar.name())
	}

	fn load(&self) -> Result<&Grammar, GrammarError> {
		Ok(&self.grammar)
	}
}

/// The process-wide provider for the BST grammar.
///
/// The descriptor is loaded once and shared; repeated calls observe the
/// same provider and therefore the same handle.
pub fn bst_provider() -> &'static DylibGrammar {
	static BST: OnceLock<DylibGrammar> = OnceLock::new();
	BST.get_or_init(|| DylibGrammar::new("bst").with_display_name(BST_DISPLAY_NAME))
}
