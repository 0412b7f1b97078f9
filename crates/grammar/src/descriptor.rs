//! Opaque descriptors for loaded grammars.

use std::fmt;

use tree_sitter::{LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION};

use crate::GrammarError;

/// A loaded, ABI-validated grammar.
///
/// Wraps the raw [`Language`] handle produced by the tree-sitter runtime.
/// The symbol tables behind the handle are owned by the runtime; this type
/// only carries the handle plus the name it was loaded under.
#[derive(Clone)]
pub struct Grammar {
	name: String,
	language: Language,
}

impl Grammar {
	/// Wraps a raw language handle, rejecting incompatible ABI versions.
	pub fn new(name: impl Into<String>, language: Language) -> Result<Self, GrammarError> {
		let name = name.into();
		let version = language.version();
		if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
			return Err(GrammarError::IncompatibleVersion { name, version });
		}
		Ok(Self { name, language })
	}

	/// Name the grammar was loaded under, e.g. `"bst"`.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The raw handle, for handing to a [`tree_sitter::Parser`].
	pub fn language(&self) -> &Language {
		&self.language
	}

	/// ABI version the grammar was generated against.
	pub fn abi_version(&self) -> usize {
		self.language.version()
	}
}

impl fmt::Debug for Grammar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Grammar")
			.field("name", &self.name)
			.field("abi_version", &self.abi_version())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_wraps_compiled_language() {
		let grammar = Grammar::new("python", tree_sitter_python::language()).unwrap();
		assert_eq!(grammar.name(), "python");
		assert!(grammar.abi_version() >= MIN_COMPATIBLE_LANGUAGE_VERSION);
		assert!(grammar.abi_version() <= LANGUAGE_VERSION);
	}
}
