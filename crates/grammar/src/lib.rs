// Diagnostics go through tracing or the verification outcome, not stderr
#![deny(clippy::print_stderr)]

//! Grammar loading for the BeaST bibliography style language.
//!
//! BST grammars are compiled tree-sitter parsers. This crate locates and
//! loads them, validates the returned handle, and reports whether the
//! grammar the workspace exists for actually loads.
//!
//! # Architecture
//!
//! * [`descriptor`]: the opaque [`Grammar`] handle and ABI validation
//! * [`load`]: shared-library loading and runtime search paths
//! * [`provider`]: the [`GrammarProvider`] capability interface
//! * [`verify`]: the load-verification harness
//!
//! The parse trees themselves are produced by the `tree-sitter` runtime;
//! this crate only hands it a valid [`tree_sitter::Language`].

pub mod descriptor;
pub mod load;
pub mod provider;
pub mod verify;

pub use descriptor::Grammar;
pub use load::{
	GrammarError, cache_dir, grammar_library_name, grammar_search_paths, load_grammar,
	load_grammar_from, load_grammar_from_path, runtime_dir,
};
pub use provider::{BST_DISPLAY_NAME, DylibGrammar, GrammarProvider, StaticGrammar, bst_provider};
pub use verify::{Outcome, verify, verify_bst};
