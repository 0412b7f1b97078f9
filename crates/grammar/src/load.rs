//! Locating and loading compiled grammar libraries.
//!
//! Grammars are compiled tree-sitter parsers loaded from shared libraries.
//! A grammar library exports a single `tree_sitter_<name>` function that
//! returns the raw language handle.
//!
//! # Runtime Directory
//!
//! Runtime data lives in `~/.local/share/beast/`. The `BEAST_RUNTIME`
//! environment variable overrides it during development, and the workspace
//! `target/grammars` directory is checked first when running under cargo.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use thiserror::Error;
use tracing::debug;
use tree_sitter::Language;

use crate::Grammar;

/// Errors that can occur when loading a grammar.
#[derive(Error, Debug)]
pub enum GrammarError {
	/// Grammar library not found in any search path.
	#[error("grammar not found: {0}")]
	NotFound(String),

	/// Failed to load the dynamic library.
	#[error("failed to load grammar library: {0}")]
	LoadError(String),

	/// Grammar library exists but doesn't export the expected symbol.
	#[error("grammar library missing language function: {0}")]
	MissingSymbol(String),

	/// Grammar was generated against an unsupported tree-sitter ABI.
	#[error(
		"grammar {name} has incompatible ABI version {version} (supported: {min}..={max})",
		min = tree_sitter::MIN_COMPATIBLE_LANGUAGE_VERSION,
		max = tree_sitter::LANGUAGE_VERSION
	)]
	IncompatibleVersion {
		/// Grammar name.
		name: String,
		/// ABI version reported by the loaded library.
		version: usize,
	},

	/// Filesystem I/O error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Loads a grammar by name from the default search paths.
///
/// Searches all configured grammar directories for a matching shared
/// library. If the grammar is not found, returns [`GrammarError::NotFound`].
pub fn load_grammar(name: &str) -> Result<Grammar, GrammarError> {
	load_grammar_from(name, &grammar_search_paths())
}

/// Loads a grammar by name from explicit directories.
pub fn load_grammar_from(name: &str, search_paths: &[PathBuf]) -> Result<Grammar, GrammarError> {
	let lib_name = grammar_library_name(name);

	for dir in search_paths {
		let lib_path = dir.join(&lib_name);

		if lib_path.exists() {
			return load_grammar_from_path(&lib_path, name);
		}
	}

	Err(GrammarError::NotFound(name.to_string()))
}

/// Loads a grammar from a specific shared library path.
pub fn load_grammar_from_path(path: &Path, name: &str) -> Result<Grammar, GrammarError> {
	debug!(grammar = name, path = %path.display(), "loading grammar library");

	// SAFETY: loading a tree-sitter grammar library; its only initializer
	// is the exported language function.
	let library = unsafe { Library::new(path) }
		.map_err(|e| GrammarError::LoadError(format!("{}: {}", path.display(), e)))?;

	let symbol_name = format!("tree_sitter_{}", name.replace('-', "_"));

	// SAFETY: grammar libraries export `tree_sitter_<name>` with exactly
	// this signature.
	let language = unsafe {
		let language_fn: Symbol<unsafe extern "C" fn() -> Language> = library
			.get(symbol_name.as_bytes())
			.map_err(|_| GrammarError::MissingSymbol(symbol_name.clone()))?;
		language_fn()
	};

	// The language data lives inside the library; keep it mapped for the
	// rest of the process lifetime.
	std::mem::forget(library);

	Grammar::new(name, language)
}

/// Returns the platform-specific library filename for a grammar.
pub fn grammar_library_name(name: &str) -> String {
	let safe_name = name.replace('-', "_");
	#[cfg(target_os = "macos")]
	{
		format!("lib{safe_name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{safe_name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{safe_name}.so")
	}
}

/// Returns the primary runtime directory: `~/.local/share/beast/`.
pub fn runtime_dir() -> PathBuf {
	if let Ok(runtime) = std::env::var("BEAST_RUNTIME") {
		return PathBuf::from(runtime);
	}

	data_local_dir()
		.map(|d| d.join("beast"))
		.unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the cache directory: `~/.cache/beast/`.
pub fn cache_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_CACHE_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
			.map(|p| p.join("beast"))
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(|p| PathBuf::from(p).join("beast").join("cache"))
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

/// Returns directories to search for compiled grammar libraries.
pub fn grammar_search_paths() -> Vec<PathBuf> {
	let mut dirs = Vec::new();

	if let Ok(runtime) = std::env::var("BEAST_RUNTIME") {
		dirs.push(PathBuf::from(runtime).join("grammars"));
	}

	if let Ok(manifest) = std::env::var("CARGO_MANIFEST_DIR")
		&& let Some(workspace) = PathBuf::from(manifest).ancestors().nth(2)
	{
		dirs.push(workspace.join("target").join("grammars"));
	}

	if let Some(cache) = cache_dir() {
		dirs.push(cache.join("grammars"));
	}

	if let Some(data) = data_local_dir() {
		dirs.push(data.join("beast").join("grammars"));
	}

	if let Ok(exe_path) = std::env::current_exe()
		&& let Some(exe_dir) = exe_path.parent()
	{
		dirs.push(exe_dir.join("grammars"));
	}

	dirs
}

/// Returns the platform-specific local data directory.
fn data_local_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_DATA_HOME")
			.map(PathBuf::from)
			.or_else(|| {
				std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
			})
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_grammar_search_paths_not_empty() {
		let dirs = grammar_search_paths();
		assert!(!dirs.is_empty());
	}

	#[test]
	fn test_grammar_library_name() {
		let name = grammar_library_name("bst");
		#[cfg(target_os = "linux")]
		assert_eq!(name, "libbst.so");
		#[cfg(target_os = "macos")]
		assert_eq!(name, "libbst.dylib");
		#[cfg(target_os = "windows")]
		assert_eq!(name, "bst.dll");
	}

	#[test]
	fn test_library_name_replaces_dashes() {
		assert!(grammar_library_name("bst-strict").contains("bst_strict"));
	}

	#[test]
	fn test_cache_dir_is_some() {
		#[cfg(unix)]
		assert!(cache_dir().is_some());
	}
}
