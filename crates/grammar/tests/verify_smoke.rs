#![allow(unused_crate_dependencies)]

//! Load verification against a real compiled grammar and against broken
//! artifacts. The compiled grammar comes from a grammar crate; the BST
//! shared library itself is a runtime artifact and is not required here.

use beast_grammar::{
	BST_DISPLAY_NAME, DylibGrammar, GrammarError, GrammarProvider, StaticGrammar,
	grammar_library_name, load_grammar_from, verify,
};

#[test]
fn test_can_load_compiled_grammar() {
	let provider =
		StaticGrammar::new("python", tree_sitter_python::language()).expect("compatible ABI");
	assert!(verify(&provider).passed());
}

#[test]
fn test_load_is_idempotent() {
	let provider =
		StaticGrammar::new("python", tree_sitter_python::language()).expect("compatible ABI");
	let first = provider.load().expect("grammar loads");
	let second = provider.load().expect("grammar loads");
	assert!(std::ptr::eq(first, second));
}

#[test]
fn test_missing_artifact_fails_with_grammar_name() {
	let dir = tempfile::tempdir().expect("tempdir");
	let provider = DylibGrammar::new("bst")
		.with_display_name(BST_DISPLAY_NAME)
		.with_search_paths(vec![dir.path().to_path_buf()]);

	let outcome = verify(&provider);
	assert!(!outcome.passed());

	let diagnostic = outcome.diagnostic().expect("failed outcome has a diagnostic");
	assert!(
		diagnostic.contains("Error loading BeaST: Bibliography STyle Language grammar"),
		"unexpected diagnostic: {diagnostic}"
	);
}

#[test]
fn test_missing_artifact_is_not_found() {
	let dir = tempfile::tempdir().expect("tempdir");
	let err = load_grammar_from("bst", &[dir.path().to_path_buf()]).unwrap_err();
	assert!(matches!(err, GrammarError::NotFound(name) if name == "bst"));
}

#[test]
fn test_corrupt_artifact_is_a_load_error() {
	let dir = tempfile::tempdir().expect("tempdir");
	let lib_path = dir.path().join(grammar_library_name("bst"));
	std::fs::write(&lib_path, b"not a shared library").expect("write fixture");

	let err = load_grammar_from("bst", &[dir.path().to_path_buf()]).unwrap_err();
	assert!(matches!(err, GrammarError::LoadError(_)), "unexpected error: {err}");
}

#[test]
fn test_corrupt_artifact_fails_verification() {
	let dir = tempfile::tempdir().expect("tempdir");
	let lib_path = dir.path().join(grammar_library_name("bst"));
	std::fs::write(&lib_path, b"\0\0\0\0").expect("write fixture");

	let provider = DylibGrammar::new("bst")
		.with_display_name(BST_DISPLAY_NAME)
		.with_search_paths(vec![dir.path().to_path_buf()]);

	let outcome = verify(&provider);
	let diagnostic = outcome.diagnostic().expect("failed outcome has a diagnostic");
	assert!(
		diagnostic.contains("Error loading BeaST: Bibliography STyle Language grammar"),
		"unexpected diagnostic: {diagnostic}"
	);
}
