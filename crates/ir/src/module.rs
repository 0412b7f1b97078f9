//! BST modules: parse-tree walking and function assembly.
//!
//! A module is the set of functions a style file declares, in declaration
//! order. Declarations without bodies (`ENTRY`, `INTEGERS`, `STRINGS`,
//! `MACRO`) and the control commands (`READ`, `EXECUTE`, `ITERATE`,
//! `SORT`, `REVERSE`) are recognized and skipped.

use std::fs;
use std::path::Path;

use beast_grammar::Grammar;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;
use tree_sitter::Parser;

use crate::expr::Func;
use crate::lower::{self, LowerError};

/// Errors that can occur while building a module.
#[derive(Error, Debug)]
pub enum ModuleError {
	/// The grammar was rejected by the parser (ABI mismatch).
	#[error("grammar rejected by parser: {0}")]
	Language(#[from] tree_sitter::LanguageError),

	/// The parser produced no tree.
	#[error("parser returned no tree")]
	Parse,

	/// Nothing to parse.
	#[error("empty or malformed BST source file")]
	Empty,

	/// Two functions declared under the same name.
	#[error("duplicated declaration of function `{0}`")]
	DuplicateFunction(String),

	/// Lowering failure.
	#[error(transparent)]
	Lower(#[from] LowerError),

	/// Filesystem I/O error.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// A parsed BST module: the functions it declares, in order.
#[derive(Debug, Clone, Default)]
pub struct Module {
	funcs: IndexMap<String, Func>,
}

impl Module {
	/// Reads and parses a style file.
	pub fn from_path(path: &Path, grammar: &Grammar) -> Result<Self, ModuleError> {
		let source = fs::read_to_string(path)?;
		Self::from_source(&source, grammar)
	}

	/// Parses style source text.
	pub fn from_source(source: &str, grammar: &Grammar) -> Result<Self, ModuleError> {
		let mut parser = Parser::new();
		parser.set_language(grammar.language())?;

		let tree = parser.parse(source, None).ok_or(ModuleError::Parse)?;
		let root = tree.root_node();
		if root.named_child_count() == 0 {
			return Err(ModuleError::Empty);
		}

		let mut funcs = IndexMap::new();
		let mut cursor = root.walk();
		for statement in root.named_children(&mut cursor) {
			if statement.is_error() {
				let start = statement.start_position();
				return Err(LowerError::Syntax {
					row: start.row,
					column: start.column,
				}
				.into());
			}

			match statement.kind() {
				"function" => {
					let func = lower::lower_function(statement, source.as_bytes())?;
					trace!(
						function = %func.name,
						signature = %func.expr.signature(),
						"lowered function"
					);
					if funcs.contains_key(&func.name) {
						return Err(ModuleError::DuplicateFunction(func.name));
					}
					funcs.insert(func.name.clone(), func);
				}
				// Declarations and control commands carry no function
				// bodies.
				"entry" | "integers" | "strings" | "macro" | "read" | "execute" | "iterate"
				| "sort" | "reverse" => {
					trace!(kind = statement.kind(), "skipping statement");
				}
				"comment" => {}
				other => return Err(LowerError::UnknownStatement(other.to_string()).into()),
			}
		}

		Ok(Self { funcs })
	}

	/// Declared functions, in declaration order.
	pub fn functions(&self) -> impl Iterator<Item = &Func> {
		self.funcs.values()
	}

	/// Declared function names, in declaration order.
	pub fn list_functions(&self) -> Vec<&str> {
		self.funcs.keys().map(String::as_str).collect()
	}

	/// Looks up a function by name.
	pub fn get_function(&self, name: &str) -> Option<&Func> {
		self.funcs.get(name)
	}

	/// Number of declared functions.
	pub fn len(&self) -> usize {
		self.funcs.len()
	}

	/// True if the module declares no functions.
	pub fn is_empty(&self) -> bool {
		self.funcs.is_empty()
	}
}
