//! Lowering of parse trees into equation form.
//!
//! Function bodies in BST are postfix: terms push literals, references and
//! blocks, and primitives consume whatever is on the stack. `reduce`
//! replays that discipline abstractly: it keeps a virtual stack of
//! operands, synthesizes fresh input variables when a primitive pops more
//! than the body has pushed so far, and emits one equation per term.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use tree_sitter::Node;

use crate::expr::{Eq, Expr, Func, Operand, Value, VarId};
use crate::primitive::Primitive;

/// Errors that can occur while lowering a parse tree.
#[derive(Error, Debug)]
pub enum LowerError {
	/// Top-level statement kind not part of the BST language.
	#[error("unknown statement of type `{0}`")]
	UnknownStatement(String),

	/// Operator spelling without a primitive.
	#[error("unknown operator `{0}`")]
	UnknownOperator(String),

	/// Built-in spelling without a primitive.
	#[error("unknown built-in `{0}`")]
	UnknownBuiltin(String),

	/// Term kind not part of a function block.
	#[error("unknown term of type `{0}`")]
	UnknownTerm(String),

	/// Node is missing a field its kind requires.
	#[error("`{kind}` node is missing its `{field}` field")]
	MissingField {
		/// Node kind.
		kind: &'static str,
		/// Missing field name.
		field: &'static str,
	},

	/// Integer literal that does not fit an `i64`.
	#[error("invalid integer literal `{0}`")]
	InvalidInteger(String),

	/// Parse tree contains a syntax error.
	#[error("syntax error at {row}:{column}")]
	Syntax {
		/// Zero-based row of the error node.
		row: usize,
		/// Zero-based column of the error node.
		column: usize,
	},

	/// Source is not valid UTF-8.
	#[error("invalid UTF-8 in source: {0}")]
	Utf8(#[from] std::str::Utf8Error),
}

/// A term of a function body prior to reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
	/// Literal value.
	Lit(Value),
	/// Named variable or function reference.
	Sym(String),
	/// Primitive operation.
	Prim(Primitive),
	/// Nested block.
	Block(Vec<Term>),
}

/// Lowers a `function` statement node into a named function.
pub(crate) fn lower_function(node: Node<'_>, source: &[u8]) -> Result<Func, LowerError> {
	let name = field_text(node, "function", "name", source)?.to_string();
	let body = node
		.child_by_field_name("body")
		.ok_or(LowerError::MissingField {
			kind: "function",
			field: "body",
		})?;
	let terms = block_terms(body, source)?;
	let expr = reduce(&terms);
	Ok(Func { name, expr })
}

/// Collects the terms of a `block` node.
pub(crate) fn block_terms(node: Node<'_>, source: &[u8]) -> Result<Vec<Term>, LowerError> {
	let mut terms = Vec::new();
	let mut cursor = node.walk();

	for term in node.children_by_field_name("term", &mut cursor) {
		match term.kind() {
			"integer" => {
				let text = field_text(term, "integer", "value", source)?;
				let value = text
					.parse()
					.map_err(|_| LowerError::InvalidInteger(text.to_string()))?;
				terms.push(Term::Lit(Value::Int(value)));
			}
			"string" => {
				let value = field_text(term, "string", "value", source)?;
				terms.push(Term::Lit(Value::Str(value.to_string())));
			}
			"ref" => {
				let symbol = field_text(term, "ref", "symbol", source)?;
				terms.push(Term::Sym(symbol.to_string()));
			}
			// Identifiers carry no declared type in BST; resolution is
			// deferred to evaluation, and variables are not distinguished
			// from references.
			"id" => terms.push(Term::Sym(node_text(term, source)?.to_string())),
			"operator" => {
				let text = node_text(term, source)?;
				let prim = Primitive::from_name(text)
					.ok_or_else(|| LowerError::UnknownOperator(text.to_string()))?;
				terms.push(Term::Prim(prim));
			}
			"builtin" => {
				let text = node_text(term, source)?;
				let prim = Primitive::from_name(text)
					.ok_or_else(|| LowerError::UnknownBuiltin(text.to_string()))?;
				terms.push(Term::Prim(prim));
			}
			"block" => terms.push(Term::Block(block_terms(term, source)?)),
			"comment" => {}
			other => return Err(LowerError::UnknownTerm(other.to_string())),
		}
	}

	Ok(terms)
}

fn field_text<'s>(
	node: Node<'_>,
	kind: &'static str,
	field: &'static str,
	source: &'s [u8],
) -> Result<&'s str, LowerError> {
	let child = node
		.child_by_field_name(field)
		.ok_or(LowerError::MissingField { kind, field })?;
	node_text(child, source)
}

fn node_text<'s>(node: Node<'_>, source: &'s [u8]) -> Result<&'s str, LowerError> {
	Ok(node.utf8_text(source)?)
}

/// Lowers a term list into equation form.
pub fn reduce(terms: &[Term]) -> Expr {
	let mut lowering = Lowering::default();
	lowering.lower(terms);
	lowering.finish()
}

#[derive(Default)]
struct Lowering {
	next_var: u32,
	equations: Vec<Eq>,
	inputs: Vec<VarId>,
	stack: Vec<Operand>,
	/// Constant bindings of temporaries, used to see through `const`
	/// equations when sizing `if$` results.
	known: HashMap<VarId, Value>,
}

impl Lowering {
	fn fresh(&mut self) -> VarId {
		let id = VarId(self.next_var);
		self.next_var += 1;
		id
	}

	fn lower(&mut self, terms: &[Term]) {
		for term in terms {
			match term {
				Term::Lit(value) => self.push_const(value.clone()),
				Term::Block(inner) => {
					let expr = reduce(inner);
					self.push_const(Value::Block(Arc::new(expr)));
				}
				Term::Sym(name) => {
					let out = self.fresh();
					self.equations.push(Eq {
						primitive: Primitive::Resolve,
						params: vec![Operand::Sym(name.clone())],
						inputs: Vec::new(),
						outputs: vec![out],
					});
					self.stack.push(Operand::Var(out));
				}
				Term::Prim(primitive) => self.apply(*primitive),
			}
		}
	}

	fn push_const(&mut self, value: Value) {
		let out = self.fresh();
		self.known.insert(out, value.clone());
		self.equations.push(Eq {
			primitive: Primitive::Const,
			params: vec![Operand::Lit(value)],
			inputs: Vec::new(),
			outputs: vec![out],
		});
		self.stack.push(Operand::Var(out));
	}

	fn apply(&mut self, primitive: Primitive) {
		let arity = primitive.arity();

		// A primitive popping more than the body has pushed consumes
		// values from the caller's stack; record them as inputs.
		while self.stack.len() < arity {
			let input = self.fresh();
			self.inputs.push(input);
			self.stack.insert(0, Operand::Var(input));
		}

		let args = self.stack.split_off(self.stack.len() - arity);
		let width = match primitive.results() {
			Some(width) => width,
			None => self.branch_width(&args),
		};

		let outputs: Vec<VarId> = (0..width).map(|_| self.fresh()).collect();
		self.stack
			.extend(outputs.iter().map(|out| Operand::Var(*out)));
		self.equations.push(Eq {
			primitive,
			params: Vec::new(),
			inputs: args,
			outputs,
		});
	}

	/// Result width of an `if$` whose branches are known blocks.
	fn branch_width(&self, args: &[Operand]) -> usize {
		let [_, then_branch, else_branch] = args else {
			return 0;
		};
		match (self.block_of(then_branch), self.block_of(else_branch)) {
			(Some(then_expr), Some(else_expr)) => {
				then_expr.num_outputs().max(else_expr.num_outputs())
			}
			_ => {
				debug!("if$ branch shapes unknown, assuming no results");
				0
			}
		}
	}

	fn block_of<'a>(&'a self, operand: &'a Operand) -> Option<&'a Expr> {
		let value = match operand {
			Operand::Var(id) => self.known.get(id)?,
			Operand::Lit(value) => value,
			Operand::Sym(_) => return None,
		};
		match value {
			Value::Block(expr) => Some(expr),
			_ => None,
		}
	}

	fn finish(self) -> Expr {
		Expr {
			equations: self.equations,
			inputs: self.inputs,
			outputs: self.stack,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_underflow_synthesizes_inputs() {
		let expr = reduce(&[Term::Prim(Primitive::Add)]);
		assert_eq!(expr.signature(), "2 -> 1");
		assert_eq!(expr.equations.len(), 1);
	}

	#[test]
	fn test_literals_become_const_equations() {
		let expr = reduce(&[
			Term::Lit(Value::Int(1)),
			Term::Lit(Value::Int(2)),
			Term::Prim(Primitive::Add),
		]);
		assert_eq!(expr.signature(), "0 -> 1");
		assert_eq!(expr.equations.len(), 3);
		assert_eq!(expr.equations[0].primitive, Primitive::Const);
		assert_eq!(expr.equations[2].primitive, Primitive::Add);
	}

	#[test]
	fn test_if_width_from_block_branches() {
		let expr = reduce(&[
			Term::Block(vec![Term::Lit(Value::Int(0))]),
			Term::Block(vec![Term::Lit(Value::Int(1))]),
			Term::Prim(Primitive::If),
		]);
		// Predicate comes from the caller; each branch leaves one value.
		assert_eq!(expr.signature(), "1 -> 1");
	}

	#[test]
	fn test_if_width_unknown_for_symbol_branches() {
		let expr = reduce(&[
			Term::Sym("then.fn".into()),
			Term::Sym("else.fn".into()),
			Term::Prim(Primitive::If),
		]);
		assert_eq!(expr.num_outputs(), 0);
	}

	#[test]
	fn test_nested_block_is_a_single_push() {
		let expr = reduce(&[Term::Block(vec![
			Term::Prim(Primitive::Pop),
			Term::Lit(Value::Int(0)),
		])]);
		assert_eq!(expr.signature(), "0 -> 1");
		let Some(Operand::Var(id)) = expr.outputs.first() else {
			panic!("expected a temporary on the abstract stack");
		};
		assert_eq!(*id, VarId(0));
	}

	#[test]
	fn test_assign_leaves_nothing() {
		let expr = reduce(&[
			Term::Lit(Value::Int(5)),
			Term::Sym("x".into()),
			Term::Prim(Primitive::Assign),
		]);
		assert_eq!(expr.signature(), "0 -> 0");
	}
}
