//! Concrete evaluation of lowered functions on a stack machine.
//!
//! The machine walks the equation list front to back. `const` and
//! `resolve` equations push; every other primitive pops its operands off
//! the live stack. Values a function consumes beyond what its own body
//! pushed come from the initial stack the caller supplies, matching the
//! inputs synthesized during lowering.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::expr::{Eq, Expr, Operand, Value};
use crate::primitive::Primitive;

/// Errors that can occur during evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
	/// Failure while evaluating one equation; `step` is 1-based.
	#[error("failed to evaluate equation {step}: {source}")]
	Step {
		/// 1-based index of the failing equation.
		step: usize,
		/// Underlying failure.
		#[source]
		source: Box<EvalError>,
	},

	/// A primitive popped an empty stack.
	#[error("stack underflow applying `{0}`")]
	StackUnderflow(Primitive),

	/// A primitive received a value of the wrong kind.
	#[error("expected {expected}, found {found}")]
	TypeMismatch {
		/// What the primitive required.
		expected: &'static str,
		/// Kind of the offending value.
		found: &'static str,
	},

	/// A symbol was read before anything was assigned to it.
	#[error("no such symbol `{0}`")]
	UnknownSymbol(String),

	/// A `const` equation without a literal payload.
	#[error("`const` equation without a literal operand")]
	MalformedConst,

	/// A `resolve` equation without a symbol payload.
	#[error("`resolve` equation without a symbol operand")]
	MalformedResolve,
}

/// Evaluates equation lists against a value stack.
///
/// The machine owns the symbol table built up by `:=` and the output
/// buffer fed by `write$` and `newline$`. One machine per evaluation
/// unless the caller explicitly threads one through several calls.
#[derive(Debug, Default)]
pub struct StackMachine {
	symbols: HashMap<String, Value>,
	output: String,
}

impl StackMachine {
	/// Creates an empty machine.
	pub fn new() -> Self {
		Self::default()
	}

	/// Text produced by `write$` and `newline$` so far.
	pub fn output(&self) -> &str {
		&self.output
	}

	/// Runs every equation of `expr` against `stack`.
	pub fn run(&mut self, expr: &Expr, stack: &mut Vec<Value>) -> Result<(), EvalError> {
		for (index, eq) in expr.equations.iter().enumerate() {
			let step = index + 1;
			trace!(step, equation = %eq, "evaluating");
			self.step(eq, stack).map_err(|source| EvalError::Step {
				step,
				source: Box::new(source),
			})?;
		}
		Ok(())
	}

	fn step(&mut self, eq: &Eq, stack: &mut Vec<Value>) -> Result<(), EvalError> {
		match eq.primitive {
			Primitive::Const => {
				let Some(Operand::Lit(value)) = eq.params.first() else {
					return Err(EvalError::MalformedConst);
				};
				stack.push(value.clone());
			}
			Primitive::Resolve => {
				let Some(Operand::Sym(name)) = eq.params.first() else {
					return Err(EvalError::MalformedResolve);
				};
				stack.push(Value::Symbol(name.clone()));
			}
			Primitive::Assign => {
				let name = match pop(Primitive::Assign, stack)? {
					Value::Symbol(name) => name,
					other => {
						return Err(EvalError::TypeMismatch {
							expected: "symbol",
							found: other.kind(),
						});
					}
				};
				let value = self.pop_value(Primitive::Assign, stack)?;
				self.symbols.insert(name, value);
			}
			Primitive::Equal => {
				let rhs = self.pop_value(Primitive::Equal, stack)?;
				let lhs = self.pop_value(Primitive::Equal, stack)?;
				let equal = match (&lhs, &rhs) {
					(Value::Int(lhs), Value::Int(rhs)) => lhs == rhs,
					(Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
					_ => {
						return Err(EvalError::TypeMismatch {
							expected: "two integers or two strings",
							found: rhs.kind(),
						});
					}
				};
				stack.push(Value::Int(i64::from(equal)));
			}
			Primitive::Less => {
				let rhs = self.pop_int(Primitive::Less, stack)?;
				let lhs = self.pop_int(Primitive::Less, stack)?;
				stack.push(Value::Int(i64::from(lhs < rhs)));
			}
			Primitive::Greater => {
				let rhs = self.pop_int(Primitive::Greater, stack)?;
				let lhs = self.pop_int(Primitive::Greater, stack)?;
				stack.push(Value::Int(i64::from(lhs > rhs)));
			}
			Primitive::Add => {
				let rhs = self.pop_int(Primitive::Add, stack)?;
				let lhs = self.pop_int(Primitive::Add, stack)?;
				stack.push(Value::Int(lhs + rhs));
			}
			Primitive::Sub => {
				let rhs = self.pop_int(Primitive::Sub, stack)?;
				let lhs = self.pop_int(Primitive::Sub, stack)?;
				stack.push(Value::Int(lhs - rhs));
			}
			Primitive::Concat => {
				let rhs = self.pop_str(Primitive::Concat, stack)?;
				let mut lhs = self.pop_str(Primitive::Concat, stack)?;
				lhs.push_str(&rhs);
				stack.push(Value::Str(lhs));
			}
			Primitive::If => {
				let else_branch = self.pop_branch(stack)?;
				let then_branch = self.pop_branch(stack)?;
				let predicate = self.pop_int(Primitive::If, stack)?;
				let branch = if predicate > 0 { then_branch } else { else_branch };
				self.run(&branch, stack)?;
			}
			Primitive::Empty => {
				let value = self.pop_value(Primitive::Empty, stack)?;
				let empty = match &value {
					Value::Str(text) => text.trim().is_empty(),
					Value::Int(_) => false,
					other => {
						return Err(EvalError::TypeMismatch {
							expected: "string or integer",
							found: other.kind(),
						});
					}
				};
				stack.push(Value::Int(i64::from(empty)));
			}
			Primitive::Duplicate => {
				let value = pop(Primitive::Duplicate, stack)?;
				stack.push(value.clone());
				stack.push(value);
			}
			Primitive::Pop => {
				pop(Primitive::Pop, stack)?;
			}
			Primitive::Skip => {}
			Primitive::Write => {
				let text = self.pop_str(Primitive::Write, stack)?;
				self.output.push_str(&text);
			}
			Primitive::AddPeriod => {
				let mut text = self.pop_str(Primitive::AddPeriod, stack)?;
				if !text.is_empty() && !matches!(text.chars().last(), Some('.' | '!' | '?')) {
					text.push('.');
				}
				stack.push(Value::Str(text));
			}
			Primitive::Newline => {
				self.output.push('\n');
			}
		}
		Ok(())
	}

	/// Pops and reads through symbol references.
	fn pop_value(&self, primitive: Primitive, stack: &mut Vec<Value>) -> Result<Value, EvalError> {
		let value = pop(primitive, stack)?;
		self.deref(value)
	}

	fn pop_int(&self, primitive: Primitive, stack: &mut Vec<Value>) -> Result<i64, EvalError> {
		match self.pop_value(primitive, stack)? {
			Value::Int(value) => Ok(value),
			other => Err(EvalError::TypeMismatch {
				expected: "integer",
				found: other.kind(),
			}),
		}
	}

	fn pop_str(&self, primitive: Primitive, stack: &mut Vec<Value>) -> Result<String, EvalError> {
		match self.pop_value(primitive, stack)? {
			Value::Str(value) => Ok(value),
			other => Err(EvalError::TypeMismatch {
				expected: "string",
				found: other.kind(),
			}),
		}
	}

	/// Pops an `if$` branch: a block, or a symbol bound to one.
	fn pop_branch(&self, stack: &mut Vec<Value>) -> Result<Arc<Expr>, EvalError> {
		match pop(Primitive::If, stack)? {
			Value::Block(expr) => Ok(expr),
			Value::Symbol(name) => match self.symbols.get(&name) {
				Some(Value::Block(expr)) => Ok(Arc::clone(expr)),
				Some(other) => Err(EvalError::TypeMismatch {
					expected: "block",
					found: other.kind(),
				}),
				None => Err(EvalError::UnknownSymbol(name)),
			},
			other => Err(EvalError::TypeMismatch {
				expected: "block",
				found: other.kind(),
			}),
		}
	}

	fn deref(&self, value: Value) -> Result<Value, EvalError> {
		match value {
			Value::Symbol(name) => match self.symbols.get(&name) {
				Some(bound) => Ok(bound.clone()),
				None => Err(EvalError::UnknownSymbol(name)),
			},
			other => Ok(other),
		}
	}
}

fn pop(primitive: Primitive, stack: &mut Vec<Value>) -> Result<Value, EvalError> {
	stack.pop().ok_or(EvalError::StackUnderflow(primitive))
}

/// Evaluates `expr` with a fresh machine and initial stack.
pub fn evaluate(expr: &Expr, init: Vec<Value>) -> Result<Vec<Value>, EvalError> {
	let mut machine = StackMachine::new();
	let mut stack = init;
	machine.run(expr, &mut stack)?;
	Ok(stack)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lower::{Term, reduce};

	fn single(primitive: Primitive) -> Expr {
		Expr {
			equations: vec![Eq {
				primitive,
				params: Vec::new(),
				inputs: Vec::new(),
				outputs: Vec::new(),
			}],
			inputs: Vec::new(),
			outputs: Vec::new(),
		}
	}

	fn apply_binary(primitive: Primitive, lhs: Value, rhs: Value) -> Value {
		let expr = single(primitive);
		let mut stack = evaluate(&expr, vec![lhs, rhs]).expect("evaluation succeeds");
		assert_eq!(stack.len(), 1);
		stack.pop().unwrap()
	}

	#[test]
	fn test_cond_selects_branch() {
		// FUNCTION {not} { { #0 } { #1 } if$ }
		let expr = reduce(&[
			Term::Block(vec![Term::Lit(Value::Int(0))]),
			Term::Block(vec![Term::Lit(Value::Int(1))]),
			Term::Prim(Primitive::If),
		]);
		for value in [0, 1] {
			let stack = evaluate(&expr, vec![Value::Int(value)]).expect("not evaluates");
			assert_eq!(stack, vec![Value::Int(1 - value)]);
		}
	}

	#[test]
	fn test_equal() {
		for (lhs, rhs) in [(0, 0), (0, 1), (1, 1), (-1, 1), (-1, -1)] {
			let expected = i64::from(lhs == rhs);
			let actual = apply_binary(Primitive::Equal, Value::Int(lhs), Value::Int(rhs));
			assert_eq!(actual, Value::Int(expected));
		}
		for (lhs, rhs) in [("", ""), ("", "lorem ipsum"), ("lorem", "ipsum")] {
			let expected = i64::from(lhs == rhs);
			let actual = apply_binary(
				Primitive::Equal,
				Value::Str(lhs.into()),
				Value::Str(rhs.into()),
			);
			assert_eq!(actual, Value::Int(expected));
		}
	}

	#[test]
	fn test_less_and_greater() {
		for (lhs, rhs) in [(0, 0), (0, 1), (1, 0), (1, 1), (-1, 1), (-1, -1)] {
			assert_eq!(
				apply_binary(Primitive::Less, Value::Int(lhs), Value::Int(rhs)),
				Value::Int(i64::from(lhs < rhs))
			);
			assert_eq!(
				apply_binary(Primitive::Greater, Value::Int(lhs), Value::Int(rhs)),
				Value::Int(i64::from(lhs > rhs))
			);
		}
	}

	#[test]
	fn test_add_and_sub() {
		for (lhs, rhs) in [(0, 0), (-54, -20), (-4076, 6340), (433921, -197378)] {
			assert_eq!(
				apply_binary(Primitive::Add, Value::Int(lhs), Value::Int(rhs)),
				Value::Int(lhs + rhs)
			);
			assert_eq!(
				apply_binary(Primitive::Sub, Value::Int(lhs), Value::Int(rhs)),
				Value::Int(lhs - rhs)
			);
		}
	}

	#[test]
	fn test_concat() {
		for (lhs, rhs) in [("", ""), ("lorem", "ipsum")] {
			assert_eq!(
				apply_binary(Primitive::Concat, Value::Str(lhs.into()), Value::Str(rhs.into())),
				Value::Str(format!("{lhs}{rhs}"))
			);
		}
	}

	#[test]
	fn test_assign_then_read_back() {
		// #5 'x := x x +
		let expr = reduce(&[
			Term::Lit(Value::Int(5)),
			Term::Sym("x".into()),
			Term::Prim(Primitive::Assign),
			Term::Sym("x".into()),
			Term::Sym("x".into()),
			Term::Prim(Primitive::Add),
		]);
		let stack = evaluate(&expr, Vec::new()).expect("assignment evaluates");
		assert_eq!(stack, vec![Value::Int(10)]);
	}

	#[test]
	fn test_assign_rejects_non_symbol_target() {
		let expr = single(Primitive::Assign);
		let err = evaluate(&expr, vec![Value::Int(1), Value::Int(2)]).unwrap_err();
		assert!(matches!(
			err,
			EvalError::Step { step: 1, source } if matches!(*source, EvalError::TypeMismatch { .. })
		));
	}

	#[test]
	fn test_empty() {
		let expr = single(Primitive::Empty);
		for (value, expected) in [
			(Value::Str(String::new()), 1),
			(Value::Str("  \t".into()), 1),
			(Value::Str("lorem".into()), 0),
			(Value::Int(0), 0),
		] {
			let stack = evaluate(&expr, vec![value]).expect("empty$ evaluates");
			assert_eq!(stack, vec![Value::Int(expected)]);
		}
	}

	#[test]
	fn test_duplicate_and_pop() {
		let stack = evaluate(&single(Primitive::Duplicate), vec![Value::Int(7)]).unwrap();
		assert_eq!(stack, vec![Value::Int(7), Value::Int(7)]);

		let stack = evaluate(&single(Primitive::Pop), vec![Value::Int(7)]).unwrap();
		assert!(stack.is_empty());

		let stack = evaluate(&single(Primitive::Skip), vec![Value::Int(7)]).unwrap();
		assert_eq!(stack, vec![Value::Int(7)]);
	}

	#[test]
	fn test_add_period() {
		let expr = single(Primitive::AddPeriod);
		for (input, expected) in [
			("lorem", "lorem."),
			("lorem.", "lorem."),
			("lorem!", "lorem!"),
			("lorem?", "lorem?"),
			("", ""),
		] {
			let stack = evaluate(&expr, vec![Value::Str(input.into())]).unwrap();
			assert_eq!(stack, vec![Value::Str(expected.into())]);
		}
	}

	#[test]
	fn test_write_and_newline() {
		// "lorem" write$ newline$
		let expr = reduce(&[
			Term::Lit(Value::Str("lorem".into())),
			Term::Prim(Primitive::Write),
			Term::Prim(Primitive::Newline),
		]);
		let mut machine = StackMachine::new();
		let mut stack = Vec::new();
		machine.run(&expr, &mut stack).expect("write$ evaluates");
		assert!(stack.is_empty());
		assert_eq!(machine.output(), "lorem\n");
	}

	#[test]
	fn test_if_through_assigned_symbol() {
		// { #1 } 'then.fn :=  #1 then.fn 'skip$ if$
		let expr = reduce(&[
			Term::Block(vec![Term::Lit(Value::Int(1))]),
			Term::Sym("then.fn".into()),
			Term::Prim(Primitive::Assign),
			Term::Lit(Value::Int(1)),
			Term::Sym("then.fn".into()),
			Term::Block(vec![Term::Prim(Primitive::Skip)]),
			Term::Prim(Primitive::If),
		]);
		let stack = evaluate(&expr, Vec::new()).expect("if$ resolves the branch symbol");
		assert_eq!(stack, vec![Value::Int(1)]);
	}

	#[test]
	fn test_step_error_carries_index() {
		// Second equation fails: `+` on a string.
		let expr = reduce(&[
			Term::Lit(Value::Str("lorem".into())),
			Term::Prim(Primitive::Add),
		]);
		let err = evaluate(&expr, vec![Value::Int(1)]).unwrap_err();
		let EvalError::Step { step, source } = err else {
			panic!("expected a step error");
		};
		assert_eq!(step, 2);
		assert!(matches!(*source, EvalError::TypeMismatch { .. }));
	}
}
