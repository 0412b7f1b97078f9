//! Equation IR for lowered BST functions.
//!
//! A function body is a linearly ordered list of equations evaluated
//! sequentially. Literal and symbol pushes appear as explicit `const` and
//! `resolve` equations, so the equation list alone drives evaluation; the
//! per-equation operand lists record the dataflow for printing and
//! analysis.

use std::fmt;
use std::sync::Arc;

use crate::Primitive;

/// Identifier of a lowering temporary, unique within one [`Expr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v{}", self.0)
	}
}

/// A value: a literal from the source, or produced at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// Integer, spelled `#42` in BST.
	Int(i64),
	/// String, spelled `"text"` in BST.
	Str(String),
	/// A function block literal, spelled `{ ... }` in BST.
	Block(Arc<Expr>),
	/// A symbol reference. Appears on the run-time stack when `resolve`
	/// pushes a name; never a source literal.
	Symbol(String),
}

impl Value {
	/// Value kind, for diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Int(_) => "integer",
			Value::Str(_) => "string",
			Value::Block(_) => "block",
			Value::Symbol(_) => "symbol",
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Int(value) => write!(f, "#{value}"),
			Value::Str(value) => write!(f, "\"{value}\""),
			Value::Block(expr) => write!(f, "{{{}}}", expr.signature()),
			Value::Symbol(name) => write!(f, "'{name}"),
		}
	}
}

/// Operand of an equation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
	/// A literal.
	Lit(Value),
	/// A lowering temporary.
	Var(VarId),
	/// A named symbol reference.
	Sym(String),
}

impl fmt::Display for Operand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operand::Lit(value) => value.fmt(f),
			Operand::Var(id) => id.fmt(f),
			Operand::Sym(name) => write!(f, "'{name}"),
		}
	}
}

/// One clause of a lowered function body.
#[derive(Debug, Clone, PartialEq)]
pub struct Eq {
	/// The operation this clause applies.
	pub primitive: Primitive,
	/// Immediate operands (`const`/`resolve` payloads).
	pub params: Vec<Operand>,
	/// Dataflow inputs consumed from the abstract stack.
	pub inputs: Vec<Operand>,
	/// Temporaries defined by this clause.
	pub outputs: Vec<VarId>,
}

impl fmt::Display for Eq {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for output in &self.outputs {
			write!(f, "{output} ")?;
		}
		if !self.outputs.is_empty() {
			write!(f, "= ")?;
		}
		write!(f, "{}", self.primitive)?;
		for param in &self.params {
			write!(f, " {param}")?;
		}
		for input in &self.inputs {
			write!(f, " {input}")?;
		}
		Ok(())
	}
}

/// A lowered function body.
///
/// `inputs` are the variables synthesized for stack underflow during
/// lowering: values the body expects to find on the caller's stack.
/// `outputs` is the abstract stack left after the last equation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expr {
	/// Ordered clauses, evaluated front to back.
	pub equations: Vec<Eq>,
	/// Arguments consumed from the caller's stack.
	pub inputs: Vec<VarId>,
	/// Abstract result stack.
	pub outputs: Vec<Operand>,
}

impl Expr {
	/// Number of values consumed from the caller's stack.
	pub fn num_inputs(&self) -> usize {
		self.inputs.len()
	}

	/// Number of values left on the stack.
	pub fn num_outputs(&self) -> usize {
		self.outputs.len()
	}

	/// Stack effect rendered as `"n -> m"`.
	pub fn signature(&self) -> String {
		format!("{} -> {}", self.num_inputs(), self.num_outputs())
	}
}

impl fmt::Display for Expr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_named(f, "lambda", self)
	}
}

/// A named function.
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
	/// Name the function was declared under.
	pub name: String,
	/// Lowered body.
	pub expr: Expr,
}

impl fmt::Display for Func {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_named(f, &self.name, &self.expr)
	}
}

fn write_named(f: &mut fmt::Formatter<'_>, name: &str, expr: &Expr) -> fmt::Result {
	writeln!(
		f,
		"{name}({} args) -> {}-tuple {{",
		expr.num_inputs(),
		expr.num_outputs()
	)?;
	for eq in &expr.equations {
		writeln!(f, "  {eq}")?;
	}
	write!(f, "}}")
}
