// Diagnostics go through tracing or returned errors, not stderr
#![deny(clippy::print_stderr)]

//! Equation IR and evaluation for BeaST bibliography styles.
//!
//! BST function bodies are postfix programs. This crate lowers parse trees
//! produced by the BST grammar into a linear equation form and evaluates
//! that form on a stack machine.
//!
//! # Architecture
//!
//! * [`primitive`]: the closed set of BST primitives and their arities
//! * [`expr`]: the equation IR (`Expr`, `Eq`, operands, values)
//! * [`lower`]: parse-tree walking and postfix reduction
//! * [`module`]: module assembly (named functions per style file)
//! * [`eval`]: the concrete stack machine
//!
//! Parsing goes through `beast-grammar`: hand [`Module::from_source`] a
//! loaded [`beast_grammar::Grammar`] and it drives the tree-sitter parser
//! itself.

pub mod eval;
pub mod expr;
pub mod lower;
pub mod module;
pub mod primitive;

pub use eval::{EvalError, StackMachine, evaluate};
pub use expr::{Eq, Expr, Func, Operand, Value, VarId};
pub use lower::{LowerError, Term, reduce};
pub use module::{Module, ModuleError};
pub use primitive::Primitive;
