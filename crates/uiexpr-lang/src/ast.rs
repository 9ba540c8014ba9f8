pub mod error;
pub mod node;
pub mod parser;

use smol_str::SmolStr;

pub type IdentName = SmolStr;

pub use node::{Args, BinaryOp, Expr, Ident, Literal, Node, TypeCheckMode, TypeRef, UnaryOp};
pub use parser::{Parser, TypeHints};
