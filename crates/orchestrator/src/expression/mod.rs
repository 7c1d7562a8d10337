//! 表达式解析
//!
//! 文法（优先级从低到高）：
//!
//! ```text
//! expr   := term   (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := number | '(' expr ')'
//! number := digit+ ('.' digit+)?
//! ```
//!
//! 空白被忽略，运算符左结合。解析器只产出运算树，从不求值。

mod ast;
mod parser;

pub use ast::{ExprNode, ExprTree, NodeId};
pub use parser::{parse, ParseError};
