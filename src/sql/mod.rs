pub mod ast;
pub mod exec;
pub mod parser;
pub mod pretty;

pub use ast::Statement;
pub use exec::{QueryResult, SqlExec};
pub use parser::Parser;
pub use pretty::canonical;
