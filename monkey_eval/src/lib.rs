pub mod environment;
pub mod error;
pub mod interpret;
pub mod stdlib;
pub mod types;

use interpret::Interpreter;
use log::trace;
use monkey_syntax::{lex::Lexer, parse::Parser};
use types::Value;

/// Lex, parse and evaluate `source` against the interpreter's
/// environment, which keeps its bindings across calls. Lex and
/// parse errors are all reported together, and nothing is
/// evaluated if there are any.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<Value, Vec<String>> {
    let lexer = Lexer::new(source);
    trace!("Lexing {source}");
    let tokens = lexer.lex_all_sanitised()?;
    trace!("Parsing {tokens:#?}");
    let parser = Parser::new(&tokens);
    let root = parser.parse_all()?;
    trace!("Interpreting {root:#?}");
    interpreter
        .interpret_all(&root)
        .map_err(|e| vec![e.to_string()])
}
