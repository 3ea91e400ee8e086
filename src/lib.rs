//! FIQL search expressions: parse `name==foo*;age=ge=18` into a typed
//! condition tree, evaluate it against candidates, or render it as SQL.
//!
//! ```
//! use fiql_search::{to_sql, SearchBean};
//!
//! let filter = fiql_search::parse("name==foo*;city!=Paris").unwrap();
//! assert!(filter.is_met(&SearchBean::new().with("name", "foobar").with("city", "Oslo")));
//! assert_eq!(
//!     to_sql(&filter, "people").unwrap(),
//!     "SELECT * FROM people WHERE (name LIKE 'foo%') AND (city <> 'Paris')"
//! );
//! ```

mod ast;
pub mod coerce;
pub mod condition;
pub mod config;
pub mod duration;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod sql_compiler;
pub mod sql_printer;
pub mod token;
pub mod value;

#[cfg(test)]
mod property_tests;

pub use condition::{ConditionType, PrimitiveStatement, SearchCondition, SearchConditionVisitor};
pub use config::ParserConfig;
pub use error::{ConfigError, ParseError, UnsupportedConditionError};
pub use parser::FiqlParser;
pub use resolver::{FieldResolver, PrimitiveResolver, Schema, SearchBean, SearchBeanResolver};
pub use sql_compiler::{CompileResult, SqlCompiler};
pub use sql_printer::{to_sql, SqlPrinterVisitor};
pub use value::{FieldType, Scalar, Value};

/// Parses `expression` against the dynamic [`SearchBean`] resolver with the
/// default configuration.
pub fn parse(expression: &str) -> Result<SearchCondition<SearchBean>, ParseError> {
    FiqlParser::new(SearchBeanResolver).parse(expression)
}
