//! SQL 渲染访问者: renders a condition tree as the `WHERE` clause of a plain
//! `SELECT`. Literals are inlined as quoted text, not bound; use
//! [`crate::sql_compiler::SqlCompiler`] when parameters are needed.

use crate::condition::{ConditionType, PrimitiveStatement, SearchCondition, SearchConditionVisitor};
use crate::error::UnsupportedConditionError;

/// `*` in a FIQL literal becomes `%` in a `LIKE` pattern.
pub(crate) fn like_pattern(value: &str) -> String {
    value.replace('*', "%")
}

/// Open composite: its keyword and how many children were written so far.
struct Frame {
    keyword: &'static str,
    written: usize,
}

/// Renders `SELECT <columns> FROM <table> WHERE <condition>`.
///
/// ```
/// use fiql_search::{FiqlParser, SearchBeanResolver, SqlPrinterVisitor};
///
/// let tree = FiqlParser::new(SearchBeanResolver).parse("a==1,(b==2;c==3)").unwrap();
/// let sql = SqlPrinterVisitor::new(Some("t"), &[]).render(&tree).unwrap();
/// assert_eq!(sql, "SELECT * FROM t WHERE (a = '1') OR ((b = '2') AND (c = '3'))");
/// ```
pub struct SqlPrinterVisitor {
    prefix: String,
    sql: String,
    frames: Vec<Frame>,
}

impl SqlPrinterVisitor {
    /// Without a (non-empty) table only the condition itself is rendered.
    pub fn new(table: Option<&str>, columns: &[&str]) -> Self {
        let prefix = match table {
            Some(table) if !table.is_empty() => {
                let columns = if columns.is_empty() { "*".to_string() } else { columns.join(", ") };
                format!("SELECT {columns} FROM {table} WHERE ")
            }
            _ => String::new(),
        };
        Self { prefix, sql: String::new(), frames: Vec::new() }
    }

    pub fn render<T>(&mut self, condition: &SearchCondition<T>) -> Result<String, UnsupportedConditionError> {
        self.sql.clear();
        self.frames.clear();
        condition.accept(self)?;
        Ok(format!("{}{}", self.prefix, self.sql))
    }

    fn write_statement(&mut self, statement: &PrimitiveStatement) -> Result<(), UnsupportedConditionError> {
        let value = statement.value.to_string();
        let wildcard = statement.value.has_wildcard();
        let operator = match statement.condition {
            ConditionType::Equals if wildcard => "LIKE",
            ConditionType::NotEquals if wildcard => "NOT LIKE",
            ConditionType::Equals => "=",
            ConditionType::NotEquals => "<>",
            ConditionType::GreaterThan => ">",
            ConditionType::GreaterOrEquals => ">=",
            ConditionType::LessThan => "<",
            ConditionType::LessOrEquals => "<=",
            condition @ (ConditionType::And | ConditionType::Or) => {
                return Err(UnsupportedConditionError { condition });
            }
        };
        let value = if wildcard { like_pattern(&value) } else { value };

        self.sql.push_str(&statement.field);
        self.sql.push(' ');
        self.sql.push_str(operator);
        self.sql.push_str(" '");
        self.sql.push_str(&value);
        self.sql.push('\'');
        Ok(())
    }
}

impl<T> SearchConditionVisitor<T> for SqlPrinterVisitor {
    type Error = UnsupportedConditionError;

    fn visit(&mut self, condition: &SearchCondition<T>) -> Result<(), Self::Error> {
        // every child of a composite is parenthesized
        if let Some(frame) = self.frames.last_mut() {
            if frame.written > 0 {
                self.sql.push(' ');
                self.sql.push_str(frame.keyword);
                self.sql.push(' ');
            }
            frame.written += 1;
            self.sql.push('(');
        }

        match condition {
            SearchCondition::And(_) => self.frames.push(Frame { keyword: "AND", written: 0 }),
            SearchCondition::Or(_) => self.frames.push(Frame { keyword: "OR", written: 0 }),
            SearchCondition::Simple(_) => {
                if let Some(statement) = condition.statement() {
                    self.write_statement(statement)?;
                }
            }
            SearchCondition::Multi(_) => {
                for (i, statement) in condition.statements().iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(" AND ");
                    }
                    self.sql.push('(');
                    self.write_statement(statement)?;
                    self.sql.push(')');
                }
            }
        }
        Ok(())
    }

    fn leave(&mut self, condition: &SearchCondition<T>) -> Result<(), Self::Error> {
        if matches!(condition, SearchCondition::And(_) | SearchCondition::Or(_)) {
            self.frames.pop();
        }
        if !self.frames.is_empty() {
            self.sql.push(')');
        }
        Ok(())
    }
}

/// `SELECT * FROM <table> WHERE ...`
pub fn to_sql<T>(condition: &SearchCondition<T>, table: &str) -> Result<String, UnsupportedConditionError> {
    SqlPrinterVisitor::new(Some(table), &[]).render(condition)
}
