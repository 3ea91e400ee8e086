//! SQL compiler that converts condition trees to parameterized queries using sea-query.

use std::collections::HashMap;

use sea_query::{Asterisk, Cond, Condition, Expr, Iden, PostgresQueryBuilder, Query, SimpleExpr, Values};

use crate::condition::{ConditionType, PrimitiveStatement, SearchCondition, SearchConditionVisitor};
use crate::error::UnsupportedConditionError;
use crate::sql_printer::like_pattern;
use crate::value::Value;

/// Table identifier wrapper
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Result of SQL compilation: Postgres text with `$n` placeholders and the
/// values bound to them, in order.
#[derive(Debug)]
pub struct CompileResult {
    pub sql: String,
    pub values: Values,
}

/// Compiles condition trees into `SELECT` statements with bound values.
#[derive(Debug, Default)]
pub struct SqlCompiler {
    /// Maps field names to column names
    column_mapping: HashMap<String, String>,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_column_mapping(&mut self, mapping: HashMap<String, String>) {
        self.column_mapping = mapping;
    }

    /// Get the column for a field; unmapped fields keep their name
    fn column_name(&self, field: &str) -> ColumnName {
        ColumnName(self.column_mapping.get(field).cloned().unwrap_or_else(|| field.to_owned()))
    }

    pub fn compile<T>(
        &self,
        condition: &SearchCondition<T>,
        table: &str,
        columns: &[&str],
    ) -> Result<CompileResult, UnsupportedConditionError> {
        let mut builder = ConditionBuilder { compiler: self, frames: Vec::new(), root: None };
        condition.accept(&mut builder)?;

        let mut select = Query::select();
        select.from(TableName(table.to_owned()));
        if columns.is_empty() {
            select.column(Asterisk);
        } else {
            select.columns(columns.iter().map(|c| ColumnName((*c).to_owned())));
        }
        if let Some(root) = builder.root {
            select.cond_where(root);
        }

        let (sql, values) = select.build(PostgresQueryBuilder);
        tracing::debug!(sql = %sql, bound = values.0.len(), "compiled condition tree");
        Ok(CompileResult { sql, values })
    }

    /// Compile a single comparison
    fn compile_comparison(&self, statement: &PrimitiveStatement) -> Result<SimpleExpr, UnsupportedConditionError> {
        let col = Expr::col(self.column_name(&statement.field));
        let wildcard = statement.value.has_wildcard();
        let like = || like_pattern(&statement.value.to_string());
        let val = bind_value(&statement.value);

        let expr = match statement.condition {
            ConditionType::Equals if wildcard => col.like(like()),
            ConditionType::NotEquals if wildcard => col.not_like(like()),
            ConditionType::Equals => col.eq(val),
            ConditionType::NotEquals => col.ne(val),
            ConditionType::GreaterThan => col.gt(val),
            ConditionType::GreaterOrEquals => col.gte(val),
            ConditionType::LessThan => col.lt(val),
            ConditionType::LessOrEquals => col.lte(val),
            condition @ (ConditionType::And | ConditionType::Or) => {
                return Err(UnsupportedConditionError { condition });
            }
        };

        Ok(expr)
    }
}

/// Convert a typed literal to a sea-query value
fn bind_value(value: &Value) -> sea_query::Value {
    match value {
        Value::String(s) => s.clone().into(),
        Value::Boolean(b) => (*b).into(),
        Value::Integer(n) => (*n).into(),
        Value::Decimal(n) => (*n).into(),
        Value::DateTime(_) => value.to_string().into(),
    }
}

/// Open AND/OR group and the conditions compiled for its children so far.
struct Frame {
    all: bool,
    children: Vec<Condition>,
}

struct ConditionBuilder<'c> {
    compiler: &'c SqlCompiler,
    frames: Vec<Frame>,
    root: Option<Condition>,
}

impl ConditionBuilder<'_> {
    fn attach(&mut self, condition: Condition) {
        match self.frames.last_mut() {
            Some(frame) => frame.children.push(condition),
            None => self.root = Some(condition),
        }
    }
}

impl<T> SearchConditionVisitor<T> for ConditionBuilder<'_> {
    type Error = UnsupportedConditionError;

    fn visit(&mut self, condition: &SearchCondition<T>) -> Result<(), Self::Error> {
        match condition {
            SearchCondition::And(_) => self.frames.push(Frame { all: true, children: Vec::new() }),
            SearchCondition::Or(_) => self.frames.push(Frame { all: false, children: Vec::new() }),
            SearchCondition::Simple(_) | SearchCondition::Multi(_) => {
                let mut leaf = Cond::all();
                for statement in condition.statements() {
                    leaf = leaf.add(self.compiler.compile_comparison(&statement)?);
                }
                self.attach(leaf);
            }
        }
        Ok(())
    }

    fn leave(&mut self, condition: &SearchCondition<T>) -> Result<(), Self::Error> {
        if matches!(condition, SearchCondition::And(_) | SearchCondition::Or(_)) {
            if let Some(frame) = self.frames.pop() {
                let group = if frame.all { Cond::all() } else { Cond::any() };
                let group = frame.children.into_iter().fold(group, |group, child| group.add(child));
                self.attach(group);
            }
        }
        Ok(())
    }
}
