//! The search condition tree produced by the parser.
//!
//! Trees are immutable once built: evaluating them never writes, so one tree
//! can be shared between threads and checked against any number of
//! candidates.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::resolver::FieldResolver;
use crate::value::Value;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    And,
    Or,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEquals,
    LessThan,
    LessOrEquals,
}

impl ConditionType {
    /// FIQL operator token of a comparison type.
    pub fn fiql_operator(self) -> Option<&'static str> {
        match self {
            ConditionType::Equals => Some("=="),
            ConditionType::NotEquals => Some("!="),
            ConditionType::GreaterThan => Some("=gt="),
            ConditionType::GreaterOrEquals => Some("=ge="),
            ConditionType::LessThan => Some("=lt="),
            ConditionType::LessOrEquals => Some("=le="),
            ConditionType::And | ConditionType::Or => None,
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, ConditionType::And | ConditionType::Or)
    }

    /// Applies the comparison to a candidate's value. An absent value never
    /// matches; neither does a boolean-combination type.
    pub fn compare(self, actual: Option<&Value>, expected: &Value) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            ConditionType::Equals => actual.matches(expected),
            ConditionType::NotEquals => !actual.matches(expected),
            ConditionType::GreaterThan => actual > expected,
            ConditionType::GreaterOrEquals => actual >= expected,
            ConditionType::LessThan => actual < expected,
            ConditionType::LessOrEquals => actual <= expected,
            ConditionType::And | ConditionType::Or => false,
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionType::And => "AND",
            ConditionType::Or => "OR",
            ConditionType::Equals => "EQUALS",
            ConditionType::NotEquals => "NOT_EQUALS",
            ConditionType::GreaterThan => "GREATER_THAN",
            ConditionType::GreaterOrEquals => "GREATER_OR_EQUALS",
            ConditionType::LessThan => "LESS_THAN",
            ConditionType::LessOrEquals => "LESS_OR_EQUALS",
        };
        f.write_str(name)
    }
}

/// One `field <op> value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveStatement {
    pub field: String,
    pub condition: ConditionType,
    pub value: Value,
}

impl PrimitiveStatement {
    pub fn new(field: impl Into<String>, condition: ConditionType, value: Value) -> Self {
        Self { field: field.into(), condition, value }
    }
}

/// A single comparison bound to the resolver that reads candidates.
pub struct SimpleCondition<T> {
    statement: PrimitiveStatement,
    resolver: Arc<dyn FieldResolver<T>>,
}

/// An AND group of comparisons on distinct fields, folded into one node. The
/// literals live in a single template instance of `T`.
pub struct MultiCondition<T> {
    conditions: IndexMap<String, ConditionType>,
    template: T,
    resolver: Arc<dyn FieldResolver<T>>,
}

impl<T> MultiCondition<T> {
    pub fn template(&self) -> &T {
        &self.template
    }

    pub fn conditions(&self) -> &IndexMap<String, ConditionType> {
        &self.conditions
    }
}

/// A node of the condition tree.
///
/// Composites built through [`SearchCondition::and`] and
/// [`SearchCondition::or`] always hold at least two children. Constructing
/// `And`/`Or` directly skips that check: an empty `And` is met by every
/// candidate and an empty `Or` by none.
pub enum SearchCondition<T> {
    And(Vec<SearchCondition<T>>),
    Or(Vec<SearchCondition<T>>),
    Simple(SimpleCondition<T>),
    Multi(MultiCondition<T>),
}

impl<T> SearchCondition<T> {
    pub fn simple(statement: PrimitiveStatement, resolver: Arc<dyn FieldResolver<T>>) -> Self {
        SearchCondition::Simple(SimpleCondition { statement, resolver })
    }

    /// `None` for an empty list; a single child is returned as is.
    pub fn and(children: Vec<Self>) -> Option<Self> {
        Self::composite(ConditionType::And, children)
    }

    /// `None` for an empty list; a single child is returned as is.
    pub fn or(children: Vec<Self>) -> Option<Self> {
        Self::composite(ConditionType::Or, children)
    }

    fn composite(kind: ConditionType, mut children: Vec<Self>) -> Option<Self> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ if kind == ConditionType::And => Some(SearchCondition::And(children)),
            _ => Some(SearchCondition::Or(children)),
        }
    }

    /// Folds comparisons into one template-backed node. Returns `None` when
    /// the resolver has no template, a field repeats, or a value cannot be
    /// stored.
    pub(crate) fn multi(
        statements: Vec<PrimitiveStatement>,
        resolver: Arc<dyn FieldResolver<T>>,
    ) -> Option<Self> {
        let mut template = resolver.template()?;
        let mut conditions = IndexMap::with_capacity(statements.len());
        for statement in statements {
            if conditions.contains_key(&statement.field)
                || !resolver.set(&mut template, &statement.field, statement.value)
            {
                return None;
            }
            conditions.insert(statement.field, statement.condition);
        }
        Some(SearchCondition::Multi(MultiCondition { conditions, template, resolver }))
    }

    /// AND/OR for composites and multi-field leaves, the comparison type
    /// otherwise.
    pub fn condition_type(&self) -> ConditionType {
        match self {
            SearchCondition::And(_) => ConditionType::And,
            SearchCondition::Or(_) => ConditionType::Or,
            SearchCondition::Simple(s) => s.statement.condition,
            SearchCondition::Multi(m) => match m.conditions.values().next() {
                Some(&ct) if m.conditions.len() == 1 => ct,
                _ => ConditionType::And,
            },
        }
    }

    /// Direct children; empty for leaves.
    pub fn children(&self) -> &[SearchCondition<T>] {
        match self {
            SearchCondition::And(c) | SearchCondition::Or(c) => c,
            SearchCondition::Simple(_) | SearchCondition::Multi(_) => &[],
        }
    }

    pub fn statement(&self) -> Option<&PrimitiveStatement> {
        match self {
            SearchCondition::Simple(s) => Some(&s.statement),
            _ => None,
        }
    }

    /// The comparisons held directly by a leaf, in declaration order. A
    /// multi-field leaf reads its values back from the template.
    pub fn statements(&self) -> Vec<PrimitiveStatement> {
        match self {
            SearchCondition::Simple(s) => vec![s.statement.clone()],
            SearchCondition::Multi(m) => m
                .conditions
                .iter()
                .filter_map(|(field, &condition)| {
                    let value = m.resolver.get(&m.template, field)?;
                    Some(PrimitiveStatement { field: field.clone(), condition, value })
                })
                .collect(),
            SearchCondition::And(_) | SearchCondition::Or(_) => Vec::new(),
        }
    }

    pub fn is_met(&self, candidate: &T) -> bool {
        match self {
            SearchCondition::And(children) => children.iter().all(|c| c.is_met(candidate)),
            SearchCondition::Or(children) => children.iter().any(|c| c.is_met(candidate)),
            SearchCondition::Simple(s) => {
                let actual = s.resolver.get(candidate, &s.statement.field);
                s.statement.condition.compare(actual.as_ref(), &s.statement.value)
            }
            SearchCondition::Multi(m) => m.conditions.iter().all(|(field, condition)| {
                match m.resolver.get(&m.template, field) {
                    Some(expected) => {
                        let actual = m.resolver.get(candidate, field);
                        condition.compare(actual.as_ref(), &expected)
                    }
                    None => false,
                }
            }),
        }
    }

    /// Pre-order walk: `visit` on every node, children in insertion order,
    /// then `leave`. Leaves do not recurse.
    pub fn accept<V>(&self, visitor: &mut V) -> Result<(), V::Error>
    where
        V: SearchConditionVisitor<T> + ?Sized,
    {
        visitor.visit(self)?;
        for child in self.children() {
            child.accept(visitor)?;
        }
        visitor.leave(self)
    }
}

/// Visitor over a condition tree, driven by [`SearchCondition::accept`].
pub trait SearchConditionVisitor<T> {
    type Error;

    fn visit(&mut self, condition: &SearchCondition<T>) -> Result<(), Self::Error>;

    fn leave(&mut self, _condition: &SearchCondition<T>) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T> fmt::Debug for SearchCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchCondition::And(children) => f.debug_tuple("And").field(children).finish(),
            SearchCondition::Or(children) => f.debug_tuple("Or").field(children).finish(),
            SearchCondition::Simple(s) => f.debug_tuple("Simple").field(&s.statement).finish(),
            SearchCondition::Multi(_) => f.debug_tuple("Multi").field(&self.statements()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{SearchBean, SearchBeanResolver};

    fn resolver() -> Arc<dyn FieldResolver<SearchBean>> {
        Arc::new(SearchBeanResolver)
    }

    fn eq(field: &str, value: &str) -> SearchCondition<SearchBean> {
        SearchCondition::simple(
            PrimitiveStatement::new(field, ConditionType::Equals, Value::from(value)),
            resolver(),
        )
    }

    #[test]
    fn test_composite_collapses_single_child() {
        let single = SearchCondition::and(vec![eq("a", "1")]).unwrap();
        assert_eq!(single.condition_type(), ConditionType::Equals);
        assert!(SearchCondition::<SearchBean>::or(Vec::new()).is_none());
    }

    #[test]
    fn test_and_or_evaluation() {
        let tree = SearchCondition::or(vec![
            eq("a", "1"),
            SearchCondition::and(vec![eq("b", "2"), eq("c", "3")]).unwrap(),
        ])
        .unwrap();

        assert!(tree.is_met(&SearchBean::new().with("a", "1")));
        assert!(tree.is_met(&SearchBean::new().with("b", "2").with("c", "3")));
        assert!(!tree.is_met(&SearchBean::new().with("b", "2").with("c", "4")));
        assert!(!tree.is_met(&SearchBean::new()));
    }

    #[test]
    fn test_missing_value_never_matches() {
        let ne = SearchCondition::simple(
            PrimitiveStatement::new("a", ConditionType::NotEquals, Value::from("x")),
            resolver(),
        );
        assert!(!ne.is_met(&SearchBean::new()));
        assert!(ne.is_met(&SearchBean::new().with("a", "y")));
    }

    #[test]
    fn test_multi_rejects_repeated_field() {
        let statements = vec![
            PrimitiveStatement::new("a", ConditionType::GreaterThan, Value::from("1")),
            PrimitiveStatement::new("a", ConditionType::LessThan, Value::from("5")),
        ];
        assert!(SearchCondition::multi(statements, resolver()).is_none());
    }

    #[test]
    fn test_multi_statements_keep_order() {
        let statements = vec![
            PrimitiveStatement::new("b", ConditionType::Equals, Value::from("2")),
            PrimitiveStatement::new("a", ConditionType::NotEquals, Value::from("1")),
        ];
        let multi = SearchCondition::multi(statements.clone(), resolver()).unwrap();
        assert_eq!(multi.statements(), statements);
        assert_eq!(multi.condition_type(), ConditionType::And);
        assert!(multi.children().is_empty());
        assert!(multi.is_met(&SearchBean::new().with("b", "2").with("a", "0")));
        assert!(!multi.is_met(&SearchBean::new().with("b", "2").with("a", "1")));
    }

    #[test]
    fn test_tree_is_shareable_across_threads() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<SearchCondition<SearchBean>>();

        let tree = Arc::new(eq("a", "1"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tree = Arc::clone(&tree);
                std::thread::spawn(move || tree.is_met(&SearchBean::new().with("a", "1")))
            })
            .collect();
        assert!(handles.into_iter().all(|h| h.join().unwrap()));
    }

    struct Recorder(Vec<String>);

    impl SearchConditionVisitor<SearchBean> for Recorder {
        type Error = std::convert::Infallible;

        fn visit(&mut self, condition: &SearchCondition<SearchBean>) -> Result<(), Self::Error> {
            let label = match condition.statement() {
                Some(s) => s.field.clone(),
                None => condition.condition_type().to_string(),
            };
            self.0.push(label);
            Ok(())
        }

        fn leave(&mut self, condition: &SearchCondition<SearchBean>) -> Result<(), Self::Error> {
            if condition.condition_type().is_composite() {
                self.0.push("/".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_accept_is_preorder_and_deterministic() {
        let tree = SearchCondition::or(vec![
            eq("a", "1"),
            SearchCondition::and(vec![eq("b", "2"), eq("c", "3")]).unwrap(),
        ])
        .unwrap();

        let mut recorder = Recorder(Vec::new());
        tree.accept(&mut recorder).unwrap();
        assert_eq!(recorder.0, vec!["OR", "a", "AND", "b", "c", "/", "/"]);
    }
}
