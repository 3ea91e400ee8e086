//! Parser-internal syntax tree. It lives only for one `parse` call and is
//! consumed by [`AstNode::build`].

use std::fmt;
use std::sync::Arc;

use crate::condition::{PrimitiveStatement, SearchCondition};
use crate::resolver::FieldResolver;
use crate::token::Separator;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AstNode {
    /// Units joined by one separator, in source order.
    SubExpression { operator: Separator, children: Vec<AstNode> },
    /// 比较运算, 这是树的叶子节点
    Comparison(PrimitiveStatement),
}

impl AstNode {
    /// Converts the syntax tree into a condition tree. An AND group made only
    /// of comparisons is folded into a single multi-field node when the
    /// resolver can hold its values in a template. Groups go through
    /// [`SearchCondition::and`]/[`SearchCondition::or`], so an empty group
    /// gives `None` and a single child stands on its own.
    pub(crate) fn build<T>(self, resolver: &Arc<dyn FieldResolver<T>>) -> Option<SearchCondition<T>> {
        match self {
            AstNode::Comparison(statement) => Some(SearchCondition::simple(statement, Arc::clone(resolver))),
            AstNode::SubExpression { operator, children } => {
                if operator == Separator::And && children.len() > 1 {
                    if let Some(statements) = plain_comparisons(&children) {
                        if let Some(folded) = SearchCondition::multi(statements, Arc::clone(resolver)) {
                            return Some(folded);
                        }
                    }
                }

                let built: Vec<_> = children.into_iter().filter_map(|c| c.build(resolver)).collect();
                match operator {
                    Separator::And => SearchCondition::and(built),
                    Separator::Or => SearchCondition::or(built),
                }
            }
        }
    }
}

fn plain_comparisons(children: &[AstNode]) -> Option<Vec<PrimitiveStatement>> {
    children
        .iter()
        .map(|child| match child {
            AstNode::Comparison(statement) => Some(statement.clone()),
            AstNode::SubExpression { .. } => None,
        })
        .collect()
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::SubExpression { operator, children } => {
                let name = match operator {
                    Separator::And => "AND",
                    Separator::Or => "OR",
                };
                write!(f, "{name}:[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
            AstNode::Comparison(s) => {
                let op = s.condition.fiql_operator().unwrap_or("?");
                write!(f, "{} {} {} ({})", s.field, op, s.value, s.value.field_type())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionType;
    use crate::resolver::{PrimitiveResolver, SearchBean, SearchBeanResolver};
    use crate::value::Value;

    fn cmp(field: &str, value: &str) -> AstNode {
        AstNode::Comparison(PrimitiveStatement::new(field, ConditionType::Equals, Value::from(value)))
    }

    fn bean_resolver() -> Arc<dyn FieldResolver<SearchBean>> {
        Arc::new(SearchBeanResolver)
    }

    #[test]
    fn test_and_of_comparisons_is_folded() {
        let ast = AstNode::SubExpression { operator: Separator::And, children: vec![cmp("b", "2"), cmp("c", "3")] };
        let tree = ast.build(&bean_resolver()).unwrap();
        assert!(matches!(tree, SearchCondition::Multi(_)));
        assert_eq!(tree.statements().len(), 2);
    }

    #[test]
    fn test_and_with_nested_group_is_not_folded() {
        let inner = AstNode::SubExpression { operator: Separator::Or, children: vec![cmp("b", "2"), cmp("c", "3")] };
        let ast = AstNode::SubExpression { operator: Separator::And, children: vec![cmp("a", "1"), inner] };
        let tree = ast.build(&bean_resolver()).unwrap();
        assert_eq!(tree.condition_type(), ConditionType::And);
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[1].condition_type(), ConditionType::Or);
    }

    #[test]
    fn test_or_is_never_folded() {
        let ast = AstNode::SubExpression { operator: Separator::Or, children: vec![cmp("a", "1"), cmp("b", "2")] };
        let tree = ast.build(&bean_resolver()).unwrap();
        assert!(matches!(tree, SearchCondition::Or(_)));
    }

    #[test]
    fn test_no_template_means_no_folding() {
        let resolver: Arc<dyn FieldResolver<String>> = Arc::new(PrimitiveResolver::<String>::new());
        let ast = AstNode::SubExpression { operator: Separator::And, children: vec![cmp("a", "x*"), cmp("b", "*y")] };
        let tree = ast.build(&resolver).unwrap();
        assert!(matches!(tree, SearchCondition::And(_)));
        assert!(tree.is_met(&"xy".to_string()));
        assert!(!tree.is_met(&"yx".to_string()));
    }

    #[test]
    fn test_groups_collapse_like_the_composite_constructors() {
        let single = AstNode::SubExpression { operator: Separator::Or, children: vec![cmp("a", "1")] };
        let tree = single.build(&bean_resolver()).unwrap();
        assert!(matches!(tree, SearchCondition::Simple(_)));

        let empty = AstNode::SubExpression { operator: Separator::And, children: Vec::new() };
        assert!(empty.build(&bean_resolver()).is_none());

        let inner = AstNode::SubExpression { operator: Separator::Or, children: Vec::new() };
        let outer = AstNode::SubExpression { operator: Separator::And, children: vec![inner, cmp("b", "2")] };
        let tree = outer.build(&bean_resolver()).unwrap();
        assert_eq!(tree.statement().map(|s| s.field.as_str()), Some("b"));
    }

    #[test]
    fn test_display() {
        let ast = AstNode::SubExpression { operator: Separator::Or, children: vec![cmp("a", "1"), cmp("b", "2")] };
        assert_eq!(ast.to_string(), "OR:[a == 1 (string), b == 2 (string)]");
    }
}
