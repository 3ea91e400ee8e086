//! Property tests for the parser and SQL printer

use proptest::prelude::*;

use crate::parser::{FiqlParser, OPERATORS};
use crate::resolver::{FieldResolver, Schema, SearchBean};
use crate::sql_printer::to_sql;
use crate::value::{FieldType, Value};

// ═══════════════════════════════════════════════════════════════════════════
// Strategy generators
// ═══════════════════════════════════════════════════════════════════════════

/// One `field<op>value` comparison without wildcards or reserved characters
fn comparison_strategy() -> impl Strategy<Value = (String, &'static str, String)> {
    (
        "[a-z][a-z0-9_]{0,7}",
        prop::sample::select(OPERATORS.iter().map(|(op, _)| *op).collect::<Vec<_>>()),
        "[A-Za-z0-9][A-Za-z0-9 _.-]{0,10}",
    )
}

/// Flat expression: comparisons joined by `;` and `,`, no brackets
fn flat_expression_strategy() -> impl Strategy<Value = (String, Vec<(String, &'static str, String)>)> {
    prop::collection::vec((comparison_strategy(), prop::bool::ANY), 1..=6).prop_map(|parts| {
        let mut expr = String::new();
        let mut comparisons = Vec::new();
        for (i, ((field, op, value), and)) in parts.into_iter().enumerate() {
            if i > 0 {
                expr.push(if and { ';' } else { ',' });
            }
            expr.push_str(&format!("{field}{op}{value}"));
            comparisons.push((field, op, value));
        }
        (expr, comparisons)
    })
}

fn bean_strategy() -> impl Strategy<Value = SearchBean> {
    prop::collection::hash_map("[a-c]", "[0-9a-c]{1,2}", 0..=3).prop_map(|values| {
        values.into_iter().fold(SearchBean::new(), |bean, (k, v)| bean.with(k, v))
    })
}

#[derive(Debug, Clone, Default)]
struct Record {
    alpha: Option<String>,
    beta_gamma: Option<String>,
}

fn record_schema() -> Schema<Record> {
    Schema::new()
        .field("alpha", FieldType::String, |r: &Record| r.alpha.clone().map(Value::String), |r, v| {
            r.alpha = v.into_string()
        })
        .field("betaGamma", FieldType::String, |r: &Record| r.beta_gamma.clone().map(Value::String), |r, v| {
            r.beta_gamma = v.into_string()
        })
}

/// Delegates to `R` but offers no template, so AND groups stay composites
struct Unfolded<R>(R);

impl<T, R: FieldResolver<T>> FieldResolver<T> for Unfolded<R> {
    fn field_type(&self, name: &str) -> Option<FieldType> {
        self.0.field_type(name)
    }

    fn canonical_name(&self, name: &str) -> Option<String> {
        self.0.canonical_name(name)
    }

    fn get(&self, candidate: &T, name: &str) -> Option<Value> {
        self.0.get(candidate, name)
    }
}

/// Comparisons on the schema fields, each spelled with arbitrary casing
fn mixed_case_expression_strategy() -> impl Strategy<Value = String> {
    let field = prop::sample::select(vec!["alpha", "ALPHA", "Alpha", "betaGamma", "betagamma", "BETAGAMMA"]);
    let op = prop::sample::select(OPERATORS.iter().map(|(op, _)| *op).collect::<Vec<_>>());
    prop::collection::vec((field, op, "[a-c]{1,2}", prop::bool::weighted(0.8)), 1..=5).prop_map(|parts| {
        let mut expr = String::new();
        for (i, (field, op, value, and)) in parts.into_iter().enumerate() {
            if i > 0 {
                expr.push(if and { ';' } else { ',' });
            }
            expr.push_str(&format!("{field}{op}{value}"));
        }
        expr
    })
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (prop::option::of("[a-c]{1,2}"), prop::option::of("[a-c]{1,2}"))
        .prop_map(|(alpha, beta_gamma)| Record { alpha, beta_gamma })
}

// ═══════════════════════════════════════════════════════════════════════════
// Property Tests
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// Flat expressions render to SQL that names every field and literal
    #[test]
    fn prop_flat_expression_round_trips_to_sql((expr, comparisons) in flat_expression_strategy()) {
        let tree = crate::parse(&expr).unwrap();
        let sql = to_sql(&tree, "t").unwrap();
        prop_assert!(sql.starts_with("SELECT * FROM t WHERE "));
        for (field, _, value) in &comparisons {
            prop_assert!(sql.contains(field.as_str()), "{} missing from {}", field, sql);
            let literal = format!("'{value}'");
            prop_assert!(sql.contains(&literal), "{} missing from {}", literal, sql);
        }
    }

    /// Parsing the same text twice gives trees that agree on every candidate
    #[test]
    fn prop_reparse_evaluates_identically(
        (expr, _) in flat_expression_strategy(),
        beans in prop::collection::vec(bean_strategy(), 1..=8),
    ) {
        let first = crate::parse(&expr).unwrap();
        let second = crate::parse(&expr).unwrap();
        for bean in &beans {
            prop_assert_eq!(first.is_met(bean), second.is_met(bean));
        }
    }

    /// Bracket-heavy garbage is rejected or accepted, never a panic
    #[test]
    fn prop_parse_never_panics(input in "[()a=!;,1*]{0,40}") {
        let _ = crate::parse(&input);
    }

    #[test]
    fn prop_parse_never_panics_on_any_text(input in ".{0,40}") {
        let _ = crate::parse(&input);
    }

    /// Folding AND groups into one node never changes which records match,
    /// even when one field is spelled several ways
    #[test]
    fn prop_folded_and_unfolded_trees_agree(
        expr in mixed_case_expression_strategy(),
        records in prop::collection::vec(record_strategy(), 1..=8),
    ) {
        let folded = FiqlParser::<Record>::new(record_schema()).parse(&expr).unwrap();
        let unfolded = FiqlParser::<Record>::new(Unfolded(record_schema())).parse(&expr).unwrap();
        for record in &records {
            prop_assert_eq!(folded.is_met(record), unfolded.is_met(record), "{} on {:?}", expr, record);
        }
    }

    /// Wrapping a valid expression in brackets does not change its meaning
    #[test]
    fn prop_redundant_brackets_are_transparent(
        (expr, _) in flat_expression_strategy(),
        beans in prop::collection::vec(bean_strategy(), 1..=8),
    ) {
        let plain = crate::parse(&expr).unwrap();
        let wrapped = crate::parse(&format!("(({expr}))")).unwrap();
        for bean in &beans {
            prop_assert_eq!(plain.is_met(bean), wrapped.is_met(bean));
        }
    }
}
