//! FIQL 语法分析器
//!
//! ## 解析流程
//!
//! ```text
//! parse()
//!   ├─ Lexer: "(" ")" ";" "," and text runs
//!   └─ parse_group() (one call per bracket level)
//!        ├─ split(): cut on ';' and ',' at bracket level 0
//!        │            ├─ ')' below level 0  → UnexpectedClosingBracket
//!        │            ├─ level != 0 at end  → UnmatchedBrackets
//!        │            └─ trailing separator → DanglingOperator
//!        ├─ group AND runs, then OR the runs together
//!        └─ parse_unit()
//!             ├─ "(" … ")" → parse_group() one level deeper
//!             └─ otherwise → parse_comparison() → Coercer
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **比较操作** `name==value`, `name!=value`, `name=gt=value`, ...
//! 3. **AND操作** `expr1;expr2`
//! 4. **OR操作** `expr1,expr2`
//!
//! ## 解析示例
//!
//! ```text
//! name==foo*;age=ge=18          AND(name == foo*, age >= 18)
//! a==1,b==2;c==3                OR(a == 1, AND(b == 2, c == 3))
//! a==1;(b==2,c==3)              AND(a == 1, OR(b == 2, c == 3))
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::AstNode;
use crate::coerce::Coercer;
use crate::condition::{ConditionType, PrimitiveStatement, SearchCondition};
use crate::config::ParserConfig;
use crate::error::{ConfigError, ParseError};
use crate::lexer::Lexer;
use crate::resolver::FieldResolver;
use crate::token::{Separator, Token, TokenKind};
use crate::value::FieldType;

/// Comparison operators, longest first so that `=` prefixes never shadow
/// the `=xx=` forms.
pub const OPERATORS: [(&str, ConditionType); 6] = [
    ("=gt=", ConditionType::GreaterThan),
    ("=ge=", ConditionType::GreaterOrEquals),
    ("=lt=", ConditionType::LessThan),
    ("=le=", ConditionType::LessOrEquals),
    ("==", ConditionType::Equals),
    ("!=", ConditionType::NotEquals),
];

const SINGLE_EQUALS: &str = "=";

static COMPARATORS_PATTERN: Lazy<Regex> = Lazy::new(|| comparators_pattern(false));
static COMPARATORS_PATTERN_SINGLE_EQUALS: Lazy<Regex> = Lazy::new(|| comparators_pattern(true));

/// Shortest non-empty name followed by the first operator found.
fn comparators_pattern(single_equals: bool) -> Regex {
    let mut alternatives: Vec<String> = OPERATORS.iter().map(|(op, _)| regex::escape(op)).collect();
    if single_equals {
        alternatives.push(regex::escape(SINGLE_EQUALS));
    }
    Regex::new(&format!("(?s)^(.+?)({})", alternatives.join("|"))).expect("operator pattern is valid")
}

fn operator_condition(op: &str) -> Option<ConditionType> {
    if op == SINGLE_EQUALS {
        return Some(ConditionType::Equals);
    }
    OPERATORS.iter().find(|(token, _)| *token == op).map(|(_, ct)| *ct)
}

/// Parses FIQL expressions into [`SearchCondition`] trees over `T`.
///
/// ```
/// use fiql_search::{FiqlParser, SearchBean, SearchBeanResolver};
///
/// let parser = FiqlParser::new(SearchBeanResolver);
/// let filter = parser.parse("name==foo*;city!=Paris").unwrap();
/// assert!(filter.is_met(&SearchBean::new().with("name", "food").with("city", "Oslo")));
/// ```
pub struct FiqlParser<T> {
    resolver: Arc<dyn FieldResolver<T>>,
    config: ParserConfig,
    coercer: Coercer,
}

impl<T> FiqlParser<T> {
    pub fn new<R>(resolver: R) -> Self
    where
        R: FieldResolver<T> + 'static,
    {
        Self { resolver: Arc::new(resolver), config: ParserConfig::default(), coercer: Coercer::default() }
    }

    pub fn with_config<R>(resolver: R, config: ParserConfig) -> Result<Self, ConfigError>
    where
        R: FieldResolver<T> + 'static,
    {
        Self::with_shared_resolver(Arc::new(resolver), config)
    }

    pub fn with_shared_resolver(
        resolver: Arc<dyn FieldResolver<T>>,
        config: ParserConfig,
    ) -> Result<Self, ConfigError> {
        let coercer = Coercer::new(&config)?;
        Ok(Self { resolver, config, coercer })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses `expression` and builds its condition tree.
    pub fn parse(&self, expression: &str) -> Result<SearchCondition<T>, ParseError> {
        let tokens: Vec<_> = Lexer::new(expression).collect();
        let mut session = Session { parser: self, input: expression, field_types: HashMap::new() };

        let ast = session.parse_group(&tokens, 0)?.ok_or(ParseError::NoConditions)?;
        tracing::debug!(expression, ast = %ast, "parsed FIQL expression");
        ast.build(&self.resolver).ok_or(ParseError::NoConditions)
    }
}

type Segment<'t, 'a> = (&'t [Token<'a>], Option<Separator>);

/// State of one `parse` call.
struct Session<'p, 'a, T> {
    parser: &'p FiqlParser<T>,
    input: &'a str,
    /// Resolver answers (canonical name and type), asked at most once per
    /// field name.
    field_types: HashMap<String, Option<(String, FieldType)>>,
}

impl<'a, T> Session<'_, 'a, T> {
    /// Source text covered by `tokens`.
    fn text(&self, tokens: &[Token<'a>]) -> &'a str {
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => &self.input[first.span.start..last.span.end],
            _ => "",
        }
    }

    /// Parses the tokens of one bracket level. `None` only when lax property
    /// matching dropped every comparison.
    fn parse_group(&mut self, tokens: &[Token<'a>], depth: usize) -> Result<Option<AstNode>, ParseError> {
        let max = self.parser.config.max_nesting_depth;
        if depth > max {
            return Err(ParseError::NestingTooDeep { max });
        }

        let segments = self.split(tokens)?;
        tracing::trace!(depth, segments = segments.len(), "split expression");

        // AND binds tighter than OR: every maximal AND run becomes one OR child
        let mut ors = Vec::new();
        let mut ands = Vec::new();
        for (segment, separator) in segments {
            if let Some(node) = self.parse_unit(segment, depth)? {
                ands.push(node);
            }
            if separator != Some(Separator::And) {
                close_and_run(&mut ands, &mut ors);
            }
        }

        Ok(match ors.len() {
            0 | 1 => ors.pop(),
            _ => Some(AstNode::SubExpression { operator: Separator::Or, children: ors }),
        })
    }

    /// Cuts `tokens` at separators on bracket level 0. Each segment carries
    /// the separator that follows it; the last one carries `None`.
    fn split<'t>(&self, tokens: &'t [Token<'a>]) -> Result<Vec<Segment<'t, 'a>>, ParseError> {
        let mut segments = Vec::new();
        let mut level = 0usize;
        let mut last = 0;

        for (i, token) in tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::LParen => level += 1,
                TokenKind::RParen => {
                    if level == 0 {
                        return Err(ParseError::UnexpectedClosingBracket { position: token.span.start });
                    }
                    level -= 1;
                }
                kind => {
                    if let (0, Some(separator)) = (level, kind.separator()) {
                        segments.push((&tokens[last..i], Some(separator)));
                        last = i + 1;
                    }
                }
            }
        }

        if level != 0 {
            return Err(ParseError::UnmatchedBrackets { expression: self.text(tokens).to_string() });
        }
        if last > 0 && last == tokens.len() {
            let fragment = match segments.last() {
                Some((segment, Some(separator))) => format!("{}{}", self.text(segment), separator.symbol()),
                _ => self.text(tokens).to_string(),
            };
            return Err(ParseError::DanglingOperator { fragment });
        }

        segments.push((&tokens[last..], None));
        Ok(segments)
    }

    fn parse_unit(&mut self, segment: &[Token<'a>], depth: usize) -> Result<Option<AstNode>, ParseError> {
        match segment.first() {
            Some(first) if first.kind == TokenKind::LParen => {
                // only a bracket closed by the last token wraps the whole unit: "(a)(b)" does not
                if matching_close(segment) == Some(segment.len() - 1) {
                    self.parse_group(&segment[1..segment.len() - 1], depth + 1)
                } else {
                    Err(ParseError::NotAComparison { expression: self.text(segment).to_string() })
                }
            }
            _ => self.parse_comparison(self.text(segment)),
        }
    }

    /// `name<op>value`. `None` when lax matching dropped an unknown property.
    fn parse_comparison(&mut self, expr: &str) -> Result<Option<AstNode>, ParseError> {
        let not_a_comparison = || ParseError::NotAComparison { expression: expr.to_string() };

        let parser = self.parser;
        let config = &parser.config;
        let pattern = if config.single_equals_operator {
            &COMPARATORS_PATTERN_SINGLE_EQUALS
        } else {
            &COMPARATORS_PATTERN
        };
        let caps = pattern.captures(expr).ok_or_else(not_a_comparison)?;
        let (Some(name), Some(op)) = (caps.get(1), caps.get(2)) else {
            return Err(not_a_comparison());
        };
        let raw = &expr[op.end()..];
        if raw.is_empty() {
            return Err(not_a_comparison());
        }
        let condition = operator_condition(op.as_str()).ok_or_else(not_a_comparison)?;

        let field = config.resolve_property(name.as_str()).to_string();
        let Some((field, field_type)) = self.field_type(&field) else {
            if config.lax_property_match {
                tracing::warn!(property = %field, "dropping comparison on unknown property");
                return Ok(None);
            }
            return Err(ParseError::PropertyNotFound { name: field, value: raw.to_string() });
        };

        let value = parser.coercer.coerce(&field, raw, field_type)?;
        let wildcard_only = value.as_str().is_some_and(|s| s.chars().all(|c| c == '*'));
        if wildcard_only && matches!(condition, ConditionType::Equals | ConditionType::NotEquals) {
            return Err(ParseError::WildcardOnly { name: field });
        }

        Ok(Some(AstNode::Comparison(PrimitiveStatement::new(field, condition, value))))
    }

    /// Type of `name` and the name the resolver stores it under, so that
    /// `thename` and `theName` end up as one field in the tree.
    fn field_type(&mut self, name: &str) -> Option<(String, FieldType)> {
        if let Some(cached) = self.field_types.get(name) {
            return cached.clone();
        }
        let resolver = &self.parser.resolver;
        let resolved = resolver
            .field_type(name)
            .map(|field_type| (resolver.canonical_name(name).unwrap_or_else(|| name.to_string()), field_type));
        self.field_types.insert(name.to_string(), resolved.clone());
        resolved
    }
}

/// Index of the bracket closing `tokens[0]`.
fn matching_close(tokens: &[Token<'_>]) -> Option<usize> {
    let mut level = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => level += 1,
            TokenKind::RParen => {
                level = level.checked_sub(1)?;
                if level == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Moves the pending AND run into the OR list; a run of one is added as is.
fn close_and_run(ands: &mut Vec<AstNode>, ors: &mut Vec<AstNode>) {
    match ands.len() {
        0 => {}
        1 => ors.append(ands),
        _ => ors.push(AstNode::SubExpression { operator: Separator::And, children: std::mem::take(ands) }),
    }
}
