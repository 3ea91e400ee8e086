//! Field resolvers: how the parser learns a field's type and how conditions
//! read (and, for templates, write) field values on a candidate.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::value::{FieldType, Scalar, Value};

/// Answers "what type is field X" and reads fields off candidates.
pub trait FieldResolver<T>: Send + Sync {
    /// Declared type of `name`, or `None` if the field is unknown.
    fn field_type(&self, name: &str) -> Option<FieldType>;

    /// The name `name` is stored under when lookups are not exact. Two
    /// spellings of one field must give the same answer. `None` keeps `name`.
    fn canonical_name(&self, _name: &str) -> Option<String> {
        None
    }

    /// Reads `name` from `candidate`. `None` means the value is absent.
    fn get(&self, candidate: &T, name: &str) -> Option<Value>;

    /// An empty instance that AND-folded conditions populate with their
    /// literals. Resolvers that cannot build one disable the folding.
    fn template(&self) -> Option<T> {
        None
    }

    /// Writes `value` into `name` on `target`; false if the field cannot be set.
    fn set(&self, _target: &mut T, _name: &str, _value: Value) -> bool {
        false
    }
}

type Getter<T> = Box<dyn Fn(&T) -> Option<Value> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) + Send + Sync>;

struct FieldAccessor<T> {
    field_type: FieldType,
    getter: Getter<T>,
    setter: Option<Setter<T>>,
}

/// A statically declared accessor table for a concrete type.
///
/// ```
/// use fiql_search::{FieldType, Schema, Value};
///
/// #[derive(Default)]
/// struct Person {
///     name: Option<String>,
///     age: Option<i64>,
/// }
///
/// let schema = Schema::<Person>::new()
///     .field(
///         "name",
///         FieldType::String,
///         |p| p.name.clone().map(Value::String),
///         |p, v| p.name = v.into_string(),
///     )
///     .field("age", FieldType::Integer, |p| p.age.map(Value::Integer), |p, v| p.age = v.as_i64());
/// ```
pub struct Schema<T> {
    fields: IndexMap<String, FieldAccessor<T>>,
}

impl<T> Schema<T> {
    pub fn new() -> Self {
        Self { fields: IndexMap::new() }
    }

    pub fn field<G, S>(mut self, name: impl Into<String>, field_type: FieldType, getter: G, setter: S) -> Self
    where
        G: Fn(&T) -> Option<Value> + Send + Sync + 'static,
        S: Fn(&mut T, Value) + Send + Sync + 'static,
    {
        self.fields.insert(
            name.into(),
            FieldAccessor { field_type, getter: Box::new(getter), setter: Some(Box::new(setter)) },
        );
        self
    }

    /// A field that can be searched but not written; its presence in an AND
    /// group prevents folding.
    pub fn read_only_field<G>(mut self, name: impl Into<String>, field_type: FieldType, getter: G) -> Self
    where
        G: Fn(&T) -> Option<Value> + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), FieldAccessor { field_type, getter: Box::new(getter), setter: None });
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Exact match first, then ASCII case-insensitive (`thename` finds `theName`).
    fn lookup(&self, name: &str) -> Option<(&String, &FieldAccessor<T>)> {
        self.fields
            .get_key_value(name)
            .or_else(|| self.fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)))
    }

    fn accessor(&self, name: &str) -> Option<&FieldAccessor<T>> {
        self.lookup(name).map(|(_, a)| a)
    }
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter().map(|(k, a)| (k, a.field_type))).finish()
    }
}

impl<T: Default> FieldResolver<T> for Schema<T> {
    fn field_type(&self, name: &str) -> Option<FieldType> {
        self.accessor(name).map(|a| a.field_type)
    }

    fn canonical_name(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|(k, _)| k.clone())
    }

    fn get(&self, candidate: &T, name: &str) -> Option<Value> {
        self.accessor(name).and_then(|a| (a.getter)(candidate))
    }

    fn template(&self) -> Option<T> {
        Some(T::default())
    }

    fn set(&self, target: &mut T, name: &str, value: Value) -> bool {
        match self.accessor(name).and_then(|a| a.setter.as_ref()) {
            Some(setter) => {
                setter(target, value);
                true
            }
            None => false,
        }
    }
}

/// A weakly typed candidate: field names to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBean {
    values: HashMap<String, String>,
}

impl SearchBean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Resolver for [`SearchBean`]: every field exists and every value is a string.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchBeanResolver;

impl FieldResolver<SearchBean> for SearchBeanResolver {
    fn field_type(&self, _name: &str) -> Option<FieldType> {
        Some(FieldType::String)
    }

    fn get(&self, candidate: &SearchBean, name: &str) -> Option<Value> {
        candidate.get(name).map(Value::from)
    }

    fn template(&self) -> Option<SearchBean> {
        Some(SearchBean::new())
    }

    fn set(&self, target: &mut SearchBean, name: &str, value: Value) -> bool {
        target.set(name, value.to_string());
        true
    }
}

/// Resolver for bare scalar candidates (`i64`, `String`, ...).
///
/// Every comparison reads the candidate itself whatever the field name, and
/// no template exists, so AND groups are never folded.
pub struct PrimitiveResolver<S> {
    _scalar: PhantomData<fn() -> S>,
}

impl<S> PrimitiveResolver<S> {
    pub fn new() -> Self {
        Self { _scalar: PhantomData }
    }
}

impl<S> Default for PrimitiveResolver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for PrimitiveResolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveResolver").finish()
    }
}

impl<S: Scalar> FieldResolver<S> for PrimitiveResolver<S> {
    fn field_type(&self, _name: &str) -> Option<FieldType> {
        Some(S::FIELD_TYPE)
    }

    fn get(&self, candidate: &S, _name: &str) -> Option<Value> {
        Some(candidate.to_value())
    }
}
