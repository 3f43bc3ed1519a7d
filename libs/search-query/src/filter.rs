//! Boolean filter tree
//!
//! A filter is either a simple comparison on one field or a group of child
//! filters joined by AND/OR, optionally negated. Constructors validate the
//! shape so a compiled tree is always well-formed.

use crate::{QueryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// One or more alternative values (never empty).
    Values(Vec<String>),
    /// Inclusive range, `*` for an open bound.
    Range { lower: String, upper: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleFilter {
    field: String,
    comparator: Comparator,
    condition: Condition,
}

impl SimpleFilter {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexFilter {
    children: Vec<Filter>,
    combinator: Combinator,
    negated: bool,
}

impl ComplexFilter {
    pub fn children(&self) -> &[Filter] {
        &self.children
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Simple(SimpleFilter),
    Complex(ComplexFilter),
}

impl Filter {
    /// `field` equals any of `values`.
    pub fn equals<I, S>(field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::values(field, Comparator::Equals, values)
    }

    /// `field` equals none of `values`.
    pub fn not_equals<I, S>(field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::values(field, Comparator::NotEquals, values)
    }

    /// `field` lies within `[lower, upper]`.
    pub fn range(field: &str, lower: impl Into<String>, upper: impl Into<String>) -> Result<Self> {
        Self::bounded(field, Comparator::Equals, lower.into(), upper.into())
    }

    /// `field` lies outside `[lower, upper]`.
    pub fn not_in_range(
        field: &str,
        lower: impl Into<String>,
        upper: impl Into<String>,
    ) -> Result<Self> {
        Self::bounded(field, Comparator::NotEquals, lower.into(), upper.into())
    }

    /// All children must match.
    pub fn all(children: Vec<Filter>) -> Self {
        Self::group(children, Combinator::And)
    }

    /// At least one child must match.
    pub fn any(children: Vec<Filter>) -> Self {
        Self::group(children, Combinator::Or)
    }

    pub fn group(children: Vec<Filter>, combinator: Combinator) -> Self {
        Filter::Complex(ComplexFilter {
            children,
            combinator,
            negated: false,
        })
    }

    /// Negate a group. Simple filters are wrapped into a single-child group.
    pub fn negate(self) -> Self {
        match self {
            Filter::Complex(mut complex) => {
                complex.negated = !complex.negated;
                Filter::Complex(complex)
            }
            simple @ Filter::Simple(_) => Filter::Complex(ComplexFilter {
                children: vec![simple],
                combinator: Combinator::And,
                negated: true,
            }),
        }
    }

    fn values<I, S>(field: &str, comparator: Comparator, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let field = checked_field(field)?;
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(QueryError::invalid(format!(
                "filter on '{}' requires at least one value",
                field
            )));
        }
        if values.iter().any(|v| v.trim().is_empty()) {
            return Err(QueryError::invalid(format!(
                "filter on '{}' has a blank value",
                field
            )));
        }
        Ok(Filter::Simple(SimpleFilter {
            field,
            comparator,
            condition: Condition::Values(values),
        }))
    }

    fn bounded(field: &str, comparator: Comparator, lower: String, upper: String) -> Result<Self> {
        let field = checked_field(field)?;
        if lower.trim().is_empty() || upper.trim().is_empty() {
            return Err(QueryError::invalid(format!(
                "range on '{}' requires two bounds",
                field
            )));
        }
        Ok(Filter::Simple(SimpleFilter {
            field,
            comparator,
            condition: Condition::Range { lower, upper },
        }))
    }
}

fn checked_field(field: &str) -> Result<String> {
    let field = field.trim();
    if field.is_empty() || field.contains(char::is_whitespace) {
        return Err(QueryError::invalid(format!(
            "invalid filter field name '{}'",
            field
        )));
    }
    Ok(field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_values() {
        let err = Filter::equals("doctype", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery(_)));
    }

    #[test]
    fn rejects_blank_values() {
        assert!(Filter::equals("title", ["  "]).is_err());
        assert!(Filter::not_equals("title", ["a", ""]).is_err());
        assert!(Filter::equals("title", [" a "]).is_ok());
    }

    #[test]
    fn rejects_blank_field_and_bounds() {
        assert!(Filter::equals(" ", ["x"]).is_err());
        assert!(Filter::equals("two words", ["x"]).is_err());
        assert!(Filter::range("year", "2000", "").is_err());
    }

    #[test]
    fn negate_twice_restores_group() {
        let group = Filter::all(vec![Filter::equals("a", ["1"]).unwrap()]);
        assert_eq!(group.clone().negate().negate(), group);
    }

    #[test]
    fn negating_simple_wraps_it() {
        let simple = Filter::equals("a", ["1"]).unwrap();
        match simple.clone().negate() {
            Filter::Complex(c) => {
                assert!(c.is_negated());
                assert_eq!(c.children(), &[simple]);
            }
            Filter::Simple(_) => panic!("expected group"),
        }
    }
}
