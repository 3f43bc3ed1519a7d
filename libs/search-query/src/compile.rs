//! Filter tree → engine query syntax

use crate::escape::escape_phrase;
use crate::filter::{Comparator, ComplexFilter, Condition, Filter, SimpleFilter};

/// Term matching every document.
pub const MATCH_ALL: &str = "*:*";

impl Filter {
    /// Render the tree in the engine's boolean query syntax.
    pub fn compile(&self) -> String {
        match self {
            Filter::Simple(simple) => compile_simple(simple),
            Filter::Complex(complex) => compile_complex(complex),
        }
    }
}

fn compile_complex(complex: &ComplexFilter) -> String {
    let prefix = if complex.is_negated() { "-" } else { "" };
    if complex.children().is_empty() {
        return format!("{}{}", prefix, MATCH_ALL);
    }
    let separator = format!(" {} ", complex.combinator().as_str());
    let joined = complex
        .children()
        .iter()
        .map(Filter::compile)
        .collect::<Vec<_>>()
        .join(&separator);
    format!("{}({})", prefix, joined)
}

fn compile_simple(simple: &SimpleFilter) -> String {
    let prefix = match simple.comparator() {
        Comparator::Equals => "",
        Comparator::NotEquals => "-",
    };
    let field = simple.field();

    match simple.condition() {
        Condition::Range { lower, upper } => format!(
            "{}{}:[{} TO {}]",
            prefix,
            field,
            range_bound(lower),
            range_bound(upper)
        ),
        Condition::Values(values) if values.len() == 1 => {
            if field == "*" && values[0].trim() == "*" {
                return format!("{}{}", prefix, MATCH_ALL);
            }
            format!("{}{}:{}", prefix, field, escape_phrase(&values[0]))
        }
        Condition::Values(values) => {
            let separator = match simple.comparator() {
                Comparator::Equals => " OR ",
                Comparator::NotEquals => " AND ",
            };
            let terms = values
                .iter()
                .map(|value| format!("{}{}:{}", prefix, field, escape_phrase(value)))
                .collect::<Vec<_>>()
                .join(separator);
            format!("({})", terms)
        }
    }
}

fn range_bound(bound: &str) -> String {
    let bound = bound.trim();
    if bound == "*" {
        bound.to_string()
    } else {
        escape_phrase(bound)
    }
}
