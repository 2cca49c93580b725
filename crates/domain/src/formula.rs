//! Composed-metric formulas and their translation into the target query language.
//!
//! A formula is rendered from its template (placeholders become `m0`, `m1`, ...),
//! parsed with a small recursive-descent parser over `+ * /`, numbers and symbols,
//! and lowered into nested JSON arrays.

mod parser;
mod template;
mod translator;

pub use parser::parse_formula;
pub use template::{placeholder_name, render_display_formula, render_formula_template};
pub use translator::FormulaTranslator;

/// Parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// N-ary addition.
    Sum(Vec<Expression>),
    /// N-ary multiplication.
    Product(Vec<Expression>),
    /// Division of a numerator by a denominator.
    Quotient {
        /// Dividend.
        numerator: Box<Expression>,
        /// Divisor.
        denominator: Box<Expression>,
    },
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// Placeholder naming a parent metric.
    Symbol(String),
}

#[cfg(test)]
mod tests;
