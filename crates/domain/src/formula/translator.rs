use schemabridge_core::{AppError, AppResult};
use serde_json::{Number, Value, json};

use crate::metric::{ComposedMetric, MetricDefinition, SimpleMetric};
use crate::target::TargetField;

use super::{Expression, parse_formula, placeholder_name, render_formula_template};

/// Translates metric definitions into aggregation clauses of the target query language.
///
/// Translation is pure: the same metric and the same field layout always yield
/// the same nested array.
#[derive(Debug, Clone, Copy)]
pub struct FormulaTranslator<'a> {
    table_name: &'a str,
    fields: &'a [TargetField],
}

impl<'a> FormulaTranslator<'a> {
    /// Creates a translator resolving fields against one target table.
    #[must_use]
    pub fn new(table_name: &'a str, fields: &'a [TargetField]) -> Self {
        Self { table_name, fields }
    }

    /// Translates a metric into a nested-array expression.
    pub fn translate(&self, metric: &MetricDefinition) -> AppResult<Value> {
        match metric {
            MetricDefinition::Simple(metric) => self.translate_simple(metric),
            MetricDefinition::Composed(metric) => self.translate_composed(metric),
        }
    }

    fn translate_simple(&self, metric: &SimpleMetric) -> AppResult<Value> {
        let field = self
            .fields
            .iter()
            .find(|field| field.name == metric.field_name())
            .ok_or_else(|| AppError::FieldNotFound {
                metric: metric.name().to_owned(),
                table: self.table_name.to_owned(),
            })?;

        Ok(json!([
            metric.aggregation().target_token(),
            ["field-id", field.id]
        ]))
    }

    fn translate_composed(&self, metric: &ComposedMetric) -> AppResult<Value> {
        let formula =
            render_formula_template(metric.formula_template(), metric.parent_metrics().len())?;
        let expression = parse_formula(formula.as_str())?;
        self.lower(&expression, metric)
    }

    fn lower(&self, expression: &Expression, metric: &ComposedMetric) -> AppResult<Value> {
        match expression {
            Expression::Sum(operands) => self.lower_operator("+", operands, metric),
            Expression::Product(operands) => self.lower_operator("*", operands, metric),
            Expression::Quotient {
                numerator,
                denominator,
            } => Ok(json!([
                "/",
                self.lower(numerator, metric)?,
                self.lower(denominator, metric)?
            ])),
            Expression::Integer(value) => Ok(json!(value)),
            Expression::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .ok_or_else(|| {
                    AppError::UnsupportedExpression(format!(
                        "non-finite literal {value} in metric '{}'",
                        metric.name()
                    ))
                }),
            Expression::Symbol(name) => {
                let parent = metric
                    .parent_metrics()
                    .iter()
                    .enumerate()
                    .find(|(index, _)| placeholder_name(*index) == *name)
                    .map(|(_, parent)| parent)
                    .ok_or_else(|| {
                        AppError::UnsupportedExpression(format!(
                            "unknown symbol '{name}' in metric '{}'",
                            metric.name()
                        ))
                    })?;

                self.translate(parent)
            }
        }
    }

    fn lower_operator(
        &self,
        operator: &str,
        operands: &[Expression],
        metric: &ComposedMetric,
    ) -> AppResult<Value> {
        let mut lowered = Vec::with_capacity(operands.len() + 1);
        lowered.push(Value::String(operator.to_owned()));
        for operand in operands {
            lowered.push(self.lower(operand, metric)?);
        }

        Ok(Value::Array(lowered))
    }
}
