use proptest::prelude::*;
use schemabridge_core::AppError;
use serde_json::{Value, json};

use super::{Expression, FormulaTranslator, parse_formula, render_formula_template};
use crate::metric::{Aggregation, ComposedMetric, MetricDefinition, SimpleMetric};
use crate::target::TargetField;

fn fields() -> Vec<TargetField> {
    [("Revenue", 11), ("Cost", 12), ("Customers", 13), ("Orders", 14)]
        .into_iter()
        .map(|(name, id)| TargetField {
            id,
            name: name.to_owned(),
        })
        .collect()
}

fn simple(name: &str, aggregation: Aggregation) -> MetricDefinition {
    match SimpleMetric::new(name, "", name, aggregation) {
        Ok(metric) => MetricDefinition::Simple(metric),
        Err(error) => panic!("invalid simple metric in test: {error}"),
    }
}

fn composed(name: &str, template: &str, parents: Vec<MetricDefinition>) -> MetricDefinition {
    match ComposedMetric::new(name, "", template, parents) {
        Ok(metric) => MetricDefinition::Composed(metric),
        Err(error) => panic!("invalid composed metric in test: {error}"),
    }
}

fn translate(metric: &MetricDefinition) -> Result<Value, AppError> {
    let fields = fields();
    FormulaTranslator::new("orders", &fields).translate(metric)
}

fn symbol(name: &str) -> Expression {
    Expression::Symbol(name.to_owned())
}

#[test]
fn simple_metric_lowers_to_aggregation_over_field() {
    let result = translate(&simple("Revenue", Aggregation::Sum));
    assert_eq!(result.ok(), Some(json!(["sum", ["field-id", 11]])));
}

#[test]
fn distinct_count_lowers_to_distinct() {
    let result = translate(&simple("Customers", Aggregation::DistinctCount));
    assert_eq!(result.ok(), Some(json!(["distinct", ["field-id", 13]])));
}

#[test]
fn other_aggregations_pass_through() {
    assert_eq!(
        translate(&simple("Orders", Aggregation::Count)).ok(),
        Some(json!(["count", ["field-id", 14]]))
    );
    assert_eq!(
        translate(&simple("Cost", Aggregation::Avg)).ok(),
        Some(json!(["avg", ["field-id", 12]]))
    );
}

#[test]
fn missing_field_is_reported() {
    let result = translate(&simple("Discount", Aggregation::Sum));
    assert!(matches!(
        result,
        Err(AppError::FieldNotFound { ref metric, ref table })
            if metric == "Discount" && table == "orders"
    ));
}

#[test]
fn division_lowers_to_binary_division() {
    let margin = composed(
        "Margin",
        "{0}/{1}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
        ],
    );

    assert_eq!(
        translate(&margin).ok(),
        Some(json!([
            "/",
            ["sum", ["field-id", 11]],
            ["sum", ["field-id", 12]]
        ]))
    );
}

#[test]
fn reciprocal_lowers_to_one_over_base() {
    let reciprocal = composed(
        "Inverse revenue",
        "1/{0}",
        vec![simple("Revenue", Aggregation::Sum)],
    );

    assert_eq!(
        translate(&reciprocal).ok(),
        Some(json!(["/", 1, ["sum", ["field-id", 11]]]))
    );
}

#[test]
fn multiplication_with_divisor_combines_into_one_division() {
    let metric = composed(
        "Weighted",
        "{0} * {1} / {2}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
            simple("Orders", Aggregation::Count),
        ],
    );

    assert_eq!(
        translate(&metric).ok(),
        Some(json!([
            "/",
            ["*", ["sum", ["field-id", 11]], ["sum", ["field-id", 12]]],
            ["count", ["field-id", 14]]
        ]))
    );
}

#[test]
fn addition_and_multiplication_are_n_ary() {
    let metric = composed(
        "Total",
        "{0} + {1} + 2.5 * {2}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
            simple("Orders", Aggregation::Count),
        ],
    );

    assert_eq!(
        translate(&metric).ok(),
        Some(json!([
            "+",
            ["sum", ["field-id", 11]],
            ["sum", ["field-id", 12]],
            ["*", 2.5, ["count", ["field-id", 14]]]
        ]))
    );
}

#[test]
fn parenthesised_sums_keep_precedence() {
    let metric = composed(
        "Average basket",
        "({0} + {1}) / {2}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
            simple("Orders", Aggregation::Count),
        ],
    );

    assert_eq!(
        translate(&metric).ok(),
        Some(json!([
            "/",
            ["+", ["sum", ["field-id", 11]], ["sum", ["field-id", 12]]],
            ["count", ["field-id", 14]]
        ]))
    );
}

#[test]
fn composed_parents_are_substituted_recursively() {
    let margin = composed(
        "Margin",
        "{0}/{1}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
        ],
    );
    let margin_percent = composed("Margin %", "100 * {0}", vec![margin]);

    assert_eq!(
        translate(&margin_percent).ok(),
        Some(json!([
            "*",
            100,
            ["/", ["sum", ["field-id", 11]], ["sum", ["field-id", 12]]]
        ]))
    );
}

#[test]
fn missing_field_in_parent_fails_composed_translation() {
    let metric = composed(
        "Broken",
        "{0}+{1}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Discount", Aggregation::Sum),
        ],
    );

    assert!(matches!(
        translate(&metric),
        Err(AppError::FieldNotFound { .. })
    ));
}

#[test]
fn unsupported_forms_are_rejected() {
    for formula in ["m0 ** 2", "m0 ^ 2", "sqrt(m0)", "m0 - abs(m1)"] {
        assert!(
            matches!(
                parse_formula(formula),
                Err(AppError::UnsupportedExpression(_))
            ),
            "expected '{formula}' to be unsupported"
        );
    }
}

#[test]
fn subtraction_lowers_to_addition_of_negated_term() {
    let margin = composed(
        "Margin",
        "{0} - {1}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
        ],
    );

    assert_eq!(
        translate(&margin).ok(),
        Some(json!([
            "+",
            ["sum", ["field-id", 11]],
            ["*", -1, ["sum", ["field-id", 12]]]
        ]))
    );
}

#[test]
fn negation_folds_into_literals_and_products() {
    assert_eq!(
        parse_formula("m0 - 2").ok(),
        Some(Expression::Sum(vec![symbol("m0"), Expression::Integer(-2)]))
    );
    assert_eq!(
        parse_formula("-m0 * m1").ok(),
        Some(Expression::Product(vec![
            Expression::Integer(-1),
            symbol("m0"),
            symbol("m1"),
        ]))
    );
    assert_eq!(
        parse_formula("m0 - m1 / m2").ok(),
        Some(Expression::Sum(vec![
            symbol("m0"),
            Expression::Quotient {
                numerator: Box::new(Expression::Product(vec![
                    Expression::Integer(-1),
                    symbol("m1"),
                ])),
                denominator: Box::new(symbol("m2")),
            },
        ]))
    );
    assert_eq!(parse_formula("-0.5").ok(), Some(Expression::Float(-0.5)));
}

#[test]
fn unknown_symbols_are_rejected_during_translation() {
    let metric = composed(
        "Odd",
        "{0} + revenue",
        vec![simple("Revenue", Aggregation::Sum)],
    );

    assert!(matches!(
        translate(&metric),
        Err(AppError::UnsupportedExpression(_))
    ));
}

#[test]
fn malformed_formulas_are_validation_errors() {
    for formula in ["", "m0 +", "m0 -", "(m0 + m1", "m0 m1", "m0 + )", "1.2.3"] {
        assert!(
            matches!(parse_formula(formula), Err(AppError::Validation(_))),
            "expected '{formula}' to be malformed"
        );
    }
}

#[test]
fn literals_keep_their_numeric_kind() {
    assert_eq!(parse_formula("42").ok(), Some(Expression::Integer(42)));
    assert_eq!(parse_formula("0.5").ok(), Some(Expression::Float(0.5)));
    assert_eq!(parse_formula("1e3").ok(), Some(Expression::Float(1000.0)));
}

#[test]
fn chained_divisions_share_one_denominator() {
    assert_eq!(
        parse_formula("m0 / m1 / m2").ok(),
        Some(Expression::Quotient {
            numerator: Box::new(symbol("m0")),
            denominator: Box::new(Expression::Product(vec![symbol("m1"), symbol("m2")])),
        })
    );
}

#[test]
fn template_placeholders_render_positionally() {
    assert_eq!(
        render_formula_template("{1} / {0}", 2).ok(),
        Some("m1 / m0".to_owned())
    );
    assert_eq!(
        render_formula_template("{} + {}", 2).ok(),
        Some("m0 + m1".to_owned())
    );
    assert_eq!(
        render_formula_template("{{literal}} {0}", 1).ok(),
        Some("{literal} m0".to_owned())
    );
    assert!(render_formula_template("{2}", 2).is_err());
    assert!(render_formula_template("{} + {1}", 2).is_err());
    assert!(render_formula_template("{name}", 1).is_err());
}

#[test]
fn translation_is_deterministic() {
    let metric = composed(
        "Margin",
        "({0} + {1}) * {0} / {1}",
        vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
        ],
    );

    assert_eq!(translate(&metric).ok(), translate(&metric).ok());
}

fn operator_and_operand_set(value: &Value) -> Option<(String, Vec<String>)> {
    let items = value.as_array()?;
    let (operator, operands) = items.split_first()?;
    let mut operands: Vec<String> = operands.iter().map(Value::to_string).collect();
    operands.sort();
    Some((operator.as_str()?.to_owned(), operands))
}

proptest! {
    #[test]
    fn commutative_operators_yield_same_operand_set(
        operator in prop_oneof![Just("+"), Just("*")],
        order in Just(vec![0_usize, 1, 2]).prop_shuffle(),
    ) {
        let parents = vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Avg),
            simple("Orders", Aggregation::Count),
        ];
        let forward = format!("{{0}} {operator} {{1}} {operator} {{2}}");
        let shuffled = order
            .iter()
            .map(|index| format!("{{{index}}}"))
            .collect::<Vec<_>>()
            .join(format!(" {operator} ").as_str());

        let forward = translate(&composed("Forward", forward.as_str(), parents.clone()));
        let shuffled = translate(&composed("Shuffled", shuffled.as_str(), parents));

        let forward = forward.ok().and_then(|value| operator_and_operand_set(&value));
        let shuffled = shuffled.ok().and_then(|value| operator_and_operand_set(&value));
        prop_assert!(forward.is_some());
        prop_assert_eq!(forward, shuffled);
    }

    #[test]
    fn division_keeps_operand_order(swap in any::<bool>()) {
        let parents = vec![
            simple("Revenue", Aggregation::Sum),
            simple("Cost", Aggregation::Sum),
        ];
        let template = if swap { "{1}/{0}" } else { "{0}/{1}" };
        let (numerator, denominator) = if swap { (12, 11) } else { (11, 12) };

        let result = translate(&composed("Ratio", template, parents));
        prop_assert_eq!(
            result.ok(),
            Some(json!([
                "/",
                ["sum", ["field-id", numerator]],
                ["sum", ["field-id", denominator]]
            ]))
        );
    }
}
