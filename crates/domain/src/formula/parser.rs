use schemabridge_core::{AppError, AppResult};

use super::Expression;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Symbol(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LeftParen,
    RightParen,
    Other(char),
}

/// Parses a rendered formula such as `(m0 + m1) / m2`.
///
/// Only `+`, `-`, `*`, `/`, parentheses, numeric literals and symbols are
/// legal. Subtraction is kept as addition of a term multiplied by `-1`, so
/// `m0 - m1` parses as `m0 + (-1 * m1)`. Powers and function calls fail with
/// [`AppError::UnsupportedExpression`]; malformed input fails with
/// [`AppError::Validation`].
pub fn parse_formula(formula: &str) -> AppResult<Expression> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser {
        formula,
        tokens,
        position: 0,
    };

    let expression = parser.parse_sum()?;
    match parser.peek() {
        None => Ok(expression),
        Some(token) => Err(parser.unexpected(token)),
    }
}

fn tokenize(formula: &str) -> AppResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut characters = formula.chars().peekable();

    while let Some(&character) = characters.peek() {
        if character.is_whitespace() {
            characters.next();
            continue;
        }

        if character.is_ascii_digit() || character == '.' {
            let mut literal = String::new();
            while let Some(&digit) = characters.peek() {
                if digit.is_ascii_digit() || digit == '.' {
                    literal.push(digit);
                    characters.next();
                } else if (digit == 'e' || digit == 'E') && !literal.contains(['e', 'E']) {
                    literal.push(digit);
                    characters.next();
                    if let Some(&sign) = characters.peek()
                        && (sign == '+' || sign == '-')
                    {
                        literal.push(sign);
                        characters.next();
                    }
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(literal));
            continue;
        }

        if character.is_alphabetic() || character == '_' {
            let mut name = String::new();
            while let Some(&part) = characters.peek() {
                if part.is_alphanumeric() || part == '_' {
                    name.push(part);
                    characters.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Symbol(name));
            continue;
        }

        characters.next();
        let token = match character {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' if characters.peek() == Some(&'*') => {
                characters.next();
                Token::Power
            }
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Power,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            other => Token::Other(other),
        };
        tokens.push(token);
    }

    if tokens.is_empty() {
        return Err(AppError::Validation("formula is empty".to_owned()));
    }

    Ok(tokens)
}

struct Parser<'a> {
    formula: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).cloned()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.position += 1;
        token
    }

    fn parse_sum(&mut self) -> AppResult<Expression> {
        let mut terms = Vec::new();
        push_flattened(&mut terms, self.parse_product()?, |expression| {
            matches!(expression, Expression::Sum(_))
        });

        loop {
            let term = match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    self.parse_product()?
                }
                Some(Token::Minus) => {
                    self.advance();
                    negate(self.parse_product()?)
                }
                _ => break,
            };
            push_flattened(&mut terms, term, |expression| {
                matches!(expression, Expression::Sum(_))
            });
        }

        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expression::Sum(terms)
        })
    }

    /// Factors after `/` are collected as divisors and combined with the other
    /// factors into a single quotient.
    fn parse_product(&mut self) -> AppResult<Expression> {
        let mut numerators = Vec::new();
        let mut denominators = Vec::new();
        add_factor(&mut numerators, &mut denominators, self.parse_factor()?);

        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    add_factor(&mut numerators, &mut denominators, self.parse_factor()?);
                }
                Some(Token::Slash) => {
                    self.advance();
                    let divisor = self.parse_factor()?;
                    push_flattened(&mut denominators, divisor, |expression| {
                        matches!(expression, Expression::Product(_))
                    });
                }
                _ => break,
            }
        }

        let numerator = combine_factors(numerators).unwrap_or(Expression::Integer(1));
        Ok(match combine_factors(denominators) {
            None => numerator,
            Some(denominator) => Expression::Quotient {
                numerator: Box::new(numerator),
                denominator: Box::new(denominator),
            },
        })
    }

    fn parse_factor(&mut self) -> AppResult<Expression> {
        match self.advance() {
            Some(Token::Number(literal)) => parse_number(literal.as_str()),
            Some(Token::Minus) => Ok(negate(self.parse_factor()?)),
            Some(Token::Symbol(name)) => {
                if self.peek() == Some(Token::LeftParen) {
                    return Err(AppError::UnsupportedExpression(format!(
                        "function call '{name}(...)' in formula '{}'",
                        self.formula
                    )));
                }
                Ok(Expression::Symbol(name))
            }
            Some(Token::LeftParen) => {
                let inner = self.parse_sum()?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    Some(token) => Err(self.unexpected(token)),
                    None => Err(AppError::Validation(format!(
                        "formula '{}' has an unclosed parenthesis",
                        self.formula
                    ))),
                }
            }
            Some(token) => Err(self.unexpected(token)),
            None => Err(AppError::Validation(format!(
                "formula '{}' ends unexpectedly",
                self.formula
            ))),
        }
    }

    fn unexpected(&self, token: Token) -> AppError {
        match token {
            Token::Power => {
                AppError::UnsupportedExpression(format!("power in formula '{}'", self.formula))
            }
            other => AppError::Validation(format!(
                "unexpected token {other:?} in formula '{}'",
                self.formula
            )),
        }
    }
}

fn add_factor(
    numerators: &mut Vec<Expression>,
    denominators: &mut Vec<Expression>,
    factor: Expression,
) {
    match factor {
        Expression::Product(factors) => numerators.extend(factors),
        Expression::Quotient {
            numerator,
            denominator,
        } => {
            add_factor(numerators, denominators, *numerator);
            push_flattened(denominators, *denominator, |expression| {
                matches!(expression, Expression::Product(_))
            });
        }
        other => numerators.push(other),
    }
}

fn negate(expression: Expression) -> Expression {
    match expression {
        Expression::Integer(value) => match value.checked_neg() {
            Some(negated) => Expression::Integer(negated),
            None => Expression::Product(vec![Expression::Integer(-1), Expression::Integer(value)]),
        },
        Expression::Float(value) => Expression::Float(-value),
        Expression::Product(mut factors) => {
            factors.insert(0, Expression::Integer(-1));
            Expression::Product(factors)
        }
        Expression::Quotient {
            numerator,
            denominator,
        } => Expression::Quotient {
            numerator: Box::new(negate(*numerator)),
            denominator,
        },
        other => Expression::Product(vec![Expression::Integer(-1), other]),
    }
}

fn push_flattened<F>(target: &mut Vec<Expression>, expression: Expression, is_same_kind: F)
where
    F: Fn(&Expression) -> bool,
{
    if is_same_kind(&expression) {
        if let Expression::Sum(items) | Expression::Product(items) = expression {
            target.extend(items);
        }
    } else {
        target.push(expression);
    }
}

fn combine_factors(mut factors: Vec<Expression>) -> Option<Expression> {
    match factors.len() {
        0 => None,
        1 => factors.pop(),
        _ => Some(Expression::Product(factors)),
    }
}

fn parse_number(literal: &str) -> AppResult<Expression> {
    let is_float = literal.contains(['.', 'e', 'E']);
    if !is_float && let Ok(value) = literal.parse::<i64>() {
        return Ok(Expression::Integer(value));
    }

    literal
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Expression::Float)
        .ok_or_else(|| AppError::Validation(format!("invalid numeric literal '{literal}'")))
}
