use schemabridge_core::{AppError, AppResult};

/// Returns the symbol used for the parent metric at `index`.
#[must_use]
pub fn placeholder_name(index: usize) -> String {
    format!("m{index}")
}

/// Renders a formula template with `m0`, `m1`, ... for its parent metrics.
pub fn render_formula_template(template: &str, parent_count: usize) -> AppResult<String> {
    render_template(template, parent_count, placeholder_name)
}

/// Renders a formula template with `[parent name]` for each placeholder.
pub fn render_display_formula(template: &str, parent_names: &[&str]) -> AppResult<String> {
    render_template(template, parent_names.len(), |index| {
        format!("[{}]", parent_names.get(index).copied().unwrap_or_default())
    })
}

/// Substitutes `{n}` and `{}` placeholders; `{{` and `}}` are literal braces.
fn render_template<F>(template: &str, count: usize, mut placeholder: F) -> AppResult<String>
where
    F: FnMut(usize) -> String,
{
    let mut output = String::with_capacity(template.len());
    let mut characters = template.chars().peekable();
    let mut next_automatic = 0_usize;
    let mut numbering: Option<bool> = None;

    while let Some(character) = characters.next() {
        match character {
            '{' if characters.peek() == Some(&'{') => {
                characters.next();
                output.push('{');
            }
            '{' => {
                let mut content = String::new();
                let mut closed = false;
                for inner in characters.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    content.push(inner);
                }

                if !closed {
                    return Err(AppError::Validation(format!(
                        "formula template '{template}' has an unclosed placeholder"
                    )));
                }

                let automatic = content.trim().is_empty();
                if numbering.is_some_and(|previous| previous != automatic) {
                    return Err(AppError::Validation(format!(
                        "formula template '{template}' mixes automatic and manual placeholders"
                    )));
                }
                numbering = Some(automatic);

                let index = if automatic {
                    let index = next_automatic;
                    next_automatic += 1;
                    index
                } else {
                    content.trim().parse::<usize>().map_err(|_| {
                        AppError::Validation(format!(
                            "formula template '{template}' has non-positional placeholder '{{{content}}}'"
                        ))
                    })?
                };

                if index >= count {
                    return Err(AppError::Validation(format!(
                        "formula template '{template}' references parent {index} but only {count} parent metrics are declared"
                    )));
                }

                output.push_str(placeholder(index).as_str());
            }
            '}' if characters.peek() == Some(&'}') => {
                characters.next();
                output.push('}');
            }
            '}' => {
                return Err(AppError::Validation(format!(
                    "formula template '{template}' has an unmatched '}}'"
                )));
            }
            other => output.push(other),
        }
    }

    Ok(output)
}
