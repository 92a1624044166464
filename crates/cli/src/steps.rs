use anyhow::{bail, Result};
use namnbyte_core::OperationStep;

/// Groups tokens into steps: a `--name` token opens a step and the tokens
/// after it are its arguments. The first token always opens a step, with or
/// without the dashes, so `snake` and `--snake` mean the same thing.
/// An argument that has to start with `--` is written as `\--`.
pub fn parse_steps<S: AsRef<str>>(tokens: &[S]) -> Vec<OperationStep> {
    let mut steps: Vec<OperationStep> = Vec::new();
    for token in tokens {
        let token = token.as_ref();
        let opens_step = steps.is_empty() || (token.starts_with("--") && token.len() > 2);
        if opens_step {
            steps.push(OperationStep::new(token, Vec::<String>::new()));
        } else if let Some(step) = steps.last_mut() {
            let arg = token.strip_prefix('\\').filter(|rest| rest.starts_with("--"));
            step.args.push(arg.unwrap_or(token).to_string());
        }
    }
    steps
}

/// Splits an interactive line into tokens. Single quotes are literal, double
/// quotes allow `\"` and `\\`, and a bare backslash escapes the next char.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => bail!("unterminated single quote"),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => bail!("unterminated double quote"),
                        },
                        Some(ch) => current.push(ch),
                        None => bail!("unterminated double quote"),
                    }
                }
            }
            '\\' => {
                in_token = true;
                match chars.next() {
                    // Keep the backslash in front of `--` so parse_steps sees
                    // the escape.
                    Some('-') => current.push_str("\\-"),
                    Some(ch) => current.push(ch),
                    None => current.push('\\'),
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
