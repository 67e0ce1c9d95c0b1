// ABOUTME: Compose-style variable interpolation for manifest strings.
// ABOUTME: Supports $VAR, ${VAR}, ${VAR:-default}, ${VAR-default}, ${VAR:?err}, ${VAR?err} and $$.

use super::{EnvOverlay, ManifestError};
use serde_yaml::Value;

/// Interpolate every string scalar in a YAML tree. Mapping keys are left alone.
pub(crate) fn interpolate_value(value: &mut Value, env: &EnvOverlay) -> Result<(), ManifestError> {
    match value {
        Value::String(s) => {
            if s.contains('$') {
                *s = interpolate(s, env)?;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                interpolate_value(item, env)?;
            }
        }
        Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                interpolate_value(item, env)?;
            }
        }
        Value::Tagged(tagged) => interpolate_value(&mut tagged.value, env)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Interpolate a single string.
pub fn interpolate(input: &str, env: &EnvOverlay) -> Result<String, ManifestError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = closing_brace(braced).ok_or_else(|| ManifestError::Interpolation {
                input: input.to_string(),
                message: "unterminated ${".to_string(),
            })?;
            out.push_str(&expand(&braced[..end], input, env)?);
            rest = &braced[end + 1..];
        } else {
            let len = name_len(after);
            if len == 0 {
                // A lone `$` is kept literally.
                out.push('$');
                rest = after;
            } else {
                out.push_str(&lookup(&after[..len], env));
                rest = &after[len..];
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Position of the `}` closing a `${`, skipping nested braces in defaults.
fn closing_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn lookup(name: &str, env: &EnvOverlay) -> String {
    match env.get(name) {
        Some(value) => value.to_string(),
        None => {
            tracing::warn!(variable = name, "variable is not set, defaulting to a blank string");
            String::new()
        }
    }
}

/// Expand the inside of `${...}`.
fn expand(expr: &str, input: &str, env: &EnvOverlay) -> Result<String, ManifestError> {
    let len = name_len(expr);
    if len == 0 {
        return Err(ManifestError::Interpolation {
            input: input.to_string(),
            message: format!("invalid variable name in ${{{}}}", expr),
        });
    }
    let (name, modifier) = expr.split_at(len);
    let value = env.get(name);

    let (op, arg) = if let Some(arg) = modifier.strip_prefix(":-") {
        (":-", arg)
    } else if let Some(arg) = modifier.strip_prefix(":?") {
        (":?", arg)
    } else if let Some(arg) = modifier.strip_prefix('-') {
        ("-", arg)
    } else if let Some(arg) = modifier.strip_prefix('?') {
        ("?", arg)
    } else if modifier.is_empty() {
        ("", "")
    } else {
        return Err(ManifestError::Interpolation {
            input: input.to_string(),
            message: format!("unsupported modifier in ${{{}}}", expr),
        });
    };

    let required = |arg: &str| ManifestError::Interpolation {
        input: input.to_string(),
        message: if arg.is_empty() {
            format!("required variable {} is missing a value", name)
        } else {
            format!("required variable {} is missing a value: {}", name, arg)
        },
    };

    match (op, value) {
        ("", _) => Ok(lookup(name, env)),
        (":-", Some(v)) if !v.is_empty() => Ok(v.to_string()),
        (":-", _) => interpolate(arg, env),
        ("-", Some(v)) => Ok(v.to_string()),
        ("-", None) => interpolate(arg, env),
        (":?", Some(v)) if !v.is_empty() => Ok(v.to_string()),
        (":?", _) => Err(required(arg)),
        ("?", Some(v)) => Ok(v.to_string()),
        _ => Err(required(arg)),
    }
}
