//! Pretty-printing of reply parameters.
//!
//! The layout matches `serde_json::to_string_pretty`; colour only adds escape
//! sequences around keys and string values.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{Palette, Style};

const INDENT: &str = "  ";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RenderError {
    #[error("reply parameters must be an object, found {0}")]
    NotAnObject(&'static str),
}

/// Renders reply parameters; an absent payload renders as `{}`.
pub(crate) fn render_parameters(
    parameters: Option<&Value>,
    palette: Palette,
) -> Result<String, RenderError> {
    let mut output = String::new();
    match parameters {
        None => output.push_str("{}"),
        Some(Value::Object(map)) => write_object(&mut output, map, 0, palette),
        Some(other) => return Err(RenderError::NotAnObject(type_name(other))),
    }
    Ok(output)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn write_value(output: &mut String, value: &Value, depth: usize, palette: Palette) {
    match value {
        Value::Object(map) => write_object(output, map, depth, palette),
        Value::Array(items) if items.is_empty() => output.push_str("[]"),
        Value::Array(items) => {
            output.push_str("[\n");
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    output.push_str(",\n");
                }
                indent(output, depth + 1);
                write_value(output, item, depth + 1, palette);
            }
            output.push('\n');
            indent(output, depth);
            output.push(']');
        }
        Value::String(text) => output.push_str(&palette.paint(&quote(text), Style::String)),
        scalar => output.push_str(&scalar.to_string()),
    }
}

fn write_object(output: &mut String, map: &Map<String, Value>, depth: usize, palette: Palette) {
    if map.is_empty() {
        output.push_str("{}");
        return;
    }
    output.push_str("{\n");
    for (index, (key, value)) in map.iter().enumerate() {
        if index > 0 {
            output.push_str(",\n");
        }
        indent(output, depth + 1);
        output.push_str(&palette.paint(&quote(key), Style::Key));
        output.push_str(": ");
        write_value(output, value, depth + 1, palette);
    }
    output.push('\n');
    indent(output, depth);
    output.push('}');
}

fn indent(output: &mut String, depth: usize) {
    for _ in 0..depth {
        output.push_str(INDENT);
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_owned()).to_string()
}
