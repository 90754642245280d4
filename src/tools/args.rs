/// Argument Validation Helpers
///
/// Tools read their raw JSON arguments through `Args`, which records every
/// problem it meets instead of stopping at the first one. Each accessor
/// returns `None` exactly when it has recorded an issue for that field.

use serde_json::{Map, Value};

use crate::core::error::ValidationError;

pub struct Args<'a> {
    raw: &'a Map<String, Value>,
    errors: ValidationError,
}

impl<'a> Args<'a> {
    /// Arguments must arrive as a JSON object.
    pub fn new(raw: &'a Value) -> Result<Self, ValidationError> {
        match raw.as_object() {
            Some(map) => Ok(Self {
                raw: map,
                errors: ValidationError::default(),
            }),
            None => {
                let mut errors = ValidationError::default();
                errors.push("arguments", format!("Expected object, received {}", type_name(raw)));
                Err(errors)
            }
        }
    }

    fn present(&mut self, field: &str) -> Option<&'a Value> {
        match self.raw.get(field) {
            Some(value) => Some(value),
            None => {
                self.errors.push(field, "Required");
                None
            }
        }
    }

    pub fn number(&mut self, field: &str) -> Option<f64> {
        let value = self.present(field)?;
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                self.errors
                    .push(field, format!("Expected number, received {}", type_name(value)));
                None
            }
        }
    }

    pub fn string(&mut self, field: &str) -> Option<&'a str> {
        let value = self.present(field)?;
        match value.as_str() {
            Some(s) => Some(s),
            None => {
                self.errors
                    .push(field, format!("Expected string, received {}", type_name(value)));
                None
            }
        }
    }

    /// A string of exactly `len` characters, counted in UTF-16 code units.
    pub fn string_of_length(&mut self, field: &str, len: usize) -> Option<&'a str> {
        let s = self.string(field)?;
        if s.encode_utf16().count() != len {
            self.errors.push(
                field,
                format!("String must contain exactly {len} character(s)"),
            );
            return None;
        }
        Some(s)
    }

    /// A string drawn from a fixed set of choices, mapped to its value.
    pub fn one_of<T: Copy>(&mut self, field: &str, choices: &[(&str, T)]) -> Option<T> {
        let s = self.string(field)?;
        if let Some((_, value)) = choices.iter().find(|(name, _)| *name == s) {
            return Some(*value);
        }
        let expected = choices
            .iter()
            .map(|(name, _)| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(" | ");
        self.errors.push(
            field,
            format!("Invalid enum value. Expected {expected}, received '{s}'"),
        );
        None
    }

    pub fn into_error(self) -> ValidationError {
        self.errors
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collects_every_offending_field() {
        let raw = json!({ "a": "1", "c": true });
        let mut args = Args::new(&raw).unwrap();

        assert_eq!(args.number("a"), None);
        assert_eq!(args.number("b"), None);
        assert_eq!(args.string("c"), None);

        let err = args.into_error();
        assert_eq!(err.fields(), vec!["a", "b", "c"]);
        assert_eq!(err.issues[0].message, "Expected number, received string");
        assert_eq!(err.issues[1].message, "Required");
        assert_eq!(err.issues[2].message, "Expected string, received boolean");
    }

    #[test]
    fn length_counts_utf16_units() {
        let raw = json!({ "ok": "ny", "long": "NYC", "wide": "é1", "emoji": "😀", "pair": "😀A" });
        let mut args = Args::new(&raw).unwrap();

        assert_eq!(args.string_of_length("ok", 2), Some("ny"));
        assert_eq!(args.string_of_length("wide", 2), Some("é1"));
        assert_eq!(args.string_of_length("emoji", 2), Some("😀"));
        assert_eq!(args.string_of_length("long", 2), None);
        assert_eq!(args.string_of_length("pair", 2), None);
        assert_eq!(args.into_error().fields(), vec!["long", "pair"]);
    }

    #[test]
    fn enum_lists_expected_choices() {
        let raw = json!({ "op": "modulo" });
        let mut args = Args::new(&raw).unwrap();

        assert_eq!(args.one_of("op", &[("add", 1), ("subtract", 2)]), None);
        let err = args.into_error();
        assert_eq!(
            err.issues[0].message,
            "Invalid enum value. Expected 'add' | 'subtract', received 'modulo'"
        );
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let raw = json!([1, 2]);
        let err = Args::new(&raw).err().expect("array arguments must fail");
        assert_eq!(err.fields(), vec!["arguments"]);
    }
}
