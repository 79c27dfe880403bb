use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Where environment overrides are read from.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// `server.host` -> `SERVER_HOST`
pub fn env_key(dotted_key: &str) -> String {
    dotted_key.to_uppercase().replace('.', "_")
}

/// A typed reading of an override string.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Json(Value),
    Text(String),
}

impl EnvValue {
    /// Tries bool, integer, float, JSON array/object, then falls back to text.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered == "true" || lowered == "false" {
            return EnvValue::Bool(lowered == "true");
        }

        if let Ok(i) = raw.parse::<i64>() {
            return EnvValue::Int(i);
        }

        // NaN and infinities have no JSON representation
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return EnvValue::Float(f);
            }
        }

        if raw.starts_with('[') || raw.starts_with('{') {
            if let Ok(parsed @ (Value::Array(_) | Value::Object(_))) =
                serde_json::from_str::<Value>(raw)
            {
                return EnvValue::Json(parsed);
            }
        }

        EnvValue::Text(raw.to_string())
    }

    pub fn into_json(self) -> Value {
        match self {
            EnvValue::Bool(b) => Value::Bool(b),
            EnvValue::Int(i) => Value::from(i),
            EnvValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            EnvValue::Json(v) => v,
            EnvValue::Text(s) => Value::String(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("server.host"), "SERVER_HOST");
        assert_eq!(env_key("onlyoffice.jwt_enabled"), "ONLYOFFICE_JWT_ENABLED");
    }

    #[test]
    fn test_parse_bool_any_case() {
        assert_eq!(EnvValue::parse("TRUE"), EnvValue::Bool(true));
        assert_eq!(EnvValue::parse("False"), EnvValue::Bool(false));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(EnvValue::parse("8000"), EnvValue::Int(8000));
        assert_eq!(EnvValue::parse("-3"), EnvValue::Int(-3));
        assert_eq!(EnvValue::parse("2.5"), EnvValue::Float(2.5));
        assert_eq!(EnvValue::parse("nan"), EnvValue::Text("nan".to_string()));
    }

    #[test]
    fn test_parse_json_structures() {
        assert_eq!(
            EnvValue::parse(r#"[".docx", ".txt"]"#),
            EnvValue::Json(json!([".docx", ".txt"]))
        );
        assert_eq!(
            EnvValue::parse(r#"{"a": 1}"#),
            EnvValue::Json(json!({"a": 1}))
        );
        // broken JSON stays a string
        assert_eq!(EnvValue::parse("[oops"), EnvValue::Text("[oops".to_string()));
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            EnvValue::parse("http://docs.local:8080"),
            EnvValue::Text("http://docs.local:8080".to_string())
        );
    }
}
