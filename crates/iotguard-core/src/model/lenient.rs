// ── Lenient JSON scalars ──
//
// Device firmware writes whatever its JSON library emits: numbers as
// strings, 0/1 for booleans, and so on.

use serde_json::Value;

/// A finite number, accepting numeric strings. Anything else is unknown.
pub fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// JavaScript truthiness: `false`, `0`, `NaN`, `""` and `null` are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Truthiness of a field, or `None` when the field is absent or `null`.
pub fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Null => None,
        v => Some(truthy(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_from_strings() {
        assert_eq!(number(Some(&json!("24.5"))), Some(24.5));
        assert_eq!(number(Some(&json!(" 7 "))), Some(7.0));
        assert_eq!(number(Some(&json!("warm"))), None);
        assert_eq!(number(Some(&json!(true))), None);
        assert_eq!(number(Some(&json!("NaN"))), None);
        assert_eq!(number(None), None);
    }

    #[test]
    fn javascript_truthiness() {
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!({})));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(0.0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&Value::Null));
    }

    #[test]
    fn flag_distinguishes_absent_from_false() {
        assert_eq!(flag(None), None);
        assert_eq!(flag(Some(&Value::Null)), None);
        assert_eq!(flag(Some(&json!(0))), Some(false));
        assert_eq!(flag(Some(&json!(1))), Some(true));
    }
}
