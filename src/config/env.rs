use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::Value;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("placeholder pattern compiles"));

/// Expands `${VAR}` and `${VAR:default}` in every string of `value`, using
/// `lookup` for variables. Unset variables without a default expand to "".
pub fn substitute<F>(value: Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => expand_scalar(&s, lookup),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(|v| substitute(v, lookup)).collect()),
        Value::Mapping(map) => Value::Mapping(map.into_iter().map(|(k, v)| (k, substitute(v, lookup))).collect()),
        other => other,
    }
}

fn expand_scalar<F>(s: &str, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let re = &*PLACEHOLDER;
    let expanded = re
        .replace_all(s, |caps: &Captures| {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            lookup(name)
                .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
                .unwrap_or_default()
        })
        .into_owned();

    // a value that is one whole placeholder may stand for a bool or number,
    // as long as the text survives the round trip ("007" stays a string)
    let whole = re.find(s).is_some_and(|m| m.start() == 0 && m.end() == s.len());
    if whole && !expanded.is_empty() {
        match serde_yaml::from_str::<Value>(&expanded) {
            Ok(Value::Bool(b)) if b.to_string() == expanded => return Value::Bool(b),
            Ok(Value::Number(n)) if n.to_string() == expanded => return Value::Number(n),
            _ => {}
        }
    }
    Value::String(expanded)
}
