use derive_more::From;
use serde::Deserialize;

/// HTTP method used for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Arguments are sent in the query string.
    #[default]
    Get,
    /// Arguments are sent as a form body.
    Post,
}

impl Method {
    /// Upper-case name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

/// A single argument value as passed by the caller, before normalization.
#[derive(Debug, Clone, PartialEq, From)]
pub enum ArgValue {
    /// Sent as is.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer, wide enough for SteamIDs and order ids.
    Unsigned(u64),
    /// Floating-point number.
    Float(f64),
    /// Sent as `1` or `0`.
    Boolean(bool),
    /// Sent comma-joined.
    List(Vec<String>),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        Self::Unsigned(value.into())
    }
}

impl From<Vec<&str>> for ArgValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<u64>> for ArgValue {
    fn from(value: Vec<u64>) -> Self {
        Self::List(value.into_iter().map(|v| v.to_string()).collect())
    }
}

impl ArgValue {
    /// Wire form of the value. Lists are comma-joined, booleans become `1`/`0`.
    pub fn normalize(&self) -> String {
        match self {
            ArgValue::String(s) => s.clone(),
            ArgValue::Integer(i) => i.to_string(),
            ArgValue::Unsigned(u) => u.to_string(),
            ArgValue::Float(f) => f.to_string(),
            ArgValue::Boolean(true) => "1".to_owned(),
            ArgValue::Boolean(false) => "0".to_owned(),
            ArgValue::List(items) => items.join(","),
        }
    }
}

/// Named call arguments, kept in insertion order. Setting a name twice replaces the earlier value.
///
/// ```
/// # use steamapi::ApiArgs;
/// let args = ApiArgs::new()
///     .arg("steamids", vec!["1", "2"])
///     .arg("include_appinfo", true);
/// assert_eq!(args.normalize(), vec![
///     ("steamids".to_owned(), "1,2".to_owned()),
///     ("include_appinfo".to_owned(), "1".to_owned()),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiArgs {
    entries: Vec<(String, ArgValue)>,
}

impl ApiArgs {
    /// Empty argument list.
    pub fn new() -> Self {
        ApiArgs::default()
    }

    /// Builder form of [`ApiArgs::set`].
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set `name`, replacing an earlier value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Whether `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no argument is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wire form of every argument, in insertion order.
    pub fn normalize(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.clone(), value.normalize()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for ApiArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = ApiArgs::new();
        for (name, value) in iter {
            args.set(name, value);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiArgs, ArgValue, Method};

    #[test]
    fn lists_are_comma_joined() {
        let value = ArgValue::from(vec!["a", "b", "c"]);
        assert_eq!(value.normalize(), "a,b,c");
        assert_eq!(ArgValue::from(vec![1u64, 2]).normalize(), "1,2");
        assert_eq!(ArgValue::List(vec![]).normalize(), "");
    }

    #[test]
    fn booleans_become_digits() {
        assert_eq!(ArgValue::from(true).normalize(), "1");
        assert_eq!(ArgValue::from(false).normalize(), "0");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(ArgValue::from("x").normalize(), "x");
        assert_eq!(ArgValue::from(-3).normalize(), "-3");
        assert_eq!(ArgValue::from(76561197960435530u64).normalize(), "76561197960435530");
    }

    #[test]
    fn setting_twice_replaces_in_place() {
        let args = ApiArgs::new()
            .arg("a", 1)
            .arg("b", 2)
            .arg("a", "replaced");
        assert_eq!(
            args.normalize(),
            vec![
                ("a".to_owned(), "replaced".to_owned()),
                ("b".to_owned(), "2".to_owned())
            ]
        );
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn collects_from_pairs() {
        let args: ApiArgs = [("steamid", "1"), ("relationship", "friend")]
            .into_iter()
            .collect();
        assert!(args.contains("relationship"));
        assert_eq!(args.get("steamid"), Some(&ArgValue::from("1")));
    }

    #[test]
    fn method_parses_from_discovery_spelling() {
        let method: Method = serde_json::from_str("\"POST\"").unwrap();
        assert_eq!(method, Method::Post);
        assert_eq!(Method::default().as_str(), "GET");
        assert_eq!(reqwest::Method::from(Method::Post), reqwest::Method::POST);
    }
}
