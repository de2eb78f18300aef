#![allow(dead_code)]

use std::sync::Arc;

use mockito::Matcher;
use steamapi::{ApiConnection, ConnectionConfig};

pub const API_KEY: &str = "test-key";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A connection to the mock server at `url`, optionally with an API key.
pub fn connection(url: &str, api_key: Option<&str>) -> Arc<ApiConnection> {
    connection_with(url, api_key, true)
}

pub fn connection_with(url: &str, api_key: Option<&str>, precache: bool) -> Arc<ApiConnection> {
    init_logger();
    let mut config = match api_key {
        Some(key) => ConnectionConfig::from_api_key(key),
        None => ConnectionConfig::anonymous(),
    };
    config.base_url(url).precache(precache);
    Arc::new(config.to_connection().expect("mock server URL should be valid"))
}

/// Query matcher for `pairs` plus the parameters every parsed call carries.
pub fn query(pairs: &[(&str, &str)]) -> Matcher {
    let mut matchers: Vec<Matcher> = pairs
        .iter()
        .map(|(name, value)| Matcher::UrlEncoded(name.to_string(), value.to_string()))
        .collect();
    matchers.push(Matcher::UrlEncoded("format".into(), "json".into()));
    Matcher::AllOf(matchers)
}
