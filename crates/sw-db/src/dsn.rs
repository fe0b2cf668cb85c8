//! Data source name formatting, keyed by driver

use crate::duckdb::MEMORY_PATH;
use crate::options::{ConnectionOptions, DriverKind};
use url::form_urlencoded;

/// Return the data source name described by `options`.
///
/// Pure formatting; nothing here touches the network or the filesystem.
pub fn generate_dsn(options: &ConnectionOptions) -> String {
    match options.driver {
        DriverKind::DuckDb => duckdb_dsn(options),
        DriverKind::MySql => mysql_dsn(options),
    }
}

fn duckdb_dsn(options: &ConnectionOptions) -> String {
    if options.database.is_empty() {
        MEMORY_PATH.to_string()
    } else {
        options.database.clone()
    }
}

/// `user:pass@tcp(host:port)/database?params`, params sorted by key with
/// `parseTime=true` always present.
fn mysql_dsn(options: &ConnectionOptions) -> String {
    let mut params: Vec<(&str, &str)> = options
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    params.push(("parseTime", "true"));
    params.sort();

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();

    format!(
        "{}:{}@tcp({}:{})/{}?{}",
        options.username, options.password, options.hostname, options.port, options.database, query
    )
    .trim_matches('/')
    .to_string()
}

#[cfg(test)]
#[path = "dsn_test.rs"]
mod tests;
