//! URL and query-string helpers
//!
//! Every resource path is resolved against `{base}/v1/`; job locations come back
//! from the server as absolute URLs and are used as-is.

use crate::common::RequestTarget;

/// API version segment prepended to every resource path
pub const API_VERSION: &str = "v1";

/// Build a query string from key/value pairs, percent-encoding both sides
pub fn build_query_string(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolve a request target and its query parameters into a full URL
pub fn build_url(base_url: &str, target: &RequestTarget, params: &[(String, String)]) -> String {
    let mut url = match target {
        RequestTarget::Resource(path) => format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            API_VERSION,
            path.trim_start_matches('/')
        ),
        RequestTarget::Absolute(location) => location.clone(),
    };

    if !params.is_empty() {
        let separator = if url.contains('?') { '&' } else { '?' };
        url.push(separator);
        url.push_str(&build_query_string(params));
    }
    url
}

/// Join path segments into a resource path, encoding each identifier
pub fn resource_path(resource: &str, segments: &[&str]) -> String {
    let mut path = resource.trim_matches('/').to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}
