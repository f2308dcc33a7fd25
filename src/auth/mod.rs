//! API key handling for outgoing requests.
//!
//! The backend accepts the key either as `x-api-key` or as a bearer token.
//! The client sends both so it works behind proxies that strip one of them.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::errors::ClientError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Build the default headers attached to every request.
pub fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();

    // No key configured means the backend runs in dev mode
    let Some(key) = api_key else {
        return Ok(headers);
    };

    let mut key_value = header_value(key)?;
    key_value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, key_value);

    let mut bearer = header_value(&format!("Bearer {key}"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Ok(headers)
}

fn header_value(raw: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(raw)
        .map_err(|_| ClientError::Config("API key contains invalid header characters".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_no_headers() {
        let headers = auth_headers(None).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_key_sets_both_headers() {
        let headers = auth_headers(Some("test-key-123")).unwrap();

        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "test-key-123");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-key-123");
        assert!(headers.get(API_KEY_HEADER).unwrap().is_sensitive());
    }

    #[test]
    fn test_invalid_key_rejected() {
        let err = auth_headers(Some("line\nbreak")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
