use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the configured backend URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-local host would send the API key and access
    /// tokens in cleartext.
    #[error("Insecure backend URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL carries a query or fragment, which cannot be joined with
    /// endpoint paths.
    #[error("Backend URL must not contain a query string or fragment")]
    UnexpectedComponents,
}

/// Validates the backend base URL.
///
/// - Scheme must be `https`, or `http` for `localhost`, `127.0.0.1` and `[::1]`
/// - No query string or fragment
/// - A trailing slash is stripped so endpoint paths can be appended
///
/// ```
/// use devlog::util::validate_backend_url;
///
/// let url = validate_backend_url("https://abc.supabase.co/").unwrap();
/// assert_eq!(url.as_str(), "https://abc.supabase.co/");
///
/// assert!(validate_backend_url("http://127.0.0.1:54321").is_ok());
/// assert!(validate_backend_url("http://example.com").is_err());
/// assert!(validate_backend_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_backend_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim().trim_end_matches('/'))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_local_host(&url) {
                tracing::error!(backend_url = %url, "Rejecting non-HTTPS backend URL");
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(backend_url = %url, "Using non-HTTPS backend URL (localhost only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedComponents);
    }

    Ok(url)
}

fn is_local_host(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_accepted() {
        assert!(validate_backend_url("https://project.supabase.co").is_ok());
        assert!(validate_backend_url("https://api.example.com:8443").is_ok());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let url = validate_backend_url("https://project.supabase.co///").unwrap();
        assert_eq!(url.path(), "/");
        let url = validate_backend_url("https://example.com/base/").unwrap();
        assert_eq!(url.path(), "/base");
    }

    #[test]
    fn test_plain_http_rejected_for_remote_hosts() {
        assert!(matches!(
            validate_backend_url("http://project.supabase.co"),
            Err(UrlValidationError::Insecure)
        ));
        assert!(matches!(
            validate_backend_url("http://10.0.0.1"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn test_plain_http_allowed_for_localhost() {
        assert!(validate_backend_url("http://localhost:54321").is_ok());
        assert!(validate_backend_url("http://127.0.0.1:9999").is_ok());
        assert!(validate_backend_url("http://[::1]:9999").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_backend_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_backend_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_backend_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_query_and_fragment_rejected() {
        assert!(matches!(
            validate_backend_url("https://example.com?x=1"),
            Err(UrlValidationError::UnexpectedComponents)
        ));
        assert!(validate_backend_url("https://example.com#frag").is_err());
    }
}
