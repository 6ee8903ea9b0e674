use url::Url;

use crate::error::{Error, Result};

/// Path of the chat completions endpoint, relative to the server base URL.
pub const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Path of the model listing endpoint, relative to the server base URL.
pub const MODELS_PATH: &str = "v1/models";

/// Everything needed to issue one chat completion request.
///
/// Built fresh for every send from the current settings and the user's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Base URL of the server, e.g. `http://localhost:1337`.
    pub server_base_url: String,
    /// Bearer token sent on every request.
    pub api_key: String,
    /// Model identifier passed through to the server.
    pub model: String,
    /// The user's message.
    pub user_text: String,
    /// Whether to request an SSE token stream.
    pub streaming: bool,
}

impl RequestSpec {
    /// The chat completions URL for this request.
    pub fn completions_url(&self) -> Result<Url> {
        endpoint(&self.server_base_url, CHAT_COMPLETIONS_PATH)
    }
}

/// Join `path` onto `base`, rejecting anything that is not an absolute http(s) URL with a host.
pub fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = base.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(Error::invalid_endpoint("server URL is empty", None));
    }
    let url = Url::parse(&format!("{base}/{path}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_endpoint(
            format!("unsupported scheme {:?} in {base}", url.scheme()),
            None,
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_endpoint(format!("no host in {base}"), None));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(base: &str) -> RequestSpec {
        RequestSpec {
            server_base_url: base.to_string(),
            api_key: "key".to_string(),
            model: "model".to_string(),
            user_text: "hi".to_string(),
            streaming: true,
        }
    }

    #[test]
    fn completions_url_joins_path() {
        let url = spec("http://localhost:1337").completions_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:1337/v1/chat/completions");
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let url = spec("https://llm.example.com/").completions_url().unwrap();
        assert_eq!(url.as_str(), "https://llm.example.com/v1/chat/completions");
    }

    #[test]
    fn base_path_is_kept() {
        let url = spec("http://10.0.0.2:8080/proxy").completions_url().unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.2:8080/proxy/v1/chat/completions");
    }

    #[test]
    fn malformed_urls_are_invalid_endpoints() {
        for base in ["", "   ", "localhost:1337", "not a url", "ftp://host"] {
            let err = spec(base).completions_url().unwrap_err();
            assert!(err.is_invalid_endpoint(), "{base:?} gave {err}");
        }
    }
}
