use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// What a capture input refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A page loaded in a live browser (`http`, `https` or `file` URL).
    Url,
    /// A local HTML file read statically, without a browser.
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResource {
    pub kind: ResourceKind,
    /// Normalized URL for `Url`, the file path for `Html`.
    pub value: String,
}

impl ParsedResource {
    pub fn path(&self) -> Option<PathBuf> {
        match self.kind {
            ResourceKind::Html => Some(PathBuf::from(&self.value)),
            ResourceKind::Url => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceParseError {
    #[error("Invalid URL '{value}': {message}. Hint: include http(s):// and ensure the URL is well-formed.")]
    InvalidUrl { value: String, message: String },
    #[error("Unsupported URL scheme '{scheme}' in '{value}'. Supported schemes: http, https, file.")]
    UnsupportedScheme { value: String, scheme: String },
    #[error("Local file not found: {path}. Hint: check the path relative to the current working directory or use an absolute path.")]
    FileNotFound { path: String },
    #[error("Unsupported file extension '{extension}'. Supported HTML extensions: {supported}.")]
    UnsupportedExtension {
        extension: String,
        supported: String,
    },
}

const HTML_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];
const URL_SCHEMES: &[&str] = &["http", "https", "file"];

/// Classifies a capture input. `override_type` skips detection.
pub fn parse_resource(
    value: &str,
    override_type: Option<ResourceKind>,
) -> Result<ParsedResource, ResourceParseError> {
    match override_type {
        Some(ResourceKind::Url) => parse_url_resource(value),
        Some(ResourceKind::Html) => parse_html_resource(value),
        None if looks_like_url(value) => parse_url_resource(value),
        None => parse_html_resource(value),
    }
}

fn looks_like_url(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    URL_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(&format!("{scheme}://")))
}

fn parse_url_resource(value: &str) -> Result<ParsedResource, ResourceParseError> {
    let url = Url::parse(value.trim()).map_err(|e| ResourceParseError::InvalidUrl {
        value: value.to_string(),
        message: e.to_string(),
    })?;

    if !URL_SCHEMES.contains(&url.scheme()) {
        return Err(ResourceParseError::UnsupportedScheme {
            value: value.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    Ok(ParsedResource {
        kind: ResourceKind::Url,
        value: url.to_string(),
    })
}

fn parse_html_resource(value: &str) -> Result<ParsedResource, ResourceParseError> {
    let path = Path::new(value);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !HTML_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ResourceParseError::UnsupportedExtension {
            extension: if extension.is_empty() {
                "no extension".to_string()
            } else {
                extension
            },
            supported: HTML_EXTENSIONS.join(", "),
        });
    }

    let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(ResourceParseError::FileNotFound {
            path: path.to_string_lossy().into_owned(),
        });
    }

    Ok(ParsedResource {
        kind: ResourceKind::Html,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    fn temp_file_with_extension(ext: &str) -> tempfile::NamedTempFile {
        Builder::new()
            .suffix(&format!(".{}", ext))
            .tempfile()
            .expect("create temp file")
    }

    #[test]
    fn test_parse_http_url() {
        let res = parse_resource("http://localhost:3000/dashboard", None).unwrap();
        assert_eq!(res.kind, ResourceKind::Url);
        assert_eq!(res.value, "http://localhost:3000/dashboard");
        assert!(res.path().is_none());
    }

    #[test]
    fn test_parse_url_is_normalized() {
        let res = parse_resource("HTTPS://Example.com", None).unwrap();
        assert_eq!(res.kind, ResourceKind::Url);
        assert_eq!(res.value, "https://example.com/");
    }

    #[test]
    fn test_parse_file_url() {
        let res = parse_resource("file:///tmp/page.html", None).unwrap();
        assert_eq!(res.kind, ResourceKind::Url);
    }

    #[test]
    fn test_parse_local_html() {
        let file = temp_file_with_extension("html");
        let res = parse_resource(file.path().to_str().unwrap(), None).unwrap();
        assert_eq!(res.kind, ResourceKind::Html);
        assert_eq!(res.path().unwrap(), file.path());
    }

    #[test]
    fn test_parse_local_htm_uppercase() {
        let file = temp_file_with_extension("HTM");
        let res = parse_resource(file.path().to_str().unwrap(), None).unwrap();
        assert_eq!(res.kind, ResourceKind::Html);
    }

    #[test]
    fn test_parse_unsupported_extension() {
        let file = temp_file_with_extension("png");
        let res = parse_resource(file.path().to_str().unwrap(), None);
        assert!(matches!(
            res,
            Err(ResourceParseError::UnsupportedExtension { extension, .. })
                if extension == "png"
        ));
    }

    #[test]
    fn test_missing_local_html_errors() {
        let res = parse_resource("/tmp/does-not-exist-a11ysnap.html", None);
        assert!(matches!(res, Err(ResourceParseError::FileNotFound { .. })));
    }

    #[test]
    fn test_override_forces_url_validation() {
        let res = parse_resource("example.com/page", Some(ResourceKind::Url));
        assert!(matches!(res, Err(ResourceParseError::InvalidUrl { .. })));
    }

    #[test]
    fn test_unsupported_scheme() {
        let res = parse_resource("ftp://example.com/index.html", Some(ResourceKind::Url));
        assert!(matches!(
            res,
            Err(ResourceParseError::UnsupportedScheme { scheme, .. }) if scheme == "ftp"
        ));
    }
}
