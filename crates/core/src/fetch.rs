//! Content acquisition from URLs, files, and stdin.
//!
//! [`fetch_url`] walks an ordered plan of [`FetchProfile`]s (browser, cli,
//! bot by default), returning the first response that is large enough and
//! looks like markup. When every profile fails it makes one plain fallback
//! request, then falls back to any markup body retained from a rejected
//! status, and finally reports the last profile's error.

use std::fs;
use std::ops::RangeInclusive;
use std::path::PathBuf;

#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
#[cfg(feature = "fetch")]
use reqwest::{Client, Response, redirect};
#[cfg(feature = "fetch")]
use tracing::{debug, info, warn};
use url::Url;

use crate::{DeclutterError, Result};

/// Markers that identify a markup payload (matched case-insensitively)
const MARKUP_MARKERS: &[&str] = &["<!doctype", "<html", "<body", "<head"];

/// Markers accepted for uploaded content
const UPLOAD_MARKERS: &[&str] = &["<!doctype", "<html", "<body"];

/// Minimum length of uploaded content
pub const MIN_UPLOAD_BYTES: usize = 10;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Certificate handling for one profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    /// Reject invalid or self-signed certificates
    Verify,
    /// Accept any certificate, for hosts with broken TLS setups
    AcceptInvalid,
}

/// One named set of network-retrieval parameters.
#[derive(Debug, Clone)]
pub struct FetchProfile {
    pub name: String,
    pub max_redirects: usize,
    /// Statuses whose body is considered
    pub accepted_status: RangeInclusive<u16>,
    pub tls: TlsPolicy,
    /// Request headers, including the user agent
    pub headers: Vec<(String, String)>,
}

impl FetchProfile {
    /// Desktop browser identity with strict TLS
    pub fn browser() -> Self {
        Self {
            name: "browser".to_string(),
            max_redirects: 5,
            accepted_status: 200..=399,
            tls: TlsPolicy::Verify,
            headers: headers(&[
                ("User-Agent", BROWSER_USER_AGENT),
                ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
                ("Accept-Language", "en-US,en;q=0.5"),
                ("Upgrade-Insecure-Requests", "1"),
            ]),
        }
    }

    /// curl identity
    pub fn cli() -> Self {
        Self {
            name: "cli".to_string(),
            max_redirects: 10,
            accepted_status: 200..=499,
            tls: TlsPolicy::AcceptInvalid,
            headers: headers(&[("User-Agent", "curl/7.68.0"), ("Accept", "*/*")]),
        }
    }

    /// Crawler identity that accepts any status
    pub fn bot() -> Self {
        Self {
            name: "bot".to_string(),
            max_redirects: 15,
            accepted_status: 200..=599,
            tls: TlsPolicy::AcceptInvalid,
            headers: headers(&[("User-Agent", "DeclutterBot/1.0"), ("Accept", "text/html")]),
        }
    }

    /// True when a response with `status` may be accepted under this profile.
    ///
    /// A refused status with a body is still kept as a last-resort candidate.
    pub fn accepts(&self, status: u16) -> bool {
        self.accepted_status.contains(&status)
    }

    /// The `User-Agent` header of this profile, matched case-insensitively.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("user-agent")).map(|(_, v)| v.as_str())
    }
}

fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// HTTP retrieval plan and limits.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Profiles tried in order
    pub profiles: Vec<FetchProfile>,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Response bodies larger than this are rejected
    pub max_body_bytes: usize,
    /// Accepted bodies must be strictly longer than this
    pub min_body_bytes: usize,
    /// Redirect limit of the final fallback request
    pub fallback_redirects: usize,
    pub fallback_user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            profiles: vec![FetchProfile::browser(), FetchProfile::cli(), FetchProfile::bot()],
            timeout: 30,
            max_body_bytes: 50 * 1024 * 1024,
            min_body_bytes: 200,
            fallback_redirects: 10,
            fallback_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl FetchConfig {
    /// Replace the per-request timeout, in seconds.
    ///
    /// The same timeout applies to every profile and to the final fallback request.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }
}

/// True when `content` carries a recognizable markup root marker
pub fn is_markup(content: &str) -> bool {
    contains_marker(content, MARKUP_MARKERS)
}

fn contains_marker(content: &str, markers: &[&str]) -> bool {
    let lower = content.to_ascii_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Check raw uploaded content before extraction.
///
/// # Errors
///
/// [`DeclutterError::ContentTooSmall`] below [`MIN_UPLOAD_BYTES`];
/// [`DeclutterError::NotMarkup`] without `<html`, `<body` or `<!doctype`.
pub fn validate_markup(content: &str) -> Result<()> {
    if content.len() < MIN_UPLOAD_BYTES {
        return Err(DeclutterError::ContentTooSmall { length: content.len(), minimum: MIN_UPLOAD_BYTES });
    }
    if !contains_marker(content, UPLOAD_MARKERS) {
        return Err(DeclutterError::NotMarkup);
    }
    Ok(())
}

/// Parse `url` and require an http(s) scheme
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| DeclutterError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(DeclutterError::InvalidUrl(format!("unsupported scheme '{scheme}' (use http:// or https://)"))),
    }
}

#[cfg(feature = "fetch")]
enum Attempt {
    Accepted(String),
    /// Rejected response; `body` is kept as a last resort when the status was refused
    Rejected { error: DeclutterError, body: Option<String> },
}

/// Fetches HTML content from a URL using the profile plan in `config`.
///
/// Profiles are tried in order and the first body over `min_body_bytes` that
/// carries markup wins. When all of them fail, one plain fallback request is
/// made, then a markup-bearing body from a refused status is used if one was
/// seen, and otherwise the last profile's error is returned.
///
/// # Errors
///
/// [`DeclutterError::InvalidUrl`] for unparsable or non-http(s) URLs, then
/// whichever fetch error the last profile hit.
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    #[cfg(not(feature = "fetch"))]
    {
        let _ = (validate_url(url)?, config);
        Err(DeclutterError::FeatureDisabled { operation: "URL fetching", feature: "fetch" })
    }

    #[cfg(feature = "fetch")]
    {
        fetch_with_plan(url, config).await
    }
}

#[cfg(feature = "fetch")]
async fn fetch_with_plan(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed = validate_url(url)?;
    let mut last_error: Option<DeclutterError> = None;
    let mut last_resort: Option<String> = None;

    for (index, profile) in config.profiles.iter().enumerate() {
        match attempt(&parsed, profile, config).await {
            Ok(Attempt::Accepted(body)) => {
                info!(url, profile = profile.name.as_str(), index, bytes = body.len(), "fetched");
                return Ok(body);
            }
            Ok(Attempt::Rejected { error, body }) => {
                debug!(url, profile = profile.name.as_str(), index, %error, "response rejected");
                if body.is_some() {
                    last_resort = body;
                }
                last_error = Some(error);
            }
            Err(error) => {
                debug!(url, profile = profile.name.as_str(), index, %error, "request failed");
                last_error = Some(error);
            }
        }
    }

    match fallback_attempt(&parsed, config).await {
        Ok(body) => {
            info!(url, bytes = body.len(), "fetched with fallback request");
            return Ok(body);
        }
        Err(error) => debug!(url, %error, "fallback request failed"),
    }

    if let Some(body) = last_resort.filter(|b| is_markup(b)) {
        warn!(url, bytes = body.len(), "using body from a rejected status");
        return Ok(body);
    }

    Err(last_error.unwrap_or(DeclutterError::InvalidResponse { status: 0 }))
}

#[cfg(feature = "fetch")]
fn build_client(
    max_redirects: usize, tls: TlsPolicy, headers: &[(String, String)], timeout: u64,
) -> Result<Client> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                header_map.insert(name, value);
            }
            _ => warn!(header = name.as_str(), "skipping invalid header"),
        }
    }

    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .redirect(redirect::Policy::limited(max_redirects))
        .danger_accept_invalid_certs(tls == TlsPolicy::AcceptInvalid)
        .default_headers(header_map)
        .build()
        .map_err(DeclutterError::HttpError)
}

#[cfg(feature = "fetch")]
async fn attempt(url: &Url, profile: &FetchProfile, config: &FetchConfig) -> Result<Attempt> {
    let client = build_client(profile.max_redirects, profile.tls, &profile.headers, config.timeout)?;
    let response = client.get(url.clone()).send().await.map_err(|e| classify(e, url, config.timeout))?;

    let status = response.status().as_u16();
    if !profile.accepts(status) {
        let body = read_body(response, url, config).await.ok().filter(|b| !b.is_empty());
        return Ok(Attempt::Rejected { error: DeclutterError::InvalidResponse { status }, body });
    }

    let body = read_body(response, url, config).await?;
    Ok(match check_body(&body, config) {
        Ok(()) => Attempt::Accepted(body),
        Err(error) => Attempt::Rejected { error, body: None },
    })
}

#[cfg(feature = "fetch")]
async fn fallback_attempt(url: &Url, config: &FetchConfig) -> Result<String> {
    let headers = vec![("User-Agent".to_string(), config.fallback_user_agent.clone())];
    let client = build_client(config.fallback_redirects, TlsPolicy::AcceptInvalid, &headers, config.timeout)?;
    let response = client.get(url.clone()).send().await.map_err(|e| classify(e, url, config.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DeclutterError::InvalidResponse { status: status.as_u16() });
    }
    let body = read_body(response, url, config).await?;
    check_body(&body, config)?;
    Ok(body)
}

/// Size and markup acceptance for a fetched body
#[cfg(feature = "fetch")]
fn check_body(body: &str, config: &FetchConfig) -> Result<()> {
    if body.len() <= config.min_body_bytes {
        return Err(DeclutterError::ContentTooSmall { length: body.len(), minimum: config.min_body_bytes + 1 });
    }
    if !is_markup(body) {
        return Err(DeclutterError::NotMarkup);
    }
    Ok(())
}

#[cfg(feature = "fetch")]
async fn read_body(mut response: Response, url: &Url, config: &FetchConfig) -> Result<String> {
    let limit = config.max_body_bytes;
    if let Some(length) = response.content_length()
        && length as usize > limit
    {
        return Err(DeclutterError::ContentTooLarge { length: length as usize, limit });
    }

    let mut buffer: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, url, config.timeout))? {
        if buffer.len() + chunk.len() > limit {
            return Err(DeclutterError::ContentTooLarge { length: buffer.len() + chunk.len(), limit });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Map a transport error onto the fetch taxonomy
#[cfg(feature = "fetch")]
fn classify(error: reqwest::Error, url: &Url, timeout: u64) -> DeclutterError {
    if error.is_timeout() {
        return DeclutterError::Timeout { timeout };
    }
    if error.is_redirect() {
        return DeclutterError::RedirectLoop { url: url.to_string() };
    }
    if error.is_connect() {
        return if is_resolution_failure(&error) {
            DeclutterError::UnreachableHost { url: url.to_string() }
        } else {
            DeclutterError::ConnectionRefused { url: url.to_string() }
        };
    }
    DeclutterError::HttpError(error)
}

/// True when a connect error failed at name resolution rather than at the socket.
///
/// The resolver error is boxed inside hyper's connector without a public
/// type, so an `io::Error` of kind `ConnectionRefused` anywhere in the source
/// chain settles it as a refusal and otherwise the rendered chain is checked
/// for resolver wording.
#[cfg(feature = "fetch")]
fn is_resolution_failure(error: &reqwest::Error) -> bool {
    let mut chain = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::ConnectionRefused)
        {
            return false;
        }
        chain.push(' ');
        chain.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    mentions_resolution(&chain)
}

#[cfg(feature = "fetch")]
fn mentions_resolution(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "dns error",
        "failed to lookup",
        "name resolution",
        "name or service not known",
        "nodename nor servname",
        "no such host",
    ]
    .iter()
    .any(|marker| message.contains(marker))
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(DeclutterError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(DeclutterError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(DeclutterError::from)?;

    Ok(buffer)
}
