//! Browser-rendering seam.
//!
//! Script-heavy pages can be captured through a headless browser instead of
//! the plain HTTP fetcher. The browser itself is an external collaborator:
//! implement [`BrowserLauncher`] and [`BrowserSession`] over whatever
//! automation driver is available, and [`render_page`] handles waiting,
//! retrying, deadlines, and teardown.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info};
use url::Url;

use crate::fetch::validate_url;
use crate::{DeclutterError, Result};

/// Navigation completes when this condition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// No network activity for a short period
    NetworkIdle,
    /// The DOM is parsed; subresources may still load
    DomContentLoaded,
}

/// Failures reported by a browser driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// The driver's own navigation deadline passed
    Timeout,
    TooManyRedirects,
    Failed(String),
}

/// An open browser page.
pub trait BrowserSession: Send {
    fn navigate(
        &mut self, url: &Url, wait: WaitCondition,
    ) -> impl Future<Output = std::result::Result<(), BrowserError>> + Send;

    /// Serialized markup of the current page
    fn content(&mut self) -> impl Future<Output = std::result::Result<String, BrowserError>> + Send;

    /// Release the page and its browser process
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}

/// Starts browser sessions.
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    fn launch(&self) -> impl Future<Output = std::result::Result<Self::Session, BrowserError>> + Send;
}

/// Markup captured from a rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
}

/// Render `url` in a fresh browser session and capture its markup.
///
/// Navigation first waits for network idle and retries once waiting only
/// for DOM content. Each step is bounded by `deadline`. The session is
/// closed on every path, including errors and timeouts.
pub async fn render_page<L: BrowserLauncher>(launcher: &L, url: &str, deadline: Duration) -> Result<RenderedPage> {
    let url = validate_url(url)?;
    let mut session = launcher.launch().await.map_err(|e| map_browser_error(e, &url, deadline))?;

    let captured = navigate_and_capture(&mut session, &url, deadline).await;
    session.close().await;
    debug!(url = url.as_str(), "browser session closed");

    let html = captured?;
    info!(url = url.as_str(), bytes = html.len(), "rendered page captured");
    Ok(RenderedPage { url, html })
}

async fn navigate_and_capture<S: BrowserSession>(session: &mut S, url: &Url, deadline: Duration) -> Result<String> {
    let first = timeout(deadline, session.navigate(url, WaitCondition::NetworkIdle)).await;
    if !matches!(first, Ok(Ok(()))) {
        debug!(url = url.as_str(), "network-idle navigation failed, retrying on DOM content");
        match timeout(deadline, session.navigate(url, WaitCondition::DomContentLoaded)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(map_browser_error(error, url, deadline)),
            Err(_) => return Err(timeout_error(deadline)),
        }
    }

    match timeout(deadline, session.content()).await {
        Ok(Ok(html)) => Ok(html),
        Ok(Err(error)) => Err(map_browser_error(error, url, deadline)),
        Err(_) => Err(timeout_error(deadline)),
    }
}

fn timeout_error(deadline: Duration) -> DeclutterError {
    DeclutterError::Timeout { timeout: deadline.as_secs() }
}

fn map_browser_error(error: BrowserError, url: &Url, deadline: Duration) -> DeclutterError {
    match error {
        BrowserError::Timeout => timeout_error(deadline),
        BrowserError::TooManyRedirects => DeclutterError::RedirectLoop { url: url.to_string() },
        BrowserError::Failed(message) => DeclutterError::Render(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        FailIdleThenSucceed,
        Hang,
        Redirects,
    }

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        navigations: AtomicUsize,
        closed: AtomicUsize,
    }

    struct MockLauncher {
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    struct MockSession {
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    impl BrowserLauncher for MockLauncher {
        type Session = MockSession;

        async fn launch(&self) -> std::result::Result<MockSession, BrowserError> {
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            Ok(MockSession { behavior: self.behavior, counters: self.counters.clone() })
        }
    }

    impl BrowserSession for MockSession {
        async fn navigate(&mut self, _url: &Url, wait: WaitCondition) -> std::result::Result<(), BrowserError> {
            self.counters.navigations.fetch_add(1, Ordering::SeqCst);
            match (self.behavior, wait) {
                (Behavior::Succeed, _) => Ok(()),
                (Behavior::FailIdleThenSucceed, WaitCondition::NetworkIdle) => Err(BrowserError::Timeout),
                (Behavior::FailIdleThenSucceed, WaitCondition::DomContentLoaded) => Ok(()),
                (Behavior::Hang, _) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                }
                (Behavior::Redirects, _) => Err(BrowserError::TooManyRedirects),
            }
        }

        async fn content(&mut self) -> std::result::Result<String, BrowserError> {
            Ok("<html><body><p>rendered</p></body></html>".to_string())
        }

        async fn close(self) {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn launcher(behavior: Behavior) -> (MockLauncher, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (MockLauncher { behavior, counters: counters.clone() }, counters)
    }

    #[tokio::test]
    async fn test_render_success_closes_session() {
        let (launcher, counters) = launcher(Behavior::Succeed);
        let page = render_page(&launcher, "https://example.com", Duration::from_secs(5)).await.unwrap();
        assert!(page.html.contains("rendered"));
        assert_eq!(counters.navigations.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_retries_with_dom_content_loaded() {
        let (launcher, counters) = launcher(Behavior::FailIdleThenSucceed);
        let page = render_page(&launcher, "https://example.com", Duration::from_secs(5)).await.unwrap();
        assert!(page.html.contains("rendered"));
        assert_eq!(counters.navigations.load(Ordering::SeqCst), 2);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_timeout_still_closes_session() {
        let (launcher, counters) = launcher(Behavior::Hang);
        let result = render_page(&launcher, "https://example.com", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(DeclutterError::Timeout { .. })));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_redirect_error() {
        let (launcher, counters) = launcher(Behavior::Redirects);
        let result = render_page(&launcher, "https://example.com", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(DeclutterError::RedirectLoop { .. })));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_render_rejects_invalid_url_without_launching() {
        let (launcher, counters) = launcher(Behavior::Succeed);
        let result = render_page(&launcher, "not a url", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(DeclutterError::InvalidUrl(_))));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
    }
}
