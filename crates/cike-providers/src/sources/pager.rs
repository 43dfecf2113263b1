//! Page feeds and the walker that drains them.
//!
//! A [`PageFeed`] yields successive page bodies: numbered listing pages, or
//! the same page after more and more "load more" clicks. [`walk_pages`]
//! pulls from a feed until one of these holds:
//!
//! - the feed is exhausted or returns a page with no items
//! - a page lists exactly the items of the previous page
//! - the item count stopped growing for `max_stalls` consecutive pages
//! - `max_steps` pages were pulled
//! - a fetch failed after retries

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpFetcher;

/// Source of successive page bodies.
pub trait PageFeed: Send {
    /// Fetches the next page body, or `None` when there are no more pages.
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<String>>>;
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
    /// No more pages, or an empty page.
    Exhausted,
    /// A page repeated the previous page's items.
    Unchanged,
    /// The item count stopped growing.
    Stalled,
    /// The step limit was reached.
    StepLimit,
    /// A fetch failed.
    Failed,
}

/// Limits for [`walk_pages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    /// Maximum number of pages pulled.
    pub max_steps: usize,
    /// Consecutive non-growing pages tolerated; `None` disables the check.
    pub max_stalls: Option<usize>,
}

impl WalkLimits {
    /// Limits for numbered pages: step limit only.
    pub fn pages(max_steps: usize) -> Self {
        Self {
            max_steps,
            max_stalls: None,
        }
    }

    /// Limits for "load more" feeds.
    pub fn load_more(max_steps: usize, max_stalls: usize) -> Self {
        Self {
            max_steps,
            max_stalls: Some(max_stalls),
        }
    }
}

/// Pages collected by a walk.
#[derive(Debug, Default)]
pub struct Walk {
    /// Accepted page bodies, in order.
    pub pages: Vec<String>,
    /// Pages fetched, including rejected empty or repeated ones.
    pub fetched: usize,
    /// Pages that failed to fetch.
    pub failures: usize,
    /// Why the walk ended, `None` only for an empty default.
    pub stop: Option<WalkStop>,
}

impl Walk {
    /// The most recent accepted page.
    pub fn last_page(&self) -> Option<&str> {
        self.pages.last().map(String::as_str)
    }
}

/// Drains `feed` within `limits`.
///
/// `items` lists the identifying items of a page (for instance its event
/// titles); it drives the empty, unchanged and stall checks.
pub async fn walk_pages<F, I>(feed: &mut F, limits: WalkLimits, items: I) -> Walk
where
    F: PageFeed + ?Sized,
    I: Fn(&str) -> Vec<String>,
{
    let mut walk = Walk::default();
    let mut previous: Option<Vec<String>> = None;
    let mut stalls = 0;

    for step in 1..=limits.max_steps {
        let body = match feed.next_page().await {
            Ok(Some(body)) => {
                walk.fetched += 1;
                body
            }
            Ok(None) => {
                walk.stop = Some(WalkStop::Exhausted);
                return walk;
            }
            Err(e) => {
                warn!(step, error = %e, "page fetch failed, abandoning remaining pages");
                walk.failures += 1;
                walk.stop = Some(WalkStop::Failed);
                return walk;
            }
        };

        let current = items(&body);
        debug!(step, items = current.len(), "page");
        if current.is_empty() {
            walk.stop = Some(WalkStop::Exhausted);
            return walk;
        }
        if previous.as_ref() == Some(&current) {
            walk.stop = Some(WalkStop::Unchanged);
            return walk;
        }

        if let Some(max_stalls) = limits.max_stalls {
            let grew = previous.as_ref().is_none_or(|prev| current.len() > prev.len());
            stalls = if grew { 0 } else { stalls + 1 };
            walk.pages.push(body);
            if stalls >= max_stalls {
                walk.stop = Some(WalkStop::Stalled);
                return walk;
            }
        } else {
            walk.pages.push(body);
        }
        previous = Some(current);
    }

    walk.stop = Some(WalkStop::StepLimit);
    walk
}

/// Fetches a fixed list of URLs in order.
#[derive(Debug)]
pub struct UrlListFeed<'a> {
    fetcher: &'a HttpFetcher,
    urls: VecDeque<String>,
}

impl<'a> UrlListFeed<'a> {
    /// Creates a feed over `urls`.
    pub fn new(fetcher: &'a HttpFetcher, urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            fetcher,
            urls: urls.into_iter().collect(),
        }
    }
}

impl PageFeed for UrlListFeed<'_> {
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let Some(url) = self.urls.pop_front() else {
                return Ok(None);
            };
            self.fetcher.get_text(&url).await.map(Some)
        })
    }
}

/// Renders a dynamic page through an external command.
///
/// Each step runs the command with `{url}` and `{step}` placeholders
/// substituted in its arguments; the command prints the rendered HTML
/// after `step` "load more" activations.
#[derive(Debug, Clone)]
pub struct RenderCommandFeed {
    program: String,
    args: Vec<String>,
    url: String,
    timeout: Duration,
    step: usize,
}

impl RenderCommandFeed {
    /// Creates a feed from an argv (`program` first).
    pub fn new(argv: &[String], url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ProviderError::configuration("render command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            url: url.into(),
            timeout,
            step: 0,
        })
    }

    /// Arguments for the given step.
    pub fn args_for(&self, step: usize) -> Vec<String> {
        let step = step.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{url}", &self.url).replace("{step}", &step))
            .collect()
    }

    async fn render(&self, step: usize) -> ProviderResult<String> {
        let args = self.args_for(step);
        debug!(program = %self.program, ?args, "rendering page");
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| ProviderError::network(format!("renderer timed out after {:?}", self.timeout)))?
            .map_err(|e| {
                ProviderError::io(format!("failed to run renderer {}: {}", self.program, e))
                    .with_source(e)
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::io(format!(
                "renderer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PageFeed for RenderCommandFeed {
    fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let step = self.step;
            self.step += 1;
            self.render(step).await.map(Some)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays canned results.
    struct ScriptedFeed {
        pages: VecDeque<ProviderResult<Option<String>>>,
        pulled: usize,
    }

    impl ScriptedFeed {
        fn new(pages: Vec<ProviderResult<Option<&str>>>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|p| p.map(|o| o.map(String::from)))
                    .collect(),
                pulled: 0,
            }
        }
    }

    impl PageFeed for ScriptedFeed {
        fn next_page(&mut self) -> BoxFuture<'_, ProviderResult<Option<String>>> {
            self.pulled += 1;
            let next = self.pages.pop_front().unwrap_or(Ok(None));
            Box::pin(async move { next })
        }
    }

    /// Items are comma-separated tokens.
    fn items(body: &str) -> Vec<String> {
        body.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn stops_when_exhausted() {
        let mut feed = ScriptedFeed::new(vec![Ok(Some("a,b")), Ok(Some("c")), Ok(None)]);
        let walk = walk_pages(&mut feed, WalkLimits::pages(10), items).await;
        assert_eq!(walk.pages, ["a,b", "c"]);
        assert_eq!(walk.stop, Some(WalkStop::Exhausted));
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let mut feed = ScriptedFeed::new(vec![Ok(Some("a")), Ok(Some("")), Ok(Some("b"))]);
        let walk = walk_pages(&mut feed, WalkLimits::pages(10), items).await;
        assert_eq!(walk.pages, ["a"]);
        assert_eq!(walk.stop, Some(WalkStop::Exhausted));
        assert_eq!(feed.pulled, 2);
    }

    #[tokio::test]
    async fn stops_on_repeated_page() {
        let mut feed = ScriptedFeed::new(vec![Ok(Some("a,b")), Ok(Some("a, b")), Ok(Some("c"))]);
        let walk = walk_pages(&mut feed, WalkLimits::pages(10), items).await;
        assert_eq!(walk.pages, ["a,b"]);
        assert_eq!(walk.stop, Some(WalkStop::Unchanged));
        assert_eq!(walk.fetched, 2);
    }

    #[tokio::test]
    async fn stops_at_step_limit() {
        let mut feed = ScriptedFeed::new(vec![
            Ok(Some("a")),
            Ok(Some("b")),
            Ok(Some("c")),
            Ok(Some("d")),
        ]);
        let walk = walk_pages(&mut feed, WalkLimits::pages(3), items).await;
        assert_eq!(walk.pages.len(), 3);
        assert_eq!(walk.stop, Some(WalkStop::StepLimit));
        assert_eq!(feed.pulled, 3);
    }

    #[tokio::test]
    async fn failure_abandons_remaining_pages() {
        let mut feed = ScriptedFeed::new(vec![
            Ok(Some("a")),
            Err(ProviderError::network("timeout")),
            Ok(Some("b")),
        ]);
        let walk = walk_pages(&mut feed, WalkLimits::pages(10), items).await;
        assert_eq!(walk.pages, ["a"]);
        assert_eq!(walk.failures, 1);
        assert_eq!(walk.stop, Some(WalkStop::Failed));
    }

    #[tokio::test]
    async fn load_more_stalls() {
        let mut feed = ScriptedFeed::new(vec![
            Ok(Some("a")),
            Ok(Some("a,b")),
            Ok(Some("a,c")),
            Ok(Some("a,d")),
            Ok(Some("a,b,c,d")),
        ]);
        let walk = walk_pages(&mut feed, WalkLimits::load_more(60, 2), items).await;
        assert_eq!(walk.stop, Some(WalkStop::Stalled));
        assert_eq!(walk.last_page(), Some("a,d"));
        assert_eq!(feed.pulled, 4);
    }

    #[tokio::test]
    async fn load_more_growth_resets_stalls() {
        let mut feed = ScriptedFeed::new(vec![
            Ok(Some("a")),
            Ok(Some("b")),
            Ok(Some("b,c")),
            Ok(Some("d,e")),
            Ok(Some("d,e,f")),
            Ok(Some("d,e,f")),
        ]);
        let walk = walk_pages(&mut feed, WalkLimits::load_more(60, 2), items).await;
        assert_eq!(walk.stop, Some(WalkStop::Unchanged));
        assert_eq!(walk.last_page(), Some("d,e,f"));
    }

    #[test]
    fn render_args_substitute_placeholders() {
        let argv = vec![
            "render-page".to_string(),
            "--url={url}".to_string(),
            "--clicks".to_string(),
            "{step}".to_string(),
        ];
        let feed =
            RenderCommandFeed::new(&argv, "https://amcham.sk/events", Duration::from_secs(5)).unwrap();
        assert_eq!(
            feed.args_for(4),
            ["--url=https://amcham.sk/events", "--clicks", "4"]
        );
    }

    #[test]
    fn empty_render_command_is_rejected() {
        let err = RenderCommandFeed::new(&[], "https://amcham.sk/events", Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::ConfigurationError);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn render_command_output_is_the_page() {
        let argv = vec!["echo".to_string(), "<p>{step}</p>".to_string()];
        let mut feed = RenderCommandFeed::new(&argv, "unused", Duration::from_secs(5)).unwrap();
        assert_eq!(feed.next_page().await.unwrap().as_deref(), Some("<p>0</p>\n"));
        assert_eq!(feed.next_page().await.unwrap().as_deref(), Some("<p>1</p>\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_render_command_is_an_error() {
        let argv = vec!["false".to_string()];
        let mut feed = RenderCommandFeed::new(&argv, "unused", Duration::from_secs(5)).unwrap();
        let err = feed.next_page().await.unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::IoError);
    }
}
