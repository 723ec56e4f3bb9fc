//! Browser control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`Browser`] launches Chromium through
//! chromiumoxide and [`CdpSession`] implements [`PageSession`] by evaluating
//! an in-page resolver that applies the same matching rules as the
//! in-memory storefront. [`BrowserConfig`] is always available so run
//! configuration can be built and validated without a browser.
//!
//! [`PageSession`]: crate::session::PageSession

use std::path::PathBuf;

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Profile directory; a fresh one is created per session when unset
    pub user_data_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            user_data_dir: None,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Use a specific profile directory
    #[must_use]
    pub fn with_user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }
}

/// Expression evaluating to the in-page resolver object
#[cfg(feature = "browser")]
const RESOLVER: &str = include_str!("browser/resolve.js");

#[cfg(feature = "browser")]
mod cdp {
    use super::{BrowserConfig, RESOLVER};
    use crate::locator::Locator;
    use crate::result::{ProbeError, ProbeResult};
    use crate::session::{ElementState, PageSession, SessionFactory};
    use async_trait::async_trait;
    use base64::Engine;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
        DispatchMouseEventType, InsertTextParams, MouseButton,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::path::PathBuf;
    use tokio::sync::Mutex;

    fn page_error(e: impl std::fmt::Display) -> ProbeError {
        ProbeError::page(e.to_string())
    }

    /// Viewport coordinates of an element's centre
    #[derive(Debug, Clone, Copy, serde::Deserialize)]
    struct Point {
        x: f64,
        y: f64,
    }

    /// Browser instance with a live CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Mutex<CdpBrowser>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a new browser instance
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .viewport(None);

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            if let Some(ref dir) = config.user_data_dir {
                builder = builder.user_data_dir(dir);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| ProbeError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::debug!(headless = config.headless, "browser launched");
            Ok(Self {
                config,
                inner: Mutex::new(browser),
                handle,
            })
        }

        /// Open a blank page
        pub async fn new_page(&self) -> ProbeResult<CdpPage> {
            let browser = self.inner.lock().await;
            browser.new_page("about:blank").await.map_err(page_error)
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser and stop its event loop
        pub async fn close(self) -> ProbeResult<()> {
            let result = {
                let mut browser = self.inner.lock().await;
                match browser.close().await {
                    Ok(_) => browser.wait().await.map(drop).map_err(ProbeError::from),
                    Err(e) => Err(ProbeError::BrowserLaunch {
                        message: e.to_string(),
                    }),
                }
            };
            self.handle.abort();
            result
        }
    }

    /// A [`PageSession`] backed by one Chromium page
    #[derive(Debug)]
    pub struct CdpSession {
        browser: Browser,
        page: CdpPage,
        profile_dir: Option<PathBuf>,
    }

    impl CdpSession {
        /// Launch a browser and open its page
        pub async fn launch(config: BrowserConfig) -> ProbeResult<Self> {
            let browser = Browser::launch(config).await?;
            let page = browser.new_page().await?;
            Ok(Self {
                browser,
                page,
                profile_dir: None,
            })
        }

        async fn call<T: serde::de::DeserializeOwned>(&self, expr: String) -> ProbeResult<T> {
            let result = self.page.evaluate(expr).await.map_err(page_error)?;
            result.into_value().map_err(page_error)
        }

        async fn focus(&self, locator: &Locator, index: usize, select_all: bool) -> ProbeResult<()> {
            let json = locator.to_query_json()?;
            self.call::<bool>(format!(
                "{}.focus({json}, {index}, {select_all})",
                RESOLVER.trim_end()
            ))
            .await
            .map(drop)
        }

        async fn mouse(&self, kind: DispatchMouseEventType, at: Point) -> ProbeResult<()> {
            let mut builder = DispatchMouseEventParams::builder()
                .r#type(kind.clone())
                .x(at.x)
                .y(at.y);
            if kind != DispatchMouseEventType::MouseMoved {
                builder = builder.button(MouseButton::Left).click_count(1);
            }
            let params = builder.build().map_err(ProbeError::page)?;
            self.page.execute(params).await.map_err(page_error)?;
            Ok(())
        }

        async fn key(&self, kind: DispatchKeyEventType, key: &str) -> ProbeResult<()> {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind.clone())
                .key(key)
                .code(key);
            if key == "Enter" {
                builder = builder.windows_virtual_key_code(13);
                if kind == DispatchKeyEventType::KeyDown {
                    builder = builder.text("\r");
                }
            }
            let params = builder.build().map_err(ProbeError::page)?;
            self.page.execute(params).await.map_err(page_error)?;
            Ok(())
        }

        /// Close the page's browser and remove a generated profile
        pub async fn close(self) -> ProbeResult<()> {
            let closed = self.browser.close().await;
            if let Some(dir) = self.profile_dir {
                if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                    tracing::debug!(dir = %dir.display(), error = %e, "profile not removed");
                }
            }
            closed
        }
    }

    #[async_trait]
    impl PageSession for CdpSession {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
            let json = locator.to_query_json()?;
            self.call(format!("{}.query({json})", RESOLVER.trim_end()))
                .await
        }

        async fn click(&self, locator: &Locator, index: usize) -> ProbeResult<()> {
            let json = locator.to_query_json()?;
            let at: Point = self
                .call(format!("{}.point({json}, {index})", RESOLVER.trim_end()))
                .await?;
            tracing::trace!(%locator, x = at.x, y = at.y, "mouse click");
            self.mouse(DispatchMouseEventType::MouseMoved, at).await?;
            self.mouse(DispatchMouseEventType::MousePressed, at).await?;
            self.mouse(DispatchMouseEventType::MouseReleased, at).await
        }

        async fn fill(&self, locator: &Locator, index: usize, text: &str) -> ProbeResult<()> {
            self.focus(locator, index, true).await?;
            self.page
                .execute(InsertTextParams::new(text))
                .await
                .map_err(page_error)?;
            Ok(())
        }

        async fn press(&self, locator: &Locator, index: usize, key: &str) -> ProbeResult<()> {
            self.focus(locator, index, false).await?;
            self.key(DispatchKeyEventType::KeyDown, key).await?;
            self.key(DispatchKeyEventType::KeyUp, key).await
        }

        async fn current_url(&self) -> ProbeResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(page_error)?
                .unwrap_or_default())
        }

        async fn screenshot(&self) -> ProbeResult<Option<Vec<u8>>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let shot = self.page.execute(params).await.map_err(page_error)?;
            let png = base64::engine::general_purpose::STANDARD
                .decode(&shot.data)
                .map_err(page_error)?;
            Ok(Some(png))
        }
    }

    /// Launches one browser per session, each with a throwaway profile
    #[derive(Debug, Clone)]
    pub struct BrowserSessionFactory {
        config: BrowserConfig,
    }

    impl BrowserSessionFactory {
        /// Factory for sessions launched with `config`
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl SessionFactory for BrowserSessionFactory {
        type Session = CdpSession;

        async fn open(&self) -> ProbeResult<CdpSession> {
            let mut config = self.config.clone();
            let generated = if config.user_data_dir.is_none() {
                let dir = std::env::temp_dir()
                    .join(format!("catalog-probe-{}", uuid::Uuid::new_v4()));
                config.user_data_dir = Some(dir.clone());
                Some(dir)
            } else {
                None
            };

            let mut session = CdpSession::launch(config).await?;
            session.profile_dir = generated;
            Ok(session)
        }

        async fn close(&self, session: CdpSession) -> ProbeResult<()> {
            session.close().await
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    mod resolver_tests {
        use super::*;
        use crate::locator::Role;

        const FIXTURE: &str = r##"<!doctype html>
<html><head><meta charset="utf-8"></head><body>
<nav><a href="#a" aria-label="本の一覧">本</a></nav>
<div><ul><li><span>本</span></li></ul></div>
<section data-testid="panel"><a href="#b">コンピュータ・IT</a></section>
<a href="#c">コンピュータ・IT</a>
<a href="#d" style="display:none">隠しリンク</a>
<label for="kw">キーワード</label><input id="kw" type="text" value="js">
<input type="checkbox" aria-label="コンピュータ・IT">
<button id="go" onclick="this.dataset.trusted = String(event.isTrusted)">検索</button>
</body></html>"##;

        async fn fixture_page() -> CdpSession {
            let page = CdpSession::launch(BrowserConfig::default().with_no_sandbox())
                .await
                .unwrap();
            let encoded = base64::engine::general_purpose::STANDARD.encode(FIXTURE);
            page.goto(&format!("data:text/html;charset=utf-8;base64,{encoded}"))
                .await
                .unwrap();
            page
        }

        #[tokio::test]
        #[ignore = "requires a local Chromium"]
        async fn test_matching_rules_agree_with_the_storefront_model() {
            let page = fixture_page().await;

            // aria-label wins over text content for the accessible name
            assert_eq!(page.query(&Locator::role(Role::Link, "本の一覧")).await.unwrap().len(), 1);
            assert!(page
                .query(&Locator::role(Role::Link, "本").exact())
                .await
                .unwrap()
                .is_empty());

            // only the innermost elements carrying the text match
            let texts = page.query(&Locator::exact_text("本")).await.unwrap();
            assert_eq!(texts.len(), 2);

            let link = Locator::role(Role::Link, "コンピュータ・IT");
            assert_eq!(page.query(&link).await.unwrap().len(), 2);
            let scoped = Locator::test_id("panel").locate(link);
            assert_eq!(page.query(&scoped).await.unwrap().len(), 1);

            let hidden = page.query(&Locator::role(Role::Link, "隠しリンク")).await.unwrap();
            assert_eq!(hidden.len(), 1);
            assert!(!hidden[0].visible);

            let field = page.query(&Locator::label("キーワード")).await.unwrap();
            assert_eq!(field.len(), 1);
            assert_eq!(field[0].value.as_deref(), Some("js"));

            let leaf = Locator::role(Role::Checkbox, "コンピュータ・IT").exact();
            assert_eq!(page.query(&leaf).await.unwrap()[0].checked, Some(false));

            page.close().await.unwrap();
        }

        #[tokio::test]
        #[ignore = "requires a local Chromium"]
        async fn test_click_dispatches_trusted_mouse_input() {
            let page = fixture_page().await;

            page.click(&Locator::role(Role::Button, "検索"), 0).await.unwrap();
            let trusted: String = page
                .call("document.getElementById('go').dataset.trusted".to_string())
                .await
                .unwrap();
            assert_eq!(trusted, "true");

            let leaf = Locator::role(Role::Checkbox, "コンピュータ・IT").exact();
            page.click(&leaf, 0).await.unwrap();
            assert_eq!(page.query(&leaf).await.unwrap()[0].checked, Some(true));

            page.close().await.unwrap();
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, BrowserSessionFactory, CdpSession};
