//! In-memory storefront for driving scenarios without a browser.
//!
//! [`MockStorefront`] implements [`PageSession`](crate::session::PageSession)
//! over a small accessibility tree rebuilt from its state on every query, so
//! the locator, wait and assertion layers exercise the same code paths they
//! use against a real page.
//!
//! ```rust,ignore
//! let profile = SiteProfile::mercari_jp();
//! let page = MockStorefront::new(&profile);
//! let report = ScenarioRunner::new().run(&category_drill_down(&profile)?, &page).await;
//! assert!(report.passed());
//! ```

mod dom;
#[cfg(test)]
pub(crate) mod reloading;
pub mod storefront;

pub use storefront::{MockStorefront, MockStorefrontFactory, StorefrontOptions, ALL_SUFFIX};

#[cfg(test)]
pub(crate) use reloading::ReloadingPage;
