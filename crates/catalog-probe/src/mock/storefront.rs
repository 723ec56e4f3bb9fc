//! In-memory storefront implementing [`PageSession`].
//!
//! Models the parts of the target site the scenarios touch: a header with a
//! search landmark and keyword field, a collapsible search panel holding the
//! category entry link, the category menu and the search history, and a
//! results page with per-tier selection controls, leaf checkboxes and a
//! dismiss control. The taxonomy is built from the profile's paths.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::dom::{Action, Dom, Element};
use crate::history::{HistoryEntry, HistoryLog};
use crate::locator::{Locator, Role};
use crate::profile::{CategoryPath, SiteProfile, UiLabels};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{ElementState, PageSession, SessionFactory};

/// Suffix of the link that selects a whole parent category
pub const ALL_SUFFIX: &str = "のすべて";

/// Behaviour knobs for the mock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorefrontOptions {
    /// Queries answered with an empty page after each navigation-like action
    pub render_latency: usize,
}

impl StorefrontOptions {
    /// Delay rendering by `polls` queries after navigation-like actions
    #[must_use]
    pub const fn with_render_latency(mut self, polls: usize) -> Self {
        self.render_latency = polls;
        self
    }
}

#[derive(Debug, Clone)]
struct Category {
    label: String,
    code: Option<String>,
    children: Vec<Category>,
}

/// Merge paths into a forest, first occurrence wins for codes
fn build_taxonomy<'a>(paths: impl IntoIterator<Item = &'a CategoryPath>) -> Vec<Category> {
    let mut roots: Vec<Category> = Vec::new();
    for path in paths {
        let mut level = &mut roots;
        for node in path.nodes() {
            let pos = match level.iter().position(|c| c.label == node.label) {
                Some(pos) => pos,
                None => {
                    level.push(Category {
                        label: node.label.clone(),
                        code: node.code.clone(),
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[pos].children;
        }
    }
    roots
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Top,
    Results,
}

type Entry = HistoryEntry<Vec<String>>;

#[derive(Debug)]
struct PageState {
    url: String,
    page: Page,
    panel_open: bool,
    /// Category currently browsed in the menu; `None` when the menu is closed
    menu: Option<Vec<String>>,
    /// Applied category filter as a label path
    filter: Vec<String>,
    keyword: Option<String>,
    draft: String,
    history: HistoryLog<Entry>,
    pending_renders: usize,
}

/// In-memory model of the target storefront
#[derive(Debug)]
pub struct MockStorefront {
    base_url: String,
    labels: UiLabels,
    taxonomy: Vec<Category>,
    options: StorefrontOptions,
    state: Mutex<PageState>,
}

impl MockStorefront {
    /// Storefront for `profile`, rendering instantly
    #[must_use]
    pub fn new(profile: &SiteProfile) -> Self {
        Self::with_options(profile, StorefrontOptions::default())
    }

    /// Storefront for `profile` with explicit options
    #[must_use]
    pub fn with_options(profile: &SiteProfile, options: StorefrontOptions) -> Self {
        Self {
            base_url: profile.base_url.clone(),
            labels: profile.labels.clone(),
            taxonomy: build_taxonomy([&profile.target, &profile.decoy]),
            options,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                page: Page::Blank,
                panel_open: false,
                menu: None,
                filter: Vec::new(),
                keyword: None,
                draft: String::new(),
                history: HistoryLog::new(),
                pending_renders: 0,
            }),
        }
    }

    /// Number of recorded history entries
    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    fn node_at(&self, path: &[String]) -> Option<&Category> {
        let (last, parents) = path.split_last()?;
        let level = self.children_at(parents)?;
        level.iter().find(|c| &c.label == last)
    }

    fn children_at(&self, path: &[String]) -> Option<&[Category]> {
        let mut level = self.taxonomy.as_slice();
        for label in path {
            level = level.iter().find(|c| &c.label == label)?.children.as_slice();
        }
        Some(level)
    }

    fn results_url(&self, st: &PageState) -> String {
        let mut params = Vec::new();
        if let Some(keyword) = &st.keyword {
            params.push(format!("keyword={keyword}"));
        }
        if let Some(node) = self.node_at(&st.filter) {
            params.push(format!(
                "category_id={}",
                node.code.as_deref().unwrap_or(&node.label)
            ));
        }
        format!("{}/search?{}", self.base_url.trim_end_matches('/'), params.join("&"))
    }

    fn render(&self, st: &PageState) -> Dom {
        let mut dom = Dom::default();
        if st.page == Page::Blank {
            return dom;
        }
        let labels = &self.labels;

        let header = dom.push(None, Element::container());
        dom.push(Some(header), Element::link("ログイン"));
        dom.push(Some(header), Element::link("会員登録"));
        let search = dom.push(
            Some(header),
            Element::with_role(Role::Search, &labels.search_box).on_click(Action::OpenSearch),
        );
        dom.push(
            Some(search),
            Element::with_role(Role::Textbox, &labels.keyword_field)
                .label(&labels.keyword_field)
                .value(&st.draft)
                .editable()
                .on_click(Action::FocusKeyword),
        );

        let panel = dom.push(Some(header), Element::container().hidden_if(!st.panel_open));
        dom.push(
            Some(panel),
            Element::link(&labels.category_entry).on_click(Action::OpenCategoryMenu),
        );
        if !st.history.is_empty() {
            let list = dom.push(
                Some(panel),
                Element::with_role(Role::List, "").test_id(&labels.history_test_id),
            );
            for (rank, entry) in st.history.entries().iter().enumerate() {
                let text = entry.display_text(&labels.history_separator);
                dom.push(
                    Some(list),
                    Element::with_role(Role::Listitem, &text)
                        .text(text)
                        .on_click(Action::History(rank)),
                );
            }
        }
        if let Some(path) = &st.menu {
            let menu = dom.push(Some(panel), Element::with_role(Role::List, ""));
            if let Some(parent) = path.last() {
                dom.push(
                    Some(menu),
                    Element::link(format!("{parent}{ALL_SUFFIX}"))
                        .on_click(Action::Category(path.clone())),
                );
            }
            for child in self.children_at(path).unwrap_or_default() {
                let mut child_path = path.clone();
                child_path.push(child.label.clone());
                dom.push(
                    Some(menu),
                    Element::link(&child.label).on_click(Action::Category(child_path)),
                );
            }
        }

        if st.page == Page::Results {
            let main = dom.push(None, Element::container());
            if let Some(keyword) = &st.keyword {
                let heading = format!("{keyword}{}", labels.results_heading_suffix);
                dom.push(
                    Some(main),
                    Element::with_role(Role::Heading, &heading).text(heading),
                );
            }
            dom.push(Some(main), Element::with_role(Role::Combobox, "").value(""));
            if let Some((leaf, parents)) = st.filter.split_last() {
                for depth in 1..=parents.len() {
                    let code = self
                        .node_at(&st.filter[..depth])
                        .and_then(|n| n.code.clone())
                        .unwrap_or_default();
                    dom.push(Some(main), Element::with_role(Role::Combobox, "").value(code));
                }
                for sibling in self.children_at(parents).unwrap_or_default() {
                    dom.push(
                        Some(main),
                        Element::with_role(Role::Checkbox, &sibling.label)
                            .label(&sibling.label)
                            .checked(&sibling.label == leaf),
                    );
                }
                dom.push(
                    Some(main),
                    Element::with_role(Role::Button, &labels.clear_filters)
                        .label(&labels.clear_filters)
                        .on_click(Action::ClearFilters),
                );
            }
        }
        dom
    }

    fn settle(&self, st: &mut PageState) {
        st.pending_renders = self.options.render_latency;
    }

    fn show_results(&self, st: &mut PageState) {
        st.page = Page::Results;
        st.url = self.results_url(st);
        self.settle(st);
    }

    fn apply(&self, st: &mut PageState, action: Action) -> ProbeResult<()> {
        match action {
            Action::OpenSearch => {
                st.panel_open = true;
                st.menu = None;
            }
            Action::OpenCategoryMenu => st.menu = Some(Vec::new()),
            Action::FocusKeyword => {}
            Action::Category(path) => {
                let node = self
                    .node_at(&path)
                    .ok_or_else(|| ProbeError::page(format!("unknown category {path:?}")))?;
                let is_leaf = node.children.is_empty();
                let leaf_label = node.label.clone();
                st.keyword = None;
                st.filter.clone_from(&path);
                if is_leaf {
                    st.history.record(HistoryEntry {
                        keyword: None,
                        category: Some(leaf_label),
                        filter: path,
                    });
                    st.panel_open = false;
                    st.menu = None;
                } else {
                    st.menu = Some(path);
                }
                self.show_results(st);
            }
            Action::ClearFilters => {
                st.filter.clear();
                self.show_results(st);
            }
            Action::History(rank) => {
                let entry = st
                    .history
                    .get(rank)
                    .cloned()
                    .ok_or_else(|| ProbeError::page(format!("no history entry at rank {rank}")))?;
                st.filter.clone_from(&entry.filter);
                st.keyword.clone_from(&entry.keyword);
                st.draft = entry.keyword.clone().unwrap_or_default();
                st.history.record(entry);
                st.panel_open = false;
                st.menu = None;
                self.show_results(st);
            }
        }
        Ok(())
    }

    fn submit_keyword(&self, st: &mut PageState) {
        let keyword = st.draft.trim().to_string();
        if keyword.is_empty() {
            return;
        }
        st.history.record(HistoryEntry {
            keyword: Some(keyword.clone()),
            category: st.filter.last().cloned(),
            filter: st.filter.clone(),
        });
        st.keyword = Some(keyword);
        st.panel_open = false;
        st.menu = None;
        self.show_results(st);
    }

    /// Element `index` of the candidates for `locator`, which must be rendered
    fn target(dom: &Dom, locator: &Locator, index: usize) -> ProbeResult<usize> {
        let node = dom
            .select(locator)
            .get(index)
            .copied()
            .ok_or_else(|| ProbeError::page(format!("{locator} has no candidate #{index}")))?;
        if !dom.is_visible(node) {
            return Err(ProbeError::page(format!("{locator} #{index} is not visible")));
        }
        Ok(node)
    }
}

#[async_trait]
impl PageSession for MockStorefront {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        if url.trim_end_matches('/') != self.base_url.trim_end_matches('/') {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "unknown page".to_string(),
            });
        }
        let mut st = self.state.lock().await;
        st.url = self.base_url.clone();
        st.page = Page::Top;
        st.panel_open = false;
        st.menu = None;
        st.filter.clear();
        st.keyword = None;
        st.draft.clear();
        self.settle(&mut st);
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        let mut st = self.state.lock().await;
        if st.pending_renders > 0 {
            st.pending_renders -= 1;
            return Ok(Vec::new());
        }
        let dom = self.render(&st);
        Ok(dom.select(locator).into_iter().map(|i| dom.state(i)).collect())
    }

    async fn click(&self, locator: &Locator, index: usize) -> ProbeResult<()> {
        let mut st = self.state.lock().await;
        let dom = self.render(&st);
        let node = Self::target(&dom, locator, index)?;
        match dom.element(node).action.clone() {
            Some(action) => self.apply(&mut st, action),
            None => Ok(()),
        }
    }

    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> ProbeResult<()> {
        let mut st = self.state.lock().await;
        let dom = self.render(&st);
        let node = Self::target(&dom, locator, index)?;
        if !dom.element(node).editable {
            return Err(ProbeError::page(format!("{locator} is not editable")));
        }
        st.draft = text.to_string();
        Ok(())
    }

    async fn press(&self, locator: &Locator, index: usize, key: &str) -> ProbeResult<()> {
        let mut st = self.state.lock().await;
        let dom = self.render(&st);
        let node = Self::target(&dom, locator, index)?;
        if key == "Enter" && dom.element(node).editable {
            self.submit_keyword(&mut st);
        }
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.state.lock().await.url.clone())
    }
}

/// Opens a fresh [`MockStorefront`] per scenario
#[derive(Debug, Clone)]
pub struct MockStorefrontFactory {
    profile: SiteProfile,
    options: StorefrontOptions,
}

impl MockStorefrontFactory {
    /// Factory for storefronts modelled on `profile`
    #[must_use]
    pub fn new(profile: SiteProfile) -> Self {
        Self {
            profile,
            options: StorefrontOptions::default(),
        }
    }

    /// Use these options for every storefront
    #[must_use]
    pub const fn with_options(mut self, options: StorefrontOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl SessionFactory for MockStorefrontFactory {
    type Session = MockStorefront;

    async fn open(&self) -> ProbeResult<MockStorefront> {
        Ok(MockStorefront::with_options(&self.profile, self.options))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn opened(profile: &SiteProfile) -> MockStorefront {
        let page = MockStorefront::new(profile);
        page.goto(&profile.base_url).await.unwrap();
        page.click(&Locator::role(Role::Search, &profile.labels.search_box), 0)
            .await
            .unwrap();
        page.click(&Locator::role(Role::Link, &profile.labels.category_entry), 0)
            .await
            .unwrap();
        page
    }

    async fn pick(page: &MockStorefront, path: &CategoryPath) {
        for node in path.nodes() {
            let locator = node.link_locator();
            let candidates = page.query(&locator).await.unwrap();
            assert_eq!(candidates.len(), 1, "{locator} should be unique");
            page.click(&locator, 0).await.unwrap();
        }
    }

    async fn history_texts(page: &MockStorefront, profile: &SiteProfile) -> Vec<String> {
        let items = Locator::test_id(&profile.labels.history_test_id)
            .locate(Locator::any_role(Role::Listitem));
        page.query(&items)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.text)
            .collect()
    }

    mod taxonomy_tests {
        use super::*;

        #[test]
        fn test_paths_merge_into_forest() {
            let profile = SiteProfile::mercari_jp();
            let roots = build_taxonomy([&profile.target, &profile.decoy]);
            let labels: Vec<&str> = roots.iter().map(|c| c.label.as_str()).collect();
            assert_eq!(labels, vec!["本・雑誌・漫画", "ファッション"]);
            assert_eq!(roots[0].children[0].code.as_deref(), Some("72"));
        }

        #[tokio::test]
        async fn test_tier2_role_name_is_ambiguous() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            page.click(&profile.target.nodes()[0].link_locator(), 0)
                .await
                .unwrap();
            let by_role = page.query(&Locator::role(Role::Link, "本")).await.unwrap();
            assert_eq!(by_role.len(), 2);
            let by_text = page.query(&Locator::exact_text("本")).await.unwrap();
            assert_eq!(by_text.len(), 1);
        }
    }

    mod filter_tests {
        use super::*;

        #[tokio::test]
        async fn test_drill_down_sets_controls_and_leaf() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.target).await;

            let controls = page.query(&Locator::any_role(Role::Combobox)).await.unwrap();
            let values: Vec<_> = controls.iter().map(|c| c.value.clone().unwrap()).collect();
            assert_eq!(values, vec!["", "5", "72"]);

            let leaf = page.query(&Locator::label("コンピュータ・IT")).await.unwrap();
            assert_eq!(leaf.len(), 1);
            assert_eq!(leaf[0].checked, Some(true));
            assert!(page.current_url().await.unwrap().contains("/search?"));
        }

        #[tokio::test]
        async fn test_clear_filters_removes_controls() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.target).await;
            page.click(&Locator::label("close"), 0).await.unwrap();

            let controls = page.query(&Locator::any_role(Role::Combobox)).await.unwrap();
            assert_eq!(controls.len(), 1);
            assert!(page.query(&Locator::label("close")).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_unknown_action_target_is_page_error() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            let err = page
                .click(&Locator::role(Role::Link, "存在しない"), 0)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Page { .. }));
        }
    }

    mod history_tests {
        use super::*;

        #[tokio::test]
        async fn test_history_is_newest_first() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.decoy).await;
            page.click(&Locator::role(Role::Search, "検索"), 0).await.unwrap();
            page.click(&Locator::role(Role::Link, &profile.labels.category_entry), 0)
                .await
                .unwrap();
            pick(&page, &profile.target).await;

            page.goto(&profile.base_url).await.unwrap();
            assert_eq!(
                history_texts(&page, &profile).await,
                vec!["コンピュータ・IT", "フレアスカート"]
            );
        }

        #[tokio::test]
        async fn test_repeat_does_not_duplicate() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.target).await;
            page.click(&Locator::role(Role::Search, "検索"), 0).await.unwrap();
            page.click(&Locator::role(Role::Link, &profile.labels.category_entry), 0)
                .await
                .unwrap();
            pick(&page, &profile.target).await;
            assert_eq!(page.history_len().await, 1);
        }

        #[tokio::test]
        async fn test_keyword_with_filter_records_both() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.target).await;

            let field = Locator::label(&profile.labels.keyword_field);
            page.fill(&field, 0, "javascript").await.unwrap();
            page.press(&field, 0, "Enter").await.unwrap();

            page.goto(&profile.base_url).await.unwrap();
            let texts = history_texts(&page, &profile).await;
            assert_eq!(texts[0], "javascript, コンピュータ・IT");
            assert_eq!(texts[1], "コンピュータ・IT");
        }

        #[tokio::test]
        async fn test_reselect_reapplies_filter() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            pick(&page, &profile.target).await;
            page.goto(&profile.base_url).await.unwrap();
            assert!(page.query(&Locator::any_role(Role::Combobox)).await.unwrap().is_empty());

            page.click(&Locator::role(Role::Search, "検索"), 0).await.unwrap();
            let newest = Locator::test_id(&profile.labels.history_test_id)
                .locate(Locator::any_role(Role::Listitem));
            page.click(&newest, 0).await.unwrap();

            let controls = page.query(&Locator::any_role(Role::Combobox)).await.unwrap();
            assert_eq!(controls.len(), 3);
            assert_eq!(controls[2].value.as_deref(), Some("72"));
            assert_eq!(page.history_len().await, 1);
        }

        #[tokio::test]
        async fn test_empty_keyword_records_nothing() {
            let profile = SiteProfile::mercari_jp();
            let page = opened(&profile).await;
            let field = Locator::label(&profile.labels.keyword_field);
            page.fill(&field, 0, "   ").await.unwrap();
            page.press(&field, 0, "Enter").await.unwrap();
            assert_eq!(page.history_len().await, 0);
        }
    }

    mod latency_tests {
        use super::*;

        #[tokio::test]
        async fn test_render_latency_hides_page_briefly() {
            let profile = SiteProfile::mercari_jp();
            let page = MockStorefront::with_options(
                &profile,
                StorefrontOptions::default().with_render_latency(2),
            );
            page.goto(&profile.base_url).await.unwrap();
            let search = Locator::role(Role::Search, "検索");
            assert!(page.query(&search).await.unwrap().is_empty());
            assert!(page.query(&search).await.unwrap().is_empty());
            assert_eq!(page.query(&search).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_blank_before_navigation() {
            let profile = SiteProfile::mercari_jp();
            let page = MockStorefront::new(&profile);
            assert_eq!(page.current_url().await.unwrap(), "about:blank");
            assert!(page.query(&Locator::any_role(Role::Link)).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_factory_sessions_are_isolated() {
        let profile = SiteProfile::mercari_jp();
        let factory = MockStorefrontFactory::new(profile.clone());
        let first = factory.open().await.unwrap();
        let page = opened(&profile).await;
        pick(&page, &profile.target).await;
        first.goto(&profile.base_url).await.unwrap();
        assert_eq!(first.history_len().await, 0);
        assert_eq!(page.history_len().await, 1);
    }
}
