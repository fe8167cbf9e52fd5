//! Selection and navigation state machine.
//!
//! One mutex-guarded state block, mutated by synchronous commands. Delayed
//! effects (overlay close-out clears, cross-entity hops, search debounce) are
//! spawned timer tasks guarded by an epoch counter: every state-writing
//! command bumps the epoch, so any timer scheduled before it silently lapses
//! instead of clobbering newer state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::TransitionConfig;
use crate::types::{EntityRef, Person, Site, ViewMode};

pub const SEARCH_RESULTS_TITLE: &str = "Kết quả tìm kiếm";
pub const SITES_TITLE: &str = "Địa điểm nổi bật";
pub const PERSONS_TITLE: &str = "Nhân vật Lịch sử";

/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

const GLOBAL_SEARCH_SITE_CAP: usize = 5;
const GLOBAL_SEARCH_PERSON_CAP: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    pub view_mode: ViewMode,
    pub selected_site: Option<Site>,
    pub selected_person: Option<Person>,
    pub overlay_open: bool,
    pub search_input: String,
    pub search_term: String,
    pub category_filter: String,
}

struct Inner {
    view_mode: ViewMode,
    selected_site: Option<Site>,
    selected_person: Option<Person>,
    overlay_open: bool,
    /// Raw text as typed; drives the list title and global search instantly.
    search_input: String,
    /// Debounced text; drives list filtering.
    search_term: String,
    category_filter: String,
    /// Map deselect events arriving before this instant are echoes of the
    /// popup closing underneath the opening overlay, not user intent.
    popup_guard_until: Option<Instant>,
    epoch: u64,
    all_sites: Vec<Site>,
    all_persons: Vec<Person>,
}

impl Inner {
    fn new() -> Self {
        Self {
            view_mode: ViewMode::Sites,
            selected_site: None,
            selected_person: None,
            overlay_open: false,
            search_input: String::new(),
            search_term: String::new(),
            category_filter: ALL_CATEGORIES.to_string(),
            popup_guard_until: None,
            epoch: 0,
            all_sites: Vec::new(),
            all_persons: Vec::new(),
        }
    }

    fn bump(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Drop a selected site that the current filters no longer show.
    fn invalidate_selection(&mut self) {
        if self.view_mode != ViewMode::Sites {
            return;
        }
        let Some(selected) = &self.selected_site else {
            return;
        };
        let id = selected.site_id;
        let visible = filter_sites(
            &self.all_sites,
            &self.search_term,
            &self.category_filter,
        )
        .iter()
        .any(|s| s.site_id == id);
        if !visible {
            self.selected_site = None;
            if self.selected_person.is_none() {
                self.overlay_open = false;
            }
        }
    }
}

fn matches(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn filter_sites<'a>(sites: &'a [Site], term: &str, category: &str) -> Vec<&'a Site> {
    sites
        .iter()
        .filter(|s| category == ALL_CATEGORIES || s.site_type == category)
        .filter(|s| term.is_empty() || matches(&s.site_name, term))
        .collect()
}

fn filter_persons<'a>(persons: &'a [Person], term: &str) -> Vec<&'a Person> {
    persons
        .iter()
        .filter(|p| term.is_empty() || matches(&p.full_name, term))
        .collect()
}

#[derive(Clone)]
pub struct SelectionController {
    inner: Arc<Mutex<Inner>>,
    cfg: TransitionConfig,
}

impl SelectionController {
    pub fn new(cfg: TransitionConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
            cfg,
        }
    }

    pub fn set_catalog(&self, sites: Vec<Site>, persons: Vec<Person>) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.all_sites = sites;
        inner.all_persons = persons;
        inner.invalidate_selection();
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let inner = self.inner.lock();
        SelectionSnapshot {
            view_mode: inner.view_mode,
            selected_site: inner.selected_site.clone(),
            selected_person: inner.selected_person.clone(),
            overlay_open: inner.overlay_open,
            search_input: inner.search_input.clone(),
            search_term: inner.search_term.clone(),
            category_filter: inner.category_filter.clone(),
        }
    }

    /// Run `apply` after `delay` unless any other command lands first.
    fn schedule(&self, delay: Duration, epoch: u64, apply: impl FnOnce(&mut Inner) + Send + 'static) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = inner.lock();
            if inner.epoch == epoch {
                apply(&mut inner);
                inner.bump();
            }
        });
    }

    /// List pick (sites mode): select and open the overlay in one step.
    pub fn select_site_from_list(&self, site: Site) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.selected_site = Some(site);
        inner.selected_person = None;
        inner.overlay_open = true;
    }

    /// List pick (persons mode): select and open the overlay in one step.
    pub fn select_person_from_list(&self, person: Person) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.selected_person = Some(person);
        inner.selected_site = None;
        inner.overlay_open = true;
    }

    /// Map pick. `Some` selects a marker without opening the overlay; `None`
    /// is a deselect, ignored inside the popup-close guard window.
    pub fn select_site_from_map(&self, site: Option<Site>) {
        let mut inner = self.inner.lock();
        if site.is_none() {
            if let Some(until) = inner.popup_guard_until {
                if Instant::now() < until {
                    return;
                }
            }
        }
        inner.bump();
        match site {
            Some(site) => {
                inner.selected_site = Some(site);
                inner.selected_person = None;
                // A pin pick lands on the popup stage, never an open overlay.
                inner.overlay_open = false;
            }
            None => inner.selected_site = None,
        }
    }

    /// Popup's "show detail" action: open the overlay for the selected site
    /// and arm the guard that swallows the popup's own close echo.
    pub fn show_site_detail(&self) {
        let mut inner = self.inner.lock();
        if inner.selected_site.is_none() {
            return;
        }
        inner.bump();
        inner.overlay_open = true;
        inner.popup_guard_until = Some(Instant::now() + self.cfg.popup_guard());
    }

    /// Close the overlay now; clear both selections once the close-out
    /// animation has had time to finish.
    pub fn close_overlay(&self) {
        let epoch = {
            let mut inner = self.inner.lock();
            inner.overlay_open = false;
            inner.bump()
        };
        self.schedule(self.cfg.close_delay(), epoch, |inner| {
            inner.selected_site = None;
            inner.selected_person = None;
        });
    }

    /// Cross-link: from a site overlay to one of its related persons. The
    /// site overlay closes first; the person overlay opens after the close
    /// delay so the two never overlap.
    pub fn select_related_person(&self, person: Person) {
        let epoch = {
            let mut inner = self.inner.lock();
            inner.overlay_open = false;
            inner.selected_site = None;
            inner.bump()
        };
        self.schedule(self.cfg.close_delay(), epoch, move |inner| {
            inner.selected_person = Some(person);
            inner.overlay_open = true;
        });
    }

    /// Cross-link: from a person overlay to a related site. Also flips the
    /// browsing mode to sites so the map matches the opened overlay.
    pub fn select_related_site(&self, site: Site) {
        let epoch = {
            let mut inner = self.inner.lock();
            inner.overlay_open = false;
            inner.selected_person = None;
            inner.bump()
        };
        self.schedule(self.cfg.close_delay(), epoch, move |inner| {
            inner.view_mode = ViewMode::Sites;
            inner.selected_site = Some(site);
            inner.overlay_open = true;
        });
    }

    /// Global search pick. Sites land on the map (popup, no overlay);
    /// persons open their overlay directly since they have no marker.
    pub fn select_search_result(&self, result: EntityRef) {
        let mut inner = self.inner.lock();
        inner.bump();
        match result {
            EntityRef::Site(site) => {
                inner.view_mode = ViewMode::Sites;
                inner.selected_site = Some(site);
                inner.selected_person = None;
                inner.overlay_open = false;
            }
            EntityRef::Person(person) => {
                inner.view_mode = ViewMode::Persons;
                inner.selected_person = Some(person);
                inner.selected_site = None;
                inner.overlay_open = true;
            }
        }
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.view_mode = mode;
        inner.invalidate_selection();
    }

    pub fn set_category_filter(&self, category: &str) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.category_filter = category.to_string();
        inner.invalidate_selection();
    }

    /// Record raw input immediately; commit it to the filtering term after
    /// the debounce window, cancelled by any newer command.
    pub fn set_search_input(&self, text: &str) {
        let committed = text.to_string();
        let epoch = {
            let mut inner = self.inner.lock();
            inner.search_input = committed.clone();
            inner.bump()
        };
        self.schedule(self.cfg.search_debounce(), epoch, move |inner| {
            inner.search_term = committed;
            inner.invalidate_selection();
        });
    }

    /// Entities the list panel shows under the current mode and filters.
    pub fn filtered_items(&self) -> Vec<EntityRef> {
        let inner = self.inner.lock();
        match inner.view_mode {
            ViewMode::Sites => {
                filter_sites(&inner.all_sites, &inner.search_term, &inner.category_filter)
                    .into_iter()
                    .map(|s| EntityRef::Site(s.clone()))
                    .collect()
            }
            ViewMode::Persons => filter_persons(&inner.all_persons, &inner.search_term)
                .into_iter()
                .map(|p| EntityRef::Person(p.clone()))
                .collect(),
        }
    }

    /// Distinct site categories for the filter dropdown, "all" first.
    pub fn site_types(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut types: Vec<String> = inner
            .all_sites
            .iter()
            .map(|s| s.site_type.clone())
            .collect();
        types.sort();
        types.dedup();
        let mut out = vec![ALL_CATEGORIES.to_string()];
        out.extend(types);
        out
    }

    /// Cross-kind quick search on the raw (undebounced) input. Results of the
    /// current browsing kind come first; sites cap at 5, persons at 3.
    pub fn global_search(&self) -> Vec<EntityRef> {
        let inner = self.inner.lock();
        let term = inner.search_input.trim();
        if term.is_empty() {
            return Vec::new();
        }
        let sites: Vec<EntityRef> = inner
            .all_sites
            .iter()
            .filter(|s| matches(&s.site_name, term))
            .take(GLOBAL_SEARCH_SITE_CAP)
            .map(|s| EntityRef::Site(s.clone()))
            .collect();
        let persons: Vec<EntityRef> = inner
            .all_persons
            .iter()
            .filter(|p| matches(&p.full_name, term))
            .take(GLOBAL_SEARCH_PERSON_CAP)
            .map(|p| EntityRef::Person(p.clone()))
            .collect();
        let mut out = Vec::with_capacity(sites.len() + persons.len());
        match inner.view_mode {
            ViewMode::Sites => {
                out.extend(sites);
                out.extend(persons);
            }
            ViewMode::Persons => {
                out.extend(persons);
                out.extend(sites);
            }
        }
        out
    }

    /// List panel heading. Any raw input switches to the search heading
    /// immediately, without waiting for the debounce; an active category
    /// filter (sites mode) counts as filtering too.
    pub fn list_title(&self) -> &'static str {
        let inner = self.inner.lock();
        let category_active =
            inner.view_mode == ViewMode::Sites && inner.category_filter != ALL_CATEGORIES;
        if !inner.search_input.trim().is_empty() || category_active {
            SEARCH_RESULTS_TITLE
        } else {
            match inner.view_mode {
                ViewMode::Sites => SITES_TITLE,
                ViewMode::Persons => PERSONS_TITLE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn site(id: u32, name: &str, site_type: &str) -> Site {
        Site {
            site_id: id,
            site_name: name.into(),
            site_type: site_type.into(),
            latitude: 16.0,
            longitude: 108.0,
            address: None,
            established_year: None,
            status: None,
            description: None,
            additional_info: Default::default(),
        }
    }

    fn person(id: u32, name: &str) -> Person {
        Person {
            person_id: id,
            full_name: name.into(),
            birth_year: None,
            death_year: None,
        }
    }

    fn controller() -> SelectionController {
        let ctl = SelectionController::new(TransitionConfig::default());
        ctl.set_catalog(
            vec![
                site(1, "Cầu Rồng", "Công trình kiến trúc"),
                site(4, "Bảo tàng Điêu khắc Chăm", "Bảo tàng"),
            ],
            vec![person(1, "Nguyễn Bá Thanh"), person(2, "Henri Parmentier")],
        );
        ctl
    }

    async fn settle() {
        // Long enough for any pending timer in these tests.
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn list_pick_selects_and_opens_overlay() {
        let ctl = controller();
        ctl.select_site_from_list(site(1, "Cầu Rồng", "Công trình kiến trúc"));
        let snap = ctl.snapshot();
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_site.unwrap().site_id, 1);
        assert!(snap.selected_person.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn popup_guard_swallows_the_close_echo() {
        let ctl = controller();
        ctl.select_site_from_map(Some(site(1, "Cầu Rồng", "Công trình kiến trúc")));
        ctl.show_site_detail();

        // Echo of the popup closing underneath the overlay.
        ctl.select_site_from_map(None);
        let snap = ctl.snapshot();
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_site.as_ref().unwrap().site_id, 1);

        // Past the guard window a deselect is honored again.
        tokio::time::sleep(Duration::from_millis(150)).await;
        ctl.select_site_from_map(None);
        assert!(ctl.snapshot().selected_site.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn close_clears_selection_after_the_delay() {
        let ctl = controller();
        ctl.select_site_from_list(site(1, "Cầu Rồng", "Công trình kiến trúc"));
        ctl.close_overlay();

        // Immediately after: overlay closed but selection still present.
        let snap = ctl.snapshot();
        assert!(!snap.overlay_open);
        assert!(snap.selected_site.is_some());

        settle().await;
        assert!(ctl.snapshot().selected_site.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_command_cancels_a_pending_clear() {
        let ctl = controller();
        ctl.select_site_from_list(site(1, "Cầu Rồng", "Công trình kiến trúc"));
        ctl.close_overlay();

        // Re-selecting within the close delay must survive the stale timer.
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctl.select_site_from_list(site(4, "Bảo tàng Điêu khắc Chăm", "Bảo tàng"));

        settle().await;
        let snap = ctl.snapshot();
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_site.unwrap().site_id, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn related_person_hop_sequences_the_two_overlays() {
        let ctl = controller();
        ctl.select_site_from_list(site(1, "Cầu Rồng", "Công trình kiến trúc"));
        ctl.select_related_person(person(1, "Nguyễn Bá Thanh"));

        let snap = ctl.snapshot();
        assert!(!snap.overlay_open);
        assert!(snap.selected_site.is_none());
        assert!(snap.selected_person.is_none());

        settle().await;
        let snap = ctl.snapshot();
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_person.unwrap().person_id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn related_site_hop_switches_back_to_sites_mode() {
        let ctl = controller();
        ctl.set_view_mode(ViewMode::Persons);
        ctl.select_person_from_list(person(1, "Nguyễn Bá Thanh"));
        ctl.select_related_site(site(1, "Cầu Rồng", "Công trình kiến trúc"));

        settle().await;
        let snap = ctl.snapshot();
        assert_eq!(snap.view_mode, ViewMode::Sites);
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_site.unwrap().site_id, 1);
        assert!(snap.selected_person.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn search_result_site_lands_on_map_person_opens_overlay() {
        let ctl = controller();
        ctl.set_view_mode(ViewMode::Persons);

        ctl.select_search_result(EntityRef::Site(site(4, "Bảo tàng Điêu khắc Chăm", "Bảo tàng")));
        let snap = ctl.snapshot();
        assert_eq!(snap.view_mode, ViewMode::Sites);
        assert!(!snap.overlay_open);
        assert_eq!(snap.selected_site.unwrap().site_id, 4);

        ctl.select_search_result(EntityRef::Person(person(2, "Henri Parmentier")));
        let snap = ctl.snapshot();
        assert_eq!(snap.view_mode, ViewMode::Persons);
        assert!(snap.overlay_open);
        assert_eq!(snap.selected_person.unwrap().person_id, 2);
        assert!(snap.selected_site.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn map_pick_closes_an_open_overlay() {
        let ctl = controller();
        ctl.select_person_from_list(person(1, "Nguyễn Bá Thanh"));
        assert!(ctl.snapshot().overlay_open);

        // Picking a pin drops back to the popup stage rather than swapping
        // the open overlay's content.
        ctl.select_site_from_map(Some(site(1, "Cầu Rồng", "Công trình kiến trúc")));
        let snap = ctl.snapshot();
        assert!(!snap.overlay_open);
        assert_eq!(snap.selected_site.unwrap().site_id, 1);
        assert!(snap.selected_person.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn active_category_filter_switches_to_the_search_heading() {
        let ctl = controller();
        assert_eq!(ctl.list_title(), SITES_TITLE);

        ctl.set_category_filter("Bảo tàng");
        assert_eq!(ctl.list_title(), SEARCH_RESULTS_TITLE);

        // The filter only counts while browsing sites.
        ctl.set_view_mode(ViewMode::Persons);
        assert_eq!(ctl.list_title(), PERSONS_TITLE);

        ctl.set_category_filter(ALL_CATEGORIES);
        ctl.set_view_mode(ViewMode::Sites);
        assert_eq!(ctl.list_title(), SITES_TITLE);
    }

    #[tokio::test(start_paused = true)]
    async fn category_filter_invalidates_a_hidden_selection() {
        let ctl = controller();
        ctl.select_site_from_list(site(1, "Cầu Rồng", "Công trình kiến trúc"));
        ctl.set_category_filter("Bảo tàng");

        let snap = ctl.snapshot();
        assert!(snap.selected_site.is_none());
        assert!(!snap.overlay_open);
        assert_eq!(ctl.filtered_items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn search_term_commits_only_after_the_debounce() {
        let ctl = controller();
        ctl.set_search_input("cầu");

        assert_eq!(ctl.list_title(), SEARCH_RESULTS_TITLE);
        assert_eq!(ctl.snapshot().search_term, "");

        settle().await;
        assert_eq!(ctl.snapshot().search_term, "cầu");
        assert_eq!(ctl.filtered_items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_keeps_only_the_last_input() {
        let ctl = controller();
        ctl.set_search_input("c");
        tokio::time::sleep(Duration::from_millis(100)).await;
        ctl.set_search_input("cầu");

        settle().await;
        assert_eq!(ctl.snapshot().search_term, "cầu");
    }

    #[tokio::test(start_paused = true)]
    async fn global_search_caps_and_orders_by_current_kind() {
        let ctl = controller();
        ctl.set_search_input("n");

        let results = ctl.global_search();
        assert!(matches!(results[0], EntityRef::Site(_)));

        ctl.set_view_mode(ViewMode::Persons);
        ctl.set_search_input("n");
        let results = ctl.global_search();
        assert!(matches!(results[0], EntityRef::Person(_)));

        ctl.set_search_input("");
        assert!(ctl.global_search().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn site_types_lists_all_first_then_sorted_distinct() {
        let ctl = controller();
        assert_eq!(
            ctl.site_types(),
            vec!["all", "Bảo tàng", "Công trình kiến trúc"]
        );
    }
}
