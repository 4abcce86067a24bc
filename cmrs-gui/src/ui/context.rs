use futures::channel::mpsc::UnboundedSender;
use gtk::prelude::*;
use gtk::{ApplicationWindow, Label, ListBox, Stack, Switch};
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tokio::sync::watch;

use cmrs::{
    AgentRequest, ConnMan, ConnectionError, NetworkEvent, NetworkState, RequestSource,
    StateChange, TechnologyType,
};

use crate::ui::error::show_error;
use crate::ui::technology_page::TechnologyPage;
use crate::ui::vpn_page::VpnPage;

/// Everything the window's widgets share.
///
/// Lives on the GTK thread only and is passed around as `Rc<AppContext>`.
pub struct AppContext {
    pub cm: ConnMan,
    pub state: RefCell<NetworkState>,
    pub window: ApplicationWindow,
    pub stack: Stack,
    pub status: Label,
    pub offline_switch: Switch,
    /// Set while a switch is changed from daemon state, so its handler
    /// does not echo the change back.
    pub syncing: Cell<bool>,
    pub pages: RefCell<BTreeMap<String, Rc<TechnologyPage>>>,
    pub vpn_page: RefCell<Option<Rc<VpnPage>>>,
    pub agent_tx: UnboundedSender<AgentRequest>,
    /// Open agent prompts, closed when the daemon cancels them.
    pub agent_dialogs: RefCell<Vec<(RequestSource, gtk::Dialog)>>,
    /// The open service settings dialog and its service path.
    pub settings_dialog: RefCell<Option<(String, gtk::Dialog)>>,
    pub shutdown: RefCell<Option<watch::Sender<()>>>,
}

impl AppContext {
    /// Runs `f` with switch handlers muted.
    pub fn quietly(&self, f: impl FnOnce()) {
        let was = self.syncing.replace(true);
        f();
        self.syncing.set(was);
    }

    /// Logs and shows a failed call unless it is a cancellation.
    pub fn report(&self, summary: &str, err: &ConnectionError) {
        show_error(&self.window, summary, err);
    }

    /// Reloads everything from the daemons and rebuilds the pages.
    pub async fn reload(self: &Rc<Self>) {
        match self.cm.load_state().await {
            Ok(state) => {
                let vpn = state.vpn_available();
                *self.state.borrow_mut() = state;
                self.register_agents(vpn).await;
                self.rebuild_pages();
                self.update_header();
            }
            Err(ConnectionError::DaemonUnavailable(name)) => {
                warn!("{name} is not running");
                *self.state.borrow_mut() = NetworkState::new();
                self.rebuild_pages();
                self.status.set_text("ConnMan is not running");
                self.stack.set_visible_child_name("loading");
            }
            Err(e) => {
                self.status.set_text("Failed to load network state");
                self.report("Could not read network state", &e);
            }
        }
    }

    async fn register_agents(&self, vpn: bool) {
        if let Err(e) = self.cm.register_agent(self.agent_tx.clone()).await {
            debug!("Agent registration: {e}");
        }
        if vpn && let Err(e) = self.cm.register_vpn_agent(self.agent_tx.clone()).await {
            debug!("VPN agent registration: {e}");
        }
    }

    /// Applies a daemon notification and refreshes what it touched.
    pub fn apply_event(self: &Rc<Self>, event: NetworkEvent) {
        let changes = self.state.borrow_mut().apply(event);
        for change in changes {
            self.handle_change(change);
        }
    }

    fn handle_change(self: &Rc<Self>, change: StateChange) {
        match change {
            StateChange::Manager { .. } => self.update_header(),
            StateChange::TechnologyAdded { .. } | StateChange::TechnologyRemoved { .. } => {
                self.rebuild_pages()
            }
            StateChange::Technology { path, .. } => self.refresh_technology(&path),
            StateChange::ServiceAdded { path }
            | StateChange::ServiceRemoved { path }
            | StateChange::Service { path, .. } => {
                self.refresh_service(&path);
            }
            StateChange::ServicesReordered => self.refresh_all_services(),
            StateChange::VpnAdded { .. }
            | StateChange::VpnRemoved { .. }
            | StateChange::Vpn { .. } => self.refresh_vpn(),
            StateChange::SelectionCleared => {
                let open = self.settings_dialog.borrow_mut().take();
                if let Some((path, dialog)) = open {
                    debug!("Closing settings of vanished service {path}");
                    dialog.close();
                }
            }
            StateChange::Reset => {
                let ctx = self.clone();
                glib::MainContext::default().spawn_local(async move {
                    ctx.reload().await;
                });
            }
        }
    }

    /// Shows the stored state of a technology again, e.g. after a failed toggle.
    pub fn refresh_technology(&self, path: &str) {
        let page = self.pages.borrow().get(path).cloned();
        let tech = self.state.borrow().technology(path).cloned();
        if let (Some(page), Some(tech)) = (page, tech) {
            page.update(self, &tech);
        }
    }

    pub fn page_for_list(&self, list: &ListBox) -> Option<Rc<TechnologyPage>> {
        self.pages
            .borrow()
            .values()
            .find(|p| p.list() == list)
            .cloned()
    }

    fn page_for_kind(&self, kind: &TechnologyType) -> Option<Rc<TechnologyPage>> {
        let path = self.state.borrow().technology_of(kind).map(|t| t.path.clone())?;
        self.pages.borrow().get(&path).cloned()
    }

    /// Redraws the list that shows `path`, or every list if the service
    /// is already gone.
    fn refresh_service(self: &Rc<Self>, path: &str) {
        let kind = self.state.borrow().service(path).map(|s| s.kind());
        match kind {
            Some(TechnologyType::Vpn) => self.refresh_vpn(),
            Some(kind) => {
                if let Some(page) = self.page_for_kind(&kind) {
                    page.set_services(self);
                }
            }
            None => self.refresh_all_services(),
        }
    }

    fn refresh_all_services(self: &Rc<Self>) {
        let pages: Vec<_> = self.pages.borrow().values().cloned().collect();
        for page in pages {
            page.set_services(self);
        }
    }

    fn refresh_vpn(self: &Rc<Self>) {
        let page = self.vpn_page.borrow().clone();
        if let Some(page) = page {
            page.refresh(self);
        }
    }

    /// Makes the stack match the technologies the daemon reports.
    pub fn rebuild_pages(self: &Rc<Self>) {
        let technologies: Vec<_> = self
            .state
            .borrow()
            .technologies()
            .into_iter()
            .cloned()
            .collect();

        let stale: Vec<String> = self
            .pages
            .borrow()
            .keys()
            .filter(|p| !technologies.iter().any(|t| &t.path == *p))
            .cloned()
            .collect();
        for path in stale {
            if let Some(page) = self.pages.borrow_mut().remove(&path) {
                self.stack.remove(page.widget());
            }
        }

        for tech in &technologies {
            let existing = self.pages.borrow().get(&tech.path).cloned();
            let page = match existing {
                Some(page) => page,
                None => {
                    let page = Rc::new(TechnologyPage::new(self, tech));
                    self.stack
                        .add_titled(page.widget(), Some(&tech.path), &tech.kind().to_string());
                    self.pages
                        .borrow_mut()
                        .insert(tech.path.clone(), page.clone());
                    page
                }
            };
            page.update(self, tech);
            page.set_services(self);
        }

        self.sync_vpn_page();

        let on_loading = self.stack.visible_child_name().as_deref() == Some("loading");
        if on_loading && let Some(first) = technologies.first() {
            self.stack.set_visible_child_name(&first.path);
        }
    }

    fn sync_vpn_page(self: &Rc<Self>) {
        let available = self.state.borrow().vpn_available();
        let existing = self.vpn_page.borrow().clone();
        match (available, existing) {
            (true, Some(page)) => page.refresh(self),
            (true, None) => {
                let page = Rc::new(VpnPage::new(self));
                self.stack.add_titled(page.widget(), Some("vpn"), "VPN");
                page.refresh(self);
                *self.vpn_page.borrow_mut() = Some(page);
            }
            (false, Some(page)) => {
                self.stack.remove(page.widget());
                *self.vpn_page.borrow_mut() = None;
            }
            (false, None) => {}
        }
    }

    pub fn update_header(&self) {
        let (global, offline) = {
            let state = self.state.borrow();
            (state.global_state(), state.offline_mode())
        };
        self.status.set_text(&global.to_string());
        self.quietly(|| self.offline_switch.set_active(offline));
    }

    /// Closes prompts of `source` after the daemon cancelled them.
    pub fn close_agent_dialogs(&self, source: RequestSource) {
        let dialogs: Vec<gtk::Dialog> = {
            let mut open = self.agent_dialogs.borrow_mut();
            let (matching, rest): (Vec<_>, Vec<_>) =
                open.drain(..).partition(|(s, _)| *s == source);
            *open = rest;
            matching.into_iter().map(|(_, d)| d).collect()
        };
        for dialog in dialogs {
            dialog.close();
        }
    }

    pub fn forget_agent_dialog(&self, dialog: &gtk::Dialog) {
        self.agent_dialogs.borrow_mut().retain(|(_, d)| d != dialog);
    }
}
