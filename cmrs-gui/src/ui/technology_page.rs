use glib::clone;
use gtk::prelude::*;
use gtk::{
    Box as GtkBox, Button, Image, Label, ListBox, Orientation, PolicyType, ScrolledWindow,
    SelectionMode, Switch,
};
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

use cmrs::{Technology, TechnologyType};

use crate::ui::context::AppContext;
use crate::ui::service_row::ServiceRow;
use crate::ui::{technology_icon, tethering};

/// Stack page of one technology: power, scanning, tethering and its services.
pub struct TechnologyPage {
    root: GtkBox,
    status: Label,
    power: Switch,
    scan_btn: Option<Button>,
    tether: Option<(Switch, Button)>,
    list: ListBox,
    rows: RefCell<Vec<ServiceRow>>,
    kind: TechnologyType,
}

impl TechnologyPage {
    pub fn new(ctx: &Rc<AppContext>, tech: &Technology) -> Self {
        let kind = tech.kind();
        let path = tech.path.clone();

        let root = GtkBox::new(Orientation::Vertical, 12);
        root.add_css_class("technology-page");

        let top = GtkBox::new(Orientation::Horizontal, 12);
        let icon = Image::from_icon_name(technology_icon(&kind));
        icon.set_pixel_size(32);

        let titles = GtkBox::new(Orientation::Vertical, 2);
        titles.set_hexpand(true);
        let title = Label::new(Some(&kind.to_string()));
        title.set_xalign(0.0);
        title.add_css_class("technology-title");
        let status = Label::new(None);
        status.set_xalign(0.0);
        status.add_css_class("technology-status");
        titles.append(&title);
        titles.append(&status);

        let power = Switch::new();
        power.set_valign(gtk::Align::Center);
        power.set_tooltip_text(Some("Enabled"));

        top.append(&icon);
        top.append(&titles);

        let scan_btn = kind.supports_scanning().then(|| {
            let btn = Button::from_icon_name("view-refresh-symbolic");
            btn.set_valign(gtk::Align::Center);
            btn.set_tooltip_text(Some("Scan"));
            top.append(&btn);
            btn
        });
        top.append(&power);
        root.append(&top);

        let tether = kind.supports_tethering().then(|| {
            let row = GtkBox::new(Orientation::Horizontal, 8);
            let label = Label::new(Some("Share this connection"));
            label.set_xalign(0.0);
            label.set_hexpand(true);
            let sw = Switch::new();
            sw.set_valign(gtk::Align::Center);
            let settings = Button::from_icon_name("emblem-system-symbolic");
            settings.set_tooltip_text(Some("Hotspot settings"));
            settings.set_visible(kind.needs_tethering_credentials());
            row.append(&label);
            row.append(&settings);
            row.append(&sw);
            root.append(&row);
            (sw, settings)
        });

        let list = ListBox::new();
        list.set_selection_mode(SelectionMode::Single);
        let placeholder = Label::new(Some("No networks"));
        placeholder.add_css_class("status-label");
        list.set_placeholder(Some(&placeholder));

        let scroller = ScrolledWindow::new();
        scroller.set_vexpand(true);
        scroller.set_policy(PolicyType::Never, PolicyType::Automatic);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        power.connect_active_notify(clone!(
            #[strong]
            ctx,
            #[strong]
            path,
            #[strong]
            kind,
            move |sw| {
                if ctx.syncing.get() {
                    return;
                }
                set_powered(&ctx, &path, &kind, sw.is_active());
            }
        ));

        if let Some(btn) = &scan_btn {
            btn.connect_clicked(clone!(
                #[strong]
                ctx,
                #[strong]
                path,
                move |btn| {
                    btn.set_sensitive(false);
                    let ctx = ctx.clone();
                    let path = path.clone();
                    let btn = btn.clone();
                    glib::MainContext::default().spawn_local(async move {
                        debug!("Scanning on {path}");
                        if let Err(e) = ctx.cm.scan(&path).await {
                            ctx.report("Scan failed", &e);
                        }
                        btn.set_sensitive(true);
                    });
                }
            ));
        }

        if let Some((sw, settings)) = &tether {
            sw.connect_active_notify(clone!(
                #[strong]
                ctx,
                #[strong]
                path,
                move |sw| {
                    if ctx.syncing.get() {
                        return;
                    }
                    set_tethering(&ctx, &path, sw.is_active());
                }
            ));
            settings.connect_clicked(clone!(
                #[strong]
                ctx,
                #[strong]
                path,
                move |_| tethering::show(&ctx, &path, false)
            ));
        }

        list.connect_row_selected(clone!(
            #[strong]
            ctx,
            move |list, row| {
                let Some(row) = row else {
                    return;
                };
                let Some(page) = ctx.page_for_list(list) else {
                    return;
                };
                let path = page
                    .rows
                    .borrow()
                    .get(row.index() as usize)
                    .map(|r| r.path.clone());
                if let Some(path) = path {
                    ctx.state.borrow_mut().select(&path);
                }
            }
        ));

        Self {
            root,
            status,
            power,
            scan_btn,
            tether,
            list,
            rows: RefCell::new(Vec::new()),
            kind,
        }
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    pub fn list(&self) -> &ListBox {
        &self.list
    }

    /// Shows the technology's current properties.
    pub fn update(&self, ctx: &AppContext, tech: &Technology) {
        let powered = tech.powered();
        self.status.set_text(tech.status_text());
        ctx.quietly(|| {
            self.power.set_active(powered);
            if let Some((sw, _)) = &self.tether {
                sw.set_active(tech.tethering());
            }
        });
        if let Some(btn) = &self.scan_btn {
            btn.set_sensitive(powered);
        }
        if let Some((sw, settings)) = &self.tether {
            sw.set_sensitive(powered);
            settings.set_sensitive(powered);
        }
        self.list.set_sensitive(powered);
    }

    /// Redraws the service list in daemon order.
    ///
    /// Rows are updated in place when the set and order of services is
    /// unchanged, so selection and focus survive property updates.
    pub fn set_services(&self, ctx: &Rc<AppContext>) {
        let services: Vec<_> = ctx
            .state
            .borrow()
            .services_of(&self.kind)
            .into_iter()
            .cloned()
            .collect();

        let same_order = {
            let rows = self.rows.borrow();
            rows.len() == services.len()
                && rows.iter().zip(&services).all(|(r, s)| r.path == s.path)
        };

        if same_order {
            for (row, service) in self.rows.borrow().iter().zip(&services) {
                row.update(service);
            }
            return;
        }

        let selected = ctx.state.borrow().selected().map(|s| s.path.clone());

        let old: Vec<ServiceRow> = self.rows.borrow_mut().drain(..).collect();
        for row in &old {
            self.list.remove(row.widget());
        }

        let rows: Vec<ServiceRow> = services.iter().map(|s| ServiceRow::new(ctx, s)).collect();
        for row in &rows {
            self.list.append(row.widget());
        }
        let reselect = rows
            .iter()
            .find(|r| Some(&r.path) == selected.as_ref())
            .map(|r| r.widget().clone());
        *self.rows.borrow_mut() = rows;

        if let Some(row) = reselect {
            self.list.select_row(Some(&row));
        }
    }
}

fn set_powered(ctx: &Rc<AppContext>, path: &str, kind: &TechnologyType, enabled: bool) {
    let ctx = ctx.clone();
    let path = path.to_string();
    let scan = enabled && kind.supports_scanning();
    glib::MainContext::default().spawn_local(async move {
        debug!("Setting {path} powered to {enabled}");
        let result = if scan {
            ctx.cm.power_on_and_scan(&path).await
        } else {
            ctx.cm.set_powered(&path, enabled).await
        };
        if let Err(e) = result {
            ctx.refresh_technology(&path);
            let verb = if enabled { "enable" } else { "disable" };
            ctx.report(&format!("Could not {verb} the device"), &e);
        }
    });
}

fn set_tethering(ctx: &Rc<AppContext>, path: &str, enabled: bool) {
    let needs_setup = enabled
        && ctx.state.borrow().technology(path).is_some_and(|t| {
            t.kind().needs_tethering_credentials()
                && (t.tethering_identifier().is_none() || t.tethering_passphrase().is_none())
        });
    if needs_setup {
        // Nothing to share yet; the switch follows the daemon once it is set up.
        ctx.refresh_technology(path);
        tethering::show(ctx, path, true);
        return;
    }

    let ctx = ctx.clone();
    let path = path.to_string();
    glib::MainContext::default().spawn_local(async move {
        debug!("Setting tethering on {path} to {enabled}");
        if let Err(e) = ctx.cm.set_tethering(&path, enabled).await {
            ctx.refresh_technology(&path);
            ctx.report("Could not change connection sharing", &e);
        }
    });
}
