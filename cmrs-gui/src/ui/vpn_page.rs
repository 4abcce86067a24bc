use glib::clone;
use gtk::prelude::*;
use gtk::{
    Box as GtkBox, Button, Dialog, DropDown, Entry, Grid, Image, Label, ListBox, ListBoxRow,
    Orientation, PolicyType, ResponseType, ScrolledWindow, SelectionMode,
};
use log::debug;
use std::rc::Rc;

use cmrs::constants::openconnect;
use cmrs::{ConnectionError, TechnologyType, VpnConfig, VpnConnection};

use crate::ui::context::AppContext;
use crate::ui::technology_icon;

const PROVIDER_TYPES: &[&str] = &["openconnect", "openvpn", "vpnc", "l2tp", "pptp", "wireguard"];

/// Stack page listing the VPN daemon's connections.
pub struct VpnPage {
    root: GtkBox,
    list: ListBox,
}

impl VpnPage {
    pub fn new(ctx: &Rc<AppContext>) -> Self {
        let root = GtkBox::new(Orientation::Vertical, 12);
        root.add_css_class("technology-page");

        let top = GtkBox::new(Orientation::Horizontal, 12);
        let icon = Image::from_icon_name(technology_icon(&TechnologyType::Vpn));
        icon.set_pixel_size(32);
        let title = Label::new(Some("VPN"));
        title.set_xalign(0.0);
        title.set_hexpand(true);
        title.add_css_class("technology-title");
        let add_btn = Button::from_icon_name("list-add-symbolic");
        add_btn.set_valign(gtk::Align::Center);
        add_btn.set_tooltip_text(Some("Add VPN"));
        top.append(&icon);
        top.append(&title);
        top.append(&add_btn);
        root.append(&top);

        let list = ListBox::new();
        list.set_selection_mode(SelectionMode::None);
        let placeholder = Label::new(Some("No VPN connections"));
        placeholder.add_css_class("status-label");
        list.set_placeholder(Some(&placeholder));

        let scroller = ScrolledWindow::new();
        scroller.set_vexpand(true);
        scroller.set_policy(PolicyType::Never, PolicyType::Automatic);
        scroller.set_child(Some(&list));
        root.append(&scroller);

        add_btn.connect_clicked(clone!(
            #[strong]
            ctx,
            move |_| show_create_dialog(&ctx)
        ));

        Self { root, list }
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    /// Rebuilds the rows; the list is short enough to redraw on every change.
    pub fn refresh(&self, ctx: &Rc<AppContext>) {
        while let Some(child) = self.list.first_child() {
            self.list.remove(&child);
        }
        let connections: Vec<VpnConnection> = ctx
            .state
            .borrow()
            .vpn_connections()
            .into_iter()
            .cloned()
            .collect();
        for vpn in &connections {
            self.list.append(&build_row(ctx, vpn));
        }
    }
}

fn build_row(ctx: &Rc<AppContext>, vpn: &VpnConnection) -> ListBoxRow {
    let row = ListBoxRow::new();
    row.add_css_class("vpn-row");
    let state = vpn.state();
    if state.is_connected() {
        row.add_css_class("connected");
    }

    let hbox = GtkBox::new(Orientation::Horizontal, 8);

    let labels = GtkBox::new(Orientation::Vertical, 2);
    labels.set_hexpand(true);
    let name = Label::new(Some(vpn.name()));
    name.set_xalign(0.0);
    name.add_css_class("service-name");
    let detail = match vpn.host() {
        Some(host) => format!("{} · {host}", vpn.provider_type()),
        None => vpn.provider_type().to_string(),
    };
    let detail = Label::new(Some(&detail));
    detail.set_xalign(0.0);
    detail.add_css_class("service-state");
    labels.append(&name);
    labels.append(&detail);

    let state_label = Label::new(Some(&state.to_string()));
    state_label.add_css_class("service-state");

    let active = state.is_connected() || state.is_busy();
    let action = Button::with_label(if active { "Disconnect" } else { "Connect" });
    action.set_valign(gtk::Align::Center);

    hbox.append(&labels);
    hbox.append(&state_label);
    hbox.append(&action);

    let path = vpn.path.clone();
    action.connect_clicked(clone!(
        #[strong]
        ctx,
        #[strong]
        path,
        move |_| {
            let ctx = ctx.clone();
            let path = path.clone();
            glib::MainContext::default().spawn_local(async move {
                let result = if active {
                    debug!("Disconnecting VPN {path}");
                    ctx.cm.disconnect_vpn(&path).await
                } else {
                    debug!("Connecting VPN {path}");
                    ctx.cm.connect_vpn(&path).await
                };
                if let Err(e) = result {
                    ctx.report("VPN request failed", &e);
                }
            });
        }
    ));

    if !vpn.immutable() {
        let remove = Button::from_icon_name("user-trash-symbolic");
        remove.set_valign(gtk::Align::Center);
        remove.set_tooltip_text(Some("Remove"));
        remove.connect_clicked(clone!(
            #[strong]
            ctx,
            #[strong]
            path,
            move |_| {
                let ctx = ctx.clone();
                let path = path.clone();
                glib::MainContext::default().spawn_local(async move {
                    debug!("Removing VPN {path}");
                    if let Err(e) = ctx.cm.remove_vpn(&path).await {
                        ctx.report("Could not remove the VPN", &e);
                    }
                });
            }
        ));
        hbox.append(&remove);
    }

    row.set_child(Some(&hbox));
    row
}

fn show_create_dialog(ctx: &Rc<AppContext>) {
    let dialog = Dialog::new();
    dialog.set_title(Some("Add VPN"));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button("Add", ResponseType::Apply);
    dialog.set_default_response(ResponseType::Apply);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    let grid = Grid::new();
    grid.set_row_spacing(6);
    grid.set_column_spacing(12);

    let kind = DropDown::from_strings(PROVIDER_TYPES);
    let name = Entry::new();
    let host = Entry::new();
    host.set_placeholder_text(Some("vpn.example.com"));
    let domain = Entry::new();
    domain.set_placeholder_text(Some("example.com"));
    let usergroup = Entry::new();
    usergroup.set_placeholder_text(Some("optional"));
    usergroup.set_activates_default(true);

    for (row, (label, widget)) in [
        ("Type", kind.clone().upcast::<gtk::Widget>()),
        ("Name", name.clone().upcast()),
        ("Gateway", host.clone().upcast()),
        ("Domain", domain.clone().upcast()),
        ("User group", usergroup.clone().upcast()),
    ]
    .into_iter()
    .enumerate()
    {
        let l = Label::new(Some(label));
        l.set_xalign(0.0);
        widget.set_hexpand(true);
        grid.attach(&l, 0, row as i32, 1, 1);
        grid.attach(&widget, 1, row as i32, 1, 1);
    }

    let error_label = Label::new(None);
    error_label.add_css_class("dialog-error");
    error_label.set_wrap(true);
    error_label.set_visible(false);

    vbox.append(&grid);
    vbox.append(&error_label);
    dialog.content_area().append(&vbox);

    // The user group only means something to OpenConnect.
    kind.connect_selected_notify(clone!(
        #[weak]
        usergroup,
        move |dd| usergroup.set_sensitive(dd.selected() == 0)
    ));

    dialog.connect_response(clone!(
        #[strong]
        ctx,
        move |dialog, response| {
            if response != ResponseType::Apply {
                dialog.close();
                return;
            }

            let provider = PROVIDER_TYPES
                .get(kind.selected() as usize)
                .copied()
                .unwrap_or("openconnect");
            let mut config = VpnConfig::new(
                provider,
                name.text().trim(),
                host.text().trim(),
                domain.text().trim(),
            );
            let group = usergroup.text().trim().to_string();
            if provider == "openconnect" && !group.is_empty() {
                config = config.with_option(openconnect::USERGROUP, &group);
            }

            dialog.set_sensitive(false);
            let ctx = ctx.clone();
            let dialog = dialog.clone();
            let error_label = error_label.clone();
            glib::MainContext::default().spawn_local(async move {
                match ctx.cm.create_vpn(&config).await {
                    Ok(path) => {
                        debug!("Created VPN {path}");
                        dialog.close();
                    }
                    Err(ConnectionError::InvalidInput(msg)) => {
                        error_label.set_text(&msg);
                        error_label.set_visible(true);
                        dialog.set_sensitive(true);
                    }
                    Err(e) => {
                        dialog.close();
                        ctx.report("Could not add the VPN", &e);
                    }
                }
            });
        }
    ));

    dialog.present();
}
