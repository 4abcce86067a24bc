use glib::clone;
use gtk::prelude::*;
use gtk::{Box as GtkBox, Button, HeaderBar, Label, Orientation, Switch};
use log::debug;
use std::rc::Rc;

use crate::ui::context::AppContext;

pub fn build_header(status: &Label, offline_switch: &Switch, refresh_btn: &Button) -> HeaderBar {
    let header = HeaderBar::new();

    let offline_box = GtkBox::new(Orientation::Horizontal, 6);
    let offline_label = Label::new(Some("Airplane mode"));
    offline_label.add_css_class("offline-label");
    offline_switch.set_valign(gtk::Align::Center);
    offline_switch.set_tooltip_text(Some("Turn off all radios"));
    offline_box.append(&offline_label);
    offline_box.append(offline_switch);
    header.pack_start(&offline_box);

    header.set_title_widget(Some(status));

    refresh_btn.set_tooltip_text(Some("Reload"));
    header.pack_end(refresh_btn);

    header
}

/// Wires the header controls once the daemon connection exists.
pub fn connect_header(ctx: &Rc<AppContext>, refresh_btn: &Button) {
    ctx.offline_switch.connect_active_notify(clone!(
        #[strong]
        ctx,
        move |sw| {
            if ctx.syncing.get() {
                return;
            }
            let enabled = sw.is_active();
            let ctx = ctx.clone();
            glib::MainContext::default().spawn_local(async move {
                debug!("Setting offline mode to {enabled}");
                if let Err(e) = ctx.cm.set_offline_mode(enabled).await {
                    // The daemon keeps its value; show it again.
                    ctx.update_header();
                    ctx.report("Could not change airplane mode", &e);
                }
            });
        }
    ));

    refresh_btn.connect_clicked(clone!(
        #[strong]
        ctx,
        move |_| {
            let ctx = ctx.clone();
            glib::MainContext::default().spawn_local(async move {
                ctx.reload().await;
            });
        }
    ));
}
