use glib::clone;
use gtk::prelude::*;
use gtk::{Box as GtkBox, Button, GestureClick, Image, Label, ListBoxRow, Orientation};
use log::debug;
use std::rc::Rc;

use cmrs::Service;

use crate::ui::context::AppContext;
use crate::ui::{service_settings, signal_icon};

const SIGNAL_CLASSES: [&str; 4] = ["signal-weak", "signal-ok", "signal-good", "signal-excellent"];

/// One line in a technology's service list.
pub struct ServiceRow {
    pub path: String,
    row: ListBoxRow,
    name: Label,
    state: Label,
    signal: Image,
    security: Image,
    action: Button,
}

impl ServiceRow {
    pub fn new(ctx: &Rc<AppContext>, service: &Service) -> Self {
        let row = ListBoxRow::new();
        row.add_css_class("service-row");

        let hbox = GtkBox::new(Orientation::Horizontal, 8);

        let signal = Image::new();
        let name = Label::new(None);
        name.set_xalign(0.0);
        name.add_css_class("service-name");

        let security = Image::from_icon_name("changes-prevent-symbolic");
        security.set_tooltip_text(Some("Secured"));

        let state = Label::new(None);
        state.set_hexpand(true);
        state.set_xalign(1.0);
        state.add_css_class("service-state");

        let action = Button::with_label("Connect");
        action.set_valign(gtk::Align::Center);

        let settings_btn = Button::from_icon_name("emblem-system-symbolic");
        settings_btn.set_valign(gtk::Align::Center);
        settings_btn.set_tooltip_text(Some("Settings"));

        hbox.append(&signal);
        hbox.append(&name);
        hbox.append(&security);
        hbox.append(&state);
        hbox.append(&action);
        hbox.append(&settings_btn);
        row.set_child(Some(&hbox));

        let path = service.path.clone();

        action.connect_clicked(clone!(
            #[strong]
            ctx,
            #[strong]
            path,
            move |_| toggle_connection(&ctx, &path)
        ));

        settings_btn.connect_clicked(clone!(
            #[strong]
            ctx,
            #[strong]
            path,
            move |_| service_settings::show(&ctx, &path)
        ));

        let gesture = GestureClick::new();
        gesture.connect_pressed(clone!(
            #[strong]
            ctx,
            #[strong]
            path,
            move |_, n_press, _, _| {
                if n_press == 2 {
                    connect(&ctx, &path);
                }
            }
        ));
        row.add_controller(gesture);

        let this = Self {
            path,
            row,
            name,
            state,
            signal,
            security,
            action,
        };
        this.update(service);
        this
    }

    pub fn widget(&self) -> &ListBoxRow {
        &self.row
    }

    pub fn update(&self, service: &Service) {
        let state = service.state();

        self.name.set_text(service.name());
        match service.error().filter(|e| !e.is_empty() && state.is_failed()) {
            Some(err) => self.state.set_text(&format!("{state}: {err}")),
            None => self.state.set_text(&state.to_string()),
        }

        for class in SIGNAL_CLASSES {
            self.signal.remove_css_class(class);
        }
        match service.signal_level() {
            Some(level) => {
                let (icon, class) = signal_icon(level);
                self.signal.set_icon_name(Some(icon));
                self.signal.add_css_class(class);
                if let Some(strength) = service.strength() {
                    self.signal
                        .set_tooltip_text(Some(&format!("Signal {strength}%")));
                }
                self.signal.set_visible(true);
            }
            None => self.signal.set_visible(false),
        }

        self.security.set_visible(service.is_secured());

        self.action.set_label(if state.can_disconnect() {
            "Disconnect"
        } else {
            "Connect"
        });

        if state.is_connected() {
            self.row.add_css_class("connected");
        } else {
            self.row.remove_css_class("connected");
        }
        if state.is_failed() {
            self.row.add_css_class("failed");
        } else {
            self.row.remove_css_class("failed");
        }
    }
}

fn toggle_connection(ctx: &Rc<AppContext>, path: &str) {
    let connected = ctx
        .state
        .borrow()
        .service(path)
        .is_some_and(|s| s.state().can_disconnect());
    if connected {
        disconnect(ctx, path);
    } else {
        connect(ctx, path);
    }
}

/// Connects in the background; credentials arrive through the agent.
pub fn connect(ctx: &Rc<AppContext>, path: &str) {
    let ctx = ctx.clone();
    let path = path.to_string();
    glib::MainContext::default().spawn_local(async move {
        debug!("Connecting {path}");
        if let Err(e) = ctx.cm.connect_service(&path).await {
            let name = service_name(&ctx, &path);
            ctx.report(&format!("Could not connect to {name}"), &e);
        }
    });
}

pub fn disconnect(ctx: &Rc<AppContext>, path: &str) {
    let ctx = ctx.clone();
    let path = path.to_string();
    glib::MainContext::default().spawn_local(async move {
        debug!("Disconnecting {path}");
        if let Err(e) = ctx.cm.disconnect_service(&path).await {
            let name = service_name(&ctx, &path);
            ctx.report(&format!("Could not disconnect from {name}"), &e);
        }
    });
}

fn service_name(ctx: &AppContext, path: &str) -> String {
    ctx.state
        .borrow()
        .service(path)
        .map(|s| s.name().to_string())
        .unwrap_or_else(|| path.to_string())
}
