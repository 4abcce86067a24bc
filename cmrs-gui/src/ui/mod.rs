pub mod agent_dialog;
pub mod auth_dialog;
pub mod context;
pub mod error;
pub mod header;
pub mod service_row;
pub mod service_settings;
pub mod technology_page;
pub mod tethering;
pub mod vpn_page;

use futures::StreamExt;
use futures::channel::mpsc;
use gtk::prelude::*;
use gtk::{
    Application, ApplicationWindow, Box as GtkBox, Button, Label, Orientation, Separator, Spinner, Stack,
    StackSidebar, StackTransitionType, Switch,
};
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tokio::sync::watch;

use cmrs::constants::timeouts;
use cmrs::{ConnMan, NetworkState, TechnologyType};

use crate::ui::context::AppContext;

/// Themed icon name for a technology.
pub fn technology_icon(kind: &TechnologyType) -> &'static str {
    match kind {
        TechnologyType::Ethernet => "network-wired-symbolic",
        TechnologyType::Wifi => "network-wireless-symbolic",
        TechnologyType::Bluetooth => "bluetooth-symbolic",
        TechnologyType::Cellular => "network-cellular-symbolic",
        TechnologyType::Vpn | TechnologyType::Wireguard => "network-vpn-symbolic",
        _ => "network-workgroup-symbolic",
    }
}

/// Icon and CSS class for a signal level as returned by
/// [`cmrs::Service::signal_level`].
pub fn signal_icon(level: u8) -> (&'static str, &'static str) {
    match level {
        0 => ("network-wireless-signal-weak-symbolic", "signal-weak"),
        1 => ("network-wireless-signal-ok-symbolic", "signal-ok"),
        2 => ("network-wireless-signal-good-symbolic", "signal-good"),
        _ => (
            "network-wireless-signal-excellent-symbolic",
            "signal-excellent",
        ),
    }
}

pub fn build_ui(app: &Application) {
    let win = ApplicationWindow::new(app);
    win.set_title(Some("Network Connections"));
    win.set_default_size(720, 520);

    let status = Label::new(Some("Connecting to ConnMan..."));
    status.add_css_class("status-label");
    let offline_switch = Switch::new();
    let refresh_btn = Button::from_icon_name("view-refresh-symbolic");

    let stack = Stack::new();
    stack.set_transition_type(StackTransitionType::Crossfade);
    stack.set_hexpand(true);
    stack.set_vexpand(true);

    let spinner = Spinner::new();
    spinner.set_halign(gtk::Align::Center);
    spinner.set_valign(gtk::Align::Center);
    spinner.set_property("width-request", 24i32);
    spinner.set_property("height-request", 24i32);
    spinner.start();
    stack.add_named(&spinner, Some("loading"));
    stack.set_visible_child_name("loading");

    let sidebar = StackSidebar::new();
    sidebar.set_stack(&stack);
    sidebar.set_width_request(160);

    let body = GtkBox::new(Orientation::Horizontal, 0);
    body.append(&sidebar);
    body.append(&Separator::new(Orientation::Vertical));
    body.append(&stack);

    let vbox = GtkBox::new(Orientation::Vertical, 0);
    vbox.append(&header::build_header(&status, &offline_switch, &refresh_btn));
    vbox.append(&body);
    win.set_child(Some(&vbox));

    let win_clone = win.clone();
    let status_clone = status.clone();
    glib::MainContext::default().spawn_local(async move {
        let cm = match ConnMan::new().await {
            Ok(cm) => cm,
            Err(err) => {
                status_clone.set_text(&format!("Failed to initialize: {err}"));
                return;
            }
        };

        let (agent_tx, mut agent_rx) = mpsc::unbounded();
        let ctx = Rc::new(AppContext {
            cm,
            state: RefCell::new(NetworkState::new()),
            window: win_clone,
            stack,
            status: status_clone,
            offline_switch,
            syncing: Cell::new(false),
            pages: RefCell::new(BTreeMap::new()),
            vpn_page: RefCell::new(None),
            agent_tx,
            agent_dialogs: RefCell::new(Vec::new()),
            settings_dialog: RefCell::new(None),
            shutdown: RefCell::new(None),
        });

        header::connect_header(&ctx, &refresh_btn);
        connect_close(&ctx);

        ctx.reload().await;

        {
            let ctx = ctx.clone();
            glib::MainContext::default().spawn_local(async move {
                while let Some(request) = agent_rx.next().await {
                    agent_dialog::handle_request(&ctx, request);
                }
                debug!("Agent request channel closed");
            });
        }

        loop {
            let (stop_tx, stop_rx) = watch::channel(());
            *ctx.shutdown.borrow_mut() = Some(stop_tx);

            let ctx_events = ctx.clone();
            let result = ctx
                .cm
                .monitor(stop_rx, move |event| ctx_events.apply_event(event))
                .await;

            match result {
                Ok(()) => {
                    debug!("Monitoring stopped");
                    break;
                }
                Err(e) => warn!("Network monitoring error: {e}, restarting in 5s..."),
            }
            glib::timeout_future(timeouts::monitor_restart()).await;
            ctx.reload().await;
        }
    });

    win.present();
}

/// Unregisters the agents before the window goes away.
fn connect_close(ctx: &Rc<AppContext>) {
    let closing = Rc::new(Cell::new(false));
    let ctx_close = ctx.clone();
    ctx.window.connect_close_request(move |_| {
        if closing.replace(true) {
            return glib::Propagation::Proceed;
        }
        let ctx = ctx_close.clone();
        glib::MainContext::default().spawn_local(async move {
            if let Err(e) = ctx.cm.unregister_agent().await {
                debug!("Agent unregistration: {e}");
            }
            let vpn = ctx.state.borrow().vpn_available();
            if vpn && let Err(e) = ctx.cm.unregister_vpn_agent().await {
                debug!("VPN agent unregistration: {e}");
            }
            if let Some(stop) = ctx.shutdown.borrow_mut().take() {
                let _ = stop.send(());
            }
            ctx.window.close();
        });
        glib::Propagation::Stop
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_icon_per_level() {
        assert_eq!(signal_icon(0).1, "signal-weak");
        assert_eq!(signal_icon(1).1, "signal-ok");
        assert_eq!(signal_icon(2).1, "signal-good");
        assert_eq!(signal_icon(3).1, "signal-excellent");
        assert_eq!(signal_icon(9).1, "signal-excellent");
    }

    #[test]
    fn technology_icons() {
        assert_eq!(
            technology_icon(&TechnologyType::Wifi),
            "network-wireless-symbolic"
        );
        assert_eq!(
            technology_icon(&TechnologyType::Other("usb".into())),
            "network-workgroup-symbolic"
        );
    }
}
