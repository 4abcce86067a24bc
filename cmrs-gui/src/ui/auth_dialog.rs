use futures::StreamExt;
use futures::channel::oneshot;
use gtk::prelude::*;
use gtk::{
    Box as GtkBox, Dialog, DropDown, Entry, Grid, Label, Orientation, ResponseType, Spinner,
};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use cmrs::agent::InputField;
use cmrs::auth::{
    AuthBridge, AuthForm, BridgeEvent, FormFieldKind, FormResponse, OpenConnectCli,
    PeerCertificate, ProgressLevel,
};
use cmrs::constants::openconnect;
use cmrs::{RequestSource, Responder};

use crate::ui::context::AppContext;
use crate::ui::error::show_message;

/// Gateway and user group for an OpenConnect login.
///
/// Values sent along with the request win over the stored connection.
fn login_target(
    ctx: &AppContext,
    path: &str,
    fields: &[InputField],
) -> (Option<String>, Option<String>) {
    let field_value = |name: &str| {
        fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.clone())
            .filter(|v| !v.is_empty())
    };
    let state = ctx.state.borrow();
    let vpn = state.vpn_connection(path);

    let host = field_value(openconnect::VPN_HOST)
        .or_else(|| vpn.and_then(|v| v.host()).map(str::to_string));
    let usergroup = field_value(openconnect::USERGROUP).or_else(|| {
        vpn.and_then(|v| v.properties.str(openconnect::USERGROUP))
            .map(str::to_string)
    });
    (host, usergroup)
}

/// Runs an OpenConnect login and answers the VPN agent with its cookie.
pub fn start(
    ctx: &Rc<AppContext>,
    path: &str,
    fields: &[InputField],
    responder: Responder<HashMap<String, String>>,
) {
    let (host, usergroup) = login_target(ctx, path, fields);
    let Some(host) = host else {
        warn!("No gateway known for {path}");
        show_message(&ctx.window, "The VPN has no gateway configured", path);
        return;
    };

    let mut backend = OpenConnectCli::new();
    if let Some(group) = &usergroup {
        backend = backend.with_usergroup(group);
    }

    let (session, mut events) = match AuthBridge::start(backend, &host) {
        Ok(started) => started,
        Err(e) => {
            ctx.report("Could not start the VPN login", &e);
            return;
        }
    };
    info!("Logging in to {host}");

    let progress = ProgressDialog::new(ctx, &host);
    let responder = RefCell::new(Some(responder));
    let ctx = ctx.clone();

    glib::MainContext::default().spawn_local(async move {
        while let Some(event) = events.next().await {
            match event {
                BridgeEvent::Progress {
                    level,
                    message,
                    reply,
                } => {
                    progress.show_progress(level, &message);
                    reply.send(());
                }
                BridgeEvent::ValidateCert { cert, reply } => {
                    let accepted = !progress.cancelled() && ask_certificate(&ctx, &cert).await;
                    reply.send(accepted);
                }
                BridgeEvent::AuthForm { form, reply } => {
                    let response = if progress.cancelled() {
                        FormResponse::Cancel
                    } else {
                        ask_form(&ctx, &form).await
                    };
                    reply.send(response);
                }
                BridgeEvent::Finished(result) => {
                    let responder = responder.borrow_mut().take();
                    match (result, responder) {
                        (Ok(cookie), Some(responder)) if !progress.cancelled() => {
                            debug!("Passing the login cookie to connman-vpnd");
                            responder.respond(cookie.agent_answers());
                        }
                        (Ok(_), _) => debug!("Login finished after it was cancelled"),
                        (Err(e), _) => ctx.report("VPN login failed", &e),
                    }
                    break;
                }
            }
        }
        progress.close();
        session.join();
    });
}

struct ProgressDialog {
    dialog: Dialog,
    status: Label,
    cancelled: Rc<Cell<bool>>,
}

impl ProgressDialog {
    fn new(ctx: &Rc<AppContext>, host: &str) -> Self {
        let dialog = Dialog::new();
        dialog.set_title(Some("VPN login"));
        dialog.set_transient_for(Some(&ctx.window));
        dialog.add_button("Cancel", ResponseType::Cancel);

        let vbox = GtkBox::new(Orientation::Horizontal, 12);
        vbox.add_css_class("dialog-body");
        let spinner = Spinner::new();
        spinner.start();
        let status = Label::new(Some(&format!("Contacting {host}...")));
        status.set_wrap(true);
        status.set_xalign(0.0);
        vbox.append(&spinner);
        vbox.append(&status);
        dialog.content_area().append(&vbox);

        let cancelled = Rc::new(Cell::new(false));
        dialog.connect_response(|dialog, _| dialog.close());
        {
            let cancelled = cancelled.clone();
            dialog.connect_close_request(move |_| {
                cancelled.set(true);
                glib::Propagation::Proceed
            });
        }

        // The daemon's Cancel closes this like any other VPN prompt.
        ctx.agent_dialogs
            .borrow_mut()
            .push((RequestSource::Vpn, dialog.clone()));
        {
            let ctx = ctx.clone();
            dialog.connect_close_request(move |dialog| {
                ctx.forget_agent_dialog(dialog);
                glib::Propagation::Proceed
            });
        }

        dialog.present();
        Self {
            dialog,
            status,
            cancelled,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn show_progress(&self, level: ProgressLevel, message: &str) {
        match level {
            ProgressLevel::Debug => debug!("openconnect: {message}"),
            ProgressLevel::Info => self.status.set_text(message),
            ProgressLevel::Error => {
                warn!("openconnect: {message}");
                self.status.set_text(message);
            }
        }
    }

    fn close(&self) {
        // Closing also marks the session cancelled; it is over either way.
        self.dialog.close();
    }
}

async fn ask_certificate(ctx: &AppContext, cert: &PeerCertificate) -> bool {
    let dialog = Dialog::new();
    dialog.set_title(Some("Untrusted certificate"));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button("Connect anyway", ResponseType::Accept);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");
    let text = Label::new(Some(&format!(
        "The certificate of {} could not be verified: {}",
        cert.host, cert.reason
    )));
    text.set_wrap(true);
    text.set_xalign(0.0);
    let fingerprint = Label::new(Some(&cert.fingerprint));
    fingerprint.set_selectable(true);
    fingerprint.set_wrap(true);
    fingerprint.set_xalign(0.0);
    vbox.append(&text);
    vbox.append(&fingerprint);
    dialog.content_area().append(&vbox);

    let (tx, rx) = oneshot::channel();
    let tx = RefCell::new(Some(tx));
    dialog.connect_response(move |dialog, response| {
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(response == ResponseType::Accept);
        }
        dialog.close();
    });
    dialog.present();

    rx.await.unwrap_or(false)
}

async fn ask_form(ctx: &AppContext, form: &AuthForm) -> FormResponse {
    let dialog = Dialog::new();
    let title = if form.title.is_empty() {
        "VPN login"
    } else {
        form.title.as_str()
    };
    dialog.set_title(Some(title));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button("Log in", ResponseType::Ok);
    dialog.set_default_response(ResponseType::Ok);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    if let Some(message) = &form.message {
        let l = Label::new(Some(message));
        l.set_wrap(true);
        l.set_xalign(0.0);
        vbox.append(&l);
    }
    if let Some(error) = &form.error {
        let l = Label::new(Some(error));
        l.set_wrap(true);
        l.set_xalign(0.0);
        l.add_css_class("dialog-error");
        vbox.append(&l);
    }

    let grid = Grid::new();
    grid.set_row_spacing(6);
    grid.set_column_spacing(12);

    let mut inputs: Vec<(String, FormInput)> = Vec::new();
    for (row, field) in form.fields.iter().enumerate() {
        let label = Label::new(Some(&field.label));
        label.set_xalign(0.0);
        grid.attach(&label, 0, row as i32, 1, 1);

        let input = match &field.kind {
            FormFieldKind::Text | FormFieldKind::Password => {
                let entry = Entry::new();
                entry.set_hexpand(true);
                entry.set_activates_default(true);
                entry.set_visibility(field.kind == FormFieldKind::Text);
                if let Some(v) = &field.value {
                    entry.set_text(v);
                }
                grid.attach(&entry, 1, row as i32, 1, 1);
                FormInput::Entry(entry)
            }
            FormFieldKind::Select(options) => {
                let labels: Vec<&str> = options.iter().map(|(_, l)| l.as_str()).collect();
                let dd = DropDown::from_strings(&labels);
                if let Some(idx) = field
                    .value
                    .as_ref()
                    .and_then(|v| options.iter().position(|(value, _)| value == v))
                {
                    dd.set_selected(idx as u32);
                }
                grid.attach(&dd, 1, row as i32, 1, 1);
                let values = options.iter().map(|(v, _)| v.clone()).collect();
                FormInput::Select(dd, values)
            }
        };
        inputs.push((field.name.clone(), input));
    }
    vbox.append(&grid);
    dialog.content_area().append(&vbox);

    let (tx, rx) = oneshot::channel();
    let tx = RefCell::new(Some(tx));
    dialog.connect_response(move |dialog, response| {
        let answer = if response == ResponseType::Ok {
            FormResponse::Submit(
                inputs
                    .iter()
                    .map(|(name, input)| (name.clone(), input.value()))
                    .collect(),
            )
        } else {
            FormResponse::Cancel
        };
        if let Some(tx) = tx.borrow_mut().take() {
            let _ = tx.send(answer);
        }
        dialog.close();
    });
    dialog.present();

    rx.await.unwrap_or(FormResponse::Cancel)
}

enum FormInput {
    Entry(Entry),
    Select(DropDown, Vec<String>),
}

impl FormInput {
    fn value(&self) -> String {
        match self {
            Self::Entry(entry) => entry.text().to_string(),
            Self::Select(dd, values) => values
                .get(dd.selected() as usize)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
