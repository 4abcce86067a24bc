use gtk::prelude::*;
use gtk::{Box as GtkBox, Dialog, Entry, Grid, Label, Orientation, ResponseType};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use cmrs::agent::{FieldType, InputField, Requirement};
use cmrs::{AgentRequest, ErrorAction, RequestSource, Responder};

use crate::ui::auth_dialog;
use crate::ui::context::AppContext;
use crate::ui::error::show_message;

type Pending<T> = Rc<RefCell<Option<Responder<T>>>>;

/// Answers one daemon prompt, usually by opening a dialog.
pub fn handle_request(ctx: &Rc<AppContext>, request: AgentRequest) {
    if request.wants_openconnect_cookie() {
        if let AgentRequest::RequestInput {
            path,
            fields,
            responder,
            ..
        } = request
        {
            auth_dialog::start(ctx, &path, &fields, responder);
        }
        return;
    }

    match request {
        AgentRequest::RequestInput {
            source,
            path,
            fields,
            responder,
        } => show_input(ctx, source, &path, fields, responder),
        AgentRequest::ReportError {
            source,
            path,
            error,
            responder,
        } => show_retry(ctx, source, &path, &error, responder),
        AgentRequest::RequestBrowser {
            path,
            url,
            responder,
        } => open_browser(ctx, &path, &url, responder),
        AgentRequest::Cancel { source } => {
            debug!("Daemon cancelled the {source:?} prompt");
            ctx.close_agent_dialogs(source);
        }
        AgentRequest::Release { source } => {
            info!("{source:?} agent released by the daemon");
            ctx.close_agent_dialogs(source);
        }
    }
}

/// Display name of whatever `path` refers to.
fn target_name(ctx: &AppContext, source: RequestSource, path: &str) -> String {
    let state = ctx.state.borrow();
    let name = match source {
        RequestSource::Service => state.service(path).map(|s| s.name().to_string()),
        RequestSource::Vpn => state.vpn_connection(path).map(|v| v.name().to_string()),
    };
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| "the network".to_string())
}

fn field_label(field: &InputField) -> String {
    match (field.name.as_str(), &field.kind) {
        ("Name", _) | (_, FieldType::Ssid) => "Network name".to_string(),
        ("Identity", _) | ("Username", _) => "Username".to_string(),
        ("Passphrase", _) | ("Password", _) => "Password".to_string(),
        ("WPS", _) | (_, FieldType::WpsPin) => "WPS PIN".to_string(),
        (name, _) => name.rsplit('.').next().unwrap_or(name).to_string(),
    }
}

/// Whether `answers` satisfy every mandatory field.
///
/// A mandatory field also counts as answered when one of its alternates is.
pub fn form_complete(fields: &[InputField], answers: &HashMap<String, String>) -> bool {
    let filled = |name: &str| answers.get(name).is_some_and(|v| !v.is_empty());
    fields
        .iter()
        .filter(|f| f.requirement == Requirement::Mandatory)
        .all(|f| filled(&f.name) || f.alternates.iter().any(|a| filled(a)))
}

/// Registers `dialog` as an open prompt and forgets it once it closes.
fn track(ctx: &Rc<AppContext>, source: RequestSource, dialog: &Dialog) {
    ctx.agent_dialogs
        .borrow_mut()
        .push((source, dialog.clone()));
    let ctx = ctx.clone();
    dialog.connect_close_request(move |dialog| {
        ctx.forget_agent_dialog(dialog);
        glib::Propagation::Proceed
    });
}

fn show_input(
    ctx: &Rc<AppContext>,
    source: RequestSource,
    path: &str,
    fields: Vec<InputField>,
    responder: Responder<HashMap<String, String>>,
) {
    let name = target_name(ctx, source, path);

    let dialog = Dialog::new();
    dialog.set_title(Some("Authentication required"));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button("Connect", ResponseType::Ok);
    dialog.set_default_response(ResponseType::Ok);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    let intro = Label::new(Some(&format!("Credentials are needed to connect to {name}.")));
    intro.set_wrap(true);
    intro.set_xalign(0.0);
    vbox.append(&intro);

    let grid = Grid::new();
    grid.set_row_spacing(6);
    grid.set_column_spacing(12);

    let mut entries: Vec<(String, Entry)> = Vec::new();
    for (row, field) in fields.iter().enumerate() {
        let label = Label::new(Some(&field_label(field)));
        label.set_xalign(0.0);
        grid.attach(&label, 0, row as i32, 1, 1);

        if field.is_informational() {
            let value = Label::new(field.value.as_deref());
            value.set_xalign(0.0);
            value.set_selectable(true);
            grid.attach(&value, 1, row as i32, 1, 1);
            continue;
        }

        let entry = Entry::new();
        entry.set_hexpand(true);
        entry.set_activates_default(true);
        entry.set_visibility(!field.kind.is_secret());
        if let Some(v) = &field.value {
            entry.set_text(v);
        }
        if field.requirement != Requirement::Mandatory {
            entry.set_placeholder_text(Some("optional"));
        }
        grid.attach(&entry, 1, row as i32, 1, 1);
        entries.push((field.name.clone(), entry));
    }
    vbox.append(&grid);

    let error_label = Label::new(Some("Please fill in the required fields."));
    error_label.add_css_class("dialog-error");
    error_label.set_visible(false);
    vbox.append(&error_label);

    dialog.content_area().append(&vbox);

    if let Some((_, first)) = entries.first() {
        first.grab_focus();
    }

    let pending: Pending<HashMap<String, String>> = Rc::new(RefCell::new(Some(responder)));
    track(ctx, source, &dialog);

    dialog.connect_response(move |dialog, response| {
        if response != ResponseType::Ok {
            // Dropping the responder answers Canceled.
            pending.borrow_mut().take();
            dialog.close();
            return;
        }

        let answers: HashMap<String, String> = entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.text().to_string()))
            .collect();
        if !form_complete(&fields, &answers) {
            error_label.set_visible(true);
            return;
        }
        if let Some(responder) = pending.borrow_mut().take() {
            responder.respond(answers);
        }
        dialog.close();
    });

    dialog.present();
}

fn show_retry(
    ctx: &Rc<AppContext>,
    source: RequestSource,
    path: &str,
    error: &str,
    responder: Responder<ErrorAction>,
) {
    let name = target_name(ctx, source, path);

    let dialog = Dialog::new();
    dialog.set_title(Some("Connection failed"));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button("Retry", ResponseType::Yes);
    dialog.set_default_response(ResponseType::Yes);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");
    let text = Label::new(Some(&format!(
        "Connecting to {name} failed: {error}.\nTry again?"
    )));
    text.set_wrap(true);
    text.set_xalign(0.0);
    vbox.append(&text);
    dialog.content_area().append(&vbox);

    let pending: Pending<ErrorAction> = Rc::new(RefCell::new(Some(responder)));
    track(ctx, source, &dialog);

    dialog.connect_response(move |dialog, response| {
        let action = if response == ResponseType::Yes {
            ErrorAction::Retry
        } else {
            ErrorAction::Acknowledge
        };
        if let Some(responder) = pending.borrow_mut().take() {
            responder.respond(action);
        }
        dialog.close();
    });

    dialog.present();
}

fn open_browser(ctx: &Rc<AppContext>, path: &str, url: &str, responder: Responder<()>) {
    debug!("Captive portal on {path}: {url}");
    match gtk::gio::AppInfo::launch_default_for_uri(url, None::<&gtk::gio::AppLaunchContext>) {
        Ok(()) => responder.respond(()),
        Err(e) => {
            warn!("Could not open {url}: {e}");
            drop(responder);
            show_message(
                &ctx.window,
                "Could not open the login page",
                &format!("{url}\n{e}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, kind: FieldType, requirement: Requirement) -> InputField {
        InputField {
            name: name.to_string(),
            kind,
            requirement,
            alternates: Vec::new(),
            value: None,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn mandatory_fields_must_be_filled() {
        let fields = vec![
            field("Passphrase", FieldType::Psk, Requirement::Mandatory),
            field("Name", FieldType::String, Requirement::Optional),
        ];
        assert!(!form_complete(&fields, &answers(&[])));
        assert!(!form_complete(&fields, &answers(&[("Passphrase", "")])));
        assert!(form_complete(&fields, &answers(&[("Passphrase", "secret99")])));
    }

    #[test]
    fn alternate_satisfies_mandatory() {
        let mut passphrase = field("Passphrase", FieldType::Psk, Requirement::Mandatory);
        passphrase.alternates = vec!["WPS".to_string()];
        let fields = vec![
            passphrase,
            field("WPS", FieldType::WpsPin, Requirement::Alternate),
        ];
        assert!(form_complete(&fields, &answers(&[("WPS", "12345670")])));
    }

    #[test]
    fn labels_are_friendly() {
        let f = field("Identity", FieldType::String, Requirement::Mandatory);
        assert_eq!(field_label(&f), "Username");
        let f = field("OpenConnect.Usergroup", FieldType::String, Requirement::Optional);
        assert_eq!(field_label(&f), "Usergroup");
        let f = field("SSID", FieldType::Ssid, Requirement::Optional);
        assert_eq!(field_label(&f), "Network name");
    }
}
