use glib::clone;
use gtk::prelude::*;
use gtk::{Box as GtkBox, Dialog, Entry, Label, Orientation, ResponseType};
use log::debug;
use std::rc::Rc;

use cmrs::{ConnectionError, validate_tethering};

use crate::ui::context::AppContext;

/// Hotspot name and passphrase dialog.
///
/// With `enable_after` set, tethering is switched on once the credentials
/// were stored.
pub fn show(ctx: &Rc<AppContext>, path: &str, enable_after: bool) {
    let (identifier, passphrase) = {
        let state = ctx.state.borrow();
        let tech = state.technology(path);
        (
            tech.and_then(|t| t.tethering_identifier())
                .unwrap_or_default()
                .to_string(),
            tech.and_then(|t| t.tethering_passphrase())
                .unwrap_or_default()
                .to_string(),
        )
    };

    let dialog = Dialog::new();
    dialog.set_title(Some("Hotspot"));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.add_button(
        if enable_after { "Share" } else { "Save" },
        ResponseType::Apply,
    );
    dialog.set_default_response(ResponseType::Apply);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    let name_entry = Entry::new();
    name_entry.set_text(&identifier);
    name_entry.set_placeholder_text(Some("Network name"));

    let pass_entry = Entry::new();
    pass_entry.set_text(&passphrase);
    pass_entry.set_visibility(false);
    pass_entry.set_placeholder_text(Some("Passphrase"));
    pass_entry.set_activates_default(true);

    let error_label = Label::new(None);
    error_label.add_css_class("dialog-error");
    error_label.set_wrap(true);
    error_label.set_visible(false);

    vbox.append(&Label::new(Some("Network name:")));
    vbox.append(&name_entry);
    vbox.append(&Label::new(Some("Passphrase:")));
    vbox.append(&pass_entry);
    vbox.append(&error_label);
    dialog.content_area().append(&vbox);

    let path = path.to_string();
    dialog.connect_response(clone!(
        #[strong]
        ctx,
        move |dialog, response| {
            if response != ResponseType::Apply {
                dialog.close();
                return;
            }

            let identifier = name_entry.text().to_string();
            let passphrase = pass_entry.text().to_string();
            if let Err(ConnectionError::InvalidInput(msg)) =
                validate_tethering(&identifier, &passphrase)
            {
                error_label.set_text(&msg);
                error_label.set_visible(true);
                return;
            }

            dialog.set_sensitive(false);
            let ctx = ctx.clone();
            let path = path.clone();
            let dialog = dialog.clone();
            let error_label = error_label.clone();
            glib::MainContext::default().spawn_local(async move {
                debug!("Configuring tethering on {path}");
                let mut result = ctx
                    .cm
                    .configure_tethering(&path, &identifier, &passphrase)
                    .await;
                if result.is_ok() && enable_after {
                    result = ctx.cm.set_tethering(&path, true).await;
                }
                match result {
                    Ok(()) => dialog.close(),
                    Err(ConnectionError::InvalidInput(msg)) => {
                        error_label.set_text(&msg);
                        error_label.set_visible(true);
                        dialog.set_sensitive(true);
                    }
                    Err(e) => {
                        dialog.close();
                        ctx.report("Could not set up the hotspot", &e);
                    }
                }
            });
        }
    ));

    dialog.present();
}
