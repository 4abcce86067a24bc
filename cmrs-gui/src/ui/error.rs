use gtk::prelude::*;
use gtk::{ApplicationWindow, Box as GtkBox, Dialog, Expander, Label, Orientation, ResponseType};
use log::{debug, error};

use cmrs::ConnectionError;

/// Shows a failed daemon call, or just logs it if the failure was expected.
///
/// Cancellations and "already connected" style replies are routine while
/// the user clicks around and never get a dialog.
pub fn show_error(parent: &ApplicationWindow, summary: &str, err: &ConnectionError) {
    if err.is_expected() {
        debug!("{summary}: {err}");
        return;
    }
    error!("{summary}: {err}");
    show_message(parent, summary, &err.to_string());
}

/// Modal message with the technical text folded away.
pub fn show_message(parent: &ApplicationWindow, summary: &str, detail: &str) {
    let dialog = Dialog::new();
    dialog.set_title(Some("Error"));
    dialog.set_transient_for(Some(parent));
    dialog.set_modal(true);
    dialog.add_button("Close", ResponseType::Close);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    let summary_label = Label::new(Some(summary));
    summary_label.set_wrap(true);
    summary_label.set_xalign(0.0);
    vbox.append(&summary_label);

    if !detail.is_empty() {
        let detail_label = Label::new(Some(detail));
        detail_label.set_wrap(true);
        detail_label.set_selectable(true);
        detail_label.set_xalign(0.0);
        detail_label.add_css_class("dialog-error");

        let expander = Expander::new(Some("Details"));
        expander.set_child(Some(&detail_label));
        vbox.append(&expander);
    }

    dialog.content_area().append(&vbox);
    dialog.connect_response(|d, _| d.close());
    dialog.present();
}
