use gtk::gdk::Display;
use gtk::gio::File;
use gtk::{CssProvider, STYLE_PROVIDER_PRIORITY_APPLICATION, STYLE_PROVIDER_PRIORITY_USER};
use log::{debug, warn};

/// Location of the optional user stylesheet.
pub fn user_css_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cmrs/style.css"))
}

fn load_user_css_if_exists(display: &Display) {
    let Some(path) = user_css_path() else {
        return;
    };
    if !path.exists() {
        debug!("No user stylesheet at {}", path.display());
        return;
    }

    let provider = CssProvider::new();
    provider.load_from_file(&File::for_path(&path));
    gtk::style_context_add_provider_for_display(display, &provider, STYLE_PROVIDER_PRIORITY_USER);
    debug!("Loaded user stylesheet {}", path.display());
}

pub fn load_css() {
    let Some(display) = Display::default() else {
        warn!("No display found, skipping stylesheets");
        return;
    };

    let provider = CssProvider::new();
    provider.load_from_data(include_str!("style.css"));
    gtk::style_context_add_provider_for_display(
        &display,
        &provider,
        STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    load_user_css_if_exists(&display);
}
