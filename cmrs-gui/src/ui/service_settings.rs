use glib::clone;
use gtk::prelude::*;
use gtk::{
    Box as GtkBox, CheckButton, Dialog, DropDown, Entry, Grid, Label, Orientation, PolicyType,
    ResponseType, ScrolledWindow,
};
use log::debug;
use std::rc::Rc;

use cmrs::constants::keys;
use cmrs::{Ipv4Settings, Ipv6Settings, ProxySettings, Service, split_list};

use crate::ui::context::AppContext;

const IPV4_METHODS: &[&str] = &["dhcp", "manual", "off"];
const IPV6_METHODS: &[&str] = &["auto", "manual", "off"];
const IPV6_PRIVACY: &[&str] = &["disabled", "enabled", "preferred"];
const PROXY_METHODS: &[&str] = &["direct", "auto", "manual"];

const RESPONSE_FORGET: u16 = 1;

/// Everything the user can edit, read back from the widgets.
#[derive(Debug, Clone, PartialEq)]
struct Edits {
    autoconnect: bool,
    mdns: bool,
    ipv4: Ipv4Settings,
    ipv6: Ipv6Settings,
    nameservers: Vec<String>,
    timeservers: Vec<String>,
    domains: Vec<String>,
    proxy: ProxySettings,
}

impl Edits {
    fn from_service(service: &Service) -> Self {
        Self {
            autoconnect: service.autoconnect(),
            mdns: service.properties.bool(keys::MDNS).unwrap_or(false),
            ipv4: service.ipv4_config(),
            ipv6: service.ipv6_config(),
            nameservers: service.nameservers_config(),
            timeservers: service.timeservers_config(),
            domains: service.domains_config(),
            proxy: service.proxy_config(),
        }
        .normalized()
    }

    /// The values as the form reads them back after showing them.
    ///
    /// Unset methods become the dropdown default and blank text becomes
    /// `None`, so an untouched form compares equal to its starting point.
    fn normalized(self) -> Self {
        let method = |options: &[&str], current: Option<String>| {
            Some(choice(options, position(options, current.as_deref())))
        };
        let list = |items: Vec<String>| split_list(&items.join(" "));
        Self {
            autoconnect: self.autoconnect,
            mdns: self.mdns,
            ipv4: Ipv4Settings {
                method: method(IPV4_METHODS, self.ipv4.method),
                address: text(self.ipv4.address),
                netmask: text(self.ipv4.netmask),
                gateway: text(self.ipv4.gateway),
            },
            ipv6: Ipv6Settings {
                method: method(IPV6_METHODS, self.ipv6.method),
                address: text(self.ipv6.address),
                prefix_length: self.ipv6.prefix_length,
                gateway: text(self.ipv6.gateway),
                privacy: method(IPV6_PRIVACY, self.ipv6.privacy),
            },
            nameservers: list(self.nameservers),
            timeservers: list(self.timeservers),
            domains: list(self.domains),
            proxy: ProxySettings {
                method: method(PROXY_METHODS, self.proxy.method),
                url: text(self.proxy.url),
                servers: list(self.proxy.servers),
                excludes: list(self.proxy.excludes),
            },
        }
    }
}

/// A settings group that is written with its own call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setting {
    AutoConnect,
    Mdns,
    Ipv4,
    Ipv6,
    Nameservers,
    Timeservers,
    Domains,
    Proxy,
}

/// Groups whose value differs between `initial` and `edits`.
fn changed(initial: &Edits, edits: &Edits) -> Vec<Setting> {
    [
        (Setting::AutoConnect, initial.autoconnect != edits.autoconnect),
        (Setting::Mdns, initial.mdns != edits.mdns),
        (Setting::Ipv4, initial.ipv4 != edits.ipv4),
        (Setting::Ipv6, initial.ipv6 != edits.ipv6),
        (Setting::Nameservers, initial.nameservers != edits.nameservers),
        (Setting::Timeservers, initial.timeservers != edits.timeservers),
        (Setting::Domains, initial.domains != edits.domains),
        (Setting::Proxy, initial.proxy != edits.proxy),
    ]
    .into_iter()
    .filter_map(|(setting, differs)| differs.then_some(setting))
    .collect()
}

struct Form {
    autoconnect: CheckButton,
    mdns: CheckButton,
    ipv4_method: DropDown,
    ipv4_address: Entry,
    ipv4_netmask: Entry,
    ipv4_gateway: Entry,
    ipv6_method: DropDown,
    ipv6_address: Entry,
    ipv6_prefix: Entry,
    ipv6_gateway: Entry,
    ipv6_privacy: DropDown,
    nameservers: Entry,
    timeservers: Entry,
    domains: Entry,
    proxy_method: DropDown,
    proxy_url: Entry,
    proxy_servers: Entry,
    proxy_excludes: Entry,
}

impl Form {
    fn read(&self) -> Edits {
        Edits {
            autoconnect: self.autoconnect.is_active(),
            mdns: self.mdns.is_active(),
            ipv4: Ipv4Settings {
                method: Some(choice(IPV4_METHODS, self.ipv4_method.selected())),
                address: entry_text(&self.ipv4_address),
                netmask: entry_text(&self.ipv4_netmask),
                gateway: entry_text(&self.ipv4_gateway),
            },
            ipv6: Ipv6Settings {
                method: Some(choice(IPV6_METHODS, self.ipv6_method.selected())),
                address: entry_text(&self.ipv6_address),
                prefix_length: entry_text(&self.ipv6_prefix).and_then(|p| p.parse().ok()),
                gateway: entry_text(&self.ipv6_gateway),
                privacy: Some(choice(IPV6_PRIVACY, self.ipv6_privacy.selected())),
            },
            nameservers: split_list(&self.nameservers.text()),
            timeservers: split_list(&self.timeservers.text()),
            domains: split_list(&self.domains.text()),
            proxy: ProxySettings {
                method: Some(choice(PROXY_METHODS, self.proxy_method.selected())),
                url: entry_text(&self.proxy_url),
                servers: split_list(&self.proxy_servers.text()),
                excludes: split_list(&self.proxy_excludes.text()),
            },
        }
    }

    /// Greys out address fields the chosen methods ignore.
    fn sync_sensitivity(&self) {
        let v4_manual = choice(IPV4_METHODS, self.ipv4_method.selected()) == "manual";
        for e in [&self.ipv4_address, &self.ipv4_netmask, &self.ipv4_gateway] {
            e.set_sensitive(v4_manual);
        }
        let v6 = choice(IPV6_METHODS, self.ipv6_method.selected());
        for e in [&self.ipv6_address, &self.ipv6_prefix, &self.ipv6_gateway] {
            e.set_sensitive(v6 == "manual");
        }
        self.ipv6_privacy.set_sensitive(v6 == "auto");
        let proxy = choice(PROXY_METHODS, self.proxy_method.selected());
        self.proxy_url.set_sensitive(proxy == "auto");
        self.proxy_servers.set_sensitive(proxy == "manual");
        self.proxy_excludes.set_sensitive(proxy == "manual");
    }
}

/// Maps a dropdown index back to the daemon's method string.
fn choice(options: &[&str], selected: u32) -> String {
    options
        .get(selected as usize)
        .or_else(|| options.first())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Index of `current` in `options`, defaulting to the first entry.
fn position(options: &[&str], current: Option<&str>) -> u32 {
    current
        .and_then(|c| options.iter().position(|o| *o == c))
        .unwrap_or(0) as u32
}

fn entry_text(entry: &Entry) -> Option<String> {
    text(Some(entry.text().to_string()))
}

fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn entry(text: Option<&str>) -> Entry {
    let e = Entry::new();
    e.set_text(text.unwrap_or_default());
    e.set_hexpand(true);
    e
}

fn dropdown(options: &[&str], current: Option<&str>) -> DropDown {
    let dd = DropDown::from_strings(options);
    dd.set_selected(position(options, current));
    dd
}

fn section(vbox: &GtkBox, title: &str) -> Grid {
    let label = Label::new(Some(title));
    label.set_xalign(0.0);
    label.add_css_class("settings-section");
    vbox.append(&label);

    let grid = Grid::new();
    grid.set_row_spacing(6);
    grid.set_column_spacing(12);
    vbox.append(&grid);
    grid
}

fn add_row(grid: &Grid, row: i32, label: &str, widget: &impl IsA<gtk::Widget>) {
    let l = Label::new(Some(label));
    l.set_xalign(0.0);
    grid.attach(&l, 0, row, 1, 1);
    grid.attach(widget, 1, row, 1, 1);
}

fn add_info(grid: &Grid, row: &mut i32, label: &str, value: Option<String>) {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return;
    };
    let v = Label::new(Some(&value));
    v.set_xalign(0.0);
    v.set_selectable(true);
    add_row(grid, *row, label, &v);
    *row += 1;
}

/// Opens the settings dialog of a service; at most one is open at a time.
pub fn show(ctx: &Rc<AppContext>, path: &str) {
    let Some(service) = ctx.state.borrow().service(path).cloned() else {
        return;
    };
    ctx.state.borrow_mut().select(path);
    let previous = ctx.settings_dialog.borrow_mut().take();
    if let Some((_, old)) = previous {
        old.close();
    }

    let dialog = Dialog::new();
    dialog.set_title(Some(service.name()));
    dialog.set_transient_for(Some(&ctx.window));
    dialog.set_modal(true);
    dialog.set_default_size(460, 560);

    let vbox = GtkBox::new(Orientation::Vertical, 8);
    vbox.add_css_class("dialog-body");

    let details = section(&vbox, "Details");
    let mut row = 0;
    let state = service.state();
    let ethernet = service.ethernet();
    let ipv4 = service.ipv4();
    let ipv6 = service.ipv6();
    add_info(&details, &mut row, "State", Some(state.to_string()));
    add_info(&details, &mut row, "Error", service.error().map(str::to_string));
    add_info(
        &details,
        &mut row,
        "Security",
        Some(
            service
                .security()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
    );
    add_info(
        &details,
        &mut row,
        "Signal",
        service.strength().map(|s| format!("{s}%")),
    );
    add_info(&details, &mut row, "Interface", ethernet.interface);
    add_info(&details, &mut row, "MAC address", ethernet.address);
    add_info(&details, &mut row, "MTU", ethernet.mtu.map(|m| m.to_string()));
    add_info(&details, &mut row, "IPv4 address", ipv4.address);
    add_info(&details, &mut row, "Gateway", ipv4.gateway);
    add_info(&details, &mut row, "IPv6 address", ipv6.address);
    add_info(
        &details,
        &mut row,
        "Name servers",
        Some(service.nameservers().join(" ")),
    );
    add_info(&details, &mut row, "Domains", Some(service.domains().join(" ")));
    if service.roaming() {
        add_info(&details, &mut row, "Roaming", Some("yes".into()));
    }

    let initial = Edits::from_service(&service);

    let general = section(&vbox, "General");
    let autoconnect = CheckButton::with_label("Connect automatically");
    autoconnect.set_active(initial.autoconnect);
    general.attach(&autoconnect, 0, 0, 2, 1);
    let mdns = CheckButton::with_label("Multicast DNS");
    mdns.set_active(initial.mdns);
    general.attach(&mdns, 0, 1, 2, 1);

    let v4 = section(&vbox, "IPv4");
    let form_ipv4_method = dropdown(IPV4_METHODS, initial.ipv4.method.as_deref());
    let ipv4_address = entry(initial.ipv4.address.as_deref());
    let ipv4_netmask = entry(initial.ipv4.netmask.as_deref());
    let ipv4_gateway = entry(initial.ipv4.gateway.as_deref());
    add_row(&v4, 0, "Method", &form_ipv4_method);
    add_row(&v4, 1, "Address", &ipv4_address);
    add_row(&v4, 2, "Netmask", &ipv4_netmask);
    add_row(&v4, 3, "Gateway", &ipv4_gateway);

    let v6 = section(&vbox, "IPv6");
    let ipv6_method = dropdown(IPV6_METHODS, initial.ipv6.method.as_deref());
    let ipv6_address = entry(initial.ipv6.address.as_deref());
    let prefix = initial.ipv6.prefix_length.map(|p| p.to_string());
    let ipv6_prefix = entry(prefix.as_deref());
    let ipv6_gateway = entry(initial.ipv6.gateway.as_deref());
    let ipv6_privacy = dropdown(IPV6_PRIVACY, initial.ipv6.privacy.as_deref());
    add_row(&v6, 0, "Method", &ipv6_method);
    add_row(&v6, 1, "Address", &ipv6_address);
    add_row(&v6, 2, "Prefix length", &ipv6_prefix);
    add_row(&v6, 3, "Gateway", &ipv6_gateway);
    add_row(&v6, 4, "Privacy", &ipv6_privacy);

    let dns = section(&vbox, "Servers");
    let nameservers = entry(Some(&initial.nameservers.join(" ")));
    let timeservers = entry(Some(&initial.timeservers.join(" ")));
    let domains = entry(Some(&initial.domains.join(" ")));
    add_row(&dns, 0, "Name servers", &nameservers);
    add_row(&dns, 1, "Time servers", &timeservers);
    add_row(&dns, 2, "Search domains", &domains);

    let px = section(&vbox, "Proxy");
    let proxy_method = dropdown(PROXY_METHODS, initial.proxy.method.as_deref());
    let proxy_url = entry(initial.proxy.url.as_deref());
    let proxy_servers = entry(Some(&initial.proxy.servers.join(" ")));
    let proxy_excludes = entry(Some(&initial.proxy.excludes.join(" ")));
    add_row(&px, 0, "Method", &proxy_method);
    add_row(&px, 1, "Auto-config URL", &proxy_url);
    add_row(&px, 2, "Servers", &proxy_servers);
    add_row(&px, 3, "Excludes", &proxy_excludes);

    let form = Rc::new(Form {
        autoconnect,
        mdns,
        ipv4_method: form_ipv4_method,
        ipv4_address,
        ipv4_netmask,
        ipv4_gateway,
        ipv6_method,
        ipv6_address,
        ipv6_prefix,
        ipv6_gateway,
        ipv6_privacy,
        nameservers,
        timeservers,
        domains,
        proxy_method,
        proxy_url,
        proxy_servers,
        proxy_excludes,
    });
    form.sync_sensitivity();
    for dd in [&form.ipv4_method, &form.ipv6_method, &form.proxy_method] {
        dd.connect_selected_notify(clone!(
            #[weak]
            form,
            move |_| form.sync_sensitivity()
        ));
    }

    // Provisioned services cannot be changed over the bus.
    if service.immutable() {
        vbox.set_sensitive(false);
    }

    let scroller = ScrolledWindow::new();
    scroller.set_vexpand(true);
    scroller.set_policy(PolicyType::Never, PolicyType::Automatic);
    scroller.set_child(Some(&vbox));
    dialog.content_area().append(&scroller);

    if service.favorite() && !service.immutable() {
        dialog.add_button("Forget", ResponseType::Other(RESPONSE_FORGET));
    }
    dialog.add_button("Close", ResponseType::Close);
    if !service.immutable() {
        dialog.add_button("Apply", ResponseType::Apply);
    }

    let path = path.to_string();
    dialog.connect_response(clone!(
        #[strong]
        ctx,
        move |dialog, response| match response {
            ResponseType::Apply => {
                let edits = form.read();
                apply(&ctx, dialog, &path, &initial, edits);
            }
            ResponseType::Other(RESPONSE_FORGET) => {
                dialog.close();
                forget(&ctx, &path);
            }
            _ => dialog.close(),
        }
    ));

    dialog.connect_close_request(clone!(
        #[strong]
        ctx,
        move |dialog| {
            let mut open = ctx.settings_dialog.borrow_mut();
            if open.as_ref().is_some_and(|(_, d)| d == dialog) {
                *open = None;
            }
            glib::Propagation::Proceed
        }
    ));

    *ctx.settings_dialog.borrow_mut() = Some((service.path.clone(), dialog.clone()));
    dialog.present();
}

/// Sends every setting that differs from what the dialog started with.
fn apply(ctx: &Rc<AppContext>, dialog: &Dialog, path: &str, initial: &Edits, edits: Edits) {
    let pending = changed(initial, &edits);
    if pending.is_empty() {
        dialog.close();
        return;
    }

    dialog.set_sensitive(false);
    let ctx = ctx.clone();
    let dialog = dialog.clone();
    let path = path.to_string();
    glib::MainContext::default().spawn_local(async move {
        debug!("Applying {pending:?} to {path}");
        let cm = &ctx.cm;
        let result = async {
            for setting in pending {
                match setting {
                    Setting::AutoConnect => cm.set_autoconnect(&path, edits.autoconnect).await?,
                    Setting::Mdns => cm.set_mdns(&path, edits.mdns).await?,
                    Setting::Ipv4 => cm.set_ipv4_config(&path, &edits.ipv4).await?,
                    Setting::Ipv6 => cm.set_ipv6_config(&path, &edits.ipv6).await?,
                    Setting::Nameservers => {
                        cm.set_nameservers(&path, edits.nameservers.clone()).await?
                    }
                    Setting::Timeservers => {
                        cm.set_timeservers(&path, edits.timeservers.clone()).await?
                    }
                    Setting::Domains => cm.set_domains(&path, edits.domains.clone()).await?,
                    Setting::Proxy => cm.set_proxy_config(&path, &edits.proxy).await?,
                }
            }
            Ok::<(), cmrs::ConnectionError>(())
        }
        .await;

        dialog.close();
        if let Err(e) = result {
            ctx.report("Could not apply the settings", &e);
        }
    });
}

fn forget(ctx: &Rc<AppContext>, path: &str) {
    let ctx = ctx.clone();
    let path = path.to_string();
    glib::MainContext::default().spawn_local(async move {
        debug!("Removing {path}");
        if let Err(e) = ctx.cm.remove_service(&path).await {
            ctx.report("Could not forget the network", &e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_falls_back_to_first_option() {
        assert_eq!(choice(IPV4_METHODS, 1), "manual");
        assert_eq!(choice(IPV4_METHODS, 7), "dhcp");
        assert_eq!(choice(&[], 0), "");
    }

    #[test]
    fn position_of_unknown_method_is_first() {
        assert_eq!(position(IPV6_METHODS, Some("off")), 2);
        assert_eq!(position(IPV6_METHODS, Some("6to4")), 0);
        assert_eq!(position(PROXY_METHODS, None), 0);
    }

    fn unconfigured() -> Edits {
        Edits {
            autoconnect: true,
            mdns: false,
            ipv4: Ipv4Settings {
                method: Some("dhcp".into()),
                ..Default::default()
            },
            ipv6: Ipv6Settings {
                method: Some("off".into()),
                ..Default::default()
            },
            nameservers: Vec::new(),
            timeservers: Vec::new(),
            domains: Vec::new(),
            proxy: ProxySettings::default(),
        }
    }

    /// What the widgets hold for `unconfigured()` right after opening.
    fn shown_unconfigured() -> Edits {
        Edits {
            ipv6: Ipv6Settings {
                method: Some("off".into()),
                privacy: Some("disabled".into()),
                ..Default::default()
            },
            proxy: ProxySettings {
                method: Some("direct".into()),
                ..Default::default()
            },
            ..unconfigured()
        }
    }

    #[test]
    fn untouched_form_writes_nothing() {
        let initial = unconfigured().normalized();
        assert_eq!(initial, shown_unconfigured());
        assert!(changed(&initial, &shown_unconfigured()).is_empty());
    }

    #[test]
    fn only_edited_groups_are_written() {
        let initial = unconfigured().normalized();
        let mut edits = shown_unconfigured();
        edits.autoconnect = false;
        edits.nameservers = vec!["1.1.1.1".into()];
        assert_eq!(
            changed(&initial, &edits),
            vec![Setting::AutoConnect, Setting::Nameservers]
        );
    }

    #[test]
    fn normalizing_trims_text_and_lists() {
        let mut raw = unconfigured();
        raw.ipv4.address = Some("  ".into());
        raw.proxy.url = Some(" http://wpad/ ".into());
        raw.domains = vec!["example.com,lan".into()];
        let shown = raw.normalized();
        assert_eq!(shown.ipv4.address, None);
        assert_eq!(shown.proxy.url.as_deref(), Some("http://wpad/"));
        assert_eq!(shown.domains, vec!["example.com", "lan"]);
    }
}
