//! Credential bridge for VPN logins.
//!
//! OpenConnect style logins are blocking and driven by callbacks: the
//! login code asks for a form to be filled in, a certificate to be
//! accepted, and reports progress, all from the thread it runs on. The
//! bridge runs such a login on a worker thread and turns each callback
//! into a [`BridgeEvent`] the GUI answers from its main loop.

mod bridge;
mod form;
mod openconnect;

pub use bridge::{AuthBackend, AuthBridge, AuthCallbacks, AuthSession, BridgeEvent, Reply};
pub use form::{
    AuthCookie, AuthForm, FormField, FormFieldKind, FormResponse, PeerCertificate, ProgressLevel,
};
pub use openconnect::{OpenConnectCli, parse_auth_output, parse_server_cert};
