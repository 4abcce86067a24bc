//! Data exchanged between a login backend and the user.

use std::collections::HashMap;

use crate::types::constants::openconnect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLevel {
    Error,
    Info,
    Debug,
}

/// A server certificate the backend could not verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    pub host: String,
    /// Fingerprint in the form the backend accepts back (`pin-sha256:...`).
    pub fingerprint: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldKind {
    Text,
    Password,
    /// Choice between `(value, label)` pairs.
    Select(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FormFieldKind,
    /// Pre-filled value.
    pub value: Option<String>,
}

impl FormField {
    pub fn text(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FormFieldKind::Text,
            value: None,
        }
    }

    pub fn password(name: &str, label: &str) -> Self {
        Self {
            kind: FormFieldKind::Password,
            ..Self::text(name, label)
        }
    }
}

/// A login form to show to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub title: String,
    pub message: Option<String>,
    /// Set when a previous submission was rejected.
    pub error: Option<String>,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormResponse {
    Submit(HashMap<String, String>),
    Cancel,
}

/// The result of a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthCookie {
    pub cookie: String,
    /// Address of the gateway to connect to.
    pub host: Option<String>,
    pub connect_url: Option<String>,
    pub fingerprint: Option<String>,
    pub resolve: Option<String>,
}

impl AuthCookie {
    /// Answers for a VPN agent `RequestInput` asking for a cookie.
    ///
    /// `OpenConnect.VPNHost` prefers the connect URL, since it carries the
    /// path some gateways require, and falls back to the resolved host.
    pub fn agent_answers(&self) -> HashMap<String, String> {
        let mut answers = HashMap::new();
        answers.insert(openconnect::COOKIE.to_string(), self.cookie.clone());
        if let Some(fp) = &self.fingerprint {
            answers.insert(openconnect::SERVER_CERT.to_string(), fp.clone());
        }
        if let Some(host) = self.connect_url.as_ref().or(self.host.as_ref()) {
            answers.insert(openconnect::VPN_HOST.to_string(), host.clone());
        }
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_answers_prefer_connect_url() {
        let cookie = AuthCookie {
            cookie: "abc".into(),
            host: Some("203.0.113.7".into()),
            connect_url: Some("https://vpn.example.com/group".into()),
            fingerprint: Some("pin-sha256:xyz".into()),
            resolve: None,
        };
        let answers = cookie.agent_answers();
        assert_eq!(answers[openconnect::COOKIE], "abc");
        assert_eq!(answers[openconnect::VPN_HOST], "https://vpn.example.com/group");
        assert_eq!(answers[openconnect::SERVER_CERT], "pin-sha256:xyz");
    }

    #[test]
    fn agent_answers_without_optional_parts() {
        let cookie = AuthCookie {
            cookie: "abc".into(),
            host: Some("203.0.113.7".into()),
            ..Default::default()
        };
        let answers = cookie.agent_answers();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[openconnect::VPN_HOST], "203.0.113.7");
    }
}
