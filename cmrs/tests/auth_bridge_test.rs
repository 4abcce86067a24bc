//! Tests for the credential bridge.
//!
//! A scripted backend stands in for the VPN login helper so the
//! rendezvous between the worker thread and the receiving side can be
//! exercised without a network.

use std::collections::HashMap;

use cmrs::ConnectionError;
use cmrs::auth::{
    AuthBackend, AuthBridge, AuthCallbacks, AuthCookie, AuthForm, BridgeEvent, FormField,
    FormResponse, PeerCertificate, ProgressLevel,
};
use futures::StreamExt;
use futures::executor::block_on;

/// Asks for a certificate decision, then a password, like a real gateway.
struct Gateway {
    password: &'static str,
}

impl AuthBackend for Gateway {
    fn authenticate(&self, host: &str, cb: &dyn AuthCallbacks) -> cmrs::Result<AuthCookie> {
        cb.progress(ProgressLevel::Info, &format!("Connecting to {host}"));

        let cert = PeerCertificate {
            host: host.to_string(),
            fingerprint: "pin-sha256:AAAA".into(),
            reason: "signer not found".into(),
        };
        if !cb.validate_peer_cert(&cert) {
            return Err(ConnectionError::Canceled);
        }

        let form = AuthForm {
            title: format!("Log in to {host}"),
            fields: vec![
                FormField::text("username", "Username"),
                FormField::password("password", "Password"),
            ],
            ..Default::default()
        };
        let FormResponse::Submit(values) = cb.process_auth_form(&form) else {
            return Err(ConnectionError::Canceled);
        };
        if values.get("password").map(String::as_str) != Some(self.password) {
            return Err(ConnectionError::Auth("Login failed".into()));
        }

        Ok(AuthCookie {
            cookie: "session".into(),
            host: Some("198.51.100.4".into()),
            fingerprint: Some(cert.fingerprint),
            ..Default::default()
        })
    }
}

fn submit(password: &str) -> FormResponse {
    let mut values = HashMap::new();
    values.insert("username".to_string(), "alice".to_string());
    values.insert("password".to_string(), password.to_string());
    FormResponse::Submit(values)
}

/// Drives a session, answering prompts with the given decisions.
fn run(password_ok: bool, accept_cert: bool, answer_form: Option<&str>) -> cmrs::Result<AuthCookie> {
    let backend = Gateway {
        password: if password_ok { "s3cret" } else { "other" },
    };
    let (session, mut rx) = AuthBridge::start(backend, "vpn.example.com").unwrap();

    let result = block_on(async {
        while let Some(event) = rx.next().await {
            match event {
                BridgeEvent::Progress { reply, .. } => reply.send(()),
                BridgeEvent::ValidateCert { cert, reply } => {
                    assert_eq!(cert.fingerprint, "pin-sha256:AAAA");
                    reply.send(accept_cert);
                }
                BridgeEvent::AuthForm { form, reply } => {
                    assert_eq!(form.fields.len(), 2);
                    match answer_form {
                        Some(password) => reply.send(submit(password)),
                        None => drop(reply),
                    }
                }
                BridgeEvent::Finished(result) => return result,
            }
        }
        panic!("bridge closed without a result");
    });
    session.join();
    result
}

#[test]
fn successful_login_yields_cookie() {
    let cookie = run(true, true, Some("s3cret")).unwrap();
    assert_eq!(cookie.cookie, "session");
    assert_eq!(cookie.fingerprint.as_deref(), Some("pin-sha256:AAAA"));
    let answers = cookie.agent_answers();
    assert_eq!(answers["OpenConnect.Cookie"], "session");
    assert_eq!(answers["OpenConnect.VPNHost"], "198.51.100.4");
}

#[test]
fn rejected_certificate_cancels() {
    let err = run(true, false, Some("s3cret")).unwrap_err();
    assert!(err.is_expected());
}

#[test]
fn dropped_form_reply_cancels() {
    let err = run(true, true, None).unwrap_err();
    assert!(matches!(err, ConnectionError::Canceled));
}

#[test]
fn backend_errors_are_delivered() {
    let err = run(false, true, Some("s3cret")).unwrap_err();
    assert!(matches!(err, ConnectionError::Auth(_)));
    assert!(!err.is_expected());
}
