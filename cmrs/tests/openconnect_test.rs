//! Tests for the `openconnect --authenticate` driver.
//!
//! Small shell scripts stand in for the helper binary. They read the
//! password from stdin and answer the way openconnect does: session
//! assignments on stdout, diagnostics on stderr.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use cmrs::ConnectionError;
use cmrs::auth::{
    AuthBackend, AuthCallbacks, AuthForm, FormResponse, OpenConnectCli, PeerCertificate,
    ProgressLevel,
};
use tempfile::TempDir;

// Writing a script while another test forks can leave it busy for exec.
static SPAWN: Mutex<()> = Mutex::new(());

fn helper(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("openconnect");
    fs::write(&path, format!("#!/bin/sh\nread -r PASSWORD\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn cli(path: &Path) -> OpenConnectCli {
    OpenConnectCli::new()
        .with_program(path.to_str().unwrap())
        .with_timeout(Duration::from_secs(20))
}

/// Answers forms from a queue and records what it was asked.
#[derive(Default)]
struct User {
    passwords: RefCell<Vec<&'static str>>,
    accept_cert: bool,
    forms: RefCell<Vec<AuthForm>>,
    certs: RefCell<Vec<PeerCertificate>>,
}

impl User {
    fn with_passwords(passwords: &[&'static str]) -> Self {
        Self {
            passwords: RefCell::new(passwords.iter().rev().copied().collect()),
            accept_cert: true,
            ..Self::default()
        }
    }
}

impl AuthCallbacks for User {
    fn progress(&self, _level: ProgressLevel, _message: &str) {}

    fn validate_peer_cert(&self, cert: &PeerCertificate) -> bool {
        self.certs.borrow_mut().push(cert.clone());
        self.accept_cert
    }

    fn process_auth_form(&self, form: &AuthForm) -> FormResponse {
        self.forms.borrow_mut().push(form.clone());
        match self.passwords.borrow_mut().pop() {
            Some(password) => {
                let mut values = HashMap::new();
                values.insert("username".to_string(), "alice".to_string());
                values.insert("password".to_string(), password.to_string());
                FormResponse::Submit(values)
            }
            None => FormResponse::Cancel,
        }
    }
}

const CERT_CHECK: &str = r#"
case "$*" in
  *--servercert=pin-sha256:TRUSTME*) echo "COOKIE='session'"; exit 0 ;;
esac
echo "Server certificate verify failed: signer not found" >&2
echo "To trust this server in future, perhaps add this to your command line:" >&2
echo "    --servercert pin-sha256:TRUSTME" >&2
exit 1
"#;

#[test]
fn accepted_certificate_is_pinned_on_retry() {
    let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let program = helper(&dir, CERT_CHECK);

    let user = User::with_passwords(&["secret"]);
    let cookie = cli(&program).authenticate("vpn.example.com", &user).unwrap();

    assert_eq!(cookie.cookie, "session");
    assert_eq!(cookie.fingerprint.as_deref(), Some("pin-sha256:TRUSTME"));
    let certs = user.certs.borrow();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].fingerprint, "pin-sha256:TRUSTME");
    assert!(certs[0].reason.contains("certificate"));
    // The retry reuses the submitted credentials.
    assert_eq!(user.forms.borrow().len(), 1);
}

#[test]
fn rejected_certificate_cancels() {
    let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let program = helper(&dir, CERT_CHECK);

    let user = User {
        accept_cert: false,
        ..User::with_passwords(&["secret"])
    };
    let result = cli(&program).authenticate("vpn.example.com", &user);
    assert!(matches!(result, Err(ConnectionError::Canceled)));
}

#[test]
fn failed_login_asks_again() {
    let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let program = helper(
        &dir,
        r#"
if [ "$PASSWORD" = "right" ]; then
  echo "COOKIE='granted'"
  exit 0
fi
echo "Login failed." >&2
exit 1
"#,
    );

    let user = User::with_passwords(&["wrong", "right"]);
    let cookie = cli(&program).authenticate("vpn.example.com", &user).unwrap();

    assert_eq!(cookie.cookie, "granted");
    let forms = user.forms.borrow();
    assert_eq!(forms.len(), 2);
    assert_eq!(forms[0].error, None);
    assert_eq!(forms[1].error.as_deref(), Some("Login failed."));
}

#[test]
fn cancelled_form_returns_canceled() {
    let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let program = helper(&dir, "echo \"Login failed.\" >&2\nexit 1");

    let user = User::with_passwords(&["wrong"]);
    let result = cli(&program).authenticate("vpn.example.com", &user);

    assert!(matches!(result, Err(ConnectionError::Canceled)));
    assert_eq!(user.forms.borrow().len(), 2);
}

#[test]
fn verbose_helper_output_does_not_stall_login() {
    let _guard = SPAWN.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let program = helper(
        &dir,
        r#"
i=0
while [ $i -lt 4000 ]; do
  echo "POST https://vpn.example.com/ got HTTP response: 200 OK, padding padding" >&2
  i=$((i + 1))
done
echo "COOKIE='abc'"
"#,
    );

    let user = User::with_passwords(&["secret"]);
    let cookie = cli(&program).authenticate("vpn.example.com", &user).unwrap();
    assert_eq!(cookie.cookie, "abc");
}

#[test]
fn missing_program_is_an_auth_error() {
    let user = User::with_passwords(&["secret"]);
    let result = OpenConnectCli::new()
        .with_program("/nonexistent/openconnect")
        .authenticate("vpn.example.com", &user);
    assert!(matches!(result, Err(ConnectionError::Auth(_))));
}
