//! Login through the `openconnect` command line helper.
//!
//! `openconnect --authenticate` performs only the login step and prints the
//! resulting session as shell assignments:
//!
//! ```text
//! COOKIE='3311180634@13561856@1339425499@B315A0E29D16C6FD92EE...'
//! HOST='10.0.0.1'
//! CONNECT_URL='https://vpn.example.com/'
//! FINGERPRINT='pin-sha256:xLSMtW3eMWkjOmpRo/qArs6rldOtTzsIwJMPS4e8Ll8='
//! RESOLVE='vpn.example.com:10.0.0.1'
//! ```
//!
//! An untrusted server certificate makes it fail and suggest a
//! `--servercert` argument on stderr; after the user accepts the
//! certificate the login is retried once with that argument.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::bridge::{AuthBackend, AuthCallbacks};
use super::form::{AuthCookie, AuthForm, FormField, FormResponse, PeerCertificate, ProgressLevel};
use crate::api::models::ConnectionError;
use crate::types::constants::timeouts;
use crate::Result;

const USERNAME: &str = "username";
const PASSWORD: &str = "password";

/// Runs `openconnect --authenticate` as a child process.
#[derive(Debug, Clone)]
pub struct OpenConnectCli {
    program: String,
    protocol: Option<String>,
    usergroup: Option<String>,
    username: Option<String>,
    timeout: Duration,
}

impl Default for OpenConnectCli {
    fn default() -> Self {
        Self {
            program: "openconnect".into(),
            protocol: None,
            usergroup: None,
            username: None,
            timeout: timeouts::auth_helper(),
        }
    }
}

struct RunOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl OpenConnectCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different executable, e.g. an absolute path.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Selects the VPN protocol (`anyconnect`, `gp`, `pulse`, ...).
    pub fn with_protocol(mut self, protocol: &str) -> Self {
        self.protocol = Some(protocol.to_string());
        self
    }

    pub fn with_usergroup(mut self, usergroup: &str) -> Self {
        self.usergroup = Some(usergroup.to_string());
        self
    }

    /// Pre-fills the user name in the login form.
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn login_form(&self, host: &str, error: Option<String>) -> AuthForm {
        let mut user = FormField::text(USERNAME, "Username");
        user.value = self.username.clone();
        AuthForm {
            title: format!("Log in to {host}"),
            message: self.usergroup.as_ref().map(|g| format!("Group: {g}")),
            error,
            fields: vec![user, FormField::password(PASSWORD, "Password")],
        }
    }

    fn run(
        &self,
        host: &str,
        username: &str,
        password: &str,
        servercert: Option<&str>,
    ) -> Result<RunOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--authenticate")
            .arg("--non-inter")
            .arg("--passwd-on-stdin")
            .arg(format!("--user={username}"));
        if let Some(protocol) = &self.protocol {
            cmd.arg(format!("--protocol={protocol}"));
        }
        if let Some(group) = &self.usergroup {
            cmd.arg(format!("--usergroup={group}"));
        }
        if let Some(fp) = servercert {
            cmd.arg(format!("--servercert={fp}"));
        }
        cmd.arg(host)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Running {} --authenticate for {host}", self.program);
        let mut child = cmd
            .spawn()
            .map_err(|e| ConnectionError::Auth(format!("cannot run {}: {e}", self.program)))?;

        // Both pipes are drained from the start; a helper blocked on a full
        // pipe would otherwise never exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = writeln!(stdin, "{password}")
        {
            warn!("Cannot send password to {}: {e}", self.program);
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("{} did not finish in time, killing it", self.program);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ConnectionError::Auth("login timed out".into()));
                }
                Ok(None) => thread::sleep(Duration::from_millis(100)),
                Err(e) => return Err(ConnectionError::Auth(e.to_string())),
            }
        };

        Ok(RunOutput {
            success: status.success(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(e) = pipe.read_to_end(&mut buf)
        {
            debug!("Reading helper output failed: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl AuthBackend for OpenConnectCli {
    fn authenticate(&self, host: &str, callbacks: &dyn AuthCallbacks) -> Result<AuthCookie> {
        let mut form_error = None;
        let mut servercert: Option<String> = None;
        let mut cert_asked = false;
        let mut credentials: Option<(String, String)> = None;

        loop {
            let (username, password) = match credentials.take() {
                Some(pair) => pair,
                None => {
                    let form = self.login_form(host, form_error.take());
                    match callbacks.process_auth_form(&form) {
                        FormResponse::Submit(values) => (
                            field(&values, USERNAME).to_string(),
                            field(&values, PASSWORD).to_string(),
                        ),
                        FormResponse::Cancel => return Err(ConnectionError::Canceled),
                    }
                }
            };

            callbacks.progress(ProgressLevel::Info, &format!("Contacting {host}"));
            let out = self.run(host, &username, &password, servercert.as_deref())?;
            for line in out.stderr.lines().filter(|l| !l.trim().is_empty()) {
                callbacks.progress(ProgressLevel::Debug, line.trim());
            }

            if out.success {
                let mut cookie = parse_auth_output(&out.stdout)?;
                if cookie.fingerprint.is_none() {
                    cookie.fingerprint = servercert;
                }
                return Ok(cookie);
            }

            if let Some(fingerprint) = parse_server_cert(&out.stderr) {
                if cert_asked {
                    return Err(ConnectionError::Auth(
                        "server certificate changed during login".into(),
                    ));
                }
                cert_asked = true;
                let cert = PeerCertificate {
                    host: host.to_string(),
                    fingerprint: fingerprint.clone(),
                    reason: out
                        .stderr
                        .lines()
                        .map(str::trim)
                        .find(|l| l.to_lowercase().contains("certificate"))
                        .unwrap_or("certificate verification failed")
                        .to_string(),
                };
                if !callbacks.validate_peer_cert(&cert) {
                    return Err(ConnectionError::Canceled);
                }
                servercert = Some(fingerprint);
                credentials = Some((username, password));
                continue;
            }

            let reason = last_line(&out.stderr).unwrap_or("login failed").to_string();
            callbacks.progress(ProgressLevel::Error, &reason);
            form_error = Some(reason);
        }
    }
}

fn field<'a>(values: &'a HashMap<String, String>, name: &str) -> &'a str {
    values.get(name).map(String::as_str).unwrap_or("")
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rfind(|l| !l.is_empty())
}

/// Removes shell single quoting, including the `'\''` escape.
fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        Some(inner) => inner.replace("'\\''", "'"),
        None => value.to_string(),
    }
}

/// Parses the assignments printed by `openconnect --authenticate`.
pub fn parse_auth_output(stdout: &str) -> Result<AuthCookie> {
    let mut cookie = AuthCookie::default();
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unquote(value);
        match key.trim() {
            "COOKIE" => cookie.cookie = value,
            "HOST" => cookie.host = Some(value),
            "CONNECT_URL" => cookie.connect_url = Some(value),
            "FINGERPRINT" => cookie.fingerprint = Some(value),
            "RESOLVE" => cookie.resolve = Some(value),
            _ => {}
        }
    }
    if cookie.cookie.is_empty() {
        return Err(ConnectionError::Auth("no session cookie received".into()));
    }
    Ok(cookie)
}

/// Finds the fingerprint openconnect suggests passing as `--servercert`.
pub fn parse_server_cert(stderr: &str) -> Option<String> {
    let mut words = stderr.split_whitespace();
    while let Some(word) = words.next() {
        if let Some(fp) = word.strip_prefix("--servercert=") {
            return Some(fp.to_string());
        }
        if word == "--servercert" {
            return words.next().map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_output() {
        let stdout = "POST https://vpn.example.com/\n\
            COOKIE='abc@123@def'\n\
            HOST='203.0.113.7'\n\
            CONNECT_URL='https://vpn.example.com/'\n\
            FINGERPRINT='pin-sha256:AAAA'\n\
            RESOLVE='vpn.example.com:203.0.113.7'\n";
        let cookie = parse_auth_output(stdout).unwrap();
        assert_eq!(cookie.cookie, "abc@123@def");
        assert_eq!(cookie.host.as_deref(), Some("203.0.113.7"));
        assert_eq!(cookie.connect_url.as_deref(), Some("https://vpn.example.com/"));
        assert_eq!(cookie.fingerprint.as_deref(), Some("pin-sha256:AAAA"));
        assert_eq!(cookie.resolve.as_deref(), Some("vpn.example.com:203.0.113.7"));
    }

    #[test]
    fn missing_cookie_is_an_error() {
        assert!(matches!(
            parse_auth_output("HOST='1.2.3.4'\n"),
            Err(ConnectionError::Auth(_))
        ));
    }

    #[test]
    fn unquotes_embedded_quotes() {
        assert_eq!(unquote("'it'\\''s'"), "it's");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn finds_suggested_servercert() {
        let stderr = "Server certificate verify failed: signer not found\n\
            To trust this server in future, perhaps add this to your command line:\n    \
            --servercert pin-sha256:xLSMtW3eMWk=\n";
        assert_eq!(
            parse_server_cert(stderr).as_deref(),
            Some("pin-sha256:xLSMtW3eMWk=")
        );
        assert_eq!(
            parse_server_cert("use --servercert=sha1:abcd").as_deref(),
            Some("sha1:abcd")
        );
        assert_eq!(parse_server_cert("Login failed."), None);
    }

    #[test]
    fn form_prefills_username() {
        let cli = OpenConnectCli::new().with_username("alice");
        let form = cli.login_form("vpn.example.com", None);
        assert_eq!(form.fields.len(), 2);
        assert_eq!(form.fields[0].value.as_deref(), Some("alice"));
        assert_eq!(form.title, "Log in to vpn.example.com");
    }
}
