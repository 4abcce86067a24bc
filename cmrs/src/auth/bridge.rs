//! Worker thread and rendezvous between a blocking login and the GUI.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::{debug, warn};

use super::form::{AuthCookie, AuthForm, FormResponse, PeerCertificate, ProgressLevel};
use crate::api::models::ConnectionError;
use crate::Result;

/// Questions a login backend may ask while it runs.
///
/// Every method blocks the calling thread until the user has answered.
pub trait AuthCallbacks {
    fn progress(&self, level: ProgressLevel, message: &str);

    /// Returns `true` if the user accepts the certificate.
    fn validate_peer_cert(&self, cert: &PeerCertificate) -> bool;

    fn process_auth_form(&self, form: &AuthForm) -> FormResponse;
}

/// A blocking login implementation.
pub trait AuthBackend: Send + 'static {
    fn authenticate(&self, host: &str, callbacks: &dyn AuthCallbacks) -> Result<AuthCookie>;
}

/// One-slot handoff between the GUI and the worker.
struct Rendezvous<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Rendezvous<T> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(value);
        self.ready.notify_one();
    }

    fn wait(&self) -> T {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// The GUI's half of a pending callback.
///
/// Dropping it unanswered completes the callback with its cancel answer
/// (`false`, `FormResponse::Cancel`, or `()`).
pub struct Reply<T> {
    rendezvous: Arc<Rendezvous<T>>,
    fallback: Option<T>,
}

impl<T> Reply<T> {
    fn new(rendezvous: Arc<Rendezvous<T>>, fallback: T) -> Self {
        Self {
            rendezvous,
            fallback: Some(fallback),
        }
    }

    pub fn send(mut self, value: T) {
        self.fallback = None;
        self.rendezvous.complete(value);
    }
}

impl<T> Drop for Reply<T> {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            self.rendezvous.complete(fallback);
        }
    }
}

impl<T> std::fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply")
            .field("answered", &self.fallback.is_none())
            .finish()
    }
}

/// Something the login needs from the GUI.
#[derive(Debug)]
pub enum BridgeEvent {
    Progress {
        level: ProgressLevel,
        message: String,
        reply: Reply<()>,
    },
    ValidateCert {
        cert: PeerCertificate,
        reply: Reply<bool>,
    },
    AuthForm {
        form: AuthForm,
        reply: Reply<FormResponse>,
    },
    /// The login ended; no further events follow.
    Finished(Result<AuthCookie>),
}

struct BridgeCallbacks {
    tx: UnboundedSender<BridgeEvent>,
}

impl BridgeCallbacks {
    fn ask<T>(&self, fallback: T, event: impl FnOnce(Reply<T>) -> BridgeEvent) -> T {
        let rendezvous = Arc::new(Rendezvous::new());
        let reply = Reply::new(Arc::clone(&rendezvous), fallback);
        if self.tx.unbounded_send(event(reply)).is_err() {
            // The event, and with it the reply, was dropped; the fallback is
            // already in the slot.
            debug!("Bridge receiver gone, answering with the cancel value");
        }
        rendezvous.wait()
    }
}

impl AuthCallbacks for BridgeCallbacks {
    fn progress(&self, level: ProgressLevel, message: &str) {
        self.ask((), |reply| BridgeEvent::Progress {
            level,
            message: message.to_string(),
            reply,
        });
    }

    fn validate_peer_cert(&self, cert: &PeerCertificate) -> bool {
        self.ask(false, |reply| BridgeEvent::ValidateCert {
            cert: cert.clone(),
            reply,
        })
    }

    fn process_auth_form(&self, form: &AuthForm) -> FormResponse {
        self.ask(FormResponse::Cancel, |reply| BridgeEvent::AuthForm {
            form: form.clone(),
            reply,
        })
    }
}

/// Handle on a running login.
pub struct AuthSession {
    worker: JoinHandle<()>,
}

impl AuthSession {
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the worker thread to exit.
    pub fn join(self) {
        if self.worker.join().is_err() {
            warn!("Authentication worker panicked");
        }
    }
}

pub struct AuthBridge;

impl AuthBridge {
    /// Starts `backend` against `host` on a worker thread.
    ///
    /// The receiver yields the backend's callbacks as events, followed by
    /// exactly one [`BridgeEvent::Finished`].
    pub fn start<B: AuthBackend>(
        backend: B,
        host: &str,
    ) -> Result<(AuthSession, UnboundedReceiver<BridgeEvent>)> {
        let (tx, rx) = mpsc::unbounded();
        let host = host.to_string();

        let worker = thread::Builder::new()
            .name("cmrs-auth".into())
            .spawn(move || {
                let callbacks = BridgeCallbacks { tx: tx.clone() };
                let result = backend.authenticate(&host, &callbacks);
                match &result {
                    Ok(_) => debug!("Authentication against {host} succeeded"),
                    Err(e) => debug!("Authentication against {host} failed: {e}"),
                }
                let _ = tx.unbounded_send(BridgeEvent::Finished(result));
            })
            .map_err(|e| ConnectionError::Auth(format!("failed to start worker: {e}")))?;

        Ok((AuthSession { worker }, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::executor::block_on;

    #[test]
    fn dropped_reply_completes_with_fallback() {
        let rendezvous = Arc::new(Rendezvous::new());
        let reply = Reply::new(Arc::clone(&rendezvous), 7u32);
        drop(reply);
        assert_eq!(rendezvous.wait(), 7);
    }

    #[test]
    fn sent_reply_overrides_fallback() {
        let rendezvous = Arc::new(Rendezvous::new());
        let reply = Reply::new(Arc::clone(&rendezvous), false);
        let waiter = {
            let rendezvous = Arc::clone(&rendezvous);
            thread::spawn(move || rendezvous.wait())
        };
        reply.send(true);
        assert!(waiter.join().unwrap());
    }

    struct Echo;

    impl AuthBackend for Echo {
        fn authenticate(&self, host: &str, callbacks: &dyn AuthCallbacks) -> Result<AuthCookie> {
            callbacks.progress(ProgressLevel::Info, "hello");
            match callbacks.process_auth_form(&AuthForm::default()) {
                FormResponse::Submit(values) => Ok(AuthCookie {
                    cookie: values.get("token").cloned().unwrap_or_default(),
                    host: Some(host.to_string()),
                    ..Default::default()
                }),
                FormResponse::Cancel => Err(ConnectionError::Canceled),
            }
        }
    }

    #[test]
    fn events_arrive_in_order() {
        let (session, mut rx) = AuthBridge::start(Echo, "gw").unwrap();
        block_on(async {
            match rx.next().await {
                Some(BridgeEvent::Progress { message, reply, .. }) => {
                    assert_eq!(message, "hello");
                    reply.send(());
                }
                other => panic!("expected progress, got {other:?}"),
            }
            match rx.next().await {
                Some(BridgeEvent::AuthForm { reply, .. }) => {
                    let mut values = std::collections::HashMap::new();
                    values.insert("token".to_string(), "t0k".to_string());
                    reply.send(FormResponse::Submit(values));
                }
                other => panic!("expected form, got {other:?}"),
            }
            match rx.next().await {
                Some(BridgeEvent::Finished(Ok(cookie))) => {
                    assert_eq!(cookie.cookie, "t0k");
                    assert_eq!(cookie.host.as_deref(), Some("gw"));
                }
                other => panic!("expected success, got {other:?}"),
            }
            assert!(rx.next().await.is_none());
        });
        session.join();
    }

    #[test]
    fn closed_receiver_cancels_every_prompt() {
        let (session, rx) = AuthBridge::start(Echo, "gw").unwrap();
        drop(rx);
        session.join();
    }
}
