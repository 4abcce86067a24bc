//! The `net.connman.vpn.Agent` object.

use std::collections::HashMap;

use futures::channel::mpsc::UnboundedSender;
use log::{debug, warn};
use zbus::{DBusError, interface};
use zvariant::{OwnedObjectPath, OwnedValue};

use super::request::{
    AgentRequest, ErrorAction, RequestSource, Responder, build_reply, parse_fields,
};

#[derive(Debug, DBusError)]
#[zbus(prefix = "net.connman.vpn.Agent.Error")]
pub(crate) enum VpnAgentError {
    #[zbus(error)]
    ZBus(zbus::Error),
    Canceled(String),
    Rejected(String),
    Retry(String),
}

fn canceled() -> VpnAgentError {
    VpnAgentError::Canceled("canceled by user".into())
}

/// The request was refused without asking the user.
fn rejected() -> VpnAgentError {
    VpnAgentError::Rejected("no user interface is available".into())
}

/// Forwards VPN agent calls to the UI.
///
/// OpenConnect connections ask for `OpenConnect.Cookie` here; the UI is
/// expected to run the credential bridge and answer with its result.
pub(crate) struct VpnAgent {
    tx: UnboundedSender<AgentRequest>,
}

impl VpnAgent {
    pub(crate) fn new(tx: UnboundedSender<AgentRequest>) -> Self {
        Self { tx }
    }

    fn forward(&self, request: AgentRequest) -> Result<(), VpnAgentError> {
        self.tx.unbounded_send(request).map_err(|_| {
            warn!("VPN agent request dropped, nobody is listening");
            rejected()
        })
    }
}

#[interface(name = "net.connman.vpn.Agent")]
impl VpnAgent {
    async fn release(&self) {
        debug!("VPN agent released by daemon");
        let _ = self.forward(AgentRequest::Release {
            source: RequestSource::Vpn,
        });
    }

    async fn report_error(&self, path: OwnedObjectPath, error: String) -> Result<(), VpnAgentError> {
        debug!("VPN ReportError for {}: {error}", path.as_str());
        let (responder, rx) = Responder::pair();
        self.forward(AgentRequest::ReportError {
            source: RequestSource::Vpn,
            path: path.as_str().to_string(),
            error,
            responder,
        })?;
        match rx.await {
            Ok(ErrorAction::Retry) => Err(VpnAgentError::Retry("retry".into())),
            Ok(ErrorAction::Acknowledge) => Ok(()),
            Err(_) => Err(canceled()),
        }
    }

    async fn request_input(
        &self,
        path: OwnedObjectPath,
        fields: HashMap<String, OwnedValue>,
    ) -> Result<HashMap<String, OwnedValue>, VpnAgentError> {
        let fields = parse_fields(&fields);
        debug!(
            "VPN RequestInput for {} with {} fields",
            path.as_str(),
            fields.len()
        );
        let (responder, rx) = Responder::pair();
        self.forward(AgentRequest::RequestInput {
            source: RequestSource::Vpn,
            path: path.as_str().to_string(),
            fields: fields.clone(),
            responder,
        })?;
        let answers = rx.await.map_err(|_| canceled())?;
        Ok(build_reply(&fields, &answers))
    }

    async fn cancel(&self) {
        debug!("VPN agent request canceled by daemon");
        let _ = self.forward(AgentRequest::Cancel {
            source: RequestSource::Vpn,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::constants::openconnect;
    use futures::StreamExt;
    use futures::channel::mpsc;
    use zvariant::Value;

    fn cookie_request() -> HashMap<String, OwnedValue> {
        let mut raw = HashMap::new();
        for name in [openconnect::COOKIE, openconnect::SERVER_CERT, openconnect::VPN_HOST] {
            let mut field: HashMap<String, Value<'static>> = HashMap::new();
            field.insert("Type".into(), Value::from("string"));
            field.insert("Requirement".into(), Value::from("mandatory"));
            raw.insert(
                name.to_string(),
                OwnedValue::try_from(Value::from(field)).unwrap(),
            );
        }
        raw
    }

    #[tokio::test]
    async fn cookie_requests_are_recognised() {
        let (tx, mut rx) = mpsc::unbounded();
        let agent = VpnAgent::new(tx);

        let ui = tokio::spawn(async move {
            let request = rx.next().await.unwrap();
            assert!(request.wants_openconnect_cookie());
            if let AgentRequest::RequestInput { responder, .. } = request {
                let mut answers = HashMap::new();
                answers.insert(openconnect::COOKIE.to_string(), "c00kie".to_string());
                answers.insert(openconnect::VPN_HOST.to_string(), "10.0.0.1".to_string());
                responder.respond(answers);
            }
        });

        let path = OwnedObjectPath::try_from("/net/connman/vpn/connection/work").unwrap();
        let reply = agent.request_input(path, cookie_request()).await.unwrap();
        ui.await.unwrap();
        assert_eq!(reply.len(), 2);
        assert!(reply.contains_key(openconnect::COOKIE));
    }

    #[tokio::test]
    async fn dismissed_prompt_is_canceled_and_missing_ui_rejected() {
        let (tx, mut rx) = mpsc::unbounded();
        let agent = VpnAgent::new(tx);
        let ui = tokio::spawn(async move {
            // Dropping the request drops its responder unanswered.
            drop(rx.next().await);
            rx
        });
        let path = OwnedObjectPath::try_from("/net/connman/vpn/connection/work").unwrap();
        let result = agent.request_input(path.clone(), cookie_request()).await;
        assert!(matches!(result, Err(VpnAgentError::Canceled(_))));

        drop(ui.await.unwrap());
        let result = agent.request_input(path, cookie_request()).await;
        assert!(matches!(result, Err(VpnAgentError::Rejected(_))));
    }
}
