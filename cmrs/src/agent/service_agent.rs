//! The `net.connman.Agent` object.

use std::collections::HashMap;

use futures::channel::mpsc::UnboundedSender;
use log::{debug, warn};
use zbus::{DBusError, interface};
use zvariant::{OwnedObjectPath, OwnedValue};

use super::request::{
    AgentRequest, ErrorAction, RequestSource, Responder, build_reply, parse_fields,
};

/// Errors the daemon understands as agent answers.
#[derive(Debug, DBusError)]
#[zbus(prefix = "net.connman.Agent.Error")]
pub(crate) enum AgentError {
    #[zbus(error)]
    ZBus(zbus::Error),
    Canceled(String),
    Rejected(String),
    Retry(String),
    LaunchBrowser(String),
}

fn canceled() -> AgentError {
    AgentError::Canceled("canceled by user".into())
}

/// The request was refused without asking the user.
fn rejected() -> AgentError {
    AgentError::Rejected("no user interface is available".into())
}

/// Forwards service agent calls to the UI.
pub(crate) struct ServiceAgent {
    tx: UnboundedSender<AgentRequest>,
}

impl ServiceAgent {
    pub(crate) fn new(tx: UnboundedSender<AgentRequest>) -> Self {
        Self { tx }
    }

    fn forward(&self, request: AgentRequest) -> Result<(), AgentError> {
        self.tx.unbounded_send(request).map_err(|_| {
            warn!("Agent request dropped, nobody is listening");
            rejected()
        })
    }
}

#[interface(name = "net.connman.Agent")]
impl ServiceAgent {
    async fn release(&self) {
        debug!("Agent released by daemon");
        let _ = self.forward(AgentRequest::Release {
            source: RequestSource::Service,
        });
    }

    async fn report_error(&self, service: OwnedObjectPath, error: String) -> Result<(), AgentError> {
        debug!("ReportError for {}: {error}", service.as_str());
        let (responder, rx) = Responder::pair();
        self.forward(AgentRequest::ReportError {
            source: RequestSource::Service,
            path: service.as_str().to_string(),
            error,
            responder,
        })?;
        match rx.await {
            Ok(ErrorAction::Retry) => Err(AgentError::Retry("retry".into())),
            Ok(ErrorAction::Acknowledge) => Ok(()),
            Err(_) => Err(canceled()),
        }
    }

    async fn request_browser(&self, service: OwnedObjectPath, url: String) -> Result<(), AgentError> {
        debug!("RequestBrowser for {}: {url}", service.as_str());
        let (responder, rx) = Responder::pair();
        self.forward(AgentRequest::RequestBrowser {
            path: service.as_str().to_string(),
            url,
            responder,
        })?;
        rx.await.map_err(|_| canceled())
    }

    async fn request_input(
        &self,
        service: OwnedObjectPath,
        fields: HashMap<String, OwnedValue>,
    ) -> Result<HashMap<String, OwnedValue>, AgentError> {
        let fields = parse_fields(&fields);
        debug!(
            "RequestInput for {} with {} fields",
            service.as_str(),
            fields.len()
        );
        let (responder, rx) = Responder::pair();
        self.forward(AgentRequest::RequestInput {
            source: RequestSource::Service,
            path: service.as_str().to_string(),
            fields: fields.clone(),
            responder,
        })?;
        let answers = rx.await.map_err(|_| canceled())?;
        Ok(build_reply(&fields, &answers))
    }

    async fn cancel(&self) {
        debug!("Agent request canceled by daemon");
        let _ = self.forward(AgentRequest::Cancel {
            source: RequestSource::Service,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::channel::mpsc;
    use zvariant::Value;

    fn service_path() -> OwnedObjectPath {
        OwnedObjectPath::try_from("/net/connman/service/wifi_home_psk").unwrap()
    }

    fn passphrase_request() -> HashMap<String, OwnedValue> {
        let mut field: HashMap<String, Value<'static>> = HashMap::new();
        field.insert("Type".into(), Value::from("psk"));
        field.insert("Requirement".into(), Value::from("mandatory"));
        let mut raw = HashMap::new();
        raw.insert(
            "Passphrase".to_string(),
            OwnedValue::try_from(Value::from(field)).unwrap(),
        );
        raw
    }

    #[tokio::test]
    async fn input_is_answered_through_the_channel() {
        let (tx, mut rx) = mpsc::unbounded();
        let agent = ServiceAgent::new(tx);

        let ui = tokio::spawn(async move {
            match rx.next().await {
                Some(AgentRequest::RequestInput {
                    path, responder, ..
                }) => {
                    assert_eq!(path, "/net/connman/service/wifi_home_psk");
                    let mut answers = HashMap::new();
                    answers.insert("Passphrase".to_string(), "correct horse".to_string());
                    responder.respond(answers);
                }
                other => panic!("unexpected request: {other:?}"),
            }
        });

        let reply = agent
            .request_input(service_path(), passphrase_request())
            .await
            .unwrap();
        ui.await.unwrap();
        assert!(reply.contains_key("Passphrase"));
    }

    #[tokio::test]
    async fn dropped_responder_cancels() {
        let (tx, mut rx) = mpsc::unbounded();
        let agent = ServiceAgent::new(tx);

        let ui = tokio::spawn(async move {
            let request = rx.next().await;
            drop(request);
        });

        let result = agent
            .request_input(service_path(), passphrase_request())
            .await;
        ui.await.unwrap();
        assert!(matches!(result, Err(AgentError::Canceled(_))));
    }

    #[tokio::test]
    async fn retry_maps_to_retry_error() {
        let (tx, mut rx) = mpsc::unbounded();
        let agent = ServiceAgent::new(tx);

        let ui = tokio::spawn(async move {
            if let Some(AgentRequest::ReportError { responder, .. }) = rx.next().await {
                responder.respond(ErrorAction::Retry);
            }
        });

        let result = agent
            .report_error(service_path(), "invalid-key".into())
            .await;
        ui.await.unwrap();
        assert!(matches!(result, Err(AgentError::Retry(_))));
    }

    #[tokio::test]
    async fn closed_channel_rejects_immediately() {
        let (tx, rx) = mpsc::unbounded();
        drop(rx);
        let agent = ServiceAgent::new(tx);
        let result = agent
            .request_browser(service_path(), "http://portal".into())
            .await;
        assert!(matches!(result, Err(AgentError::Rejected(_))));
    }
}
