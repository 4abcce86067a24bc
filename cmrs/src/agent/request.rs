//! Agent requests, input fields and replies.

use std::collections::HashMap;

use futures::channel::oneshot;
use zvariant::{OwnedValue, Value};

use crate::api::properties::PropertyMap;
use crate::types::constants::openconnect;

/// Which agent received a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// `net.connman.Agent`, for services.
    Service,
    /// `net.connman.vpn.Agent`, for VPN connections.
    Vpn,
}

/// Value type of a requested field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Psk,
    Wep,
    Passphrase,
    Response,
    Ssid,
    WpsPin,
    String,
    Password,
    Other(std::string::String),
}

impl From<&str> for FieldType {
    fn from(s: &str) -> Self {
        match s {
            "psk" => Self::Psk,
            "wep" => Self::Wep,
            "passphrase" => Self::Passphrase,
            "response" => Self::Response,
            "ssid" => Self::Ssid,
            "wpspin" => Self::WpsPin,
            "string" => Self::String,
            "password" => Self::Password,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FieldType {
    /// Whether the entry should mask its text.
    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            Self::Psk | Self::Wep | Self::Passphrase | Self::Response | Self::WpsPin | Self::Password
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    Mandatory,
    Optional,
    /// May be answered instead of one of the fields listing it in `Alternates`.
    Alternate,
    /// Display only; carries a `Value` and expects no answer.
    Informational,
}

impl From<&str> for Requirement {
    fn from(s: &str) -> Self {
        match s {
            "mandatory" => Self::Mandatory,
            "alternate" => Self::Alternate,
            "informational" => Self::Informational,
            _ => Self::Optional,
        }
    }
}

/// One field of a `RequestInput` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub name: String,
    pub kind: FieldType,
    pub requirement: Requirement,
    pub alternates: Vec<String>,
    pub value: Option<String>,
}

impl InputField {
    pub fn from_map(name: &str, map: &PropertyMap) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldType::from(map.str("Type").unwrap_or("string")),
            requirement: Requirement::from(map.str("Requirement").unwrap_or("optional")),
            alternates: map.str_list("Alternates"),
            value: map.str("Value").map(str::to_string),
        }
    }

    pub fn is_informational(&self) -> bool {
        self.requirement == Requirement::Informational
    }
}

/// Parses the `fields` argument of `RequestInput`.
///
/// Informational fields come first, then the rest ordered by requirement
/// and name, so dialogs are laid out the same way for identical requests.
pub fn parse_fields(raw: &HashMap<String, OwnedValue>) -> Vec<InputField> {
    let table = PropertyMap::from_dbus(raw);
    let mut fields: Vec<InputField> = table
        .keys()
        .filter_map(|name| table.dict(name).map(|map| InputField::from_map(name, map)))
        .collect();
    fields.sort_by(|a, b| {
        b.is_informational()
            .cmp(&a.is_informational())
            .then(a.requirement.cmp(&b.requirement))
            .then(a.name.cmp(&b.name))
    });
    fields
}

/// Encodes the user's answers for a `RequestInput` reply.
///
/// Empty answers and informational fields are left out. `SSID` answers are
/// sent as bytes, everything else as strings.
pub fn build_reply(
    fields: &[InputField],
    answers: &HashMap<String, String>,
) -> HashMap<String, OwnedValue> {
    let mut reply = HashMap::new();
    for field in fields.iter().filter(|f| !f.is_informational()) {
        let Some(answer) = answers.get(&field.name).filter(|a| !a.is_empty()) else {
            continue;
        };
        let value = match field.kind {
            FieldType::Ssid => Value::from(answer.as_bytes().to_vec()),
            _ => Value::from(answer.clone()),
        };
        if let Ok(owned) = OwnedValue::try_from(value) {
            reply.insert(field.name.clone(), owned);
        }
    }
    reply
}

/// The user's decision after `ReportError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Ask the daemon to retry the connection.
    Retry,
    /// Acknowledge; the daemon gives up.
    Acknowledge,
}

/// One-shot reply handle for a pending agent call.
///
/// Dropping it without calling [`respond`](Self::respond) answers the
/// daemon with `Canceled`.
#[derive(Debug)]
pub struct Responder<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Responder<T> {
    pub(crate) fn pair() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn respond(self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// A daemon-initiated prompt waiting for the user.
#[derive(Debug)]
pub enum AgentRequest {
    /// Credentials or a network name are needed for `path`.
    RequestInput {
        source: RequestSource,
        path: String,
        fields: Vec<InputField>,
        responder: Responder<HashMap<String, String>>,
    },
    /// A connection attempt on `path` failed with `error`.
    ReportError {
        source: RequestSource,
        path: String,
        error: String,
        responder: Responder<ErrorAction>,
    },
    /// A captive portal wants the user to open `url`.
    RequestBrowser {
        path: String,
        url: String,
        responder: Responder<()>,
    },
    /// The daemon cancelled its pending request.
    Cancel { source: RequestSource },
    /// The daemon dropped the agent registration.
    Release { source: RequestSource },
}

impl AgentRequest {
    /// Whether this is a VPN request only an OpenConnect login can answer.
    pub fn wants_openconnect_cookie(&self) -> bool {
        match self {
            Self::RequestInput { source, fields, .. } => {
                *source == RequestSource::Vpn
                    && fields.iter().any(|f| f.name == openconnect::COOKIE)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::properties::PropValue;

    fn field(kind: &str, requirement: &str) -> OwnedValue {
        let mut map: HashMap<String, Value<'static>> = HashMap::new();
        map.insert("Type".into(), Value::from(kind.to_string()));
        map.insert("Requirement".into(), Value::from(requirement.to_string()));
        OwnedValue::try_from(Value::from(map)).unwrap()
    }

    fn wifi_request() -> HashMap<String, OwnedValue> {
        let mut raw = HashMap::new();
        raw.insert("Passphrase".to_string(), field("psk", "mandatory"));
        raw.insert("WPS".to_string(), field("wpspin", "alternate"));
        raw.insert("Name".to_string(), field("string", "optional"));
        raw
    }

    #[test]
    fn parses_and_orders_fields() {
        let fields = parse_fields(&wifi_request());
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Passphrase", "Name", "WPS"]);
        assert_eq!(fields[0].kind, FieldType::Psk);
        assert!(fields[0].kind.is_secret());
        assert!(!fields[1].kind.is_secret());
        assert_eq!(fields[2].requirement, Requirement::Alternate);
    }

    #[test]
    fn unknown_types_are_preserved() {
        assert_eq!(FieldType::from("otp"), FieldType::Other("otp".into()));
        assert_eq!(Requirement::from("whatever"), Requirement::Optional);
    }

    #[test]
    fn reply_skips_empty_and_informational() {
        let fields = vec![
            InputField {
                name: "Passphrase".into(),
                kind: FieldType::Psk,
                requirement: Requirement::Mandatory,
                alternates: vec![],
                value: None,
            },
            InputField {
                name: "Name".into(),
                kind: FieldType::String,
                requirement: Requirement::Optional,
                alternates: vec![],
                value: None,
            },
            InputField {
                name: "Host".into(),
                kind: FieldType::String,
                requirement: Requirement::Informational,
                alternates: vec![],
                value: Some("vpn.example.com".into()),
            },
        ];
        let mut answers = HashMap::new();
        answers.insert("Passphrase".to_string(), "hunter22".to_string());
        answers.insert("Name".to_string(), String::new());
        answers.insert("Host".to_string(), "ignored".to_string());

        let reply = build_reply(&fields, &answers);
        assert_eq!(reply.len(), 1);
        assert_eq!(
            PropValue::from_value(&reply["Passphrase"]),
            PropValue::Str("hunter22".into())
        );
    }

    #[test]
    fn ssid_is_sent_as_bytes() {
        let fields = vec![InputField {
            name: "SSID".into(),
            kind: FieldType::Ssid,
            requirement: Requirement::Mandatory,
            alternates: vec![],
            value: None,
        }];
        let mut answers = HashMap::new();
        answers.insert("SSID".to_string(), "cafe".to_string());
        let reply = build_reply(&fields, &answers);
        assert!(matches!(&*reply["SSID"], Value::Array(bytes) if bytes.len() == 4));
    }

    #[tokio::test]
    async fn dropped_responder_is_observed() {
        let (responder, rx) = Responder::<ErrorAction>::pair();
        drop(responder);
        assert!(rx.await.is_err());
    }
}
