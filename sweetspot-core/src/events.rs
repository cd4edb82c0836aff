//! Inbound event envelopes and their validated form.
//!
//! Transports deliver an event name, an optional subtype tag for multiplexed
//! channels, and a loosely shaped body. [`ExperimentEvent::from_envelope`]
//! turns that into a tagged event before the router touches any state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::SearchSpaceDescriptor;
use crate::error::{Error, Result};
use crate::info::LogLevel;
use crate::types::{ExperimentId, ParamValue};

/// Raw event as received from a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Experiment generation this event belongs to, if the transport tags it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentId>,
    #[serde(default)]
    pub body: Value,
}

impl EventEnvelope {
    pub fn new(event: impl Into<String>, body: Value) -> Self {
        Self {
            event: event.into(),
            subtype: None,
            experiment: None,
            body,
        }
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    #[must_use]
    pub fn with_experiment(mut self, experiment: ExperimentId) -> Self {
        self.experiment = Some(experiment);
        self
    }
}

/// Logical event kinds after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Description,
    Default,
    New,
    Final,
    Predictions,
    Log,
}

impl EventKind {
    /// Resolve an event name and subtype, accepting both the logical names
    /// (`new-configuration`) and multiplexed channels (`new` + `configuration`,
    /// `task` + `new`). Matching ignores case.
    #[must_use]
    pub fn resolve(event: &str, subtype: Option<&str>) -> Option<Self> {
        let event = event.to_ascii_lowercase();
        let subtype = subtype.map(str::to_ascii_lowercase);

        let kind = match (event.as_str(), subtype.as_deref()) {
            ("experiment-description", _) => Self::Description,
            ("experiment", None | Some("description")) => Self::Description,
            ("default-configuration", _) => Self::Default,
            ("default", None | Some("configuration")) | ("task", Some("default")) => Self::Default,
            ("new-configuration", _) => Self::New,
            ("new", None | Some("configuration")) | ("task", Some("new")) => Self::New,
            ("final-configuration", _) => Self::Final,
            ("final", None | Some("configuration")) | ("task", Some("final")) => Self::Final,
            ("predictions", None | Some("configuration")) | ("task", Some("predictions")) => {
                Self::Predictions
            }
            ("log", _) => Self::Log,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "experiment-description",
            Self::Default => "default-configuration",
            Self::New => "new-configuration",
            Self::Final => "final-configuration",
            Self::Predictions => "predictions",
            Self::Log => "log",
        }
    }

    /// Whether events of this kind carry configuration entries.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Default | Self::New | Self::Final | Self::Predictions
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an experiment-description event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionPayload {
    #[serde(default)]
    pub global_configuration: Value,
    #[serde(default)]
    pub experiment_description: Value,
    #[serde(default)]
    pub searchspace_description: Value,
}

/// One `{ configurations, results }` entry of a configuration event.
///
/// Both fields stay raw until they are resolved against a descriptor, since
/// their accepted shapes depend on the declared parameters and objectives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    pub configurations: Value,
    pub results: Value,
}

impl ConfigurationEntry {
    /// Resolve the configuration into a tuple in declared parameter order.
    ///
    /// A positional array must match the parameter count. An object keyed by
    /// parameter name may omit parameters (they become the None sentinel) but
    /// may not name undeclared ones.
    pub fn tuple(&self, descriptor: &SearchSpaceDescriptor) -> Result<Vec<ParamValue>> {
        let expected = descriptor.parameters().len();
        match &self.configurations {
            Value::Array(values) => {
                if values.len() != expected {
                    return Err(Error::SchemaMismatch {
                        expected,
                        actual: values.len(),
                    });
                }
                values.iter().map(ParamValue::from_json).collect()
            }
            Value::Object(map) => {
                if map.keys().any(|k| descriptor.parameter(k).is_none()) {
                    return Err(Error::SchemaMismatch {
                        expected,
                        actual: map.len(),
                    });
                }
                descriptor
                    .parameter_names()
                    .map(|name| map.get(name).map_or(Ok(ParamValue::Missing), ParamValue::from_json))
                    .collect()
            }
            Value::Null => Err(Error::EmptyPayload("entry has no configurations".to_string())),
            other => Err(Error::MalformedPayload(format!(
                "configurations must be a list or object, got {other}"
            ))),
        }
    }

    /// Resolve the results into declared objective order.
    ///
    /// A bare scalar is accepted as the single result column.
    pub fn result_values(&self, descriptor: &SearchSpaceDescriptor) -> Result<Vec<Value>> {
        match &self.results {
            Value::Array(values) => Ok(values.clone()),
            Value::Object(map) => Ok(descriptor
                .objectives()
                .iter()
                .map(|name| map.get(name).cloned().unwrap_or(Value::Null))
                .collect()),
            Value::Null => Err(Error::EmptyPayload("entry has no results".to_string())),
            scalar => Ok(vec![scalar.clone()]),
        }
    }
}

/// A validated event.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentEvent {
    /// Full reset with a new search space
    Description(DescriptionPayload),
    /// Baseline measurement(s)
    Default(Vec<ConfigurationEntry>),
    /// Incremental measurement(s)
    New(Vec<ConfigurationEntry>),
    /// Optimizer-designated final point(s)
    Final(Vec<ConfigurationEntry>),
    /// Model predictions, projection only
    Predictions(Vec<ConfigurationEntry>),
    /// Informational message passed through for display
    Log { level: LogLevel, message: String },
}

impl ExperimentEvent {
    /// Validate an envelope into an event without touching any state.
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self> {
        let kind = EventKind::resolve(&envelope.event, envelope.subtype.as_deref()).ok_or_else(
            || Error::UnknownEvent {
                event: envelope.event.clone(),
                subtype: envelope.subtype.clone(),
            },
        )?;

        match kind {
            EventKind::Log => {
                let level = envelope
                    .subtype
                    .as_deref()
                    .and_then(LogLevel::parse)
                    .unwrap_or(LogLevel::Info);
                Ok(Self::Log {
                    level,
                    message: log_message(&envelope.body),
                })
            }
            EventKind::Description => {
                parse_description(decode_body(&envelope.body)?).map(Self::Description)
            }
            EventKind::Default => parse_entries(decode_body(&envelope.body)?).map(Self::Default),
            EventKind::New => parse_entries(decode_body(&envelope.body)?).map(Self::New),
            EventKind::Final => parse_entries(decode_body(&envelope.body)?).map(Self::Final),
            EventKind::Predictions => {
                parse_entries(decode_body(&envelope.body)?).map(Self::Predictions)
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Description(_) => EventKind::Description,
            Self::Default(_) => EventKind::Default,
            Self::New(_) => EventKind::New,
            Self::Final(_) => EventKind::Final,
            Self::Predictions(_) => EventKind::Predictions,
            Self::Log { .. } => EventKind::Log,
        }
    }
}

/// Transports may deliver the body as JSON text.
fn decode_body(body: &Value) -> Result<Value> {
    match body {
        Value::String(text) => Ok(serde_json::from_str(text)?),
        other => Ok(other.clone()),
    }
}

fn log_message(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => body.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_description(body: Value) -> Result<DescriptionPayload> {
    if !body.is_object() {
        return Err(Error::EmptyPayload(
            "experiment description must be an object".to_string(),
        ));
    }
    let payload: DescriptionPayload = serde_json::from_value(body)?;
    if payload.experiment_description.is_null() {
        return Err(Error::EmptyPayload(
            "experiment_description is missing".to_string(),
        ));
    }
    if payload.searchspace_description.is_null() {
        return Err(Error::EmptyPayload(
            "searchspace_description is missing".to_string(),
        ));
    }
    Ok(payload)
}

fn parse_entries(body: Value) -> Result<Vec<ConfigurationEntry>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => return Err(Error::EmptyPayload("event has no body".to_string())),
        single @ Value::Object(_) => vec![single],
        other => {
            return Err(Error::MalformedPayload(format!(
                "configuration event body must be a list or object, got {other}"
            )));
        }
    };
    if items.is_empty() {
        return Err(Error::EmptyPayload("event has no entries".to_string()));
    }
    items.into_iter().map(parse_entry).collect()
}

fn parse_entry(item: Value) -> Result<ConfigurationEntry> {
    let Value::Object(mut map) = item else {
        return Err(if item.is_null() {
            Error::EmptyPayload("event contains a null entry".to_string())
        } else {
            Error::MalformedPayload(format!("entry must be an object, got {item}"))
        });
    };

    let configurations = map.remove("configurations").unwrap_or(Value::Null);
    if configurations.is_null() {
        return Err(Error::EmptyPayload(
            "entry is missing configurations".to_string(),
        ));
    }
    let results = map.remove("results").unwrap_or(Value::Null);
    if results.is_null() {
        return Err(Error::EmptyPayload("entry is missing results".to_string()));
    }
    Ok(ConfigurationEntry {
        configurations,
        results,
    })
}
