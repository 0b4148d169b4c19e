//! Response envelope
//!
//! Every call answers with a JSON document that carries exactly one of:
//! a single result under `inventory`, a sequence under `inventories`,
//! or a job pointer under `location`.

use crate::error::{Result, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;

const INVENTORY: &str = "inventory";
const INVENTORIES: &str = "inventories";
const LOCATION: &str = "location";

/// What an envelope carries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeKind<'a> {
    /// Singular result
    Inventory(&'a Value),
    /// Sequence of results (one page of a collection)
    Inventories(&'a [Value]),
    /// Asynchronous job to poll
    Job(&'a str),
    /// No recognised payload (e.g. a bare delete acknowledgement)
    Empty,
}

/// Parsed response document together with its HTTP status
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    status: u16,
    body: Value,
}

impl Envelope {
    /// Wrap a parsed body
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// HTTP status the envelope arrived with
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw JSON body
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the envelope and return the raw JSON body
    pub fn into_body(self) -> Value {
        self.body
    }

    /// Classify the payload
    pub fn kind(&self) -> EnvelopeKind<'_> {
        if let Some(location) = self.location() {
            return EnvelopeKind::Job(location);
        }
        if let Some(items) = self.body.get(INVENTORIES).and_then(Value::as_array) {
            return EnvelopeKind::Inventories(items);
        }
        match self.body.get(INVENTORY) {
            Some(inventory) => EnvelopeKind::Inventory(inventory),
            None => EnvelopeKind::Empty,
        }
    }

    /// Job location, if the call was accepted asynchronously
    pub fn location(&self) -> Option<&str> {
        self.body.get(LOCATION).and_then(Value::as_str)
    }

    /// String value at a nested key path, e.g. `["inventory", "uuid"]`
    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        path.iter()
            .try_fold(&self.body, |value, key| value.get(*key))
            .and_then(Value::as_str)
    }

    /// Deserialize the singular result
    pub fn inventory<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self
            .body
            .get(INVENTORY)
            .ok_or_else(|| missing(INVENTORY))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Take the sequence of results out of the envelope
    pub fn into_inventories(self) -> std::result::Result<Vec<Value>, TransportError> {
        match self.body {
            Value::Object(mut map) => match map.remove(INVENTORIES) {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(missing(INVENTORIES)),
            },
            _ => Err(missing(INVENTORIES)),
        }
    }
}

fn missing(field: &str) -> TransportError {
    TransportError::MissingField {
        field: field.to_string(),
    }
}
