//! Types for the data channel between the watch and its paired phone. The
//! channel itself belongs to the host platform; we only see it through
//! [PeerChannel].

use anyhow::{anyhow, Context};
use chrono::{DateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Path of the weather payload pushed by the phone
pub const WEATHER_PATH: &str = "/wx";
/// Path of the payload we push to ask the phone for weather
pub const BUMP_PATH: &str = "/watch_bump";
/// Key of the timestamp inside the bump payload
pub const BUMP_DATE_KEY: &str = "DateTime";

/// A single value in a [DataMap]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Int(i64),
    String(String),
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// Key/value payload attached to a data item. Insertion order is kept so
/// logged payloads read the way they were sent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataMap(IndexMap<String, DataValue>);

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: DataValue) {
        self.0.insert(key.into(), value);
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.put(key, DataValue::Int(value));
    }

    pub fn put_string(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.put(key, DataValue::String(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.0.get(key)
    }

    /// Get an integer field. Missing keys and non-integer values are errors
    pub fn get_int(&self, key: &str) -> anyhow::Result<i64> {
        match self.get(key).with_context(|| format!("Missing key `{key}`"))? {
            DataValue::Int(value) => Ok(*value),
            other => Err(anyhow!("Expected integer for `{key}`, got {other}")),
        }
    }

    /// Get a string field. Missing keys and non-string values are errors
    pub fn get_string(&self, key: &str) -> anyhow::Result<&str> {
        match self.get(key).with_context(|| format!("Missing key `{key}`"))? {
            DataValue::String(value) => Ok(value),
            other => Err(anyhow!("Expected string for `{key}`, got {other}")),
        }
    }
}

impl Display for DataMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEventKind {
    #[default]
    Changed,
    Deleted,
}

/// One change notification delivered by the channel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataEvent {
    #[serde(default)]
    pub kind: DataEventKind,
    pub path: String,
    #[serde(default)]
    pub data: DataMap,
}

impl DataEvent {
    pub fn changed(path: impl Into<String>, data: DataMap) -> Self {
        Self {
            kind: DataEventKind::Changed,
            path: path.into(),
            data,
        }
    }
}

/// Outbound data item
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PutDataRequest {
    pub path: String,
    pub data: DataMap,
    /// Ask the platform to deliver right away rather than batching
    pub urgent: bool,
}

impl PutDataRequest {
    /// The one-shot payload that prompts the phone to push its weather. The
    /// phone only pushes on change, so without this a freshly started face
    /// would never see data.
    pub fn bump<Tz: TimeZone>(now: DateTime<Tz>) -> Self
    where
        Tz::Offset: Display,
    {
        let mut data = DataMap::new();
        data.put_string(
            BUMP_DATE_KEY,
            now.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        Self {
            path: BUMP_PATH.into(),
            data,
            urgent: true,
        }
    }
}

/// The platform's peer data channel. Every call is fire-and-forget;
/// connection results come back later through the engine's connection
/// callbacks.
pub trait PeerChannel {
    /// Start connecting. Completion is reported via `on_connected` or
    /// `on_connection_failed`
    fn connect(&mut self);

    fn disconnect(&mut self);

    /// Subscribe to data change events
    fn add_listener(&mut self);

    fn remove_listener(&mut self);

    /// Publish a data item to the peer
    fn put_data_item(&mut self, request: PutDataRequest) -> anyhow::Result<()>;
}
