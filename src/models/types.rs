use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const BACKEND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Opaque identifier the backend assigns to a downloaded model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Creation time as reported by the backend (no zone information).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn parse(raw: &str) -> Result<Self, chrono::ParseError> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, BACKEND_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BACKEND_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Version tags can arrive as numbers or as numeric strings.
fn version_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    let version = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("invalid version {s:?}")))?,
    };

    if version == 0 {
        return Err(serde::de::Error::custom("model versions start at 1"));
    }
    Ok(version)
}

/// Latest publishable version of a named model in the remote registry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    pub name: String,
    #[serde(deserialize_with = "version_number")]
    pub latest_version: u32,
    pub latest_version_creation: Timestamp,
}

/// A (name, version) pair materialized on the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LoadedModel {
    pub model_id: ModelId,
    pub name: String,
    #[serde(deserialize_with = "version_number")]
    pub version: u32,
    pub creation: Timestamp,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    pub model_name: String,
    pub model_version: u32,
    pub set_default: bool,
}

/// Body of a successful download. Informational only.
#[derive(Deserialize, Clone, Debug)]
pub struct FetchModelResponse {
    pub model_id: ModelId,
    pub message: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
        }
    }

    /// Visual class used when rendering the result.
    pub fn css_class(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PredictRequest<'a> {
    pub text: &'a str,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PredictResponse {
    pub prediction: Sentiment,
}
