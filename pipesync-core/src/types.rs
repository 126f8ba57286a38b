//! Domain types for pipeline synchronisation.
//!
//! Documents returned by the registry are only partially known. Each struct
//! types the fields this crate inspects and keeps everything else in an
//! `extra` bag (`#[serde(flatten)]`, insertion-ordered), so a decode/encode
//! cycle never drops a field.

use std::collections::BTreeMap;
use std::fmt;
use std::num::ParseIntError;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Untyped remainder of a partially-typed document.
pub type Extra = Map<String, Value>;

/// Lists the registry may send as `null`; read as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed pipeline name. Immutable once the pipeline exists remotely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PipelineName(pub String);

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PipelineName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PipelineName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed environment name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvironmentName(pub String);

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvironmentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironmentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Pipeline group a new pipeline is created in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupName(pub String);

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for GroupName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GroupName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque version marker (the registry's `ETag`).
///
/// Required on conditional updates. An empty token means the pipeline does
/// not exist remotely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConcurrencyToken(pub String);

impl ConcurrencyToken {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ConcurrencyToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Pipeline document
// ---------------------------------------------------------------------------

/// A pipeline-level environment variable.
///
/// `value` is meaningful when `secure` is false, `encrypted_value` when it is
/// true. Use [`EnvironmentVariable::set_plain`] / [`EnvironmentVariable::set_secret`]
/// to change one without breaking that pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_value: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl EnvironmentVariable {
    pub fn plain(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secure: false,
            value: Some(value.into()),
            encrypted_value: None,
            extra: Extra::new(),
        }
    }

    /// Replace the value with a plain-text one and clear any ciphertext.
    pub fn set_plain(&mut self, value: impl Into<String>) {
        self.secure = false;
        self.value = Some(value.into());
        self.encrypted_value = None;
    }

    /// Mark the variable secure with a new clear-text secret.
    ///
    /// The registry encrypts `value` on write; the stale ciphertext is
    /// cleared so it cannot shadow the new secret.
    pub fn set_secret(&mut self, value: impl Into<String>) {
        self.secure = true;
        self.value = Some(value.into());
        self.encrypted_value = None;
    }

    /// The side of the value pair that is meaningful for this variable.
    pub fn effective_value(&self) -> Option<&str> {
        if self.secure {
            self.encrypted_value.as_deref().or(self.value.as_deref())
        } else {
            self.value.as_deref()
        }
    }
}

/// A pipeline definition: typed envelope plus the untouched remainder
/// (label template, materials, stages, timer, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: PipelineName,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Pipeline {
    pub fn new(name: impl Into<PipelineName>) -> Self {
        Self {
            name: name.into(),
            environment_variables: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn env_var(&self, name: &str) -> Option<&EnvironmentVariable> {
        self.environment_variables.iter().find(|v| v.name == name)
    }

    pub fn env_var_mut(&mut self, name: &str) -> Option<&mut EnvironmentVariable> {
        self.environment_variables.iter_mut().find(|v| v.name == name)
    }

    /// Names of the stages declared in the document, in declaration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.extra
            .get("stages")
            .and_then(Value::as_array)
            .map(|stages| {
                stages
                    .iter()
                    .filter_map(|s| s.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// Reference to a pipeline inside an environment's membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRef {
    pub name: PipelineName,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A registry-side grouping of pipelines and scoped variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: EnvironmentName,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pipelines: Vec<PipelineRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Environment {
    pub fn contains(&self, pipeline: &PipelineName) -> bool {
        self.pipelines.iter().any(|p| &p.name == pipeline)
    }
}

/// Wire envelope of the environment listing: `{"_embedded": {"environments": [..]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentList {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedEnvironments,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbeddedEnvironments {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub environments: Vec<Environment>,
}

impl EnvironmentList {
    pub fn into_environments(self) -> Vec<Environment> {
        self.embedded.environments
    }
}

// ---------------------------------------------------------------------------
// Run history
// ---------------------------------------------------------------------------

/// Stage counter as reported by the history endpoint.
///
/// The registry sends these as strings; a bare integer is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageCounter {
    Number(u64),
    Text(String),
}

impl StageCounter {
    pub fn parse(&self) -> Result<u64, ParseIntError> {
        match self {
            StageCounter::Number(n) => Ok(*n),
            StageCounter::Text(s) => s.trim().parse(),
        }
    }
}

impl fmt::Display for StageCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageCounter::Number(n) => n.fmt(f),
            StageCounter::Text(s) => s.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRun {
    pub name: String,
    pub counter: StageCounter,
}

/// One execution of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub counter: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stages: Vec<StageRun>,
}

/// Run history, most recent first (registry ordering).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunHistory {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pipelines: Vec<RunEntry>,
}

/// Latest run counters keyed by `p_<pipeline>` and `s_<stage>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunCounters(pub BTreeMap<String, u64>);

impl RunCounters {
    pub fn pipeline_key(pipeline: &str) -> String {
        format!("p_{pipeline}")
    }

    pub fn stage_key(stage: &str) -> String {
        format!("s_{stage}")
    }

    pub fn insert_pipeline(&mut self, pipeline: &str, counter: u64) {
        self.0.insert(Self::pipeline_key(pipeline), counter);
    }

    pub fn insert_stage(&mut self, stage: &str, counter: u64) {
        self.0.insert(Self::stage_key(stage), counter);
    }

    pub fn pipeline(&self, pipeline: &str) -> Option<u64> {
        self.0.get(&Self::pipeline_key(pipeline)).copied()
    }

    pub fn stage(&self, stage: &str) -> Option<u64> {
        self.0.get(&Self::stage_key(stage)).copied()
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_lists_read_as_empty() {
        let pipeline: Pipeline =
            serde_json::from_value(json!({"name": "a", "environment_variables": null})).unwrap();
        assert!(pipeline.environment_variables.is_empty());

        let env: Environment = serde_json::from_value(
            json!({"name": "qa", "pipelines": null, "environment_variables": null}),
        )
        .unwrap();
        assert!(env.pipelines.is_empty());

        let history: RunHistory =
            serde_json::from_value(json!({"pipelines": [{"counter": 1, "stages": null}]})).unwrap();
        assert!(history.pipelines[0].stages.is_empty());
    }

    #[test]
    fn newtype_display() {
        assert_eq!(PipelineName::from("build").to_string(), "build");
        assert_eq!(EnvironmentName::from("staging").to_string(), "staging");
        assert_eq!(GroupName::from("Dev").to_string(), "Dev");
    }

    #[test]
    fn default_token_is_empty() {
        assert!(ConcurrencyToken::default().is_empty());
        assert!(!ConcurrencyToken::from("\"abc\"").is_empty());
    }

    #[test]
    fn set_secret_clears_stale_ciphertext() {
        let mut var = EnvironmentVariable {
            name: "TOKEN".into(),
            secure: true,
            value: None,
            encrypted_value: Some("AES:old".into()),
            extra: Extra::new(),
        };
        var.set_secret("hunter2");
        assert!(var.secure);
        assert_eq!(var.value.as_deref(), Some("hunter2"));
        assert!(var.encrypted_value.is_none());
    }

    #[test]
    fn set_plain_drops_secure_flag() {
        let mut var = EnvironmentVariable::plain("MODE", "a");
        var.set_secret("s");
        var.set_plain("b");
        assert!(!var.secure);
        assert_eq!(var.effective_value(), Some("b"));
        assert!(var.encrypted_value.is_none());
    }

    #[test]
    fn effective_value_prefers_ciphertext_when_secure() {
        let var = EnvironmentVariable {
            name: "K".into(),
            secure: true,
            value: None,
            encrypted_value: Some("AES:x".into()),
            extra: Extra::new(),
        };
        assert_eq!(var.effective_value(), Some("AES:x"));
    }

    #[test]
    fn stage_counter_accepts_text_and_number() {
        let text: StageCounter = serde_json::from_value(json!("3")).unwrap();
        let number: StageCounter = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(text.parse().unwrap(), 3);
        assert_eq!(number.parse().unwrap(), 4);
    }

    #[test]
    fn stage_counter_rejects_garbage() {
        assert!(StageCounter::Text("three".into()).parse().is_err());
    }

    #[test]
    fn run_counters_keys() {
        let mut counters = RunCounters::default();
        counters.insert_pipeline("build", 7);
        counters.insert_stage("compile", 3);
        assert_eq!(counters.get("p_build"), Some(7));
        assert_eq!(counters.get("s_compile"), Some(3));
        assert_eq!(counters.pipeline("build"), Some(7));
        assert_eq!(counters.stage("missing"), None);
        assert_eq!(counters.len(), 2);
    }

    #[test]
    fn environment_contains_pipeline() {
        let env: Environment = serde_json::from_value(json!({
            "name": "staging",
            "pipelines": [{"name": "build", "_links": {}}],
            "agents": []
        }))
        .unwrap();
        assert!(env.contains(&PipelineName::from("build")));
        assert!(!env.contains(&PipelineName::from("deploy")));
        assert!(env.extra.contains_key("agents"));
    }

    #[test]
    fn stage_names_read_from_extra() {
        let pipeline: Pipeline = serde_json::from_value(json!({
            "name": "build",
            "stages": [{"name": "compile"}, {"name": "test"}]
        }))
        .unwrap();
        assert_eq!(pipeline.stage_names(), vec!["compile", "test"]);
    }
}
