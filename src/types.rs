use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of steps previewed on a blueprint card.
pub const STEP_PREVIEW_LIMIT: usize = 5;

/// What a taught step does when replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Click,
    Type,
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Other(s) => s,
        }
    }
}

impl From<String> for ActionKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "click" => ActionKind::Click,
            "type" => ActionKind::Type,
            _ => ActionKind::Other(value),
        }
    }
}

impl From<ActionKind> for String {
    fn from(value: ActionKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded step of a blueprint, as stored by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Step {
    /// `CLICK: Search button`, falling back to the typed text, then `?`.
    pub fn caption(&self) -> String {
        let target = [&self.semantic_target, &self.text]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("?");
        format!("{}: {}", self.action.as_str().to_uppercase(), target)
    }
}

/// The step list of a blueprint. Steps that do not parse are left out
/// rather than failing the whole row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateGraph {
    #[serde(default, deserialize_with = "readable_steps")]
    pub steps: Vec<Step>,
}

/// A recorded workflow. Step order is the teaching order and is never
/// changed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "readable_graph")]
    pub state_graph_json: Option<StateGraph>,
}

impl Blueprint {
    pub fn steps(&self) -> &[Step] {
        self.state_graph_json
            .as_ref()
            .map(|graph| graph.steps.as_slice())
            .unwrap_or(&[])
    }

    pub fn created_date(&self) -> String {
        self.created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// The `id, name` projection used by pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintSummary {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBlueprint {
    pub name: String,
}

fn readable_steps<'de, D>(deserializer: D) -> Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A graph that is not an object reads as no graph.
fn readable_graph<'de, D>(deserializer: D) -> Result<Option<StateGraph>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Store ids are opaque; accept both text and numeric keys.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Status of one execution view. Lives in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Idle,
    Starting,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Idle => "IDLE",
            RunStatus::Starting => "STARTING",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Error => "ERROR",
        }
    }

    /// A run in this state is still talking to the orchestrator.
    pub fn is_active(self) -> bool {
        matches!(self, RunStatus::Starting | RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /v1/teach/action`. Coordinates are in the native frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachAction {
    pub blueprint_id: String,
    pub action: ActionKind,
    pub label: String,
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeachReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub step_added: Option<Step>,
}

/// Body of `POST /v1/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub blueprint_id: String,
    pub start_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Screenshot {
    pub image_base64: String,
}

impl Screenshot {
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.image_base64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorHealth {
    pub status: String,
    #[serde(default)]
    pub inactive_seconds: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blueprint_with_steps_keeps_recorded_order() {
        let bp: Blueprint = serde_json::from_value(json!({
            "id": "7d7c",
            "name": "Login flow",
            "created_at": "2025-03-01T10:15:00.123456+00:00",
            "state_graph_json": {"steps": [
                {"step": 1, "action": "click", "semantic_target": "Sign in"},
                {"step": 2, "action": "type", "semantic_target": "", "text": "hunter2"},
                {"step": 3, "action": "scroll"}
            ]}
        }))
        .unwrap();

        let captions: Vec<String> = bp.steps().iter().map(Step::caption).collect();
        assert_eq!(captions, vec!["CLICK: Sign in", "TYPE: hunter2", "SCROLL: ?"]);
        assert_eq!(bp.steps()[2].action, ActionKind::Other("scroll".to_string()));
        assert_eq!(bp.created_date(), "2025-03-01");
    }

    #[test]
    fn blueprint_without_graph_has_no_steps() {
        let bp: Blueprint =
            serde_json::from_value(json!({"id": 42, "name": "Empty", "state_graph_json": null})).unwrap();
        assert_eq!(bp.id, "42");
        assert!(bp.steps().is_empty());
        assert_eq!(bp.created_date(), "-");
    }

    #[test]
    fn malformed_steps_do_not_hide_the_blueprint() {
        let rows: Vec<Blueprint> = serde_json::from_value(json!([
            {
                "id": "bp-1",
                "name": "Half broken",
                "state_graph_json": {"steps": [
                    {"step": 1, "action": "click", "semantic_target": "Search"},
                    {"step": "two", "semantic_target": "No action"},
                    {"step": 3, "action": "type", "text": "rust"}
                ]}
            },
            {"id": "bp-2", "name": "Odd graph", "state_graph_json": "not a graph"},
            {"id": "bp-3", "name": "Odd steps", "state_graph_json": {"steps": {"0": "click"}}}
        ]))
        .unwrap();

        let captions: Vec<String> = rows[0].steps().iter().map(Step::caption).collect();
        assert_eq!(captions, vec!["CLICK: Search", "TYPE: rust"]);
        assert!(rows[1].steps().is_empty());
        assert!(rows[2].steps().is_empty());
    }

    #[test]
    fn run_status_uses_upper_case_names() {
        assert_eq!(serde_json::to_value(RunStatus::Completed).unwrap(), json!("COMPLETED"));
        assert!(RunStatus::Starting.is_active());
        assert!(!RunStatus::Error.is_active());
    }

    #[test]
    fn teach_action_wire_shape() {
        let action = TeachAction {
            blueprint_id: "bp-1".to_string(),
            action: ActionKind::Type,
            label: "Search box".to_string(),
            x: 960,
            y: 540,
            text: "rust".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"blueprint_id": "bp-1", "action": "type", "label": "Search box", "x": 960, "y": 540, "text": "rust"})
        );
    }
}
