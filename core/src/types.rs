//! Core data types for J-Jaga

use serde::{Deserialize, Serialize};

/// The three analysis pipelines a request can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Engine-sound diagnosis and repair-quote fraud check
    Mechanic,
    /// Used-car video vetting and lemon scoring
    Sceptic,
    /// Accident-scene guidance from camera frames
    Guardian,
}

impl AnalysisMode {
    /// All modes, in route order
    pub const ALL: [AnalysisMode; 3] =
        [AnalysisMode::Mechanic, AnalysisMode::Sceptic, AnalysisMode::Guardian];

    /// The HTTP route serving this mode
    pub fn route(&self) -> &'static str {
        match self {
            AnalysisMode::Mechanic => "/mechanic/analyze",
            AnalysisMode::Sceptic => "/sceptic/vet",
            AnalysisMode::Guardian => "/guardian/frame",
        }
    }

    /// Resolve the mode from a request path by its first segment
    pub fn from_path(path: &str) -> Option<Self> {
        let first = path.trim_start_matches('/').split('/').next()?;
        match first {
            "mechanic" => Some(AnalysisMode::Mechanic),
            "sceptic" => Some(AnalysisMode::Sceptic),
            "guardian" => Some(AnalysisMode::Guardian),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisMode::Mechanic => write!(f, "mechanic"),
            AnalysisMode::Sceptic => write!(f, "sceptic"),
            AnalysisMode::Guardian => write!(f, "guardian"),
        }
    }
}

/// Engine-sound diagnosis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRequest {
    /// Free-text description of the recorded engine sound
    pub audio_description: String,
    /// Repair quote text to cross-check, if the user has one
    #[serde(default)]
    pub quote_data: Option<String>,
}

/// Used-car vetting request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LemonScoreRequest {
    /// Link to (or identifier of) the walk-around video
    pub video_url: String,
}

/// Likelihood that a repair quote is fraudulent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FraudRisk {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
}

/// Severity of a single vetting flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "LOW", alias = "Low")]
    Low,
    #[serde(alias = "MEDIUM", alias = "Medium")]
    Medium,
    #[serde(alias = "HIGH", alias = "High")]
    High,
}

/// Result of an engine-sound diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub issue: String,
    #[serde(alias = "fraudRisk")]
    pub fraud_risk: FraudRisk,
    pub explanation: String,
}

/// A defect spotted at a point in the vetting video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LemonFlag {
    /// Video position, e.g. "1:02"
    #[serde(alias = "timestamp")]
    pub ts: String,
    pub issue: String,
    pub severity: Severity,
}

impl LemonFlag {
    pub fn new(ts: impl Into<String>, issue: impl Into<String>, severity: Severity) -> Self {
        Self {
            ts: ts.into(),
            issue: issue.into(),
            severity,
        }
    }
}

/// Result of vetting a used car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LemonReport {
    /// 0 (sound) to 100 (certain lemon)
    #[serde(alias = "lemonScore")]
    pub lemon_score: u8,
    #[serde(default)]
    pub flags: Vec<LemonFlag>,
}

impl LemonReport {
    /// Highest representable lemon score
    pub const MAX_SCORE: u8 = 100;

    /// Clamp an arbitrary model-produced score into the 0-100 range
    pub fn clamp_score(raw: f64) -> u8 {
        if raw.is_nan() {
            return 0;
        }
        raw.round().clamp(0.0, Self::MAX_SCORE as f64) as u8
    }
}

/// Guidance for the user at an accident scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianReport {
    /// What the user should do next
    pub instruction: String,
    /// Facts read off the frame, e.g. "Plate: WXA 1234"
    #[serde(default)]
    pub entities: Vec<String>,
}

impl DiagnosticReport {
    /// JSON shape example used in model prompts
    pub fn json_schema_example() -> &'static str {
        r#"{
  "issue": "string (short name of the mechanical fault)",
  "fraud_risk": "LOW | MEDIUM | HIGH",
  "explanation": "string (evidence from the sound, and how the quote compares)"
}"#
    }
}

impl LemonReport {
    /// JSON shape example used in model prompts
    pub fn json_schema_example() -> &'static str {
        r#"{
  "lemon_score": "integer 0-100",
  "flags": [
    {
      "ts": "string (video position, m:ss)",
      "issue": "string",
      "severity": "low | medium | high"
    }
  ]
}"#
    }
}

impl GuardianReport {
    /// JSON shape example used in model prompts
    pub fn json_schema_example() -> &'static str {
        r#"{
  "instruction": "string (one clear command for the user)",
  "entities": ["string (e.g. \"Plate: ABC 1234\", \"Road Tax: Valid Dec 2024\")"]
}"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_from_path() {
        assert_eq!(AnalysisMode::from_path("/mechanic/analyze"), Some(AnalysisMode::Mechanic));
        assert_eq!(AnalysisMode::from_path("/sceptic/vet"), Some(AnalysisMode::Sceptic));
        assert_eq!(AnalysisMode::from_path("guardian/frame"), Some(AnalysisMode::Guardian));
        assert_eq!(AnalysisMode::from_path("/health"), None);
        assert_eq!(AnalysisMode::from_path(""), None);
    }

    #[test]
    fn test_mode_routes_resolve_back() {
        for mode in AnalysisMode::ALL {
            assert_eq!(AnalysisMode::from_path(mode.route()), Some(mode));
        }
    }

    #[test]
    fn test_quote_data_optional() {
        let missing: DiagnosticRequest =
            serde_json::from_value(json!({"audio_description": "knock"})).unwrap();
        assert_eq!(missing.quote_data, None);

        let null: DiagnosticRequest = serde_json::from_value(json!({
            "audio_description": "knock",
            "quote_data": null
        }))
        .unwrap();
        assert_eq!(null.quote_data, None);
    }

    #[test]
    fn test_fraud_risk_wire_format() {
        assert_eq!(serde_json::to_value(FraudRisk::High).unwrap(), json!("HIGH"));
        let parsed: FraudRisk = serde_json::from_value(json!("medium")).unwrap();
        assert_eq!(parsed, FraudRisk::Medium);
    }

    #[test]
    fn test_lemon_report_accepts_camel_case() {
        let report: LemonReport = serde_json::from_value(json!({
            "lemonScore": 40,
            "flags": [{"timestamp": "0:05", "issue": "Uneven Idle", "severity": "HIGH"}]
        }))
        .unwrap();

        assert_eq!(report.lemon_score, 40);
        assert_eq!(report.flags[0], LemonFlag::new("0:05", "Uneven Idle", Severity::High));
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(LemonReport::clamp_score(72.4), 72);
        assert_eq!(LemonReport::clamp_score(-3.0), 0);
        assert_eq!(LemonReport::clamp_score(180.0), 100);
        assert_eq!(LemonReport::clamp_score(f64::NAN), 0);
    }
}
