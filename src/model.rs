// Value types returned by the request façade, plus the wire shapes they
// are parsed from. Field names follow the backend's JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A file to be sent as the multipart `file` field.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        UploadFile {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, using its file name for the upload.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        Ok(UploadFile { file_name, bytes })
    }
}

/// Per-line problem reported by an import endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLineError {
    pub line: u32,
    pub message: String,
}

/// Normalized outcome of a dataset import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    /// Only meaningful when `success`.
    pub imported: Option<u32>,
    pub skipped: Option<u32>,
    pub code: Option<String>,
    pub errors: Vec<ImportLineError>,
}

impl UploadResult {
    pub fn success(
        message: impl Into<String>,
        imported: Option<u32>,
        skipped: Option<u32>,
    ) -> Self {
        UploadResult {
            success: true,
            message: message.into(),
            imported,
            skipped,
            code: None,
            errors: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        UploadResult {
            success: false,
            message: message.into(),
            imported: None,
            skipped: None,
            code: None,
            errors: Vec::new(),
        }
    }
}

/// Body of an import response as sent by the backend.
#[derive(Debug, Deserialize)]
pub(crate) struct ImportResponse {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub imported: Option<u32>,
    pub skipped: Option<u32>,
    pub code: Option<String>,
    #[serde(default)]
    pub errors: Vec<ImportLineError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    #[default]
    Unknown,
    Activator,
    Chaser,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Unknown => "unknown",
            LogType::Activator => "activator",
            LogType::Chaser => "chaser",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly the server counts QSOs around an activation day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentMode {
    #[default]
    Strict,
    Lenient,
}

impl JudgmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgmentMode::Strict => "strict",
            JudgmentMode::Lenient => "lenient",
        }
    }
}

impl fmt::Display for JudgmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummitActivation {
    pub summit_code: String,
    pub unique_stations: u32,
    pub qualified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatorAwardResult {
    pub achieved: bool,
    pub qualified_summits: u32,
    #[serde(default)]
    pub summits: Vec<SummitActivation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummitChase {
    pub summit_code: String,
    pub unique_activators: u32,
    #[serde(default)]
    pub activators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaserAwardResult {
    pub achieved: bool,
    #[serde(default)]
    pub qualified_summits: Vec<SummitChase>,
}

/// Server verdict for the SOTA JA 10th anniversary award. `activator` is
/// normally present for activator logs and `chaser` for chaser logs; the
/// client does not enforce that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardJudgmentResult {
    pub success: bool,
    pub callsign: String,
    pub total_qsos: u32,
    pub log_type: LogType,
    pub activator: Option<ActivatorAwardResult>,
    pub chaser: Option<ChaserAwardResult>,
    pub mode: JudgmentMode,
    pub pdf_available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardJudgmentResponse {
    pub success: bool,
    pub result: Option<AwardJudgmentResult>,
    pub message: Option<String>,
}

/// Error body some endpoints return alongside a failing status.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub uptime_secs: u64,
    pub memory_used_bytes: Option<u64>,
    pub memory_used_mb: Option<f64>,
    pub db_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResponse {
    pub success: bool,
    pub data: Option<SystemMetrics>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestartResponse {
    pub success: bool,
    pub message: String,
}

/// Award category; selects the certificate template and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Activator,
    Chaser,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Activator => "activator",
            TemplateKind::Chaser => "chaser",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatus {
    pub activator_available: bool,
    pub chaser_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateStatusResponse {
    pub success: bool,
    pub data: Option<TemplateStatus>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateUploadResult {
    pub success: bool,
    pub message: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateUploadBody {
    pub message: Option<String>,
    pub size: Option<u64>,
}

/// Where and how one line of text is printed on a certificate. Points are
/// measured from the bottom-left corner of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub color: [u8; 3],
    #[serde(default = "centered_by_default")]
    pub centered: bool,
}

fn centered_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLayout {
    pub callsign: TextOverlay,
    pub achievement: TextOverlay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<TextOverlay>,
}

/// Certificate layout for both award templates, as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardTemplateConfig {
    pub activator: TemplateLayout,
    pub chaser: TemplateLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwardConfigResponse {
    pub success: bool,
    pub data: Option<AwardTemplateConfig>,
    pub message: Option<String>,
}

/// Partial change to one template's layout; `None` fields are left alone
/// by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign_color: Option<[u8; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_color: Option<[u8; 3]>,
}

impl LayoutUpdate {
    pub fn is_empty(&self) -> bool {
        *self == LayoutUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AwardConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activator: Option<LayoutUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chaser: Option<LayoutUpdate>,
}

impl AwardConfigUpdate {
    pub fn for_template(kind: TemplateKind, update: LayoutUpdate) -> Self {
        match kind {
            TemplateKind::Activator => AwardConfigUpdate {
                activator: Some(update),
                chaser: None,
            },
            TemplateKind::Chaser => AwardConfigUpdate {
                activator: None,
                chaser: Some(update),
            },
        }
    }
}

/// Parameters of a certificate download. `count` is the number printed
/// on the certificate: qualified summits for activators, distinct
/// activators for chasers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub kind: TemplateKind,
    pub callsign: String,
    pub count: u32,
}

impl CertificateRequest {
    /// Certificate for an achieved award in a judgment, activator first.
    pub fn from_verdict(verdict: &AwardJudgmentResult) -> Option<Self> {
        if let Some(activator) = verdict.activator.as_ref().filter(|a| a.achieved) {
            return Some(CertificateRequest {
                kind: TemplateKind::Activator,
                callsign: verdict.callsign.clone(),
                count: activator.qualified_summits,
            });
        }
        let chaser = verdict.chaser.as_ref().filter(|c| c.achieved)?;
        let count = chaser
            .qualified_summits
            .iter()
            .map(|s| s.unique_activators)
            .max()
            .unwrap_or(0);
        Some(CertificateRequest {
            kind: TemplateKind::Chaser,
            callsign: verdict.callsign.clone(),
            count,
        })
    }

    /// File name the server would suggest for this certificate.
    pub fn default_file_name(&self) -> String {
        format!(
            "sota_10th_anniversary_{}_{}.pdf",
            self.kind.as_str(),
            self.callsign
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDownload {
    pub success: bool,
    pub message: Option<String>,
    pub file_name: Option<String>,
    pub pdf: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn judgment_result_parses_camel_case() {
        let body = r#"{
            "success": true,
            "callsign": "JA1ABC",
            "totalQsos": 42,
            "logType": "activator",
            "activator": {
                "achieved": false,
                "qualifiedSummits": 1,
                "summits": [{"summitCode": "JA/TK-001", "uniqueStations": 12, "qualified": true}]
            },
            "mode": "lenient"
        }"#;
        let parsed: AwardJudgmentResult = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.log_type, LogType::Activator);
        assert_eq!(parsed.mode, JudgmentMode::Lenient);
        assert_eq!(parsed.total_qsos, 42);
        assert!(parsed.chaser.is_none());
        assert_eq!(parsed.pdf_available, None);
        let activator = parsed.activator.unwrap();
        assert_eq!(activator.summits[0].summit_code, "JA/TK-001");
    }

    #[test]
    fn metrics_allow_null_memory() {
        let body = r#"{"uptime_secs": 5, "memory_used_bytes": null,
            "memory_used_mb": null, "db_status": "healthy"}"#;
        let parsed: SystemMetrics = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.memory_used_bytes, None);
        assert_eq!(parsed.memory_used_mb, None);
        assert_eq!(parsed.db_status, "healthy");
    }

    #[test]
    fn import_response_tolerates_missing_fields() {
        let parsed: ImportResponse = serde_json::from_str("{}").unwrap();
        assert!(!parsed.success);
        assert!(parsed.message.is_none());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn log_type_displays_wire_spelling() {
        assert_eq!(LogType::Chaser.to_string(), "chaser");
        assert_eq!(LogType::Activator.as_str(), "activator");
        assert_eq!(LogType::default().as_str(), "unknown");
    }

    #[test]
    fn layout_update_sends_only_set_fields() {
        let update = AwardConfigUpdate::for_template(
            TemplateKind::Chaser,
            LayoutUpdate {
                callsign_y: Some(480.0),
                achievement_color: Some([0, 0, 255]),
                ..LayoutUpdate::default()
            },
        );
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"chaser": {"callsignY": 480.0, "achievementColor": [0, 0, 255]}})
        );
        assert!(LayoutUpdate::default().is_empty());
    }

    #[test]
    fn template_config_parses_without_issue_date() {
        let body = r#"{
            "activator": {
                "callsign": {"x": 420.0, "y": 500.0, "font_size": 72.0, "color": [255, 0, 0]},
                "achievement": {"x": 420.0, "y": 420.0, "font_size": 32.0,
                    "color": [255, 0, 0], "centered": false}
            },
            "chaser": {
                "callsign": {"x": 1.0, "y": 2.0, "font_size": 3.0, "color": [0, 0, 0]},
                "achievement": {"x": 1.0, "y": 2.0, "font_size": 3.0, "color": [0, 0, 0]},
                "issue_date": {"x": 420.0, "y": 120.0, "font_size": 14.0, "color": [0, 0, 0]}
            }
        }"#;
        let parsed: AwardTemplateConfig = serde_json::from_str(body).unwrap();
        assert!(parsed.activator.callsign.centered);
        assert!(!parsed.activator.achievement.centered);
        assert!(parsed.activator.issue_date.is_none());
        assert_eq!(parsed.chaser.issue_date.unwrap().font_size, 14.0);
    }

    #[test]
    fn certificate_request_from_verdict() {
        let mut verdict = AwardJudgmentResult {
            success: true,
            callsign: "JA1ABC".into(),
            total_qsos: 200,
            log_type: LogType::Chaser,
            activator: None,
            chaser: Some(ChaserAwardResult {
                achieved: true,
                qualified_summits: vec![
                    SummitChase {
                        summit_code: "JA/NN-001".into(),
                        unique_activators: 10,
                        activators: vec![],
                    },
                    SummitChase {
                        summit_code: "JA/NN-002".into(),
                        unique_activators: 14,
                        activators: vec![],
                    },
                ],
            }),
            mode: JudgmentMode::Strict,
            pdf_available: Some(true),
        };
        let request = CertificateRequest::from_verdict(&verdict).unwrap();
        assert_eq!(request.kind, TemplateKind::Chaser);
        assert_eq!(request.count, 14);
        assert_eq!(
            request.default_file_name(),
            "sota_10th_anniversary_chaser_JA1ABC.pdf"
        );

        verdict.chaser.as_mut().unwrap().achieved = false;
        assert_eq!(CertificateRequest::from_verdict(&verdict), None);

        verdict.activator = Some(ActivatorAwardResult {
            achieved: true,
            qualified_summits: 12,
            summits: vec![],
        });
        let request = CertificateRequest::from_verdict(&verdict).unwrap();
        assert_eq!(request.kind, TemplateKind::Activator);
        assert_eq!(request.count, 12);
    }

    #[test]
    fn default_mode_is_strict() {
        assert_eq!(JudgmentMode::default().to_string(), "strict");
    }
}
