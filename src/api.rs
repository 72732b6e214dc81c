// Request façade: one blocking function per backend operation.
//
// Every call returns a plain result value instead of an error. Transport
// problems, expired sessions, malformed bodies and server-side failures
// are all folded into the `success`/`message` fields so the console can
// print them directly. Authenticated calls share one rule: a 401 or 403
// means the token is no longer valid, so the session is cleared.

use crate::model::{
    AwardConfigResponse, AwardConfigUpdate, AwardJudgmentResponse, AwardJudgmentResult,
    AwardTemplateConfig, CertificateDownload, CertificateRequest, ErrorBody, ImportResponse,
    JudgmentMode, MetricsResponse, RestartResponse, SystemMetrics, TemplateKind, TemplateStatus,
    TemplateStatusResponse, TemplateUploadBody, TemplateUploadResult, UploadFile, UploadResult,
};
use crate::session::SessionManager;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_DISPOSITION};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const POTA_IMPORT_PATH: &str = "/api/v2/pota/import";
pub const SOTA_JA_IMPORT_PATH: &str = "/api/v2/sota/import/ja";
pub const JCC_JCG_IMPORT_PATH: &str = "/api/v2/locator/jcc-jcg/import";
pub const AWARD_JUDGE_PATH: &str = "/api/v2/sota/award/10th-anniversary/judge";
pub const METRICS_PATH: &str = "/api/v2/admin/metrics";
pub const RESTART_PATH: &str = "/api/v2/admin/restart";
pub const TEMPLATE_STATUS_PATH: &str = "/api/v2/admin/award/templates/status";
pub const TEMPLATE_UPLOAD_PATH: &str = "/api/v2/admin/award/templates";
pub const AWARD_CONFIG_PATH: &str = "/api/v2/admin/award/config";
pub const CERTIFICATE_PATH: &str = "/api/v2/sota/award/10th-anniversary/certificate";

/// Operator-facing messages.
pub mod messages {
    pub const NOT_AUTHENTICATED: &str = "認証されていません";
    pub const SESSION_EXPIRED: &str = "セッションが期限切れです。再度ログインしてください。";
    pub const NETWORK_ERROR: &str = "ネットワークエラー。再試行してください。";
    pub const UPLOAD_FAILED: &str = "アップロードに失敗しました";
    pub const UPLOAD_SUCCEEDED: &str = "アップロード成功！";
    pub const JUDGE_FAILED: &str = "判定に失敗しました";
    pub const METRICS_FAILED: &str = "メトリクス取得に失敗しました";
    pub const RESTART_FAILED: &str = "リスタートに失敗しました";
    pub const RESTARTING: &str = "サーバーをリスタートしています...";
    pub const TEMPLATE_STATUS_FAILED: &str = "テンプレート状態の取得に失敗しました";
    pub const TEMPLATE_UPLOAD_FAILED: &str = "テンプレートのアップロードに失敗しました";
    pub const TEMPLATE_UPLOADED: &str = "テンプレートをアップロードしました";
    pub const CONFIG_FAILED: &str = "設定の取得に失敗しました";
    pub const CONFIG_UPDATE_FAILED: &str = "設定の更新に失敗しました";
    pub const CERTIFICATE_FAILED: &str = "証明書の取得に失敗しました";

    pub fn imported(count: u32) -> String {
        format!("インポート完了: {}件追加", count)
    }
}

/// Client for the admin endpoints. Cheap to clone; clones share the
/// connection pool and the session.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, session: Arc<SessionManager>) -> Self {
        ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn upload_pota_parks(&self, file: &UploadFile) -> UploadResult {
        self.upload_file(POTA_IMPORT_PATH, file)
    }

    pub fn upload_sota_ja_summits(&self, file: &UploadFile) -> UploadResult {
        self.upload_file(SOTA_JA_IMPORT_PATH, file)
    }

    pub fn upload_jcc_jcg(&self, file: &UploadFile) -> UploadResult {
        self.upload_file(JCC_JCG_IMPORT_PATH, file)
    }

    /// Submit a log for award judgment. This endpoint is public: no token
    /// is sent and a failing status never touches the session. `None`
    /// means strict mode.
    pub fn judge_award(
        &self,
        file: &UploadFile,
        mode: Option<JudgmentMode>,
    ) -> AwardJudgmentResponse {
        let mode = mode.unwrap_or_default();
        debug!(endpoint = AWARD_JUDGE_PATH, %mode, "sending request");
        let res = self
            .client
            .post(self.url(AWARD_JUDGE_PATH))
            .query(&[("mode", mode.as_str())])
            .multipart(file_form(file))
            .send();
        let res = match res {
            Ok(res) => res,
            Err(e) => {
                warn!(endpoint = AWARD_JUDGE_PATH, error = %e, "request failed");
                return judgment_failure(messages::NETWORK_ERROR);
            }
        };

        let status = res.status();
        let text = res.text().unwrap_or_else(|_| "".into());
        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = non_empty(body.message).unwrap_or_else(|| {
                format!("{}: {}", messages::JUDGE_FAILED, status_line(status))
            });
            return judgment_failure(message);
        }

        match serde_json::from_str::<AwardJudgmentResult>(&text) {
            Ok(result) => AwardJudgmentResponse {
                success: true,
                result: Some(result),
                message: None,
            },
            Err(e) => {
                warn!(endpoint = AWARD_JUDGE_PATH, error = %e, "unparsable judgment body");
                judgment_failure(messages::NETWORK_ERROR)
            }
        }
    }

    pub fn get_system_metrics(&self) -> MetricsResponse {
        let failure = |message: String| MetricsResponse {
            success: false,
            data: None,
            message: Some(message),
        };
        let res = match self.send_authenticated(METRICS_PATH, |c, url| c.get(url)) {
            Ok(res) => res,
            Err(message) => return failure(message),
        };

        let status = res.status();
        if !status.is_success() {
            return failure(format!("{}: {}", messages::METRICS_FAILED, status.as_u16()));
        }
        match res.json::<SystemMetrics>() {
            Ok(data) => MetricsResponse {
                success: true,
                data: Some(data),
                message: None,
            },
            Err(e) => {
                warn!(endpoint = METRICS_PATH, error = %e, "unparsable metrics body");
                failure(messages::NETWORK_ERROR.to_string())
            }
        }
    }

    /// Ask the backend to restart itself. The response body is ignored.
    pub fn restart_server(&self) -> RestartResponse {
        let res = match self.send_authenticated(RESTART_PATH, |c, url| c.post(url)) {
            Ok(res) => res,
            Err(message) => {
                return RestartResponse {
                    success: false,
                    message,
                }
            }
        };

        let status = res.status();
        if !status.is_success() {
            return RestartResponse {
                success: false,
                message: format!("{}: {}", messages::RESTART_FAILED, status.as_u16()),
            };
        }
        info!("server restart requested");
        RestartResponse {
            success: true,
            message: messages::RESTARTING.to_string(),
        }
    }

    /// Which award certificate templates the server currently holds.
    pub fn get_award_template_status(&self) -> TemplateStatusResponse {
        let failure = |message: String| TemplateStatusResponse {
            success: false,
            data: None,
            message: Some(message),
        };
        let res = match self.send_authenticated(TEMPLATE_STATUS_PATH, |c, url| c.get(url)) {
            Ok(res) => res,
            Err(message) => return failure(message),
        };

        let status = res.status();
        if !status.is_success() {
            return failure(format!(
                "{}: {}",
                messages::TEMPLATE_STATUS_FAILED,
                status.as_u16()
            ));
        }
        match res.json::<TemplateStatus>() {
            Ok(data) => TemplateStatusResponse {
                success: true,
                data: Some(data),
                message: None,
            },
            Err(e) => {
                warn!(endpoint = TEMPLATE_STATUS_PATH, error = %e, "unparsable status body");
                failure(messages::NETWORK_ERROR.to_string())
            }
        }
    }

    /// Replace an award certificate template with the given PDF.
    pub fn upload_award_template(
        &self,
        kind: TemplateKind,
        file: &UploadFile,
    ) -> TemplateUploadResult {
        let path = format!("{}/{}", TEMPLATE_UPLOAD_PATH, kind.as_str());
        let failure = |message: String| TemplateUploadResult {
            success: false,
            message,
            size: None,
        };
        let res = self.send_authenticated(&path, |c, url| c.post(url).multipart(file_form(file)));
        let res = match res {
            Ok(res) => res,
            Err(message) => return failure(message),
        };

        let status = res.status();
        let text = res.text().unwrap_or_else(|_| "".into());
        if !status.is_success() {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = non_empty(body.error)
                .or_else(|| non_empty(body.message))
                .unwrap_or_else(|| {
                    format!("{}: {}", messages::TEMPLATE_UPLOAD_FAILED, status_line(status))
                });
            return failure(message);
        }

        let body = serde_json::from_str::<TemplateUploadBody>(&text).ok();
        let size = body.as_ref().and_then(|b| b.size);
        let message = body
            .and_then(|b| non_empty(b.message))
            .unwrap_or_else(|| messages::TEMPLATE_UPLOADED.to_string());
        TemplateUploadResult {
            success: true,
            message,
            size,
        }
    }

    /// Certificate layout currently stored on the server.
    pub fn get_award_config(&self) -> AwardConfigResponse {
        let res = self.send_authenticated(AWARD_CONFIG_PATH, |c, url| c.get(url));
        read_award_config(res, messages::CONFIG_FAILED)
    }

    /// Apply a partial layout change. The server answers with the full
    /// configuration after the change.
    pub fn update_award_config(&self, update: &AwardConfigUpdate) -> AwardConfigResponse {
        let res = self.send_authenticated(AWARD_CONFIG_PATH, |c, url| c.post(url).json(update));
        read_award_config(res, messages::CONFIG_UPDATE_FAILED)
    }

    /// Fetch a generated certificate PDF. Public like `judge_award`: no
    /// token is sent and the session is never touched.
    pub fn download_award_certificate(&self, request: &CertificateRequest) -> CertificateDownload {
        let count = request.count.to_string();
        debug!(endpoint = CERTIFICATE_PATH, kind = request.kind.as_str(), "sending request");
        let res = self
            .client
            .get(self.url(CERTIFICATE_PATH))
            .query(&[
                ("award_type", request.kind.as_str()),
                ("callsign", request.callsign.as_str()),
                ("summits", count.as_str()),
            ])
            .send();
        let res = match res {
            Ok(res) => res,
            Err(e) => {
                warn!(endpoint = CERTIFICATE_PATH, error = %e, "request failed");
                return certificate_failure(messages::NETWORK_ERROR);
            }
        };

        let status = res.status();
        if !status.is_success() {
            let text = res.text().unwrap_or_else(|_| "".into());
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = non_empty(body.error)
                .or_else(|| non_empty(body.message))
                .unwrap_or_else(|| {
                    format!("{}: {}", messages::CERTIFICATE_FAILED, status_line(status))
                });
            return certificate_failure(message);
        }

        let file_name = attachment_file_name(res.headers())
            .unwrap_or_else(|| request.default_file_name());
        match res.bytes() {
            Ok(pdf) => CertificateDownload {
                success: true,
                message: None,
                file_name: Some(file_name),
                pdf: Some(pdf.to_vec()),
            },
            Err(e) => {
                warn!(endpoint = CERTIFICATE_PATH, error = %e, "certificate body interrupted");
                certificate_failure(messages::NETWORK_ERROR)
            }
        }
    }

    /// Shared import protocol for the dataset upload endpoints.
    fn upload_file(&self, path: &str, file: &UploadFile) -> UploadResult {
        let res = self.send_authenticated(path, |c, url| c.post(url).multipart(file_form(file)));
        let res = match res {
            Ok(res) => res,
            Err(message) => return UploadResult::failure(message),
        };

        let status = res.status();
        let text = res.text().unwrap_or_else(|_| "".into());
        let data: ImportResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(_) if status.is_success() => {
                debug!(endpoint = path, "empty or non-JSON success body");
                return UploadResult::success(messages::UPLOAD_SUCCEEDED, None, None);
            }
            Err(_) => {
                return UploadResult::failure(format!(
                    "{}: {}",
                    messages::UPLOAD_FAILED,
                    status_line(status)
                ));
            }
        };

        if data.success {
            info!(
                endpoint = path,
                imported = ?data.imported,
                skipped = ?data.skipped,
                "import finished"
            );
            let message = non_empty(data.message)
                .unwrap_or_else(|| messages::imported(data.imported.unwrap_or(0)));
            UploadResult {
                errors: data.errors,
                ..UploadResult::success(message, data.imported, data.skipped)
            }
        } else {
            UploadResult {
                code: data.code,
                errors: data.errors,
                ..UploadResult::failure(
                    non_empty(data.message).unwrap_or_else(|| messages::UPLOAD_FAILED.to_string()),
                )
            }
        }
    }

    /// Runs the steps every authenticated call shares: token lookup,
    /// bearer header, transport failure and 401/403 handling. `Err` carries
    /// the message the caller should report.
    fn send_authenticated<F>(&self, path: &str, build: F) -> Result<Response, String>
    where
        F: FnOnce(&Client, String) -> RequestBuilder,
    {
        let token = self
            .session
            .get_token()
            .ok_or_else(|| messages::NOT_AUTHENTICATED.to_string())?;

        debug!(endpoint = path, "sending request");
        let res = build(&self.client, self.url(path))
            .headers(auth_headers(&token))
            .send()
            .map_err(|e| {
                warn!(endpoint = path, error = %e, "request failed");
                messages::NETWORK_ERROR.to_string()
            })?;

        if matches!(res.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            info!(endpoint = path, status = %res.status(), "session expired");
            self.session.logout();
            return Err(messages::SESSION_EXPIRED.to_string());
        }
        Ok(res)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", &self.base_url, path)
    }
}

/// Authorization header for a bearer token. A token that is not a valid
/// header value yields no header and the server answers 401.
fn auth_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(mut value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    headers
}

fn file_form(file: &UploadFile) -> multipart::Form {
    let part = multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    multipart::Form::new().part("file", part)
}

/// `"<code> <reason>"`, e.g. `"500 Internal Server Error"`.
fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Shared handling of the award config endpoints: strict parse, server
/// `error` field preferred over the status-coded fallback.
fn read_award_config(res: Result<Response, String>, failed: &str) -> AwardConfigResponse {
    let failure = |message: String| AwardConfigResponse {
        success: false,
        data: None,
        message: Some(message),
    };
    let res = match res {
        Ok(res) => res,
        Err(message) => return failure(message),
    };

    let status = res.status();
    let text = res.text().unwrap_or_else(|_| "".into());
    if !status.is_success() {
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        return failure(
            non_empty(body.error).unwrap_or_else(|| format!("{}: {}", failed, status.as_u16())),
        );
    }
    match serde_json::from_str::<AwardTemplateConfig>(&text) {
        Ok(data) => AwardConfigResponse {
            success: true,
            data: Some(data),
            message: None,
        },
        Err(e) => {
            warn!(endpoint = AWARD_CONFIG_PATH, error = %e, "unparsable award config body");
            failure(messages::NETWORK_ERROR.to_string())
        }
    }
}

/// File name from `Content-Disposition: attachment; filename="..."`.
fn attachment_file_name(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    value
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}

fn certificate_failure(message: impl Into<String>) -> CertificateDownload {
    CertificateDownload {
        success: false,
        message: Some(message.into()),
        file_name: None,
        pdf: None,
    }
}

fn judgment_failure(message: impl Into<String>) -> AwardJudgmentResponse {
    AwardJudgmentResponse {
        success: false,
        result: None,
        message: Some(message.into()),
    }
}
