// UI layer: an interactive menu built on `dialoguer`. It only collects
// input, calls the session/api layer and prints whatever comes back; all
// protocol handling lives in `api` and `session`.

use crate::api::ApiClient;
use crate::model::{
    AwardConfigUpdate, AwardJudgmentResponse, CertificateRequest, JudgmentMode, LayoutUpdate,
    TemplateKind, TemplateLayout, TextOverlay, UploadFile, UploadResult,
};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

const MENU: &[&str] = &[
    "Login",
    "Logout",
    "Upload POTA parks",
    "Upload SOTA JA summits",
    "Upload JCC/JCG list",
    "Judge 10th anniversary award",
    "Show system metrics",
    "Restart server",
    "Award template status",
    "Upload award template",
    "Award certificate layout",
    "Download award certificate",
    "Exit",
];

/// Main interactive menu. Runs until the operator chooses "Exit".
pub fn main_menu(api: ApiClient) -> Result<()> {
    loop {
        print_session_banner(&api);
        let selection = Select::new().items(MENU).default(0).interact()?;
        match selection {
            0 => handle_login(&api)?,
            1 => {
                api.session().logout();
                println!("{}", "Signed out.".green());
            }
            2 => handle_dataset_upload(&api, Dataset::PotaParks)?,
            3 => handle_dataset_upload(&api, Dataset::SotaJaSummits)?,
            4 => handle_dataset_upload(&api, Dataset::JccJcg)?,
            5 => handle_judge(&api)?,
            6 => handle_metrics(&api)?,
            7 => handle_restart(&api)?,
            8 => handle_template_status(&api)?,
            9 => handle_template_upload(&api)?,
            10 => handle_award_config(&api)?,
            11 => handle_certificate(&api)?,
            _ => break,
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Dataset {
    PotaParks,
    SotaJaSummits,
    JccJcg,
}

fn print_session_banner(api: &ApiClient) {
    let state = api.session().state();
    match (state.authenticated, state.identity) {
        (true, Some(identity)) => println!("{}", format!("Signed in as {}", identity).cyan()),
        (true, None) => println!("{}", "Signed in".cyan()),
        (false, _) => println!("{}", "Not signed in".dark_grey()),
    }
}

fn handle_login(api: &ApiClient) -> Result<()> {
    let email: String = Input::new().with_prompt("Email").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;

    match with_spinner("Signing in...", || api.session().login(&email, &password))? {
        Ok(()) => println!("{}", format!("Welcome {}!", email).green()),
        Err(e) => println!("{}", format!("Login failed: {}", e).red()),
    }
    Ok(())
}

fn handle_dataset_upload(api: &ApiClient, dataset: Dataset) -> Result<()> {
    let Some(file) = prompt_file("CSV file path")? else {
        return Ok(());
    };
    let result = with_spinner("Uploading...", || match dataset {
        Dataset::PotaParks => api.upload_pota_parks(&file),
        Dataset::SotaJaSummits => api.upload_sota_ja_summits(&file),
        Dataset::JccJcg => api.upload_jcc_jcg(&file),
    })?;
    print_upload_result(&result);
    Ok(())
}

fn handle_judge(api: &ApiClient) -> Result<()> {
    let Some(file) = prompt_file("Log file path")? else {
        return Ok(());
    };
    let modes = [JudgmentMode::Strict, JudgmentMode::Lenient];
    let labels: Vec<&str> = modes.iter().map(|m| m.as_str()).collect();
    let mode = modes[Select::new().items(&labels).default(0).interact()?];

    let response = with_spinner("Judging...", || api.judge_award(&file, Some(mode)))?;
    print_judgment(&response);

    let certificate = response
        .result
        .as_ref()
        .filter(|r| r.pdf_available == Some(true))
        .and_then(CertificateRequest::from_verdict);
    if let Some(request) = certificate {
        if Confirm::new().with_prompt("Download certificate?").interact()? {
            download_certificate(api, &request)?;
        }
    }
    Ok(())
}

fn handle_metrics(api: &ApiClient) -> Result<()> {
    let response = with_spinner("Fetching metrics...", || api.get_system_metrics())?;
    match response.data {
        Some(metrics) if response.success => {
            println!("uptime:   {}s", metrics.uptime_secs);
            match metrics.memory_used_mb {
                Some(mb) => println!("memory:   {:.1} MB", mb),
                None => println!("memory:   n/a"),
            }
            println!("database: {}", metrics.db_status);
        }
        _ => print_failure(response.message.as_deref().unwrap_or_default()),
    }
    Ok(())
}

fn handle_restart(api: &ApiClient) -> Result<()> {
    if !Confirm::new().with_prompt("Restart the server?").interact()? {
        return Ok(());
    }
    let response = api.restart_server();
    if response.success {
        println!("{}", response.message.green());
    } else {
        print_failure(&response.message);
    }
    Ok(())
}

fn handle_template_status(api: &ApiClient) -> Result<()> {
    let response = api.get_award_template_status();
    match response.data {
        Some(status) if response.success => {
            println!("activator template: {}", yes_no(status.activator_available));
            println!("chaser template:    {}", yes_no(status.chaser_available));
        }
        _ => print_failure(response.message.as_deref().unwrap_or_default()),
    }
    Ok(())
}

fn handle_template_upload(api: &ApiClient) -> Result<()> {
    let kind = prompt_template_kind()?;
    let Some(file) = prompt_file("PDF file path")? else {
        return Ok(());
    };

    let result = with_spinner("Uploading template...", || {
        api.upload_award_template(kind, &file)
    })?;
    if result.success {
        match result.size {
            Some(size) => println!("{}", format!("{} ({} bytes)", result.message, size).green()),
            None => println!("{}", result.message.green()),
        }
    } else {
        print_failure(&result.message);
    }
    Ok(())
}

fn handle_award_config(api: &ApiClient) -> Result<()> {
    let response = with_spinner("Fetching layout...", || api.get_award_config())?;
    let Some(config) = response.data.filter(|_| response.success) else {
        print_failure(response.message.as_deref().unwrap_or_default());
        return Ok(());
    };
    print_layout(TemplateKind::Activator, &config.activator);
    print_layout(TemplateKind::Chaser, &config.chaser);

    if !Confirm::new().with_prompt("Change a layout?").default(false).interact()? {
        return Ok(());
    }
    let kind = prompt_template_kind()?;
    // blank answers leave the value unchanged
    let update = LayoutUpdate {
        callsign_x: prompt_number("Callsign x")?,
        callsign_y: prompt_number("Callsign y")?,
        callsign_font_size: prompt_number("Callsign font size")?,
        achievement_x: prompt_number("Achievement x")?,
        achievement_y: prompt_number("Achievement y")?,
        achievement_font_size: prompt_number("Achievement font size")?,
        ..LayoutUpdate::default()
    };
    if update.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    let response = api.update_award_config(&AwardConfigUpdate::for_template(kind, update));
    match response.data {
        Some(config) if response.success => {
            println!("{}", "Layout updated.".green());
            let layout = match kind {
                TemplateKind::Activator => &config.activator,
                TemplateKind::Chaser => &config.chaser,
            };
            print_layout(kind, layout);
        }
        _ => print_failure(response.message.as_deref().unwrap_or_default()),
    }
    Ok(())
}

fn handle_certificate(api: &ApiClient) -> Result<()> {
    let kind = prompt_template_kind()?;
    let callsign: String = Input::new().with_prompt("Callsign").interact_text()?;
    let count: u32 = Input::new()
        .with_prompt(match kind {
            TemplateKind::Activator => "Qualified summits",
            TemplateKind::Chaser => "Unique activators",
        })
        .interact_text()?;
    let request = CertificateRequest {
        kind,
        callsign: callsign.trim().to_uppercase(),
        count,
    };
    download_certificate(api, &request)
}

fn download_certificate(api: &ApiClient, request: &CertificateRequest) -> Result<()> {
    let download = with_spinner("Generating certificate...", || {
        api.download_award_certificate(request)
    })?;
    let (Some(pdf), Some(file_name)) = (download.pdf, download.file_name) else {
        print_failure(download.message.as_deref().unwrap_or_default());
        return Ok(());
    };
    let path: String = Input::new()
        .with_prompt("Save as")
        .default(file_name)
        .interact_text()?;
    std::fs::write(path.trim(), &pdf).with_context(|| format!("Failed to write {}", path))?;
    println!("{}", format!("Saved {} ({} bytes)", path.trim(), pdf.len()).green());
    Ok(())
}

fn prompt_template_kind() -> Result<TemplateKind> {
    let kinds = [TemplateKind::Activator, TemplateKind::Chaser];
    let labels: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
    Ok(kinds[Select::new().items(&labels).default(0).interact()?])
}

fn prompt_number(prompt: &str) -> Result<Option<f32>> {
    loop {
        let raw: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        match raw.parse::<f32>() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => print_failure(&format!("{} is not a number", raw)),
        }
    }
}

fn print_layout(kind: TemplateKind, layout: &TemplateLayout) {
    println!("{} template:", kind.as_str().bold());
    print_overlay("callsign", &layout.callsign);
    print_overlay("achievement", &layout.achievement);
    if let Some(issue_date) = &layout.issue_date {
        print_overlay("issue date", issue_date);
    }
}

fn print_overlay(label: &str, overlay: &TextOverlay) {
    let [r, g, b] = overlay.color;
    println!(
        "  {:<12} x={} y={} size={} rgb=({}, {}, {}){}",
        label,
        overlay.x,
        overlay.y,
        overlay.font_size,
        r,
        g,
        b,
        if overlay.centered { " centered" } else { "" }
    );
}

/// Ask for a path and read the file. Read errors are reported and yield
/// `None` so the menu can continue.
fn prompt_file(prompt: &str) -> Result<Option<UploadFile>> {
    let path: String = Input::new().with_prompt(prompt).interact_text()?;
    let path = PathBuf::from(path.trim());
    match UploadFile::from_path(&path) {
        Ok(file) => Ok(Some(file)),
        Err(e) => {
            print_failure(&format!("Cannot read {}: {}", path.display(), e));
            Ok(None)
        }
    }
}

fn with_spinner<T>(message: &'static str, f: impl FnOnce() -> T) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    Ok(out)
}

fn print_upload_result(result: &UploadResult) {
    if !result.success {
        match &result.code {
            Some(code) => print_failure(&format!("{} [{}]", result.message, code)),
            None => print_failure(&result.message),
        }
    } else {
        println!("{}", result.message.as_str().green());
        if let Some(skipped) = result.skipped {
            println!("skipped: {}", skipped);
        }
    }
    for err in &result.errors {
        println!("{}", format!("  line {}: {}", err.line, err.message).yellow());
    }
}

fn print_judgment(response: &AwardJudgmentResponse) {
    let Some(result) = response.result.as_ref().filter(|_| response.success) else {
        print_failure(response.message.as_deref().unwrap_or_default());
        return;
    };
    println!(
        "{} ({} QSOs, {} log, {} mode)",
        result.callsign.as_str().bold(),
        result.total_qsos,
        result.log_type.as_str(),
        result.mode
    );
    if let Some(activator) = &result.activator {
        println!(
            "activator award: {} ({} qualified summits)",
            achieved(activator.achieved),
            activator.qualified_summits
        );
        for summit in &activator.summits {
            println!(
                "  {} {} stations{}",
                summit.summit_code,
                summit.unique_stations,
                if summit.qualified { " *" } else { "" }
            );
        }
    }
    if let Some(chaser) = &result.chaser {
        println!("chaser award: {}", achieved(chaser.achieved));
        for summit in &chaser.qualified_summits {
            println!(
                "  {} {} activators: {}",
                summit.summit_code,
                summit.unique_activators,
                summit.activators.join(", ")
            );
        }
    }
}

fn print_failure(message: &str) {
    println!("{}", message.red());
}

fn achieved(flag: bool) -> String {
    if flag {
        "achieved".green().to_string()
    } else {
        "not achieved".yellow().to_string()
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "available"
    } else {
        "missing"
    }
}
