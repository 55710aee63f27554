// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use mprsummary_testkit::{
    MockBackend, MockRoute, SAMPLE_PRODUCT, SAMPLE_VERSION, products_body, sample_routes,
};
use std::path::Path;
use std::process::{Command, Output};

fn mprsummary(home: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_mprsummary"))
        .args(args)
        .env("MPRSUMMARY_CONFIG_PATH", home.join("config.toml"))
        .env("MPRSUMMARY_LOG_DIR", home.join("logs"))
        .env_remove("MPRSUMMARY_BASE_URL")
        .output()?;
    Ok(output)
}

#[test]
fn summary_prints_table_for_selection() -> Result<()> {
    let home = tempfile::tempdir()?;
    let backend = MockBackend::start(sample_routes())?;

    let output = mprsummary(
        home.path(),
        &[
            "--base-url",
            backend.base_url(),
            "--summary",
            "--product",
            SAMPLE_PRODUCT,
            "--version",
            SAMPLE_VERSION,
        ],
    )?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout)?;
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "Analytics 4.1.0");
    assert!(lines[1].starts_with("Doc Status"));
    assert!(lines[7].starts_with("Total no of MPRs with pending documentation tasks"));
    assert!(lines[7].ends_with('7'));
    Ok(())
}

#[test]
fn summary_respects_show_total_from_config() -> Result<()> {
    let home = tempfile::tempdir()?;
    let backend = MockBackend::start(sample_routes())?;
    std::fs::write(
        home.path().join("config.toml"),
        format!(
            "version = 1\n[backend]\nbase_url = \"{}\"\n[ui]\nshow_total = false\n",
            backend.base_url()
        ),
    )?;

    let output = mprsummary(
        home.path(),
        &["--summary", "--product", SAMPLE_PRODUCT, "--version", SAMPLE_VERSION],
    )?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 7);
    assert!(!stdout.contains("Total no of MPRs"));
    assert!(
        !backend
            .requests()
            .iter()
            .any(|url| url.starts_with("/totalprcount"))
    );
    Ok(())
}

#[test]
fn degraded_backend_exits_with_error() -> Result<()> {
    let home = tempfile::tempdir()?;
    let backend = MockBackend::start(vec![
        MockRoute::json("/products", products_body(&[SAMPLE_PRODUCT])),
        MockRoute::raw("/versions", 500, r#"{"error":"index rebuilding"}"#),
    ])?;

    let output = mprsummary(
        home.path(),
        &[
            "--base-url",
            backend.base_url(),
            "--summary",
            "--product",
            SAMPLE_PRODUCT,
            "--version",
            SAMPLE_VERSION,
        ],
    )?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("index rebuilding"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn check_reports_product_count() -> Result<()> {
    let home = tempfile::tempdir()?;
    let backend = MockBackend::start(sample_routes())?;

    let output = mprsummary(home.path(), &["--base-url", backend.base_url(), "--check"])?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.starts_with("ok: 2 products at"));
    Ok(())
}

#[test]
fn unknown_flag_exits_with_error() -> Result<()> {
    let home = tempfile::tempdir()?;
    let output = mprsummary(home.path(), &["--frobnicate"])?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)?.contains("unknown argument"));
    Ok(())
}

#[test]
fn print_config_path_uses_env_override() -> Result<()> {
    let home = tempfile::tempdir()?;
    let output = mprsummary(home.path(), &["--print-config-path"])?;
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout)?.trim(),
        home.path().join("config.toml").display().to_string()
    );
    Ok(())
}
