// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use mprsummary_app::{Theme, WidgetState};
use mprsummary_client::Client;
use runtime::{HttpRuntime, run_summary};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `mprsummary --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    if let Err(error) = logging::default_log_dir().and_then(|dir| logging::init(&dir)) {
        eprintln!("warning: logging disabled: {error:#}");
    }

    let base_url = options
        .base_url
        .clone()
        .unwrap_or_else(|| config.base_url());
    let client = Client::new(&base_url, config.timeout()?).with_context(|| {
        format!(
            "invalid [backend] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        let products = client.ping().context("check backend /products")?;
        println!("ok: {products} products at {}", client.base_url());
        return Ok(());
    }

    let mut state = WidgetState::with_total(config.show_total());
    let mut runtime = HttpRuntime::new(client);

    if let Some(summary) = &options.summary {
        let text = run_summary(
            &mut state,
            &mut runtime,
            &summary.product,
            &summary.version,
        )?;
        print!("{text}");
        return Ok(());
    }

    let theme = match options.theme {
        Some(theme) => theme,
        None => config.theme()?,
    };
    tracing::info!(base_url = %base_url, theme = theme.as_str(), "starting widget");
    mprsummary_tui::run_app(&mut state, &mut runtime, theme)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SummaryTarget {
    product: String,
    version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    theme: Option<Theme>,
    base_url: Option<String>,
    summary: Option<SummaryTarget>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        theme: None,
        base_url: None,
        summary: None,
    };
    let mut summary = false;
    let mut product = None;
    let mut version = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--theme" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--theme requires dark or light"))?;
                options.theme = Some(Theme::parse(value.as_ref()).context("--theme")?);
            }
            "--base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--base-url requires a URL"))?;
                options.base_url = Some(value.as_ref().to_owned());
            }
            "--product" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--product requires a product name"))?;
                product = Some(value.as_ref().to_owned());
            }
            "--version" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--version requires a version name"))?;
                version = Some(value.as_ref().to_owned());
            }
            "--summary" => {
                summary = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    options.summary = match (summary, product, version) {
        (true, Some(product), Some(version)) => Some(SummaryTarget { product, version }),
        (true, _, _) => {
            return Err(anyhow!("--summary requires both --product and --version"));
        }
        (false, None, None) => None,
        (false, _, _) => {
            return Err(anyhow!("--product and --version only apply with --summary"));
        }
    };

    Ok(options)
}

fn print_help() {
    println!("mprsummary: MPR documentation status by product and version");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and reach the backend once");
    println!("  --theme <dark|light>     Override [ui].theme");
    println!("  --base-url <url>         Override [backend].base_url");
    println!("  --summary                Print the table for --product/--version and exit");
    println!("  --product <name>         Product line for --summary");
    println!("  --version <name>         Product version for --summary");
    println!("  --help                   Show this help");
}
