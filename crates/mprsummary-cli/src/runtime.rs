// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use mprsummary_app::{
    FetchRequest, ProductName, VersionName, WidgetCommand, WidgetEvent, WidgetState,
};
use mprsummary_client::Client;
use mprsummary_tui::{InternalEvent, WidgetRuntime, render_summary_text, settle};
use std::sync::mpsc::Sender;
use std::thread;

/// Backend runtime that talks to the MPR service over HTTP.
pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl WidgetRuntime for HttpRuntime {
    fn fetch(&mut self, request: &FetchRequest) -> WidgetCommand {
        self.client.execute(request)
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("fetch-{}", request.kind().as_str()))
            .spawn(move || {
                let completion = client.execute(&request);
                let _ = tx.send(InternalEvent::FetchCompleted(completion));
            })
            .context("spawn fetch thread")?;
        Ok(())
    }
}

/// Drive the widget headlessly through product and version selection and
/// render the resulting table as text.
pub fn run_summary<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    product: &str,
    version: &str,
) -> Result<String> {
    settle(state, runtime, WidgetCommand::LoadProducts);
    ensure_healthy(state, "load products")?;

    let events = settle(
        state,
        runtime,
        WidgetCommand::SelectProduct(ProductName::from(product)),
    );
    ensure_accepted(&events).with_context(|| {
        format!(
            "available products: {}",
            join_or_none(state.products.iter().map(ProductName::as_str))
        )
    })?;
    ensure_healthy(state, "load versions")?;

    let events = settle(
        state,
        runtime,
        WidgetCommand::SelectVersion(VersionName::from(version)),
    );
    ensure_accepted(&events).with_context(|| {
        format!(
            "available versions of {product}: {}",
            join_or_none(state.versions.iter().map(VersionName::as_str))
        )
    })?;
    ensure_healthy(state, "load status counts")?;

    Ok(render_summary_text(state))
}

fn ensure_healthy(state: &WidgetState, step: &str) -> Result<()> {
    if state.provider_fault {
        let detail = state.last_fault.as_deref().unwrap_or("unknown provider error");
        bail!("{step} failed: {detail}");
    }
    Ok(())
}

fn ensure_accepted(events: &[WidgetEvent]) -> Result<()> {
    for event in events {
        if let WidgetEvent::SelectionRejected(reason) = event {
            bail!("{reason}");
        }
    }
    Ok(())
}

fn join_or_none<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "(none)".to_owned()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpRuntime, run_summary};
    use anyhow::Result;
    use mprsummary_app::{
        DocStatus, FetchKind, FetchRequest, ProductName, RequestToken, VersionName,
        WidgetCommand, WidgetEvent, WidgetState,
    };
    use mprsummary_client::Client;
    use mprsummary_testkit::{
        MockBackend, MockRoute, SAMPLE_PRODUCT, SAMPLE_VERSION, prcount_body, products_body,
        record, sample_routes, versions_body,
    };
    use mprsummary_tui::{InternalEvent, WidgetRuntime, settle};
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime_for(backend: &MockBackend) -> Result<HttpRuntime> {
        Ok(HttpRuntime::new(Client::new(
            backend.base_url(),
            Duration::from_secs(2),
        )?))
    }

    #[test]
    fn spawn_fetch_delivers_completion_over_channel() -> Result<()> {
        let backend = MockBackend::start(sample_routes())?;
        let mut runtime = runtime_for(&backend)?;
        let (tx, rx) = mpsc::channel();

        runtime.spawn_fetch(
            FetchRequest::Products {
                token: RequestToken::new(1),
            },
            tx,
        )?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::FetchCompleted(WidgetCommand::ProductsLoaded {
                token: RequestToken::new(1),
                products: vec![
                    ProductName::from(SAMPLE_PRODUCT),
                    ProductName::from("Identity Server"),
                ],
            })
        );
        Ok(())
    }

    #[test]
    fn summary_renders_sample_breakdown() -> Result<()> {
        let backend = MockBackend::start(sample_routes())?;
        let mut runtime = runtime_for(&backend)?;
        let mut state = WidgetState::default();

        let text = run_summary(&mut state, &mut runtime, SAMPLE_PRODUCT, SAMPLE_VERSION)?;
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Analytics 4.1.0");
        assert!(lines[2].starts_with("Not Started"));
        assert!(lines[2].trim_end().ends_with('3'));
        assert!(lines[7].trim_end().ends_with('7'));
        assert_eq!(
            backend.requests(),
            vec![
                "/products".to_owned(),
                "/versions?product=Analytics".to_owned(),
                "/prcount?product=Analytics&version=4.1.0".to_owned(),
                "/totalprcount?product=Analytics&version=4.1.0".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn summary_lists_known_products_when_selection_is_unknown() -> Result<()> {
        let backend = MockBackend::start(sample_routes())?;
        let mut runtime = runtime_for(&backend)?;
        let mut state = WidgetState::default();

        let error = run_summary(&mut state, &mut runtime, "Gateway", SAMPLE_VERSION)
            .expect_err("unknown product should fail");
        let message = format!("{error:#}");
        assert!(message.contains("Analytics, Identity Server"), "got {message}");
        Ok(())
    }

    #[test]
    fn summary_fails_when_versions_endpoint_is_down() -> Result<()> {
        let backend = MockBackend::start(vec![
            MockRoute::json("/products", products_body(&[SAMPLE_PRODUCT])),
            MockRoute::raw("/versions", 503, "maintenance"),
        ])?;
        let mut runtime = runtime_for(&backend)?;
        let mut state = WidgetState::default();

        let error = run_summary(&mut state, &mut runtime, SAMPLE_PRODUCT, SAMPLE_VERSION)
            .expect_err("versions outage should fail");
        let message = error.to_string();
        assert!(message.starts_with("load versions"), "got {message}");
        assert!(message.contains("maintenance"), "got {message}");
        assert!(state.provider_fault);
        Ok(())
    }

    #[test]
    fn slow_superseded_counts_are_dropped() -> Result<()> {
        let backend = MockBackend::start(vec![
            MockRoute::json("/products", products_body(&[SAMPLE_PRODUCT])),
            MockRoute::json("/versions", versions_body(&[SAMPLE_VERSION, "4.2.0"])),
            MockRoute::json(
                "/prcount?product=Analytics&version=4.1.0",
                prcount_body(&[record(0, 11)]),
            )
            .delayed(Duration::from_millis(400)),
            MockRoute::json(
                "/prcount?product=Analytics&version=4.2.0",
                prcount_body(&[record(3, 5)]),
            ),
        ])?;
        let mut runtime = runtime_for(&backend)?;
        let mut state = WidgetState::with_total(false);
        settle(&mut state, &mut runtime, WidgetCommand::LoadProducts);
        settle(
            &mut state,
            &mut runtime,
            WidgetCommand::SelectProduct(ProductName::from(SAMPLE_PRODUCT)),
        );

        let (tx, rx) = mpsc::channel();
        for version in [SAMPLE_VERSION, "4.2.0"] {
            let events = state.dispatch(WidgetCommand::SelectVersion(VersionName::from(version)));
            for event in events {
                if let WidgetEvent::Fetch(request) = event {
                    runtime.spawn_fetch(request, tx.clone())?;
                }
            }
        }

        let mut stale = Vec::new();
        for _ in 0..2 {
            let InternalEvent::FetchCompleted(command) = rx.recv_timeout(Duration::from_secs(5))?
            else {
                panic!("expected a fetch completion");
            };
            for event in state.dispatch(command) {
                if let WidgetEvent::StaleResponseDropped { kind, .. } = event {
                    stale.push(kind);
                }
            }
        }

        assert_eq!(stale, vec![FetchKind::Counts]);
        assert_eq!(state.table.count_for(DocStatus::InProgress), 5);
        assert_eq!(state.table.count_for(DocStatus::NotStarted), 0);
        assert!(!state.provider_fault);
        Ok(())
    }
}
