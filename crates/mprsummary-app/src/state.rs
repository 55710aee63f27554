// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ProductName, RequestToken, StatusRecord, StatusTable, VersionName};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    NoProduct,
    ProductSelected {
        product: ProductName,
    },
    ProductAndVersionSelected {
        product: ProductName,
        version: VersionName,
    },
}

impl Selection {
    pub fn product(&self) -> Option<&ProductName> {
        match self {
            Self::NoProduct => None,
            Self::ProductSelected { product } | Self::ProductAndVersionSelected { product, .. } => {
                Some(product)
            }
        }
    }

    pub fn version(&self) -> Option<&VersionName> {
        match self {
            Self::ProductAndVersionSelected { version, .. } => Some(version),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    Products,
    Versions,
    Counts,
    Total,
}

impl FetchKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Versions => "versions",
            Self::Counts => "prcount",
            Self::Total => "totalprcount",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Products {
        token: RequestToken,
    },
    Versions {
        token: RequestToken,
        product: ProductName,
    },
    Counts {
        token: RequestToken,
        product: ProductName,
        version: VersionName,
    },
    Total {
        token: RequestToken,
        product: ProductName,
        version: VersionName,
    },
}

impl FetchRequest {
    pub const fn token(&self) -> RequestToken {
        match self {
            Self::Products { token }
            | Self::Versions { token, .. }
            | Self::Counts { token, .. }
            | Self::Total { token, .. } => *token,
        }
    }

    pub const fn kind(&self) -> FetchKind {
        match self {
            Self::Products { .. } => FetchKind::Products,
            Self::Versions { .. } => FetchKind::Versions,
            Self::Counts { .. } => FetchKind::Counts,
            Self::Total { .. } => FetchKind::Total,
        }
    }
}

/// Latest outstanding token per fetch kind. `None` means nothing of that
/// kind is expected; any completion for it is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct PendingFetches {
    products: Option<RequestToken>,
    versions: Option<RequestToken>,
    counts: Option<RequestToken>,
    total: Option<RequestToken>,
}

impl PendingFetches {
    fn get(&self, kind: FetchKind) -> Option<RequestToken> {
        match kind {
            FetchKind::Products => self.products,
            FetchKind::Versions => self.versions,
            FetchKind::Counts => self.counts,
            FetchKind::Total => self.total,
        }
    }

    fn slot(&mut self, kind: FetchKind) -> &mut Option<RequestToken> {
        match kind {
            FetchKind::Products => &mut self.products,
            FetchKind::Versions => &mut self.versions,
            FetchKind::Counts => &mut self.counts,
            FetchKind::Total => &mut self.total,
        }
    }

    /// Consume the pending token for `kind` if it matches.
    fn settle(&mut self, kind: FetchKind, token: RequestToken) -> bool {
        let slot = self.slot(kind);
        if *slot == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    pub products: Vec<ProductName>,
    pub versions: Vec<VersionName>,
    pub selection: Selection,
    pub table: StatusTable,
    pub show_total: bool,
    pub provider_fault: bool,
    pub last_fault: Option<String>,
    pub dropped_records: usize,
    pub status_line: Option<String>,
    last_token: RequestToken,
    pending: PendingFetches,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            versions: Vec::new(),
            selection: Selection::NoProduct,
            table: StatusTable::default(),
            show_total: true,
            provider_fault: false,
            last_fault: None,
            dropped_records: 0,
            status_line: None,
            last_token: RequestToken::default(),
            pending: PendingFetches::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCommand {
    LoadProducts,
    SelectProduct(ProductName),
    SelectVersion(VersionName),
    RefreshCounts,
    ClearTable,
    ProductsLoaded {
        token: RequestToken,
        products: Vec<ProductName>,
    },
    VersionsLoaded {
        token: RequestToken,
        versions: Vec<VersionName>,
    },
    CountsLoaded {
        token: RequestToken,
        records: Vec<StatusRecord>,
    },
    TotalLoaded {
        token: RequestToken,
        count: u64,
    },
    ProviderFault {
        kind: FetchKind,
        token: RequestToken,
        message: String,
    },
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Fetch(FetchRequest),
    SelectionChanged(Selection),
    SelectionRejected(String),
    TableCleared,
    ProductsReplaced(usize),
    VersionsReplaced(usize),
    RowsUpdated,
    TotalUpdated(u64),
    InvalidStatusDropped(usize),
    StaleResponseDropped {
        kind: FetchKind,
        token: RequestToken,
    },
    ProviderDegraded(String),
    StatusUpdated(String),
    StatusCleared,
}

impl WidgetState {
    pub fn with_total(show_total: bool) -> Self {
        Self {
            show_total,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: WidgetCommand) -> Vec<WidgetEvent> {
        match command {
            WidgetCommand::LoadProducts => {
                let token = self.issue(FetchKind::Products);
                vec![WidgetEvent::Fetch(FetchRequest::Products { token })]
            }
            WidgetCommand::SelectProduct(product) => self.select_product(product),
            WidgetCommand::SelectVersion(version) => self.select_version(version),
            WidgetCommand::RefreshCounts => match self.selection.clone() {
                Selection::ProductAndVersionSelected { product, version } => {
                    let mut events = self.clear_table();
                    events.push(self.request_counts(product, version));
                    events
                }
                _ => vec![self.reject("pick a product and version first")],
            },
            WidgetCommand::ClearTable => self.clear_table(),
            WidgetCommand::ProductsLoaded { token, products } => {
                if !self.pending.settle(FetchKind::Products, token) {
                    return vec![stale(FetchKind::Products, token)];
                }
                self.products = products;
                let mut events = vec![WidgetEvent::ProductsReplaced(self.products.len())];
                events.extend(self.drop_vanished_product());
                events
            }
            WidgetCommand::VersionsLoaded { token, versions } => {
                if !self.pending.settle(FetchKind::Versions, token) {
                    return vec![stale(FetchKind::Versions, token)];
                }
                self.versions = versions;
                vec![WidgetEvent::VersionsReplaced(self.versions.len())]
            }
            WidgetCommand::CountsLoaded { token, records } => {
                if !self.pending.settle(FetchKind::Counts, token) {
                    return vec![stale(FetchKind::Counts, token)];
                }
                self.apply_counts(&records)
            }
            WidgetCommand::TotalLoaded { token, count } => {
                if !self.pending.settle(FetchKind::Total, token) {
                    return vec![stale(FetchKind::Total, token)];
                }
                self.table.set_total(count);
                vec![WidgetEvent::TotalUpdated(count)]
            }
            WidgetCommand::ProviderFault {
                kind,
                token,
                message,
            } => {
                if !self.pending.settle(kind, token) {
                    return vec![stale(kind, token)];
                }
                self.provider_fault = true;
                self.last_fault = Some(format!("{}: {message}", kind.as_str()));
                vec![WidgetEvent::ProviderDegraded(message)]
            }
            WidgetCommand::SetStatus(message) => vec![self.set_status(message)],
            WidgetCommand::ClearStatus => {
                self.status_line = None;
                vec![WidgetEvent::StatusCleared]
            }
        }
    }

    pub fn is_loading(&self, kind: FetchKind) -> bool {
        self.pending.get(kind).is_some()
    }

    pub fn has_pending_fetch(&self) -> bool {
        [
            FetchKind::Products,
            FetchKind::Versions,
            FetchKind::Counts,
            FetchKind::Total,
        ]
        .into_iter()
        .any(|kind| self.is_loading(kind))
    }

    fn select_product(&mut self, product: ProductName) -> Vec<WidgetEvent> {
        if !self.products.contains(&product) {
            return vec![self.reject(&format!("product {product:?} is not in the loaded list"))];
        }

        self.selection = Selection::ProductSelected {
            product: product.clone(),
        };
        self.versions.clear();
        let mut events = vec![WidgetEvent::SelectionChanged(self.selection.clone())];
        events.extend(self.clear_table());

        let token = self.issue(FetchKind::Versions);
        events.push(WidgetEvent::Fetch(FetchRequest::Versions { token, product }));
        events
    }

    fn select_version(&mut self, version: VersionName) -> Vec<WidgetEvent> {
        let Some(product) = self.selection.product().cloned() else {
            return vec![self.reject("pick a product before a version")];
        };
        if !self.versions.contains(&version) {
            return vec![self.reject(&format!(
                "version {version:?} is not available for {product}"
            ))];
        }

        self.selection = Selection::ProductAndVersionSelected {
            product: product.clone(),
            version: version.clone(),
        };
        let mut events = vec![WidgetEvent::SelectionChanged(self.selection.clone())];
        events.extend(self.clear_table());
        events.push(self.request_counts(product, version));
        events
    }

    /// A reload keeps the selection only while the product is still offered.
    fn drop_vanished_product(&mut self) -> Vec<WidgetEvent> {
        let Some(product) = self.selection.product().cloned() else {
            return Vec::new();
        };
        if self.products.contains(&product) {
            return Vec::new();
        }

        self.selection = Selection::NoProduct;
        self.versions.clear();
        self.pending.versions = None;
        let mut events = vec![WidgetEvent::SelectionChanged(Selection::NoProduct)];
        events.extend(self.clear_table());
        events.push(self.set_status(format!(
            "product {product} is no longer offered; selection cleared"
        )));
        events
    }

    fn clear_table(&mut self) -> Vec<WidgetEvent> {
        self.table.clear();
        self.dropped_records = 0;
        self.pending.counts = None;
        self.pending.total = None;
        vec![WidgetEvent::TableCleared]
    }

    fn request_counts(&mut self, product: ProductName, version: VersionName) -> WidgetEvent {
        let token = self.issue(FetchKind::Counts);
        WidgetEvent::Fetch(FetchRequest::Counts {
            token,
            product,
            version,
        })
    }

    fn apply_counts(&mut self, records: &[StatusRecord]) -> Vec<WidgetEvent> {
        let dropped = self.table.apply_records(records);
        self.dropped_records = dropped;

        let mut events = vec![WidgetEvent::RowsUpdated];
        if dropped > 0 {
            events.push(WidgetEvent::InvalidStatusDropped(dropped));
        }

        if self.show_total
            && let Selection::ProductAndVersionSelected { product, version } =
                self.selection.clone()
        {
            let token = self.issue(FetchKind::Total);
            events.push(WidgetEvent::Fetch(FetchRequest::Total {
                token,
                product,
                version,
            }));
        }
        events
    }

    fn issue(&mut self, kind: FetchKind) -> RequestToken {
        self.last_token = self.last_token.next();
        *self.pending.slot(kind) = Some(self.last_token);
        self.last_token
    }

    fn reject(&mut self, reason: &str) -> WidgetEvent {
        self.status_line = Some(reason.to_owned());
        WidgetEvent::SelectionRejected(reason.to_owned())
    }

    fn set_status(&mut self, message: String) -> WidgetEvent {
        self.status_line = Some(message.clone());
        WidgetEvent::StatusUpdated(message)
    }
}

fn stale(kind: FetchKind, token: RequestToken) -> WidgetEvent {
    WidgetEvent::StaleResponseDropped { kind, token }
}
