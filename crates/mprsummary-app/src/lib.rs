// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod model;
pub mod state;

pub use ids::*;
pub use model::*;
pub use state::*;

/// Name the widget is registered under in the host dashboard.
pub const WIDGET_NAME: &str = "MPRSummary";
