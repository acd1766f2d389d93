// src/measure/mod.rs

//! Page-measurement engine abstraction.
//!
//! The orchestrator talks to a `MeasurementEngine` instead of spawning
//! Lighthouse itself, so tests can swap in a fake engine that records the
//! calls and returns canned payloads.

pub mod lighthouse;

use serde_json::Value;

use crate::errors::Result;
use crate::session::NavigationHook;
use crate::types::BoxFuture;

pub use lighthouse::LighthouseCli;

/// One measurement pass: the raw result payload and the rendered report.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub payload: Value,
    pub rendered_report: String,
}

/// How the engine reaches the browser and what to apply on navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureOptions {
    /// Remote debugging port of the automation session.
    pub port: u16,
    pub navigation: Option<NavigationHook>,
}

pub trait MeasurementEngine: Send + Sync {
    /// Run exactly one measurement of `url`. Never retried by the caller.
    fn measure<'a>(
        &'a self,
        url: &'a str,
        options: &'a MeasureOptions,
    ) -> BoxFuture<'a, Result<Measurement>>;
}
