// src/types.rs

//! Small shared types.

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the collaborator traits (`MeasurementEngine`,
/// `BrowserLauncher`, `LoginProvider`, ...), so they stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
