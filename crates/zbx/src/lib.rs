//! # zbx
//!
//! Library core of the `zbx` command-line operator tool for Zabbix.
//!
//! Zabbix exposes a JSON-RPC 2.0 API over HTTP; this crate wraps it in a
//! typed, version-aware client plus the bulk-transfer machinery an operator
//! needs. The front-end (CLI, REPL, scripts) stays thin: it resolves
//! credentials, holds one [`client::ZabbixClient`] and calls into it.
//!
//! ## Pieces
//!
//! - [`rpc`] — JSON-RPC transport: envelope, auth placement (header from
//!   6.4, body before), error classification, secret redaction.
//! - [`client`] — one typed method per logical action on hosts, groups,
//!   templates, users, proxies, macros, maintenances, events, triggers,
//!   items, media types, images and maps.
//! - [`session`] — login orchestration: gathers credential candidates,
//!   probes them in order, persists the winning session.
//! - [`cache`] — in-memory name↔ID maps for host and template groups.
//! - [`export`] / [`import`] — `configuration.export` into a sanitized
//!   filesystem tree, and per-file `configuration.import` with rule sets.
//! - [`error`] — the tagged error taxonomy everything above reports with.
//!
//! Version-dependent parameter spellings come from [`zbx_version`]; session
//! files and credential ordering from [`zbx_auth`]; configuration from
//! [`zbx_config`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod cache;
pub mod client;
pub mod enums;
pub mod error;
pub mod export;
pub mod import;
pub mod params;
pub mod rpc;
pub mod session;
pub mod types;

pub use error::{ApiError, ApiErrorKind, Error};
pub use zbx_version::{ApiVersion, VersionTraits};

/// A non-fatal condition surfaced to the front-end instead of being logged
/// away, e.g. a pretty-print downgrade during XML export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning(pub String);

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cooperative cancellation signal for long-running operations.
///
/// Checked before every outbound request and between exported/imported
/// objects. Cancellation does not roll back partial on-disk results.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress sink implemented by the front-end.
pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Reporter that drops everything. Useful for tests and non-interactive use.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn info(&mut self, _msg: &str) {}
    fn warn(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}
