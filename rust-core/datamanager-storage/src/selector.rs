// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Backend selection.
//!
//! Decides which backend kind a store config actually gets, given the kinds
//! whose capability probe passed. Selection works on kind *names* so that an
//! unknown requested name can still fall back to a known one; turning the
//! chosen name into a [`BackendKind`] happens afterwards, at construction.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::adapter::BackendKind;
use crate::config::StoreSettings;

/// Fallback order used when a store does not supply its own.
pub const DEFAULT_PREFERRED: [&str; 4] = ["IndexedDB", "WebSQL", "SessionLocal", "Memory"];

/// Backend kinds usable in this environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    valid: BTreeSet<BackendKind>,
}

impl Capabilities {
    /// Run every kind's probe once.
    pub fn probe() -> Self {
        let valid = BackendKind::ALL
            .into_iter()
            .filter(|kind| {
                let ok = kind.is_valid();
                debug!(kind = %kind, valid = ok, "probed backend");
                ok
            })
            .collect();
        Self { valid }
    }

    /// A fixed capability table, e.g. for tests or constrained deployments.
    pub fn from_kinds(kinds: impl IntoIterator<Item = BackendKind>) -> Self {
        Self {
            valid: kinds.into_iter().collect(),
        }
    }

    /// Whether the kind called `name` is usable. Unknown names never are.
    pub fn contains(&self, name: &str) -> bool {
        name.parse::<BackendKind>()
            .map(|kind| self.valid.contains(&kind))
            .unwrap_or(false)
    }

    pub fn contains_kind(&self, kind: BackendKind) -> bool {
        self.valid.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.valid.iter().copied()
    }
}

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Kind name to construct.
    pub kind: String,
    /// Whether `kind` replaced the requested kind.
    pub fell_back: bool,
    /// The request was for IndexedDB or WebSQL and was served by a fallback.
    pub legacy_async: bool,
}

/// Choose the kind for a store that asked for `requested`.
///
/// The requested kind is kept when fallback is disabled or the kind is
/// usable. Otherwise the first usable kind in the preferred order wins; if
/// none is usable the requested kind is kept and construction will report
/// it.
pub fn select(requested: &str, settings: &StoreSettings, capabilities: &Capabilities) -> Selection {
    let keep = || Selection {
        kind: requested.to_string(),
        fell_back: false,
        legacy_async: false,
    };

    if !settings.fallback || capabilities.contains(requested) {
        return keep();
    }

    let preferred: Vec<&str> = match &settings.preferred {
        Some(list) => list.iter().map(String::as_str).collect(),
        None => DEFAULT_PREFERRED.to_vec(),
    };

    match preferred.into_iter().find(|name| capabilities.contains(name)) {
        Some(kind) => {
            info!(requested, selected = kind, "backend unavailable, falling back");
            Selection {
                kind: kind.to_string(),
                fell_back: true,
                legacy_async: matches!(requested, "IndexedDB" | "WebSQL"),
            }
        }
        None => keep(),
    }
}
