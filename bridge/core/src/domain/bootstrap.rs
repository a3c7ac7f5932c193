// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;
use thiserror::Error;

use super::error::{BridgeError, ErrorKind};

/// Phases of a single bootstrap run, in the only order they may occur.
///
/// `Failed` is terminal. There is no in-process retry; a restart is the only
/// way out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapPhase {
    Unstarted,
    StoresLoaded,
    ContextInstalled,
    FactoryProbed,
    PooledFactoryReady,
    Failed,
}

impl BootstrapPhase {
    /// Phase reached after a successful step from `self`.
    pub fn next(self) -> Option<BootstrapPhase> {
        match self {
            BootstrapPhase::Unstarted => Some(BootstrapPhase::StoresLoaded),
            BootstrapPhase::StoresLoaded => Some(BootstrapPhase::ContextInstalled),
            BootstrapPhase::ContextInstalled => Some(BootstrapPhase::FactoryProbed),
            BootstrapPhase::FactoryProbed => Some(BootstrapPhase::PooledFactoryReady),
            BootstrapPhase::PooledFactoryReady | BootstrapPhase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BootstrapPhase::PooledFactoryReady | BootstrapPhase::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapPhase::Unstarted => "UNSTARTED",
            BootstrapPhase::StoresLoaded => "STORES_LOADED",
            BootstrapPhase::ContextInstalled => "CONTEXT_INSTALLED",
            BootstrapPhase::FactoryProbed => "FACTORY_PROBED",
            BootstrapPhase::PooledFactoryReady => "POOLED_FACTORY_READY",
            BootstrapPhase::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bootstrap run that ended in [`BootstrapPhase::Failed`].
///
/// `reached` is the last phase completed before the failing step, which is
/// what tells an operator whether store loading, context init or the broker
/// connection broke.
#[derive(Debug, Error)]
#[error("bootstrap failed after {reached}: {source}")]
pub struct BootstrapFailure {
    pub reached: BootstrapPhase,
    #[source]
    pub source: BridgeError,
}

impl BootstrapFailure {
    pub fn new(reached: BootstrapPhase, source: BridgeError) -> Self {
        Self { reached, source }
    }

    pub fn phase(&self) -> BootstrapPhase {
        BootstrapPhase::Failed
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}
