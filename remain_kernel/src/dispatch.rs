/// Remain Kernel — Dispatch Engine
///
/// Top-level router. Resolves, once per registry, which strategies are
/// eligible for each operation kind; per call it walks that plan and
/// falls through on recoverable failures only.
///
/// The engine never re-probes and never retries a strategy that failed.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::capability::CapabilityRegistry;
use crate::error::RemainError;
use crate::host::Host;
use crate::operation::{Operation, OperationKind, Outcome};
use crate::strategies::{default_table, StrategyTable};
use crate::strategy::{Strategy, StrategyContext, StrategyError};

/// Result of a successful dispatch: which strategy ran, and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub strategy: &'static str,
    pub outcome: Outcome,
}

/// Immutable after construction; share it behind an `Arc`.
pub struct DispatchEngine {
    registry: Arc<CapabilityRegistry>,
    plans: BTreeMap<OperationKind, Vec<Strategy>>,
}

impl DispatchEngine {
    /// Engine over the default strategy table.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self::with_table(registry, default_table())
    }

    /// Engine over a custom table. Ineligible strategies are dropped here,
    /// so selection is fixed for the lifetime of the engine.
    pub fn with_table(registry: Arc<CapabilityRegistry>, table: StrategyTable) -> Self {
        let plans = table
            .into_iter()
            .map(|(kind, strategies)| {
                let eligible: Vec<Strategy> = strategies
                    .into_iter()
                    .filter(|s| s.eligible(&registry))
                    .collect();
                debug!(
                    operation = %kind,
                    plan = ?eligible.iter().map(|s| s.name).collect::<Vec<_>>(),
                    "dispatch plan"
                );
                (kind, eligible)
            })
            .collect();
        Self { registry, plans }
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Eligible strategy names for `kind`, most preferred first.
    pub fn plan(&self, kind: OperationKind) -> Vec<&'static str> {
        self.plans
            .get(&kind)
            .map(|s| s.iter().map(|s| s.name).collect())
            .unwrap_or_default()
    }

    /// The strategy that will be tried first for `kind`, if any.
    pub fn resolve(&self, kind: OperationKind) -> Option<&'static str> {
        self.plans.get(&kind).and_then(|s| s.first()).map(|s| s.name)
    }

    /// Run `op` on `host`:
    ///   1. Look up the precomputed plan for the operation kind
    ///   2. Invoke strategies in order
    ///   3. Recoverable failure -> next strategy; fatal -> return it
    ///   4. Plan exhausted -> `Unsupported`
    pub fn execute(&self, host: &dyn Host, op: &Operation) -> Result<Dispatched, RemainError> {
        let kind = op.kind();
        let ctx = StrategyContext {
            host,
            registry: &self.registry,
        };

        for strategy in self.plans.get(&kind).map(Vec::as_slice).unwrap_or_default() {
            match (strategy.run)(&ctx, op) {
                Ok(outcome) => {
                    return Ok(Dispatched {
                        strategy: strategy.name,
                        outcome,
                    })
                }
                Err(StrategyError::Recoverable(reason)) => {
                    debug!(operation = %kind, strategy = strategy.name, %reason, "strategy fell through");
                }
                Err(StrategyError::Fatal(err)) => {
                    warn!(operation = %kind, strategy = strategy.name, error = %err, "strategy failed");
                    return Err(err);
                }
            }
        }

        Err(RemainError::Unsupported {
            operation: kind,
            version: self.registry.version(),
        })
    }
}
