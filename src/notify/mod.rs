pub mod alerts;
pub mod pool;
pub mod queue;

pub use alerts::{AlertDispatcher, FraudAlert};
pub use pool::{contribution_for, PoolContribution, PoolNotifier};
pub use queue::{drain_failures, SideEffect, SideEffectFailure, SideEffectQueue, SideEffectWorker};
