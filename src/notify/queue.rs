use crate::notify::alerts::{AlertDispatcher, FraudAlert};
use crate::notify::pool::{PoolContribution, PoolNotifier};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};

#[derive(Debug, Clone)]
pub enum SideEffect {
    FraudAlert(FraudAlert),
    PoolContribution(PoolContribution),
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::FraudAlert(_) => "fraud_alert",
            SideEffect::PoolContribution(_) => "pool_contribution",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SideEffectFailure {
    pub kind: &'static str,
    pub error: String,
}

#[derive(Clone)]
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffectQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SideEffect>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, effect: SideEffect) {
        match self.tx.try_send(effect) {
            Ok(()) => {}
            Err(TrySendError::Full(effect)) => {
                tracing::warn!(kind = effect.kind(), "side-effect queue full, dropping");
            }
            Err(TrySendError::Closed(effect)) => {
                tracing::warn!(kind = effect.kind(), "side-effect worker stopped, dropping");
            }
        }
    }
}

#[derive(Clone)]
pub struct SideEffectWorker {
    pub alerts: AlertDispatcher,
    pub pools: PoolNotifier,
    pub failures: mpsc::Sender<SideEffectFailure>,
    pub in_flight: Arc<Semaphore>,
}

impl SideEffectWorker {
    /// At most `max_in_flight` deliveries run at once. Anything beyond that
    /// waits in the queue, and a full queue drops.
    pub fn spawn(
        alerts: AlertDispatcher,
        pools: PoolNotifier,
        capacity: usize,
        max_in_flight: usize,
    ) -> (SideEffectQueue, mpsc::Receiver<SideEffectFailure>) {
        let (queue, rx) = SideEffectQueue::channel(capacity);
        let (failures, failures_rx) = mpsc::channel(capacity);
        let worker = SideEffectWorker {
            alerts,
            pools,
            failures,
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
        };
        tokio::spawn(worker.run(rx));
        (queue, failures_rx)
    }

    pub async fn run(self, mut rx: mpsc::Receiver<SideEffect>) {
        while let Some(effect) = rx.recv().await {
            let Ok(permit) = self.in_flight.clone().acquire_owned().await else {
                break;
            };
            let worker = self.clone();
            tokio::spawn(async move {
                worker.handle(effect).await;
                drop(permit);
            });
        }
        tracing::info!("side-effect queue closed");
    }

    pub async fn handle(&self, effect: SideEffect) {
        let kind = effect.kind();
        let result = match &effect {
            SideEffect::FraudAlert(alert) => self.alerts.emit(alert).await,
            SideEffect::PoolContribution(c) => self.pools.notify(c).await,
        };

        if let Err(e) = result {
            let failure = SideEffectFailure {
                kind,
                error: format!("{:#}", e),
            };
            if let Err(TrySendError::Full(f) | TrySendError::Closed(f)) = self.failures.try_send(failure) {
                tracing::warn!(kind = f.kind, error = %f.error, "side effect failed");
            }
        }
    }
}

pub async fn drain_failures(mut rx: mpsc::Receiver<SideEffectFailure>) {
    while let Some(f) = rx.recv().await {
        tracing::warn!(kind = f.kind, error = %f.error, "side effect failed");
    }
}
