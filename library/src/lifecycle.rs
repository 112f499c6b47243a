//! Cooperative shutdown shared by long-running listeners and in-flight requests
//!
//! A single [`ShutdownTrigger`] controls any number of [`ShutdownSignal`] clones.
//! Listeners stop consuming their topics and waiters return without a result
//! once the signal fires. Dropping the trigger counts as firing it so that no
//! task outlives the component that owns the trigger.

use tokio::sync::watch;

/// Creates a linked trigger and signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Remote control which fires all linked [`ShutdownSignals`](ShutdownSignal)
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Fires the signal. Repeated calls have no further effect.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Creates an additional signal linked to this trigger
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`ShutdownTrigger`]
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested (or the trigger is gone)
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Completes once shutdown has been requested
    ///
    /// Cancel safe, the future may be dropped and recreated in a `select!` loop.
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use futures::poll;
    use std::time::Duration;
    use tokio::task::{spawn, yield_now};
    use tokio::time::sleep;

    #[tokio::test]
    async fn stay_pending_until_triggered() {
        let (trigger, mut signal) = shutdown_channel();

        let handle = spawn(async move { signal.triggered().await });
        sleep(Duration::from_millis(20)).await;
        yield_now().await;
        assert!(!poll!(handle).is_ready());

        trigger.trigger();
    }

    #[tokio::test]
    async fn fire_every_clone() {
        let (trigger, signal) = shutdown_channel();
        let mut first = signal.clone();
        let mut second = trigger.signal();

        trigger.trigger();

        first.triggered().await;
        second.triggered().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn fire_when_trigger_is_dropped() {
        let (trigger, mut signal) = shutdown_channel();
        assert!(!signal.is_triggered());

        drop(trigger);

        assert!(signal.is_triggered());
        signal.triggered().await;
    }

    #[tokio::test]
    async fn fire_repeatedly_after_trigger() {
        let (trigger, mut signal) = shutdown_channel();
        trigger.trigger();
        trigger.trigger();

        signal.triggered().await;
        signal.triggered().await;
    }
}
