//! Pause/resume and cancellation for async directive loops.

use std::cell::Cell;
use std::rc::Rc;

use tokio::sync::Notify;

struct GateState {
    paused: Cell<bool>,
    cancelled: Cell<bool>,
    notify: Notify,
}

/// Shared between a directive and the loop it spawned.
///
/// The loop calls [`ready`](AsyncGate::ready) before every value it pushes:
/// it waits while the gate is paused and learns when it has been cancelled.
#[derive(Clone)]
pub struct AsyncGate {
    state: Rc<GateState>,
}

impl AsyncGate {
    pub fn new() -> Self {
        Self {
            state: Rc::new(GateState {
                paused: Cell::new(false),
                cancelled: Cell::new(false),
                notify: Notify::new(),
            }),
        }
    }

    pub fn pause(&self) {
        self.state.paused.set(true);
    }

    pub fn resume(&self) {
        self.state.paused.set(false);
        self.state.notify.notify_waiters();
    }

    /// Stop the loop for good.
    pub fn cancel(&self) {
        self.state.cancelled.set(true);
        self.state.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Wait until the gate is open. Returns `false` once cancelled.
    pub async fn ready(&self) -> bool {
        loop {
            // Register before checking so a resume in between is not lost.
            let notified = self.state.notify.notified();
            if self.state.cancelled.get() {
                return false;
            }
            if !self.state.paused.get() {
                return true;
            }
            notified.await;
        }
    }
}

impl Default for AsyncGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_gate_is_ready_immediately() {
        let gate = AsyncGate::new();
        assert!(gate.ready().await);
    }

    #[tokio::test]
    async fn paused_gate_waits_for_resume() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let gate = AsyncGate::new();
                gate.pause();
                let waiter = tokio::task::spawn_local({
                    let gate = gate.clone();
                    async move { gate.ready().await }
                });
                tokio::task::yield_now().await;
                assert!(!waiter.is_finished());
                gate.resume();
                assert!(waiter.await.unwrap());
            })
            .await;
    }

    #[tokio::test]
    async fn cancel_releases_waiters() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let gate = AsyncGate::new();
                gate.pause();
                let waiter = tokio::task::spawn_local({
                    let gate = gate.clone();
                    async move { gate.ready().await }
                });
                tokio::task::yield_now().await;
                gate.cancel();
                assert!(!waiter.await.unwrap());
                assert!(gate.is_cancelled());
            })
            .await;
    }
}
