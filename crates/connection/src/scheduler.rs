//! On-air poll cadence.
//!
//! One probe immediately, then one per [`POLL_INTERVAL`]. Each cadence runs
//! in its own task under a fresh generation; stopping cancels the task and
//! bumps the generation so a probe still in flight is discarded on arrival.

use std::sync::{Arc, Mutex};

use proclaim_protocol::constants::POLL_INTERVAL;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::auth::AuthClient;
use crate::probe::StatusClient;
use crate::state::StateStore;

/// Everything a poll task needs, cloned into it on start.
#[derive(Clone)]
pub(crate) struct PollContext {
    pub(crate) store: Arc<StateStore>,
    pub(crate) status: StatusClient,
    pub(crate) auth: AuthClient,
}

/// Drives the status probe on a fixed cadence.
pub struct PollScheduler {
    ctx: PollContext,
    cancel: Mutex<Option<CancellationToken>>,
}

impl PollScheduler {
    pub(crate) fn new(ctx: PollContext) -> Self {
        Self {
            ctx,
            cancel: Mutex::new(None),
        }
    }

    /// Starts polling `host`, replacing any running cadence.
    pub fn start(&self, host: String) {
        let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = guard.take() {
            token.cancel();
        }

        let generation = self.ctx.store.next_generation();
        let cancel = CancellationToken::new();
        *guard = Some(cancel.clone());
        drop(guard);

        debug!(%host, generation, "starting on-air poll");
        tokio::spawn(poll_loop(host, generation, self.ctx.clone(), cancel));
    }

    /// Stops polling. Safe to call when nothing is running.
    pub fn stop(&self) {
        let mut guard = self.cancel.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = guard.take() {
            token.cancel();
            debug!("on-air poll stopped");
        }
        // Invalidate whatever probe is still in flight.
        self.ctx.store.next_generation();
    }

    pub fn is_running(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.cancel.lock()
            && let Some(token) = guard.take()
        {
            token.cancel();
        }
    }
}

async fn poll_loop(host: String, generation: u64, ctx: PollContext, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        poll_once(&host, generation, &ctx).await;
    }

    trace!(%host, generation, "poll loop exited");
}

/// Runs one probe and applies it if the cadence is still current.
pub(crate) async fn poll_once(host: &str, generation: u64, ctx: &PollContext) {
    if host.is_empty() {
        ctx.store.recompute();
        return;
    }

    let result = ctx.status.probe(host).await;
    let Some(applied) = ctx.store.apply_probe(generation, result) else {
        return;
    };

    if applied.regained && applied.auth_required {
        debug!(%host, "Proclaim reachable again, re-authenticating");
        let auth = ctx.auth.clone();
        let store = ctx.store.clone();
        tokio::spawn(async move { auth.refresh(&store).await });
    }
}
