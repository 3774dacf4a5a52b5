// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use crate::{
    candidate::CandidateSet,
    cancel::CancelToken,
    error::{Error, Result},
};
use boson_core::{Id, NodeContact};
use boson_routing::RoutingTable;
use futures::stream::{FuturesUnordered, StreamExt};
use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::trace;

/// Parallelism of an iterative lookup.
pub const ALPHA: usize = 3;

/// Return-count of an iterative lookup ; matches the routing table's bucket size.
pub const K: usize = boson_routing::K;

/// Default per-task deadline.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

/// What one candidate's response contributed: any closer nodes it returned
/// (merged into the shared closest-set), a method-specific payload fragment
/// (collected by the caller, e.g. a found value or peer record), and
/// whether the whole lookup should stop now.
pub struct StepOutcome<T> {
    pub discovered: Vec<NodeContact>,
    pub payload: Option<T>,
    pub done: bool,
    /// A write token the responding node handed out with this response, if
    /// it asked for one.
    pub token: Option<u32>,
}

impl<T> StepOutcome<T> {
    pub fn continuing(discovered: Vec<NodeContact>) -> Self {
        Self {
            discovered,
            payload: None,
            done: false,
            token: None,
        }
    }

    pub fn continuing_with_token(discovered: Vec<NodeContact>, token: Option<u32>) -> Self {
        Self {
            discovered,
            payload: None,
            done: false,
            token,
        }
    }

    pub fn finished(discovered: Vec<NodeContact>, payload: T) -> Self {
        Self {
            discovered,
            payload: Some(payload),
            done: true,
            token: None,
        }
    }

    pub fn with_payload(discovered: Vec<NodeContact>, payload: T) -> Self {
        Self {
            discovered,
            payload: Some(payload),
            done: false,
            token: None,
        }
    }
}

type StepFuture<T> = Pin<Box<dyn Future<Output = (Id, Result<StepOutcome<T>>)> + Send>>;

/// Outcome of a whole iterative lookup: the k nearest replied contacts plus
/// every method-specific payload fragment collected along the way, in the
/// order responses arrived.
pub struct LookupOutcome<T> {
    pub closest: Vec<NodeContact>,
    pub payloads: Vec<T>,
    pub tokens: HashMap<Id, u32>,
}

/// Drives the iterative-lookup shared base : seeds the
/// closest-set from the routing table, dispatches up to `alpha` concurrent
/// per-candidate requests via `step`, merges their results, and terminates
/// when no fresh candidate remains closer than the k-th replied entry, the
/// deadline passes, the task is canceled, or `step` signals
/// [`StepOutcome::done`].
pub async fn run<F, Fut, T>(
    routing: &Mutex<RoutingTable>,
    target: Id,
    alpha: usize,
    k: usize,
    deadline: Duration,
    cancel: CancelToken,
    mut step: F,
) -> Result<LookupOutcome<T>>
where
    F: FnMut(NodeContact, CancelToken) -> Fut,
    Fut: Future<Output = Result<StepOutcome<T>>> + Send + 'static,
    T: Send + 'static,
{
    let mut candidates = CandidateSet::new(target, k);
    {
        let table = routing.lock().await;
        candidates.merge(table.closest(&target, k));
    }

    let start = Instant::now();
    let mut pending: FuturesUnordered<StepFuture<T>> = FuturesUnordered::new();
    let mut payloads = Vec::new();
    let mut tokens = HashMap::new();
    let mut done_early = false;

    loop {
        if cancel.is_canceled() {
            return Err(Error::Cancelled);
        }
        if start.elapsed() >= deadline {
            break;
        }

        while pending.len() < alpha {
            let Some(next_id) = candidates.next_fresh() else { break };
            let Some(contact) = candidates.contact(&next_id).cloned() else { break };
            candidates.mark_in_flight(&next_id);
            let fut = step(contact, cancel.clone());
            pending.push(Box::pin(async move { (next_id, fut.await) }));
        }

        if pending.is_empty() {
            break;
        }

        let remaining = deadline.saturating_sub(start.elapsed());
        tokio::select! {
            _ = cancel.canceled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(remaining) => break,
            next = pending.next() => {
                let Some((id, result)) = next else { break };
                match result {
                    Ok(outcome) => {
                        candidates.mark_replied(&id);
                        routing.lock().await.mark_responded(&id);
                        candidates.merge(outcome.discovered);
                        if let Some(payload) = outcome.payload {
                            payloads.push(payload);
                        }
                        if let Some(token) = outcome.token {
                            tokens.insert(id, token);
                        }
                        done_early = outcome.done;
                    }
                    Err(_) => {
                        candidates.mark_failed(&id);
                        routing.lock().await.mark_failed(&id);
                    }
                }
            }
        }

        if done_early || candidates.exhausted() {
            break;
        }
    }

    let closest = candidates.replied(k);
    trace!(target = %target, replied = closest.len(), payloads = payloads.len(), "lookup finished");
    Ok(LookupOutcome { closest, payloads, tokens })
}
