// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

//! Periodic maintenance ticks for one stack.
//! Runs as a single background loop per stack, woken by the shortest of its
//! constituent intervals.

use crate::{config::REPUBLISH_INTERVAL, stack::Stack, token::TokenManager};
use boson_core::Id;
use boson_storage::Storage;
use boson_tasks::CancelToken;
use std::{sync::Arc, time::SystemTime};
use tokio::{sync::Mutex, time::interval};
use tracing::{debug, warn};

/// How often the scheduler wakes to check each maintenance concern against
/// its own interval; each tick is cheap enough that sub-minute granularity
/// doesn't matter.
const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Republished records are re-run through the full store-value fan-out, so
/// every tick considers at most this many candidates to bound the work any
/// single tick can generate.
const REPUBLISH_BATCH: usize = 64;

pub async fn run(stack: Arc<Stack>, storage: Arc<dyn Storage>, tokens: Arc<Mutex<TokenManager>>, local_id: Id, cancel: CancelToken) {
    let mut ticker = interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.canceled() => {
                debug!("maintenance loop stopping");
                return;
            }
            _ = ticker.tick() => {
                refresh_buckets(&stack, local_id, &cancel).await;
                republish_owned_records(&stack, &storage, local_id, &cancel).await;
                purge_expired(&storage).await;
                tokens.lock().await.rotate();
                stack.rpc.decay_blacklist().await;
                sweep_timeouts(&stack).await;
                if let Err(err) = boson_tasks::refresh_questionable_contacts(stack.routing.clone(), stack.rpc.clone(), local_id).await {
                    warn!(%err, "questionable-contact refresh failed");
                }
            }
        }
    }
}

async fn refresh_buckets(stack: &Arc<Stack>, local_id: Id, cancel: &CancelToken) {
    let targets = {
        let table = stack.routing.lock().await;
        table.buckets_needing_refresh(SystemTime::now())
    };
    for target in targets {
        if cancel.is_canceled() {
            return;
        }
        if let Err(err) = boson_tasks::find_node(stack.routing.clone(), stack.rpc.clone(), local_id, target, cancel.clone()).await {
            debug!(%target, %err, "bucket refresh lookup failed");
        }
    }
}

async fn republish_owned_records(stack: &Arc<Stack>, storage: &Arc<dyn Storage>, local_id: Id, cancel: &CancelToken) {
    let cutoff = SystemTime::now()
        .checked_sub(REPUBLISH_INTERVAL)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let due = match storage.get_values(None, Some(cutoff), 0, REPUBLISH_BATCH).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%err, "failed to list values due for republish");
            return;
        }
    };
    for entry in due {
        if cancel.is_canceled() {
            return;
        }
        let id = entry.value.id();
        match boson_tasks::store_value(stack.routing.clone(), stack.rpc.clone(), local_id, entry.value, cancel.clone()).await {
            Ok(accepted) => {
                debug!(%id, accepted, "republished owned value");
                if let Err(err) = storage.update_value_announced_time(&id).await {
                    warn!(%id, %err, "failed to bump announced-at after republish");
                }
            }
            Err(err) => warn!(%id, %err, "republish failed"),
        }
    }
}

async fn purge_expired(storage: &Arc<dyn Storage>) {
    let now = SystemTime::now();
    match storage.purge_values(now).await {
        Ok(count) if count > 0 => debug!(count, "purged expired value records"),
        Ok(_) => {}
        Err(err) => warn!(%err, "value purge failed"),
    }
    match storage.purge_peers(now).await {
        Ok(count) if count > 0 => debug!(count, "purged expired peer records"),
        Ok(_) => {}
        Err(err) => warn!(%err, "peer purge failed"),
    }
}

async fn sweep_timeouts(stack: &Arc<Stack>) {
    let expired = stack.rpc.sweep_timeouts().await;
    if expired.is_empty() {
        return;
    }
    let mut table = stack.routing.lock().await;
    for addr in expired {
        table.mark_failed_by_addr(&addr);
    }
}
