use crate::codec::RichValue;
use crate::error::{IpcError, ProcedureFailure};
use crate::procedure::ProcedureRegistry;
use crate::subscription::EventSink;
use crate::subscription::driver::{SubscriptionRun, drive};

use common::ErrorLocation;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Commands that mutate the live-key table.
///
/// Only the actor applies them, one at a time.
pub(crate) enum SubscriptionCommand {
    Register {
        key: String,
        path: String,
        token: CancellationToken,
        reply: oneshot::Sender<Result<u64, ProcedureFailure>>,
    },

    /// Sent by a driver on every exit path. Ignored if the key was cancelled
    /// or already belongs to a newer subscription.
    Release {
        key: String,
        generation: u64,
        reply: oneshot::Sender<()>,
    },

    Cancel {
        key: String,
        reply: oneshot::Sender<bool>,
    },

    CancelAll {
        reply: oneshot::Sender<usize>,
    },
}

/// Table entry for a subscription that has not terminated yet.
#[derive(Debug, Clone)]
pub struct LiveSubscription {
    pub path: String,
    pub generation: u64,
    token: CancellationToken,
}

/// Owns the subscriptions of one view.
///
/// `Clone` shares the same table and actor.
#[derive(Clone)]
pub struct SubscriptionManager {
    registry: Arc<ProcedureRegistry>,
    sink: Arc<dyn EventSink>,

    /// Channel to the table actor
    command_tx: Arc<Mutex<Option<mpsc::Sender<SubscriptionCommand>>>>,

    /// Read side of the table; written only by the actor
    live: Arc<RwLock<HashMap<String, LiveSubscription>>>,

    actor_init: Arc<Mutex<bool>>,
}

impl SubscriptionManager {
    pub fn new(registry: Arc<ProcedureRegistry>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            sink,
            command_tx: Arc::new(Mutex::new(None)),
            live: Arc::new(RwLock::new(HashMap::new())),
            actor_init: Arc::new(Mutex::new(false)),
        }
    }

    /// Start a subscription under `key`.
    ///
    /// The key is registered with its cancellation token before the handler
    /// runs, so an `unsubscribe` racing the start is always honoured. Path,
    /// kind, validation and producer failures are reported as a terminal
    /// `error` event on `key`, never through the return value.
    ///
    /// Returns the generation every event of this run is tagged with.
    ///
    /// # Errors
    ///
    /// - `DuplicateSubscriptionKey` if `key` is still live; the live
    ///   subscription is left untouched and no event is emitted
    pub async fn subscribe(
        &self,
        key: impl Into<String>,
        path: impl Into<String>,
        input: RichValue,
    ) -> Result<u64, ProcedureFailure> {
        let key = key.into();
        let path = path.into();
        let token = CancellationToken::new();

        let registered = self
            .request(|reply| SubscriptionCommand::Register {
                key: key.clone(),
                path: path.clone(),
                token: token.clone(),
                reply,
            })
            .await
            .map_err(|e| {
                error!("Subscription actor unavailable: {e}");
                ProcedureFailure::handler("subscription manager unavailable")
            })?;
        let generation = registered?;

        debug!("Subscription '{key}' ({path}) pending");

        let commands = self.sender().await.map_err(|e| {
            error!("Subscription actor unavailable: {e}");
            ProcedureFailure::handler("subscription manager unavailable")
        })?;

        tokio::spawn(drive(SubscriptionRun {
            key,
            path,
            input,
            generation,
            token,
            registry: Arc::clone(&self.registry),
            sink: Arc::clone(&self.sink),
            commands,
        }));

        Ok(generation)
    }

    /// Stop the subscription under `key`.
    ///
    /// Unknown, finished and already cancelled keys are a no-op. Returns
    /// whether a live subscription was cancelled.
    pub async fn unsubscribe(&self, key: &str) -> bool {
        let key = key.to_string();
        match self
            .request(|reply| SubscriptionCommand::Cancel { key, reply })
            .await
        {
            Ok(cancelled) => cancelled,
            Err(e) => {
                error!("Subscription actor unavailable: {e}");
                false
            }
        }
    }

    /// Cancel everything this view still has running. Used when the view goes
    /// away.
    pub async fn cancel_all(&self) -> usize {
        match self
            .request(|reply| SubscriptionCommand::CancelAll { reply })
            .await
        {
            Ok(count) => count,
            Err(e) => {
                error!("Subscription actor unavailable: {e}");
                0
            }
        }
    }

    pub async fn is_live(&self, key: &str) -> bool {
        self.live.read().await.contains_key(key)
    }

    pub async fn live_count(&self) -> usize {
        self.live.read().await.len()
    }

    /// Live keys, sorted.
    pub async fn live_keys(&self) -> Vec<String> {
        let mut keys = self
            .live
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SubscriptionCommand,
    ) -> Result<T, IpcError> {
        let tx = self.sender().await?;
        let (reply, response) = oneshot::channel();

        tx.send(command(reply))
            .await
            .map_err(|e| IpcError::send(format!("Subscription actor died: {e}")))?;

        response
            .await
            .map_err(|e| IpcError::read(format!("Subscription actor dropped reply: {e}")))
    }

    async fn sender(&self) -> Result<mpsc::Sender<SubscriptionCommand>, IpcError> {
        self.ensure_actor().await;

        let tx_guard = self.command_tx.lock().await;
        tx_guard.as_ref().cloned().ok_or_else(|| IpcError::Io {
            message: "Subscription actor not initialized".to_string(),
            location: ErrorLocation::caller(),
        })
    }

    async fn ensure_actor(&self) {
        let mut init_guard = self.actor_init.lock().await;
        if !*init_guard {
            let (tx, rx) = mpsc::channel(100);

            let mut tx_guard = self.command_tx.lock().await;
            *tx_guard = Some(tx);
            drop(tx_guard);

            tokio::spawn(subscription_actor(rx, Arc::clone(&self.live)));
            *init_guard = true;
            debug!("Subscription actor spawned");
        }
    }
}

async fn subscription_actor(
    mut command_rx: mpsc::Receiver<SubscriptionCommand>,
    live: Arc<RwLock<HashMap<String, LiveSubscription>>>,
) {
    let mut next_generation = 0_u64;

    while let Some(command) = command_rx.recv().await {
        match command {
            SubscriptionCommand::Register {
                key,
                path,
                token,
                reply,
            } => {
                let mut table = live.write().await;
                let outcome = if table.contains_key(&key) {
                    Err(ProcedureFailure::duplicate_key(&key))
                } else {
                    next_generation += 1;
                    table.insert(
                        key,
                        LiveSubscription {
                            path,
                            generation: next_generation,
                            token,
                        },
                    );
                    Ok(next_generation)
                };
                drop(table);
                let _ = reply.send(outcome);
            }

            SubscriptionCommand::Release {
                key,
                generation,
                reply,
            } => {
                let mut table = live.write().await;
                if table
                    .get(&key)
                    .is_some_and(|entry| entry.generation == generation)
                {
                    table.remove(&key);
                }
                drop(table);
                let _ = reply.send(());
            }

            SubscriptionCommand::Cancel { key, reply } => {
                let removed = live.write().await.remove(&key);
                let cancelled = match removed {
                    Some(entry) => {
                        entry.token.cancel();
                        info!("Subscription '{key}' ({}) cancel requested", entry.path);
                        true
                    }
                    None => {
                        debug!("Unsubscribe for '{key}' ignored: not live");
                        false
                    }
                };
                let _ = reply.send(cancelled);
            }

            SubscriptionCommand::CancelAll { reply } => {
                let drained = live.write().await.drain().collect::<Vec<_>>();
                for (_, entry) in &drained {
                    entry.token.cancel();
                }
                if !drained.is_empty() {
                    info!("Cancelled {} live subscription(s)", drained.len());
                }
                let _ = reply.send(drained.len());
            }
        }
    }

    debug!("Subscription actor stopped");
}
