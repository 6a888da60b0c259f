//! The task that pulls values out of one producer.

use crate::codec::RichValue;
use crate::error::{FailureCode, ProcedureFailure};
use crate::procedure::{Handler, ProcedureKind, ProcedureRegistry};
use crate::subscription::manager::SubscriptionCommand;
use crate::subscription::{EventSink, SubscriptionEvent};

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub(crate) struct SubscriptionRun {
    pub key: String,
    pub path: String,
    pub input: RichValue,
    pub generation: u64,
    pub token: CancellationToken,
    pub registry: Arc<ProcedureRegistry>,
    pub sink: Arc<dyn EventSink>,
    pub commands: mpsc::Sender<SubscriptionCommand>,
}

pub(crate) async fn drive(run: SubscriptionRun) {
    let SubscriptionRun {
        key,
        path,
        input,
        generation,
        token,
        registry,
        sink,
        commands,
    } = run;

    let terminal = produce(
        &key,
        generation,
        &path,
        input,
        &token,
        &registry,
        sink.as_ref(),
    )
    .await;

    // The producer has been dropped by now. Free the key before the terminal
    // event goes out so the view may reuse it as soon as it sees the event.
    release(&commands, &key, generation).await;

    match terminal {
        Some(event) if !token.is_cancelled() => {
            info!("Subscription '{key}' ({path}) finished: {}", event.type_name());
            sink.emit(&key, generation, event);
        }
        _ => info!("Subscription '{key}' ({path}) cancelled"),
    }
}

/// Drive the producer until it ends. `None` means cancelled.
async fn produce(
    key: &str,
    generation: u64,
    path: &str,
    input: RichValue,
    token: &CancellationToken,
    registry: &ProcedureRegistry,
    sink: &dyn EventSink,
) -> Option<SubscriptionEvent> {
    let definition = match registry.resolve_as(path, ProcedureKind::Subscription) {
        Ok(definition) => definition,
        Err(failure) => {
            debug!("Subscription '{key}' rejected: {failure}");
            return Some(SubscriptionEvent::Error(failure));
        }
    };

    if let Err(diagnostics) = definition.validator().validate(&input) {
        return Some(SubscriptionEvent::Error(ProcedureFailure::invalid_input(
            path,
            diagnostics,
        )));
    }

    let Handler::Stream(factory) = definition.handler() else {
        return Some(SubscriptionEvent::Error(ProcedureFailure::new(
            FailureCode::ProcedureNotFound,
            format!("'{path}' has no producer"),
        )));
    };
    let factory = Arc::clone(factory);

    let started = tokio::select! {
        biased;
        _ = token.cancelled() => return None,
        started = AssertUnwindSafe(async move { (*factory)(input).await }).catch_unwind() => started,
    };

    let mut producer = match started {
        Ok(Ok(producer)) => producer,
        Ok(Err(e)) => {
            warn!("Subscription '{key}' ({path}) failed to start: {e}");
            return Some(SubscriptionEvent::Error(ProcedureFailure::handler(
                e.message(),
            )));
        }
        Err(_) => {
            warn!("Subscription '{key}' ({path}) panicked while starting");
            return Some(SubscriptionEvent::Error(ProcedureFailure::handler(
                "procedure panicked",
            )));
        }
    };

    debug!("Subscription '{key}' ({path}) streaming");

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            next = AssertUnwindSafe(producer.next()).catch_unwind() => next,
        };

        match next {
            Ok(Some(Ok(value))) => {
                if token.is_cancelled() {
                    return None;
                }
                if !sink.emit(key, generation, SubscriptionEvent::Data(value)) {
                    debug!("View gone while streaming '{key}'");
                    token.cancel();
                    return None;
                }
                // An always-ready producer would otherwise hold the thread
                // and the cancel command could never be applied.
                tokio::task::yield_now().await;
            }
            Ok(Some(Err(e))) => {
                warn!("Subscription '{key}' ({path}) producer failed: {e}");
                return Some(SubscriptionEvent::Error(ProcedureFailure::producer(
                    e.message(),
                )));
            }
            Ok(None) => return Some(SubscriptionEvent::Complete),
            Err(_) => {
                warn!("Subscription '{key}' ({path}) producer panicked");
                return Some(SubscriptionEvent::Error(ProcedureFailure::producer(
                    "producer panicked",
                )));
            }
        }
    }
}

async fn release(commands: &mpsc::Sender<SubscriptionCommand>, key: &str, generation: u64) {
    let (reply, done) = oneshot::channel();
    let command = SubscriptionCommand::Release {
        key: key.to_string(),
        generation,
        reply,
    };

    if commands.send(command).await.is_err() || done.await.is_err() {
        warn!("Subscription actor gone before '{key}' was released");
    }
}
