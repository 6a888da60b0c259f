//! View-side entry point to the host.
//!
//! [`BridgeFacade`] is the only surface a view uses. It exposes single
//! invocation, batch invocation, subscriptions, and the locale/theme
//! conveniences built on the same request/response path. The raw frame
//! channel stays private.

mod connection;
mod listener;
mod subscription;

pub use listener::ListenerHandle;
pub use subscription::{Subscription, SubscriptionCanceller};

use crate::BRIDGE_WS_BASE_URL;
use crate::codec::RichValue;
use crate::dispatch::{BatchItem, BatchOutcome};
use crate::error::{FacadeError, ProcedureFailure};
use crate::ipc::BoundaryLink;
use crate::procedure::ProcedureKind;
use crate::proto::{
    BatchInvokeItem, BatchInvokeRequest, InvokeRequest, SubscribeRequest, WireProcedureKind,
    bridge_client_message,
};

use connection::{FacadeInner, Reply, encode_value, pump_socket};

use models::{BroadcastChannel, LocaleCode, ThemeMode, ThemePreference};

use common::ErrorLocation;

use std::str::FromStr;
use std::sync::Arc;

use log::{info, warn};
use tokio_tungstenite::connect_async;
use uuid::Uuid;

/// Typed client of a bridge host.
///
/// Dropping the facade closes the boundary; the host then cancels every
/// subscription it started.
pub struct BridgeFacade {
    inner: Arc<FacadeInner>,
}

impl BridgeFacade {
    /// Connect to a host serving on `ws://127.0.0.1:<port>`.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::Connect`] if the WebSocket cannot be opened.
    pub async fn connect(port: u16) -> Result<Self, FacadeError> {
        let url = format!("{BRIDGE_WS_BASE_URL}:{port}");
        let (socket, _) = connect_async(url.as_str())
            .await
            .map_err(|e| FacadeError::Connect {
                message: format!("Failed to connect to {url}: {e}"),
                location: ErrorLocation::caller(),
            })?;

        info!("Bridge facade connected to {url}");

        let (facade_end, socket_end) = BoundaryLink::pair();
        tokio::spawn(pump_socket(socket, socket_end));
        Ok(Self::over(facade_end))
    }

    /// Use an already established boundary, e.g. from
    /// [`BridgeHost::attach_local`](crate::host::BridgeHost::attach_local).
    pub fn over(link: BoundaryLink) -> Self {
        Self {
            inner: FacadeInner::start(link),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub async fn query(
        &self,
        path: &str,
        input: impl Into<RichValue>,
    ) -> Result<RichValue, FacadeError> {
        self.invoke(path, ProcedureKind::Query, input).await
    }

    pub async fn mutate(
        &self,
        path: &str,
        input: impl Into<RichValue>,
    ) -> Result<RichValue, FacadeError> {
        self.invoke(path, ProcedureKind::Mutation, input).await
    }

    /// Call a query or mutation once.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::Procedure`] with the host's failure descriptor
    /// - [`FacadeError::Closed`] if the boundary went away
    /// - [`FacadeError::Codec`] if the input or result cannot be (de)serialised
    pub async fn invoke(
        &self,
        path: &str,
        kind: ProcedureKind,
        input: impl Into<RichValue>,
    ) -> Result<RichValue, FacadeError> {
        let request = InvokeRequest {
            path: path.to_string(),
            kind: WireProcedureKind::from(kind) as i32,
            input: encode_value(&input.into())?,
        };

        match self
            .inner
            .request(bridge_client_message::Payload::Invoke(request))
            .await?
        {
            Reply::Value(value) => Ok(value),
            _ => Err(FacadeError::protocol("Unexpected reply to invoke")),
        }
    }

    /// Run several operations in one round trip.
    ///
    /// Individual failures live in the returned map; only transport problems
    /// fail the whole call.
    pub async fn invoke_batch(&self, items: Vec<BatchItem>) -> Result<BatchOutcome, FacadeError> {
        let items = items
            .into_iter()
            .map(|item| {
                Ok::<_, FacadeError>(BatchInvokeItem {
                    input: encode_value(&item.input)?,
                    id: item.id,
                    path: item.path,
                    kind: WireProcedureKind::from(item.kind) as i32,
                })
            })
            .collect::<Result<Vec<_>, FacadeError>>()?;

        match self
            .inner
            .request(bridge_client_message::Payload::BatchInvoke(
                BatchInvokeRequest { items },
            ))
            .await?
        {
            Reply::Batch(outcome) => Ok(outcome),
            _ => Err(FacadeError::protocol("Unexpected reply to batch invoke")),
        }
    }

    /// Start a subscription under a fresh `sub-<uuid>` key.
    ///
    /// Failures of the procedure itself (unknown path, bad input, producer
    /// errors) arrive as the terminal event of the returned subscription.
    ///
    /// # Errors
    ///
    /// Only transport and protocol problems.
    pub async fn subscribe(
        &self,
        path: &str,
        input: impl Into<RichValue>,
    ) -> Result<Subscription, FacadeError> {
        let key = format!("sub-{}", Uuid::new_v4());
        let request = SubscribeRequest {
            key: key.clone(),
            path: path.to_string(),
            input: encode_value(&input.into())?,
        };

        // Register first: events may overtake the acknowledgement.
        let events = self.inner.register_subscription(&key);

        match self
            .inner
            .request(bridge_client_message::Payload::Subscribe(request))
            .await
        {
            Ok(Reply::Ack) => Ok(Subscription::new(key, events, Arc::downgrade(&self.inner))),
            Ok(_) => {
                self.inner.forget_subscription(&key);
                Err(FacadeError::protocol("Unexpected reply to subscribe"))
            }
            Err(e) => {
                self.inner.forget_subscription(&key);
                Err(e)
            }
        }
    }

    pub async fn get_locale(&self) -> Result<LocaleCode, FacadeError> {
        let value = self.query("preferences.getLocale", RichValue::Undefined).await?;
        parse_reply(&value)
    }

    /// Returns the code the host actually stored.
    pub async fn set_locale(&self, tag: &str) -> Result<LocaleCode, FacadeError> {
        let value = self.mutate("preferences.setLocale", tag).await?;
        parse_reply(&value)
    }

    pub fn on_locale_changed<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(LocaleCode) + Send + Sync + 'static,
    {
        self.listen(BroadcastChannel::LocaleChanged, handler)
    }

    pub async fn get_theme(&self) -> Result<ThemePreference, FacadeError> {
        let value = self.query("preferences.getTheme", RichValue::Undefined).await?;
        parse_reply(&value)
    }

    /// Returns the mode that is now rendered.
    pub async fn set_theme(&self, preference: ThemePreference) -> Result<ThemeMode, FacadeError> {
        let value = self
            .mutate("preferences.setTheme", preference.as_str())
            .await?;
        parse_reply(&value)
    }

    pub async fn get_effective_theme(&self) -> Result<ThemeMode, FacadeError> {
        let value = self
            .query("preferences.getEffectiveTheme", RichValue::Undefined)
            .await?;
        parse_reply(&value)
    }

    pub fn on_theme_changed<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(ThemeMode) + Send + Sync + 'static,
    {
        self.listen(BroadcastChannel::ThemeChanged, handler)
    }

    fn listen<T, F>(&self, channel: BroadcastChannel, handler: F) -> ListenerHandle
    where
        T: FromStr + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let listener = Arc::new(move |payload: &RichValue| {
            match payload.as_str().map(str::parse::<T>) {
                Some(Ok(value)) => handler(value),
                _ => warn!("Ignoring malformed '{channel}' payload"),
            }
        });
        let id = self.inner.add_listener(channel, listener);
        ListenerHandle::new(channel, id, Arc::downgrade(&self.inner))
    }
}

fn parse_reply<T: FromStr>(value: &RichValue) -> Result<T, FacadeError> {
    value
        .as_str()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            FacadeError::Procedure(ProcedureFailure::invalid_message(&format!(
                "Unexpected {} in reply",
                value.type_name()
            )))
        })
}
