//! Delivery of harvested batches to consumers.

use std::marker::PhantomData;

use engine_logging::{engine_debug, engine_warn};
use oai_core::{Continuation, HarvestItem, HarvestResponse, ProtocolError};
use tokio::sync::mpsc;

use crate::types::{ConfigError, DispatchError, OutletClosed};

/// Receives every decoded response, before the continuation is followed.
#[async_trait::async_trait]
pub trait BatchSink: Send {
    /// Returns how many items of `response` reached the consumer.
    async fn dispatch(
        &mut self,
        response: &HarvestResponse,
        continuation: &Continuation,
    ) -> Result<usize, DispatchError>;
}

/// Default protocol-error handler: the error is logged and the harvest goes on.
pub fn log_protocol_error(error: &ProtocolError) {
    engine_warn!("repository reported {}: {}", error.code, error.message);
}

/// Calls `on_item` for every item, synchronously and in response order.
///
/// A protocol error is always reported to `on_error`, which logs by default.
/// Items of an error batch are still delivered unless the caller installed
/// its own handler with [`DirectSink::with_error_sink`]; then they are
/// skipped.
pub struct DirectSink<T, F, G = fn(&ProtocolError)> {
    on_item: F,
    on_error: G,
    skip_error_batches: bool,
    _item: PhantomData<fn(&T)>,
}

impl<T, F> DirectSink<T, F>
where
    T: HarvestItem,
    F: FnMut(&T) + Send,
{
    pub fn new(on_item: F) -> Self {
        Self {
            on_item,
            on_error: log_protocol_error,
            skip_error_batches: false,
            _item: PhantomData,
        }
    }
}

impl<T, F, G> DirectSink<T, F, G>
where
    T: HarvestItem,
    F: FnMut(&T) + Send,
    G: FnMut(&ProtocolError) + Send,
{
    pub fn with_error_sink<H>(self, on_error: H) -> DirectSink<T, F, H>
    where
        H: FnMut(&ProtocolError) + Send,
    {
        DirectSink {
            on_item: self.on_item,
            on_error,
            skip_error_batches: true,
            _item: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T, F, G> BatchSink for DirectSink<T, F, G>
where
    T: HarvestItem,
    F: FnMut(&T) + Send,
    G: FnMut(&ProtocolError) + Send,
{
    async fn dispatch(
        &mut self,
        response: &HarvestResponse,
        _continuation: &Continuation,
    ) -> Result<usize, DispatchError> {
        if let Some(error) = &response.error {
            (self.on_error)(error);
            if self.skip_error_batches {
                return Ok(0);
            }
        }
        let items = T::from_response(response);
        for item in items {
            (self.on_item)(item);
        }
        Ok(items.len())
    }
}

/// One consumer in a fan-out.
#[async_trait::async_trait]
pub trait Outlet<T>: Send {
    async fn send(&mut self, item: T) -> Result<(), OutletClosed>;

    /// Signal that no more items will follow.
    async fn close(&mut self) -> Result<(), OutletClosed>;
}

/// `None` is the completion sentinel. A bounded channel makes a slow reader
/// hold back the whole harvest.
#[async_trait::async_trait]
impl<T: Send + 'static> Outlet<T> for mpsc::Sender<Option<T>> {
    async fn send(&mut self, item: T) -> Result<(), OutletClosed> {
        mpsc::Sender::send(self, Some(item))
            .await
            .map_err(|_| OutletClosed)
    }

    async fn close(&mut self) -> Result<(), OutletClosed> {
        mpsc::Sender::send(self, None).await.map_err(|_| OutletClosed)
    }
}

/// Round-robin distribution over a fixed set of outlets.
///
/// The position is kept across batches, so item `k` of the whole session
/// goes to outlet `k % n`. When a batch has no continuation every outlet is
/// closed once.
pub struct FanOut<T, O> {
    outlets: Vec<O>,
    next: usize,
    closed: bool,
    _item: PhantomData<fn(T)>,
}

impl<T, O> FanOut<T, O>
where
    T: HarvestItem,
    O: Outlet<T>,
{
    pub fn new(outlets: Vec<O>) -> Result<Self, ConfigError> {
        if outlets.is_empty() {
            return Err(ConfigError::NoOutlets);
        }
        Ok(Self {
            outlets,
            next: 0,
            closed: false,
            _item: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.outlets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outlets.is_empty()
    }

    pub fn into_outlets(self) -> Vec<O> {
        self.outlets
    }

    async fn close_all(&mut self) -> Result<(), DispatchError> {
        for (index, outlet) in self.outlets.iter_mut().enumerate() {
            outlet
                .close()
                .await
                .map_err(|_| DispatchError::OutletClosed { index })?;
        }
        self.closed = true;
        engine_debug!("fan-out closed {} outlets", self.outlets.len());
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T, O> BatchSink for FanOut<T, O>
where
    T: HarvestItem,
    O: Outlet<T>,
{
    async fn dispatch(
        &mut self,
        response: &HarvestResponse,
        continuation: &Continuation,
    ) -> Result<usize, DispatchError> {
        if self.closed {
            return Err(DispatchError::Rejected("fan-out already closed".into()));
        }
        if let Some(error) = &response.error {
            log_protocol_error(error);
        }

        let items = T::from_response(response);
        for item in items {
            let index = self.next;
            self.outlets[index]
                .send(item.clone())
                .await
                .map_err(|_| DispatchError::OutletClosed { index })?;
            self.next = (index + 1) % self.outlets.len();
        }

        if !continuation.present {
            self.close_all().await?;
        }
        Ok(items.len())
    }
}
