//! Event traits and handler wrappers.
//!
//! Every payload that travels over the bus implements [`Event`]. Payloads are
//! serialized once per emission and each handler deserializes its own copy,
//! so a handler can never observe another handler's mutations.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::any::{Any, TypeId};
use std::future::Future;
use std::marker::PhantomData;

/// Core trait that all events must implement.
///
/// Most types get this through the blanket implementation below: derive
/// `Serialize`, `Deserialize` and `Debug` and the type is ready to publish.
pub trait Event: Send + Sync + Any + std::fmt::Debug {
    /// Returns the type name of this event for debugging and routing.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Serializes the event to bytes for dispatch.
    fn serialize(&self) -> Result<Vec<u8>, EventError>;

    /// Deserializes an event from bytes.
    fn deserialize(data: &[u8]) -> Result<Self, EventError>
    where
        Self: Sized;

    /// Returns a reference to this event as `&dyn Any` for dynamic typing.
    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + std::fmt::Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, EventError> {
        serde_json::to_vec(self).map_err(EventError::Serialization)
    }

    fn deserialize(data: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(data).map_err(EventError::Deserialization)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Handler trait for processing events asynchronously.
///
/// Users rarely implement this directly; the bus wraps closures in
/// [`TypedEventHandler`] or [`AsyncTypedEventHandler`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles an event from serialized data.
    async fn handle(&self, data: &[u8]) -> Result<(), EventError>;

    /// Returns the TypeId of the event type this handler expects.
    fn expected_type_id(&self) -> TypeId;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Type-safe wrapper for synchronous event handlers.
pub struct TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: PhantomData<T>,
}

impl<T, F> TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> EventHandler for TypedEventHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Type-safe wrapper for handlers that need to await, e.g. plugins that
/// issue moderation commands over the control channel.
pub struct AsyncTypedEventHandler<T, F, Fut>
where
    T: Event,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    handler: F,
    name: String,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<T, F, Fut> AsyncTypedEventHandler<T, F, Fut>
where
    T: Event,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F, Fut> EventHandler for AsyncTypedEventHandler<T, F, Fut>
where
    T: Event,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    async fn handle(&self, data: &[u8]) -> Result<(), EventError> {
        let event = T::deserialize(data)?;
        (self.handler)(event).await
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Errors that can occur during event system operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Serialization failed when converting event to bytes
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Deserialization failed when converting bytes to event
    #[error("Deserialization error: {0}")]
    Deserialization(serde_json::Error),
    /// The subscription id is not (or no longer) registered
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}
