/// Type-state markers for the builder pattern
///
/// These types track which required fields have been set at compile time,
/// so an incompletely configured client cannot be built.

use std::marker::PhantomData;

/// Marker trait for backend URL state
pub trait BackendState {}

/// Backend URL has not been set
pub struct NoBackend;
impl BackendState for NoBackend {}

/// Backend URL has been set
pub struct HasBackend;
impl BackendState for HasBackend {}

/// Marker trait for consumer state
pub trait ConsumerState {}

/// Notification consumer has not been set
pub struct NoConsumer;
impl ConsumerState for NoConsumer {}

/// Notification consumer has been set
pub struct HasConsumer;
impl ConsumerState for HasConsumer {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<B, C> {
    _backend: PhantomData<B>,
    _consumer: PhantomData<C>,
}

impl<B, C> TypeState<B, C> {
    pub(crate) fn new() -> Self {
        Self {
            _backend: PhantomData,
            _consumer: PhantomData,
        }
    }
}

impl<B, C> Default for TypeState<B, C> {
    fn default() -> Self {
        Self::new()
    }
}
