use crate::di::Container;
use std::sync::Arc;

/// Builder for constructing a service container
///
/// # Example
/// ```
/// use exceptionhandler::prelude::*;
///
/// struct Teapot;
///
/// impl ExceptionFilter for Teapot {
///     fn catch(&self, _failure: &Failure) -> exceptionhandler::axum::response::Response {
///         use exceptionhandler::axum::{http::StatusCode, response::IntoResponse};
///         StatusCode::IM_A_TEAPOT.into_response()
///     }
/// }
///
/// let container = ContainerBuilder::new()
///     .register(Teapot)
///     .bind::<dyn ExceptionFilter, Teapot, _>(|teapot| teapot as Arc<dyn ExceptionFilter>)
///     .build();
/// assert!(container.contains::<dyn ExceptionFilter>());
/// ```
pub struct ContainerBuilder {
    container: Container,
}

impl ContainerBuilder {
    /// Create a new container builder
    pub fn new() -> Self {
        Self {
            container: Container::new(),
        }
    }

    /// Register a service instance
    pub fn register<T: 'static + Send + Sync>(mut self, instance: T) -> Self {
        self.container.register(instance);
        self
    }

    /// Bind a trait to a concrete implementation
    ///
    /// `Arc<dyn Trait>` then resolves to the registered `Impl`, which may be
    /// registered before or after the binding.
    pub fn bind<Trait, Impl, F>(mut self, caster: F) -> Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        self.container.register_trait::<Trait, Impl, F>(caster);
        self
    }

    /// Build the container
    pub fn build(self) -> Container {
        self.container
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
