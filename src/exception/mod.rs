use axum::{http::StatusCode, response::Response};
use std::error::Error;

mod call_site;
mod failure;
pub mod handler;
mod messages;
mod rejection;
mod status;

pub use call_site::{CallSite, Traced};
pub use failure::{
    ArgumentTypeMismatch, BodyCause, Failure, FieldError, Mismatch, PathSegment, Unhandled,
    UnreadableBody, ValidationFailure,
};
pub(crate) use failure::PendingFailure;
pub use handler::GlobalExceptionHandler;
pub use status::StatusRegistry;

/// An error the global handler can answer for
///
/// Implement it with `#[derive(Exception)]`; `#[response_status(...)]` sets
/// [`declared_status`](Exception::declared_status) and a `#[origin]` field
/// provides [`call_site`](Exception::call_site).
pub trait Exception: Error + Send + Sync + 'static {
    /// Status this error type answers with, if it declares one
    fn declared_status(&self) -> Option<StatusCode> {
        None
    }

    /// Where the error was raised
    fn call_site(&self) -> Option<&CallSite> {
        None
    }

    /// Error wrapped by this one, also consulted by [`StatusRegistry`]
    fn wrapped(&self) -> Option<&(dyn Error + 'static)> {
        None
    }

    /// Exception wrapped by this one, for wrappers that annotate another exception
    fn wrapped_exception(&self) -> Option<&dyn Exception> {
        None
    }
}

/// The ExceptionFilter trait
///
/// Filters turn failures reported during request processing into responses.
/// They must always return a valid Response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch a failure and return a response
    fn catch(&self, failure: &Failure) -> Response;
}
