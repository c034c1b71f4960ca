//! # exceptionhandler
//!
//! A drop-in global exception handler for axum services.
//!
//! Every failure a request handler reports ends up as the same JSON payload:
//!
//! ```text
//! {
//!   "status": 400,
//!   "error": "Malformed JSON request",
//!   "message": "Invalid format of field 'age'",
//!   "classPath": "exceptionhandler::extract::JsonBody.from_bytes:58",
//!   "originalMessage": "invalid value: integer `300`, expected u8",
//!   "timestamp": "2026-10-18T12:00:00.123456"
//! }
//! ```
//!
//! ## Features
//!
//! - **Generic fallback**: any error becomes a 500, or the status its type
//!   declares with `#[derive(Exception)]` and `#[response_status(...)]`
//! - **Validation failures**: `validator` errors name the offending fields
//! - **Malformed bodies**: JSON parse errors name the offending field path
//! - **Parameter mismatches**: path parameters that fail to parse name the
//!   parameter, the expected type and the supplied value
//! - **Conditional registration**: the built-in handler is only installed when
//!   the application did not register its own [`ExceptionFilter`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::post};
//! use exceptionhandler::prelude::*;
//!
//! #[derive(serde::Deserialize, validator::Validate)]
//! struct NewUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//! }
//!
//! async fn create_user(ValidJson(user): ValidJson<NewUser>) -> std::result::Result<String, Failure> {
//!     Ok(user.name)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut container = Container::new();
//!     ExceptionHandlerModule::register(&mut container).unwrap();
//!
//!     let app: Router = Router::new()
//!         .route("/users", post(create_user))
//!         .layer(ExceptionLayer::from_container(&container).unwrap());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

extern crate self as exceptionhandler;

pub mod config;
pub mod di;
pub mod error;
pub mod exception;
pub mod extract;
pub mod interceptor;
pub mod model;
pub mod module;

// Re-export core types
pub use config::{ConfigService, ExceptionHandlerConfig, Locale};
pub use di::{Container, ContainerBuilder};
pub use error::{Result, StarterError};
pub use exception::{
    CallSite, Exception, ExceptionFilter, Failure, GlobalExceptionHandler, StatusRegistry, Traced,
    Unhandled,
};
pub use interceptor::ExceptionLayer;
pub use model::ErrorResponse;
pub use module::{ExceptionHandlerModule, Module};

// Re-export macros
pub use exceptionhandler_macro::Exception;

// Re-export commonly used types from dependencies
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use exceptionhandler::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, ExceptionHandlerConfig, Locale};
    pub use crate::di::{Container, ContainerBuilder};
    pub use crate::error::{Result, StarterError};
    pub use crate::exception::{
        ArgumentTypeMismatch, BodyCause, CallSite, Exception, ExceptionFilter, Failure, FieldError,
        GlobalExceptionHandler, Mismatch, PathSegment, StatusRegistry, Traced, Unhandled,
        UnreadableBody, ValidationFailure,
    };
    pub use crate::extract::{JsonBody, PathParam, ValidJson};
    pub use crate::interceptor::ExceptionLayer;
    pub use crate::model::ErrorResponse;
    pub use crate::module::{ExceptionHandlerModule, Module};
    pub use crate::{call_site, traced};
    pub use exceptionhandler_macro::Exception;
    pub use std::sync::Arc;
}
