//! Extractors that report rejections as [`Failure`]s
//!
//! The axum extractors answer bad input with plain-text rejections. These
//! wrappers classify the problem instead, so the global handler can name the
//! offending field or parameter.

use crate::exception::{
    ArgumentTypeMismatch, CallSite, Failure, Traced, UnreadableBody, ValidationFailure,
};
use axum::{
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Request,
        path::ErrorKind,
        rejection::PathRejection,
    },
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use validator::Validate;

/// The request did not declare a JSON body
#[derive(Debug, Error, crate::Exception)]
#[response_status(UNSUPPORTED_MEDIA_TYPE)]
#[error("Expected request with `Content-Type: application/json`")]
pub struct UnsupportedMediaType {
    #[origin]
    site: Option<CallSite>,
}

/// JSON body extractor
///
/// Like `axum::Json`, but a body that does not deserialize is reported as
/// [`UnreadableBody`] with the path of the offending field.
///
/// # Example
/// ```
/// use exceptionhandler::prelude::*;
///
/// #[derive(serde::Deserialize)]
/// struct Transfer {
///     amount: u64,
/// }
///
/// async fn transfer(JsonBody(transfer): JsonBody<Transfer>) -> std::result::Result<String, Failure> {
///     Ok(transfer.amount.to_string())
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T: DeserializeOwned> JsonBody<T> {
    /// Deserialize a complete JSON document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Failure> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let value = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| UnreadableBody::from(e).at(crate::call_site!()))?;
        deserializer
            .end()
            .map_err(|e| UnreadableBody::from_json_error(Vec::new(), e).at(crate::call_site!()))?;
        Ok(JsonBody(value))
    }
}

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(UnsupportedMediaType {
                site: Some(crate::call_site!()),
            }
            .into());
        }

        let bytes = Bytes::from_request(req, state).await?;
        Self::from_bytes(&bytes)
    }
}

/// JSON body extractor that also runs `validator` checks
///
/// Failed checks are reported as [`ValidationFailure`] listing every rejected
/// field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(|errors| {
            ValidationFailure::from_errors(short_type_name::<T>(), &errors).at(crate::call_site!())
        })?;
        Ok(ValidJson(value))
    }
}

/// Path parameter extractor
///
/// A segment that does not parse into its target type is reported as
/// [`ArgumentTypeMismatch`] naming the parameter, the type and the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParam(value)),
            Err(rejection) => Err(path_rejection_failure(rejection, crate::call_site!())),
        }
    }
}

/// Classify a path rejection; anything but a parse error stays uncaught
pub fn path_rejection_failure(rejection: PathRejection, site: CallSite) -> Failure {
    match mismatch_of(&rejection) {
        Some(mismatch) => mismatch.with_cause(rejection).at(site).into(),
        None => Traced::new(rejection, site).into(),
    }
}

fn mismatch_of(rejection: &PathRejection) -> Option<ArgumentTypeMismatch> {
    let PathRejection::FailedToDeserializePathParams(failed) = rejection else {
        return None;
    };

    match failed.kind() {
        ErrorKind::ParseErrorAtKey {
            key,
            value,
            expected_type,
        } => Some(ArgumentTypeMismatch::new(key.as_str(), value.as_str()).with_required_type(*expected_type)),
        ErrorKind::ParseErrorAtIndex {
            index,
            value,
            expected_type,
        } => Some(
            ArgumentTypeMismatch::new(index.to_string(), value.as_str())
                .with_required_type(*expected_type),
        ),
        ErrorKind::ParseError {
            value,
            expected_type,
        } => Some(ArgumentTypeMismatch::new("path", value.as_str()).with_required_type(*expected_type)),
        ErrorKind::DeserializeError { key, value, .. } => {
            Some(ArgumentTypeMismatch::new(key.as_str(), value.as_str()))
        }
        _ => None,
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}
