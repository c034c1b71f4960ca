use super::{
    ArgumentTypeMismatch, BodyCause, CallSite, Exception, ExceptionFilter, Failure, FieldError,
    StatusRegistry, UnreadableBody, ValidationFailure,
};
use crate::config::ExceptionHandlerConfig;
use crate::model::{ErrorResponse, UNKNOWN_CLASS_PATH};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::error::Error;
use std::sync::Arc;

/// `error` label of malformed body responses
pub const MALFORMED_JSON_ERROR: &str = "Malformed JSON request";
/// `error` label of parameter type mismatch responses
pub const INVALID_PARAMETER_ERROR: &str = "Invalid request parameter";

const UNKNOWN_TYPE: &str = "unknown";

/// The global exception handler
///
/// Maps every [`Failure`] to an [`ErrorResponse`] and logs it. Holds only
/// immutable settings, so one instance serves all requests.
#[derive(Default)]
pub struct GlobalExceptionHandler {
    config: ExceptionHandlerConfig,
    statuses: Arc<StatusRegistry>,
}

impl GlobalExceptionHandler {
    pub fn new(config: ExceptionHandlerConfig) -> Self {
        Self {
            config,
            statuses: Arc::default(),
        }
    }

    /// Use `statuses` for errors that do not declare a status
    pub fn with_statuses(mut self, statuses: impl Into<Arc<StatusRegistry>>) -> Self {
        self.statuses = statuses.into();
        self
    }

    pub fn config(&self) -> &ExceptionHandlerConfig {
        &self.config
    }

    /// Dispatch to the handler of the failure's category
    pub fn handle(&self, failure: &Failure) -> ErrorResponse {
        match failure {
            Failure::Uncaught(exception) => self.handle_uncaught(&**exception),
            Failure::Validation(failure) => self.handle_validation(failure),
            Failure::UnreadableBody(failure) => self.handle_unreadable_body(failure),
            Failure::ArgumentTypeMismatch(failure) => self.handle_argument_type_mismatch(failure),
        }
    }

    /// Any error: its declared status, or 500
    pub fn handle_uncaught(&self, exception: &dyn Exception) -> ErrorResponse {
        let status = self.resolve_status(exception);
        let response = ErrorResponse::new(
            status,
            reason_phrase(status),
            Some(exception.to_string()),
            class_path(exception.call_site()),
            exception.source().map(ToString::to_string),
        );
        self.respond(response, exception)
    }

    /// Validation failure: names the rejected fields, always 400
    pub fn handle_validation(&self, failure: &ValidationFailure) -> ErrorResponse {
        let locale = self.config.locale;
        let field_errors = failure.field_errors();
        let message = match field_errors {
            [] => failure.to_string(),
            [single] => locale.invalid_field(single.field()),
            _ => locale.invalid_fields(
                &field_errors
                    .iter()
                    .map(FieldError::field)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        };

        let response = ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            reason_phrase(StatusCode::BAD_REQUEST),
            Some(message),
            class_path(failure.call_site()),
            field_errors
                .first()
                .and_then(FieldError::default_message)
                .map(str::to_string),
        );
        self.respond(response, failure)
    }

    /// Unreadable JSON body: names the offending field path, always 400
    pub fn handle_unreadable_body(&self, failure: &UnreadableBody) -> ErrorResponse {
        let locale = self.config.locale;
        let (message, original_message) = match failure.cause() {
            Some(BodyCause::InvalidFormat(mismatch)) => (
                locale.invalid_format(&mismatch.field_path()),
                Some(mismatch.message().to_string()),
            ),
            Some(BodyCause::MismatchedInput(mismatch)) => (
                locale.wrong_data_type(&mismatch.field_path()),
                Some(mismatch.message().to_string()),
            ),
            Some(BodyCause::Other(cause)) => (failure.to_string(), Some(cause.to_string())),
            None => (failure.to_string(), None),
        };

        let response = ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            MALFORMED_JSON_ERROR,
            Some(message),
            class_path(failure.call_site()),
            original_message,
        );
        self.respond(response, failure)
    }

    /// Parameter of the wrong type: names parameter, type and value, always 400
    pub fn handle_argument_type_mismatch(&self, failure: &ArgumentTypeMismatch) -> ErrorResponse {
        let message = self.config.locale.invalid_parameter(
            failure.name(),
            failure.required_type_short_name().unwrap_or(UNKNOWN_TYPE),
            failure.value(),
        );

        let response = ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            INVALID_PARAMETER_ERROR,
            Some(message),
            class_path(failure.call_site()),
            None,
        );
        self.respond(response, failure)
    }

    fn resolve_status(&self, exception: &dyn Exception) -> StatusCode {
        match self.statuses.resolve(exception) {
            Some(status) if status.is_client_error() || status.is_server_error() => status,
            Some(status) => {
                tracing::warn!(
                    status = status.as_u16(),
                    "Ignoring declared status outside the 4xx/5xx range"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            }
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the full response, then hide what the configuration keeps internal
    fn respond(&self, response: ErrorResponse, error: &(dyn Error + 'static)) -> ErrorResponse {
        log_error(&response, error);
        response.redacted(
            !self.config.expose_class_path,
            !self.config.expose_original_message,
        )
    }
}

impl ExceptionFilter for GlobalExceptionHandler {
    fn catch(&self, failure: &Failure) -> Response {
        self.handle(failure).into_response()
    }
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

fn class_path(site: Option<&CallSite>) -> String {
    site.map(CallSite::to_string)
        .unwrap_or_else(|| UNKNOWN_CLASS_PATH.to_string())
}

fn log_error(response: &ErrorResponse, error: &(dyn Error + 'static)) {
    tracing::error!(
        class_path = %response.class_path(),
        status = response.status(),
        error = %response.error(),
        detail = ?response.message(),
        original = ?response.original_message(),
        exception = error,
        "Unexpected exception at [{}]",
        response.class_path()
    );
}
