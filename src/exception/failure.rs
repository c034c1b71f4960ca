use super::{CallSite, Exception};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::error::Category;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use validator::{ValidationErrors, ValidationErrorsKind};

/// A failure reported while processing a request
///
/// Variants are matched most specific first by the global handler; anything
/// that is not one of the three request-shape failures is `Uncaught`.
#[derive(Debug)]
pub enum Failure {
    Uncaught(Box<dyn Exception>),
    Validation(ValidationFailure),
    UnreadableBody(UnreadableBody),
    ArgumentTypeMismatch(ArgumentTypeMismatch),
}

impl Failure {
    pub fn uncaught(exception: impl Exception) -> Self {
        Self::Uncaught(Box::new(exception))
    }

    /// The failure as a plain error, for logging
    pub fn as_error(&self) -> &(dyn Error + 'static) {
        match self {
            Failure::Uncaught(exception) => &**exception,
            Failure::Validation(failure) => failure,
            Failure::UnreadableBody(failure) => failure,
            Failure::ArgumentTypeMismatch(failure) => failure,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_error(), f)
    }
}

impl<E: Exception> From<E> for Failure {
    fn from(exception: E) -> Self {
        Self::Uncaught(Box::new(exception))
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Self::uncaught(Unhandled::from(error))
    }
}

impl From<ValidationFailure> for Failure {
    fn from(failure: ValidationFailure) -> Self {
        Self::Validation(failure)
    }
}

impl From<ValidationErrors> for Failure {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(ValidationFailure::from(errors))
    }
}

impl From<UnreadableBody> for Failure {
    fn from(failure: UnreadableBody) -> Self {
        Self::UnreadableBody(failure)
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for Failure {
    fn from(error: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self::UnreadableBody(UnreadableBody::from(error))
    }
}

impl From<ArgumentTypeMismatch> for Failure {
    fn from(failure: ArgumentTypeMismatch) -> Self {
        Self::ArgumentTypeMismatch(failure)
    }
}

/// Failure waiting in the response extensions for the exception layer
#[derive(Clone)]
pub(crate) struct PendingFailure(pub(crate) Arc<Failure>);

impl IntoResponse for Failure {
    /// Park the failure for [`ExceptionLayer`](crate::ExceptionLayer), which
    /// renders the final response with the registered filter.
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response
            .extensions_mut()
            .insert(PendingFailure(Arc::new(self)));
        response
    }
}

/// Any error without an exception type of its own
#[derive(Debug)]
pub struct Unhandled {
    error: Box<dyn Error + Send + Sync>,
    site: Option<CallSite>,
}

impl Unhandled {
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            error: error.into(),
            site: None,
        }
    }

    /// Record where the error was raised
    pub fn at(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.error
    }
}

impl From<anyhow::Error> for Unhandled {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for Unhandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl Error for Unhandled {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

impl Exception for Unhandled {
    fn call_site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }

    fn wrapped(&self) -> Option<&(dyn Error + 'static)> {
        let error: &(dyn Error + 'static) = &*self.error;
        Some(error)
    }
}

/// A validation error attributed to one named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    field: String,
    default_message: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, default_message: Option<String>) -> Self {
        Self {
            field: field.into(),
            default_message,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn default_message(&self) -> Option<&str> {
        self.default_message.as_deref()
    }
}

/// Validation of a request object failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    object: String,
    field_errors: Vec<FieldError>,
    global_errors: Vec<String>,
    site: Option<CallSite>,
}

impl ValidationFailure {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            field_errors: Vec::new(),
            global_errors: Vec::new(),
            site: None,
        }
    }

    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors
            .push(FieldError::new(field, Some(message.into())));
        self
    }

    /// Add an error that concerns the object as a whole
    pub fn with_global_error(mut self, message: impl Into<String>) -> Self {
        self.global_errors.push(message.into());
        self
    }

    pub fn at(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    /// Flatten `validator` errors into field errors ordered by field path
    ///
    /// Nested structs render as `address.city`, list items as `items[0].name`.
    pub fn from_errors(object: impl Into<String>, errors: &ValidationErrors) -> Self {
        let mut failure = Self::new(object);
        collect_field_errors("", errors, &mut failure);
        failure
            .field_errors
            .sort_by(|left, right| left.field.cmp(&right.field));
        failure
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn global_errors(&self) -> &[String] {
        &self.global_errors
    }

    pub fn error_count(&self) -> usize {
        self.field_errors.len() + self.global_errors.len()
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }
}

// Struct-level (schema) errors are reported under this key.
const GLOBAL_ERRORS_KEY: &str = "__all__";

fn collect_field_errors(prefix: &str, errors: &ValidationErrors, failure: &mut ValidationFailure) {
    for (field, kind) in errors.errors() {
        let is_global = prefix.is_empty() && *field == GLOBAL_ERRORS_KEY;
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    if is_global {
                        failure.global_errors.push(message);
                    } else {
                        failure
                            .field_errors
                            .push(FieldError::new(path.clone(), Some(message)));
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(&path, nested, failure),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(&format!("{path}[{index}]"), nested, failure);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        Self::from_errors("request", &errors)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation failed for object='{}'. Error count: {}",
            self.object,
            self.error_count()
        )
    }
}

impl Error for ValidationFailure {}

/// One step of the path to a value inside a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => f.write_str(name),
            PathSegment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// A JSON value that does not fit its target field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    path: Vec<PathSegment>,
    message: String,
}

impl Mismatch {
    pub fn new(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Segments joined with `.`, e.g. `items.[0].name`
    pub fn field_path(&self) -> String {
        self.path
            .iter()
            .map(PathSegment::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The parser's message, without location information
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Mismatch {}

/// Why a request body could not be read
#[derive(Debug)]
pub enum BodyCause {
    /// A value is present but its format does not fit the field
    InvalidFormat(Mismatch),
    /// A value of the wrong type, or a missing/unknown field
    MismatchedInput(Mismatch),
    Other(Box<dyn Error + Send + Sync>),
}

/// The request body is not a readable JSON document for the target type
#[derive(Debug)]
pub struct UnreadableBody {
    description: String,
    cause: Option<BodyCause>,
    site: Option<CallSite>,
}

impl UnreadableBody {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            cause: None,
            site: None,
        }
    }

    pub fn with_cause(mut self, cause: BodyCause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn at(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    /// Classify a `serde_json` error raised at `path`
    pub fn from_json_error(path: Vec<PathSegment>, error: serde_json::Error) -> Self {
        let description = format!("JSON parse error: {error}");
        let cause = match error.classify() {
            Category::Data => {
                let message = message_without_location(&error);
                let mut path = path;
                // serde reports a missing field at its parent object
                if let Some(field) = missing_field_name(&message) {
                    path.push(PathSegment::Field(field.to_string()));
                }
                let mismatch = Mismatch::new(path, message);
                if is_type_mismatch(mismatch.message()) {
                    BodyCause::MismatchedInput(mismatch)
                } else {
                    BodyCause::InvalidFormat(mismatch)
                }
            }
            Category::Syntax | Category::Eof | Category::Io => BodyCause::Other(Box::new(error)),
        };
        Self::new(description).with_cause(cause)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cause(&self) -> Option<&BodyCause> {
        self.cause.as_ref()
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for UnreadableBody {
    fn from(error: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = error.path().iter().map(path_segment).collect();
        Self::from_json_error(path, error.into_inner())
    }
}

// Unknown segments render as `?`, matching serde_path_to_error's own Display.
fn path_segment(segment: &serde_path_to_error::Segment) -> PathSegment {
    match segment {
        serde_path_to_error::Segment::Seq { index } => PathSegment::Index(*index),
        serde_path_to_error::Segment::Map { key } => PathSegment::Field(key.clone()),
        serde_path_to_error::Segment::Enum { variant } => PathSegment::Field(variant.clone()),
        serde_path_to_error::Segment::Unknown => PathSegment::Field("?".to_string()),
    }
}

/// serde messages that mean the value has the wrong type or shape; every
/// other data error is a value of the right type in an invalid format
const TYPE_MISMATCH_PREFIXES: [&str; 5] = [
    "invalid type",
    "invalid length",
    "missing field",
    "unknown field",
    "duplicate field",
];

fn is_type_mismatch(message: &str) -> bool {
    TYPE_MISMATCH_PREFIXES
        .iter()
        .any(|prefix| message.starts_with(prefix))
}

/// `x` of serde's ``missing field `x` `` message
fn missing_field_name(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split_once('`')
        .map(|(field, _)| field)
}

fn message_without_location(error: &serde_json::Error) -> String {
    let rendered = error.to_string();
    let location = format!(" at line {} column {}", error.line(), error.column());
    if let Some(bare) = rendered.strip_suffix(&location) {
        return bare.to_string();
    }
    rendered
}

impl fmt::Display for UnreadableBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl Error for UnreadableBody {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        let cause: &(dyn Error + 'static) = match self.cause.as_ref()? {
            BodyCause::InvalidFormat(mismatch) | BodyCause::MismatchedInput(mismatch) => mismatch,
            BodyCause::Other(error) => &**error,
        };
        Some(cause)
    }
}

/// A request parameter could not be converted to the handler's type
#[derive(Debug)]
pub struct ArgumentTypeMismatch {
    name: String,
    value: String,
    required_type: Option<String>,
    cause: Option<Box<dyn Error + Send + Sync>>,
    site: Option<CallSite>,
}

impl ArgumentTypeMismatch {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            required_type: None,
            cause: None,
            site: None,
        }
    }

    pub fn with_required_type(mut self, type_name: impl Into<String>) -> Self {
        self.required_type = Some(type_name.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn at(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn required_type(&self) -> Option<&str> {
        self.required_type.as_deref()
    }

    /// Last path segment of the required type, generic arguments removed:
    /// `alloc::vec::Vec<u8>` is `Vec`
    pub fn required_type_short_name(&self) -> Option<&str> {
        let full = self.required_type.as_deref()?;
        let without_generics = full.split('<').next().unwrap_or(full);
        without_generics.rsplit("::").next()
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }
}

impl fmt::Display for ArgumentTypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to convert value '{}' of parameter '{}' to required type '{}'",
            self.value,
            self.name,
            self.required_type.as_deref().unwrap_or("unknown")
        )?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl Error for ArgumentTypeMismatch {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn Error + 'static))
    }
}
