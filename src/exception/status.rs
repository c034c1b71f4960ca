use super::Exception;
use axum::http::StatusCode;
use std::error::Error;

type Matcher = Box<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

struct Entry {
    name: String,
    matches: Matcher,
    status: StatusCode,
}

/// Status codes for error types that cannot declare one themselves
///
/// Consulted when an exception does not declare a status. The exception is
/// checked first, then the error it wraps. Entries are tried in registration
/// order.
///
/// # Example
/// ```
/// use exceptionhandler::StatusRegistry;
/// use exceptionhandler::axum::http::StatusCode;
///
/// let statuses = StatusRegistry::new()
///     .register::<std::io::Error>(StatusCode::SERVICE_UNAVAILABLE)
///     .register::<std::num::ParseIntError>(StatusCode::BAD_REQUEST);
/// assert_eq!(statuses.len(), 2);
/// ```
#[derive(Default)]
pub struct StatusRegistry {
    entries: Vec<Entry>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map every error of type `E` to `status`
    pub fn register<E: Error + 'static>(self, status: StatusCode) -> Self {
        self.register_when(
            std::any::type_name::<E>(),
            |error| error.is::<E>(),
            status,
        )
    }

    /// Map every error accepted by `predicate` to `status`
    pub fn register_when<F>(mut self, name: impl Into<String>, predicate: F, status: StatusCode) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.entries.push(Entry {
            name: name.into(),
            matches: Box::new(predicate),
            status,
        });
        self
    }

    /// Status registered for `error`
    pub fn lookup(&self, error: &(dyn Error + 'static)) -> Option<StatusCode> {
        self.entries
            .iter()
            .find(|entry| (entry.matches)(error))
            .map(|entry| {
                tracing::debug!(entry = %entry.name, status = entry.status.as_u16(), "Resolved registered status");
                entry.status
            })
    }

    /// Declared status of `exception`, else the registered one
    ///
    /// Wrapping exceptions are unwrapped level by level until one resolves.
    pub fn resolve(&self, exception: &dyn Exception) -> Option<StatusCode> {
        let mut current = Some(exception);
        while let Some(exception) = current {
            let status = exception
                .declared_status()
                .or_else(|| self.lookup(exception))
                .or_else(|| exception.wrapped().and_then(|inner| self.lookup(inner)));
            if status.is_some() {
                return status;
            }
            current = exception.wrapped_exception();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::Unhandled;

    #[derive(Debug, thiserror::Error, crate::Exception)]
    #[response_status(NOT_FOUND)]
    #[error("nothing here")]
    struct NotFound;

    #[derive(Debug, thiserror::Error, crate::Exception)]
    #[error("plain")]
    struct Plain;

    #[test]
    fn test_declared_status_wins() {
        let statuses = StatusRegistry::new().register::<NotFound>(StatusCode::GONE);
        assert_eq!(statuses.resolve(&NotFound), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_registered_status_for_undeclared_exception() {
        let statuses = StatusRegistry::new().register::<Plain>(StatusCode::CONFLICT);
        assert_eq!(statuses.resolve(&Plain), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_registered_status_for_wrapped_error() {
        let statuses =
            StatusRegistry::new().register::<std::io::Error>(StatusCode::SERVICE_UNAVAILABLE);
        let unhandled = Unhandled::new(std::io::Error::other("pool exhausted"));

        assert_eq!(
            statuses.resolve(&unhandled),
            Some(StatusCode::SERVICE_UNAVAILABLE)
        );
    }

    #[test]
    fn test_registered_status_through_nested_wrappers() {
        let statuses =
            StatusRegistry::new().register::<std::io::Error>(StatusCode::SERVICE_UNAVAILABLE);
        let traced = crate::traced!(Unhandled::new(std::io::Error::other("pool exhausted")));
        let twice = crate::traced!(traced);

        assert_eq!(statuses.resolve(&twice), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[test]
    fn test_predicate_entries() {
        let statuses = StatusRegistry::new().register_when(
            "timeouts",
            |error| error.to_string().contains("timed out"),
            StatusCode::GATEWAY_TIMEOUT,
        );

        assert_eq!(
            statuses.resolve(&Unhandled::new("upstream timed out")),
            Some(StatusCode::GATEWAY_TIMEOUT)
        );
        assert_eq!(statuses.resolve(&Plain), None);
    }
}
