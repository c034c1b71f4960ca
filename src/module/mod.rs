use crate::config::{ConfigService, ExceptionHandlerConfig};
use crate::di::Container;
use crate::error::Result;
use crate::exception::{ExceptionFilter, GlobalExceptionHandler, StatusRegistry};
use std::sync::Arc;

/// Trait for modules that register services in a [`Container`]
pub trait Module {
    /// Register all services of this module
    fn register(container: &mut Container) -> Result<()>;
}

/// Installs [`GlobalExceptionHandler`] as the `dyn ExceptionFilter`
///
/// Nothing is registered when the application already bound its own
/// `dyn ExceptionFilter`. Settings come from an [`ExceptionHandlerConfig`] in
/// the container, else from a [`ConfigService`] in the container, else from
/// the process environment. A [`StatusRegistry`] in the container is used as
/// is.
///
/// # Example
/// ```
/// use exceptionhandler::prelude::*;
///
/// let mut container = Container::new();
/// container.register(ExceptionHandlerConfig {
///     expose_class_path: false,
///     ..ExceptionHandlerConfig::default()
/// });
/// ExceptionHandlerModule::register(&mut container).unwrap();
///
/// let handler = container.resolve::<GlobalExceptionHandler>().unwrap();
/// assert!(!handler.config().expose_class_path);
/// ```
pub struct ExceptionHandlerModule;

impl Module for ExceptionHandlerModule {
    fn register(container: &mut Container) -> Result<()> {
        if container.contains::<dyn ExceptionFilter>() {
            tracing::debug!("ExceptionFilter already registered, skipping the global handler");
            return Ok(());
        }

        let config = if let Ok(config) = container.resolve::<ExceptionHandlerConfig>() {
            config.as_ref().clone()
        } else if let Ok(service) = container.resolve::<ConfigService>() {
            ExceptionHandlerConfig::from_config(&service)?
        } else {
            ExceptionHandlerConfig::from_env()?
        };

        let mut handler = GlobalExceptionHandler::new(config);
        if let Ok(statuses) = container.resolve::<StatusRegistry>() {
            handler = handler.with_statuses(statuses);
        }

        tracing::info!(
            expose_class_path = handler.config().expose_class_path,
            expose_original_message = handler.config().expose_original_message,
            locale = %handler.config().locale,
            "Registering global exception handler"
        );

        container.register(handler);
        container.register_trait::<dyn ExceptionFilter, GlobalExceptionHandler, _>(|handler| {
            handler as Arc<dyn ExceptionFilter>
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LOCALE_KEY, Locale};
    use crate::exception::Failure;
    use crate::error::StarterError;
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };

    struct Teapot;

    impl ExceptionFilter for Teapot {
        fn catch(&self, _failure: &Failure) -> Response {
            StatusCode::IM_A_TEAPOT.into_response()
        }
    }

    #[test]
    fn test_registers_global_handler() {
        let mut container = Container::new();
        container.register(ExceptionHandlerConfig::default());

        ExceptionHandlerModule::register(&mut container).unwrap();

        assert!(container.contains::<GlobalExceptionHandler>());
        assert!(container.resolve_trait::<dyn ExceptionFilter>().is_ok());
    }

    #[test]
    fn test_keeps_application_filter() {
        let mut container = Container::new();
        container.register(Teapot);
        container.register_trait::<dyn ExceptionFilter, Teapot, _>(|t| t as Arc<dyn ExceptionFilter>);

        ExceptionHandlerModule::register(&mut container).unwrap();

        assert!(!container.contains::<GlobalExceptionHandler>());
        let filter = container.resolve_trait::<dyn ExceptionFilter>().unwrap();
        let response = filter.catch(&Failure::from(anyhow::anyhow!("boom")));
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn test_reads_config_service() {
        let service = ConfigService::default();
        service.set(LOCALE_KEY, "ru");
        let mut container = Container::new();
        container.register(service);

        ExceptionHandlerModule::register(&mut container).unwrap();

        let handler = container.resolve::<GlobalExceptionHandler>().unwrap();
        assert_eq!(handler.config().locale, Locale::Ru);
    }

    #[test]
    fn test_invalid_config_fails_registration() {
        let service = ConfigService::default();
        service.set(LOCALE_KEY, "klingon");
        let mut container = Container::new();
        container.register(service);

        let err = ExceptionHandlerModule::register(&mut container).unwrap_err();
        assert!(matches!(err, StarterError::InvalidConfig { .. }));
        assert!(!container.contains::<dyn ExceptionFilter>());
    }

    #[test]
    fn test_uses_registered_statuses() {
        let mut container = Container::new();
        container.register(ExceptionHandlerConfig::default());
        container.register(StatusRegistry::new().register::<std::io::Error>(StatusCode::BAD_GATEWAY));

        ExceptionHandlerModule::register(&mut container).unwrap();

        let handler = container.resolve::<GlobalExceptionHandler>().unwrap();
        let failure = Failure::uncaught(crate::Unhandled::new(std::io::Error::other("reset")));
        assert_eq!(handler.handle(&failure).status(), 502);
    }
}
