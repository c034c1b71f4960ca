use super::Exception;
use axum::http::StatusCode;
use std::error::Error;
use std::fmt;

/// Location a failure was raised at, rendered as `<type_path>.<function>:<line>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    type_path: String,
    function: String,
    line: u32,
}

impl CallSite {
    pub fn new(type_path: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            type_path: type_path.into(),
            function: function.into(),
            line,
        }
    }

    /// Build from a function path as reported by `std::any::type_name`
    ///
    /// Closure and async-block frames are folded into the enclosing function,
    /// so `app::users::create::{{closure}}` becomes `app::users.create`.
    pub fn from_function_path(path: &str, line: u32) -> Self {
        let mut path = path;
        while let Some(enclosing) = path.strip_suffix("::{{closure}}") {
            path = enclosing;
        }

        match path.rsplit_once("::") {
            Some((type_path, function)) => Self::new(self_type(type_path), function, line),
            None => Self::new("<root>", path, line),
        }
    }

    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

// `<app::Repo<T> as app::Store>` is reported as `app::Repo`
fn self_type(type_path: &str) -> &str {
    let self_type = type_path
        .strip_prefix('<')
        .and_then(|qualified| qualified.split_once(" as "))
        .map_or(type_path, |(self_type, _)| self_type);
    match self_type.split_once('<') {
        Some((bare, _)) if !bare.is_empty() => bare,
        _ => self_type,
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.type_path, self.function, self.line)
    }
}

/// Capture the [`CallSite`] of the enclosing function
///
/// ```
/// use exceptionhandler::call_site;
///
/// fn lookup() -> exceptionhandler::CallSite {
///     call_site!()
/// }
///
/// assert_eq!(lookup().function(), "lookup");
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __call_site_marker() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __type_name_of(__call_site_marker);
        $crate::exception::CallSite::from_function_path(
            name.strip_suffix("::__call_site_marker").unwrap_or(name),
            ::std::line!(),
        )
    }};
}

/// Wrap an [`Exception`] together with the call site it is raised at
///
/// ```ignore
/// return Err(traced!(UserNotFound { id }).into());
/// ```
#[macro_export]
macro_rules! traced {
    ($error:expr) => {
        $crate::exception::Traced::new($error, $crate::call_site!())
    };
}

/// An exception annotated with the place it was raised
///
/// Display, source and declared status are those of the wrapped exception.
#[derive(Debug)]
pub struct Traced<E> {
    error: E,
    site: CallSite,
}

impl<E: Exception> Traced<E> {
    pub fn new(error: E, site: CallSite) -> Self {
        Self { error, site }
    }

    pub fn get_ref(&self) -> &E {
        &self.error
    }

    pub fn into_inner(self) -> E {
        self.error
    }
}

impl<E: fmt::Display> fmt::Display for Traced<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<E: Error> Error for Traced<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.error.source()
    }
}

impl<E: Exception> Exception for Traced<E> {
    fn declared_status(&self) -> Option<StatusCode> {
        self.error.declared_status()
    }

    fn call_site(&self) -> Option<&CallSite> {
        Some(&self.site)
    }

    fn wrapped(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }

    fn wrapped_exception(&self) -> Option<&dyn Exception> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, crate::Exception)]
    #[response_status(GONE)]
    #[error("resource gone")]
    struct Gone;

    struct Repository;

    impl Repository {
        fn locate(&self) -> CallSite {
            call_site!()
        }
    }

    #[test]
    fn test_display_format() {
        let site = CallSite::new("app::users::UserService", "create", 42);
        assert_eq!(site.to_string(), "app::users::UserService.create:42");
    }

    #[test]
    fn test_from_function_path_folds_closures() {
        let site = CallSite::from_function_path("app::handlers::create::{{closure}}::{{closure}}", 7);
        assert_eq!(site.type_path(), "app::handlers");
        assert_eq!(site.function(), "create");
        assert_eq!(site.line(), 7);
    }

    #[test]
    fn test_from_function_path_drops_trait_qualification() {
        let site = CallSite::from_function_path(
            "<app::extract::Body<T> as axum_core::extract::FromRequest<S>>::from_request::{{closure}}",
            118,
        );
        assert_eq!(site.to_string(), "app::extract::Body.from_request:118");
    }

    #[test]
    fn test_from_function_path_drops_generic_arguments() {
        let site = CallSite::from_function_path("app::extract::Body<_>::from_bytes", 58);
        assert_eq!(site.to_string(), "app::extract::Body.from_bytes:58");
    }

    #[test]
    fn test_call_site_macro_names_method() {
        let site = Repository.locate();
        assert!(site.type_path().ends_with("Repository"), "{site}");
        assert_eq!(site.function(), "locate");
        assert!(site.line() > 0);
    }

    #[tokio::test]
    async fn test_call_site_macro_in_async_fn() {
        async fn raise() -> CallSite {
            call_site!()
        }

        let site = raise().await;
        assert_eq!(site.function(), "raise");
    }

    #[test]
    fn test_traced_keeps_declared_status() {
        let traced = traced!(Gone);
        assert_eq!(traced.declared_status(), Some(StatusCode::GONE));
        assert_eq!(traced.to_string(), "resource gone");
        assert_eq!(traced.call_site().map(CallSite::function), Some("test_traced_keeps_declared_status"));
    }
}
