use proc_macro::TokenStream;

mod exception;

/// Derive macro implementing `exceptionhandler::Exception`
///
/// `#[response_status(...)]` declares the status the global handler answers
/// with. It accepts a `StatusCode` constant name, a numeric code, or
/// `inherit` to reuse the status of the single wrapped exception. On an enum
/// it may be placed on the type and overridden per variant.
///
/// A field marked `#[origin]` (of type `CallSite` or `Option<CallSite>`)
/// provides the origin rendered as `classPath`.
///
/// # Example
/// ```ignore
/// use exceptionhandler::{CallSite, Exception};
///
/// #[derive(Debug, thiserror::Error, Exception)]
/// #[response_status(NOT_FOUND)]
/// #[error("user {id} not found")]
/// pub struct UserNotFound {
///     id: u64,
///     #[origin]
///     site: CallSite,
/// }
///
/// #[derive(Debug, thiserror::Error, Exception)]
/// pub enum BillingError {
///     #[response_status(402)]
///     #[error("payment required")]
///     PaymentRequired,
///
///     #[response_status(inherit)]
///     #[error(transparent)]
///     User(UserNotFound),
/// }
/// ```
#[proc_macro_derive(Exception, attributes(response_status, origin))]
pub fn derive_exception(input: TokenStream) -> TokenStream {
    exception::derive_exception(input)
}
