mod error_response;

pub use error_response::{ErrorResponse, UNKNOWN_CLASS_PATH};
