use super::Exception;
use axum::extract::rejection::{
    BytesRejection, ExtensionRejection, FormRejection, JsonRejection, PathRejection,
    QueryRejection, RawFormRejection, StringRejection,
};
use axum::http::StatusCode;

// Extractor rejections answer with the status axum assigns them.
macro_rules! rejection_exception {
    ($($rejection:ty),* $(,)?) => {
        $(
            impl Exception for $rejection {
                fn declared_status(&self) -> Option<StatusCode> {
                    Some(self.status())
                }
            }
        )*
    };
}

rejection_exception!(
    BytesRejection,
    ExtensionRejection,
    FormRejection,
    JsonRejection,
    PathRejection,
    QueryRejection,
    RawFormRejection,
    StringRejection,
);
