mod layer;

pub use layer::{ExceptionLayer, ExceptionMiddleware};
