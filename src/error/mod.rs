mod store;

pub use store::{ApiErrorBody, ApiErrorObject, StoreError};
