pub mod request;

pub use request::{RegisterUserRequest, UpdateUserRequest};
