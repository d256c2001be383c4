pub mod authentication;
pub mod service;
pub mod token;
pub mod user;

pub use authentication::*;
pub use service::*;
pub use user::*;
