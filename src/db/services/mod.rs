//! The `services` module wraps every query the application runs. HTTP
//! handlers work with the functions and domain structs exported here and
//! never build SQL themselves.

pub mod api_key_service;
pub mod link_service;
pub mod profile_service;
pub mod subscription_service;
pub mod user_service;

pub use api_key_service::*;
pub use link_service::*;
pub use profile_service::*;
pub use subscription_service::*;
pub use user_service::*;
