pub mod admin_routes;
pub mod auth_routes;
pub mod link_routes;
pub mod profile_routes;
pub mod subscription_routes;
pub mod user_routes;
