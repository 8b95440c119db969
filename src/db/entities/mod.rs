//! SeaORM entities mapping the tables of the link-in-bio store.

pub mod api_key;
pub mod link;
pub mod payment;
pub mod profile;
pub mod user;
