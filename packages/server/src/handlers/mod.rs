pub mod auth;
pub mod files;
pub mod trash;
pub mod upload;
