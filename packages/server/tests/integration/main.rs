mod common;

mod files;
mod trash;
mod upload;
