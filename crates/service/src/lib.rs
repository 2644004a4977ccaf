//! Service layer for the publishing backend.
//! - `manager` runs generic CRUD against any entity inside a request [`session::Session`].
//! - `media` streams uploaded files to disk concurrently.
//! - The `*_service` modules hold the entity rules: referential checks,
//!   ownership, validation.

pub mod errors;
pub mod pagination;
pub mod principal;
pub mod session;
pub mod manager;
pub mod media;
pub mod category_service;
pub mod news_service;
pub mod comment_service;
#[cfg(test)]
pub mod test_support;

pub use category_service::CategoryService;
pub use comment_service::CommentService;
pub use news_service::NewsService;
