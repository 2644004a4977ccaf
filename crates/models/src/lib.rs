pub mod errors;
pub mod db;
pub mod user;
pub mod category;
pub mod news;
pub mod comment;

#[cfg(test)]
mod tests;
