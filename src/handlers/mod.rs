pub mod book_handlers;
pub mod health_handlers;
