pub mod chat_page_route;
pub mod health_route;
pub mod qa;
pub mod transcribe;
