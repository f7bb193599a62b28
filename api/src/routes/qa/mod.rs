pub mod qa_route;
pub mod qa_stream_route;
