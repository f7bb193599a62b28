pub mod transcribe_route;
