//! Chat orchestration on top of the QA proxy.
//!
//! A [`ChatController`] owns one [`ChatSession`] and drives it through two
//! request modes: a blocking ask that stores a complete answer and a streaming
//! ask that feeds the event stream through [`qa_protocol::SseDecoder`]. Only one
//! request is in flight at a time. [`ChatView`] is the render-ready snapshot
//! consumed by front ends.
//!
//! # Example
//! ```no_run
//! use chat_session::{ChatController, HttpQaTransport};
//!
//! # #[tokio::main] async fn main() -> Result<(), chat_session::ChatError> {
//! let chat = ChatController::new(HttpQaTransport::new("http://127.0.0.1:3000")?);
//! chat.set_question("宫颈癌的预防方法有哪些？");
//! chat.ask_stream().await;
//! println!("{}", chat.session().stream_text);
//! # Ok(()) }
//! ```

mod controller;
mod error;
mod session;
mod transport;
mod view;

pub use controller::{ChatController, Mode, Outcome};
pub use error::ChatError;
pub use session::ChatSession;
pub use transport::{ByteStream, HttpQaTransport, QaTransport, Reply, ReplyBody};
pub use view::{AnswerPanel, ChatView, Citation, CitationTooltip, Controls, StreamPanel};
