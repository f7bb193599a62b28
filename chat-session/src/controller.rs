//! Dual-mode ask state machine.
//!
//! Triggers take `&self`, so a front end may fire them from independent event
//! handlers. The session lock is held only between awaits; whichever trigger
//! claims the session first runs, any other trigger returns [`Outcome::Busy`]
//! until it completes.

use std::future::Future;

use futures::StreamExt;
use parking_lot::Mutex;
use qa_protocol::{DEFAULT_TOP_K, QaRequest, QaResponse, SseDecoder};
use tokio::sync::{Notify, futures::Notified};
use tracing::{debug, info, warn};

use crate::{error::ChatError, session::ChatSession, transport::QaTransport, view::ChatView};

/// Request mode of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Blocking,
    Streaming,
}

/// What a trigger press resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request ran and its result is in the session.
    Completed,
    /// The request ran and failed; the session error field holds the message.
    Failed,
    /// Cancelled through [`ChatController::abort`].
    Aborted,
    /// Another request was in flight; nothing was sent.
    Busy,
    /// The trimmed question was empty; nothing was sent.
    EmptyQuestion,
}

struct Inner {
    session: ChatSession,
    in_flight: Option<Mode>,
}

/// Owns one chat session and issues its requests through `T`.
pub struct ChatController<T> {
    transport: T,
    inner: Mutex<Inner>,
    abort: Notify,
    top_k: u32,
}

impl<T: QaTransport> ChatController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                session: ChatSession::default(),
                in_flight: None,
            }),
            abort: Notify::new(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Overrides the retrieval count sent with each question.
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> ChatSession {
        self.inner.lock().session.clone()
    }

    /// Render-ready snapshot.
    pub fn view(&self) -> ChatView {
        let inner = self.inner.lock();
        ChatView::build(&inner.session, inner.in_flight.is_some())
    }

    pub fn set_question(&self, question: impl Into<String>) {
        self.inner.lock().session.question = question.into();
    }

    /// Resets every session field. Ignored (returns `false`) while a request
    /// is in flight.
    pub fn clear(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.in_flight.is_some() {
            return false;
        }
        inner.session.reset();
        true
    }

    /// Cancels the in-flight request, if any.
    pub fn abort(&self) -> bool {
        // Notified under the lock, so the request seen here is the one woken.
        let inner = self.inner.lock();
        match inner.in_flight {
            Some(mode) => {
                info!(?mode, "aborting in-flight request");
                self.abort.notify_waiters();
                true
            }
            None => false,
        }
    }

    /// Blocking ask: one request, full answer stored on success.
    pub async fn ask(&self) -> Outcome {
        let (request, aborted) = match self.begin(Mode::Blocking) {
            Ok(claimed) => claimed,
            Err(outcome) => return outcome,
        };
        let result = cancellable(aborted, self.run_blocking(&request)).await;
        self.finish(Mode::Blocking, result)
    }

    /// Streaming ask: answer text accumulates as `chunk` events arrive.
    pub async fn ask_stream(&self) -> Outcome {
        let (request, aborted) = match self.begin(Mode::Streaming) {
            Ok(claimed) => claimed,
            Err(outcome) => return outcome,
        };
        let result = cancellable(aborted, self.run_streaming(&request)).await;
        self.finish(Mode::Streaming, result)
    }

    /// Validates the question and claims the session for `mode`.
    ///
    /// The returned abort signal is registered while the claim is still
    /// locked: any [`Self::abort`] that observes this request wakes it.
    fn begin(&self, mode: Mode) -> Result<(QaRequest, Notified<'_>), Outcome> {
        let mut inner = self.inner.lock();
        if let Some(active) = inner.in_flight {
            debug!(?mode, ?active, "trigger ignored: request in flight");
            return Err(Outcome::Busy);
        }

        let question = inner.session.question.trim().to_string();
        if question.is_empty() {
            return Err(Outcome::EmptyQuestion);
        }

        inner.in_flight = Some(mode);
        let aborted = self.abort.notified();
        let session = &mut inner.session;
        session.error = None;
        session.answer = None;
        session.clear_stream();
        match mode {
            Mode::Blocking => session.loading = true,
            Mode::Streaming => session.stream_loading = true,
        }

        Ok((
            QaRequest {
                question,
                top_k: self.top_k,
            },
            aborted,
        ))
    }

    async fn run_blocking(&self, request: &QaRequest) -> Result<(), ChatError> {
        let reply = self.transport.post_qa(request).await?;
        let body = reply.into_success().await?.into_text().await?;
        let answer: QaResponse = serde_json::from_str(&body)?;
        debug!(
            request_id = %answer.request_id,
            latency_ms = answer.latency_ms,
            sources = answer.sources.len(),
            "blocking answer received"
        );
        self.inner.lock().session.answer = Some(answer);
        Ok(())
    }

    async fn run_streaming(&self, request: &QaRequest) -> Result<(), ChatError> {
        let reply = self.transport.post_qa_stream(request).await?;
        let mut stream = reply.into_success().await?.into_stream();

        let mut decoder = SseDecoder::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                self.inner.lock().session.apply(event)?;
            }
        }
        decoder.finish();
        Ok(())
    }

    fn finish(&self, mode: Mode, result: Option<Result<(), ChatError>>) -> Outcome {
        let mut inner = self.inner.lock();
        inner.in_flight = None;
        let session = &mut inner.session;
        match mode {
            Mode::Blocking => session.loading = false,
            Mode::Streaming => session.stream_loading = false,
        }

        match result {
            Some(Ok(())) => Outcome::Completed,
            Some(Err(err)) => {
                warn!(?mode, error = %err, "ask failed");
                session.error = Some(err.to_string());
                Outcome::Failed
            }
            None => Outcome::Aborted,
        }
    }
}

/// Races `fut` against the abort signal; `None` means aborted.
async fn cancellable<F: Future>(aborted: Notified<'_>, fut: F) -> Option<F::Output> {
    tokio::select! {
        out = fut => Some(out),
        _ = aborted => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use futures::future::BoxFuture;
    use qa_protocol::SourceItem;

    use super::*;
    use crate::transport::Reply;

    /// Canned transport. Every call counts; `gate`, when set, holds the reply
    /// until notified.
    #[derive(Default)]
    struct FakeTransport {
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        qa: Option<(u16, String)>,
        stream_chunks: Vec<Vec<u8>>,
        stream_failure: Option<(u16, String)>,
        requests: Mutex<Vec<QaRequest>>,
    }

    impl FakeTransport {
        async fn wait_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }
    }

    impl QaTransport for FakeTransport {
        fn post_qa<'a>(
            &'a self,
            request: &'a QaRequest,
        ) -> BoxFuture<'a, Result<Reply, ChatError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.requests.lock().push(request.clone());
                self.wait_gate().await;
                let (status, body) = self.qa.clone().unwrap_or((200, String::new()));
                Ok(Reply::text(status, body))
            })
        }

        fn post_qa_stream<'a>(
            &'a self,
            request: &'a QaRequest,
        ) -> BoxFuture<'a, Result<Reply, ChatError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.requests.lock().push(request.clone());
                self.wait_gate().await;
                if let Some((status, body)) = self.stream_failure.clone() {
                    return Ok(Reply::text(status, body));
                }
                let chunks: Vec<Result<Vec<u8>, ChatError>> =
                    self.stream_chunks.iter().cloned().map(Ok).collect();
                Ok(Reply::stream(200, futures::stream::iter(chunks).boxed()))
            })
        }
    }

    fn stream_fixture() -> Vec<Vec<u8>> {
        let body = concat!(
            "event: sources\n",
            "data: {\"type\":\"sources\",\"request_id\":\"r2\",\"sources\":[{\"rank\":1,\"source\":\"guide.pdf\",\"page\":3}]}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"宫颈\"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"癌...\"}\n\n",
            "data: {\"type\":\"done\",\"request_id\":\"r2\",\"latency_ms\":80}\n\n",
        )
        .as_bytes();
        // Uneven chunks that cut through lines and characters.
        body.chunks(13).map(<[u8]>::to_vec).collect()
    }

    #[tokio::test]
    async fn blocking_round_trip_shows_answer_and_one_citation() {
        let transport = FakeTransport {
            qa: Some((
                200,
                r#"{"request_id":"r1","answer":"接种HPV疫苗……","sources":[{"rank":1,"source":"guide.pdf","page":12,"distance":0.123,"excerpt":"HPV"}],"latency_ms":120}"#.into(),
            )),
            ..Default::default()
        };
        let chat = ChatController::new(transport);
        chat.set_question("  宫颈癌的预防方法有哪些？ ");

        assert_eq!(chat.ask().await, Outcome::Completed);

        let sent = chat.transport.requests.lock().clone();
        assert_eq!(sent, vec![QaRequest::new("宫颈癌的预防方法有哪些？")]);

        let view = chat.view();
        let panel = view.answer_panel.expect("answer panel");
        assert_eq!(panel.markdown, "接种HPV疫苗……");
        assert_eq!(panel.request_id, "r1");
        assert_eq!(view.answer_citations.len(), 1);
        assert_eq!(view.answer_citations[0].label, "1");
        assert_eq!(
            view.answer_citations[0].tooltip.similarity.as_deref(),
            Some("0.877")
        );
        assert!(!chat.session().loading);
        assert!(view.controls.ask && view.controls.ask_stream && view.controls.clear);
    }

    #[tokio::test]
    async fn blocking_non_2xx_surfaces_body_or_status() {
        let chat = ChatController::new(FakeTransport {
            qa: Some((422, r#"{"detail":"question is empty"}"#.into())),
            ..Default::default()
        });
        chat.set_question("q");
        assert_eq!(chat.ask().await, Outcome::Failed);
        assert_eq!(
            chat.session().error.as_deref(),
            Some(r#"{"detail":"question is empty"}"#)
        );
        assert!(chat.session().answer.is_none());

        let chat = ChatController::new(FakeTransport {
            qa: Some((502, String::new())),
            ..Default::default()
        });
        chat.set_question("q");
        assert_eq!(chat.ask().await, Outcome::Failed);
        assert_eq!(chat.session().error.as_deref(), Some("HTTP 502"));
        assert!(!chat.session().loading);
    }

    #[tokio::test]
    async fn blocking_garbage_body_is_an_error() {
        let chat = ChatController::new(FakeTransport {
            qa: Some((200, "<html>".into())),
            ..Default::default()
        });
        chat.set_question("q");
        assert_eq!(chat.ask().await, Outcome::Failed);
        assert!(
            chat.session()
                .error
                .unwrap()
                .starts_with("invalid response")
        );
    }

    #[tokio::test]
    async fn empty_question_sends_nothing() {
        let chat = ChatController::new(FakeTransport::default());
        chat.set_question("   \n");
        assert_eq!(chat.ask().await, Outcome::EmptyQuestion);
        assert_eq!(chat.ask_stream().await, Outcome::EmptyQuestion);
        assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn streaming_scenario_builds_answer_and_reveals_sources() {
        let chat = ChatController::new(FakeTransport {
            stream_chunks: stream_fixture(),
            ..Default::default()
        });
        chat.set_question("宫颈癌的预防方法有哪些？");

        assert_eq!(chat.ask_stream().await, Outcome::Completed);

        let session = chat.session();
        assert_eq!(session.stream_text, "宫颈癌...");
        assert!(!session.stream_loading);
        assert!(session.show_stream_sources);
        assert_eq!(session.stream_request_id, "r2");
        assert_eq!(session.stream_latency_ms, Some(80));

        let view = chat.view();
        assert_eq!(view.stream_citations.len(), 1);
        assert_eq!(view.stream_citations[0].tooltip.title, "guide.pdf");
        assert_eq!(view.stream_citations[0].tooltip.page, "3");
        let panel = view.stream_panel.expect("stream panel");
        assert!(panel.finished);
        assert_eq!(panel.request_id.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn streaming_non_2xx_sets_error_without_panel() {
        let chat = ChatController::new(FakeTransport {
            stream_failure: Some((500, "internal error".into())),
            ..Default::default()
        });
        chat.set_question("q");

        assert_eq!(chat.ask_stream().await, Outcome::Failed);
        let view = chat.view();
        assert_eq!(view.error.as_deref(), Some("internal error"));
        assert!(view.stream_panel.is_none());
        assert!(!chat.session().stream_loading);
    }

    #[tokio::test]
    async fn error_event_stops_stream_and_keeps_partial_text() {
        let body = concat!(
            "data: {\"type\":\"chunk\",\"content\":\"部分\"}\n",
            "data: {\"type\":\"error\",\"message\":\"ollama unavailable\"}\n",
            "data: {\"type\":\"chunk\",\"content\":\"never\"}\n",
        );
        let chat = ChatController::new(FakeTransport {
            stream_chunks: vec![body.as_bytes().to_vec()],
            ..Default::default()
        });
        chat.set_question("q");

        assert_eq!(chat.ask_stream().await, Outcome::Failed);
        let session = chat.session();
        assert_eq!(session.error.as_deref(), Some("ollama unavailable"));
        assert_eq!(session.stream_text, "部分");
        assert!(!session.show_stream_sources);
        assert!(!session.stream_loading);
    }

    #[tokio::test]
    async fn concurrent_triggers_issue_one_request() {
        let gate = Arc::new(Notify::new());
        let chat = ChatController::new(FakeTransport {
            gate: Some(gate.clone()),
            qa: Some((
                200,
                r#"{"request_id":"r1","answer":"a","sources":[],"latency_ms":1}"#.into(),
            )),
            ..Default::default()
        });
        chat.set_question("q");

        let (first, second) = tokio::join!(chat.ask(), async {
            let outcome = chat.ask_stream().await;
            // While the blocking ask is parked, every control is disabled.
            let view = chat.view();
            assert!(!view.controls.ask && !view.controls.ask_stream && !view.controls.clear);
            assert!(view.controls.abort);
            assert!(!chat.clear());
            gate.notify_one();
            outcome
        });

        assert_eq!(first, Outcome::Completed);
        assert_eq!(second, Outcome::Busy);
        assert_eq!(chat.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abort_cancels_in_flight_request() {
        let gate = Arc::new(Notify::new());
        let chat = ChatController::new(FakeTransport {
            gate: Some(gate),
            ..Default::default()
        });
        chat.set_question("q");
        assert!(!chat.abort());

        let (outcome, aborted) = tokio::join!(chat.ask_stream(), async {
            tokio::task::yield_now().await;
            chat.abort()
        });

        assert!(aborted);
        assert_eq!(outcome, Outcome::Aborted);
        let session = chat.session();
        assert!(!session.stream_loading);
        assert!(session.error.is_none());
        assert!(chat.clear());
    }

    #[tokio::test]
    async fn abort_right_after_claim_is_not_lost() {
        let chat = ChatController::new(FakeTransport::default());
        chat.set_question("q");

        // Session claimed, request future not yet polled.
        let (_request, aborted) = chat.begin(Mode::Streaming).unwrap();
        assert!(chat.abort());

        let result = cancellable(aborted, std::future::pending::<()>()).await;
        assert_eq!(result, None);
        assert_eq!(chat.finish(Mode::Streaming, None), Outcome::Aborted);
        assert!(chat.view().controls.clear);
    }

    #[tokio::test]
    async fn new_ask_clears_other_mode_panel() {
        let chat = ChatController::new(FakeTransport {
            qa: Some((
                200,
                r#"{"request_id":"r1","answer":"a","sources":[],"latency_ms":1}"#.into(),
            )),
            stream_chunks: stream_fixture(),
            ..Default::default()
        });
        chat.set_question("q");

        chat.ask_stream().await;
        assert!(chat.view().stream_panel.is_some());
        chat.ask().await;
        let view = chat.view();
        assert!(view.stream_panel.is_none());
        assert!(view.stream_citations.is_empty());
        assert!(view.answer_panel.is_some());

        chat.ask_stream().await;
        assert!(chat.view().answer_panel.is_none());
    }

    #[tokio::test]
    async fn clear_resets_everything() {
        let chat = ChatController::new(FakeTransport {
            stream_failure: Some((500, "internal error".into())),
            ..Default::default()
        });
        chat.set_question("q");
        chat.ask_stream().await;
        {
            let mut inner = chat.inner.lock();
            inner.session.answer = Some(QaResponse {
                request_id: "r".into(),
                answer: "x".into(),
                sources: vec![SourceItem {
                    rank: 1,
                    source: None,
                    page: None,
                    chunk: None,
                    distance: None,
                    excerpt: None,
                }],
                latency_ms: 3,
            });
            inner.session.stream_text = "partial".into();
        }

        assert!(chat.clear());
        assert_eq!(chat.session(), ChatSession::default());
        let view = chat.view();
        assert!(view.error.is_none() && view.answer_panel.is_none() && view.stream_panel.is_none());
        assert!(view.question.is_empty());
    }
}
