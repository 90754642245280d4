/// SSE Session Table
///
/// In the SSE framing a client holds a `GET /sse` event stream open and
/// POSTs its requests to `/sse/message?sessionId=...`. Responses travel back
/// over the event stream. This table maps each open stream to the channel
/// feeding it; a session disappears when its stream is dropped.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Format one server-sent event.
pub fn event(name: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {name}\ndata: {data}\n\n"))
}

#[derive(Default)]
pub struct SseSessions {
    sessions: Mutex<HashMap<Uuid, mpsc::UnboundedSender<Bytes>>>,
}

impl SseSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, mpsc::UnboundedSender<Bytes>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a session whose first event announces `{message_path}?sessionId=<id>`.
    pub fn open(self: &Arc<Self>, message_path: &str) -> (Uuid, SessionStream) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(event("endpoint", &format!("{message_path}?sessionId={id}")));
        self.lock().insert(id, tx);

        tracing::info!(target: "calculator_mcp::sse", session_id = %id, "SSE session opened");
        let stream = SessionStream {
            id,
            rx,
            sessions: Arc::clone(self),
        };
        (id, stream)
    }

    /// Queue an event for a session. Returns `false` if the session is
    /// unknown or its client has gone away.
    pub fn send(&self, id: &Uuid, chunk: Bytes) -> bool {
        let mut sessions = self.lock();
        let Some(tx) = sessions.get(id) else {
            return false;
        };
        if tx.send(chunk).is_err() {
            sessions.remove(id);
            return false;
        }
        true
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.lock().contains_key(id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn close(&self, id: &Uuid) {
        if self.lock().remove(id).is_some() {
            tracing::info!(target: "calculator_mcp::sse", session_id = %id, "SSE session closed");
        }
    }
}

/// Event stream for one SSE client. Dropping it ends the session.
pub struct SessionStream {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<Bytes>,
    sessions: Arc<SseSessions>,
}

impl Stream for SessionStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.sessions.close(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn first_event_announces_message_endpoint() {
        let sessions = Arc::new(SseSessions::new());
        let (id, mut stream) = sessions.open("/sse/message");

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first,
            Bytes::from(format!(
                "event: endpoint\ndata: /sse/message?sessionId={id}\n\n"
            ))
        );
    }

    #[tokio::test]
    async fn sent_events_reach_the_stream() {
        let sessions = Arc::new(SseSessions::new());
        let (id, mut stream) = sessions.open("/sse/message");
        let _endpoint = stream.next().await;

        assert!(sessions.send(&id, event("message", "{}")));
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from_static(b"event: message\ndata: {}\n\n"));
    }

    #[test]
    fn dropping_the_stream_closes_the_session() {
        let sessions = Arc::new(SseSessions::new());
        let (id, stream) = sessions.open("/sse/message");
        assert!(sessions.contains(&id));

        drop(stream);
        assert!(!sessions.contains(&id));
        assert!(!sessions.send(&id, event("message", "{}")));
        assert_eq!(sessions.len(), 0);
    }
}
