//! Review poller
//!
//! Long polls the review server and forwards the first reviewed attempt of
//! every "found" response to the notifier. The cursor returned by each
//! response is threaded into the next request.

use anyhow::Result;
use herald_client::ClientError;
use herald_core::domain::Cursor;
use herald_core::dto::{PollOutcome, PollResponse};
use std::sync::Arc;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::service::{CHAT_TARGET, Notifier, ReviewSource};

/// What a single poll iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// The server had nothing new; the cursor was advanced
    Waiting,

    /// A notification was sent; the cursor was advanced
    Notified,

    /// The read timeout expired; poll again right away
    TimedOut,

    /// The request failed; pause before polling again
    Backoff(Duration),
}

/// Poller that waits for reviews and notifies about them
pub struct ReviewPoller {
    source: Arc<dyn ReviewSource>,
    notifier: Arc<dyn Notifier>,
    retry_delay: Duration,
}

impl ReviewPoller {
    /// Creates a new review poller
    ///
    /// # Arguments
    /// * `source` - The long polling endpoint
    /// * `notifier` - Where review notifications go
    /// * `retry_delay` - Fixed pause after a failed request
    pub fn new(
        source: Arc<dyn ReviewSource>,
        notifier: Arc<dyn Notifier>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            retry_delay,
        }
    }

    /// Starts the polling loop
    ///
    /// Runs until `shutdown` is cancelled. The cursor starts out empty and
    /// lives only as long as this call.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Starting review poller (retry delay: {:?})",
            self.retry_delay
        );

        let mut cursor: Option<Cursor> = None;

        loop {
            let step = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                step = self.poll_once(&mut cursor) => step,
            };

            if let PollStep::Backoff(delay) = step {
                debug!("Retrying in {:?}", delay);

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = time::sleep(delay) => {}
                }
            }
        }

        info!("Review poller stopped");
        Ok(())
    }

    /// Performs a single poll iteration
    ///
    /// The cursor is only replaced after a successfully handled response;
    /// on any failure it is left untouched so no review is skipped.
    pub async fn poll_once(&self, cursor: &mut Option<Cursor>) -> PollStep {
        match self.source.poll(cursor.as_ref()).await {
            Ok(PollOutcome::TimedOut) => {
                debug!("Long polling request timed out, polling again");
                PollStep::TimedOut
            }
            Ok(PollOutcome::Response(response)) => self.handle_response(response, cursor).await,
            Err(e) => self.handle_failure(e),
        }
    }

    async fn handle_response(
        &self,
        response: PollResponse,
        cursor: &mut Option<Cursor>,
    ) -> PollStep {
        let step = match response.first_attempt() {
            Some(attempt) => {
                if let Err(e) = self.notifier.notify(attempt).await {
                    error!(
                        target: CHAT_TARGET,
                        "Не удалось отправить уведомление о проверке: {:#}", e
                    );
                    return PollStep::Backoff(self.retry_delay);
                }

                info!(
                    "Notified about review of {:?} ({})",
                    attempt.lesson_title,
                    attempt.verdict()
                );
                PollStep::Notified
            }
            None => PollStep::Waiting,
        };

        let next = response.next_cursor().clone();
        match next.as_datetime() {
            Some(at) => debug!(cursor = %next, "Next poll continues from {}", at),
            None => debug!(cursor = %next, "Next poll continues from opaque cursor"),
        }
        *cursor = Some(next);

        step
    }

    fn handle_failure(&self, e: ClientError) -> PollStep {
        if e.is_connection_error() {
            warn!("Connection to review server failed: {}", e);
        } else {
            error!(target: CHAT_TARGET, "Бот упал с ошибкой: {}", e);
        }

        PollStep::Backoff(self.retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::domain::{LogLevel, ReviewAttempt};
    use herald_core::message::{DEFAULT_SITE_URL, POSITIVE_RESULT, review_message};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    use crate::service::{ChatLogBuffer, ChatLogLayer};

    const RETRY: Duration = Duration::from_secs(3);

    /// Replays scripted outcomes and records the cursor of every request
    ///
    /// Once the script is exhausted it cancels `shutdown` and keeps timing out.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<PollOutcome, ClientError>>>,
        cursors: Mutex<Vec<Option<Cursor>>>,
        shutdown: CancellationToken,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<PollOutcome, ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                cursors: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            })
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.cursors
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.as_ref().map(|c| c.as_str().to_string()))
                .collect()
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        async fn poll(&self, cursor: Option<&Cursor>) -> Result<PollOutcome, ClientError> {
            self.cursors.lock().unwrap().push(cursor.cloned());

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => outcome,
                None => {
                    self.shutdown.cancel();
                    Ok(PollOutcome::TimedOut)
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notified: Mutex<Vec<ReviewAttempt>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, attempt: &ReviewAttempt) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("chat unavailable");
            }
            self.notified.lock().unwrap().push(attempt.clone());
            Ok(())
        }

        async fn send_text(&self, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn timeout(cursor: &str) -> Result<PollOutcome, ClientError> {
        Ok(PollOutcome::Response(PollResponse::Timeout {
            timestamp_to_request: Cursor::new(cursor),
        }))
    }

    fn found(titles: &[&str], cursor: &str) -> Result<PollOutcome, ClientError> {
        Ok(PollOutcome::Response(PollResponse::Found {
            new_attempts: titles
                .iter()
                .enumerate()
                .map(|(i, title)| ReviewAttempt {
                    lesson_title: title.to_string(),
                    lesson_url: format!("/lessons/{}/", 99 + i),
                    is_negative: false,
                })
                .collect(),
            last_attempt_timestamp: Cursor::new(cursor),
        }))
    }

    async fn connection_error() -> ClientError {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();
        ClientError::from(err)
    }

    fn poller(source: Arc<ScriptedSource>, notifier: Arc<RecordingNotifier>) -> ReviewPoller {
        ReviewPoller::new(source, notifier, RETRY)
    }

    #[tokio::test]
    async fn test_timeout_response_advances_cursor_without_notifying() {
        let source = ScriptedSource::new(vec![timeout("1700000000"), timeout("1700000090")]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source.clone(), notifier.clone());

        let mut cursor = None;
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Waiting);
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Waiting);

        assert_eq!(
            source.cursors(),
            vec![None, Some("1700000000".to_string())]
        );
        assert_eq!(cursor, Some(Cursor::new("1700000090")));
        assert!(notifier.notified.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_found_notifies_first_attempt_only() {
        let source = ScriptedSource::new(vec![found(&["Итоговая работа", "Second"], "1700000000")]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source.clone(), notifier.clone());

        let mut cursor = Some(Cursor::new("1699999999"));
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Notified);

        let notified = notifier.notified.lock().unwrap();
        assert_eq!(notified.len(), 1);
        assert_eq!(notified[0].lesson_title, "Итоговая работа");
        assert_eq!(cursor, Some(Cursor::new("1700000000")));
        assert_eq!(source.cursors(), vec![Some("1699999999".to_string())]);
    }

    #[tokio::test]
    async fn test_found_example_message_and_cursor() {
        let json = r#"{"status":"found","new_attempts":[{"lesson_title":"Итоговая работа","lesson_url":"/lessons/99/","is_negative":false}],"last_attempt_timestamp":1700000000}"#;
        let response: PollResponse = serde_json::from_str(json).unwrap();
        let source = ScriptedSource::new(vec![Ok(PollOutcome::Response(response))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source.clone(), notifier.clone());

        let mut cursor = None;
        poller.poll_once(&mut cursor).await;
        poller.poll_once(&mut cursor).await;

        let site = url::Url::parse(DEFAULT_SITE_URL).unwrap();
        let text = review_message(&site, &notifier.notified.lock().unwrap()[0]).unwrap();
        assert!(text.contains("Итоговая работа"));
        assert!(text.contains(POSITIVE_RESULT));
        assert!(text.contains("https://dvmn.org/lessons/99/"));
        assert_eq!(
            source.cursors(),
            vec![None, Some("1700000000".to_string())]
        );
    }

    #[tokio::test]
    async fn test_found_without_attempts_still_advances() {
        let source = ScriptedSource::new(vec![found(&[], "5")]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source, notifier.clone());

        let mut cursor = None;
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Waiting);
        assert_eq!(cursor, Some(Cursor::new("5")));
        assert!(notifier.notified.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_keeps_cursor() {
        let source = ScriptedSource::new(vec![found(&["Урок"], "10")]);
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let poller = poller(source, notifier);

        let mut cursor = Some(Cursor::new("9"));
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Backoff(RETRY));
        assert_eq!(cursor, Some(Cursor::new("9")));
    }

    #[tokio::test]
    async fn test_connection_failure_keeps_cursor_and_backs_off() {
        let source = ScriptedSource::new(vec![Err(connection_error().await)]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source, notifier);

        let mut cursor = Some(Cursor::new("42"));
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Backoff(RETRY));
        assert_eq!(cursor, Some(Cursor::new("42")));
    }

    #[tokio::test]
    async fn test_read_timeout_keeps_cursor_without_backoff() {
        let source = ScriptedSource::new(vec![Ok(PollOutcome::TimedOut)]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source, notifier);

        let mut cursor = Some(Cursor::new("42"));
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::TimedOut);
        assert_eq!(cursor, Some(Cursor::new("42")));
    }

    #[tokio::test]
    async fn test_remote_error_backs_off() {
        let source = ScriptedSource::new(vec![
            Err(ClientError::Remote("Invalid token".to_string())),
            Err(ClientError::api_error(503, "Service Unavailable")),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source, notifier);

        let mut cursor = None;
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Backoff(RETRY));
        assert_eq!(poller.poll_once(&mut cursor).await, PollStep::Backoff(RETRY));
        assert_eq!(cursor, None);
    }

    #[tokio::test]
    async fn test_only_non_connection_failures_reach_the_chat() {
        let buffer = ChatLogBuffer::new();
        let subscriber = tracing_subscriber::registry().with(ChatLogLayer::new(buffer.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = ScriptedSource::new(vec![
            Err(connection_error().await),
            Err(ClientError::Remote("Invalid token".to_string())),
            found(&["Урок"], "10"),
        ]);
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let poller = poller(source, notifier);
        let mut cursor = None;

        poller.poll_once(&mut cursor).await;
        assert!(buffer.drain().is_empty());

        poller.poll_once(&mut cursor).await;
        let entries = buffer.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert!(entries[0].message.contains("Invalid token"));

        poller.poll_once(&mut cursor).await;
        let entries = buffer.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Error);
        assert!(entries[0].message.contains("chat unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_pauses_once_per_connection_failure() {
        let source = ScriptedSource::new(vec![
            Err(connection_error().await),
            timeout("1"),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source.clone(), notifier);

        let started = time::Instant::now();
        poller.run(source.shutdown.clone()).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= RETRY && elapsed < RETRY * 2, "paused {:?}", elapsed);
        assert_eq!(
            source.cursors(),
            vec![None, None, Some("1".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_does_not_pause_on_read_timeout() {
        let source = ScriptedSource::new(vec![
            Ok(PollOutcome::TimedOut),
            Ok(PollOutcome::TimedOut),
            found(&["Урок"], "7"),
        ]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = poller(source.clone(), notifier.clone());

        let started = time::Instant::now();
        poller.run(source.shutdown.clone()).await.unwrap();

        assert!(started.elapsed() < RETRY);
        assert_eq!(notifier.notified.lock().unwrap().len(), 1);
        assert_eq!(
            source.cursors(),
            vec![None, None, None, Some("7".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let source = ScriptedSource::new(vec![Err(ClientError::Remote("boom".to_string()))]);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = ReviewPoller::new(source.clone(), notifier, Duration::from_secs(3600));

        let shutdown = CancellationToken::new();
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let started = time::Instant::now();
        poller.run(shutdown).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
        assert_eq!(source.cursors().len(), 1);
    }
}
