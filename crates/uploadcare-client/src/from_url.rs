//! Import a remote file by URL
//!
//! The upload API answers the import request with a token right away and
//! fetches the file in the background. The task then polls the status
//! endpoint on a fixed interval until the import succeeds or fails. There is
//! no attempt cap; wrap the future in `tokio::time::timeout` or use the
//! cancellation handle to bound it.

use crate::transport::{Body, FormField, Transport, TransportRequest};
use crate::types::ImportOptions;
use crate::{ClientError, Config, Result};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Where an import stands.
///
/// Moves forward only. `Success` and `Error` absorb every later payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportState {
    /// Request not answered yet, no token
    Submitting,
    /// Token issued, file still processing (or not ready while waiting for it)
    Pending { token: String, is_ready: bool },
    /// The file is available; `payload` is the final status response
    Success { token: String, payload: Value },
    /// The service reported a failure; `detail` is the status response
    Error { token: String, detail: Value },
}

impl ImportState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }

    /// Import token, once the service issued one
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Submitting => None,
            Self::Pending { token, .. } | Self::Success { token, .. } | Self::Error { token, .. } => Some(token),
        }
    }

    /// Whether the last status said the file can be served
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Pending { is_ready, .. } => *is_ready,
            Self::Success { payload, .. } => ready_flag(payload),
            Self::Submitting | Self::Error { .. } => false,
        }
    }

    /// State after the service accepted the import
    pub fn submitted(self, token: impl Into<String>) -> Self {
        match self {
            Self::Submitting => Self::Pending {
                token: token.into(),
                is_ready: false,
            },
            other => other,
        }
    }

    /// State after observing a status payload
    pub fn next(self, payload: &Value, wait_until_ready: bool) -> Self {
        let token = match self {
            Self::Pending { token, .. } => token,
            other => return other,
        };

        let is_ready = ready_flag(payload);
        match payload.get("status").and_then(Value::as_str) {
            Some("error") => Self::Error {
                token,
                detail: payload.clone(),
            },
            Some("success") if !wait_until_ready || is_ready => Self::Success {
                token,
                payload: payload.clone(),
            },
            _ => Self::Pending { token, is_ready },
        }
    }
}

fn ready_flag(payload: &Value) -> bool {
    payload.get("is_ready").and_then(Value::as_bool).unwrap_or(false)
}

/// Protocol-relative URLs get an explicit scheme
pub fn normalize_source_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("http:{}", url)
    } else {
        url.to_string()
    }
}

/// Submit-then-poll workflow for one URL import
pub struct UrlImportTask {
    transport: Arc<dyn Transport>,
    submit_url: String,
    status_url: String,
    public_key: String,
    poll_interval: Duration,
    source_url: String,
    options: ImportOptions,
    cancel: CancellationToken,
    state: watch::Sender<ImportState>,
}

impl UrlImportTask {
    /// Prepare an import; nothing is sent until [`run`](Self::run)
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &Config,
        source_url: &str,
        options: ImportOptions,
    ) -> Self {
        Self {
            transport,
            submit_url: config.upload_url("/from_url/"),
            status_url: config.upload_url("/from_url/status/"),
            public_key: config.credentials.public_key.clone(),
            poll_interval: config.poll_interval,
            source_url: normalize_source_url(source_url),
            options,
            cancel: CancellationToken::new(),
            state: watch::channel(ImportState::Submitting).0,
        }
    }

    /// Token that aborts the task when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receiver that observes every state change of this task
    pub fn subscribe(&self) -> watch::Receiver<ImportState> {
        self.state.subscribe()
    }

    /// Submit the import and poll until a terminal state.
    ///
    /// Resolves to the final status payload on success.
    #[instrument(skip(self))]
    pub async fn run(self) -> Result<Value> {
        let token = self.submit().await?;
        self.state.send_modify(|state| *state = state.clone().submitted(token.as_str()));
        if self.cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        self.poll(&token).await
    }

    /// Run on the tokio runtime and return a handle that can cancel it
    pub fn spawn(self) -> ImportHandle {
        let cancel = self.cancel.clone();
        let state = self.subscribe();
        let join = tokio::spawn(self.run());
        ImportHandle {
            cancel,
            state,
            join: Some(join),
        }
    }

    async fn submit(&self) -> Result<String> {
        let form = vec![
            FormField::text("store", self.options.store.as_form_value()),
            FormField::text("pub_key", self.public_key.clone()),
            FormField::text("source_url", self.source_url.clone()),
        ];
        let request = TransportRequest::new(Method::POST, self.submit_url.clone()).with_body(Body::Form(form));

        let response = self.transport.send(request).await?;
        let token = response
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidResponse(format!("no token in import response: {}", response)))?;

        info!(token, source_url = %self.source_url, "URL import submitted");
        Ok(token.to_string())
    }

    async fn poll(&self, token: &str) -> Result<Value> {
        let mut attempts = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(attempts, "URL import cancelled");
                    return Err(ClientError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let polled = self.transport.send(self.status_request(token)).await;
            if self.cancel.is_cancelled() {
                debug!(attempts, "URL import cancelled, dropping poll result");
                return Err(ClientError::Cancelled);
            }
            let payload = polled?;
            attempts += 1;

            let state = self.state.borrow().clone().next(&payload, self.options.wait_until_ready);
            debug!(attempts, status = ?payload.get("status"), ready = state.is_ready(), "Polled URL import");
            self.state.send_replace(state.clone());

            match state {
                ImportState::Success { payload, .. } => return Ok(payload),
                ImportState::Error { detail, .. } => return Err(ClientError::from_import_status(detail)),
                ImportState::Submitting | ImportState::Pending { .. } => {}
            }
        }
    }

    fn status_request(&self, token: &str) -> TransportRequest {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", token)
            .append_pair("_", &chrono::Utc::now().timestamp_millis().to_string())
            .finish();
        TransportRequest::new(Method::GET, format!("{}?{}", self.status_url, query))
    }
}

/// Handle to a spawned [`UrlImportTask`]
pub struct ImportHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ImportState>,
    join: Option<JoinHandle<Result<Value>>>,
}

impl ImportHandle {
    /// Stop scheduling polls. A poll already in flight completes and its
    /// result is dropped; the task resolves to [`ClientError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Latest observed state
    pub fn state(&self) -> ImportState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every later state change
    pub fn subscribe(&self) -> watch::Receiver<ImportState> {
        self.state.clone()
    }

    /// Whether [`cancel`](Self::cancel) was called
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the terminal result
    pub async fn wait(mut self) -> Result<Value> {
        let Some(join) = self.join.take() else {
            return Err(ClientError::Cancelled);
        };
        match join.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ClientError::Cancelled),
        }
    }
}

impl Drop for ImportHandle {
    fn drop(&mut self) {
        // An orphaned import must not keep polling.
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::ScriptedTransport;
    use crate::types::StoreMode;
    use serde_json::json;

    fn config() -> Config {
        Config::new("demopublickey", "demoprivatekey").with_base("https://upload.test")
    }

    fn task(transport: &Arc<ScriptedTransport>, url: &str, options: ImportOptions) -> UrlImportTask {
        UrlImportTask::new(transport.clone(), &config(), url, options)
    }

    fn pending() -> ImportState {
        ImportState::Submitting.submitted("abc")
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(ImportState::Submitting.token(), None);
        assert_eq!(
            pending(),
            ImportState::Pending {
                token: "abc".to_string(),
                is_ready: false
            }
        );

        assert_eq!(pending().next(&json!({"status": "progress"}), false), pending());
        assert!(matches!(
            pending().next(&json!({"status": "success"}), false),
            ImportState::Success { .. }
        ));

        let not_ready = pending().next(&json!({"status": "success", "is_ready": false}), true);
        assert_eq!(not_ready, pending());

        let ready = json!({"status": "success", "is_ready": true});
        let done = pending().next(&ready, true);
        assert_eq!(done.token(), Some("abc"));
        assert!(done.is_ready());
        assert_eq!(
            done,
            ImportState::Success {
                token: "abc".to_string(),
                payload: ready
            }
        );

        let failed = json!({"status": "error", "error": "nope"});
        assert_eq!(
            pending().next(&failed, true),
            ImportState::Error {
                token: "abc".to_string(),
                detail: failed
            }
        );
    }

    #[test]
    fn test_terminal_states_absorb() {
        let progress = json!({"status": "progress"});
        let success = pending().next(&json!({"status": "success"}), false);
        assert_eq!(success.clone().next(&progress, false), success);
        assert_eq!(success.clone().submitted("other"), success);

        let error = pending().next(&json!({"status": "error"}), false);
        assert_eq!(error.clone().next(&json!({"status": "success"}), false), error);
        assert!(error.is_terminal());
    }

    #[test]
    fn test_polls_before_submit_are_ignored() {
        let state = ImportState::Submitting.next(&json!({"status": "success"}), false);
        assert_eq!(state, ImportState::Submitting);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_normalize_source_url() {
        assert_eq!(normalize_source_url("//example.com/a.png"), "http://example.com/a.png");
        assert_eq!(normalize_source_url("https://example.com/a.png"), "https://example.com/a.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_ready() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"type": "token", "token": "abc"})),
            Ok(json!({"status": "pending"})),
            Ok(json!({"status": "success", "is_ready": false})),
            Ok(json!({"status": "success", "is_ready": true, "uuid": "f00"})),
        ]));

        let task = task(&transport, "//example.com/cat.jpg", ImportOptions::new().wait_until_ready());
        let state = task.subscribe();
        assert_eq!(*state.borrow(), ImportState::Submitting);

        let result = task.run().await.unwrap();

        assert_eq!(result["uuid"], "f00");
        assert_eq!(transport.call_count(), 4);
        assert!(state.borrow().is_terminal());
        assert!(state.borrow().is_ready());
        assert_eq!(state.borrow().token(), Some("abc"));

        let submit = transport.request(0);
        assert_eq!(submit.method, Method::POST);
        assert_eq!(submit.url, "https://upload.test/from_url/");
        assert_eq!(submit.form_field("pub_key"), Some("demopublickey"));
        assert_eq!(submit.form_field("source_url"), Some("http://example.com/cat.jpg"));
        assert_eq!(submit.form_field("store"), Some("auto"));

        let poll = transport.request(1);
        assert_eq!(poll.method, Method::GET);
        assert!(poll.url.starts_with("https://upload.test/from_url/status/?token=abc&_="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_without_waiting() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"token": "abc"})),
            Ok(json!({"status": "success", "is_ready": false})),
        ]));

        let result = task(&transport, "https://example.com/a", ImportOptions::new().with_store(StoreMode::Store))
            .run()
            .await
            .unwrap();

        assert_eq!(result["status"], "success");
        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.request(0).form_field("store"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_terminates() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"token": "abc"})),
            Ok(json!({"status": "error", "error": {"message": "bad"}})),
            Ok(json!({"status": "success"})),
        ]));

        let err = task(&transport, "https://example.com/a", ImportOptions::new())
            .run()
            .await
            .unwrap_err();

        match err {
            ClientError::Import { message, detail } => {
                assert_eq!(message, "bad");
                assert_eq!(detail["status"], "error");
            }
            other => panic!("Expected Import, got {:?}", other),
        }
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_skips_polling() {
        let transport = Arc::new(ScriptedTransport::new(vec![Err(ClientError::UnexpectedStatus {
            status: 403,
            body: json!({"error": "pub_key is invalid"}),
        })]));

        let err = task(&transport, "https://example.com/a", ImportOptions::new())
            .run()
            .await
            .unwrap_err();

        assert!(err.is_access_denied());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"type": "file_info"}))]));

        let err = task(&transport, "https://example.com/a", ImportOptions::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_transport_error_terminates() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"token": "abc"})),
            Err(ClientError::InvalidResponse("truncated".to_string())),
        ]));

        let err = task(&transport, "https://example.com/a", ImportOptions::new())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidResponse(_)));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_fixed_interval() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"token": "abc"})),
            Ok(json!({"status": "progress"})),
            Ok(json!({"status": "progress"})),
            Ok(json!({"status": "success"})),
        ]));

        let started = tokio::time::Instant::now();
        task(&transport, "https://example.com/a", ImportOptions::new())
            .run()
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"token": "abc"}))]));

        let handle = task(&transport, "https://example.com/a", ImportOptions::new()).spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.call_count(), 2);
        assert_eq!(
            handle.state(),
            ImportState::Pending {
                token: "abc".to_string(),
                is_ready: false
            }
        );

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.call_count(), 2);

        assert!(handle.is_cancelled());
        assert!(matches!(handle.wait().await, Err(ClientError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_stops_run() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"token": "abc"}))]));
        let task = task(&transport, "https://example.com/a", ImportOptions::new());
        let token = task.cancel_token();
        let state = task.subscribe();

        let (result, ()) = tokio::join!(task.run(), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            token.cancel();
        });

        assert!(matches!(result, Err(ClientError::Cancelled)));
        // submit, then polls at 100ms and 200ms
        assert_eq!(transport.call_count(), 3);
        assert_eq!(state.borrow().token(), Some("abc"));
        assert!(!state.borrow().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_terminal_state() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(json!({"token": "abc"})),
            Ok(json!({"status": "error", "error": "Host does not exist"})),
        ]));

        let handle = task(&transport, "https://example.com/a", ImportOptions::new()).spawn();
        let mut state = handle.subscribe();
        state.wait_for(ImportState::is_terminal).await.unwrap();

        assert!(matches!(handle.state(), ImportState::Error { ref token, .. } if token == "abc"));
        assert!(matches!(handle.wait().await, Err(ClientError::Import { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"token": "abc"}))]));

        let handle = task(&transport, "https://example.com/a", ImportOptions::new()).spawn();
        tokio::time::sleep(Duration::from_millis(250)).await;
        let seen = transport.call_count();
        drop(handle);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.call_count(), seen);
    }
}
