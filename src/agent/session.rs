//! Chat transcript between the user and the two analysis agents.
//!
//! A [`ChatSession`] owns the message list, the backend status, the planning
//! insights and the latest chart payload. Replies are appended as empty
//! streaming placeholders; the caller reveals them with
//! [`ChatSession::append_chunk`] and closes them with
//! [`ChatSession::finish_streaming`].

use crate::agent::client::{AnalysisBackend, AnalyzeResponse, HistoryEntry};
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Number of planning insights kept.
pub const MAX_INSIGHTS: usize = 5;

const DATASET_GREETING: &str = "Hello! I'm the Dataset Analyst. I can analyze Pakistan's import/export data from the CSV file. Ask me about specific commodities, groups, months, or values!";
const EXPERT_GREETING: &str = "And I'm the Economics Expert! I provide strategic insights, economic analysis, and recommendations based on the data. Together, we'll give you comprehensive trade intelligence!";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Dataset,
    Expert,
}

impl Sender {
    /// Agent id sent in the conversation history.
    pub fn agent_id(&self) -> Option<&'static str> {
        match self {
            Sender::User => None,
            Sender::Dataset => Some("dataset"),
            Sender::Expert => Some("expert"),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Dataset => "Dataset Analyst",
            Sender::Expert => "Economics Expert",
        }
    }

    pub fn avatar(&self) -> &'static str {
        match self {
            Sender::User => "🧑",
            Sender::Dataset => "📊",
            Sender::Expert => "🎓",
        }
    }

    fn role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            _ => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_streaming: bool,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Checking,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsightKind {
    Strategy,
    Opportunity,
}

impl InsightKind {
    /// Map the backend's `insights_type` onto a display kind.
    pub fn from_type(insights_type: &str) -> Self {
        match insights_type.to_lowercase().as_str() {
            "growth" | "opportunity" | "trend" => InsightKind::Opportunity,
            _ => InsightKind::Strategy,
        }
    }
}

impl std::fmt::Display for InsightKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsightKind::Strategy => write!(f, "Strategy"),
            InsightKind::Opportunity => write!(f, "Opportunity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanningInsight {
    pub id: u64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: InsightKind,
}

/// A placeholder message waiting to be revealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSegment {
    pub message_id: u64,
    pub sender: Sender,
    pub text: String,
}

/// Result of [`ChatSession::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank query, or a reply is still streaming.
    Ignored,
    /// The backend is not connected; nothing was appended.
    Rejected,
    /// Reply placeholders to reveal, dataset first.
    Reply(Vec<RevealSegment>),
    /// The request failed; an error message was appended.
    Failed(String),
}

/// Expert answer, either inline or JSON-encoded in a string.
#[derive(Debug, Clone, Default, Deserialize)]
struct EconomicsResponse {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    insights_type: Option<String>,
    #[serde(default)]
    insights: Option<String>,
}

impl EconomicsResponse {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => serde_json::from_value(parsed).ok(),
                _ => Some(Self {
                    output: Some(s.clone()),
                    ..Self::default()
                }),
            },
            _ => None,
        }
    }
}

pub struct ChatSession<B: AnalysisBackend> {
    backend: B,
    id: String,
    started_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    next_id: u64,
    status: BackendStatus,
    error: Option<String>,
    insights: VecDeque<PlanningInsight>,
    latest_chart: Option<Value>,
    busy: bool,
}

impl<B: AnalysisBackend> ChatSession<B> {
    pub fn new(backend: B) -> Self {
        let mut session = Self {
            backend,
            id: String::new(),
            started_at: Utc::now(),
            messages: Vec::new(),
            next_id: 1,
            status: BackendStatus::Checking,
            error: None,
            insights: VecDeque::new(),
            latest_chart: None,
            busy: false,
        };
        session.reset();
        session
    }

    /// Start over with a fresh id and the greeting messages.
    ///
    /// The backend status is kept.
    pub fn reset(&mut self) {
        self.started_at = Utc::now();
        self.id = format!("session_{}", self.started_at.timestamp_millis());
        self.messages.clear();
        self.error = None;
        self.insights.clear();
        self.latest_chart = None;
        self.busy = false;

        self.push_message(Sender::Dataset, DATASET_GREETING.to_string(), false, false);
        self.push_message(Sender::Expert, EXPERT_GREETING.to_string(), false, false);

        debug!("Started chat session {}", self.id);
    }

    /// Probe the backend and record the result.
    pub async fn check_backend(&mut self) -> BackendStatus {
        self.status = BackendStatus::Checking;
        self.status = if self.backend.health_check().await {
            BackendStatus::Connected
        } else {
            BackendStatus::Disconnected
        };
        debug!("Backend status: {:?}", self.status);
        self.status
    }

    /// Send a query to both agents.
    pub async fn send(&mut self, query: &str) -> SendOutcome {
        let query = query.trim();
        if query.is_empty() || self.busy {
            return SendOutcome::Ignored;
        }

        if self.status != BackendStatus::Connected {
            self.error = Some(ApiError::NotConnected.to_string());
            return SendOutcome::Rejected;
        }

        let history = self.history();
        self.push_message(Sender::User, query.to_string(), false, false);
        self.error = None;
        self.busy = true;

        let result = self
            .backend
            .analyze(query, &history)
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response)
                } else {
                    Err(ApiError::Failed(
                        response
                            .error
                            .unwrap_or_else(|| "Analysis failed".to_string()),
                    ))
                }
            });

        match result {
            Ok(response) => SendOutcome::Reply(self.accept(response)),
            Err(e) => {
                let message = e.to_string();
                warn!("Analysis request failed: {}", message);
                self.push_message(
                    Sender::Dataset,
                    format!("I encountered an error: {}. Please try again.", message),
                    false,
                    true,
                );
                self.error = Some(message.clone());
                self.busy = false;
                SendOutcome::Failed(message)
            }
        }
    }

    fn accept(&mut self, response: AnalyzeResponse) -> Vec<RevealSegment> {
        let data = response.data.unwrap_or_default();

        let dataset_text = data
            .csv_response
            .filter(|s| !s.is_empty())
            .or(response.response)
            .unwrap_or_default();

        let economics = data
            .economics_response
            .as_ref()
            .and_then(EconomicsResponse::from_value)
            .unwrap_or_default();

        let kind = economics.insights_type.as_deref().filter(|k| !k.is_empty());
        let text = economics.insights.as_deref().filter(|t| !t.is_empty());
        if let (Some(kind), Some(text)) = (kind, text) {
            self.record_insight(InsightKind::from_type(kind), text.to_string());
        }

        if response.chart_data.is_some() {
            self.latest_chart = response.chart_data;
        }

        let mut segments = Vec::new();
        for (sender, text) in [
            (Sender::Dataset, dataset_text),
            (Sender::Expert, economics.output.unwrap_or_default()),
        ] {
            if text.is_empty() {
                continue;
            }
            let message_id = self.push_message(sender, String::new(), true, false);
            segments.push(RevealSegment {
                message_id,
                sender,
                text,
            });
        }

        if segments.is_empty() {
            self.busy = false;
        }
        segments
    }

    fn record_insight(&mut self, kind: InsightKind, text: String) {
        let id = self.next_id;
        self.next_id += 1;

        self.insights.push_back(PlanningInsight {
            id,
            text,
            timestamp: Utc::now(),
            kind,
        });
        while self.insights.len() > MAX_INSIGHTS {
            self.insights.pop_front();
        }
    }

    fn push_message(&mut self, sender: Sender, text: String, streaming: bool, error: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.messages.push(ChatMessage {
            id,
            sender,
            text,
            timestamp: Utc::now(),
            is_streaming: streaming,
            is_error: error,
        });
        id
    }

    /// Append revealed text to a streaming message.
    pub fn append_chunk(&mut self, message_id: u64, chunk: &str) {
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.is_streaming)
        {
            message.text.push_str(chunk);
        }
    }

    /// Mark a message as fully revealed.
    pub fn finish_streaming(&mut self, message_id: u64) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
            message.is_streaming = false;
        }
        if !self.messages.iter().any(|m| m.is_streaming) {
            self.busy = false;
        }
    }

    /// Close every streaming message with whatever text it has so far and
    /// release the session. Also used when a pending request is abandoned.
    pub fn cancel_streaming(&mut self) {
        for message in self.messages.iter_mut().filter(|m| m.is_streaming) {
            message.is_streaming = false;
        }
        self.busy = false;
    }

    /// Conversation history as sent to the backend.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|m| HistoryEntry {
                role: m.sender.role().to_string(),
                content: m.text.clone(),
                agent: m.sender.agent_id().map(str::to_string),
            })
            .collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Most recent planning insights, oldest first.
    pub fn insights(&self) -> impl Iterator<Item = &PlanningInsight> {
        self.insights.iter()
    }

    pub fn latest_chart(&self) -> Option<&Value> {
        self.latest_chart.as_ref()
    }

    pub fn status(&self) -> BackendStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Elapsed time since the session started, as `Xm Ys`.
    pub fn duration(&self) -> String {
        format_duration((Utc::now() - self.started_at).num_seconds())
    }
}

fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}m {}s", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::AnalysisData;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockBackend {
        healthy: bool,
        reply: Mutex<Option<Result<AnalyzeResponse, ApiError>>>,
        seen: Mutex<Vec<(String, Vec<HistoryEntry>)>>,
    }

    impl MockBackend {
        fn new(healthy: bool, reply: Result<AnalyzeResponse, ApiError>) -> Self {
            Self {
                healthy,
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AnalysisBackend for MockBackend {
        async fn analyze(
            &self,
            query: &str,
            history: &[HistoryEntry],
        ) -> Result<AnalyzeResponse, ApiError> {
            self.seen
                .lock()
                .unwrap()
                .push((query.to_string(), history.to_vec()));
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ApiError::Failed("no reply".to_string())))
        }

        async fn health_check(&self) -> bool {
            self.healthy
        }
    }

    /// Backend whose analysis never completes.
    struct StalledBackend;

    #[async_trait]
    impl AnalysisBackend for StalledBackend {
        async fn analyze(
            &self,
            _query: &str,
            _history: &[HistoryEntry],
        ) -> Result<AnalyzeResponse, ApiError> {
            std::future::pending().await
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn success(economics: Value) -> AnalyzeResponse {
        AnalyzeResponse {
            success: true,
            data: Some(AnalysisData {
                csv_response: Some("Rice exports rose 12%.".to_string()),
                economics_response: Some(economics),
            }),
            chart_data: Some(json!({"data": [{"type": "bar"}]})),
            response: None,
            error: None,
        }
    }

    async fn connected(reply: Result<AnalyzeResponse, ApiError>) -> ChatSession<MockBackend> {
        let mut session = ChatSession::new(MockBackend::new(true, reply));
        assert_eq!(session.check_backend().await, BackendStatus::Connected);
        session
    }

    #[test]
    fn test_new_session_greets() {
        let session = ChatSession::new(MockBackend::new(true, Ok(AnalyzeResponse::default())));

        assert!(session.id().starts_with("session_"));
        assert_eq!(session.status(), BackendStatus::Checking);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].sender, Sender::Dataset);
        assert_eq!(session.messages()[1].sender, Sender::Expert);
    }

    #[tokio::test]
    async fn test_send_reveals_both_agents() {
        let mut session = connected(Ok(success(json!({
            "output": "Diversify export markets.",
            "insights_type": "growth",
            "insights": "Rice demand is rising."
        }))))
        .await;

        let outcome = session.send("How are rice exports?").await;
        let segments = match outcome {
            SendOutcome::Reply(segments) => segments,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].sender, Sender::Dataset);
        assert_eq!(segments[0].text, "Rice exports rose 12%.");
        assert_eq!(segments[1].sender, Sender::Expert);
        assert_eq!(segments[1].text, "Diversify export markets.");
        assert!(session.busy);

        let insights: Vec<_> = session.insights().collect();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Opportunity);
        assert!(session.latest_chart().is_some());

        // A second query while streaming is ignored.
        assert_eq!(session.send("again").await, SendOutcome::Ignored);

        for segment in &segments {
            session.append_chunk(segment.message_id, &segment.text);
            session.finish_streaming(segment.message_id);
        }
        assert!(!session.busy);

        let last = session.messages().last().unwrap();
        assert_eq!(last.text, "Diversify export markets.");
        assert!(!last.is_streaming);
    }

    #[tokio::test]
    async fn test_empty_insight_fields_are_skipped() {
        let mut session = connected(Ok(success(json!({
            "output": "Hold steady.",
            "insights_type": "growth",
            "insights": ""
        }))))
        .await;
        session.send("Outlook?").await;
        assert_eq!(session.insights().count(), 0);

        let mut session = connected(Ok(success(json!({
            "output": "Hold steady.",
            "insights_type": "",
            "insights": "Keep reserves."
        }))))
        .await;
        session.send("Outlook?").await;
        assert_eq!(session.insights().count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_request_releases_session() {
        let mut session = ChatSession::new(StalledBackend);
        assert_eq!(session.check_backend().await, BackendStatus::Connected);

        tokio::select! {
            _ = session.send("Slow question") => panic!("stalled backend answered"),
            _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => {}
        }
        assert!(session.busy);

        session.cancel_streaming();
        assert!(!session.busy);
        assert_eq!(session.messages().last().unwrap().text, "Slow question");
    }

    #[tokio::test]
    async fn test_history_excludes_current_query() {
        let mut session = connected(Ok(success(json!({"output": "ok"})))).await;
        session.send("Top imports?").await;

        let seen = session.backend.seen.lock().unwrap();
        let (query, history) = &seen[0];
        assert_eq!(query, "Top imports?");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "assistant");
        assert_eq!(history[0].agent.as_deref(), Some("dataset"));
        assert_eq!(history[1].agent.as_deref(), Some("expert"));
    }

    #[tokio::test]
    async fn test_string_economics_response() {
        let encoded = json!(r#"{"output": "Cut petroleum dependence.", "insights_type": "plan", "insights": "Shift to renewables."}"#);
        let mut session = connected(Ok(success(encoded))).await;

        let SendOutcome::Reply(segments) = session.send("Energy outlook?").await else {
            panic!("expected a reply");
        };
        assert_eq!(segments[1].text, "Cut petroleum dependence.");
        assert_eq!(session.insights().next().unwrap().kind, InsightKind::Strategy);
    }

    #[tokio::test]
    async fn test_plain_string_economics_is_verbatim() {
        let mut session = connected(Ok(success(json!("Not JSON at all")))).await;

        let SendOutcome::Reply(segments) = session.send("Thoughts?").await else {
            panic!("expected a reply");
        };
        assert_eq!(segments[1].text, "Not JSON at all");
        assert_eq!(session.insights().count(), 0);
    }

    #[tokio::test]
    async fn test_response_field_fallback() {
        let response = AnalyzeResponse {
            success: true,
            response: Some("Legacy answer".to_string()),
            ..AnalyzeResponse::default()
        };
        let mut session = connected(Ok(response)).await;

        let SendOutcome::Reply(segments) = session.send("Hi").await else {
            panic!("expected a reply");
        };
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Legacy answer");
    }

    #[tokio::test]
    async fn test_unsuccessful_response_is_error() {
        let response = AnalyzeResponse {
            success: false,
            ..AnalyzeResponse::default()
        };
        let mut session = connected(Ok(response)).await;

        assert_eq!(
            session.send("Hi").await,
            SendOutcome::Failed("Analysis failed".to_string())
        );
        let last = session.messages().last().unwrap();
        assert!(last.is_error);
        assert_eq!(
            last.text,
            "I encountered an error: Analysis failed. Please try again."
        );
        assert_eq!(session.error(), Some("Analysis failed"));
        assert!(!session.busy);
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let mut session = connected(Err(ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        }))
        .await;

        let outcome = session.send("Hi").await;
        assert_eq!(
            outcome,
            SendOutcome::Failed("Analysis Error: 502 - bad gateway".to_string())
        );
    }

    #[tokio::test]
    async fn test_disconnected_backend_rejects() {
        let mut session = ChatSession::new(MockBackend::new(false, Ok(AnalyzeResponse::default())));
        assert_eq!(session.check_backend().await, BackendStatus::Disconnected);

        assert_eq!(session.send("Hi").await, SendOutcome::Rejected);
        assert_eq!(session.error(), Some("Backend is not connected."));
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_query_ignored() {
        let mut session = connected(Ok(AnalyzeResponse::default())).await;
        assert_eq!(session.send("   ").await, SendOutcome::Ignored);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_insights_keep_last_five() {
        let mut session = ChatSession::new(MockBackend::new(true, Ok(AnalyzeResponse::default())));
        for i in 0..7 {
            session.record_insight(InsightKind::Strategy, format!("insight {}", i));
        }

        let texts: Vec<_> = session.insights().map(|i| i.text.as_str()).collect();
        assert_eq!(texts.len(), MAX_INSIGHTS);
        assert_eq!(texts[0], "insight 2");
        assert_eq!(texts[4], "insight 6");
    }

    #[test]
    fn test_insight_kind_mapping() {
        assert_eq!(InsightKind::from_type("recommendation"), InsightKind::Strategy);
        assert_eq!(InsightKind::from_type("plan"), InsightKind::Strategy);
        assert_eq!(InsightKind::from_type("trend"), InsightKind::Opportunity);
        assert_eq!(InsightKind::from_type("Growth"), InsightKind::Opportunity);
        assert_eq!(InsightKind::from_type("risk"), InsightKind::Strategy);
    }

    #[test]
    fn test_reset_and_duration() {
        let mut session = ChatSession::new(MockBackend::new(true, Ok(AnalyzeResponse::default())));
        session.record_insight(InsightKind::Strategy, "x".to_string());
        session.reset();

        assert_eq!(session.insights().count(), 0);
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.duration(), "0m 0s");
        assert_eq!(format_duration(125), "2m 5s");
    }
}
