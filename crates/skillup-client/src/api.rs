//! HTTP client for the skillup backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::instrument;

use skillup_core::model::{CreateTestRequest, TestResultSubmission};
use skillup_core::store::{test_from_payload, Test};
use skillup_core::traits::{ResultSubmitter, StreamEvent, TestSource};

use crate::config::SkillupConfig;
use crate::error::ClientError;
use crate::resources::{
    DeleteResponse, Position, Section, SyncRequest, UserProfile, UserUpdate,
};
use crate::stream::StreamDecoder;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the skillup REST and streaming endpoints.
///
/// The underlying client only bounds connection setup; REST calls get a
/// per-request timeout so that test streams can stay open as long as the
/// generator needs.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    auth_token: Option<String>,
    uid: Option<String>,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Builder(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth_token: None,
            uid: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    pub fn from_config(config: &SkillupConfig) -> Result<Self, ClientError> {
        let mut client = Self::new(&config.api_base_url)?.with_timeout(config.request_timeout_secs);
        client.auth_token = config.auth_token.clone();
        client.uid = config.uid.clone();
        Ok(client)
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// User that results are submitted for.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self
            .authorize(request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(error_from_body(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    // User endpoints

    #[instrument(skip(self, email))]
    pub async fn sync_user(&self, uid: &str, email: Option<&str>) -> Result<UserProfile, ClientError> {
        let body = SyncRequest { uid, email };
        self.send(self.client.post(self.url("/users/sync")).json(&body))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, uid: &str) -> Result<UserProfile, ClientError> {
        self.send(self.client.get(self.url(&format!("/users/{uid}"))))
            .await
    }

    #[instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        uid: &str,
        update: &UserUpdate,
    ) -> Result<UserProfile, ClientError> {
        self.send(self.client.put(self.url(&format!("/users/{uid}"))).json(update))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, uid: &str) -> Result<DeleteResponse, ClientError> {
        self.send(self.client.delete(self.url(&format!("/users/{uid}"))))
            .await
    }

    // Catalogue endpoints

    #[instrument(skip(self))]
    pub async fn positions(&self) -> Result<Vec<Position>, ClientError> {
        let body: Value = self.send(self.client.get(self.url("/positions"))).await?;
        unwrap_list(body, "positions")
    }

    #[instrument(skip(self))]
    pub async fn sections(
        &self,
        subposition: &str,
        uid: Option<&str>,
    ) -> Result<Vec<Section>, ClientError> {
        let mut request = self.client.get(self.url(&format!("/sections/{subposition}")));
        if let Some(uid) = uid {
            request = request.query(&[("uid", uid)]);
        }
        let body: Value = self.send(request).await?;
        unwrap_list(body, "sections")
    }

    // Tests

    /// Record a finished test; the backend answers with the updated profile.
    #[instrument(skip(self, result), fields(section = %result.section_id))]
    pub async fn submit_test(
        &self,
        uid: &str,
        result: &TestResultSubmission,
    ) -> Result<UserProfile, ClientError> {
        self.send(
            self.client
                .post(self.url(&format!("/users/{uid}/submit-test")))
                .json(result),
        )
        .await
    }

    /// Generate a whole test in one response.
    #[instrument(skip(self, request), fields(test = %request.meta.key()))]
    pub async fn create_test(&self, request: &CreateTestRequest) -> Result<Test, ClientError> {
        let body: Value = self
            .send(self.client.post(self.url("/ai/create-test")).json(request))
            .await?;
        Ok(test_from_payload(request.meta.clone(), body))
    }

    /// Stream a generated test into `events`.
    ///
    /// Resolves once a `complete` envelope arrives or the body ends
    /// cleanly. An error envelope is forwarded and then returned as
    /// [`ClientError::Stream`]. A dropped receiver ends the stream quietly.
    #[instrument(skip(self, request, events), fields(test = %request.meta.key()))]
    pub async fn stream_test_events(
        &self,
        request: &CreateTestRequest,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<(), ClientError> {
        let url = self.url("/ai/create-test-stream");
        tracing::info!("starting test stream request to {url}");

        let mut response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, CONNECT_TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("test stream rejected with status {status}");
            return Err(ClientError::status(status.as_u16()));
        }

        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?
        {
            if forward(events, decoder.push(&chunk)).await? == Flow::Done {
                return Ok(());
            }
        }

        let mut rest = decoder.finish();
        if !decoder.is_finished() {
            tracing::info!("test stream ended without a complete envelope");
            rest.push(StreamEvent::Complete);
        }
        forward(events, rest).await?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

async fn forward(
    events: &mpsc::Sender<StreamEvent>,
    batch: Vec<StreamEvent>,
) -> Result<Flow, ClientError> {
    for event in batch {
        let failure = match &event {
            StreamEvent::Error(message) => Some(message.clone()),
            _ => None,
        };
        let terminal = matches!(event, StreamEvent::Complete | StreamEvent::Error(_));

        if events.send(event).await.is_err() {
            tracing::debug!("stream receiver dropped");
            return Ok(Flow::Done);
        }
        if let Some(message) = failure {
            tracing::error!("test stream error: {message}");
            return Err(ClientError::Stream(message));
        }
        if terminal {
            tracing::info!("test stream complete");
            return Ok(Flow::Done);
        }
    }
    Ok(Flow::Continue)
}

fn error_from_body(status: u16, body: &Value) -> ClientError {
    let message = ["message", "error"]
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|m| !m.is_empty());

    match message {
        Some(message) => ClientError::Api {
            status,
            message: message.to_string(),
        },
        None => ClientError::status(status),
    }
}

/// Accept either a bare array or `{ <key>: [...] }`.
fn unwrap_list<T: DeserializeOwned>(body: Value, key: &str) -> Result<Vec<T>, ClientError> {
    let items = match body {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(items).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl TestSource for ApiClient {
    fn name(&self) -> &str {
        "skillup-api"
    }

    async fn stream_test(
        &self,
        request: &CreateTestRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> anyhow::Result<()> {
        Ok(self.stream_test_events(request, &events).await?)
    }
}

#[async_trait]
impl ResultSubmitter for ApiClient {
    async fn submit_result(&self, result: &TestResultSubmission) -> anyhow::Result<()> {
        let uid = self.uid.as_deref().ok_or(ClientError::MissingUid)?;
        self.submit_test(uid, result).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use skillup_core::model::TestMeta;

    fn request() -> CreateTestRequest {
        CreateTestRequest {
            meta: TestMeta {
                test_number: 2,
                section: "sec-1".into(),
                position: "developer".into(),
                subposition: "rust".into(),
                level: "middle".into(),
            },
            language: Some("en".into()),
        }
    }

    async fn collect(client: &ApiClient) -> (Result<(), ClientError>, Vec<StreamEvent>) {
        let (tx, mut rx) = mpsc::channel(32);
        let result = client.stream_test_events(&request(), &tx).await;
        drop(tx);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    #[tokio::test]
    async fn streams_questions_until_complete() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"type\":\"question\",\"data\":{\"id\":\"2\",\"question\":\"b\"}}\n",
            "data: {\"type\":\"question\",\"data\":{\"id\":\"1\",\"question\":\"a\"}}\n",
            "data: {\"type\":\"initial_ready\"}\n",
            "data: {\"type\":\"complete\"}\n",
            "data: {\"type\":\"question\",\"data\":{\"id\":\"3\"}}\n",
        );

        Mock::given(method("POST"))
            .and(path("/ai/create-test-stream"))
            .and(body_json(json!({
                "testNumber": 2,
                "section": "sec-1",
                "position": "developer",
                "subposition": "rust",
                "level": "middle",
                "language": "en"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let (result, events) = collect(&client).await;
        result.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[2], StreamEvent::InitialReady);
        assert_eq!(events[3], StreamEvent::Complete);
    }

    #[tokio::test]
    async fn clean_end_without_complete_still_completes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/create-test-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "data: {\"type\":\"question\",\"data\":{\"id\":\"1\"}}",
            ))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let (result, events) = collect(&client).await;
        result.unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::Question(json!({"id": "1"})),
                StreamEvent::Complete
            ]
        );
    }

    #[tokio::test]
    async fn error_envelope_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/create-test-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "data: {\"type\":\"error\",\"message\":\"model overloaded\"}\n",
            ))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let (result, events) = collect(&client).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::Stream(ref m) if m == "model overloaded"));
        assert_eq!(events, vec![StreamEvent::Error("model overloaded".into())]);
    }

    #[tokio::test]
    async fn stream_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/create-test-stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let (result, events) = collect(&client).await;
        assert_eq!(result.unwrap_err().to_string(), "HTTP error! status: 500");
        assert!(events.is_empty());
    }

    /// Serve one chunked response that is cut off after `first_chunk`.
    async fn truncated_stream_server(first_chunk: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the request so closing the socket is not a reset.
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_ascii_lowercase();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let body_len = text[..head_end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + body_len {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
            let chunk = format!("{:x}\r\n{first_chunk}\r\n", first_chunk.len());
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(chunk.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            // Dropping the socket here leaves the body unterminated.
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn connection_lost_mid_stream_is_a_network_error() {
        let base = truncated_stream_server(
            "data: {\"type\":\"question\",\"data\":{\"id\":\"1\",\"question\":\"a\"}}\n",
        )
        .await;

        let client = ApiClient::new(&base).unwrap();
        let (result, events) = collect(&client).await;
        assert!(matches!(result, Err(ClientError::Network(_))), "{result:?}");
        assert_eq!(
            events,
            vec![StreamEvent::Question(json!({"id": "1", "question": "a"}))]
        );
    }

    #[tokio::test]
    async fn error_envelope_with_structured_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/create-test-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
                "data: {\"type\":\"question\",\"data\":{\"id\":\"1\",\"question\":\"a\"}}\n",
                "data: {\"type\":\"error\",\"message\":{\"text\":\"rate limited\"}}\n",
                "data: {\"type\":\"question\",\"data\":{\"id\":\"2\",\"question\":\"b\"}}\n",
            )))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let (result, events) = collect(&client).await;
        assert!(matches!(result, Err(ClientError::Stream(ref m)) if m == "rate limited"));
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], StreamEvent::Error("rate limited".into()));
    }

    #[tokio::test]
    async fn sections_query_is_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sections/rust"))
            .and(query_param("uid", "a&b c"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sections/rust"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let sections = client.sections("rust", Some("a&b c")).await.unwrap();
        assert!(sections.is_empty());
    }

    #[tokio::test]
    async fn get_user_sends_token_and_reports_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u1"))
            .and(header("Authorization", "Bearer t0k3n"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uid": "u1", "email": "u1@example.com", "level": "junior"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "User not found"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap().with_token("t0k3n");
        let profile = client.get_user("u1").await.unwrap();
        assert_eq!(profile.level.as_deref(), Some("junior"));

        let err = client.get_user("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn list_endpoints_accept_both_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": "p1", "name": "Developer", "subpositions": [{"id": "rust", "name": "Rust"}]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sections/rust"))
            .and(query_param("uid", "u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sections": [{"_id": "s1", "title": "Ownership", "order": 1, "progress": 4}]
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let positions = client.positions().await.unwrap();
        assert_eq!(positions[0].subpositions[0].name, "Rust");

        let sections = client.sections("rust", Some("u1")).await.unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].next_test_number(), 5);
    }

    #[tokio::test]
    async fn submitter_requires_uid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/u1/submit-test"))
            .and(body_json(json!({
                "sectionId": "sec-1",
                "correctAnswers": 7,
                "totalQuestions": 10,
                "position": "developer",
                "subposition": "rust",
                "level": "middle",
                "testNumber": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uid": "u1"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = TestResultSubmission::new(&request().meta, 7, 10);

        let anonymous = ApiClient::new(&server.uri()).unwrap();
        let err = anonymous.submit_result(&result).await.unwrap_err();
        assert!(err.to_string().contains("no user id"));

        let client = ApiClient::new(&server.uri()).unwrap().with_uid("u1");
        client.submit_result(&result).await.unwrap();
    }

    #[tokio::test]
    async fn create_test_unwraps_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ai/create-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "test": {
                    "questions": [
                        {"id": "2", "question": "second", "options": ["a", "b"], "correctAnswer": "B"},
                        {"id": "1", "question": "first", "options": ["a", "b", "c", "d"], "correctAnswer": 2}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri()).unwrap();
        let test = client.create_test(&request()).await.unwrap();
        assert_eq!(test.meta.section, "sec-1");
        assert_eq!(test.questions.ids(), vec!["1", "2"]);
    }

    #[test]
    fn body_message_precedence() {
        let err = error_from_body(400, &json!({"message": "bad", "error": "worse"}));
        assert_eq!(err.to_string(), "bad");
        let err = error_from_body(400, &json!({"message": "", "error": "worse"}));
        assert_eq!(err.to_string(), "worse");
        let err = error_from_body(502, &Value::Null);
        assert_eq!(err.to_string(), "HTTP error! status: 502");
    }
}
