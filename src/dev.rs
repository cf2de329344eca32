pub(crate) fn make_test_credentials(access_key_id: &str) -> crate::client::Credentials {
    use chrono::TimeZone as _;
    crate::client::Credentials {
        access_key_id: access_key_id.to_string(),
        secret_access_key: crate::client::SensitiveString::new(format!("{access_key_id}-secret")),
        session_token: crate::client::SensitiveString::new(format!("{access_key_id}-token")),
        expiration: chrono::Utc.with_ymd_and_hms(2022, 10, 1, 12, 0, 0).unwrap(),
    }
}

pub(crate) fn make_test_response(access_key_id: &str) -> crate::client::AssumeRoleResponse {
    crate::client::AssumeRoleResponse {
        assumed_role_user: crate::client::AssumedRoleUser {
            arn: format!("arn:aws:sts::111111111111:assumed-role/Test/{access_key_id}"),
            assumed_role_id: format!("AROATEST:{access_key_id}"),
        },
        credentials: make_test_credentials(access_key_id),
        packed_policy_size: None,
        source_identity: None,
        request_id: None,
    }
}

pub(crate) fn make_test_identity() -> crate::identity::AmbientIdentity {
    crate::identity::AmbientIdentity::new(
        "AKIDAMBIENT",
        "ambient-secret",
        Some("ambient-token".to_string()),
    )
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    /// Access key of the identity the call was made with
    pub access_key_id: String,
    pub request: crate::client::AssumeRoleRequest,
}

/// AssumeRoleProvider returning scripted responses in order
pub(crate) struct MockProvider {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<crate::client::AssumeRoleResponse, crate::error::Error>>>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
    on_call: Option<Box<dyn Fn(usize) + Send + Sync>>,
}

impl MockProvider {
    pub fn new(
        responses: Vec<Result<crate::client::AssumeRoleResponse, crate::error::Error>>,
    ) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::Mutex::new(Vec::new()),
            on_call: None,
        }
    }

    /// Run `f` with the 0-based call index whenever a call is recorded
    pub fn on_call<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_call = Some(Box::new(f));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::client::AssumeRoleProvider for MockProvider {
    async fn assume_role(
        &self,
        identity: &crate::identity::AmbientIdentity,
        request: &crate::client::AssumeRoleRequest,
    ) -> Result<crate::client::AssumeRoleResponse, crate::error::Error> {
        let idx = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                access_key_id: identity.access_key_id.clone(),
                request: request.clone(),
            });
            calls.len() - 1
        };
        if let Some(ref f) = self.on_call {
            f(idx);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(crate::error::Error::ApiError {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    code: "InternalFailure".to_string(),
                    message: "no more mock responses".to_string(),
                    request_id: None,
                })
            })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeStsRequest {
    pub headers: axum::http::HeaderMap,
    pub form: Vec<(String, String)>,
}

impl FakeStsRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn form(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct FakeStsState {
    responses: std::sync::Mutex<std::collections::VecDeque<(u16, String)>>,
    requests: std::sync::Mutex<Vec<FakeStsRequest>>,
}

/// In-process STS endpoint answering each request with the next scripted (status, body)
pub(crate) struct FakeSts {
    addr: std::net::SocketAddr,
    state: std::sync::Arc<FakeStsState>,
}

impl FakeSts {
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let state = std::sync::Arc::new(FakeStsState {
            responses: std::sync::Mutex::new(responses.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        });
        let app = axum::Router::new()
            .route("/", axum::routing::post(fake_sts_handler))
            .with_state(state.clone());

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn requests(&self) -> Vec<FakeStsRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn fake_sts_handler(
    axum::extract::State(state): axum::extract::State<std::sync::Arc<FakeStsState>>,
    headers: axum::http::HeaderMap,
    body: String,
) -> (axum::http::StatusCode, String) {
    let form = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    state
        .requests
        .lock()
        .unwrap()
        .push(FakeStsRequest { headers, form });

    let (status, body) = state
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no more responses".to_string()));
    (axum::http::StatusCode::from_u16(status).unwrap(), body)
}
