// tests/api_tests.rs
//
// End-to-end tests against the full HTTP surface, run hermetically: the
// in-memory metadata store replaces Postgres, a stub provider replaces the
// AI backend, and blobs/cache live in a tempdir.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use learnanything_backend::ai::{AiError, AiProvider, GenerateQuizParams, GeneratedQuiz};
use learnanything_backend::cache::ArtifactCache;
use learnanything_backend::config::{AiConfig, Config, ProviderKind};
use learnanything_backend::models::quiz::QuizQuestion;
use learnanything_backend::routes;
use learnanything_backend::state::AppState;
use learnanything_backend::storage::FsObjectStore;
use learnanything_backend::store::MemoryMetadataStore;

const PDF_BYTES: &[u8] = b"%PDF-1.4\nfake test document\n%%EOF";

/// Scriptable AI stub: either returns a quiz whose correct answers are
/// prescribed, or fails deterministically. An optional gate blocks the
/// call until released, to exercise the concurrent-generate guard.
struct StubProvider {
    fail: bool,
    correct_answers: Vec<usize>,
    gate: Option<Arc<Notify>>,
}

impl StubProvider {
    fn succeeding(correct_answers: Vec<usize>) -> Self {
        Self {
            fail: false,
            correct_answers,
            gate: None,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            correct_answers: Vec::new(),
            gate: None,
        }
    }

    fn gated(correct_answers: Vec<usize>, gate: Arc<Notify>) -> Self {
        Self {
            fail: false,
            correct_answers,
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl AiProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate_quiz(&self, _params: GenerateQuizParams) -> Result<GeneratedQuiz, AiError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(AiError::EmptyResponse { provider: "stub" });
        }
        let questions = self
            .correct_answers
            .iter()
            .enumerate()
            .map(|(i, &correct)| QuizQuestion {
                question: format!("Q{}", i + 1),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: correct,
                explanation: "E".to_string(),
            })
            .collect();
        Ok(GeneratedQuiz {
            title: "T".to_string(),
            questions,
        })
    }
}

struct TestApp {
    address: String,
    cache: ArtifactCache,
    storage_root: PathBuf,
    _tmp: tempfile::TempDir,
}

/// Spawns the app on a random port with hermetic collaborators.
async fn spawn_app(ai: Arc<dyn AiProvider>) -> TestApp {
    let tmp = tempfile::tempdir().expect("Failed to create tempdir");
    let storage_root = tmp.path().join("storage");
    let cache_dir = tmp.path().join("pdf-cache");

    let config = Config {
        database_url: "postgres://unused-in-tests".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        ai: AiConfig {
            provider: ProviderKind::OpenRouter,
            api_key: None,
            model: None,
        },
        storage_root: storage_root.clone(),
        cache_dir: cache_dir.clone(),
        max_upload_bytes: 1024 * 1024,
    };

    let cache = ArtifactCache::new(cache_dir);
    let state = AppState {
        db: Arc::new(MemoryMetadataStore::new()),
        objects: Arc::new(FsObjectStore::new(storage_root.clone())),
        cache: cache.clone(),
        ai,
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        cache,
        storage_root,
        _tmp: tmp,
    }
}

/// Registers a fresh user and logs in. Returns (token, user_id).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let register = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register.status().as_u16(), 201);
    let user: serde_json::Value = register.json().await.expect("Register body");
    let user_id = user["id"].as_str().expect("user id").to_string();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Login body");
    let token = login["token"].as_str().expect("token").to_string();

    (token, user_id)
}

/// Uploads the test PDF and returns the created document JSON.
async fn upload_pdf(client: &reqwest::Client, address: &str, token: &str) -> serde_json::Value {
    let part = reqwest::multipart::Part::bytes(PDF_BYTES.to_vec())
        .file_name("biology-notes.pdf")
        .mime_str("application/pdf")
        .expect("mime");
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(format!("{}/api/documents", address))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .expect("Upload failed");
    assert_eq!(response.status().as_u16(), 201);

    response.json().await.expect("Upload body")
}

async fn fetch_document(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    id: &str,
) -> serde_json::Value {
    client
        .get(format!("{}/api/documents/{}", address, id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Get document failed")
        .json()
        .await
        .expect("Document body")
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();
    let body = serde_json::json!({
        "username": format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]),
        "password": "password123"
    });

    let first = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&body)
        .send()
        .await
        .expect("Register failed");
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&body)
        .send()
        .await
        .expect("Register failed");
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/documents", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn upload_then_generate_produces_a_ready_document() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![1]))).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    assert_eq!(document["status"], "uploaded");
    assert_eq!(document["title"], "biology-notes");
    let doc_id = document["id"].as_str().expect("doc id");

    let response = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 201);

    let quiz: serde_json::Value = response.json().await.expect("Quiz body");
    assert_eq!(quiz["title"], "T");
    assert_eq!(quiz["questions"].as_array().expect("questions").len(), 1);
    assert_eq!(quiz["questions"][0]["correctAnswer"], 1);
    assert_eq!(quiz["difficulty"], "medium");

    let document = fetch_document(&client, &app.address, &token, doc_id).await;
    assert_eq!(document["status"], "ready");

    let quizzes: serde_json::Value = client
        .get(format!("{}/api/documents/{}/quizzes", app.address, doc_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("List quizzes failed")
        .json()
        .await
        .expect("Quizzes body");
    assert_eq!(quizzes.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn generate_without_cache_entry_is_a_cache_miss() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id");
    app.cache
        .evict(doc_id.parse().expect("uuid"))
        .await;

    let response = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 422);

    let body: serde_json::Value = response.json().await.expect("Error body");
    assert_eq!(body["kind"], "cache_miss");
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("re-upload")
    );

    // The claim happens before the cache read, so the document lands in
    // `error` with the actionable message, not back in `uploaded`.
    let document = fetch_document(&client, &app.address, &token, doc_id).await;
    assert_eq!(document["status"], "error");
    assert!(
        document["error_message"]
            .as_str()
            .expect("error message")
            .contains("re-upload")
    );
}

#[tokio::test]
async fn failed_generation_marks_error_and_is_repeatable() {
    let app = spawn_app(Arc::new(StubProvider::failing())).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id");

    // Run the pipeline twice; both runs must fail cleanly and the status
    // must settle in `error` each time, never sticking at `processing`.
    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
            .bearer_auth(&token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .expect("Generate failed");
        assert_eq!(response.status().as_u16(), 502);

        let body: serde_json::Value = response.json().await.expect("Error body");
        assert_eq!(body["kind"], "generation_failed");

        let document = fetch_document(&client, &app.address, &token, doc_id).await;
        assert_eq!(document["status"], "error");
    }
}

#[tokio::test]
async fn completed_attempt_is_scored_and_recorded() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0, 1, 1, 3, 2]))).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id");

    let quiz: serde_json::Value = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Generate failed")
        .json()
        .await
        .expect("Quiz body");
    let quiz_id = quiz["id"].as_str().expect("quiz id");

    let response = client
        .post(format!("{}/api/quizzes/{}/attempts", app.address, quiz_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "answers": [0, 1, 2, 3, 0] }))
        .send()
        .await
        .expect("Submit attempt failed");
    assert_eq!(response.status().as_u16(), 201);

    let attempt: serde_json::Value = response.json().await.expect("Attempt body");
    assert_eq!(attempt["score"], 3);
    assert_eq!(attempt["total_questions"], 5);
    assert_eq!(attempt["answers"].as_array().expect("answers").len(), 5);

    let attempts: serde_json::Value = client
        .get(format!("{}/api/attempts", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("List attempts failed")
        .json()
        .await
        .expect("Attempts body");
    assert_eq!(attempts.as_array().expect("array").len(), 1);

    let me: serde_json::Value = client
        .get(format!("{}/api/profile/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Profile failed")
        .json()
        .await
        .expect("Profile body");
    assert_eq!(me["documents_count"], 1);
    assert_eq!(me["quizzes_completed"], 1);
}

#[tokio::test]
async fn attempt_with_wrong_answer_count_is_rejected() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0, 1]))).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id");
    let quiz: serde_json::Value = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Generate failed")
        .json()
        .await
        .expect("Quiz body");

    let response = client
        .post(format!(
            "{}/api/quizzes/{}/attempts",
            app.address,
            quiz["id"].as_str().expect("quiz id")
        ))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "answers": [0] }))
        .send()
        .await
        .expect("Submit attempt failed");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn deleting_a_document_removes_blob_row_and_cache_entry() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![2]))).await;
    let client = reqwest::Client::new();
    let (token, user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id").to_string();

    // Bring it to `ready` first so the cascade also covers quizzes.
    let response = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Generate failed");
    assert_eq!(response.status().as_u16(), 201);

    let blob_path = app
        .storage_root
        .join(format!("{}/{}.pdf", user_id, doc_id));
    assert!(blob_path.exists());

    let response = client
        .delete(format!("{}/api/documents/{}", app.address, doc_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Delete failed");
    assert_eq!(response.status().as_u16(), 204);

    let response = client
        .get(format!("{}/api/documents/{}", app.address, doc_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Get document failed");
    assert_eq!(response.status().as_u16(), 404);

    assert!(!blob_path.exists());
    let cache_result = app.cache.retrieve(doc_id.parse().expect("uuid")).await;
    assert!(cache_result.is_err());
}

#[tokio::test]
async fn concurrent_generate_is_rejected_while_processing() {
    let gate = Arc::new(Notify::new());
    let app = spawn_app(Arc::new(StubProvider::gated(vec![0], gate.clone()))).await;
    let client = reqwest::Client::new();
    let (token, _user_id) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token).await;
    let doc_id = document["id"].as_str().expect("doc id").to_string();

    let first = {
        let client = client.clone();
        let url = format!("{}/api/documents/{}/generate", app.address, doc_id);
        let token = token.clone();
        tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&serde_json::json!({}))
                .send()
                .await
                .expect("First generate failed")
        })
    };

    // Wait until the first run has claimed `processing`.
    let mut claimed = false;
    for _ in 0..100 {
        let document = fetch_document(&client, &app.address, &token, &doc_id).await;
        if document["status"] == "processing" {
            claimed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(claimed, "first generate never reached processing");

    let second = client
        .post(format!("{}/api/documents/{}/generate", app.address, doc_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Second generate failed");
    assert_eq!(second.status().as_u16(), 409);
    let body: serde_json::Value = second.json().await.expect("Error body");
    assert_eq!(body["kind"], "conflict");

    gate.notify_one();
    let first = first.await.expect("join");
    assert_eq!(first.status().as_u16(), 201);

    let document = fetch_document(&client, &app.address, &token, &doc_id).await;
    assert_eq!(document["status"], "ready");
}

#[tokio::test]
async fn documents_are_scoped_to_their_owner() {
    let app = spawn_app(Arc::new(StubProvider::succeeding(vec![0]))).await;
    let client = reqwest::Client::new();
    let (token_a, _user_a) = register_and_login(&client, &app.address).await;
    let (token_b, _user_b) = register_and_login(&client, &app.address).await;

    let document = upload_pdf(&client, &app.address, &token_a).await;
    let doc_id = document["id"].as_str().expect("doc id");

    let response = client
        .get(format!("{}/api/documents/{}", app.address, doc_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("Get document failed");
    assert_eq!(response.status().as_u16(), 404);

    let list: serde_json::Value = client
        .get(format!("{}/api/documents", app.address))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("List failed")
        .json()
        .await
        .expect("List body");
    assert_eq!(list.as_array().expect("array").len(), 0);
}
