use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskpush::config::{ReliabilityConfig, TasksConfig};
use taskpush::tasks::TaskFetcher;

use super::harness::task_json;

fn fetcher(server: &MockServer, max_pages: u32) -> TaskFetcher {
    let tasks = TasksConfig {
        api_base_url: server.uri(),
        max_pages,
        request_timeout_secs: 5,
        ..TasksConfig::default()
    };
    let reliability = ReliabilityConfig {
        fetch_retries: 2,
        fetch_backoff_ms: 10,
    };
    TaskFetcher::new(&tasks, &reliability).unwrap()
}

fn token() -> SecretString {
    SecretString::from("api-token")
}

async fn mount_projects(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(bearer_token("api-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "p1", "name": "Home"},
            {"id": "p2", "name": "Work"}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn follows_cursor_and_resolves_projects() {
    let server = MockServer::start().await;
    mount_projects(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .and(query_param("query", "today | overdue"))
        .and(query_param_is_missing("cursor"))
        .and(bearer_token("api-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                task_json("1", "Water plants", Some("2026-03-10"), 1, "p1"),
                task_json("2", "Ship release", Some("2026-03-09"), 4, "p2")
            ],
            "next_cursor": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [task_json("3", "Orphan", None, 2, "gone")],
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap();

    let ids: Vec<_> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(tasks[0].project_name.as_deref(), Some("Home"));
    assert_eq!(tasks[1].project_name.as_deref(), Some("Work"));
    assert!(tasks[2].project_name.is_none());
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Unauthorized"));
}

#[tokio::test]
async fn client_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad filter"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [task_json("1", "Recovered", None, 1, "p1")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].content, "Recovered");
}

#[tokio::test]
async fn persistent_server_error_gives_up() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn page_cap_bounds_requests() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [task_json("x", "Again", None, 1, "p1")],
            "next_cursor": "forever"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tasks = fetcher(&server, 2).fetch_tasks(&token()).await.unwrap();
    assert_eq!(tasks.len(), 2);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/filter"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server, 50).fetch_tasks(&token()).await.unwrap_err();
    assert!(err.status().is_none());
    assert!(!err.is_transient());
}
