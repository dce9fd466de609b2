//! Employee directory client against a mock directory service

use charge_handover::directory::{EmployeeDirectory, HttpDirectory};
use charge_handover::error::AppError;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_lookup_found() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/employees/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "employee_id": "EMP-042",
            "first_name": "Meera",
            "last_name": "Nair",
            "designation": "Assistant Professor",
            "department": "CS"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let directory = HttpDirectory::new(format!("{}/", mock_server.uri()));
    let employee = directory.lookup(id).await.unwrap().unwrap();

    assert_eq!(employee.id, id);
    assert_eq!(employee.employee_id, "EMP-042");
    assert_eq!(employee.full_name(), "Meera Nair");
    assert_eq!(employee.department.as_deref(), Some("CS"));
}

#[tokio::test]
async fn test_lookup_missing_is_none() {
    let mock_server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/employees/{}", id)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let directory = HttpDirectory::new(mock_server.uri());
    assert!(directory.lookup(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lookup_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("directory down"))
        .mount(&mock_server)
        .await;

    let directory = HttpDirectory::new(mock_server.uri());
    let err = directory.lookup(Uuid::new_v4()).await.unwrap_err();

    match err {
        AppError::Directory(message) => assert!(message.contains("directory down")),
        other => panic!("expected directory error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_directory() {
    // Nothing listens on the discard port
    let directory = HttpDirectory::new("http://127.0.0.1:9");
    let err = directory.lookup(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Directory(_)));
}
