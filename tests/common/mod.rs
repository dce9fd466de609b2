//! Shared setup for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use charge_handover::directory::{Employee, StaticDirectory};
use charge_handover::handover::ReceiverMatch;
use charge_handover::identity::{Authenticator, Identity, Role};
use charge_handover::{router, store, AppState};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

pub struct People {
    pub sender: Identity,
    pub receiver: Identity,
    pub hod: Identity,
    pub other_hod: Identity,
    pub principal: Identity,
}

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub people: People,
}

fn person(role: Role, department: &str, first: &str, last: &str) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        employee_id: format!("EMP-{}", first.to_uppercase()),
        role,
        department: department.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
    }
}

fn as_employee(identity: &Identity) -> Employee {
    Employee {
        id: identity.id,
        employee_id: identity.employee_id.clone(),
        first_name: identity.first_name.clone(),
        last_name: identity.last_name.clone(),
        designation: Some("Assistant Professor".to_string()),
        department: Some(identity.department.clone()),
    }
}

pub async fn setup_app() -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    store::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let people = People {
        sender: person(Role::Teaching, "CS", "Ravi", "Kumar"),
        receiver: person(Role::Teaching, "CS", "Meera", "Nair"),
        hod: person(Role::Hod, "CS", "Arun", "Iyer"),
        other_hod: person(Role::Hod, "EE", "Leela", "Das"),
        principal: person(Role::Principal, "CS", "Sunita", "Menon"),
    };

    let directory = StaticDirectory::new(
        [
            &people.sender,
            &people.receiver,
            &people.hod,
            &people.other_hod,
            &people.principal,
        ]
        .into_iter()
        .map(as_employee),
    );

    let state = AppState::new(
        pool,
        Arc::new(directory),
        Authenticator::new("integration-secret", chrono::Duration::hours(1)),
        ReceiverMatch::Strict,
    );

    TestApp {
        app: router(state.clone()),
        state,
        people,
    }
}

impl TestApp {
    pub fn token(&self, identity: &Identity) -> String {
        self.state.auth.issue(identity).expect("Failed to issue token")
    }

    /// Send a request and return the status and the JSON body (Null if none)
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        as_who: Option<&Identity>,
        body: Option<Value>,
    ) -> (hyper::StatusCode, Value) {
        let mut builder = hyper::Request::builder().method(method).uri(uri);
        if let Some(identity) = as_who {
            builder = builder.header("authorization", format!("Bearer {}", self.token(identity)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}

pub fn create_body(receiver: &Identity) -> Value {
    serde_json::json!({
        "receiver_id": receiver.id,
        "receiver_designation": "Assistant Professor",
        "receiver_department": receiver.department,
        "reason": "Attending a faculty development programme",
        "handover_start_date": "2025-01-05",
        "handover_end_date": "2025-01-10",
        "documents": ["Course file", "Attendance register"],
        "assets": ["Lab 3 keys"],
        "pending_tasks": ["Set internal assessment paper"],
        "remarks": "Reachable by phone"
    })
}
