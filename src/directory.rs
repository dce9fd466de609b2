//! Employee directory - resolves a chosen receiver to the details stored on a handover

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// An employee as the directory knows them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Lookup of employees by their user id
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// `Ok(None)` when no such employee exists
    async fn lookup(&self, id: Uuid) -> Result<Option<Employee>>;
}

/// Directory backed by the faculty service's REST API
pub struct HttpDirectory {
    client: Client,
    base_url: String,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl EmployeeDirectory for HttpDirectory {
    async fn lookup(&self, id: Uuid) -> Result<Option<Employee>> {
        let response = self
            .client
            .get(format!("{}/employees/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| AppError::Directory(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Directory(format!(
                "Failed to look up employee {}: {} - {}",
                id, status, text
            )));
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| AppError::Directory(e.to_string()))
    }
}

/// Fixed in-memory directory, for local runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    employees: HashMap<Uuid, Employee>,
}

impl StaticDirectory {
    pub fn new(employees: impl IntoIterator<Item = Employee>) -> Self {
        Self {
            employees: employees.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Load a JSON array of employees
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let employees: Vec<Employee> = serde_json::from_str(&raw)?;
        Ok(Self::new(employees))
    }

    pub fn len(&self) -> usize {
        self.employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}

#[async_trait]
impl EmployeeDirectory for StaticDirectory {
    async fn lookup(&self, id: Uuid) -> Result<Option<Employee>> {
        Ok(self.employees.get(&id).cloned())
    }
}
