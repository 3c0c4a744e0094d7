//! Minimal REST client helpers for consumers (scripts, tests, other frontends).
//! Feature-gated by `rest-client` to keep reqwest out of the server binary.

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

impl RestError {
    /// HTTP status of a non-success response, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        // Bound request duration
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(url: String) -> Result<T, RestError> {
    let res = mk_client()
        .get(url)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn list_habits(base: &str) -> Result<Vec<HabitDto>, RestError> {
    get_json(ep::habits(base)).await
}

pub async fn create_habit(base: &str, req: &HabitReq) -> Result<HabitDto, RestError> {
    let res = mk_client()
        .post(ep::habits(base))
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn update_habit(base: &str, habit_id: i32, req: &HabitReq) -> Result<HabitDto, RestError> {
    let res = mk_client()
        .put(ep::habit(base, habit_id))
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn delete_habit(base: &str, habit_id: i32) -> Result<OkResp, RestError> {
    let res = mk_client()
        .delete(ep::habit(base, habit_id))
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn check_in(base: &str, req: &CheckInReq) -> Result<CheckInDto, RestError> {
    let res = mk_client()
        .post(ep::checkin(base))
        .json(req)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn monthly_progress(base: &str) -> Result<Vec<DailySnapshotDto>, RestError> {
    get_json(ep::monthly_progress(base)).await
}

pub async fn top_habits(base: &str) -> Result<Vec<TopHabitDto>, RestError> {
    get_json(ep::top_habits(base)).await
}

pub async fn completion_ratio(base: &str) -> Result<CompletionRatioDto, RestError> {
    get_json(ep::completion_ratio(base)).await
}

pub async fn streaks(base: &str) -> Result<Vec<StreakDto>, RestError> {
    get_json(ep::streaks(base)).await
}
