use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    error::AppError,
    events::ServerEvent,
    models::{RequestRow, ISSUE_TYPES, ROLE_CUSTOMER, VEHICLE_TYPES},
    session, AppResult,
};

use super::store;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateRequest {
    vehicle_type: String,
    issue_type: String,
    issue_description: Option<String>,
    vehicle_number: Option<String>,
    location: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl CreateRequest {
    /// Validation happens before any write: vehicle type, issue type and
    /// location are mandatory, coordinates never are (geolocation degrades
    /// to manual entry client-side).
    fn validate(&self) -> AppResult<store::NewRequest> {
        let vehicle_type = self.vehicle_type.trim().to_lowercase();
        if vehicle_type.is_empty() {
            return Err(AppError::Validation("vehicle_type is required".into()));
        }
        if !VEHICLE_TYPES.contains(&vehicle_type.as_str()) {
            return Err(AppError::Validation(format!(
                "vehicle_type must be one of {}",
                VEHICLE_TYPES.join(", ")
            )));
        }

        let issue_type = self.issue_type.trim().to_lowercase();
        if issue_type.is_empty() {
            return Err(AppError::Validation("issue_type is required".into()));
        }
        if !ISSUE_TYPES.contains(&issue_type.as_str()) {
            return Err(AppError::Validation(format!(
                "issue_type must be one of {}",
                ISSUE_TYPES.join(", ")
            )));
        }

        let location = self.location.trim();
        if location.is_empty() {
            return Err(AppError::Validation("location is required".into()));
        }

        Ok(store::NewRequest {
            vehicle_type,
            issue_type,
            issue_description: self
                .issue_description
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            vehicle_number: self
                .vehicle_number
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            location: location.to_owned(),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(events): State<broadcast::Sender<ServerEvent>>,
    session: Session,
    Json(input): Json<CreateRequest>,
) -> AppResult<(StatusCode, Json<RequestRow>)> {
    let user = session::require_role(&session, ROLE_CUSTOMER).await?;
    let new_request = input.validate()?;

    let row = store::create_request(&db_pool, &user.id, new_request).await?;
    tracing::info!(request_id = %row.id, customer_id = %user.id, "request created");

    let _ = events.send(ServerEvent::RequestCreated {
        request_id: row.id.clone(),
        customer_id: user.id,
    });

    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CreateRequest {
        CreateRequest {
            vehicle_type: "car".into(),
            issue_type: "battery".into(),
            issue_description: None,
            vehicle_number: None,
            location: "22.75, 86.31".into(),
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn accepts_a_valid_submission() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_missing_mandatory_fields() {
        for patch in [
            |r: &mut CreateRequest| r.vehicle_type.clear(),
            |r: &mut CreateRequest| r.issue_type.clear(),
            |r: &mut CreateRequest| r.location = "   ".into(),
        ] {
            let mut request = valid();
            patch(&mut request);
            assert!(matches!(
                request.validate().unwrap_err(),
                AppError::Validation(_)
            ));
        }
    }

    #[test]
    fn rejects_unknown_vocabularies() {
        let mut request = valid();
        request.vehicle_type = "spaceship".into();
        assert!(request.validate().is_err());

        let mut request = valid();
        request.issue_type = "haunted".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn blank_optionals_collapse_to_none() {
        let mut request = valid();
        request.issue_description = Some("  ".into());
        request.vehicle_number = Some("".into());
        let parsed = request.validate().unwrap();
        assert_eq!(parsed.issue_description, None);
        assert_eq!(parsed.vehicle_number, None);
    }
}
