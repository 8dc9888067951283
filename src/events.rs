use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{ROLE_ADMIN, ROLE_MECHANIC};

pub const CHANNEL_CAPACITY: usize = 64;

pub fn channel() -> broadcast::Sender<ServerEvent> {
    broadcast::channel(CHANNEL_CAPACITY).0
}

/// Thin change-notification record fanned out over the WebSocket channel.
/// Carries just enough for a dashboard to re-query the affected entity
/// rather than refetching whole tables.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerEvent {
    RequestCreated {
        request_id: String,
        customer_id: String,
    },
    RequestUpdated {
        request_id: String,
        status: String,
        customer_id: String,
        mechanic_id: Option<String>,
    },
    /// Emitted once per active assignment when a mechanic reports a
    /// position, so only the paired customer redraws a marker.
    LocationUpdated {
        request_id: String,
        customer_id: String,
        mechanic_id: String,
        latitude: f64,
        longitude: f64,
    },
    Notification {
        user_id: String,
        request_id: Option<String>,
    },
}

impl ServerEvent {
    /// Subscriber scoping: customers see their own requests and their own
    /// notifications, mechanics additionally see the open pending pool,
    /// admins see everything.
    ///
    /// Events carry no payload worth protecting, so an unverified mechanic
    /// may still receive `RequestCreated`. The re-query behind the event
    /// (`GET /api/requests/{id}`) enforces the verification gate.
    pub fn visible_to(&self, role: &str, user_id: &str) -> bool {
        if role == ROLE_ADMIN {
            return true;
        }
        match self {
            Self::RequestCreated { customer_id, .. } => {
                role == ROLE_MECHANIC || customer_id == user_id
            }
            Self::RequestUpdated {
                customer_id,
                mechanic_id,
                ..
            } => customer_id == user_id || mechanic_id.as_deref() == Some(user_id),
            Self::LocationUpdated {
                customer_id,
                mechanic_id,
                ..
            } => customer_id == user_id || mechanic_id == user_id,
            Self::Notification { user_id: target, .. } => target == user_id,
        }
    }
}
