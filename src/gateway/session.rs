use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::auth::AuthenticatedUser;

/// One live WebSocket connection.
#[derive(Debug)]
pub struct GatewaySession {
    pub connection_id: String,
    /// Set once by a successful `authenticate`.
    pub user: Option<AuthenticatedUser>,
    /// Joined rooms, in join order.
    pub rooms: Vec<String>,
    pub connected_at: DateTime<Utc>,
    pub tx: mpsc::UnboundedSender<String>,
}

impl GatewaySession {
    pub fn new(connection_id: String, tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            connection_id,
            user: None,
            rooms: Vec::new(),
            connected_at: Utc::now(),
            tx,
        }
    }
}
