use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ListItem {
    pub username: String,
    pub totp_enabled: bool,
    pub created: DateTime<Utc>,
}
