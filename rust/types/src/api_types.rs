use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HeartbeatResponse {
    #[serde(rename = "nanosecond heartbeat")]
    pub nanosecond_heartbeat: u128,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tenant {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Database {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tenant: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub tenant: String,
    pub databases: Vec<String>,
}
