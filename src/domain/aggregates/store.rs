//! Store read model

use serde::{Deserialize, Serialize};

/// Store metadata, maintained outside this service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoreInfo {
    pub id: i32,
    pub logo_path: String,
    pub store_name: String,
    pub description: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
}
