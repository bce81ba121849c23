use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::UpdateClient;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Client name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    #[validate(range(min = 0, max = 365))]
    pub payment_delay: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 255, message = "Client name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub email: Option<String>,
    pub avatar: Option<String>,
    #[validate(range(min = 0, max = 365))]
    pub payment_delay: Option<i32>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(req: UpdateClientRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            avatar: req.avatar,
            payment_delay: req.payment_delay,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListClientsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevenueDataQuery {
    pub months: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevenueDataResponse {
    pub client_id: String,
    pub months: usize,
    pub revenue_data: Vec<f64>,
}
