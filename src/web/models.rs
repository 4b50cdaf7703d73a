// API-specific data models for the web server

use serde::Serialize;

/// Response body of GET /api/health
#[derive(Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
    pub version: String,
}

/// Response body of GET /
#[derive(Serialize, Debug, Clone)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: &'static str,
    pub health: &'static str,
    pub endpoints: EndpointMap,
}

#[derive(Serialize, Debug, Clone)]
pub struct EndpointMap {
    pub remove_background: &'static str,
}

/// Response body of GET /docs
#[derive(Serialize, Debug, Clone)]
pub struct ApiDocs {
    pub title: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointDoc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct EndpointDoc {
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
    pub description: String,
}
