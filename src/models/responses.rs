use super::JsonValue;
use async_graphql::{InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct SystemHealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: i64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    pub kind: String,
    pub last_seen: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub user: User,
    pub expires_in: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Option<String>,
    pub currency: Option<String>,
    pub notifications: Option<bool>,
    pub favorite_topics: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct UserPreferencesInput {
    pub theme: Option<String>,
    pub currency: Option<String>,
    pub notifications: Option<bool>,
    pub favorite_topics: Option<Vec<String>>,
}

impl From<UserPreferencesInput> for UserPreferences {
    fn from(input: UserPreferencesInput) -> Self {
        Self {
            theme: input.theme,
            currency: input.currency,
            notifications: input.notifications,
            favorite_topics: input.favorite_topics,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub topic: String,
    pub category: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, InputObject)]
pub struct CreateTopicInput {
    pub topic: String,
    pub category: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequestInput {
    pub symbol: String,
    pub chart_type: String,
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub symbol: String,
    pub chart_type: String,
    pub timeframe: String,
    /// Relative URL of the REST rendition of this chart
    pub chart_url: String,
    pub data_points: i32,
    pub generated_at: String,
    pub metadata: JsonValue,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct ChartBatchResponse {
    pub symbol: String,
    pub chart_type: String,
    pub timeframe: String,
    pub success: bool,
    pub chart_url: Option<String>,
    pub data_points: Option<i32>,
    pub generated_at: String,
    pub metadata: Option<JsonValue>,
    pub error: Option<String>,
}
