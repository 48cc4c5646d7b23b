use crate::{
    cache::{CacheService, CacheTtl},
    errors::ApiError,
    services::lunarcrush::{ListParams, LunarCrushClient},
    Result,
};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

const TOOLS_VERSION: &str = "1.0.0";
const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;
const LIST_TTL_SECS: u64 = 300;
const DETAILS_TTL_SECS: u64 = 600;

/// Tool discovery document served at `/mcp/tools`
pub fn tool_catalogue() -> Value {
    json!({
        "tools": [
            {
                "name": "get_trending_topics",
                "description": "Get trending topics from LunarCrush",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "limit": { "type": "number", "description": "Number of topics to return" }
                    }
                }
            },
            {
                "name": "get_topic_details",
                "description": "Get detailed information about a specific topic",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "topic": {
                            "type": "string",
                            "description": "Topic name to get details for"
                        }
                    },
                    "required": ["topic"]
                }
            },
            {
                "name": "get_cryptocurrencies",
                "description": "Get top cryptocurrencies by social activity",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "count": {
                            "type": "number",
                            "description": "Number of cryptocurrencies to return"
                        }
                    }
                }
            },
            {
                "name": "search",
                "description": "Search across topics, cryptocurrencies, and content",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query" }
                    },
                    "required": ["query"]
                }
            }
        ],
        "version": TOOLS_VERSION,
        "capabilities": ["tool_discovery", "tool_execution"],
    })
}

/// Rejected tool invocation, before anything reaches upstream
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolCallError {
    #[error("Tool name is required")]
    MissingName,
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Topic parameter is required")]
    MissingTopic,
    #[error("Query parameter is required")]
    MissingQuery,
}

impl ToolCallError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolCallError::MissingName => "missing_tool_name",
            ToolCallError::UnknownTool(_) => "unknown_tool",
            ToolCallError::MissingTopic => "missing_topic",
            ToolCallError::MissingQuery => "missing_query",
        }
    }
}

/// A tool invocation with its arguments checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    TrendingTopics { limit: u64 },
    TopicDetails { topic: String },
    Cryptocurrencies { count: u64 },
    Search { query: String },
}

/// Positive integer argument, zero or absent meaning the default
fn count_arg(args: &Value, name: &str) -> u64 {
    args.get(name)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT)
}

fn text_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ToolCall {
    pub fn parse(name: Option<&str>, args: &Value) -> std::result::Result<Self, ToolCallError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Err(ToolCallError::MissingName),
            Some("get_trending_topics") => Ok(ToolCall::TrendingTopics {
                limit: count_arg(args, "limit"),
            }),
            Some("get_topic_details") => text_arg(args, "topic")
                .map(|topic| ToolCall::TopicDetails { topic })
                .ok_or(ToolCallError::MissingTopic),
            Some("get_cryptocurrencies") => Ok(ToolCall::Cryptocurrencies {
                count: count_arg(args, "count"),
            }),
            Some("search") => text_arg(args, "query")
                .map(|query| ToolCall::Search { query })
                .ok_or(ToolCallError::MissingQuery),
            Some(other) => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::TrendingTopics { .. } => "get_trending_topics",
            ToolCall::TopicDetails { .. } => "get_topic_details",
            ToolCall::Cryptocurrencies { .. } => "get_cryptocurrencies",
            ToolCall::Search { .. } => "search",
        }
    }

    fn cache_key(&self) -> String {
        let arg = match self {
            ToolCall::TrendingTopics { limit } => limit.to_string(),
            ToolCall::Cryptocurrencies { count } => count.to_string(),
            ToolCall::TopicDetails { topic } => topic.to_lowercase(),
            ToolCall::Search { query } => query.clone(),
        };
        let arg: String = url::form_urlencoded::byte_serialize(arg.as_bytes()).collect();
        format!("mcp:{}:{arg}", self.name())
    }

    fn ttl(&self) -> CacheTtl {
        match self {
            ToolCall::TopicDetails { .. } | ToolCall::Search { .. } => {
                CacheTtl::Ttl(DETAILS_TTL_SECS)
            }
            _ => CacheTtl::Ttl(LIST_TTL_SECS),
        }
    }
}

/// Runs tool calls against LunarCrush, results are cached per call
#[derive(Clone)]
pub struct McpService {
    client: Arc<LunarCrushClient>,
    cache: CacheService,
}

impl McpService {
    pub fn new(client: Arc<LunarCrushClient>, cache: CacheService) -> Self {
        Self { client, cache }
    }

    pub async fn execute(&self, call: &ToolCall) -> Result<Value> {
        let client = self.client.clone();
        self.cache
            .get_or_fetch(&call.cache_key(), call.ttl(), move || async move {
                run(&client, call).await
            })
            .await
    }
}

async fn run(client: &LunarCrushClient, call: &ToolCall) -> Result<Value> {
    match call {
        ToolCall::TrendingTopics { limit } => {
            let mut topics = client.topics_list().await?;
            topics.truncate(*limit as usize);
            Ok(json!({ "topics": topics }))
        }
        ToolCall::TopicDetails { topic } => match client.topic(topic).await? {
            Some(details) => Ok(json!({ "topic": topic, "details": details })),
            None => Err(ApiError::NotFound(format!("Topic not found: {topic}"))),
        },
        ToolCall::Cryptocurrencies { count } => {
            let params = ListParams {
                sort: Some("market_cap".to_string()),
                limit: Some(*count as i64),
                desc: Some(true),
                ..Default::default()
            };
            let mut coins = client.coins_list(&params).await?;
            coins.truncate(*count as usize);
            Ok(json!({ "cryptocurrencies": coins }))
        }
        ToolCall::Search { query } => {
            let results = client.search_posts(Some(query.clone()), None).await;
            Ok(json!({ "query": query, "results": results }))
        }
    }
}
