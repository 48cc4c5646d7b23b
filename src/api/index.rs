use crate::services::health::VERSION;
use axum::Json;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Static JSON response for the index endpoint
static INDEX_JSON: OnceLock<Value> = OnceLock::new();
static API_SPEC_JSON: OnceLock<Value> = OnceLock::new();

/// Handler for the index endpoint that lists every route
///
/// # Endpoint: GET /
pub fn index() -> Json<Value> {
    let value = INDEX_JSON.get_or_init(|| {
        json!({
            "name": "LunarCrush GraphQL Gateway",
            "version": VERSION,
            "endpoints": [
                {
                    "path": "/",
                    "method": "GET",
                    "description": "API endpoint documentation",
                    "params": {}
                },
                {
                    "path": "/graphql",
                    "method": "POST",
                    "description": "Execute a GraphQL query against LunarCrush data",
                    "params": {
                        "query": {
                            "type": "string",
                            "required": true,
                            "description": "GraphQL document, at most 10000 characters"
                        },
                        "variables": {
                            "type": "object",
                            "required": false,
                            "description": "Variables for the document"
                        },
                        "operationName": {
                            "type": "string",
                            "required": false,
                            "description": "Operation to run when the document holds several"
                        }
                    }
                },
                {
                    "path": "/graphql",
                    "method": "GET",
                    "description": "GraphiQL explorer",
                    "params": {}
                },
                {
                    "path": "/auth/demo-token",
                    "method": "POST",
                    "description": "Issue a demo JWT valid for 7 days",
                    "params": {}
                },
                {
                    "path": "/charts/types",
                    "method": "GET",
                    "description": "Supported chart types and their timeframes",
                    "params": {}
                },
                {
                    "path": "/charts/:symbol/:chartType",
                    "method": "GET",
                    "description": "Generate a chart configuration for a coin. Requires an API key",
                    "params": {
                        "symbol": {
                            "type": "string",
                            "required": true,
                            "description": "Coin symbol, for example btc"
                        },
                        "chartType": {
                            "type": "string",
                            "required": true,
                            "description": "One of price, volume, social, sentiment"
                        },
                        "timeframe": {
                            "type": "string",
                            "required": false,
                            "description": "1h, 1d, 1w or 1m [default: 1d]"
                        },
                        "title": {
                            "type": "string",
                            "required": false,
                            "description": "Chart title override"
                        },
                        "width": {
                            "type": "integer",
                            "required": false,
                            "description": "Chart width in pixels [default: 800]"
                        },
                        "height": {
                            "type": "integer",
                            "required": false,
                            "description": "Chart height in pixels [default: 400]"
                        }
                    }
                },
                {
                    "path": "/charts/:symbol/:chartType/:timeframe",
                    "method": "GET",
                    "description": "Generate a chart, timeframe in the path. Requires an API key",
                    "params": {}
                },
                {
                    "path": "/charts/preview/:symbol/:chartType",
                    "method": "GET",
                    "description": "400x200 chart preview. Requires an API key",
                    "params": {}
                },
                {
                    "path": "/charts/batch",
                    "method": "POST",
                    "description": "Generate up to 5 charts at once. Requires an API key",
                    "params": {
                        "requests": {
                            "type": "array",
                            "required": true,
                            "description": "Entries of symbol, chartType and optional timeframe"
                        }
                    }
                },
                {
                    "path": "/api/validate/topic",
                    "method": "POST",
                    "description": "Validate a topic submission with its headers and query",
                    "params": {
                        "topic": {
                            "type": "string",
                            "required": true,
                            "description": "Topic name, 1 to 50 characters"
                        },
                        "category": {
                            "type": "string",
                            "required": true,
                            "description": "Category, 1 to 30 characters"
                        },
                        "includeRaw": {
                            "type": "boolean",
                            "required": false,
                            "description": "Query flag, true or false"
                        }
                    }
                },
                {
                    "path": "/mcp/tools",
                    "method": "GET",
                    "description": "Tools available to model clients",
                    "params": {}
                },
                {
                    "path": "/mcp/call",
                    "method": "POST",
                    "description": "Execute a tool. Requires an API key",
                    "params": {
                        "name": {
                            "type": "string",
                            "required": true,
                            "description": "Tool name from /mcp/tools"
                        },
                        "arguments": {
                            "type": "object",
                            "required": false,
                            "description": "Tool arguments"
                        }
                    }
                },
                {
                    "path": "/health",
                    "method": "GET",
                    "description": "Detailed health report",
                    "params": {}
                },
                {
                    "path": "/ready",
                    "method": "GET",
                    "description": "Readiness probe",
                    "params": {}
                },
                {
                    "path": "/healthz",
                    "method": "GET",
                    "description": "Liveness probe",
                    "params": {}
                },
                {
                    "path": "/ping",
                    "method": "GET",
                    "description": "Plain text liveness check",
                    "params": {}
                },
                {
                    "path": "/metrics",
                    "method": "GET",
                    "description": "Prometheus metrics",
                    "params": {}
                },
                {
                    "path": "/api-spec.json",
                    "method": "GET",
                    "description": "OpenAPI document",
                    "params": {}
                }
            ]
        })
    });

    Json(value.clone())
}

fn path_param(name: &str) -> Value {
    json!({ "name": name, "in": "path", "required": true, "schema": { "type": "string" } })
}

/// Minimal OpenAPI 3.0 description of the HTTP surface
///
/// # Endpoint: GET /api-spec.json
pub fn api_spec() -> Json<Value> {
    let value = API_SPEC_JSON.get_or_init(|| {
        json!({
            "openapi": "3.0.0",
            "info": {
                "title": "LunarCrush GraphQL Gateway",
                "version": VERSION,
                "description": "GraphQL access to LunarCrush social intelligence data"
            },
            "servers": [{ "url": "/" }],
            "paths": {
                "/graphql": {
                    "post": {
                        "summary": "Execute a GraphQL query",
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "required": ["query"],
                                        "properties": {
                                            "query": { "type": "string" },
                                            "variables": { "type": "object" },
                                            "operationName": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "GraphQL response" },
                            "400": { "description": "Invalid GraphQL request" },
                            "429": { "description": "Rate limit exceeded" }
                        }
                    }
                },
                "/auth/demo-token": {
                    "post": {
                        "summary": "Issue a demo token",
                        "responses": { "200": { "description": "Token issued" } }
                    }
                },
                "/charts/{symbol}/{chartType}": {
                    "get": {
                        "summary": "Generate a chart configuration",
                        "parameters": [
                            path_param("symbol"),
                            path_param("chartType"),
                            {
                                "name": "timeframe",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "string" }
                            }
                        ],
                        "responses": {
                            "200": { "description": "Chart configuration" },
                            "400": { "description": "Invalid chart type" },
                            "401": { "description": "Missing or invalid API key" }
                        }
                    }
                },
                "/charts/{symbol}/{chartType}/{timeframe}": {
                    "get": {
                        "summary": "Generate a chart for a path timeframe",
                        "parameters": [
                            path_param("symbol"),
                            path_param("chartType"),
                            path_param("timeframe")
                        ],
                        "responses": {
                            "200": { "description": "Chart configuration" },
                            "400": { "description": "Invalid chart type or timeframe" },
                            "401": { "description": "Missing or invalid API key" }
                        }
                    }
                },
                "/charts/preview/{symbol}/{chartType}": {
                    "get": {
                        "summary": "Generate a 400x200 chart preview",
                        "parameters": [path_param("symbol"), path_param("chartType")],
                        "responses": {
                            "200": { "description": "Chart configuration" },
                            "401": { "description": "Missing or invalid API key" }
                        }
                    }
                },
                "/charts/batch": {
                    "post": {
                        "summary": "Generate up to 5 charts",
                        "responses": {
                            "200": { "description": "Per-entry batch results" },
                            "400": { "description": "Not an array, or more than 5 entries" },
                            "401": { "description": "Missing or invalid API key" }
                        }
                    }
                },
                "/api/validate/topic": {
                    "post": {
                        "summary": "Validate a topic submission",
                        "responses": {
                            "200": { "description": "Body, headers and query are valid" },
                            "400": { "description": "Validation failed" }
                        }
                    }
                },
                "/mcp/tools": {
                    "get": {
                        "summary": "List tools for model clients",
                        "responses": { "200": { "description": "Tool catalogue" } }
                    }
                },
                "/mcp/call": {
                    "post": {
                        "summary": "Execute a tool",
                        "responses": {
                            "200": { "description": "Tool result" },
                            "400": { "description": "Unknown tool or missing argument" },
                            "401": { "description": "Missing or invalid API key" }
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Health report",
                        "responses": { "200": { "description": "Service health" } }
                    }
                }
            }
        })
    });

    Json(value.clone())
}
