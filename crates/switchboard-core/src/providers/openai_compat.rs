//! Request bodies and response parsing for OpenAI-compatible endpoints

use super::structured::{StructuredOutput, parse_json_content};
use crate::client::ClientCore;
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    EmbeddingResponse, GeneratedImage, ImageResponse, RequestEnvelope, ResponseEnvelope, ToolCall,
    Usage,
};
use serde_json::{Value, json};

/// Build a chat completion body.
///
/// `model` is omitted for Azure, where the deployment in the URL selects
/// it. `json_mode` requests `response_format: json_object`, which every
/// structured-output request sets.
pub fn build_chat_body(
    provider: &str,
    request: &RequestEnvelope,
    model: Option<&str>,
    json_mode: bool,
) -> ClientResult<Value> {
    let messages = serde_json::to_value(&request.messages).map_err(|e| {
        ClientError::invalid_request(provider, format!("failed to encode messages: {e}"))
    })?;
    let mut body = json!({ "messages": messages });

    if let Some(model) = model {
        body["model"] = json!(model);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = request.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(stop) = &request.stop {
        body["stop"] = json!(stop);
    }
    if let Some(seed) = request.seed {
        body["seed"] = json!(seed);
    }
    if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
        body["tools"] = json!(tools);
        if let Some(choice) = &request.tool_choice {
            body["tool_choice"] = choice.clone();
        }
    }
    if json_mode || request.response_schema.is_some() {
        body["response_format"] = json!({ "type": "json_object" });
    }

    Ok(body)
}

/// Normalize a chat completion payload
pub fn parse_chat_response(provider: &str, raw: Value) -> ClientResult<ResponseEnvelope> {
    let choice = raw
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ClientError::response(provider, "response contains no choices"))?;
    let message = choice
        .get("message")
        .ok_or_else(|| ClientError::response(provider, "choice contains no message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ResponseEnvelope {
        content,
        tool_calls,
        usage: parse_usage(&raw),
        model: raw.get("model").and_then(Value::as_str).map(str::to_string),
        finish_reason,
        raw,
        ..Default::default()
    })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?;
    Some(ToolCall {
        id: call.get("id").and_then(Value::as_str).unwrap_or_default().to_string(),
        name: function.get("name").and_then(Value::as_str)?.to_string(),
        arguments: function
            .get("arguments")
            .and_then(Value::as_str)
            .unwrap_or("{}")
            .to_string(),
    })
}

pub fn parse_usage(raw: &Value) -> Option<Usage> {
    raw.get("usage")
        .filter(|u| u.is_object())
        .and_then(|u| serde_json::from_value(u.clone()).ok())
}

/// Embedding vectors, ordered by the `index` the provider reports
pub fn parse_embedding_response(provider: &str, raw: Value) -> ClientResult<EmbeddingResponse> {
    let data = raw
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::response(provider, "embedding response contains no data"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let vector = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::response(provider, "embedding item has no vector"))?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| ClientError::response(provider, "embedding vector is not numeric"))?;
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(EmbeddingResponse {
        embeddings: indexed.into_iter().map(|(_, v)| v).collect(),
        model: raw.get("model").and_then(Value::as_str).map(str::to_string),
        usage: parse_usage(&raw),
        raw,
    })
}

pub fn parse_image_response(provider: &str, raw: Value) -> ClientResult<ImageResponse> {
    let images = raw
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::response(provider, "image response contains no data"))?
        .iter()
        .map(|item| serde_json::from_value::<GeneratedImage>(item.clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ClientError::response(provider, format!("malformed image entry: {e}")))?;
    Ok(ImageResponse { images, raw })
}

/// Full completion round trip shared by the chat and multimodal adapters.
///
/// The schema is compiled first and the payload validated after the retry
/// loop, so a violation costs exactly one request and is never retried.
pub async fn run_completion(
    core: &ClientCore,
    path: &str,
    request: &RequestEnvelope,
    model: Option<&str>,
    json_mode: bool,
) -> ClientResult<ResponseEnvelope> {
    let provider = core.provider_id();
    request.validate(provider)?;

    let structured = request
        .response_schema
        .as_ref()
        .map(|schema| StructuredOutput::compile(provider, schema))
        .transpose()?;

    let body = build_chat_body(provider, request, model, json_mode)?;
    let raw = core.post_json(path, &body, &request.context).await?;
    let mut response = parse_chat_response(provider, raw)?;

    if let Some(output) = structured {
        response.structured = Some(output.parse(provider, &response.content)?);
    } else if json_mode {
        response.structured = Some(parse_json_content(provider, &response.content)?);
    }
    Ok(response)
}
