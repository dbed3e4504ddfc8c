//! Search-augmented chat adapter (Perplexity)

use super::openai_compat::{build_chat_body, parse_chat_response};
use crate::client::{ApiClient, Capability, ClientCore};
use crate::clock::SharedClock;
use crate::config::ProviderConfig;
use crate::error::{ClientError, ClientResult};
use crate::messages::{
    Citation, Recency, RequestEnvelope, ResearchReport, ResponseEnvelope, SearchOptions,
};
use crate::resilience::CallContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{debug, instrument, warn};

const CAPABILITIES: &[Capability] = &[
    Capability::Completion,
    Capability::Search,
    Capability::Research,
    Capability::Citations,
];

const RESEARCH_MAX_TOKENS: u32 = 2000;
const COMPARISON_MAX_TOKENS: u32 = 3000;

/// How much detail `summarize_url` asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryStyle {
    #[default]
    Concise,
    Detailed,
    BulletPoints,
}

impl SummaryStyle {
    fn instruction(&self) -> &'static str {
        match self {
            SummaryStyle::Concise => "Provide a concise summary in 2-3 paragraphs.",
            SummaryStyle::Detailed => "Provide a comprehensive, detailed summary.",
            SummaryStyle::BulletPoints => {
                "Provide a summary in bullet points covering key information."
            }
        }
    }
}

/// Web search, research and citation extraction
#[derive(Debug)]
pub struct SearchAdapter {
    core: ClientCore,
    default_model: String,
}

impl SearchAdapter {
    pub fn new(config: &ProviderConfig, clock: SharedClock) -> ClientResult<Self> {
        let core = ClientCore::new(config, clock)?;
        let default_model = config
            .model()
            .ok_or_else(|| ClientError::configuration(&config.provider_id, "no default model"))?
            .to_string();
        Ok(Self {
            core,
            default_model,
        })
    }

    pub fn core(&self) -> &ClientCore {
        &self.core
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Completion with search options.
    ///
    /// Citations and related questions found anywhere in the payload are
    /// attached to the response.
    #[instrument(skip(self, request, options), fields(provider = %self.core.provider_id()), level = "debug")]
    pub async fn search_completion(
        &self,
        request: &RequestEnvelope,
        options: &SearchOptions,
    ) -> ClientResult<ResponseEnvelope> {
        let provider = self.core.provider_id();
        if request.response_schema.is_some() {
            return Err(ClientError::capability_mismatch(
                provider,
                Capability::StructuredOutput,
            ));
        }
        if request.tools.as_ref().is_some_and(|t| !t.is_empty()) {
            return Err(ClientError::capability_mismatch(provider, Capability::Tools));
        }
        request.validate(provider)?;

        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let mut body = build_chat_body(provider, request, Some(model), false)?;
        body["return_citations"] = json!(options.return_citations);
        body["return_images"] = json!(options.return_images);
        body["return_related_questions"] = json!(options.return_related_questions);
        if let Some(domains) = &options.domain_filter {
            body["search_domain_filter"] = json!(domains);
        }
        if let Some(recency) = options.recency_filter {
            body["search_recency_filter"] = json!(recency.as_str());
        }

        let raw = self
            .core
            .post_json("chat/completions", &body, &request.context)
            .await?;
        let citations = collect_citations(&raw);
        let related_questions = collect_related_questions(&raw);
        let mut response = parse_chat_response(provider, raw)?;
        if !citations.is_empty() || options.return_citations {
            response.citations = Some(citations);
        }
        response.related_questions = related_questions;
        Ok(response)
    }

    /// Answer a query from the web
    pub async fn search_web(
        &self,
        query: &str,
        options: SearchOptions,
        ctx: &CallContext,
    ) -> ClientResult<ResponseEnvelope> {
        self.search_with(query, None, options, ctx).await
    }

    async fn search_with(
        &self,
        query: &str,
        max_tokens: Option<u32>,
        options: SearchOptions,
        ctx: &CallContext,
    ) -> ClientResult<ResponseEnvelope> {
        if !self.default_model.to_ascii_lowercase().contains("online") {
            debug!(
                provider = %self.core.provider_id(),
                model = %self.default_model,
                "model may not support web search"
            );
        }
        let mut request = RequestEnvelope::prompt(query, None).with_context(ctx.clone());
        request.max_tokens = max_tokens;
        self.search_completion(&request, &options).await
    }

    /// Check a statement against recent sources
    pub async fn fact_check(
        &self,
        statement: &str,
        context: Option<&str>,
        ctx: &CallContext,
    ) -> ClientResult<ResponseEnvelope> {
        let mut prompt = format!("Please fact-check the following statement: '{statement}'");
        if let Some(context) = context {
            let _ = write!(prompt, "\n\nContext: {context}");
        }
        prompt.push_str("\n\nProvide accurate information with reliable sources.");

        let options = SearchOptions::with_citations().with_recency(Recency::Month);
        self.search_with(&prompt, None, options, ctx).await
    }

    /// Summarize a page, restricting search to its domain
    pub async fn summarize_url(
        &self,
        url: &str,
        style: SummaryStyle,
        ctx: &CallContext,
    ) -> ClientResult<ResponseEnvelope> {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| {
                ClientError::invalid_request(
                    self.core.provider_id(),
                    format!("'{url}' is not an absolute URL"),
                )
            })?;

        let prompt = format!(
            "Please summarize the content at this URL: {url}\n\n{}",
            style.instruction()
        );
        let options = SearchOptions::default().with_domains([host]);
        self.search_with(&prompt, None, options, ctx).await
    }

    /// Structured comparison of several topics
    pub async fn compare_topics(
        &self,
        topics: &[String],
        aspects: &[String],
        ctx: &CallContext,
    ) -> ClientResult<ResponseEnvelope> {
        if topics.len() < 2 {
            return Err(ClientError::invalid_request(
                self.core.provider_id(),
                "comparison needs at least two topics",
            ));
        }
        let mut prompt = format!("Please provide a detailed comparison of: {}", topics.join(", "));
        if !aspects.is_empty() {
            let _ = write!(prompt, "\n\nFocus on these aspects: {}", aspects.join(", "));
        }
        prompt.push_str("\n\nProvide a structured comparison with sources.");

        self.search_with(
            &prompt,
            Some(COMPARISON_MAX_TOKENS),
            SearchOptions::with_citations(),
            ctx,
        )
        .await
    }

    /// Follow-up questions suggested alongside a response
    pub fn get_related_questions(&self, response: &ResponseEnvelope) -> Vec<String> {
        if !response.related_questions.is_empty() {
            return response.related_questions.clone();
        }
        collect_related_questions(&response.raw)
    }
}

#[async_trait]
impl ApiClient for SearchAdapter {
    fn provider_id(&self) -> &str {
        self.core.provider_id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn create_completion(&self, request: &RequestEnvelope) -> ClientResult<ResponseEnvelope> {
        self.search_completion(request, &SearchOptions::default())
            .await
    }

    async fn simple_search(&self, query: &str, ctx: &CallContext) -> ClientResult<String> {
        let response = self
            .search_web(query, SearchOptions::with_citations(), ctx)
            .await?;
        Ok(response.content)
    }

    /// All sub-questions go out in a single request.
    async fn research_topic(
        &self,
        topic: &str,
        questions: &[String],
        ctx: &CallContext,
    ) -> ClientResult<ResearchReport> {
        let mut prompt = format!("Please provide comprehensive research on: {topic}");
        if !questions.is_empty() {
            prompt.push_str("\n\nSpecifically address these questions:\n");
            for (i, question) in questions.iter().enumerate() {
                let _ = writeln!(prompt, "{}. {question}", i + 1);
            }
        }
        prompt.push_str("\nProvide detailed information with sources.");

        let options = SearchOptions::with_citations().with_related_questions();
        let response = self
            .search_with(&prompt, Some(RESEARCH_MAX_TOKENS), options, ctx)
            .await?;

        Ok(ResearchReport {
            topic: topic.to_string(),
            citations: response.citations.unwrap_or_default(),
            content: response.content,
            related_questions: response.related_questions,
            usage: response.usage,
            raw: response.raw,
        })
    }

    fn get_citations(&self, response: &ResponseEnvelope) -> ClientResult<Vec<Citation>> {
        match &response.citations {
            Some(citations) => Ok(citations.clone()),
            None => Ok(collect_citations(&response.raw)),
        }
    }

    async fn test_connection(&self) -> bool {
        let request = RequestEnvelope::prompt("test", None).with_max_tokens(1);
        match self.create_completion(&request).await {
            Ok(_) => true,
            Err(e) => {
                warn!(provider = %self.core.provider_id(), error = %e, "connection test failed");
                false
            }
        }
    }

    async fn close(&self) -> ClientResult<()> {
        self.core.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.core.is_closed()
    }
}

/// Every citation in a payload, deduplicated by normalized URL.
///
/// Sources are read from the top-level `citations`, each choice's
/// `citations`, and `search_results`, in that order. The first occurrence
/// wins; a later title fills in a missing one.
pub fn collect_citations(raw: &Value) -> Vec<Citation> {
    let top_level = raw.get("citations").and_then(Value::as_array).into_iter().flatten();
    let per_choice = raw
        .get("choices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|choice| choice.get("citations").and_then(Value::as_array))
        .flatten();
    let search_results = raw
        .get("search_results")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();

    let mut citations: Vec<Citation> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for citation in top_level
        .chain(per_choice)
        .chain(search_results)
        .filter_map(Citation::from_value)
    {
        match seen.get(&normalize_url(&citation.url)) {
            Some(&index) => {
                if citations[index].title.is_none() {
                    citations[index].title = citation.title;
                }
            }
            None => {
                seen.insert(normalize_url(&citation.url), citations.len());
                citations.push(citation);
            }
        }
    }
    citations
}

/// Key used to treat two citation URLs as the same source
pub fn normalize_url(url: &str) -> String {
    match reqwest::Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let normalized = parsed.to_string();
            normalized.trim_end_matches('/').to_string()
        }
        Err(_) => url.trim().trim_end_matches('/').to_ascii_lowercase(),
    }
}

fn collect_related_questions(raw: &Value) -> Vec<String> {
    let from = |value: Option<&Value>| -> Vec<String> {
        value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let top_level = from(raw.get("related_questions"));
    if !top_level.is_empty() {
        return top_level;
    }
    from(raw.pointer("/choices/0/related_questions"))
}
