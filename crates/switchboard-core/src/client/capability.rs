//! Operations an adapter may support

/// A single operation in the client contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Completion,
    StructuredOutput,
    Tools,
    Embedding,
    Search,
    Research,
    Citations,
    ImageGeneration,
    ImageAnalysis,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Completion => "chat completion",
            Capability::StructuredOutput => "structured output",
            Capability::Tools => "tool calling",
            Capability::Embedding => "embeddings",
            Capability::Search => "web search",
            Capability::Research => "research",
            Capability::Citations => "citations",
            Capability::ImageGeneration => "image generation",
            Capability::ImageAnalysis => "image analysis",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
