//! Default values shared by configuration sections
//!
//! Everything here can be overridden through `config/*.toml` or
//! `LEAD_ASSISTANT__*` environment variables.

/// Company facts embedded in the system prompt
pub mod company {
    pub const NAME: &str = "Northwind Digital Studio";

    pub const SERVICES: &[&str] = &[
        "Custom websites",
        "Web applications",
        "E-commerce stores",
        "Real estate platforms",
        "Automotive dealer sites",
        "Digital consulting",
    ];

    /// The only offering with a publicly disclosed price
    pub const BASIC_WEBSITE_PRICE_RANGE: &str = "$2,500 - $5,000";

    pub const CONTACT_EMAIL: &str = "hello@northwind.studio";
}

/// Service endpoints
pub mod endpoints {
    pub const OPENAI_API: &str = "https://api.openai.com/v1";
    pub const QDRANT_DEFAULT: &str = "http://localhost:6334";
    pub const SCYLLA_DEFAULT: &str = "127.0.0.1:9042";
}

/// Model defaults
pub mod models {
    pub const CHAT_MODEL: &str = "gpt-4o-mini";
    pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
    pub const EMBEDDING_DIMENSIONS: usize = 1536;
}

/// Retrieval defaults
pub mod rag {
    /// Minimum cosine similarity for a chunk to be used as context
    pub const SIMILARITY_THRESHOLD: f32 = 0.7;

    /// Chunks injected into the prompt
    pub const TOP_K: usize = 5;

    pub const COLLECTION: &str = "knowledge_base";
}

/// Timeouts in seconds
pub mod timeouts {
    pub const SERVER_REQUEST: u64 = 60;
    pub const LLM_REQUEST: u64 = 30;
    pub const EMBEDDING_REQUEST: u64 = 10;
}
