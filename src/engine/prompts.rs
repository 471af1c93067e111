//! System-prompt personas and the user-prompt template.

use std::collections::BTreeMap;

/// Persona table entry that overrides the fallback persona when present in
/// user configuration.
const FALLBACK_KEY: &str = "default";

const FALLBACK_PERSONA: &str = "You are a specialized assistant for technical documentation.";

/// Prompt pair fed to the chat-completion model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Mapping from framework identifier to system-prompt persona, with a
/// designated fallback for unknown frameworks. Selection never fails:
/// unknown identifiers degrade to the fallback persona.
#[derive(Debug, Clone)]
pub struct PersonaTable {
    personas: BTreeMap<String, String>,
    fallback: String,
}

impl Default for PersonaTable {
    #[inline]
    fn default() -> Self {
        let mut personas = BTreeMap::new();
        personas.insert(
            "crawl4ai".to_string(),
            "You are an expert on Crawl4AI, specialized in asynchronous web crawling.\n\
             Use the provided context to answer questions about configuration, strategies, and optimizations."
                .to_string(),
        );
        personas.insert(
            "pydantic".to_string(),
            "You are an expert on Pydantic AI, specialized in data validation for AI.\n\
             Use the provided context to answer questions about models, validations, and integrations."
                .to_string(),
        );
        personas.insert(
            "agno".to_string(),
            "You are an expert on Agno, specialized in web development.\n\
             Use the provided context to answer questions about configuration, development, and best practices."
                .to_string(),
        );
        personas.insert(
            "mcp".to_string(),
            "You are an expert on Model Context Protocol (MCP), specialized in model context management and LLM interactions.\n\
             \n\
             Key areas of expertise:\n\
             1. Protocol specifications and architecture\n\
             2. Client-server implementations\n\
             3. Tool definitions and integrations\n\
             4. Resource management and context handling\n\
             5. Transport layer configurations\n\
             6. Debugging and inspection tools\n\
             \n\
             When answering:\n\
             - Focus on practical implementation details\n\
             - Provide code examples when relevant\n\
             - Reference specific MCP concepts and components\n\
             - Explain how features integrate with LLM systems\n\
             - Highlight best practices and common pitfalls\n\
             \n\
             Use the provided context to give accurate, implementation-focused answers."
                .to_string(),
        );

        Self {
            personas,
            fallback: FALLBACK_PERSONA.to_string(),
        }
    }
}

impl PersonaTable {
    /// Built-in personas merged with entries from configuration. A `default`
    /// entry replaces the fallback persona.
    #[inline]
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        for (framework, persona) in overrides {
            if framework == FALLBACK_KEY {
                table.fallback = persona.clone();
            } else {
                table
                    .personas
                    .insert(framework.to_lowercase(), persona.clone());
            }
        }
        table
    }

    /// System prompt for a framework, falling back for unknown identifiers.
    #[inline]
    pub fn system_prompt(&self, framework: &str) -> &str {
        self.personas
            .get(&framework.to_lowercase())
            .map_or(self.fallback.as_str(), String::as_str)
    }

    /// Compose the full prompt pair for a query against an assembled context
    /// block. The user-prompt template is a design constant.
    #[inline]
    pub fn build_prompt(&self, query: &str, context: &str, framework: &str) -> Prompt {
        let system = self.system_prompt(framework).to_string();
        let user = format!(
            "Based on the following documentation sections, answer the question below.\n\
             If the answer cannot be fully derived from the provided context, say so.\n\
             \n\
             Documentation Sections:\n\
             {context}\n\
             \n\
             Question: {query}\n\
             \n\
             Please provide a clear, structured answer with:\n\
             1. Direct response to the question\n\
             2. Relevant code examples (if applicable)\n\
             3. Links to related documentation (if available)"
        );

        Prompt { system, user }
    }
}
