use super::ports::Agent;

const CHAT_SYSTEM_PROMPT: &str = "You are Duna, the AI assistant built into the Duna browser. \
Answer clearly and concisely, use Markdown for structure when it helps, and say so when you \
are unsure instead of guessing.";

const CODING_SYSTEM_PROMPT: &str = "You are Duna's coding agent. Help the user write, review \
and debug code. Prefer complete, runnable snippets in fenced code blocks with the language \
named, explain non-obvious decisions briefly, and point out bugs or security problems you \
notice in code the user shares.";

pub fn system_prompt(agent: Agent) -> &'static str {
    match agent {
        Agent::Chat => CHAT_SYSTEM_PROMPT,
        Agent::Coding => CODING_SYSTEM_PROMPT,
    }
}

/// Reply used when no provider key is configured
pub fn placeholder_reply(last_message: &str) -> String {
    format!(
        "I understand you're asking about: \"{}\".\n\n\
         This is a placeholder response because no AI provider is configured. To connect one:\n\n\
         1. Set LLM_ENDPOINT to an OpenAI-compatible chat completions URL\n\
         2. Set LLM_API_KEY (or LLM_API_KEY_FILE) to the provider key\n\
         3. Optionally set LLM_MODEL (defaults to gpt-4o-mini)\n\
         4. Restart the server",
        last_message
    )
}

pub const AUTH_FAILED_REPLY: &str = "I couldn't reach the AI provider because it rejected the \
configured credentials. Please check the LLM_API_KEY setting.";

pub const RATE_LIMITED_REPLY: &str = "The AI provider is receiving too many requests right now. \
Please wait a moment and try again.";

pub const PROVIDER_UNAVAILABLE_REPLY: &str = "The AI provider is temporarily unavailable. \
Please try again in a few minutes.";

pub const GENERIC_FAILURE_REPLY: &str = "Sorry, I couldn't generate a response. Please try \
again.";
