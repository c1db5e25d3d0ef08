use crate::types::{ChatMessage, Mood};

const PERSONA: &str = "You are PlawAI, an advanced AI assistant created by PlawLabs, a software company based in Covent Garden, London, UK, led by CEO Yaz Celebi.";

pub const SEARCH_INSTRUCTIONS: &str = r#"- Decide when to search; if not needed, don't search.
- If you need more info, use: 🔍 SEARCH: "your query"
- After receiving search results, integrate them into your final answer.
- When using search results, provide citations with their URLs.
- Make it clear if the information is from web search."#;

pub const WEB_DISABLED_INSTRUCTIONS: &str = "- Web access is currently disabled. You cannot perform web searches or access external information.
- Respond based on your existing knowledge and the conversation history only.";

const FORMATTING: &str = "- Use markdown for formatting.
- Only include Sources section when using web search results.";

pub fn mood_clause(mood: Mood) -> String {
    format!("- Adjust your responses to be more {mood} in tone and content.")
}

/// Builds the system prompt for one chat turn.
pub fn system_prompt(web_access: bool, mood: Option<Mood>) -> String {
    let access = if web_access {
        SEARCH_INSTRUCTIONS
    } else {
        WEB_DISABLED_INSTRUCTIONS
    };

    let mut prompt = format!("{PERSONA}\n\n{access}\n\n{FORMATTING}");
    if let Some(mood) = mood {
        prompt.push('\n');
        prompt.push_str(&mood_clause(mood));
    }
    prompt
}

/// System prompt, then the caller's history as given, then the new message.
pub fn assemble_messages(
    system: String,
    history: Vec<ChatMessage>,
    message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(history);
    messages.push(ChatMessage::user(message));
    messages
}
