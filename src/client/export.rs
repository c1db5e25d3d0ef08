use crate::types::Chat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Markdown => "text/markdown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedChat {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

/// File stem for `title` that stays inside the target directory.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.trim_matches('.').is_empty() {
        "chat".to_string()
    } else {
        stem
    }
}

/// Renders a chat as a downloadable document named after its title.
pub fn export_chat(chat: &Chat, format: ExportFormat) -> ExportedChat {
    let content = chat
        .messages
        .iter()
        .map(|message| match format {
            ExportFormat::Text => format!("{}: {}", message.role, message.content),
            ExportFormat::Markdown => format!("**{}**: {}", message.role, message.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    ExportedChat {
        file_name: format!("{}.{}", file_stem(&chat.title), format.extension()),
        mime_type: format.mime_type(),
        content,
    }
}
