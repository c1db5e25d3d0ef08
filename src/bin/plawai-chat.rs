use anyhow::Result;
use plawai::client::{
    ChatClient, ExportFormat, HttpTransport, JsonFileRepository, PreferencesStore, SendOutcome,
    export_chat,
};
use plawai::theme::{ThemeSettings, stylesheet};
use plawai::types::{Mood, Role};
use std::env;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

const DEFAULT_URL: &str = "http://127.0.0.1:5000";

const HELP: &str = "\
/new [title]        start a chat
/mood <name>        mood for new chats (casual, technical, creative)
/list               list chats
/select <n>         switch to chat n
/rename <title>     rename the current chat
/delete             delete the current chat
/clear              clear the current chat
/web                toggle web access
/search <text>      find messages in the current chat
/export <txt|md>    write the current chat to a file
/theme              toggle dark and light mode
/accent <h> <s> <l> set the accent colour
/quit               exit";

fn parse_mood(raw: &str) -> Option<Mood> {
    match raw.trim().to_lowercase().as_str() {
        "casual" => Some(Mood::Casual),
        "technical" => Some(Mood::Technical),
        "creative" => Some(Mood::Creative),
        _ => None,
    }
}

fn print_last_reply(client: &ChatClient) {
    let reply = client
        .current_chat()
        .and_then(|chat| chat.messages.last())
        .filter(|message| message.role == Role::Assistant);
    if let Some(message) = reply {
        println!("\n{}\n", message.content);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    plawai::load_dotenv();
    plawai::init_tracing();

    let base_url = env::var("PLAWAI_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let mut client = ChatClient::new(
        HttpTransport::new(&base_url),
        JsonFileRepository::default(),
    );
    let preferences_store = PreferencesStore::default();
    let mut preferences = preferences_store.load().unwrap_or_else(|err| {
        warn!(error = %err, "could not load preferences");
        Default::default()
    });
    let mut new_chat_mood = Mood::default();

    println!("PlawAI chat ({base_url}). Type /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let (command, arg) = match line.trim().split_once(' ') {
            Some((command, arg)) => (command, arg.trim()),
            None => (line.trim(), ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/new" => {
                let title = Some(arg).filter(|title| !title.is_empty());
                let chat = client.create_chat(title, new_chat_mood);
                println!("Started \"{}\" ({})", chat.title, chat.mood);
            }
            "/mood" => match parse_mood(arg) {
                Some(mood) => {
                    new_chat_mood = mood;
                    println!("New chats will be {mood}.");
                }
                None => println!("Unknown mood: {arg}"),
            },
            "/list" => {
                for (index, chat) in client.chats().iter().enumerate() {
                    let marker = if client.current_chat_id() == Some(chat.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {}. {} ({})", index + 1, chat.title, chat.mood);
                }
            }
            "/select" => {
                let id = arg
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| client.chats().get(n.checked_sub(1)?))
                    .map(|chat| chat.id.clone());
                match id {
                    Some(id) => {
                        client.select_chat(&id);
                    }
                    None => println!("No chat {arg}"),
                }
            }
            "/rename" => {
                if let Some(id) = client.current_chat_id().map(str::to_string) {
                    client.rename_chat(&id, arg);
                }
            }
            "/delete" => {
                if let Some(id) = client.current_chat_id().map(str::to_string) {
                    client.delete_chat(&id);
                }
            }
            "/clear" => client.clear_chat(),
            "/web" => {
                let enabled = client.toggle_web_access();
                println!("Web access {}.", if enabled { "on" } else { "off" });
            }
            "/search" => {
                for message in client.search_within_chat(arg) {
                    println!("[{}] {}", message.role, message.content);
                }
            }
            "/export" => {
                let format = match arg {
                    "md" | "markdown" => ExportFormat::Markdown,
                    _ => ExportFormat::Text,
                };
                if let Some(chat) = client.current_chat() {
                    let exported = export_chat(chat, format);
                    tokio::fs::write(&exported.file_name, &exported.content).await?;
                    println!("Wrote {}", exported.file_name);
                }
            }
            "/theme" => {
                preferences.theme_mode = preferences.theme_mode.toggled();
                if let Err(err) = preferences_store.save(&preferences) {
                    warn!(error = %err, "could not save preferences");
                }
                println!("Theme: {:?}", preferences.theme_mode);
                println!("{}", stylesheet(preferences.theme_mode, &preferences.theme));
            }
            "/accent" => {
                let channels: Vec<u16> = arg
                    .split_whitespace()
                    .filter_map(|value| value.parse().ok())
                    .collect();
                if let [hue, saturation, lightness] = channels[..] {
                    preferences.theme = ThemeSettings::new(
                        hue,
                        saturation.min(100) as u8,
                        lightness.min(100) as u8,
                    );
                    if let Err(err) = preferences_store.save(&preferences) {
                        warn!(error = %err, "could not save preferences");
                    }
                    println!("{}", stylesheet(preferences.theme_mode, &preferences.theme));
                } else {
                    println!("Usage: /accent <hue> <saturation> <lightness>");
                }
            }
            "" => {}
            _ => {
                let mut shown = 0;
                let outcome = client
                    .send_message_with(&line, |reply| {
                        print!("{}", &reply.content[shown..]);
                        let _ = std::io::stdout().flush();
                        shown = reply.content.len();
                    })
                    .await;
                match outcome {
                    SendOutcome::Ignored => println!("Create a chat first with /new."),
                    SendOutcome::Completed => println!("\n"),
                    SendOutcome::Failed => {
                        println!();
                        print_last_reply(&client);
                    }
                }
            }
        }
    }

    Ok(())
}
