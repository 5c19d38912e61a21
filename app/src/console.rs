use crate::command::{Command, HELP};
use std::fmt::Write as _;
use tutor_core::{AppState, ChatMessage, MessageRole};

/// What the loop should print, and whether it should stop afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReply {
    pub text: String,
    pub exit: bool,
}

impl ConsoleReply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit: false,
        }
    }

    fn quit() -> Self {
        Self {
            text: "Goodbye.".to_string(),
            exit: true,
        }
    }
}

/// Turns console lines into session operations.
pub struct ChatConsole {
    state: AppState,
}

impl ChatConsole {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn prompt(&self) -> String {
        let project = self
            .state
            .active_project_name()
            .unwrap_or_else(|| "no project".to_string());
        let research = self
            .state
            .active_summary()
            .is_some_and(|summary| summary.research_mode);
        if research {
            format!("[{project} | research] > ")
        } else {
            format!("[{project}] > ")
        }
    }

    pub async fn handle_line(&self, line: &str) -> ConsoleReply {
        match Command::parse(line) {
            Ok(command) => self.run(command).await,
            Err(err) => ConsoleReply::say(err.to_string()),
        }
    }

    async fn run(&self, command: Command) -> ConsoleReply {
        let state = &self.state;
        let text = match command {
            Command::Empty => String::new(),
            Command::Quit => return ConsoleReply::quit(),
            Command::Help => HELP.to_string(),
            Command::Message(content) => state.send_user_message(&content).await.response,
            Command::New(name) => {
                if state.create_project(&name) {
                    format!("Created project: {name}. Use /switch {name} to open it.")
                } else {
                    format!("A project named `{name}` already exists.")
                }
            }
            Command::Switch(name) => {
                if state.switch_project(&name) {
                    let mut text = format!("Switched to {name}.");
                    let history = render_history(&state.active_messages());
                    if !history.is_empty() {
                        text.push('\n');
                        text.push_str(&history);
                    }
                    text
                } else {
                    format!("No project named `{name}`.")
                }
            }
            Command::Delete => match state.active_project_name() {
                None => "No active project.".to_string(),
                Some(_) if state.project_count() <= 1 => {
                    "Create another project before deleting this one.".to_string()
                }
                Some(name) => {
                    state.delete_project(&name);
                    let next = state.active_project_name().unwrap_or_default();
                    format!("Deleted project: {name}. Now in {next}.")
                }
            },
            Command::Projects => self.render_projects(),
            Command::Clear => {
                if state.clear_active() {
                    "Conversation cleared.".to_string()
                } else {
                    "No active project.".to_string()
                }
            }
            Command::Research => match state.toggle_research_mode() {
                Some(true) => "Deep research mode on: slower, more thorough answers.".to_string(),
                Some(false) => "Deep research mode off.".to_string(),
                None => "No active project.".to_string(),
            },
            Command::Provider(kind) => {
                state.set_provider(kind);
                format!("Now using {kind}.")
            }
            Command::Model(None) => self.render_models(),
            Command::Model(Some(choice)) => self.select_model(&choice),
            Command::Search(term) => render_search(state, &term),
            Command::Status => self.render_status(),
        };
        ConsoleReply::say(text)
    }

    fn render_projects(&self) -> String {
        let active = self.state.active_project_name();
        let mut out = String::new();
        for summary in self.state.project_summaries() {
            let marker = if active.as_deref() == Some(summary.name.as_str()) {
                '*'
            } else {
                ' '
            };
            let _ = writeln!(
                out,
                "{marker} {} ({} messages, created {})",
                summary.name,
                summary.message_count,
                summary.created_at.format("%Y-%m-%d %H:%M")
            );
        }
        if out.is_empty() {
            "No projects yet. Create one with /new <name>.".to_string()
        } else {
            out.trim_end().to_string()
        }
    }

    fn render_models(&self) -> String {
        let provider = self.state.provider();
        let current = self.state.current_model();
        let mut out = format!("{provider} models:");
        for (idx, model) in provider.suggested_models().iter().enumerate() {
            let marker = if *model == current { '*' } else { ' ' };
            let _ = write!(out, "\n{marker} {}. {model}", idx + 1);
        }
        if !provider.suggested_models().contains(&current.as_str()) {
            let _ = write!(out, "\n* {current}");
        }
        out
    }

    /// Accepts a model id, a 1-based index into the suggested models, or `default`.
    fn select_model(&self, choice: &str) -> String {
        let provider = self.state.provider();
        if choice.eq_ignore_ascii_case("default") {
            self.state.reset_model(provider);
            return format!("Using the default model: {}.", self.state.current_model());
        }
        let suggested = provider.suggested_models();
        let model = match choice.parse::<usize>() {
            Ok(number) if (1..=suggested.len()).contains(&number) => suggested[number - 1],
            Ok(_) => return format!("Pick a number between 1 and {}.", suggested.len()),
            Err(_) => choice,
        };
        self.state.set_model(provider, model);
        format!("{provider} will use {model}.")
    }

    fn render_status(&self) -> String {
        let provider = self.state.provider();
        let Some(summary) = self.state.active_summary() else {
            return format!("No active project. Provider: {provider}.");
        };
        let model = self.state.current_model();
        format!(
            "Project: {}\nMessages: {}\nResearch mode: {}\nProvider: {provider} ({model})",
            summary.name,
            summary.message_count,
            if summary.research_mode { "on" } else { "off" },
        )
    }
}

fn render_history(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                MessageRole::User => "You",
                MessageRole::Assistant => "Tutor",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_search(state: &AppState, term: &str) -> String {
    let hits = state.search_knowledge(term);
    if hits.is_empty() {
        return format!("Nothing in the knowledge base matches `{term}`.");
    }
    let mut out = format!("{} result(s) for `{term}`:", hits.len());
    for hit in hits {
        let _ = write!(out, "\n\n[{}] {}\n{}", hit.category, hit.question, hit.answer);
    }
    out
}
