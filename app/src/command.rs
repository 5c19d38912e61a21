use tutor_core::LlmProviderKind;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New(String),
    Switch(String),
    Delete,
    Projects,
    Clear,
    Research,
    Provider(LlmProviderKind),
    /// `None` lists the suggested models.
    Model(Option<String>),
    Search(String),
    Status,
    Help,
    Quit,
    Message(String),
    Empty,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("usage: {0}")]
    MissingArgument(&'static str),
    #[error("unknown command `{0}`, type /help for the list")]
    Unknown(String),
    #[error(transparent)]
    Provider(#[from] tutor_core::llm::UnknownProvider),
}

pub const HELP: &str = "\
Commands:
  /new <name>        create a project
  /switch <name>     make a project active
  /delete            delete the active project
  /projects          list projects
  /clear             clear the active conversation
  /research          toggle deep research mode
  /provider <name>   use openai or huggingface
  /model [id|n]      list models, or pick one by id or menu number
  /model default     go back to the mode's default model
  /search <term>     search the knowledge base
  /status            show the active project and provider
  /help              show this help
  /quit              leave
Anything else is sent to the assistant.";

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Message(line.to_string()));
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        let required = |usage: &'static str| {
            if argument.is_empty() {
                Err(CommandError::MissingArgument(usage))
            } else {
                Ok(argument.to_string())
            }
        };

        match name.to_ascii_lowercase().as_str() {
            "new" => required("/new <name>").map(Self::New),
            "switch" => required("/switch <name>").map(Self::Switch),
            "delete" => Ok(Self::Delete),
            "projects" => Ok(Self::Projects),
            "clear" => Ok(Self::Clear),
            "research" => Ok(Self::Research),
            "provider" => Ok(Self::Provider(
                required("/provider <openai|huggingface>")?.parse()?,
            )),
            "model" => Ok(Self::Model(
                Some(argument.to_string()).filter(|model| !model.is_empty()),
            )),
            "search" => required("/search <term>").map(Self::Search),
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(format!("/{name}"))),
        }
    }
}
