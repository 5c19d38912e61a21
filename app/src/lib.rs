pub mod command;
pub mod console;

pub use command::{Command, CommandError, HELP};
pub use console::{ChatConsole, ConsoleReply};
