// (command, description)
pub const SLASH_COMMANDS: &[(&str, &str)] = &[
    ("/act", "Set the \"act as\" system prompt"),
    ("/clear", "Clear the conversation"),
    ("/config", "Show current settings"),
    ("/help", "Show available commands"),
    ("/model", "Select a model of the current provider"),
    ("/models", "List models of the current provider"),
    ("/provider", "Select the model provider (Groq, OpenAI)"),
    ("/quit", "Exit the client"),
    ("/search", "Toggle web search, or set it with on/off"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Act(String),
    Clear,
    Config,
    Help,
    Model(Option<String>),
    Models,
    Provider(Option<String>),
    Quit,
    Search(Option<bool>),
    Unknown(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Command(SlashCommand),
    Empty,
}

pub fn parse_input(input: &str) -> Input {
    let input = input.trim();

    if input.is_empty() {
        return Input::Empty;
    }

    input
        .strip_prefix('/')
        .map_or_else(|| Input::Text(input.to_string()), parse_slash_command)
}

fn parse_slash_command(cmd: &str) -> Input {
    let (name, rest) = cmd.split_once(char::is_whitespace).unwrap_or((cmd, ""));
    let rest = rest.trim();
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let command = match name {
        "act" => SlashCommand::Act(rest.to_string()),
        "clear" => SlashCommand::Clear,
        "config" => SlashCommand::Config,
        "help" => SlashCommand::Help,
        "model" => SlashCommand::Model(arg),
        "models" => SlashCommand::Models,
        "provider" => SlashCommand::Provider(arg),
        "quit" | "exit" | "q" => SlashCommand::Quit,
        "search" => match rest.to_ascii_lowercase().as_str() {
            "" => SlashCommand::Search(None),
            "on" | "true" | "yes" => SlashCommand::Search(Some(true)),
            "off" | "false" | "no" => SlashCommand::Search(Some(false)),
            _ => SlashCommand::Unknown(cmd.to_string()),
        },
        _ => SlashCommand::Unknown(cmd.to_string()),
    };

    Input::Command(command)
}

pub fn help_text() -> String {
    SLASH_COMMANDS
        .iter()
        .map(|(cmd, desc)| format!("{:<10} {}", cmd, desc))
        .collect::<Vec<_>>()
        .join("\n")
}
