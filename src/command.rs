#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Model(String),
    Models,
    Open(u64),
    Clear,
    Copy,
    Health,
    Help,
    Quit,
}

pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.strip_prefix(':').unwrap_or(input).trim();

    if input.is_empty() {
        return None;
    }

    let (cmd, args) = match input.split_once(char::is_whitespace) {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };

    match cmd {
        "model" if !args.is_empty() => Some(Command::Model(args.to_owned())),
        "model" | "models" => Some(Command::Models),
        "open" | "get" => args.parse().ok().map(Command::Open),
        "clear" | "c" => Some(Command::Clear),
        "copy" | "y" => Some(Command::Copy),
        "health" => Some(Command::Health),
        "help" | "h" => Some(Command::Help),
        "quit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_model() {
        assert_eq!(
            parse_command(":model gpt2"),
            Some(Command::Model("gpt2".into()))
        );
        assert_eq!(
            parse_command("model  google/gemma-2-9b-it "),
            Some(Command::Model("google/gemma-2-9b-it".into()))
        );
    }

    #[test]
    fn test_parse_command_model_without_arg_opens_picker() {
        assert_eq!(parse_command(":model"), Some(Command::Models));
        assert_eq!(parse_command(":models"), Some(Command::Models));
    }

    #[test]
    fn test_parse_command_open() {
        assert_eq!(parse_command(":open 42"), Some(Command::Open(42)));
        assert_eq!(parse_command(":get 7"), Some(Command::Open(7)));
        assert_eq!(parse_command(":open abc"), None);
        assert_eq!(parse_command(":open"), None);
    }

    #[test]
    fn test_parse_command_aliases() {
        assert_eq!(parse_command(":q"), Some(Command::Quit));
        assert_eq!(parse_command(":h"), Some(Command::Help));
        assert_eq!(parse_command(":c"), Some(Command::Clear));
        assert_eq!(parse_command(":y"), Some(Command::Copy));
        assert_eq!(parse_command(":health"), Some(Command::Health));
    }

    #[test]
    fn test_parse_command_empty() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command(":"), None);
        assert_eq!(parse_command(":bogus"), None);
    }
}
