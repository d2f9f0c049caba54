use colored::Colorize;

use crate::config::ConfigError;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(lines) = suggestion(&err) {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        for line in lines {
            eprintln!("  {}", line);
        }
    }

    std::process::exit(1);
}

fn suggestion(err: &anyhow::Error) -> Option<Vec<String>> {
    if let Some(config_err) = err.downcast_ref::<ConfigError>() {
        return match config_err {
            ConfigError::MissingRequired { env, .. } => Some(vec![
                "Export the variable or add it to a .env file:".to_string(),
                format!("{} export {}=<value>", "$".dimmed(), env),
            ]),
            ConfigError::NotFound(_) | ConfigError::Parse { .. } => Some(vec![
                "Check the file passed with --config, or inspect the effective settings with:"
                    .to_string(),
                format!("{} chatrelay config", "$".dimmed()),
            ]),
            _ => None,
        };
    }

    let msg = format!("{err:#}").to_lowercase();

    // Telegram answers a bad token with 401 Unauthorized or 404 Not Found
    if msg.contains("telegram") && (msg.contains("unauthorized") || msg.contains("not found")) {
        return Some(vec![
            "The Telegram bot token was rejected. Get a fresh one from @BotFather.".to_string(),
        ]);
    }

    if msg.contains("connection refused") || msg.contains("error sending request") {
        return Some(vec!["Check your internet connection and try again.".to_string()]);
    }

    None
}
