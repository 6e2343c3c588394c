//! Fire-and-forget process spawning for bound actions and autostart.

use tracing::{error, trace};

use crate::common::error::SpawnError;

/// Splits a command line into arguments, honoring single/double quotes and
/// common backslash escapes inside quotes.
pub fn parse_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    match next {
                        'n' => current.push('\n'),
                        't' => current.push('\t'),
                        'r' => current.push('\r'),
                        '\\' | '\'' | '"' => current.push(next),
                        _ => {
                            current.push('\\');
                            current.push(next);
                        }
                    }
                } else {
                    current.push('\\');
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Launches a command without awaiting it. Fails only when the executable
/// cannot be started at all; the child's exit status is logged from a
/// detached thread.
pub fn spawn(command: &str) -> Result<(), SpawnError> {
    let parts = parse_command(command);
    let [cmd, args @ ..] = &*parts else {
        return Err(SpawnError::EmptyCommand);
    };

    let mut child = std::process::Command::new(cmd)
        .args(args)
        .spawn()
        .map_err(|source| SpawnError::Launch {
            command: cmd.clone(),
            source,
        })?;

    let command_str = command.to_string();
    std::thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => {
            trace!("Command completed: {}", command_str);
        }
        Ok(status) => {
            error!("Command exited with status {}: {}", status, command_str);
        }
        Err(e) => {
            error!("Failed to wait on command '{}': {}", command_str, e);
        }
    });
    Ok(())
}

/// Like [`spawn`], but for an already split argument vector.
pub fn spawn_parts(parts: &[String]) -> Result<(), SpawnError> {
    let [cmd, args @ ..] = parts else {
        return Err(SpawnError::EmptyCommand);
    };

    let mut child = std::process::Command::new(cmd)
        .args(args)
        .spawn()
        .map_err(|source| SpawnError::Launch {
            command: cmd.clone(),
            source,
        })?;

    let command_str = parts.join(" ");
    std::thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => {
            trace!("Command completed: {}", command_str);
        }
        Ok(status) => {
            error!("Command exited with status {}: {}", status, command_str);
        }
        Err(e) => {
            error!("Failed to wait on command '{}': {}", command_str, e);
        }
    });
    Ok(())
}

/// Runs the configured autostart commands. Failures are logged and skipped;
/// autostart is not allowed to prevent the session from coming up.
pub fn execute_startup_commands(commands: &[String]) {
    if commands.is_empty() {
        return;
    }

    trace!("Executing {} startup commands", commands.len());
    for (i, command) in commands.iter().enumerate() {
        if let Err(e) = spawn(command) {
            error!("Startup command {} failed: {}", i + 1, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(parse_command("feh --bg-fill moto.png"), vec![
            "feh",
            "--bg-fill",
            "moto.png"
        ]);
    }

    #[test]
    fn quotes_preserve_spaces() {
        assert_eq!(parse_command("notify-send 'hello world'"), vec![
            "notify-send",
            "hello world"
        ]);
    }

    #[test]
    fn escapes_inside_quotes() {
        assert_eq!(parse_command(r#"echo "a\tb""#), vec!["echo", "a\tb"]);
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(matches!(spawn("   "), Err(SpawnError::EmptyCommand)));
    }

    #[test]
    fn missing_executable_is_an_error() {
        let err = spawn("strata-test-no-such-binary-a1b2c3");
        assert!(matches!(err, Err(SpawnError::Launch { .. })));
    }
}
