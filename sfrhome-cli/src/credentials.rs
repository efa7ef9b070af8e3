//! Credentials from flags, environment and config, with an interactive
//! fallback.

use std::io::{self, BufRead, IsTerminal, Write};

use sfrhome_fetch::{CredentialProvider, Credentials};
use tracing::{debug, warn};

/// Resolved username and password; missing parts are prompted for when
/// stdin is a terminal.
#[derive(Debug, Clone, Default)]
pub struct PromptCredentials {
    username: Option<String>,
    password: Option<String>,
    interactive: bool,
}

impl PromptCredentials {
    /// Creates a provider. Prompts only when `interactive` is set.
    pub fn new(username: Option<String>, password: Option<String>, interactive: bool) -> Self {
        Self {
            username: username.filter(|u| !u.trim().is_empty()),
            password: password.filter(|p| !p.is_empty()),
            interactive,
        }
    }

    /// Creates a provider that prompts if stdin is a terminal.
    pub fn from_terminal(username: Option<String>, password: Option<String>) -> Self {
        Self::new(username, password, io::stdin().is_terminal())
    }
}

impl CredentialProvider for PromptCredentials {
    fn credentials(&self) -> Option<Credentials> {
        let username = match &self.username {
            Some(u) => u.trim().to_string(),
            None if self.interactive => prompt_line("SFR username: ")?,
            None => {
                debug!("No username and no terminal to prompt on");
                return None;
            }
        };

        let password = match &self.password {
            Some(p) => p.clone(),
            None if self.interactive => match rpassword::prompt_password("SFR password: ") {
                Ok(p) if !p.is_empty() => p,
                Ok(_) => return None,
                Err(e) => {
                    warn!(error = %e, "Password prompt failed");
                    return None;
                }
            },
            None => {
                debug!("No password and no terminal to prompt on");
                return None;
            }
        };

        Some(Credentials::new(username, password))
    }
}

fn prompt_line(label: &str) -> Option<String> {
    eprint!("{label}");
    if let Err(e) = io::stderr().flush() {
        warn!(error = %e, "Cannot flush prompt");
    }

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => Some(line.trim().to_string()).filter(|l| !l.is_empty()),
        Err(e) => {
            warn!(error = %e, "Username prompt failed");
            None
        }
    }
}
