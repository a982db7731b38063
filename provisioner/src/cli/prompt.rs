// Interactive prompts
//
// Raw operator input only; validation happens in `selection` and `OpaqueSecret::new`.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use secrecy::zeroize::Zeroize;
use secrecy::SecretString;
use std::collections::BTreeSet;

pub trait Prompter {
    /// Show the numbered candidates and return whatever the operator typed.
    fn choose_instance(&self, candidates: &BTreeSet<String>) -> Result<String>;

    /// Masked, confirmed password entry for `login`.
    fn credential(&self, login: &str) -> Result<SecretString>;
}

/// Numbered list as shown to the operator (1-based).
pub fn render_candidates(candidates: &BTreeSet<String>) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, name)| format!("  {}) {}", i + 1, name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Terminal prompts via dialoguer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn choose_instance(&self, candidates: &BTreeSet<String>) -> Result<String> {
        println!("SQL Server instances on this host:");
        println!("{}", render_candidates(candidates));
        Input::<String>::new()
            .with_prompt(format!("Select instance [1-{}]", candidates.len()))
            .allow_empty(true)
            .interact_text()
            .context("Failed to read instance selection")
    }

    fn credential(&self, login: &str) -> Result<SecretString> {
        let mut typed = Password::new()
            .with_prompt(format!("Password for SQL login '{}'", login))
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .context("Failed to read password")?;
        // Exact-size copy, then wipe the prompt's buffer.
        let secret = SecretString::from(typed.as_str());
        typed.zeroize();
        Ok(secret)
    }
}
