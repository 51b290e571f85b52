//! Interactive value resolution
//!
//! Attended runs ask the operator for missing values. The prompt echoes the
//! default in square brackets, keeps the default on empty input, clears the
//! value on a single-space input, validates against a restricted option set
//! (case-insensitive, canonical form returned), and re-prompts indefinitely
//! on invalid input. Secret entry is masked.
//!
//! Callers must check attended-mode eligibility first: when every required
//! value was supplied via flags, the prompt is never reached.

use std::io::{self, BufRead, Write};

/// A single interactive prompt
#[derive(Debug, Clone)]
pub struct Prompt<'a> {
    message: &'a str,
    default: Option<&'a str>,
    options: Option<&'a [&'a str]>,
    allow_empty: bool,
    secret: bool,
    sign: &'a str,
}

impl<'a> Prompt<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            message,
            default: None,
            options: None,
            allow_empty: true,
            secret: false,
            sign: ":",
        }
    }

    /// Default echoed in brackets and returned on empty input
    pub fn default_value(mut self, default: &'a str) -> Self {
        self.default = Some(default);
        self
    }

    /// Optional default (convenience for values loaded from configuration)
    pub fn optional_default(mut self, default: Option<&'a str>) -> Self {
        self.default = default;
        self
    }

    /// Restrict answers to this set; matching is case-insensitive and the
    /// canonical (listed) form is returned
    pub fn options(mut self, options: &'a [&'a str]) -> Self {
        self.options = Some(options);
        self
    }

    /// Re-prompt until a non-empty value is produced
    pub fn required(mut self) -> Self {
        self.allow_empty = false;
        self
    }

    /// Mask the entered value
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Trailing prompt sign (`:` by default, `?` for confirmations)
    pub fn sign(mut self, sign: &'a str) -> Self {
        self.sign = sign;
        self
    }

    /// Resolve one raw input line against this prompt's rules.
    ///
    /// Returns `None` when the input is invalid and must be asked again.
    fn resolve(&self, raw: &str) -> Option<String> {
        let answer = raw.trim_end_matches(&['\r', '\n'][..]);

        // a single space clears the value
        if answer == " " {
            return if self.allow_empty {
                Some(String::new())
            } else {
                None
            };
        }

        let answer = answer.trim();
        let value = if answer.is_empty() {
            self.default.unwrap_or("")
        } else {
            answer
        };

        if value.is_empty() {
            return if self.allow_empty {
                Some(String::new())
            } else {
                None
            };
        }

        match self.options {
            Some(options) => options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(value))
                .map(|option| (*option).to_string()),
            None => Some(value.to_string()),
        }
    }

    /// Read a value from the operator.
    ///
    /// Blocks until valid input arrives, re-prompting on invalid answers.
    /// Returns `Ok(None)` when the input stream closes (operator interrupt),
    /// which callers treat as a clean cancellation.
    pub fn read(&self) -> io::Result<Option<String>> {
        loop {
            let mut line = String::new();

            if self.secret {
                self.render_prompt()?;
                let term = console::Term::stdout();
                line = term.read_secure_line()?;
                println!();
            } else {
                self.render_prompt()?;
                let bytes = io::stdin().lock().read_line(&mut line)?;
                if bytes == 0 {
                    return Ok(None);
                }
            }

            if let Some(value) = self.resolve(&line) {
                return Ok(Some(value));
            }
        }
    }

    fn render_prompt(&self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        match self.default {
            Some(default) => write!(stdout, "  {} [{}]{} ", self.message, default, self.sign)?,
            None => write!(stdout, "  {}{} ", self.message, self.sign)?,
        }
        stdout.flush()
    }
}

/// Print the standard editing banner shown before a block of prompts
pub fn print_editing_banner() {
    println!("The current value is displayed in the square brackets.");
    println!("To keep the current value, simply press Enter.");
    println!("To change the current value, enter the new value.");
    println!("To remove the current value, enter a blank space.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_returns_default_unchanged() {
        let prompt = Prompt::new("Instance").default_value("pki-tomcat");
        assert_eq!(prompt.resolve("\n"), Some("pki-tomcat".to_string()));
        assert_eq!(prompt.resolve(""), Some("pki-tomcat".to_string()));
    }

    #[test]
    fn test_single_space_clears_value() {
        let prompt = Prompt::new("Website").default_value("https://example.com");
        assert_eq!(prompt.resolve(" \n"), Some(String::new()));
    }

    #[test]
    fn test_single_space_rejected_when_required() {
        let prompt = Prompt::new("Server URL")
            .default_value("ldap://localhost:389")
            .required();
        assert_eq!(prompt.resolve(" \n"), None);
    }

    #[test]
    fn test_explicit_value_wins_over_default() {
        let prompt = Prompt::new("Instance").default_value("pki-tomcat");
        assert_eq!(prompt.resolve("other\n"), Some("other".to_string()));
    }

    #[test]
    fn test_empty_without_default() {
        let prompt = Prompt::new("Website");
        assert_eq!(prompt.resolve("\n"), Some(String::new()));

        let prompt = Prompt::new("Website").required();
        assert_eq!(prompt.resolve("\n"), None);
    }

    #[test]
    fn test_options_case_insensitive_canonical_form() {
        let options = ["CA", "KRA", "OCSP", "TKS", "TPS"];
        let prompt = Prompt::new("Subsystem").options(&options).default_value("CA");

        assert_eq!(prompt.resolve("kra\n"), Some("KRA".to_string()));
        assert_eq!(prompt.resolve("Ocsp\n"), Some("OCSP".to_string()));
        assert_eq!(prompt.resolve("\n"), Some("CA".to_string()));
    }

    #[test]
    fn test_out_of_set_answer_rejected() {
        let options = ["Yes", "Y", "No", "N", "Quit", "Q"];
        let prompt = Prompt::new("Begin uninstallation (Yes/No/Quit)")
            .options(&options)
            .required();

        assert_eq!(prompt.resolve("maybe\n"), None);
        assert_eq!(prompt.resolve("y\n"), Some("Y".to_string()));
        assert_eq!(prompt.resolve("QUIT\n"), Some("Quit".to_string()));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let prompt = Prompt::new("Instance").default_value("pki-tomcat");
        assert_eq!(prompt.resolve("  other  \n"), Some("other".to_string()));
    }
}
