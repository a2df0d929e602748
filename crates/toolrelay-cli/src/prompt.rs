use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = "\x1b[1m\x1b[38;5;30mYou> \x1b[0m";

pub enum Input {
    /// Nothing to send, ask the user again
    AskAgain,
    /// The user sent a message
    Message(String),
    /// The user wants to end the session
    Exit,
}

/// Classify one line of user input
pub fn parse_input(line: &str) -> Input {
    let text = line.trim();
    if text.is_empty() {
        return Input::AskAgain;
    }
    if ["quit", "exit", "q"]
        .iter()
        .any(|word| text.eq_ignore_ascii_case(word))
    {
        return Input::Exit;
    }
    Input::Message(text.to_string())
}

pub struct RustylinePrompt {
    editor: DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }

    pub fn get_input(&mut self) -> Result<Input> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                let input = parse_input(&line);
                if let Input::Message(text) = &input {
                    // History is a convenience; failing to record it is not an error
                    let _ = self.editor.add_history_entry(text.as_str());
                }
                Ok(input)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(Input::Exit),
            Err(e) => Err(e.into()),
        }
    }
}

/// Spinner shown while waiting on the model or a tool
#[derive(Default)]
pub struct Busy {
    spinner: Option<cliclack::ProgressBar>,
}

impl Busy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: &str) {
        if self.spinner.is_none() {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        }
    }

    pub fn hide(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop("");
        }
    }
}
