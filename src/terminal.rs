//! [`Terminal`] is everything a session needs from the user's terminal:
//! lines of input, masked input for the key, a menu and somewhere to print.
//! [`Console`] is the real one.

use std::io::{self, BufRead, IsTerminal, Write};

/// Input and output for a [`Session`].
///
/// [`Session`]: crate::Session
pub trait Terminal {
    /// Read one line of input without its line terminator. `None` at end of
    /// input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Read a secret with echo disabled. `None` at end of input.
    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Let the user pick one of `items`. Returns the index picked, or `None`
    /// if the user backed out or input ended.
    fn select(&mut self, prompt: &str, items: &[&str])
        -> io::Result<Option<usize>>;

    /// Write `text` as is and flush it.
    fn print(&mut self, text: &str) -> io::Result<()>;
}

/// [`Terminal`] on the process' stdin and stdout. Uses [`dialoguer`] widgets,
/// drawn on stdout like everything else we print, when stdin is a terminal and falls back to plain lines when it is not (a
/// pipe, a file, a test harness).
#[derive(Debug)]
pub struct Console {
    interactive: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
        }
    }
}

fn widget_error(error: dialoguer::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}

impl Terminal for Console {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }

    fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            self.print(&format!("{prompt}: "))?;
            return self.read_line();
        }

        dialoguer::Password::new()
            .with_prompt(prompt)
            .interact_on(&console::Term::stdout())
            .map(Some)
            .map_err(widget_error)
    }

    fn select(
        &mut self,
        prompt: &str,
        items: &[&str],
    ) -> io::Result<Option<usize>> {
        if self.interactive {
            return dialoguer::Select::new()
                .with_prompt(prompt)
                .items(items)
                .default(0)
                .interact_on_opt(&console::Term::stdout())
                .map_err(widget_error);
        }

        let mut listing = String::new();
        for (i, item) in items.iter().enumerate() {
            listing.push_str(&format!("{}) {}\n", i + 1, item));
        }
        listing.push_str(&format!("{prompt}: "));
        self.print(&listing)?;

        match self.read_line()? {
            None => Ok(None),
            Some(answer) => parse_choice(&answer, items).map(Some).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid selection {:?}", answer.trim()),
                )
            }),
        }
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }
}

/// Match a typed menu answer against `items`, either by 1-based number or by
/// label (case insensitive).
pub fn parse_choice(answer: &str, items: &[&str]) -> Option<usize> {
    let answer = answer.trim();

    if let Ok(n) = answer.parse::<usize>() {
        return (1..=items.len()).contains(&n).then(|| n - 1);
    }

    items
        .iter()
        .position(|item| item.eq_ignore_ascii_case(answer))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// [`Terminal`] that replays scripted input and records everything
    /// printed.
    #[derive(Default)]
    pub struct Scripted {
        pub lines: VecDeque<String>,
        pub secrets: VecDeque<String>,
        pub choices: VecDeque<io::Result<Option<usize>>>,
        pub menus: Vec<Vec<String>>,
        pub output: String,
    }

    impl Scripted {
        pub fn lines<I, S>(mut self, lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.lines.extend(lines.into_iter().map(Into::into));
            self
        }

        pub fn secret(mut self, secret: &str) -> Self {
            self.secrets.push_back(secret.to_string());
            self
        }

        pub fn choices<I>(mut self, choices: I) -> Self
        where
            I: IntoIterator<Item = usize>,
        {
            self.choices
                .extend(choices.into_iter().map(|choice| Ok(Some(choice))));
            self
        }
    }

    impl Terminal for Scripted {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            Ok(self.lines.pop_front())
        }

        fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
            self.output.push_str(&format!("{prompt}: "));
            Ok(self.secrets.pop_front())
        }

        fn select(
            &mut self,
            _prompt: &str,
            items: &[&str],
        ) -> io::Result<Option<usize>> {
            self.menus
                .push(items.iter().map(|item| item.to_string()).collect());
            self.choices.pop_front().unwrap_or(Ok(None))
        }

        fn print(&mut self, text: &str) -> io::Result<()> {
            self.output.push_str(text);
            Ok(())
        }
    }

    const ITEMS: &[&str] = &["Ask Claude", "Exit", "Clear api key"];

    #[test]
    fn test_parse_choice_number() {
        assert_eq!(parse_choice("1", ITEMS), Some(0));
        assert_eq!(parse_choice(" 3\n", ITEMS), Some(2));
        assert_eq!(parse_choice("0", ITEMS), None);
        assert_eq!(parse_choice("4", ITEMS), None);
    }

    #[test]
    fn test_parse_choice_label() {
        assert_eq!(parse_choice("exit", ITEMS), Some(1));
        assert_eq!(parse_choice("Clear API key", ITEMS), Some(2));
        assert_eq!(parse_choice("quit", ITEMS), None);
        assert_eq!(parse_choice("", ITEMS), None);
    }
}
