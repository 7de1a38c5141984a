//! Generic whitespace tokenization shared by the NM and SS command parsers.
//!
//! Every line on every connection in the workspace is `WORD WORD WORD…`;
//! the only thing that differs between the NM and SS dialects is which
//! first word is legal and how many of the remaining words each handler
//! expects. This module owns just the tokenizing, so `nm` and `ss` can stay
//! about vocabulary instead of re-deriving a splitter each.

/// A tokenized command line: an uppercase-by-convention name and its
/// remaining whitespace-separated arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// The first whitespace-separated token, e.g. `"CREATE"` or `"ETIRW"`.
    pub name: String,
    /// Every token after the name, in order.
    pub args: Vec<String>,
}

impl Command {
    /// Splits `line` on ASCII whitespace into a name and its arguments.
    ///
    /// An empty or all-whitespace line yields an empty name and no args;
    /// callers treat that the same as any other unrecognized command.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_string();
        let args = tokens.map(str::to_string).collect();
        Self { name, args }
    }

    /// Re-joins `args` with single spaces, the inverse of how most handlers
    /// receive free-form trailing content (a `WRITE` session's inserted
    /// text, a checkpoint tag list).
    #[must_use]
    pub fn rejoin_args(&self) -> String {
        self.args.join(" ")
    }

    /// Borrows the `n`th argument, or `None` if the line was too short.
    #[must_use]
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args.get(n).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_args() {
        let cmd = Command::parse("CREATE report.txt");
        assert_eq!(cmd.name, "CREATE");
        assert_eq!(cmd.args, vec!["report.txt".to_string()]);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let cmd = Command::parse("WRITE   report.txt   3   hello world");
        assert_eq!(cmd.name, "WRITE");
        assert_eq!(
            cmd.args,
            vec!["report.txt", "3", "hello", "world"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_line_has_empty_name() {
        let cmd = Command::parse("   ");
        assert_eq!(cmd.name, "");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn rejoin_args_round_trips_single_spaces() {
        let cmd = Command::parse("ETIRW report.txt");
        assert_eq!(cmd.rejoin_args(), "report.txt");
    }
}
