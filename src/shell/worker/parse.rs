//! Command line parsing.
//!
//! Grammar: `command [arg...] [< infile] [> outfile] [&]`. Quoted
//! spans (single or double) form one token with their whitespace
//! intact. Redirection operators are recognized at token start, so
//! `cat <in` and `cat < in` read the same.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unmatched {0}")]
    UnmatchedQuote(char),
    #[error("ambiguous I/O redirection")]
    AmbiguousRedirect,
    #[error("must provide file name for redirection")]
    MissingRedirectTarget,
}

/// Classification of the first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    None,
    Quit,
    Jobs,
    Bg,
    Fg,
}

impl Builtin {
    fn classify(word: &str) -> Self {
        match word {
            "quit" => Builtin::Quit,
            "jobs" => Builtin::Jobs,
            "bg" => Builtin::Bg,
            "fg" => Builtin::Fg,
            _ => Builtin::None,
        }
    }
}

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub argv: Vec<String>,
    pub infile: Option<String>,
    pub outfile: Option<String>,
    pub builtin: Builtin,
    pub background: bool,
}

/// What the token just read is destined for.
#[derive(PartialEq)]
enum Pending {
    Arg,
    Infile,
    Outfile,
}

/// Parses one raw line. `Ok(None)` means the line held no tokens and
/// should be ignored.
pub fn parse_line(line: &str) -> Result<Option<CommandLine>, ParseError> {
    let mut argv: Vec<String> = Vec::new();
    let mut infile = None;
    let mut outfile = None;
    let mut pending = Pending::Arg;
    let mut last_arg_quoted = false;

    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '<' || c == '>' {
            if pending != Pending::Arg {
                return Err(ParseError::MissingRedirectTarget);
            }
            let taken = if c == '<' { &infile } else { &outfile };
            if taken.is_some() {
                return Err(ParseError::AmbiguousRedirect);
            }
            pending = if c == '<' { Pending::Infile } else { Pending::Outfile };
            chars.next();
            continue;
        }

        let mut token = String::new();
        let quoted = c == '\'' || c == '"';
        if quoted {
            let quote = c;
            chars.next();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == quote {
                    closed = true;
                    break;
                }
                token.push(ch);
            }
            if !closed {
                return Err(ParseError::UnmatchedQuote(quote));
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                token.push(ch);
                chars.next();
            }
        }

        match pending {
            Pending::Arg => {
                argv.push(token);
                last_arg_quoted = quoted;
            }
            Pending::Infile => infile = Some(token),
            Pending::Outfile => outfile = Some(token),
        }
        pending = Pending::Arg;
    }

    if pending != Pending::Arg {
        return Err(ParseError::MissingRedirectTarget);
    }

    let background = !last_arg_quoted && argv.last().map(String::as_str) == Some("&");
    if background {
        argv.pop();
    }
    if argv.is_empty() {
        return Ok(None);
    }

    let builtin = Builtin::classify(&argv[0]);
    Ok(Some(CommandLine {
        argv,
        infile,
        outfile,
        builtin,
        background,
    }))
}
