//! Line-oriented text command protocol.
//!
//! One line of input becomes one [`Command`]. The grammar is a fixed, ordered
//! rule table keyed on the first whitespace-separated token:
//!
//! | Line                  | Result                                   |
//! |-----------------------|------------------------------------------|
//! | `exit`                | [`Command::Terminate`]                   |
//! | `reconnect`           | [`Command::Reconnect`]                   |
//! | `help`                | [`Command::Help`]                        |
//! | `. XX XX XX`          | raw 3 bytes, hex, masked `ff 7f 7f`      |
//! | `CC <ctrl> <value>`   | `B0 ctrl value`                          |
//! | `N <note> <velocity>` | `90 note velocity`                       |
//! | `n <note> <velocity>` | `80 note velocity`                       |
//! | `2 <int> <int>`       | raw 2 bytes                              |
//! | `1 <int>`             | raw 1 byte                               |
//! | anything else         | [`Command::Unrecognized`]                |
//!
//! Keywords are case-sensitive and must be a whole token. Message rules need
//! exactly their number of arguments; directives ignore trailing tokens.
//! `<int>` is read like C's `%i`: an optional sign, then `0x` for hex, a
//! leading `0` for octal, decimal otherwise. Values are truncated to a byte in
//! two's complement, so `-1` becomes `0x7f` in a data byte.
//!
//! Parsing is pure and allocation-free; [`Dispatcher`](crate::Dispatcher)
//! turns the result into queue pushes and control actions.

use crate::event::MidiEvent;

/// Usage text printed for the `help` command.
pub const HELP_TEXT: &str = "\
Commands (one per line):
  N <note> <velocity>     note on              (90 nn vv)
  n <note> <velocity>     note off             (80 nn vv)
  CC <ctrl> <value>       control change       (B0 cc vv)
  . XX XX XX              raw 3-byte message, hex
  2 <int> <int>           raw 2-byte message
  1 <int>                 raw 1-byte message
  reconnect               reconnect the output to the ports given at startup
  help                    show this text
  exit                    quit
Integers accept 0x.. (hex) and 0.. (octal), so 08 is rejected.
Extra or missing arguments are rejected. Data bytes are masked to 0..127.";

/// Diagnostic printed for a line that matches no rule.
pub const INVALID_MESSAGE: &str = "invalid message, try 'help'";

/// Result of parsing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop the client.
    Terminate,
    /// Re-run the startup port connections.
    Reconnect,
    /// Print [`HELP_TEXT`].
    Help,
    /// Queue this event for the next cycle.
    Message(MidiEvent),
    /// The line matched no rule.
    Unrecognized,
}

impl Command {
    /// The event carried by a [`Command::Message`].
    pub fn event(&self) -> Option<&MidiEvent> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    /// `true` for commands that steer the control loop instead of producing MIDI.
    pub fn is_directive(&self) -> bool {
        matches!(self, Self::Terminate | Self::Reconnect | Self::Help)
    }
}

/// How integer arguments of a rule are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    /// Base 16, optional `0x` prefix (`%x`).
    Hex,
    /// Base from prefix (`%i`).
    Auto,
}

/// What a rule produces once its arguments are parsed.
#[derive(Debug, Clone, Copy)]
enum Build {
    /// A directive; arguments are ignored.
    Directive(Command),
    /// `status, a & 0x7f, b & 0x7f`
    Channel(u8),
    /// `a & 0xff, b & 0x7f, c & 0x7f`
    Raw3,
    /// `a & 0xff, b & 0xff`
    Raw2,
    /// `a & 0xff`
    Raw1,
}

struct Rule {
    keyword: &'static str,
    arity: usize,
    radix: Radix,
    build: Build,
}

impl Rule {
    const fn directive(keyword: &'static str, command: Command) -> Self {
        Self {
            keyword,
            arity: 0,
            radix: Radix::Auto,
            build: Build::Directive(command),
        }
    }

    const fn message(keyword: &'static str, arity: usize, radix: Radix, build: Build) -> Self {
        Self {
            keyword,
            arity,
            radix,
            build,
        }
    }
}

/// Evaluation order is match order.
const RULES: &[Rule] = &[
    Rule::directive("exit", Command::Terminate),
    Rule::directive("reconnect", Command::Reconnect),
    Rule::directive("help", Command::Help),
    Rule::message(".", 3, Radix::Hex, Build::Raw3),
    Rule::message("CC", 2, Radix::Auto, Build::Channel(0xB0)),
    Rule::message("N", 2, Radix::Auto, Build::Channel(0x90)),
    Rule::message("n", 2, Radix::Auto, Build::Channel(0x80)),
    Rule::message("2", 2, Radix::Auto, Build::Raw2),
    Rule::message("1", 1, Radix::Auto, Build::Raw1),
];

/// Most arguments any rule takes.
const MAX_ARGS: usize = 3;

/// Parses one line of input. Trailing `\n` / `\r\n` are ignored.
pub fn parse_command(line: &str) -> Command {
    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Command::Unrecognized;
    };

    // Collect one extra slot so over-long lines can be told apart.
    let mut args = [""; MAX_ARGS + 1];
    let mut argc = 0;
    for token in tokens {
        if argc == args.len() {
            break;
        }
        args[argc] = token;
        argc += 1;
    }

    let Some(rule) = RULES.iter().find(|rule| rule.keyword == keyword) else {
        return Command::Unrecognized;
    };

    if let Build::Directive(command) = rule.build {
        return command;
    }
    if argc != rule.arity {
        return Command::Unrecognized;
    }

    let mut values = [0i64; MAX_ARGS];
    for (value, token) in values.iter_mut().zip(&args[..argc]) {
        match parse_int(token, rule.radix) {
            Some(v) => *value = v,
            None => return Command::Unrecognized,
        }
    }

    let [a, b, c] = values.map(|v| v as u8);
    let event = match rule.build {
        Build::Channel(status) => MidiEvent::three(status, a & 0x7f, b & 0x7f),
        Build::Raw3 => MidiEvent::three(a, b & 0x7f, c & 0x7f),
        Build::Raw2 => MidiEvent::two(a, b),
        Build::Raw1 => MidiEvent::one(a),
        Build::Directive(command) => return command,
    };
    Command::Message(event)
}

/// Reads an integer token the way `%x` / `%i` would.
fn parse_int(token: &str, radix: Radix) -> Option<i64> {
    let (negative, unsigned) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    let hex = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"));

    let (base, digits) = match (radix, hex) {
        (_, Some(rest)) => (16, rest),
        (Radix::Hex, None) => (16, unsigned),
        (Radix::Auto, None) if unsigned.len() > 1 && unsigned.starts_with('0') => {
            (8, &unsigned[1..])
        }
        (Radix::Auto, None) => (10, unsigned),
    };

    // from_str_radix accepts its own sign; one sign per token is enough.
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, base).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
