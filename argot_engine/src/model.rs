/// The occurrence constraint of an argument: how many values it accepts.
///
/// Inspired by argparse nargs, expressed as a (minimum, maximum) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Between the first and second value (inclusive).
    Range(u8, u8),
    /// At least this many values, with no upper limit.
    Lower(u8),
}

impl Arity {
    /// `[0]`: never takes a value.
    pub const ZERO: Arity = Arity::Range(0, 0);
    /// `[0, 1]`: may be omitted.
    pub const ZERO_OR_ONE: Arity = Arity::Range(0, 1);
    /// `[1]`: precisely one value.
    pub const EXACTLY_ONE: Arity = Arity::Range(1, 1);
    /// `[0, ∞)`: any amount.
    pub const ZERO_OR_MORE: Arity = Arity::Lower(0);
    /// `[1, ∞)`: at least one.
    pub const ONE_OR_MORE: Arity = Arity::Lower(1);

    /// The minimum number of values.
    pub fn minimum(&self) -> usize {
        match self {
            Arity::Range(minimum, _) | Arity::Lower(minimum) => *minimum as usize,
        }
    }

    /// The maximum number of values, or `None` when unbounded.
    pub fn maximum(&self) -> Option<usize> {
        match self {
            Arity::Range(_, maximum) => Some(*maximum as usize),
            Arity::Lower(_) => None,
        }
    }

    /// Whether `count` values still leave room for another.
    pub fn accepts_more(&self, count: usize) -> bool {
        match self.maximum() {
            Some(maximum) => count < maximum,
            None => true,
        }
    }

    /// Whether more than a single value may be captured.
    pub fn is_list(&self) -> bool {
        match self {
            Arity::Range(_, maximum) => *maximum > 1,
            Arity::Lower(_) => true,
        }
    }

    /// Whether the argument must receive at least one value.
    pub fn is_required(&self) -> bool {
        self.minimum() > 0
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Range(i, j) if i == j => write!(f, "[{i}]"),
            Arity::Range(i, j) => write!(f, "[{i}, {j}]"),
            Arity::Lower(i) => write!(f, "[{i}, ∞)"),
        }
    }
}

/// Where an input value came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSource {
    /// Typed on the command line.
    Cli,
    /// Supplied by an interactive prompt.
    Prompt,
    /// Read from piped standard input.
    Piped,
    /// The argument's declared default.
    Default,
    /// The environment variable named by the argument's default.
    EnvVar(String),
    /// Any other collaborator, named by a short tag.
    Other(String),
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Cli => write!(f, "cli"),
            ValueSource::Prompt => write!(f, "prompt"),
            ValueSource::Piped => write!(f, "piped"),
            ValueSource::Default => write!(f, "default"),
            ValueSource::EnvVar(name) => write!(f, "env:{name}"),
            ValueSource::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// The result of one invocation, as seen by a calling script.
///
/// The three classes (success, internal failure, parse/validation failure) never share a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExitCode(pub i32);

impl ExitCode {
    /// The run completed.
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// Internal failure: a step faulted, or the input could not be lexed.
    pub const ERROR: ExitCode = ExitCode(1);
    /// The input did not parse or bind.
    pub const VALIDATION_ERROR: ExitCode = ExitCode(2);

    /// The raw process exit code.
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Whether this is [`ExitCode::SUCCESS`].
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Standard, prelude::Distribution, thread_rng, Rng};
    use rstest::rstest;

    impl Distribution<Arity> for Standard {
        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Arity {
            match rng.gen_range(0..2) {
                0 => {
                    let upper: u8 = rng.gen();

                    if upper == 0 {
                        Arity::Range(0, upper)
                    } else {
                        Arity::Range(rng.gen_range(0..upper), upper)
                    }
                }
                1 => Arity::Lower(rng.gen()),
                _ => unreachable!("internal error - impossible gen_range()"),
            }
        }
    }

    #[test]
    fn arity_bounds() {
        for _ in 0..100 {
            let arity: Arity = thread_rng().gen();

            match arity.maximum() {
                Some(maximum) => {
                    assert!(arity.minimum() <= maximum);
                    assert!(!arity.accepts_more(maximum));
                }
                None => assert!(arity.accepts_more(usize::MAX - 1)),
            }
        }
    }

    #[rstest]
    #[case(Arity::ZERO, 0, false, false)]
    #[case(Arity::ZERO_OR_ONE, 0, true, false)]
    #[case(Arity::EXACTLY_ONE, 0, true, false)]
    #[case(Arity::EXACTLY_ONE, 1, false, false)]
    #[case(Arity::Range(1, 3), 2, true, true)]
    #[case(Arity::ZERO_OR_MORE, 10, true, true)]
    #[case(Arity::ONE_OR_MORE, 0, true, true)]
    fn arity_accepts(
        #[case] arity: Arity,
        #[case] count: usize,
        #[case] accepts_more: bool,
        #[case] is_list: bool,
    ) {
        assert_eq!(arity.accepts_more(count), accepts_more);
        assert_eq!(arity.is_list(), is_list);
    }

    #[rstest]
    #[case(Arity::EXACTLY_ONE, "[1]")]
    #[case(Arity::Range(0, 2), "[0, 2]")]
    #[case(Arity::ONE_OR_MORE, "[1, ∞)")]
    fn arity_display(#[case] arity: Arity, #[case] expected: &str) {
        assert_eq!(arity.to_string(), expected);
    }

    #[test]
    fn exit_code_classes() {
        assert_ne!(ExitCode::SUCCESS, ExitCode::ERROR);
        assert_ne!(ExitCode::SUCCESS, ExitCode::VALIDATION_ERROR);
        assert_ne!(ExitCode::ERROR, ExitCode::VALIDATION_ERROR);
        assert!(ExitCode::SUCCESS.is_success());
    }
}
