pub(crate) const LONG_PREFIX: &str = "--";
pub(crate) const SHORT_PREFIX: &str = "-";
pub(crate) const SLASH_PREFIX: &str = "/";
pub(crate) const END_OF_OPTIONS: &str = "--";
pub(crate) const ASSIGNMENT_DELIMITERS: [char; 2] = ['=', ':'];

pub(crate) const DIRECTIVE_OPEN: char = '[';
pub(crate) const DIRECTIVE_CLOSE: char = ']';
pub(crate) const DIRECTIVE_VALUE_DELIMITER: char = ':';
pub(crate) const PARSE_DIRECTIVE: &str = "parse";
pub(crate) const SUGGEST_DIRECTIVE: &str = "suggest";

pub(crate) const SPLIT_ASSIGNMENTS_NAME: &str = "split-option-assignments";
pub(crate) const EXPAND_CLUBBED_NAME: &str = "expand-clubbed-flags";

pub(crate) const FLAG_TRUE: &str = "true";
pub(crate) const FLAG_FALSE: &str = "false";

// Typo suggestions need a score above the floor; unrelated names beyond the cutoff are dropped.
pub(crate) const TYPO_SCORE_FLOOR: i64 = -3;
pub(crate) const TYPO_DISTANCE_CUTOFF: usize = 3;
pub(crate) const DEFAULT_TYPO_SUGGESTION_LIMIT: usize = 5;

pub(crate) const TOKENIZE_ORDER: i32 = 0;
pub(crate) const PARSE_DIRECTIVE_ORDER: i32 = 0;
pub(crate) const PARSE_INPUT_ORDER: i32 = 0;
pub(crate) const SUGGEST_DIRECTIVE_ORDER: i32 = 0;
pub(crate) const PARSE_ERROR_ORDER: i32 = 1000;
pub(crate) const BIND_VALUES_ORDER: i32 = 0;
pub(crate) const INVOKE_ORDER: i32 = 0;
