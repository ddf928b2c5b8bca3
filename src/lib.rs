//! `argot` is a command line interpretation engine for Rust.
//!
//! Rather than a single parse call, `argot` runs every invocation through a pipeline of staged steps:
//! * *Tokenize*: the raw arguments are lexed, then rewritten by ordered transformations (ex: `--name=x` becomes `--name x`, `-abc` becomes `-a -b -c`).
//! Every pass is recorded, and each derived token remembers the token it came from.
//! * *Parse input*: the tokens are walked against a statically declared command tree.
//! The result is either a full parse, or one of four parse errors, which are plain data.
//! * *Bind values*: parsed values are merged with defaults (static or environment variable), then checked for arity and type.
//! * *Invoke*: the target command's handler runs, wrapped by the interceptors of its ancestors.
//!
//! Steps are middleware: each receives the execution context and the continuation to the remaining steps.
//! A step may short-circuit the run with an exit code, and steps registered between parsing and binding may inspect or resolve parse errors.
//!
//! Two consumers of the parse state are built in:
//! * Typo suggestions: a parse error is followed by a "Did you mean ..." block of similar names.
//! * Shell completion: the `[suggest]` directive lists what may follow the input.
//!
//! The `[parse]` directive prints every tokenizer pass instead of running.
//!
//! # Usage
//! ```no_run
#![doc = include_str!("../demos/notes.rs")]
//! ```
//!
//! ```console
//! $ notes add --topic work ship the release
//! $ notes remov 0
//! Parse error: unrecognized command or argument 'remov'.
//!
//! Did you mean ...
//!    remove
//!    rm
//!
//! $ notes [suggest] add --topic
//! home
//! misc
//! work
//!
//! $ notes [parse] add -vt=home milk
//! >>> from input
//!      Directive: [parse]
//!          Value: add
//!         Option: -vt=home
//!          Value: milk
//! >>> after: split-option-assignments
//!      Directive: [parse]
//!          Value: add
//!         Option: -vt
//!          Value: home
//!          Value: milk
//! >>> after: expand-clubbed-flags
//!      Directive: [parse]
//!          Value: add
//!         Option: -v
//!         Option: -t
//!          Value: home
//!          Value: milk
//! ```
//!
//! # Exit codes
//! * [`ExitCode::SUCCESS`] (0): the command ran, or a directive was answered.
//! * [`ExitCode::ERROR`] (1): a step failed or panicked, or the input could not be split into arguments.
//! * [`ExitCode::VALIDATION_ERROR`] (2): the input does not fit the command tree.
pub use argot_engine::*;
