use futures::future::BoxFuture;
use futures::FutureExt;
use std::env;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::command::{CommandBuilder, CommandTree, ConfigError};
use crate::constant::*;
use crate::model::ExitCode;
use crate::parser::ParserConfig;
use crate::pipeline::*;
use crate::tokens::{split_command_line, LexError, SeparatorStrategy, TokenTransformation, Tokenizer, TokenizerConfig};

/// The behaviour switches of an application.
#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Accept `/name` and `/name:value` options.
    pub allow_slash_prefix: bool,
    /// Match `-name` against long names; disables clubbed flag expansion.
    pub allow_single_hyphen_long_names: bool,
    pub argument_separator: SeparatorStrategy,
    /// Recognize leading `[name]` / `[name:value]` directives.
    pub enable_directives: bool,
    /// Collect surplus values rather than failing on them.
    pub ignore_unexpected_operands: bool,
    /// The size of the "Did you mean" block; 0 disables it.
    pub typo_suggestion_limit: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            allow_slash_prefix: false,
            allow_single_hyphen_long_names: false,
            argument_separator: SeparatorStrategy::default(),
            enable_directives: true,
            ignore_unexpected_operands: false,
            typo_suggestion_limit: DEFAULT_TYPO_SUGGESTION_LIMIT,
        }
    }
}

impl AppSettings {
    pub fn tokenizer_config(&self) -> TokenizerConfig {
        TokenizerConfig {
            allow_slash_prefix: self.allow_slash_prefix,
            allow_single_hyphen_long_names: self.allow_single_hyphen_long_names,
            enable_directives: self.enable_directives,
            separator: self.argument_separator,
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            allow_slash_prefix: self.allow_slash_prefix,
            allow_single_hyphen_long_names: self.allow_single_hyphen_long_names,
            ignore_unexpected_operands: self.ignore_unexpected_operands,
        }
    }
}

/// Configures an [`AppRunner`].
///
/// Steps and transformations may only be registered here; [`AppRunnerBuilder::build`] freezes them.
pub struct AppRunnerBuilder {
    root: CommandBuilder,
    settings: AppSettings,
    interface: Arc<dyn UserInterface>,
    transformations: Vec<Arc<dyn TokenTransformation>>,
    steps: Vec<(Stage, i32, Arc<dyn Middleware>)>,
}

impl AppRunnerBuilder {
    pub fn settings(mut self, settings: AppSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the [`Console`].
    pub fn interface(mut self, interface: Arc<dyn UserInterface>) -> Self {
        self.interface = interface;
        self
    }

    /// Append a token transformation, after the built-in ones.
    pub fn transformation(mut self, transformation: Arc<dyn TokenTransformation>) -> Self {
        self.transformations.push(transformation);
        self
    }

    /// Register a step at `(stage, order)`.
    ///
    /// Built-in steps use order 0 (and 1000 for parse error reporting); ties run built-ins first.
    pub fn step(mut self, stage: Stage, order: i32, step: impl Middleware + 'static) -> Self {
        self.steps.push((stage, order, Arc::new(step)));
        self
    }

    /// Register a closure step at `(stage, order)`.
    ///
    /// ### Example
    /// ```
    /// use argot_engine::{AppRunner, CommandBuilder, ExitCode, Stage};
    ///
    /// let runner = AppRunner::builder(CommandBuilder::new("app").action(|_| Ok(ExitCode::SUCCESS)))
    ///     .step_fn(Stage::PreTokenize, 0, "deny", |_context, _next| {
    ///         Box::pin(async move { Ok(ExitCode(3)) })
    ///     })
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(runner.run_blocking(&["anything"]), ExitCode(3));
    /// ```
    pub fn step_fn<F>(self, stage: Stage, order: i32, name: impl Into<String>, function: F) -> Self
    where
        F: for<'a> Fn(&'a mut ExecutionContext, Next<'a>) -> BoxFuture<'a, StepResult> + Send + Sync + 'static,
    {
        self.step(stage, order, FnStep::new(name, function))
    }

    pub fn build(self) -> Result<AppRunner, ConfigError> {
        let AppRunnerBuilder {
            root,
            settings,
            interface,
            transformations,
            steps,
        } = self;
        let tree = root.build()?;
        let tokenizer = transformations
            .into_iter()
            .fold(Tokenizer::new(settings.tokenizer_config()), |tokenizer, transformation| {
                tokenizer.with_transformation(transformation)
            });

        let mut builder = PipelineBuilder::default()
            .step(Stage::Tokenize, TOKENIZE_ORDER, Arc::new(TokenizeStep::new(tokenizer)))
            .step(
                Stage::PostTokenizePreParseInput,
                PARSE_DIRECTIVE_ORDER,
                Arc::new(ParseDirectiveStep::default()),
            )
            .step(
                Stage::ParseInput,
                PARSE_INPUT_ORDER,
                Arc::new(ParseInputStep::new(settings.parser_config())),
            )
            .step(
                Stage::PostParseInputPreBindValues,
                SUGGEST_DIRECTIVE_ORDER,
                Arc::new(SuggestDirectiveStep::default()),
            )
            .step(
                Stage::PostParseInputPreBindValues,
                PARSE_ERROR_ORDER,
                Arc::new(ParseErrorStep::new(settings.typo_suggestion_limit)),
            )
            .step(Stage::BindValues, BIND_VALUES_ORDER, Arc::new(BindValuesStep::default()))
            .step(Stage::Invoke, INVOKE_ORDER, Arc::new(InvokeStep::default()));

        for (stage, order, step) in steps {
            builder = builder.step(stage, order, step);
        }

        Ok(AppRunner {
            inner: Arc::new(RunnerInner {
                tree: Arc::new(tree),
                interface,
                settings,
                pipeline: builder.build(),
            }),
        })
    }
}

struct RunnerInner {
    tree: Arc<CommandTree>,
    interface: Arc<dyn UserInterface>,
    settings: AppSettings,
    pipeline: Pipeline,
}

/// Runs invocations through the frozen pipeline.
///
/// Cheap to clone; clones share the command tree, settings, console and pipeline.
///
/// ### Example
/// ```
/// use argot_engine::{AppRunner, CommandBuilder, ExitCode, OptionBuilder};
///
/// let runner = AppRunner::builder(
///     CommandBuilder::new("greet")
///         .option(OptionBuilder::new("name"))
///         .action(|context| {
///             let name: Option<String> = context.bindings().unwrap().get("name").unwrap();
///             println!("Hello, {}!", name.unwrap_or_else(|| "world".to_string()));
///             Ok(ExitCode::SUCCESS)
///         }),
/// )
/// .build()
/// .unwrap();
///
/// assert_eq!(runner.run_blocking(&["--name", "argot"]), ExitCode::SUCCESS);
/// assert_eq!(runner.run_blocking(&["--nam", "argot"]), ExitCode::VALIDATION_ERROR);
/// ```
#[derive(Clone)]
pub struct AppRunner {
    inner: Arc<RunnerInner>,
}

impl std::fmt::Debug for AppRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRunner")
            .field("settings", &self.inner.settings)
            .field("pipeline", &self.inner.pipeline)
            .finish()
    }
}

impl AppRunner {
    pub fn builder(root: CommandBuilder) -> AppRunnerBuilder {
        AppRunnerBuilder {
            root,
            settings: AppSettings::default(),
            interface: Arc::new(Console::default()),
            transformations: Vec::default(),
            steps: Vec::default(),
        }
    }

    pub fn tree(&self) -> &Arc<CommandTree> {
        &self.inner.tree
    }

    pub fn settings(&self) -> &AppSettings {
        &self.inner.settings
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn interface(&self) -> &Arc<dyn UserInterface> {
        &self.inner.interface
    }

    /// A fresh context for `arguments`.
    pub fn context<S: AsRef<str>>(&self, arguments: &[S]) -> ExecutionContext {
        ExecutionContext::new(
            arguments.iter().map(|a| a.as_ref().to_string()).collect(),
            self.inner.tree.clone(),
            self.inner.interface.clone(),
        )
        .with_runner(self.clone())
    }

    /// Run one invocation.
    pub async fn run<S: AsRef<str>>(&self, arguments: &[S]) -> ExitCode {
        let mut context = self.context(arguments);
        self.execute(&mut context).await
    }

    /// Run one invocation, observing `cancellation`.
    pub async fn run_with_cancellation<S: AsRef<str>>(
        &self,
        arguments: &[S],
        cancellation: CancellationToken,
    ) -> ExitCode {
        let mut context = self.context(arguments).with_cancellation(cancellation);
        self.execute(&mut context).await
    }

    /// Split `line` shell-style, then run it.
    ///
    /// A lexical failure is returned before any step runs.
    pub async fn run_line(&self, line: &str) -> Result<ExitCode, LexError> {
        let arguments = split_command_line(line)?;
        Ok(self.run(&arguments).await)
    }

    /// Run one invocation on the current thread.
    pub fn run_blocking<S: AsRef<str>>(&self, arguments: &[S]) -> ExitCode {
        futures::executor::block_on(self.run(arguments))
    }

    /// Run against the process arguments, then exit with the resulting code.
    pub fn run_process(&self) -> ! {
        let arguments: Vec<String> = env::args().skip(1).collect();
        let exit_code = self.run_blocking(&arguments);
        std::process::exit(exit_code.code());
    }

    /// Drive `context` through the pipeline.
    ///
    /// A step error or panic ends the run with [`ExitCode::ERROR`]; the remaining steps do not run.
    pub async fn execute(&self, context: &mut ExecutionContext) -> ExitCode {
        let outcome = AssertUnwindSafe(self.inner.pipeline.run(context))
            .catch_unwind()
            .await;
        let exit_code = match outcome {
            Ok(Ok(exit_code)) => exit_code,
            Ok(Err(error)) => {
                context.interface().print_error(error.to_string());
                ExitCode::ERROR
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|m| m.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                context
                    .interface()
                    .print_error(format!("Step error: panicked with '{message}'."));
                ExitCode::ERROR
            }
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Run of {:?} exited with {exit_code:?}.", context.arguments());
        }

        context.set_exit_code(exit_code);
        exit_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{OperandBuilder, OptionBuilder, TypeDescriptor};
    use crate::model::Arity;
    use futures::executor::block_on;
    use rstest::rstest;
    use std::sync::Mutex;

    fn runner(interface: Arc<MemoryInterface>) -> AppRunner {
        AppRunner::builder(
            CommandBuilder::new("app")
                .option(OptionBuilder::new("count").value_type(TypeDescriptor::of::<u32>()))
                .subcommand(
                    CommandBuilder::new("echo")
                        .operand(OperandBuilder::new("words").arity(Arity::ONE_OR_MORE))
                        .action(|context| {
                            let words: Vec<String> = context.bindings().unwrap().get_all("words").unwrap();
                            context.interface().print(words.join(" "));
                            Ok(ExitCode::SUCCESS)
                        }),
                )
                .subcommand(CommandBuilder::new("fail").action(|_| Err(StepError::message("broken"))))
                .subcommand(CommandBuilder::new("panic").action(|_| panic!("kaboom"))),
        )
        .interface(interface)
        .build()
        .unwrap()
    }

    #[rstest]
    #[case(vec!["echo", "a", "b"], ExitCode::SUCCESS, vec!["a b"], vec![])]
    #[case(vec!["--count", "3", "echo", "a"], ExitCode::SUCCESS, vec!["a"], vec![])]
    #[case(vec!["echo"], ExitCode::VALIDATION_ERROR, vec![], vec!["Bind error: missing required argument 'words'."])]
    #[case(vec![], ExitCode::VALIDATION_ERROR, vec![], vec!["Bind error: 'app' requires a subcommand."])]
    #[case(vec!["--count", "x", "echo", "a"], ExitCode::VALIDATION_ERROR, vec![], vec!["Bind error: 'x' is not a valid u32 for '--count': invalid digit found in string."])]
    #[case(vec!["fail"], ExitCode::ERROR, vec![], vec!["Step error: broken"])]
    #[case(vec!["panic"], ExitCode::ERROR, vec![], vec!["Step error: panicked with 'kaboom'."])]
    fn run(
        #[case] arguments: Vec<&str>,
        #[case] expected: ExitCode,
        #[case] messages: Vec<&str>,
        #[case] errors: Vec<&str>,
    ) {
        let interface = Arc::new(MemoryInterface::default());
        let runner = runner(interface.clone());
        assert_eq!(runner.run_blocking(&arguments), expected);
        assert_eq!(interface.consume(), (
            messages.into_iter().map(String::from).collect(),
            errors.into_iter().map(String::from).collect(),
        ));
    }

    #[test]
    fn run_line() {
        let interface = Arc::new(MemoryInterface::default());
        let runner = runner(interface.clone());
        assert_eq!(block_on(runner.run_line("echo 'a  b' c")), Ok(ExitCode::SUCCESS));
        assert_eq!(interface.messages(), vec!["a  b c"]);

        assert_matches!(block_on(runner.run_line("echo 'a")), Err(LexError::UnterminatedQuote { .. }) => {});
    }

    #[test]
    fn run_cancelled() {
        let interface = Arc::new(MemoryInterface::default());
        let runner = runner(interface.clone());
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        assert_eq!(
            block_on(runner.run_with_cancellation(&["echo", "a"], cancellation)),
            ExitCode::ERROR
        );
        assert!(interface.messages().is_empty());
        assert_eq!(interface.errors(), vec!["Step error: the run was cancelled."]);
    }

    #[test]
    fn builtin_steps() {
        let runner = runner(Arc::new(MemoryInterface::default()));
        assert_eq!(
            runner.pipeline().names(),
            vec![
                "tokenize",
                "parse-directive",
                "parse-input",
                "suggest-directive",
                "parse-error",
                "bind-values",
                "invoke",
            ]
        );
    }

    #[test]
    fn user_steps_after_builtins_on_ties() {
        let log = Arc::new(Mutex::new(Vec::default()));
        let first = log.clone();
        let second = log.clone();
        let runner = AppRunner::builder(CommandBuilder::new("app").action(|_| Ok(ExitCode::SUCCESS)))
            .interface(Arc::new(MemoryInterface::default()))
            .step_fn(Stage::ParseInput, 0, "after-parse", move |context, next| {
                first.lock().unwrap().push(context.parse_result().is_some());
                Box::pin(async move { next.run(context).await })
            })
            .step_fn(Stage::ParseInput, -1, "before-parse", move |context, next| {
                second.lock().unwrap().push(context.parse_result().is_some());
                Box::pin(async move { next.run(context).await })
            })
            .build()
            .unwrap();

        let nothing: &[&str] = empty::slice();
        assert_eq!(runner.run_blocking(nothing), ExitCode::SUCCESS);
        assert_eq!(*log.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn exit_code_recorded() {
        let runner = runner(Arc::new(MemoryInterface::default()));
        let mut context = runner.context(&["echo", "a"]);
        assert_eq!(context.exit_code(), None);
        assert_eq!(block_on(runner.execute(&mut context)), ExitCode::SUCCESS);
        assert_eq!(context.exit_code(), Some(ExitCode::SUCCESS));
        assert!(context.bindings().is_some());
    }

    #[test]
    fn build_invalid() {
        let outcome = AppRunner::builder(
            CommandBuilder::new("app")
                .option(OptionBuilder::new("x"))
                .option(OptionBuilder::new("x")),
        )
        .build();
        assert_matches!(outcome, Err(ConfigError(_)));
    }
}
