use argot::prelude::*;
use argot::{
    AppRunner, Arity, CommandBuilder, ExecutionContext, ExitCode, OperandBuilder, OptionBuilder, Stage, StepError,
    StepResult, TypeDescriptor,
};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

type Notes = Arc<Mutex<Vec<(String, String)>>>;

/// Reads commands from standard in, running each through the same application.
struct Repl {}

#[async_trait]
impl CommandHandler for Repl {
    async fn invoke(&self, context: &mut ExecutionContext) -> StepResult {
        let runner = context
            .runner()
            .cloned()
            .ok_or_else(|| StepError::message("the repl needs a runner."))?;
        let stdin = io::stdin();

        loop {
            print!("notes> ");
            io::stdout().flush().map_err(|e| StepError::Source(Box::new(e)))?;

            let mut line = String::default();
            if stdin.lock().read_line(&mut line).map_err(|e| StepError::Source(Box::new(e)))? == 0 {
                break;
            }

            match line.trim() {
                "" => continue,
                "exit" | "quit" => break,
                line => match runner.run_line(line).await {
                    Ok(exit_code) if !exit_code.is_success() => println!("(exit {})", exit_code.code()),
                    Ok(_) => {}
                    Err(error) => eprintln!("{error}"),
                },
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn main() {
    let notes: Notes = Arc::default();
    let add_notes = notes.clone();
    let list_notes = notes.clone();
    let remove_notes = notes.clone();

    let app = CommandBuilder::new("notes")
        .description("Keep short notes, tagged by topic.")
        .option(
            OptionBuilder::flag("verbose")
                .short('v')
                .inherited()
                .description("Print more detail."),
        )
        .subcommand(
            CommandBuilder::new("add")
                .alias("a")
                .option(
                    OptionBuilder::new("topic")
                        .short('t')
                        .allowed_values(["work", "home", "misc"])
                        .default_value("misc"),
                )
                .operand(OperandBuilder::new("text").arity(Arity::ONE_OR_MORE))
                .action(move |context| {
                    let bindings = context.bindings().ok_or_else(|| StepError::message("unbound"))?;
                    let topic: String = bindings
                        .get("topic")
                        .map_err(|e| StepError::Source(Box::new(e)))?
                        .unwrap_or_default();
                    let text: Vec<String> = bindings.get_all("text").map_err(|e| StepError::Source(Box::new(e)))?;
                    let mut notes = add_notes.lock().map_err(|_| StepError::message("notes poisoned"))?;
                    notes.push((topic, text.join(" ")));

                    if bindings.flag("verbose") {
                        context.interface().print(format!("Added note #{}.", notes.len()));
                    }

                    Ok(ExitCode::SUCCESS)
                }),
        )
        .subcommand(
            CommandBuilder::new("list")
                .alias("ls")
                .option(OptionBuilder::new("topic").short('t').allowed_values(["work", "home", "misc"]))
                .action(move |context| {
                    let bindings = context.bindings().ok_or_else(|| StepError::message("unbound"))?;
                    let topic: Option<String> = bindings.get("topic").map_err(|e| StepError::Source(Box::new(e)))?;
                    let notes = list_notes.lock().map_err(|_| StepError::message("notes poisoned"))?;

                    for (i, (note_topic, text)) in notes.iter().enumerate() {
                        if topic.as_ref().map_or(true, |t| t == note_topic) {
                            context.interface().print(format!("{i}: [{note_topic}] {text}"));
                        }
                    }

                    Ok(ExitCode::SUCCESS)
                }),
        )
        .subcommand(
            CommandBuilder::new("remove")
                .alias("rm")
                .operand(OperandBuilder::new("index").value_type(TypeDescriptor::of::<usize>()))
                .action(move |context| {
                    let bindings = context.bindings().ok_or_else(|| StepError::message("unbound"))?;
                    let index: usize = bindings
                        .get("index")
                        .map_err(|e| StepError::Source(Box::new(e)))?
                        .unwrap_or_default();
                    let mut notes = remove_notes.lock().map_err(|_| StepError::message("notes poisoned"))?;

                    if index >= notes.len() {
                        context.interface().print_error(format!("No note #{index}."));
                        return Ok(ExitCode::VALIDATION_ERROR);
                    }

                    notes.remove(index);
                    Ok(ExitCode::SUCCESS)
                }),
        )
        .subcommand(CommandBuilder::new("repl").hidden().handler(Repl {}));

    let runner = AppRunner::builder(app)
        .step_fn(Stage::PreTokenize, 0, "default-to-repl", |context, next| {
            Box::pin(async move {
                if context.arguments().is_empty() {
                    context.arguments_mut().push("repl".to_string());
                }

                next.run(context).await
            })
        })
        .build()
        .expect("Invalid command configuration");

    runner.run_process();
}
