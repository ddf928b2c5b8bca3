use std::collections::{BTreeMap, HashMap};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::command::{Argument, ArgumentId, CommandId, CommandTree, DefaultValue};
use crate::model::ValueSource;
use crate::parser::result::*;

/// A violation found while binding the parsed values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Bind error: missing required argument '{name}'.")]
    MissingArgument { argument: ArgumentId, name: String },

    #[error("Bind error: too few values provided for '{name}' (provided={provided}, expected at least {minimum}).")]
    TooFewValues {
        argument: ArgumentId,
        name: String,
        provided: usize,
        minimum: usize,
    },

    #[error("Bind error: too many values provided for '{name}' (provided={provided}, expected at most {maximum}).")]
    TooManyValues {
        argument: ArgumentId,
        name: String,
        provided: usize,
        maximum: usize,
    },

    #[error("Bind error: '{value}' is not a valid {type_name} for '{name}': {message}.")]
    InvalidValue {
        argument: ArgumentId,
        name: String,
        value: String,
        type_name: &'static str,
        message: String,
    },

    #[error("Bind error: '{command}' requires a subcommand.")]
    MissingSubcommand { command: String },
}

/// A failure to extract a bound value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("Value error: no argument named '{0}'.")]
    UnknownArgument(String),

    #[error("Value error: cannot convert '{value}' to {type_name}.")]
    InvalidConversion {
        value: String,
        type_name: &'static str,
    },
}

/// The merged values of one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundValue {
    argument: ArgumentId,
    sources: Vec<ValueSource>,
    values: Vec<String>,
}

impl BoundValue {
    pub fn argument(&self) -> ArgumentId {
        self.argument
    }

    /// Each contributing source, in contribution order.
    pub fn sources(&self) -> &[ValueSource] {
        &self.sources
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// The validated values of every argument along the path to the target command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    target: CommandId,
    names: HashMap<String, ArgumentId>,
    values: BTreeMap<ArgumentId, BoundValue>,
}

impl Bindings {
    pub fn target(&self) -> CommandId {
        self.target
    }

    fn lookup(&self, name: &str) -> Result<Option<&BoundValue>, ValueError> {
        match self.names.get(name) {
            Some(id) => Ok(self.values.get(id)),
            None => Err(ValueError::UnknownArgument(name.to_string())),
        }
    }

    /// Whether the argument received any value (including a default).
    pub fn is_present(&self, name: &str) -> bool {
        matches!(self.lookup(name), Ok(Some(_)))
    }

    /// The raw values of an argument.
    pub fn raw(&self, name: &str) -> Option<&[String]> {
        self.lookup(name)
            .ok()
            .flatten()
            .map(BoundValue::values)
    }

    /// The first source which contributed to the argument.
    pub fn source(&self, name: &str) -> Option<&ValueSource> {
        self.lookup(name)
            .ok()
            .flatten()
            .and_then(|b| b.sources.first())
    }

    pub fn bound(&self, name: &str) -> Option<&BoundValue> {
        self.lookup(name).ok().flatten()
    }

    /// The last value of a single-valued argument, coerced to `T`.
    pub fn get<T: FromStr>(&self, name: &str) -> Result<Option<T>, ValueError> {
        match self.lookup(name)?.and_then(|b| b.values.last()) {
            Some(value) => convert(value).map(Some),
            None => Ok(None),
        }
    }

    /// Every value of the argument, coerced to `T`.
    pub fn get_all<T: FromStr>(&self, name: &str) -> Result<Vec<T>, ValueError> {
        match self.lookup(name)? {
            Some(bound) => bound.values.iter().map(|v| convert(v)).collect(),
            None => Ok(Vec::default()),
        }
    }

    /// Whether a flag is set: present and not explicitly `false`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get::<bool>(name), Ok(Some(true)))
    }
}

fn convert<T: FromStr>(value: &str) -> Result<T, ValueError> {
    T::from_str(value).map_err(|_| ValueError::InvalidConversion {
        value: value.to_string(),
        type_name: std::any::type_name::<T>(),
    })
}

/// Merge, default, and validate the values of a successful parse.
///
/// Every argument along the path from the root to the target is considered.
/// All violations are reported, not only the first.
pub fn bind(tree: &CommandTree, result: &ParseResult) -> Result<Bindings, Vec<BindError>> {
    let target = result.target();

    if !tree.command(target).is_invocable() {
        return Err(vec![BindError::MissingSubcommand {
            command: tree.full_name(target),
        }]);
    }

    let mut names = HashMap::default();
    let mut values = BTreeMap::default();
    let mut errors = Vec::default();

    for command in tree.path(target) {
        for argument in tree.command(command).arguments() {
            // Nearer commands shadow their ancestors' names.
            names.insert(argument.name().to_string(), argument.id());

            match bind_argument(argument, result.inputs(argument.id())) {
                Ok(Some(bound)) => {
                    values.insert(argument.id(), bound);
                }
                Ok(None) => {}
                Err(mut e) => errors.append(&mut e),
            }
        }
    }

    #[cfg(feature = "tracing_debug")]
    {
        debug!("Bound {} arguments with {} errors.", values.len(), errors.len());
    }

    if errors.is_empty() {
        Ok(Bindings {
            target,
            names,
            values,
        })
    } else {
        Err(errors)
    }
}

fn default_input(argument: &Argument) -> Option<InputValue> {
    match argument.default()? {
        DefaultValue::Static(values) => Some(InputValue::new(ValueSource::Default, values.clone())),
        DefaultValue::EnvVar(variable) => env::var(variable)
            .ok()
            .map(|value| InputValue::new(ValueSource::EnvVar(variable.clone()), vec![value])),
    }
}

fn bind_argument(argument: &Argument, inputs: &[InputValue]) -> Result<Option<BoundValue>, Vec<BindError>> {
    let defaulted;
    let inputs = if inputs.is_empty() {
        defaulted = default_input(argument);
        match &defaulted {
            Some(input) => std::slice::from_ref(input),
            None => &[],
        }
    } else {
        inputs
    };

    let provided: usize = inputs.iter().map(|i| i.values().len()).sum();
    let arity = argument.arity();
    let mut errors = Vec::default();

    if provided == 0 && arity.is_required() {
        errors.push(BindError::MissingArgument {
            argument: argument.id(),
            name: argument.display_name(),
        });
    } else if provided < arity.minimum() {
        errors.push(BindError::TooFewValues {
            argument: argument.id(),
            name: argument.display_name(),
            provided,
            minimum: arity.minimum(),
        });
    }

    if let Some(maximum) = arity.maximum() {
        if provided > maximum {
            errors.push(BindError::TooManyValues {
                argument: argument.id(),
                name: argument.display_name(),
                provided,
                maximum,
            });
        }
    }

    for value in inputs.iter().flat_map(|i| i.values()) {
        if let Err(message) = argument.type_descriptor().check(value) {
            errors.push(BindError::InvalidValue {
                argument: argument.id(),
                name: argument.display_name(),
                value: value.clone(),
                type_name: argument.type_descriptor().name(),
                message,
            });
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    if provided == 0 {
        return Ok(None);
    }

    Ok(Some(BoundValue {
        argument: argument.id(),
        sources: inputs.iter().map(|i| i.source().clone()).collect(),
        values: inputs
            .iter()
            .flat_map(|i| i.values().iter().cloned())
            .collect(),
    }))
}
