/// The fixed phases of an invocation, in execution order.
///
/// Steps are ordered by stage first, then by their order within the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    PreTokenize,
    Tokenize,
    PostTokenizePreParseInput,
    ParseInput,
    PostParseInputPreBindValues,
    BindValues,
    PostBindValuesPreInvoke,
    Invoke,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::PreTokenize,
        Stage::Tokenize,
        Stage::PostTokenizePreParseInput,
        Stage::ParseInput,
        Stage::PostParseInputPreBindValues,
        Stage::BindValues,
        Stage::PostBindValuesPreInvoke,
        Stage::Invoke,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
