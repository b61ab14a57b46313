use indexmap::IndexMap;

use crate::{
    builder::build_expression_tree,
    compiler::{compile_session, CompiledSession},
    config::CompilerConfig,
    error::FlowflatError,
    parser::parse_schema,
    resolver::StaticContext,
    tokenizer::tokenize_schema,
    types::ExpressionTree,
    utils::quote,
};

/// All schema files taking part in one compilation, keyed by path in
/// registration order.
///
/// Registration is write-once per path. Once every file is registered,
/// [`Session::compile`] resolves, validates, orders and lays out the whole set.
#[derive(Debug, Default)]
pub struct Session {
    files: IndexMap<String, ExpressionTree>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>, tree: ExpressionTree) -> Result<(), FlowflatError> {
        let path = path.into();
        if self.files.contains_key(&path) {
            return Err(FlowflatError::DuplicateDefinition(format!(
                "File {} was registered twice",
                quote(&path)
            )));
        }
        log::debug!("registered {}", quote(&path));
        self.files.insert(path, tree);
        Ok(())
    }

    /// Tokenizes, parses and builds `text`, then registers the result.
    pub fn register_source(&mut self, path: impl Into<String>, text: &str) -> Result<(), FlowflatError> {
        let tokens = tokenize_schema(text)?;
        let schema = parse_schema(&tokens)?;
        let tree = build_expression_tree(&schema)?;
        self.register(path, tree)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &ExpressionTree)> {
        self.files.iter().map(|(path, tree)| (path.as_str(), tree))
    }

    pub fn file(&self, path: &str) -> Option<&ExpressionTree> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolution context for names used inside the file registered as `path`.
    pub fn context(&self, path: &str) -> Option<StaticContext<'_>> {
        self.files
            .get(path)
            .map(|tree| StaticContext::new(self, tree))
    }

    pub fn compile(&self, config: &CompilerConfig) -> Result<CompiledSession, FlowflatError> {
        compile_session(self, config)
    }
}
