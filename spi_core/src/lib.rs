use serde::{Deserialize, Serialize};
use log::{debug, error, info};
use language::interpreter::call_stack::{Memory, StackEvent};
use language::interpreter::{DEFAULT_MAX_CALL_DEPTH, MAX_CALL_DEPTH_LIMIT};
use language::{Interpreter, Lexer, Parser, SemanticAnalyzer};

pub mod language;

pub use language::{Error, ErrorCode, ErrorKind, Result, Value};

/// Stack for lexing, parsing, analysis and the deepest expressions.
const BASE_STACK_BYTES: usize = 32 * 1024 * 1024;
/// Extra stack for each permitted activation record.
const STACK_BYTES_PER_CALL: usize = 64 * 1024;

/// Tracing and limits for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Report scope entry, exit and contents at `info`.
    pub log_scope: bool,
    /// Report the call stack at `info` and collect [`StackEvent`]s.
    pub log_stack: bool,
    /// Capped at [`MAX_CALL_DEPTH_LIMIT`].
    pub max_call_depth: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            log_scope: false,
            log_stack: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub program: String,
    pub memory: Memory,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack_events: Vec<StackEvent>,
}

/// Runs `job` on a dedicated thread whose stack fits `max_call_depth` records.
fn on_pipeline_thread<T: Send>(max_call_depth: usize, job: impl FnOnce() -> Result<T> + Send) -> Result<T> {
    let stack_size = BASE_STACK_BYTES + max_call_depth.min(MAX_CALL_DEPTH_LIMIT) * STACK_BYTES_PER_CALL;
    debug!("Starting pipeline thread with a {} byte stack", stack_size);

    std::thread::scope(|scope| {
        let spawned = std::thread::Builder::new()
            .name("spi-pipeline".to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, job);
        match spawned {
            Ok(handle) => handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
            Err(e) => runtime_error!(
                ErrorCode::StackUnavailable,
                format!("Could not start the interpreter thread with a {} byte stack: {}", stack_size, e)
            ),
        }
    })
}

/// Lexes, parses, analyzes and runs a whole program.
pub fn run_source(source: &str, options: &RunOptions) -> Result<RunOutcome> {
    on_pipeline_thread(options.max_call_depth, || run_pipeline(source, options))
}

fn run_pipeline(source: &str, options: &RunOptions) -> Result<RunOutcome> {
    info!("Running program ({} bytes)", source.len());

    let tree = language::parse(source)?;
    let program = match &tree {
        language::AstNode::Program { name, .. } => name.clone(),
        other => other.kind_name().to_string(),
    };

    let mut analyzer = SemanticAnalyzer::new().with_scope_logging(options.log_scope);
    analyzer.analyze(&tree).inspect_err(|e| error!("Semantic analysis failed: {}", e))?;
    info!("Semantic analysis of '{}' succeeded", program);

    let mut interpreter = Interpreter::new(&tree)
        .with_stack_logging(options.log_stack)
        .with_max_call_depth(options.max_call_depth);
    interpreter.interpret().inspect_err(|e| error!("Execution of '{}' failed: {}", program, e))?;

    let (memory, stack_events) = interpreter.into_parts();
    Ok(RunOutcome { program, memory, stack_events })
}

/// Evaluates a standalone arithmetic expression such as `7 + 3 * (10 DIV (12 DIV (3 + 1) - 1))`.
pub fn evaluate_expression(text: &str) -> Result<Value> {
    debug!("Evaluating expression '{}'", text);

    on_pipeline_thread(0, || {
        let expr = Parser::new(Lexer::new(text))?.parse_expression()?;
        SemanticAnalyzer::new().analyze_expression(&expr)?;
        Interpreter::new(&expr).evaluate()
    })
}

/// Parses a program and renders it back in canonical layout.
pub fn format_source(source: &str) -> Result<String> {
    on_pipeline_thread(0, || {
        let tree = language::parse(source)?;
        Ok(tree.to_string())
    })
}
