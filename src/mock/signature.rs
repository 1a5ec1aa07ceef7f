//! Scripted stand-in for `gpg`

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::signing::{SignatureTool, SigningError, ToolOutput};

/// One recorded invocation
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub home: PathBuf,
    pub args: Vec<String>,
    pub stdin: Vec<u8>,
}

/// Returns queued outputs in order; a drained queue answers with a failure
#[derive(Debug, Default)]
pub struct ScriptedSignatureTool {
    outputs: Mutex<VecDeque<Result<ToolOutput, String>>>,
    calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedSignatureTool {
    pub fn new(outputs: Vec<ToolOutput>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an output after the ones already scripted
    pub fn then_output(self, output: ToolOutput) -> Self {
        self.queue().push_back(Ok(output));
        self
    }

    /// Queue an invocation that fails to run at all
    pub fn then_error(self, message: &str) -> Self {
        self.queue().push_back(Err(message.to_string()));
        self
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<ToolOutput, String>>> {
        self.outputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SignatureTool for ScriptedSignatureTool {
    fn run(&self, home: &Path, args: &[String], stdin: &[u8]) -> Result<ToolOutput, SigningError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ToolCall {
                home: home.to_path_buf(),
                args: args.to_vec(),
                stdin: stdin.to_vec(),
            });
        match self.queue().pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(SigningError::Tool(message)),
            None => Ok(ToolOutput {
                success: false,
                stdout: String::new(),
                stderr: "no scripted output".to_string(),
            }),
        }
    }
}
