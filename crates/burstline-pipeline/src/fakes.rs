//! Scripted compiler fakes (testing only)
//!
//! Provides `ScriptedInvoker`, a `CompilerInvoker` that records every request
//! and returns scripted outcomes without spawning a process.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::compiler::{CompileOutput, CompileRequest, CompilerInvoker};
use crate::diagnostics::{parse_diagnostics, Diagnostic};
use crate::error::Result;

// ---------------------------------------------------------------------------
// ScriptedInvoker
// ---------------------------------------------------------------------------

/// In-memory invoker with per-assembly scripted failures.
///
/// Successful invocations optionally write placeholder artifacts at the
/// request's output path, so staging logic can be exercised end to end.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    failures: Mutex<HashSet<String>>,
    requests: Mutex<Vec<CompileRequest>>,
    produce_outputs: bool,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an invoker that writes placeholder `.dll`/`.pdb`/`.txt` files
    /// for every successful invocation.
    pub fn producing_outputs() -> Self {
        Self {
            produce_outputs: true,
            ..Self::default()
        }
    }

    /// Script every invocation for `assembly_name` to fail with a diagnostic.
    pub fn fail_for(&self, assembly_name: &str) {
        let mut failures = self.failures.lock().unwrap();
        failures.insert(assembly_name.to_string());
    }

    /// All requests received so far, in invocation order.
    pub fn recorded(&self) -> Vec<CompileRequest> {
        let requests = self.requests.lock().unwrap();
        requests.clone()
    }

    pub fn request_count(&self) -> usize {
        let requests = self.requests.lock().unwrap();
        requests.len()
    }

    fn failure_output(request: &CompileRequest) -> CompileOutput {
        let stderr = format!(
            "{}.cs(1,1): error BC9999: scripted failure for {}",
            request.assembly_name, request.combination.subdirectory
        );
        CompileOutput {
            exit_code: 1,
            stdout: String::new(),
            diagnostics: parse_diagnostics(&stderr),
            stderr,
            duration_ms: 0,
        }
    }

    fn write_placeholders(request: &CompileRequest) -> std::io::Result<()> {
        if let Some(parent) = request.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        for extension in ["dll", "pdb", "txt"] {
            let path = request.output_path.with_extension(extension);
            std::fs::write(path, format!("{} {}", request.assembly_name, extension))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CompilerInvoker for ScriptedInvoker {
    async fn compile(&self, request: &CompileRequest) -> Result<CompileOutput> {
        {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
        }

        let scripted_failure = {
            let failures = self.failures.lock().unwrap();
            failures.contains(&request.assembly_name)
        };
        if scripted_failure {
            return Ok(Self::failure_output(request));
        }

        if self.produce_outputs {
            Self::write_placeholders(request)?;
        }

        Ok(CompileOutput {
            exit_code: 0,
            stdout: format!("compiled {}", request.assembly_name),
            stderr: String::new(),
            duration_ms: 0,
            diagnostics: Vec::<Diagnostic>::new(),
        })
    }
}
