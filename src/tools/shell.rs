//! Shell toolkit — runs local commands after operator confirmation.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use serde_json::{json, Value};
use tracing::warn;

use crate::schema::{MethodDecl, ParamDecl};
use crate::tools::{Arguments, Toolkit};

pub struct ShellToolkit;

impl ShellToolkit {
    pub fn new() -> Self {
        Self
    }

    /// Ask the operator on stdin whether the command may run. Blocking
    /// reads happen off the async runtime.
    async fn confirm(&self, command: &str) -> Result<bool> {
        println!(
            "\n{} {}",
            "Shell Command Execution Request:".cyan().bold(),
            command
        );
        let answer = tokio::task::spawn_blocking(|| {
            use std::io::Write;
            print!("Do you want to execute this shell command? (yes/no): ");
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .context("Confirmation prompt task failed")?
        .context("Failed to read confirmation")?;

        let answer = answer.trim().to_lowercase();
        Ok(answer == "yes" || answer == "y")
    }

    async fn run(&self, command: &str) -> Result<Value> {
        if !self.confirm(command).await? {
            warn!("Shell command aborted by user: {}", command);
            return Ok(json!({
                "status": "aborted",
                "message": "Command execution aborted by user.",
            }));
        }

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .await
            .with_context(|| format!("Failed to execute command: {}", command))?;

        Ok(json!({
            "status": "success",
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
            "returncode": output.status.code(),
        }))
    }
}

impl Default for ShellToolkit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolkit for ShellToolkit {
    fn name(&self) -> &str {
        "shell"
    }

    fn methods(&self) -> Vec<MethodDecl> {
        vec![MethodDecl::new(
            "run_shell_command",
            "Execute a shell command on the local machine after obtaining user verification. \
             Ask the user to confirm the execution before running the command.",
            vec![ParamDecl::required(
                "command",
                "String",
                "Shell command to be executed on the host machine",
            )],
        )]
    }

    async fn invoke(&self, method: &str, args: &Arguments) -> Result<Value> {
        match method {
            "run_shell_command" => {
                let command = args
                    .get("command")
                    .and_then(Value::as_str)
                    .context("Missing 'command' argument")?;
                self.run(command).await
            }
            other => bail!("Unknown method: {}", other),
        }
    }
}
