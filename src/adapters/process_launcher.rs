//! Spawns the decision and execution processes for a backtest run and
//! waits for them.

use crate::domain::environment::BacktestEnv;
use crate::domain::error::BacktestError;
use std::process::ExitStatus;
use tokio::process::{Child, Command};

pub const DEFAULT_THINKER_CMD: &str = "python3 pt_thinker.py";
pub const DEFAULT_TRADER_CMD: &str = "python3 pt_trader.py";

/// A command to run as a named child process.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSpec {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ChildSpec {
    /// Splits `command_line` on whitespace; `None` when it is blank.
    pub fn from_command_line(name: &str, command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            name: name.to_string(),
            program,
            args: parts.collect(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug)]
pub struct ChildExit {
    pub name: String,
    pub status: ExitStatus,
}

struct Running {
    name: String,
    child: Child,
}

/// Owns the started children. Dropping it kills any still running.
#[derive(Default)]
pub struct Supervisor {
    children: Vec<Running>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Starts `spec` with the backtest variables added to the inherited
    /// environment. Must be called inside a tokio runtime.
    pub fn spawn(&mut self, spec: &ChildSpec, env: &BacktestEnv) -> Result<(), BacktestError> {
        log::info!("Starting {}", spec.command_line());
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(env.to_vars())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BacktestError::ChildProcess {
                name: spec.name.clone(),
                reason: format!("spawn failed: {e}"),
            })?;
        self.children.push(Running {
            name: spec.name.clone(),
            child,
        });
        Ok(())
    }

    async fn wait_all(children: &mut [Running]) -> Result<Vec<ChildExit>, BacktestError> {
        let mut exits = Vec::with_capacity(children.len());
        for running in children.iter_mut() {
            let status = running
                .child
                .wait()
                .await
                .map_err(|e| BacktestError::ChildProcess {
                    name: running.name.clone(),
                    reason: format!("wait failed: {e}"),
                })?;
            log::info!("{} exited with {}", running.name, status);
            exits.push(ChildExit {
                name: running.name.clone(),
                status,
            });
        }
        Ok(exits)
    }

    /// Waits for every child in start order. Exited children are not restarted.
    pub async fn join_all(mut self) -> Result<Vec<ChildExit>, BacktestError> {
        Self::wait_all(&mut self.children).await
    }

    /// Kills every child that is still running.
    pub async fn terminate_all(&mut self) {
        for running in &mut self.children {
            if matches!(running.child.try_wait(), Ok(None)) {
                log::info!("Terminating {}", running.name);
                if let Err(e) = running.child.kill().await {
                    log::warn!("failed to terminate {}: {e}", running.name);
                }
            }
        }
    }

    /// Like [`Supervisor::join_all`], but Ctrl-C terminates all children and
    /// returns [`BacktestError::Interrupted`].
    pub async fn join_or_interrupt(mut self) -> Result<Vec<ChildExit>, BacktestError> {
        let outcome = tokio::select! {
            result = Self::wait_all(&mut self.children) => result,
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Interrupt received");
                Err(BacktestError::Interrupted)
            }
        };
        if outcome.is_err() {
            self.terminate_all().await;
        }
        outcome
    }
}

/// Starts every spec with `env` and waits for all of them on a dedicated
/// runtime. A spawn failure stops the launch and kills what was started.
pub fn launch(env: &BacktestEnv, specs: &[ChildSpec]) -> Result<Vec<ChildExit>, BacktestError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut supervisor = Supervisor::new();
        for spec in specs {
            if let Err(e) = supervisor.spawn(spec, env) {
                supervisor.terminate_all().await;
                return Err(e);
            }
        }
        supervisor.join_or_interrupt().await
    })
}
