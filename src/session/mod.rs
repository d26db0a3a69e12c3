//! Interpreter worker thread and its async handle.
//!
//! The interpreter cannot leave the thread that created it, so a session keeps
//! its [`PythonRepl`] on a dedicated thread and feeds it requests one at a
//! time over a channel.

use std::{collections::HashMap, thread};

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use crate::{
    config::Config,
    execution::{python::PythonRepl, ExecutionError, ExecutionResult},
};

enum Request {
    Run {
        command: String,
        reply: oneshot::Sender<String>,
    },
    Execute {
        command: String,
        reply: oneshot::Sender<ExecutionResult>,
    },
    Set {
        name: String,
        value: Value,
        reply: oneshot::Sender<Result<(), ExecutionError>>,
    },
    Get {
        name: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Variables {
        reply: oneshot::Sender<HashMap<String, String>>,
    },
}

/// Cloneable handle to one interpreter session. Requests from every clone are
/// served in arrival order; the worker stops when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct ReplSession {
    tx: mpsc::UnboundedSender<Request>,
}

impl ReplSession {
    pub fn spawn(config: Config) -> Result<Self> {
        Self::spawn_with_namespace(config, Map::new())
    }

    pub fn spawn_with_namespace(config: Config, namespace: Map<String, Value>) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("pyrepl-session".into())
            .spawn(move || {
                let mut repl = PythonRepl::with_namespace(&config, namespace);
                while let Some(req) = rx.blocking_recv() {
                    serve(&mut repl, req);
                }
                tracing::debug!("pyrepl session worker exiting");
            })
            .context("failed to spawn interpreter thread")?;

        Ok(Self { tx })
    }

    /// See [`PythonRepl::run`]. Errors only if the session worker is gone.
    pub async fn run(&self, command: impl Into<String>) -> Result<String> {
        let command = command.into();
        self.request(|reply| Request::Run { command, reply }).await
    }

    pub async fn execute(&self, command: impl Into<String>) -> Result<ExecutionResult> {
        let command = command.into();
        self.request(|reply| Request::Execute { command, reply }).await
    }

    pub async fn set(&self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        self.request(|reply| Request::Set { name, value, reply })
            .await?
            .map_err(|e| anyhow!("binding value failed: {}", e))
    }

    pub async fn get(&self, name: impl Into<String>) -> Result<Option<String>> {
        let name = name.into();
        self.request(|reply| Request::Get { name, reply }).await
    }

    pub async fn variables(&self) -> Result<HashMap<String, String>> {
        self.request(|reply| Request::Variables { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| anyhow!("interpreter session has shut down"))?;
        rx.await.context("interpreter session stopped before replying")
    }
}

fn serve(repl: &mut PythonRepl, req: Request) {
    // A dropped receiver only means the caller stopped waiting.
    match req {
        Request::Run { command, reply } => {
            let _ = reply.send(repl.run(&command));
        }
        Request::Execute { command, reply } => {
            let _ = reply.send(repl.execute(&command));
        }
        Request::Set { name, value, reply } => {
            let _ = reply.send(repl.set(&name, &value));
        }
        Request::Get { name, reply } => {
            let _ = reply.send(repl.get(&name));
        }
        Request::Variables { reply } => {
            let _ = reply.send(repl.variables());
        }
    }
}
