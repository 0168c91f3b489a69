//! The Executor - single entry point to the exstrings engines.
//!
//! The Executor parses an argument vector, routes the command to the
//! conditional or scan engine and converts the outcome into a reply. Errors
//! never escape: each one becomes the error reply the client sees.

use std::sync::Arc;

use tracing::debug;

use exstrings_core::{Args, Error, Host, Reply, Result};
use exstrings_engine::{
    collect_matching, collect_matching_held, delete_matching_held, BackgroundScheduler,
    ConditionalEngine, EngineConfig, LockDiscipline, SchedulerStats,
};

use crate::{Command, Dispatch};

/// The command executor.
///
/// Holds the host, the engine configuration and the background pool. Keeps
/// no per-invocation state.
///
/// # Thread Safety
///
/// Executor is `Send + Sync` whenever the host is, and can be shared across
/// threads. Each foreground invocation runs start to finish under the host's
/// store-wide lock, so a gate and the write it guards are never interleaved
/// with another invocation. Background walks take the lock per call and
/// contend with foreground invocations like any other lock user.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use exstrings_core::{Args, Reply};
/// use exstrings_executor::Executor;
/// use exstrings_storage::MemoryStore;
///
/// let executor = Executor::new(Arc::new(MemoryStore::new()))?;
/// executor.host().set_string("mykey", "old");
///
/// let reply = executor.execute(&Args::from_line("SETIE mykey old new"));
/// assert_eq!(reply, Reply::ok());
/// ```
pub struct Executor<H: Host + 'static> {
    host: Arc<H>,
    config: EngineConfig,
    scheduler: BackgroundScheduler,
}

impl<H: Host + 'static> Executor<H> {
    /// Create an executor with the default configuration.
    pub fn new(host: Arc<H>) -> Result<Self> {
        Self::with_config(host, EngineConfig::default())
    }

    /// Create an executor from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid and
    /// `Error::Internal` if the background workers cannot be started.
    pub fn with_config(host: Arc<H>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = BackgroundScheduler::from_config(&config.background)
            .map_err(|e| Error::internal(format!("failed to start background workers: {}", e)))?;
        Ok(Self {
            host,
            config,
            scheduler,
        })
    }

    /// Parse and run one invocation.
    ///
    /// Background commands return [`Dispatch::Pending`]; everything else is
    /// [`Dispatch::Ready`].
    pub fn dispatch(&self, args: &Args) -> Dispatch {
        let outcome = Command::parse(args).and_then(|command| self.run(command));
        match outcome {
            Ok(dispatch) => dispatch,
            Err(e) => {
                debug!(
                    target: "exstrings::exec",
                    command = %String::from_utf8_lossy(args.name()),
                    error = %e,
                    "Command failed"
                );
                Dispatch::Ready(e.to_reply())
            }
        }
    }

    /// Run one invocation to completion, waiting for background work.
    pub fn execute(&self, args: &Args) -> Reply {
        self.dispatch(args).wait()
    }

    /// Execute multiple invocations sequentially.
    ///
    /// Returns all replies in the same order as the input. Execution
    /// continues after error replies.
    pub fn execute_many<I>(&self, batch: I) -> Vec<Reply>
    where
        I: IntoIterator<Item = Args>,
    {
        batch.into_iter().map(|args| self.execute(&args)).collect()
    }

    fn run(&self, command: Command<'_>) -> Result<Dispatch> {
        debug!(target: "exstrings::exec", ?command, "Dispatching");
        if let Command::Collect {
            pattern,
            batch_size,
            discipline,
            background: true,
        } = command
        {
            let batch_size = batch_size.unwrap_or(self.config.scan.batch_size);
            return self.collect_in_background(pattern, batch_size, discipline);
        }

        let host = self.host.as_ref();
        let guard = host.lock();
        let engine = ConditionalEngine::new(host);

        let reply = match command {
            Command::SetIf {
                flag,
                key,
                expected,
                value,
                options,
            } => engine.set_if(flag, key, Some(expected), value, options)?,
            Command::DelIf {
                flag,
                key,
                expected,
            } => engine.delete_if(flag, key, Some(expected))?,
            Command::SetPub { flag, sets, pubs } => {
                engine.set_and_publish(flag, None, sets, pubs)?
            }
            Command::SetIfPub {
                flag,
                key,
                expected,
                value,
                pubs,
            } => engine.set_if_and_publish(flag, key, Some(expected), value, pubs)?,
            Command::DelPub {
                flag,
                expected,
                keys,
                pubs,
            } => engine.delete_and_publish(flag, expected, keys, pubs)?,
            // Under the invocation guard every foreground discipline is
            // atomic per batch; the walk must not lock again.
            Command::Collect {
                pattern,
                batch_size,
                ..
            } => {
                let batch_size = batch_size.unwrap_or(self.config.scan.batch_size);
                collect_matching_held(host, &guard, pattern, batch_size)?
            }
            Command::DeleteMatching { pattern, .. } => {
                delete_matching_held(host, &guard, pattern, self.config.scan.batch_size)?
            }
        };
        drop(guard);
        Ok(Dispatch::Ready(reply))
    }

    fn collect_in_background(
        &self,
        pattern: &[u8],
        batch_size: usize,
        discipline: LockDiscipline,
    ) -> Result<Dispatch> {
        let host = Arc::clone(&self.host);
        let pattern = pattern.to_vec();
        let pending = self.scheduler.submit(move || {
            collect_matching(host.as_ref(), &pattern, batch_size, discipline)
                .unwrap_or_else(|e| e.to_reply())
        })?;
        Ok(Dispatch::Pending(pending))
    }

    /// The host the executor runs against.
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Background pool metrics.
    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Finish queued background walks and stop the workers.
    ///
    /// Background commands dispatched afterwards reply with an error.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
