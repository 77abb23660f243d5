use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::Result;

use crate::output::config::OutputConfig;
use crate::output::types::Envelope;
use crate::output::Emitter;

/// Destination for plan/result envelopes.
pub trait OutputSink: Send + Sync {
    fn on_plan(&self, env: &Envelope) -> Result<()>;
    fn on_result(&self, env: &Envelope) -> Result<()>;
}

#[derive(Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn on_plan(&self, env: &Envelope) -> Result<()> {
        emit_to_stdout(env)
    }

    fn on_result(&self, env: &Envelope) -> Result<()> {
        emit_to_stdout(env)
    }
}

fn emit_to_stdout(env: &Envelope) -> Result<()> {
    let emitter = Emitter::from_env(OutputConfig::from_env());
    emitter.emit(env).map_err(anyhow::Error::from)
}

type DynSink = Arc<dyn OutputSink>;

fn sink_slot() -> &'static Mutex<DynSink> {
    static SINK: OnceLock<Mutex<DynSink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Arc::new(StdoutSink) as DynSink))
}

pub fn current_sink() -> DynSink {
    sink_slot().lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Restores the previous sink on drop.
#[cfg(test)]
pub struct SinkGuard {
    previous: DynSink,
}

#[cfg(test)]
pub fn install_sink(new_sink: DynSink) -> SinkGuard {
    let mut slot = sink_slot().lock().unwrap_or_else(PoisonError::into_inner);
    let previous = std::mem::replace(&mut *slot, new_sink);
    SinkGuard { previous }
}

#[cfg(test)]
impl Drop for SinkGuard {
    fn drop(&mut self) {
        let mut slot = sink_slot().lock().unwrap_or_else(PoisonError::into_inner);
        *slot = self.previous.clone();
    }
}

/// Collects envelopes in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    pub envelopes: Mutex<Vec<Envelope>>,
}

#[cfg(test)]
impl OutputSink for MemorySink {
    fn on_plan(&self, env: &Envelope) -> Result<()> {
        self.envelopes.lock().unwrap().push(env.clone());
        Ok(())
    }

    fn on_result(&self, env: &Envelope) -> Result<()> {
        self.envelopes.lock().unwrap().push(env.clone());
        Ok(())
    }
}
