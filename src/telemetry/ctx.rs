use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::{info, debug, warn, error, Span};

use crate::backlog::report::{ChannelReport, RunReport};
use crate::output::types::{Envelope, Meta};

use super::sink;

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    pub(crate) json: bool,
    pub(crate) _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            debug!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            debug!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn error(&self, msg: impl AsRef<str>) { if self.json { error!(op = %self.op_name(), "{}", msg.as_ref()); } else { error!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); info!(op = %self.op_name(), details = %details, "{}", msg); }
        else { info!("{}", msg); }
    }

    pub fn debug_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); debug!(op = %self.op_name(), details = %details, "{}", msg); }
        else { debug!("{}", msg); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        if self.json { let details = kv_to_string(kv); warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else { warn!("{}", msg); }
    }

    pub fn plan<T: Serialize>(&self, plan: &T, meta: Option<Meta>) -> Result<()> {
        let env = Envelope::plan(self.op_name(), plan, meta)?;
        sink::current_sink().on_plan(&env)
    }

    pub fn result<T: Serialize>(&self, result: &T, meta: Option<Meta>) -> Result<()> {
        let env = Envelope::result(self.op_name(), result, meta)?;
        sink::current_sink().on_result(&env)
    }
}

impl LogCtx<crate::telemetry::ops::process::Process> {
    pub fn channel_summary(&self, c: &ChannelReport) {
        let deferred = c.deferred + c.unexamined;
        if self.json {
            info!(op = %self.op_name(), channel_id = %c.channel_id, found = c.found, eligible = c.eligible,
                applied = c.applied, failed = c.failed, skipped_dry_run = c.skipped_dry_run, deferred,
                error = c.error.as_deref().unwrap_or(""), "channel_summary");
        } else if let Some(err) = &c.error {
            error!("💥 Channel {} ({}) failed: {} — found={} eligible={} applied={} failed={}",
                c.name, c.channel_id, err, c.found, c.eligible, c.applied, c.failed);
        } else {
            info!("✅ Channel {} ({}) — found={} eligible={} applied={} failed={} dry_run={} deferred={}",
                c.name, c.channel_id, c.found, c.eligible, c.applied, c.failed, c.skipped_dry_run, deferred);
        }
    }

    pub fn totals(&self, r: &RunReport) {
        let t = &r.totals;
        if self.json {
            info!(op = %self.op_name(), status = r.status.code(), found = t.found, eligible = t.eligible,
                applied = t.applied, failed = t.failed, deferred = t.deferred, channel_errors = t.channel_errors,
                quota_spent = r.quota_spent, quota_budget = r.quota_budget, "process_totals");
        } else {
            info!("📊 Run {} — found={} eligible={} applied={} failed={} deferred={} channel_errors={} quota={}/{}",
                r.status.code(), t.found, t.eligible, t.applied, t.failed, t.deferred, t.channel_errors,
                r.quota_spent, r.quota_budget);
        }
    }
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
