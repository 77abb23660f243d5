pub mod config;
pub mod ctx;
pub mod ops;
pub mod sink;

use ctx::LogCtx;

pub fn process() -> LogCtx<ops::process::Process> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
pub fn validate() -> LogCtx<ops::validate::Validate> { LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData } }
