use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Validate;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Check, Access }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Check => "check",
        Phase::Access => "access",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Check => info_span!("check"),
        Phase::Access => info_span!("access"),
    }}
}

impl OpMarker for Validate {
    const NAME: &'static str = "validate";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("validate") }
}
