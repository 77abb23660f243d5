use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Process;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Plan, Channel, ListPage, Details, Filter, Transition, Finalize }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Plan => "plan",
        Phase::Channel => "channel",
        Phase::ListPage => "list_page",
        Phase::Details => "details",
        Phase::Filter => "filter",
        Phase::Transition => "transition",
        Phase::Finalize => "finalize",
    }}
    fn span(&self) -> Span { match self {
        Phase::Plan => info_span!("plan"),
        Phase::Channel => info_span!("channel"),
        Phase::ListPage => info_span!("list_page"),
        Phase::Details => info_span!("details"),
        Phase::Filter => info_span!("filter"),
        Phase::Transition => info_span!("transition"),
        Phase::Finalize => info_span!("finalize"),
    }}
}

impl OpMarker for Process {
    const NAME: &'static str = "process";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("process") }
}
