use crate::{
    error::MathError,
    planner::{TriggerPlan, plan_trigger},
    types::{primitives::{Timestamp, TokenAmount}, snapshot::AuctionSnapshot, state::ParticipationState},
};

/// What a cycle does once claims are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No round scheduled and the current volume already meets the threshold.
    Idle { threshold: TokenAmount },
    Trigger(TriggerPlan),
    Wait { starts_at: Timestamp },
    /// Round running; needs a reference quote before anything is decided.
    EvaluateBuyBack,
}

pub fn decide(snapshot: &AuctionSnapshot) -> Result<Decision, MathError> {
    let plan = plan_trigger(snapshot)?;
    let decision = match ParticipationState::classify(snapshot) {
        ParticipationState::NoAuctionTriggered if plan.is_noop() => Decision::Idle {
            threshold: plan.threshold,
        },
        ParticipationState::NoAuctionTriggered => Decision::Trigger(plan),
        ParticipationState::AuctionTriggeredWaiting { starts_at } => Decision::Wait { starts_at },
        ParticipationState::AuctionInProgress => Decision::EvaluateBuyBack,
    };
    Ok(decision)
}
