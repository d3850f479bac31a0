use crate::{Capability, Escrow, EscrowStatus};
use soroban_sdk::{log, Env};

/// Amount and status invariants of a single escrow record:
/// `released + refunded <= locked`, no negative component, and the status
/// agrees with what is left.
pub(crate) fn verify_escrow_invariants(escrow: &Escrow) -> bool {
    if escrow.locked_amount < 0 || escrow.released_amount < 0 || escrow.refunded_amount < 0 {
        return false;
    }
    let settled = match escrow
        .released_amount
        .checked_add(escrow.refunded_amount)
    {
        Some(settled) => settled,
        None => return false,
    };
    if settled > escrow.locked_amount {
        return false;
    }
    let remaining = escrow.locked_amount - settled;
    match escrow.status {
        EscrowStatus::Locked => remaining > 0 && escrow.refunded_amount == 0,
        EscrowStatus::Released => remaining == 0 && escrow.refunded_amount == 0,
        EscrowStatus::Refunded => remaining == 0,
        EscrowStatus::PartiallyRefunded => remaining > 0 && escrow.refunded_amount > 0,
    }
}

pub(crate) fn assert_escrow(env: &Env, escrow: &Escrow) {
    if !verify_escrow_invariants(escrow) {
        log!(
            env,
            "escrow invariant violated",
            escrow.locked_amount,
            escrow.released_amount,
            escrow.refunded_amount
        );
        panic!("Invariant violated: escrow amounts inconsistent with status");
    }
}

pub(crate) fn assert_capability(capability: &Capability) {
    if capability.remaining_amount < 0 || capability.remaining_amount > capability.amount_limit {
        panic!("Invariant violated: remaining_amount must be within amount_limit");
    }
    if capability.remaining_uses > capability.max_uses {
        panic!("Invariant violated: remaining_uses cannot exceed max_uses");
    }
}
