//! Capability registry: scoped, amount- and time-bounded delegation of one
//! action on one bounty.
//!
//! A capability never outlives the authority it was carved from. The owner's
//! authority is resolved from live state both when the capability is issued
//! and every time it is used, so rotating the admin or withdrawing a claim
//! silently invalidates everything delegated from it.

use crate::{
    admin, events, invariants, ledger,
    pause::{self, Operation},
    storage, EscrowStatus, Error,
};
use soroban_sdk::{contracttype, log, Address, Env};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CapabilityAction {
    Claim,
    Release,
    Refund,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Capability {
    pub id: u64,
    pub owner: Address,
    pub holder: Address,
    pub action: CapabilityAction,
    pub bounty_id: u64,
    pub amount_limit: i128,
    pub remaining_amount: i128,
    pub expiry: u64,
    pub max_uses: u32,
    pub remaining_uses: u32,
    pub revoked: bool,
}

impl Capability {
    fn is_exhausted(&self) -> bool {
        self.remaining_uses == 0 || self.remaining_amount == 0
    }
}

/// Who currently holds `action` on `bounty_id`, and up to what amount.
struct Authority {
    holder: Address,
    amount: i128,
}

fn current_authority(
    env: &Env,
    action: &CapabilityAction,
    bounty_id: u64,
) -> Result<Authority, Error> {
    match action {
        CapabilityAction::Claim => {
            let claim = ledger::open_claim(env, bounty_id)?;
            Ok(Authority {
                holder: claim.recipient,
                amount: claim.amount,
            })
        }
        CapabilityAction::Release => {
            let admin = storage::admin(env)?;
            let escrow = storage::load_escrow(env, bounty_id)?;
            if escrow.status != EscrowStatus::Locked {
                return Err(Error::FundsNotLocked);
            }
            Ok(Authority {
                holder: admin,
                amount: escrow.remaining_amount(),
            })
        }
        CapabilityAction::Refund => {
            let admin = storage::admin(env)?;
            let escrow = storage::load_escrow(env, bounty_id)?;
            if escrow.status != EscrowStatus::Locked
                && escrow.status != EscrowStatus::PartiallyRefunded
            {
                return Err(Error::FundsNotLocked);
            }
            Ok(Authority {
                holder: admin,
                amount: escrow.remaining_amount(),
            })
        }
    }
}

fn ensure_owner_authority(
    env: &Env,
    owner: &Address,
    action: &CapabilityAction,
    bounty_id: u64,
    amount: i128,
) -> Result<(), Error> {
    let authority = current_authority(env, action, bounty_id)?;
    if authority.holder != *owner {
        log!(env, "capability owner lost authority", bounty_id);
        return Err(Error::Unauthorized);
    }
    if amount > authority.amount {
        return Err(Error::CapabilityExceedsAuthority);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn issue(
    env: &Env,
    owner: Address,
    holder: Address,
    action: CapabilityAction,
    bounty_id: u64,
    amount_limit: i128,
    expiry: u64,
    max_uses: u32,
) -> Result<u64, Error> {
    if !storage::is_initialized(env) {
        return Err(Error::NotInitialized);
    }
    if amount_limit <= 0 || max_uses == 0 {
        return Err(Error::InvalidAmount);
    }
    let now = env.ledger().timestamp();
    if expiry <= now {
        return Err(Error::InvalidDeadline);
    }

    owner.require_auth();
    ensure_owner_authority(env, &owner, &action, bounty_id, amount_limit)?;

    let capability = Capability {
        id: storage::next_capability_id(env),
        owner: owner.clone(),
        holder: holder.clone(),
        action: action.clone(),
        bounty_id,
        amount_limit,
        remaining_amount: amount_limit,
        expiry,
        max_uses,
        remaining_uses: max_uses,
        revoked: false,
    };
    storage::save_capability(env, &capability);

    events::emit_capability_issued(
        env,
        events::CapabilityIssued {
            capability_id: capability.id,
            owner,
            holder,
            action,
            bounty_id,
            amount_limit,
            expires_at: expiry,
            max_uses,
            timestamp: now,
        },
    );
    Ok(capability.id)
}

/// Permanently disables a capability. Revoking one that is already revoked or
/// used up changes nothing and emits nothing.
pub(crate) fn revoke(env: &Env, owner: Address, capability_id: u64) -> Result<(), Error> {
    let mut capability = storage::load_capability(env, capability_id)?;
    if capability.owner != owner {
        return Err(Error::Unauthorized);
    }
    owner.require_auth();

    if capability.revoked || capability.is_exhausted() {
        return Ok(());
    }

    capability.revoked = true;
    storage::save_capability(env, &capability);

    events::emit_capability_revoked(
        env,
        events::CapabilityRevoked {
            capability_id,
            owner,
            revoked_at: env.ledger().timestamp(),
        },
    );
    Ok(())
}

pub(crate) fn load(env: &Env, capability_id: u64) -> Result<Capability, Error> {
    storage::load_capability(env, capability_id)
}

/// Validates `holder`'s use of `amount` under the capability and records it.
///
/// Callers run the ledger transition after this returns; an error from either
/// step aborts the whole invocation, so the decrement is never kept without
/// the transition.
fn consume(
    env: &Env,
    holder: &Address,
    capability_id: u64,
    action: CapabilityAction,
    bounty_id: u64,
    amount: i128,
) -> Result<Capability, Error> {
    let mut capability = storage::load_capability(env, capability_id)?;

    if capability.revoked {
        return Err(Error::CapabilityRevoked);
    }
    if capability.action != action || capability.bounty_id != bounty_id {
        return Err(Error::CapabilityActionMismatch);
    }
    let now = env.ledger().timestamp();
    if now > capability.expiry {
        return Err(Error::CapabilityExpired);
    }
    if capability.is_exhausted() {
        return Err(Error::CapabilityUsesExhausted);
    }
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }

    ensure_owner_authority(env, &capability.owner, &action, bounty_id, amount)?;

    if capability.holder != *holder {
        return Err(Error::Unauthorized);
    }
    if amount > capability.remaining_amount {
        return Err(Error::CapabilityAmountExceeded);
    }
    holder.require_auth();

    capability.remaining_amount -= amount;
    capability.remaining_uses -= 1;
    invariants::assert_capability(&capability);
    storage::save_capability(env, &capability);

    events::emit_capability_used(
        env,
        events::CapabilityUsed {
            capability_id,
            holder: holder.clone(),
            action,
            bounty_id,
            amount,
            remaining_amount: capability.remaining_amount,
            uses_left: capability.remaining_uses,
            used_at: now,
        },
    );
    Ok(capability)
}

/// Collects the open claim on behalf of its recipient.
pub(crate) fn claim_with(
    env: &Env,
    bounty_id: u64,
    holder: Address,
    capability_id: u64,
) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Release)?;
    let claim = ledger::open_claim(env, bounty_id)?;
    consume(
        env,
        &holder,
        capability_id,
        CapabilityAction::Claim,
        bounty_id,
        claim.amount,
    )?;
    ledger::settle_claim(env, claim, &holder)
}

pub(crate) fn release_with(
    env: &Env,
    bounty_id: u64,
    contributor: Address,
    payout_amount: i128,
    holder: Address,
    capability_id: u64,
) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Release)?;
    let escrow = storage::load_escrow(env, bounty_id)?;
    ledger::ensure_no_pending_claim(env, bounty_id)?;
    consume(
        env,
        &holder,
        capability_id,
        CapabilityAction::Release,
        bounty_id,
        payout_amount,
    )?;
    // Delegated releases answer to the same large-release approvals as the admin.
    admin::consume_release_approval(env, bounty_id, &contributor, payout_amount)?;
    ledger::settle_release(env, bounty_id, escrow, &contributor, payout_amount, &holder)
}

pub(crate) fn refund_with(
    env: &Env,
    bounty_id: u64,
    amount: i128,
    holder: Address,
    capability_id: u64,
) -> Result<(), Error> {
    let escrow = storage::load_escrow(env, bounty_id)?;
    ledger::ensure_no_pending_claim(env, bounty_id)?;
    pause::ensure_not_paused(env, Operation::Refund)?;
    consume(
        env,
        &holder,
        capability_id,
        CapabilityAction::Refund,
        bounty_id,
        amount,
    )?;
    ledger::settle_refund(env, bounty_id, escrow, amount, &holder)
}
