//! Escrow ledger: the per-bounty state machine.
//!
//! ```text
//!   (none) --lock--> Locked --release (all)--> Released
//!                      |  \--release (part)--> Locked
//!                      |
//!                      +--refund (rest)--> Refunded
//!                      \--refund (part)--> PartiallyRefunded --refund--> ...
//! ```
//!
//! Any other (status, operation) pair is rejected with `FundsNotLocked`, and
//! locking an id that already has a record is rejected with `BountyExists`.
//! Records are never removed; terminal entries stay queryable.

use crate::{
    admin, events, fees, invariants,
    pause::{self, Operation},
    storage, Error,
};
use soroban_sdk::{contracttype, log, token, Address, Env};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EscrowStatus {
    Locked,
    Released,
    Refunded,
    PartiallyRefunded,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Escrow {
    pub depositor: Address,
    /// Most recent payout recipient, if any funds have been released.
    pub contributor: Option<Address>,
    /// Net amount held for the bounty after any lock fee.
    pub locked_amount: i128,
    pub released_amount: i128,
    pub refunded_amount: i128,
    pub status: EscrowStatus,
    pub deadline: u64,
    pub created_at: u64,
    pub last_transition_at: u64,
}

impl Escrow {
    pub fn remaining_amount(&self) -> i128 {
        self.locked_amount - self.released_amount - self.refunded_amount
    }

    fn accepts_release(&self) -> bool {
        self.status == EscrowStatus::Locked
    }

    fn accepts_refund(&self) -> bool {
        self.status == EscrowStatus::Locked || self.status == EscrowStatus::PartiallyRefunded
    }
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum DisputeReason {
    QualityIssue = 1,
    IncompleteWork = 2,
    DeadlineMissed = 3,
    ParticipantFraud = 4,
    Other = 5,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum DisputeOutcome {
    ResolvedByPayout = 1,
    ResolvedByRefund = 2,
    CancelledByAdmin = 3,
    NoActionTaken = 4,
}

/// A payout the admin has designated for `recipient` but which has not been
/// collected yet. While unclaimed it blocks refunds and releases.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimRecord {
    pub bounty_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub expires_at: u64,
    pub claimed: bool,
    pub reason: DisputeReason,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundEligibility {
    pub can_refund: bool,
    pub deadline_passed: bool,
    pub claim_pending: bool,
    pub remaining_amount: i128,
}

pub(crate) fn token_client(env: &Env) -> Result<token::Client<'_>, Error> {
    let token_address = storage::token(env)?;
    Ok(token::Client::new(env, &token_address))
}

pub(crate) fn ensure_no_pending_claim(env: &Env, bounty_id: u64) -> Result<(), Error> {
    if let Some(claim) = storage::pending_claim(env, bounty_id) {
        if !claim.claimed {
            log!(env, "blocked by pending claim", bounty_id);
            return Err(Error::ClaimPending);
        }
    }
    Ok(())
}

fn validate_amount(escrow: &Escrow, amount: i128) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    if amount > escrow.remaining_amount() {
        return Err(Error::InsufficientFunds);
    }
    Ok(())
}

fn record_transition(
    env: &Env,
    bounty_id: u64,
    from_status: EscrowStatus,
    escrow: &Escrow,
    amount: i128,
    actor: &Address,
) {
    events::emit_escrow_transition(
        env,
        events::EscrowTransition {
            bounty_id,
            from_status,
            to_status: escrow.status.clone(),
            amount,
            actor: actor.clone(),
            timestamp: escrow.last_transition_at,
        },
    );
}

fn collect_fee(
    env: &Env,
    token_client: &token::Client,
    operation_type: events::FeeOperationType,
    fee: i128,
    fee_rate: i128,
    recipient: &Address,
) {
    if fee <= 0 {
        return;
    }
    token_client.transfer(&env.current_contract_address(), recipient, &fee);
    events::emit_fee_collected(
        env,
        events::FeeCollected {
            version: events::EVENT_VERSION_V2,
            operation_type,
            amount: fee,
            fee_rate,
            recipient: recipient.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub(crate) fn lock_funds(
    env: &Env,
    depositor: Address,
    bounty_id: u64,
    amount: i128,
    deadline: u64,
) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Lock)?;
    if !storage::is_initialized(env) {
        return Err(Error::NotInitialized);
    }
    if storage::has_escrow(env, bounty_id) {
        log!(env, "lock rejected: bounty exists", bounty_id);
        return Err(Error::BountyExists);
    }
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    let now = env.ledger().timestamp();
    if deadline <= now {
        return Err(Error::InvalidDeadline);
    }

    depositor.require_auth();
    admin::check_rate_limit(env, &depositor)?;

    let fee_config = admin::fee_config(env)?;
    let (fee, net_amount) = if fee_config.fee_enabled {
        fees::split_amount(amount, fee_config.lock_fee_rate)
    } else {
        (0, amount)
    };

    // EFFECTS: record and index written before any token movement
    let escrow = Escrow {
        depositor: depositor.clone(),
        contributor: None,
        locked_amount: net_amount,
        released_amount: 0,
        refunded_amount: 0,
        status: EscrowStatus::Locked,
        deadline,
        created_at: now,
        last_transition_at: now,
    };
    invariants::assert_escrow(env, &escrow);
    storage::save_escrow(env, bounty_id, &escrow);
    storage::index_escrow(env, bounty_id);
    storage::track_open_escrow(env, bounty_id);

    // INTERACTION
    let client = token_client(env)?;
    client.transfer(&depositor, &env.current_contract_address(), &amount);
    collect_fee(
        env,
        &client,
        events::FeeOperationType::Lock,
        fee,
        fee_config.lock_fee_rate,
        &fee_config.fee_recipient,
    );

    events::emit_funds_locked(
        env,
        events::FundsLocked {
            version: events::EVENT_VERSION_V2,
            bounty_id,
            amount: net_amount,
            depositor: depositor.clone(),
            deadline,
        },
    );
    events::emit_escrow_opened(
        env,
        events::EscrowOpened {
            bounty_id,
            to_status: escrow.status.clone(),
            amount: net_amount,
            actor: depositor,
            timestamp: now,
        },
    );
    Ok(())
}

/// Admin-authorized release of `amount` to `contributor`.
pub(crate) fn release_funds(
    env: &Env,
    bounty_id: u64,
    contributor: Address,
    amount: i128,
) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Release)?;
    let admin = admin::require_admin(env)?;

    let escrow = storage::load_escrow(env, bounty_id)?;
    if !escrow.accepts_release() {
        return Err(Error::FundsNotLocked);
    }
    ensure_no_pending_claim(env, bounty_id)?;
    validate_amount(&escrow, amount)?;
    admin::consume_release_approval(env, bounty_id, &contributor, amount)?;

    settle_release(env, bounty_id, escrow, &contributor, amount, &admin)
}

/// Moves `amount` out of a `Locked` escrow to `recipient`, minus the release
/// fee. Shared by direct, claim and capability-authorized releases; callers
/// have already done their own authorization.
pub(crate) fn settle_release(
    env: &Env,
    bounty_id: u64,
    mut escrow: Escrow,
    recipient: &Address,
    amount: i128,
    actor: &Address,
) -> Result<(), Error> {
    if !escrow.accepts_release() {
        return Err(Error::FundsNotLocked);
    }
    validate_amount(&escrow, amount)?;

    let fee_config = admin::fee_config(env)?;
    let (fee, payout) = if fee_config.fee_enabled {
        fees::split_amount(amount, fee_config.release_fee_rate)
    } else {
        (0, amount)
    };

    let from_status = escrow.status.clone();
    escrow.released_amount = escrow
        .released_amount
        .checked_add(amount)
        .ok_or(Error::InvalidAmount)?;
    escrow.contributor = Some(recipient.clone());
    if escrow.remaining_amount() == 0 {
        escrow.status = EscrowStatus::Released;
        storage::untrack_open_escrow(env, bounty_id);
    }
    escrow.last_transition_at = env.ledger().timestamp();
    invariants::assert_escrow(env, &escrow);
    storage::save_escrow(env, bounty_id, &escrow);

    let client = token_client(env)?;
    client.transfer(&env.current_contract_address(), recipient, &payout);
    collect_fee(
        env,
        &client,
        events::FeeOperationType::Release,
        fee,
        fee_config.release_fee_rate,
        &fee_config.fee_recipient,
    );

    events::emit_funds_released(
        env,
        events::FundsReleased {
            version: events::EVENT_VERSION_V2,
            bounty_id,
            amount,
            recipient: recipient.clone(),
            timestamp: escrow.last_transition_at,
        },
    );
    record_transition(env, bounty_id, from_status, &escrow, amount, actor);
    Ok(())
}

/// Refunds `amount` to the depositor.
///
/// After the deadline anyone may trigger it since the funds can only go back
/// to the depositor. Before the deadline it is an admin override and needs
/// the admin's signature.
pub(crate) fn refund(env: &Env, bounty_id: u64, amount: i128) -> Result<(), Error> {
    let escrow = storage::load_escrow(env, bounty_id)?;
    ensure_no_pending_claim(env, bounty_id)?;
    pause::ensure_not_paused(env, Operation::Refund)?;
    if !escrow.accepts_refund() {
        return Err(Error::FundsNotLocked);
    }
    validate_amount(&escrow, amount)?;

    let actor = if env.ledger().timestamp() < escrow.deadline {
        admin::require_admin(env)?
    } else {
        env.current_contract_address()
    };

    settle_refund(env, bounty_id, escrow, amount, &actor)
}

/// Returns `amount` to the depositor. The escrow becomes `Refunded` once
/// `refunded_amount == locked_amount - released_amount`, and
/// `PartiallyRefunded` while anything is left.
pub(crate) fn settle_refund(
    env: &Env,
    bounty_id: u64,
    mut escrow: Escrow,
    amount: i128,
    actor: &Address,
) -> Result<(), Error> {
    if !escrow.accepts_refund() {
        return Err(Error::FundsNotLocked);
    }
    validate_amount(&escrow, amount)?;

    let from_status = escrow.status.clone();
    escrow.refunded_amount = escrow
        .refunded_amount
        .checked_add(amount)
        .ok_or(Error::InvalidAmount)?;
    escrow.status = if escrow.remaining_amount() == 0 {
        storage::untrack_open_escrow(env, bounty_id);
        EscrowStatus::Refunded
    } else {
        EscrowStatus::PartiallyRefunded
    };
    escrow.last_transition_at = env.ledger().timestamp();
    invariants::assert_escrow(env, &escrow);
    storage::save_escrow(env, bounty_id, &escrow);

    let refund_to = escrow.depositor.clone();
    token_client(env)?.transfer(&env.current_contract_address(), &refund_to, &amount);

    events::emit_funds_refunded(
        env,
        events::FundsRefunded {
            version: events::EVENT_VERSION_V2,
            bounty_id,
            amount,
            refund_to,
            timestamp: escrow.last_transition_at,
        },
    );
    record_transition(env, bounty_id, from_status, &escrow, amount, actor);
    Ok(())
}

// ---------------------------------------------------------------------------
// Pending claims
// ---------------------------------------------------------------------------

pub(crate) fn set_claim_window(env: &Env, claim_window: u64) -> Result<(), Error> {
    admin::require_admin(env)?;
    env.storage()
        .instance()
        .set(&storage::DataKey::ClaimWindow, &claim_window);
    Ok(())
}

pub(crate) fn claim_window(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&storage::DataKey::ClaimWindow)
        .unwrap_or(0)
}

/// Designates `recipient` as the claim recipient for `amount` of the bounty.
/// The recipient has `claim_window` seconds to collect.
pub(crate) fn authorize_claim(
    env: &Env,
    bounty_id: u64,
    recipient: Address,
    amount: i128,
    reason: DisputeReason,
) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Release)?;
    admin::require_admin(env)?;

    let escrow = storage::load_escrow(env, bounty_id)?;
    if !escrow.accepts_release() {
        return Err(Error::FundsNotLocked);
    }
    ensure_no_pending_claim(env, bounty_id)?;
    validate_amount(&escrow, amount)?;
    // Approvals are spent when the payout is designated, so collecting the
    // claim (directly or by capability) never needs them again.
    admin::consume_release_approval(env, bounty_id, &recipient, amount)?;

    let claim = ClaimRecord {
        bounty_id,
        recipient: recipient.clone(),
        amount,
        expires_at: env.ledger().timestamp().saturating_add(claim_window(env)),
        claimed: false,
        reason,
    };
    storage::save_pending_claim(env, bounty_id, &claim);

    events::emit_claim_created(
        env,
        events::ClaimCreated {
            bounty_id,
            recipient,
            amount,
            expires_at: claim.expires_at,
            reason,
        },
    );
    Ok(())
}

/// Loads the open claim for `bounty_id`, rejecting collected or expired ones.
pub(crate) fn open_claim(env: &Env, bounty_id: u64) -> Result<ClaimRecord, Error> {
    let claim = storage::pending_claim(env, bounty_id).ok_or(Error::ClaimNotFound)?;
    if claim.claimed {
        return Err(Error::FundsNotLocked);
    }
    if env.ledger().timestamp() > claim.expires_at {
        return Err(Error::ClaimExpired);
    }
    Ok(claim)
}

pub(crate) fn claim(env: &Env, bounty_id: u64) -> Result<(), Error> {
    pause::ensure_not_paused(env, Operation::Release)?;
    let claim = open_claim(env, bounty_id)?;
    claim.recipient.require_auth();
    let recipient = claim.recipient.clone();
    settle_claim(env, claim, &recipient)
}

/// Pays an open claim out to its recipient and marks it collected.
pub(crate) fn settle_claim(env: &Env, mut claim: ClaimRecord, actor: &Address) -> Result<(), Error> {
    let escrow = storage::load_escrow(env, claim.bounty_id)?;
    settle_release(
        env,
        claim.bounty_id,
        escrow,
        &claim.recipient,
        claim.amount,
        actor,
    )?;

    claim.claimed = true;
    storage::save_pending_claim(env, claim.bounty_id, &claim);

    events::emit_claim_executed(
        env,
        events::ClaimExecuted {
            bounty_id: claim.bounty_id,
            recipient: claim.recipient,
            amount: claim.amount,
            claimed_at: env.ledger().timestamp(),
            outcome: DisputeOutcome::ResolvedByPayout,
        },
    );
    Ok(())
}

/// Withdraws an uncollected claim, which unblocks refunds and releases.
pub(crate) fn cancel_pending_claim(
    env: &Env,
    bounty_id: u64,
    outcome: DisputeOutcome,
) -> Result<(), Error> {
    let admin = admin::require_admin(env)?;

    let claim = storage::pending_claim(env, bounty_id).ok_or(Error::ClaimNotFound)?;
    if claim.claimed {
        return Err(Error::FundsNotLocked);
    }
    storage::remove_pending_claim(env, bounty_id);

    events::emit_claim_cancelled(
        env,
        events::ClaimCancelled {
            bounty_id,
            recipient: claim.recipient,
            amount: claim.amount,
            cancelled_at: env.ledger().timestamp(),
            cancelled_by: admin,
            outcome,
        },
    );
    Ok(())
}

pub(crate) fn pending_claim(env: &Env, bounty_id: u64) -> Result<ClaimRecord, Error> {
    storage::pending_claim(env, bounty_id).ok_or(Error::ClaimNotFound)
}

// ---------------------------------------------------------------------------
// Views and maintenance
// ---------------------------------------------------------------------------

pub(crate) fn refund_eligibility(env: &Env, bounty_id: u64) -> Result<RefundEligibility, Error> {
    let escrow = storage::load_escrow(env, bounty_id)?;
    let deadline_passed = env.ledger().timestamp() >= escrow.deadline;
    let claim_pending = storage::pending_claim(env, bounty_id)
        .map(|claim| !claim.claimed)
        .unwrap_or(false);
    let remaining_amount = if escrow.accepts_refund() {
        escrow.remaining_amount()
    } else {
        0
    };
    Ok(RefundEligibility {
        can_refund: deadline_passed && !claim_pending && remaining_amount > 0,
        deadline_passed,
        claim_pending,
        remaining_amount,
    })
}

pub(crate) fn verify_state(env: &Env, bounty_id: u64) -> bool {
    storage::load_escrow(env, bounty_id)
        .map(|escrow| invariants::verify_escrow_invariants(&escrow))
        .unwrap_or(false)
}

/// Closes every open escrow after an emergency drain: whatever was still
/// held is accounted as refunded so no record claims funds the contract no
/// longer has. Only the open-escrow index is walked, so settled history adds
/// no cost.
pub(crate) fn write_off_open_escrows(env: &Env, admin: &Address) {
    let now = env.ledger().timestamp();
    for bounty_id in storage::open_escrows(env).iter() {
        let Ok(mut escrow) = storage::load_escrow(env, bounty_id) else {
            continue;
        };
        if !escrow.accepts_refund() {
            continue;
        }
        let from_status = escrow.status.clone();
        let written_off = escrow.remaining_amount();
        escrow.refunded_amount += written_off;
        escrow.status = EscrowStatus::Refunded;
        escrow.last_transition_at = now;
        invariants::assert_escrow(env, &escrow);
        storage::save_escrow(env, bounty_id, &escrow);
        record_transition(env, bounty_id, from_status, &escrow, written_off, admin);
    }
    storage::clear_open_escrows(env);
}
