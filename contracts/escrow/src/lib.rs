#![no_std]
//! Bounty escrow contract.
//!
//! Holds a single token on behalf of depositors and moves it only through an
//! explicit per-bounty state machine. Every fund movement is authorized either
//! directly (admin, depositor, claim recipient) or through a capability the
//! authority holder delegated. Privileged configuration sits behind one admin
//! identity whose rotation policy is fixed at deployment.

mod admin;
mod asset;
mod capability;
mod events;
mod fees;
mod invariants;
mod ledger;
mod pause;
mod reentrancy_guard;
mod storage;

#[cfg(test)]
mod test_capability_tokens;

pub use admin::{AdminPolicy, FeeConfig, MultisigConfig, RateLimitConfig};
pub use capability::{Capability, CapabilityAction};
pub use ledger::{
    ClaimRecord, DisputeOutcome, DisputeReason, Escrow, EscrowStatus, RefundEligibility,
};
pub use pause::PauseFlags;

use soroban_sdk::{contract, contracterror, contractimpl, Address, Env, String, Vec};

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    BountyExists = 3,
    BountyNotFound = 4,
    FundsNotLocked = 5,
    Unauthorized = 7,
    InvalidFeeRate = 8,
    /// Returned when amount is invalid (zero, negative, or overflowing)
    InvalidAmount = 13,
    /// Returned when a deadline or expiry is not in the future
    InvalidDeadline = 14,
    /// Returned when the amount exceeds what is left in the escrow
    InsufficientFunds = 16,
    FundsPaused = 18,
    /// Returned by `emergency_withdraw` while lock operations are not paused
    NotPaused = 21,
    /// Returned when a refund or release is blocked by an uncollected claim
    ClaimPending = 22,
    CapabilityNotFound = 26,
    CapabilityExpired = 27,
    CapabilityRevoked = 28,
    CapabilityActionMismatch = 29,
    CapabilityAmountExceeded = 30,
    CapabilityUsesExhausted = 31,
    CapabilityExceedsAuthority = 32,
    InvalidAssetId = 33,
    /// Returned by `set_admin` on an immutable-admin deployment
    AdminImmutable = 40,
    InvalidMultisigConfig = 41,
    MultisigApprovalRequired = 42,
    ClaimNotFound = 43,
    ClaimExpired = 44,
    RateLimitExceeded = 45,
    CooldownActive = 46,
}

#[contract]
pub struct BountyEscrowContract;

#[contractimpl]
impl BountyEscrowContract {
    // ========================================================================
    // Admin registry
    // ========================================================================

    /// Sets the admin, the escrowed token and the admin rotation policy.
    ///
    /// # Errors
    /// * `AlreadyInitialized` - on any second call, whatever the policy
    /// * `InvalidAssetId` - if `token` is not a contract address
    pub fn init(env: Env, admin: Address, token: Address, policy: AdminPolicy) -> Result<(), Error> {
        admin::initialize(&env, admin, token, policy)
    }

    /// Hands the admin role to `new_admin`. Requires the current admin.
    ///
    /// # Errors
    /// * `AdminImmutable` - the contract was deployed with `AdminPolicy::Immutable`
    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), Error> {
        admin::set_admin(&env, new_admin)
    }

    pub fn get_admin(env: Env) -> Result<Address, Error> {
        storage::admin(&env)
    }

    pub fn get_admin_policy(env: Env) -> Result<AdminPolicy, Error> {
        admin::policy(&env)
    }

    pub fn get_version(env: Env) -> u32 {
        admin::version(&env)
    }

    pub fn set_version(env: Env, new_version: u32) -> Result<(), Error> {
        admin::set_version(&env, new_version)
    }

    /// Updates any subset of the fee settings. Rates are in basis points.
    pub fn update_fee_config(
        env: Env,
        lock_fee_rate: Option<i128>,
        release_fee_rate: Option<i128>,
        fee_recipient: Option<Address>,
        fee_enabled: Option<bool>,
    ) -> Result<(), Error> {
        admin::update_fee_config(
            &env,
            lock_fee_rate,
            release_fee_rate,
            fee_recipient,
            fee_enabled,
        )
    }

    pub fn get_fee_config(env: Env) -> Result<FeeConfig, Error> {
        admin::fee_config(&env)
    }

    pub fn update_multisig_config(
        env: Env,
        threshold_amount: i128,
        signers: Vec<Address>,
        required_signatures: u32,
    ) -> Result<(), Error> {
        admin::update_multisig_config(&env, threshold_amount, signers, required_signatures)
    }

    pub fn get_multisig_config(env: Env) -> MultisigConfig {
        admin::multisig_config(&env)
    }

    /// Records `approver`'s sign-off on releasing the bounty to `contributor`.
    pub fn approve_large_release(
        env: Env,
        bounty_id: u64,
        contributor: Address,
        approver: Address,
    ) -> Result<(), Error> {
        admin::approve_large_release(&env, bounty_id, contributor, approver)
    }

    pub fn update_rate_limit_config(
        env: Env,
        window_size: u64,
        max_operations: u32,
        cooldown_period: u64,
    ) -> Result<(), Error> {
        admin::update_rate_limit_config(&env, window_size, max_operations, cooldown_period)
    }

    pub fn set_rate_limit_exempt(env: Env, address: Address, exempt: bool) -> Result<(), Error> {
        admin::set_rate_limit_exempt(&env, address, exempt)
    }

    pub fn get_rate_limit_config(env: Env) -> Option<RateLimitConfig> {
        admin::rate_limit_config(&env)
    }

    // ========================================================================
    // Pause controller
    // ========================================================================

    /// Sets any subset of the three pause flags. `None` leaves a flag as is.
    pub fn set_paused(
        env: Env,
        lock: Option<bool>,
        release: Option<bool>,
        refund: Option<bool>,
        reason: Option<String>,
    ) -> Result<(), Error> {
        pause::set_paused(&env, lock, release, refund, reason)
    }

    pub fn get_pause_flags(env: Env) -> PauseFlags {
        pause::pause_flags(&env)
    }

    /// Drains the whole contract balance to `target` and returns the amount
    /// moved. Admin only, and only while lock operations are paused.
    pub fn emergency_withdraw(env: Env, target: Address) -> Result<i128, Error> {
        reentrancy_guard::guarded(&env, || pause::emergency_withdraw(&env, target))
    }

    // ========================================================================
    // Escrow ledger
    // ========================================================================

    /// Locks `amount` from `depositor` under a new `bounty_id`.
    ///
    /// # Errors
    /// * `FundsPaused` - lock operations are paused
    /// * `BountyExists` - `bounty_id` already has a record, whatever its status
    /// * `InvalidAmount` / `InvalidDeadline` - non-positive amount or past deadline
    pub fn lock_funds(
        env: Env,
        depositor: Address,
        bounty_id: u64,
        amount: i128,
        deadline: u64,
    ) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || {
            ledger::lock_funds(&env, depositor, bounty_id, amount, deadline)
        })
    }

    /// Admin-authorized payout of `amount` to `contributor`. A partial release
    /// keeps the escrow `Locked`.
    pub fn release_funds(
        env: Env,
        bounty_id: u64,
        contributor: Address,
        amount: i128,
    ) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || {
            ledger::release_funds(&env, bounty_id, contributor, amount)
        })
    }

    /// Returns `amount` to the depositor. Permissionless after the deadline,
    /// admin only before it.
    ///
    /// # Errors
    /// * `ClaimPending` - a claim is waiting to be collected (checked first)
    /// * `FundsPaused` - refunds are paused
    /// * `FundsNotLocked` - the escrow is already `Released` or `Refunded`
    pub fn refund(env: Env, bounty_id: u64, amount: i128) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || ledger::refund(&env, bounty_id, amount))
    }

    pub fn set_claim_window(env: Env, claim_window: u64) -> Result<(), Error> {
        ledger::set_claim_window(&env, claim_window)
    }

    /// Designates `recipient` as the claim recipient for `amount`.
    pub fn authorize_claim(
        env: Env,
        bounty_id: u64,
        recipient: Address,
        amount: i128,
        reason: DisputeReason,
    ) -> Result<(), Error> {
        ledger::authorize_claim(&env, bounty_id, recipient, amount, reason)
    }

    /// Collects the pending claim. Requires the recipient's signature.
    pub fn claim(env: Env, bounty_id: u64) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || ledger::claim(&env, bounty_id))
    }

    pub fn cancel_pending_claim(
        env: Env,
        bounty_id: u64,
        outcome: DisputeOutcome,
    ) -> Result<(), Error> {
        ledger::cancel_pending_claim(&env, bounty_id, outcome)
    }

    pub fn get_pending_claim(env: Env, bounty_id: u64) -> Result<ClaimRecord, Error> {
        ledger::pending_claim(&env, bounty_id)
    }

    pub fn get_escrow_info(env: Env, bounty_id: u64) -> Result<Escrow, Error> {
        storage::load_escrow(&env, bounty_id)
    }

    /// Token balance currently held by the contract.
    pub fn get_balance(env: Env) -> Result<i128, Error> {
        let client = ledger::token_client(&env)?;
        Ok(client.balance(&env.current_contract_address()))
    }

    pub fn get_escrow_count(env: Env) -> u32 {
        storage::escrow_index(&env).len()
    }

    /// `true` if the escrow exists and its amounts agree with its status.
    pub fn verify_state(env: Env, bounty_id: u64) -> bool {
        ledger::verify_state(&env, bounty_id)
    }

    pub fn get_refund_eligibility(env: Env, bounty_id: u64) -> Result<RefundEligibility, Error> {
        ledger::refund_eligibility(&env, bounty_id)
    }

    // ========================================================================
    // Capability registry
    // ========================================================================

    /// Delegates `action` on `bounty_id` to `holder`, bounded by
    /// `amount_limit`, `expiry` and `max_uses`.
    ///
    /// `owner` must currently hold the authority being delegated: the admin
    /// for `Release` / `Refund`, the pending claim's recipient for `Claim`.
    /// `amount_limit` may not exceed what `owner` could move right now.
    #[allow(clippy::too_many_arguments)]
    pub fn issue_capability(
        env: Env,
        owner: Address,
        holder: Address,
        action: CapabilityAction,
        bounty_id: u64,
        amount_limit: i128,
        expiry: u64,
        max_uses: u32,
    ) -> Result<u64, Error> {
        capability::issue(
            &env,
            owner,
            holder,
            action,
            bounty_id,
            amount_limit,
            expiry,
            max_uses,
        )
    }

    pub fn revoke_capability(env: Env, owner: Address, capability_id: u64) -> Result<(), Error> {
        capability::revoke(&env, owner, capability_id)
    }

    pub fn get_capability(env: Env, capability_id: u64) -> Result<Capability, Error> {
        capability::load(&env, capability_id)
    }

    pub fn claim_with_capability(
        env: Env,
        bounty_id: u64,
        holder: Address,
        capability_id: u64,
    ) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || {
            capability::claim_with(&env, bounty_id, holder, capability_id)
        })
    }

    pub fn release_with_capability(
        env: Env,
        bounty_id: u64,
        contributor: Address,
        payout_amount: i128,
        holder: Address,
        capability_id: u64,
    ) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || {
            capability::release_with(
                &env,
                bounty_id,
                contributor,
                payout_amount,
                holder,
                capability_id,
            )
        })
    }

    pub fn refund_with_capability(
        env: Env,
        bounty_id: u64,
        amount: i128,
        holder: Address,
        capability_id: u64,
    ) -> Result<(), Error> {
        reentrancy_guard::guarded(&env, || {
            capability::refund_with(&env, bounty_id, amount, holder, capability_id)
        })
    }
}
