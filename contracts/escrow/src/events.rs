use crate::{AdminPolicy, CapabilityAction, DisputeOutcome, DisputeReason, EscrowStatus};
use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol, Vec};

pub const EVENT_VERSION_V2: u32 = 2;

#[contracttype]
#[derive(Clone, Debug)]
pub struct BountyEscrowInitialized {
    pub version: u32,
    pub admin: Address,
    pub token: Address,
    pub policy: AdminPolicy,
    pub timestamp: u64,
}

pub fn emit_bounty_initialized(env: &Env, event: BountyEscrowInitialized) {
    let topics = (symbol_short!("init"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct AdminUpdated {
    pub old_admin: Address,
    pub new_admin: Address,
    pub timestamp: u64,
}

pub fn emit_admin_updated(env: &Env, event: AdminUpdated) {
    let topics = (symbol_short!("adm_upd"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsLocked {
    pub version: u32,
    pub bounty_id: u64,
    pub amount: i128,
    pub depositor: Address,
    pub deadline: u64,
}

pub fn emit_funds_locked(env: &Env, event: FundsLocked) {
    let topics = (symbol_short!("f_lock"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsReleased {
    pub version: u32,
    pub bounty_id: u64,
    pub amount: i128,
    pub recipient: Address,
    pub timestamp: u64,
}

pub fn emit_funds_released(env: &Env, event: FundsReleased) {
    let topics = (symbol_short!("f_rel"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsRefunded {
    pub version: u32,
    pub bounty_id: u64,
    pub amount: i128,
    pub refund_to: Address,
    pub timestamp: u64,
}

pub fn emit_funds_refunded(env: &Env, event: FundsRefunded) {
    let topics = (symbol_short!("f_ref"), event.bounty_id);
    env.events().publish(topics, event);
}

/// Opening record of an escrow's audit trail, written once by the lock. It
/// carries the transition fields except `from_status`, which has no value yet.
#[contracttype]
#[derive(Clone, Debug)]
pub struct EscrowOpened {
    pub bounty_id: u64,
    pub to_status: EscrowStatus,
    pub amount: i128,
    pub actor: Address,
    pub timestamp: u64,
}

pub fn emit_escrow_opened(env: &Env, event: EscrowOpened) {
    let topics = (symbol_short!("esc_new"), event.bounty_id);
    env.events().publish(topics, event);
}

/// Audit record written for every status change after the lock.
#[contracttype]
#[derive(Clone, Debug)]
pub struct EscrowTransition {
    pub bounty_id: u64,
    pub from_status: EscrowStatus,
    pub to_status: EscrowStatus,
    pub amount: i128,
    pub actor: Address,
    pub timestamp: u64,
}

pub fn emit_escrow_transition(env: &Env, event: EscrowTransition) {
    let topics = (symbol_short!("esc_tr"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeeOperationType {
    Lock,
    Release,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FeeCollected {
    pub version: u32,
    pub operation_type: FeeOperationType,
    pub amount: i128,
    pub fee_rate: i128,
    pub recipient: Address,
    pub timestamp: u64,
}

pub fn emit_fee_collected(env: &Env, event: FeeCollected) {
    let topics = (symbol_short!("fee"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FeeConfigUpdated {
    pub lock_fee_rate: i128,
    pub release_fee_rate: i128,
    pub fee_recipient: Address,
    pub fee_enabled: bool,
    pub timestamp: u64,
}

pub fn emit_fee_config_updated(env: &Env, event: FeeConfigUpdated) {
    let topics = (symbol_short!("fee_cfg"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MultisigConfigUpdated {
    pub threshold_amount: i128,
    pub signers: Vec<Address>,
    pub required_signatures: u32,
    pub timestamp: u64,
}

pub fn emit_multisig_config_updated(env: &Env, event: MultisigConfigUpdated) {
    let topics = (symbol_short!("msig_cfg"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RateLimitConfigUpdated {
    pub window_size: u64,
    pub max_operations: u32,
    pub cooldown_period: u64,
    pub timestamp: u64,
}

pub fn emit_rate_limit_config_updated(env: &Env, event: RateLimitConfigUpdated) {
    let topics = (symbol_short!("rl_cfg"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ApprovalAdded {
    pub bounty_id: u64,
    pub contributor: Address,
    pub approver: Address,
    pub timestamp: u64,
}

pub fn emit_approval_added(env: &Env, event: ApprovalAdded) {
    let topics = (symbol_short!("approval"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimCreated {
    pub bounty_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub expires_at: u64,
    pub reason: DisputeReason,
}

pub fn emit_claim_created(env: &Env, event: ClaimCreated) {
    let topics = (symbol_short!("claim"), symbol_short!("created"));
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimExecuted {
    pub bounty_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub claimed_at: u64,
    pub outcome: DisputeOutcome,
}

pub fn emit_claim_executed(env: &Env, event: ClaimExecuted) {
    let topics = (symbol_short!("claim"), symbol_short!("done"));
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct ClaimCancelled {
    pub bounty_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub cancelled_at: u64,
    pub cancelled_by: Address,
    pub outcome: DisputeOutcome,
}

pub fn emit_claim_cancelled(env: &Env, event: ClaimCancelled) {
    let topics = (symbol_short!("claim"), symbol_short!("cancel"));
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseStateChanged {
    pub operation: Symbol,
    pub paused: bool,
    pub admin: Address,
    pub reason: Option<soroban_sdk::String>,
    pub timestamp: u64,
}

pub fn emit_pause_state_changed(env: &Env, event: PauseStateChanged) {
    let topics = (symbol_short!("pause"), event.operation.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct EmergencyWithdrawEvent {
    pub admin: Address,
    pub target: Address,
    pub amount: i128,
    pub timestamp: u64,
}

pub fn emit_emergency_withdraw(env: &Env, event: EmergencyWithdrawEvent) {
    let topics = (symbol_short!("em_wtd"),);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CapabilityIssued {
    pub capability_id: u64,
    pub owner: Address,
    pub holder: Address,
    pub action: CapabilityAction,
    pub bounty_id: u64,
    pub amount_limit: i128,
    pub expires_at: u64,
    pub max_uses: u32,
    pub timestamp: u64,
}

pub fn emit_capability_issued(env: &Env, event: CapabilityIssued) {
    let topics = (symbol_short!("cap_new"), event.capability_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CapabilityUsed {
    pub capability_id: u64,
    pub holder: Address,
    pub action: CapabilityAction,
    pub bounty_id: u64,
    pub amount: i128,
    pub remaining_amount: i128,
    pub uses_left: u32,
    pub used_at: u64,
}

pub fn emit_capability_used(env: &Env, event: CapabilityUsed) {
    let topics = (symbol_short!("cap_use"), event.capability_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct CapabilityRevoked {
    pub capability_id: u64,
    pub owner: Address,
    pub revoked_at: u64,
}

pub fn emit_capability_revoked(env: &Env, event: CapabilityRevoked) {
    let topics = (symbol_short!("cap_rev"), event.capability_id);
    env.events().publish(topics, event);
}
