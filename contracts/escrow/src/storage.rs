//! Typed access to the contract's persistent state.
//!
//! Every record is keyed by a stable identifier (bounty id, capability id,
//! address). Components never touch `env.storage()` for these records
//! directly; they go through the loaders and savers below so that each call
//! reads the latest persisted state and every write refreshes the record TTL.

use crate::{capability::Capability, ledger::ClaimRecord, ledger::Escrow, Error};
use soroban_sdk::{contracttype, Address, Env, Vec};

pub(crate) const DAY_IN_LEDGERS: u32 = 17_280;
pub(crate) const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
pub(crate) const INSTANCE_LIFETIME_THRESHOLD: u32 = INSTANCE_BUMP_AMOUNT - DAY_IN_LEDGERS;
pub(crate) const RECORD_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
pub(crate) const RECORD_LIFETIME_THRESHOLD: u32 = RECORD_BUMP_AMOUNT - DAY_IN_LEDGERS;

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    AdminPolicy,
    Token,
    Version,
    FeeConfig,
    MultisigConfig,
    RateLimitConfig,
    RateLimitState(Address),
    RateLimitExempt(Address),
    PauseFlags,
    ClaimWindow,
    ReentrancyGuard,
    Escrow(u64),          // bounty_id -> Escrow
    EscrowIndex,          // Vec<u64> of all bounty_ids
    OpenEscrows,          // Vec<u64> of bounty_ids not yet Released/Refunded
    PendingClaim(u64),    // bounty_id -> ClaimRecord
    ReleaseApproval(u64), // bounty_id -> ReleaseApproval
    CapabilityNonce,      // last issued capability id
    Capability(u64),      // capability_id -> Capability
}

pub(crate) fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

fn bump_record(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, RECORD_LIFETIME_THRESHOLD, RECORD_BUMP_AMOUNT);
}

pub(crate) fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Admin)
}

pub(crate) fn admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn has_escrow(env: &Env, bounty_id: u64) -> bool {
    env.storage().persistent().has(&DataKey::Escrow(bounty_id))
}

pub(crate) fn load_escrow(env: &Env, bounty_id: u64) -> Result<Escrow, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Escrow(bounty_id))
        .ok_or(Error::BountyNotFound)
}

pub(crate) fn save_escrow(env: &Env, bounty_id: u64, escrow: &Escrow) {
    let key = DataKey::Escrow(bounty_id);
    env.storage().persistent().set(&key, escrow);
    bump_record(env, &key);
}

pub(crate) fn escrow_index(env: &Env) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::EscrowIndex)
        .unwrap_or(Vec::new(env))
}

pub(crate) fn index_escrow(env: &Env, bounty_id: u64) {
    let mut index = escrow_index(env);
    index.push_back(bounty_id);
    env.storage()
        .persistent()
        .set(&DataKey::EscrowIndex, &index);
    bump_record(env, &DataKey::EscrowIndex);
}

pub(crate) fn open_escrows(env: &Env) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::OpenEscrows)
        .unwrap_or(Vec::new(env))
}

fn save_open_escrows(env: &Env, open: &Vec<u64>) {
    env.storage().persistent().set(&DataKey::OpenEscrows, open);
    bump_record(env, &DataKey::OpenEscrows);
}

pub(crate) fn track_open_escrow(env: &Env, bounty_id: u64) {
    let mut open = open_escrows(env);
    open.push_back(bounty_id);
    save_open_escrows(env, &open);
}

pub(crate) fn untrack_open_escrow(env: &Env, bounty_id: u64) {
    let mut open = open_escrows(env);
    if let Some(position) = open.first_index_of(bounty_id) {
        open.remove(position);
        save_open_escrows(env, &open);
    }
}

pub(crate) fn clear_open_escrows(env: &Env) {
    env.storage().persistent().remove(&DataKey::OpenEscrows);
}

pub(crate) fn pending_claim(env: &Env, bounty_id: u64) -> Option<ClaimRecord> {
    env.storage()
        .persistent()
        .get(&DataKey::PendingClaim(bounty_id))
}

pub(crate) fn save_pending_claim(env: &Env, bounty_id: u64, claim: &ClaimRecord) {
    let key = DataKey::PendingClaim(bounty_id);
    env.storage().persistent().set(&key, claim);
    bump_record(env, &key);
}

pub(crate) fn remove_pending_claim(env: &Env, bounty_id: u64) {
    env.storage()
        .persistent()
        .remove(&DataKey::PendingClaim(bounty_id));
}

pub(crate) fn load_capability(env: &Env, capability_id: u64) -> Result<Capability, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Capability(capability_id))
        .ok_or(Error::CapabilityNotFound)
}

pub(crate) fn save_capability(env: &Env, capability: &Capability) {
    let key = DataKey::Capability(capability.id);
    env.storage().persistent().set(&key, capability);
    bump_record(env, &key);
}

pub(crate) fn next_capability_id(env: &Env) -> u64 {
    let last_id: u64 = env
        .storage()
        .instance()
        .get(&DataKey::CapabilityNonce)
        .unwrap_or(0);
    let next_id = last_id.saturating_add(1);
    env.storage()
        .instance()
        .set(&DataKey::CapabilityNonce, &next_id);
    next_id
}
