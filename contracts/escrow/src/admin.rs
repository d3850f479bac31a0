//! Admin registry: the single privileged identity and the configuration only
//! it may change (fees, multisig release approval, lock rate limiting,
//! contract version).

use crate::{
    asset, events, fees,
    storage::{self, DataKey},
    Error,
};
use soroban_sdk::{contracttype, log, vec, Address, Env, Vec};

pub const CONTRACT_VERSION: u32 = 1;

/// Rotation policy chosen when the contract is deployed.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdminPolicy {
    /// The current admin may hand the role to a new identity via `set_admin`.
    Rotatable,
    /// The admin set by `init` is permanent.
    Immutable,
}

trait AdminRotation {
    fn rotate(&self, env: &Env, current: &Address, new_admin: &Address) -> Result<(), Error>;
}

struct RotatableAdmin;
struct FixedAdmin;

impl AdminRotation for RotatableAdmin {
    fn rotate(&self, env: &Env, current: &Address, new_admin: &Address) -> Result<(), Error> {
        current.require_auth();
        env.storage().instance().set(&DataKey::Admin, new_admin);
        Ok(())
    }
}

impl AdminRotation for FixedAdmin {
    fn rotate(&self, env: &Env, _current: &Address, _new_admin: &Address) -> Result<(), Error> {
        log!(env, "admin rotation rejected: immutable deployment");
        Err(Error::AdminImmutable)
    }
}

impl AdminPolicy {
    fn rotation(&self) -> &'static dyn AdminRotation {
        match self {
            AdminPolicy::Rotatable => &RotatableAdmin,
            AdminPolicy::Immutable => &FixedAdmin,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfig {
    pub lock_fee_rate: i128,
    pub release_fee_rate: i128,
    pub fee_recipient: Address,
    pub fee_enabled: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultisigConfig {
    pub threshold_amount: i128,
    pub signers: Vec<Address>,
    pub required_signatures: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseApproval {
    pub bounty_id: u64,
    pub contributor: Address,
    pub approvals: Vec<Address>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimitConfig {
    pub window_size: u64,     // seconds
    pub max_operations: u32,  // per window
    pub cooldown_period: u64, // minimum seconds between operations
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimitState {
    pub last_operation_timestamp: u64,
    pub window_start_timestamp: u64,
    pub operation_count: u32,
}

pub(crate) fn initialize(
    env: &Env,
    admin: Address,
    token: Address,
    policy: AdminPolicy,
) -> Result<(), Error> {
    if storage::is_initialized(env) {
        return Err(Error::AlreadyInitialized);
    }
    let token = asset::normalize_asset_id(&token)?;

    let instance = env.storage().instance();
    instance.set(&DataKey::Admin, &admin);
    instance.set(&DataKey::Token, &token);
    instance.set(&DataKey::AdminPolicy, &policy);
    instance.set(&DataKey::Version, &CONTRACT_VERSION);
    storage::bump_instance(env);

    events::emit_bounty_initialized(
        env,
        events::BountyEscrowInitialized {
            version: events::EVENT_VERSION_V2,
            admin,
            token,
            policy,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

/// Loads the current admin and requires its signature on this invocation.
pub(crate) fn require_admin(env: &Env) -> Result<Address, Error> {
    let admin = storage::admin(env)?;
    admin.require_auth();
    Ok(admin)
}

pub(crate) fn policy(env: &Env) -> Result<AdminPolicy, Error> {
    env.storage()
        .instance()
        .get(&DataKey::AdminPolicy)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn set_admin(env: &Env, new_admin: Address) -> Result<(), Error> {
    let current = storage::admin(env)?;
    policy(env)?.rotation().rotate(env, &current, &new_admin)?;

    events::emit_admin_updated(
        env,
        events::AdminUpdated {
            old_admin: current,
            new_admin,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

pub(crate) fn version(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&DataKey::Version)
        .unwrap_or(0)
}

pub(crate) fn set_version(env: &Env, new_version: u32) -> Result<(), Error> {
    require_admin(env)?;
    env.storage().instance().set(&DataKey::Version, &new_version);
    Ok(())
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

pub(crate) fn fee_config(env: &Env) -> Result<FeeConfig, Error> {
    if let Some(config) = env.storage().instance().get(&DataKey::FeeConfig) {
        return Ok(config);
    }
    Ok(FeeConfig {
        lock_fee_rate: 0,
        release_fee_rate: 0,
        fee_recipient: storage::admin(env)?,
        fee_enabled: false,
    })
}

pub(crate) fn update_fee_config(
    env: &Env,
    lock_fee_rate: Option<i128>,
    release_fee_rate: Option<i128>,
    fee_recipient: Option<Address>,
    fee_enabled: Option<bool>,
) -> Result<(), Error> {
    require_admin(env)?;
    let mut config = fee_config(env)?;

    if let Some(rate) = lock_fee_rate {
        if !fees::is_valid_rate(rate) {
            return Err(Error::InvalidFeeRate);
        }
        config.lock_fee_rate = rate;
    }
    if let Some(rate) = release_fee_rate {
        if !fees::is_valid_rate(rate) {
            return Err(Error::InvalidFeeRate);
        }
        config.release_fee_rate = rate;
    }
    if let Some(recipient) = fee_recipient {
        config.fee_recipient = recipient;
    }
    if let Some(enabled) = fee_enabled {
        config.fee_enabled = enabled;
    }

    env.storage().instance().set(&DataKey::FeeConfig, &config);

    events::emit_fee_config_updated(
        env,
        events::FeeConfigUpdated {
            lock_fee_rate: config.lock_fee_rate,
            release_fee_rate: config.release_fee_rate,
            fee_recipient: config.fee_recipient,
            fee_enabled: config.fee_enabled,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Multisig release approval
// ---------------------------------------------------------------------------

pub(crate) fn multisig_config(env: &Env) -> MultisigConfig {
    env.storage()
        .instance()
        .get(&DataKey::MultisigConfig)
        .unwrap_or(MultisigConfig {
            threshold_amount: i128::MAX,
            signers: vec![env],
            required_signatures: 0,
        })
}

pub(crate) fn update_multisig_config(
    env: &Env,
    threshold_amount: i128,
    signers: Vec<Address>,
    required_signatures: u32,
) -> Result<(), Error> {
    require_admin(env)?;

    if threshold_amount <= 0 || required_signatures > signers.len() {
        return Err(Error::InvalidMultisigConfig);
    }

    let config = MultisigConfig {
        threshold_amount,
        signers: signers.clone(),
        required_signatures,
    };
    env.storage()
        .instance()
        .set(&DataKey::MultisigConfig, &config);

    events::emit_multisig_config_updated(
        env,
        events::MultisigConfigUpdated {
            threshold_amount,
            signers,
            required_signatures,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

pub(crate) fn approve_large_release(
    env: &Env,
    bounty_id: u64,
    contributor: Address,
    approver: Address,
) -> Result<(), Error> {
    if !storage::is_initialized(env) {
        return Err(Error::NotInitialized);
    }
    storage::load_escrow(env, bounty_id)?;

    let config = multisig_config(env);
    if !config.signers.contains(&approver) {
        return Err(Error::Unauthorized);
    }
    approver.require_auth();

    let key = DataKey::ReleaseApproval(bounty_id);
    let mut approval = match env
        .storage()
        .persistent()
        .get::<DataKey, ReleaseApproval>(&key)
    {
        // Approvals gathered for a different contributor do not carry over.
        Some(existing) if existing.contributor == contributor => existing,
        _ => ReleaseApproval {
            bounty_id,
            contributor: contributor.clone(),
            approvals: vec![env],
        },
    };

    if approval.approvals.contains(&approver) {
        return Ok(());
    }
    approval.approvals.push_back(approver.clone());
    env.storage().persistent().set(&key, &approval);

    events::emit_approval_added(
        env,
        events::ApprovalAdded {
            bounty_id,
            contributor,
            approver,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

/// Enforces the multisig rule for a payout of `amount` to `contributor`,
/// consuming the approval record when it was needed. Called by direct and
/// capability releases, and by `authorize_claim` when a claim is designated.
pub(crate) fn consume_release_approval(
    env: &Env,
    bounty_id: u64,
    contributor: &Address,
    amount: i128,
) -> Result<(), Error> {
    let config = multisig_config(env);
    if config.required_signatures == 0 || amount < config.threshold_amount {
        return Ok(());
    }

    let key = DataKey::ReleaseApproval(bounty_id);
    let approval: Option<ReleaseApproval> = env.storage().persistent().get(&key);
    let valid_approvals = match &approval {
        Some(approval) if approval.contributor == *contributor => approval
            .approvals
            .iter()
            .filter(|signer| config.signers.contains(signer))
            .count() as u32,
        _ => 0,
    };

    if valid_approvals < config.required_signatures {
        log!(env, "release needs multisig approval", bounty_id, valid_approvals);
        return Err(Error::MultisigApprovalRequired);
    }
    env.storage().persistent().remove(&key);
    Ok(())
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

pub(crate) fn rate_limit_config(env: &Env) -> Option<RateLimitConfig> {
    env.storage().instance().get(&DataKey::RateLimitConfig)
}

pub(crate) fn update_rate_limit_config(
    env: &Env,
    window_size: u64,
    max_operations: u32,
    cooldown_period: u64,
) -> Result<(), Error> {
    require_admin(env)?;
    if window_size == 0 || max_operations == 0 {
        return Err(Error::InvalidAmount);
    }

    env.storage().instance().set(
        &DataKey::RateLimitConfig,
        &RateLimitConfig {
            window_size,
            max_operations,
            cooldown_period,
        },
    );

    events::emit_rate_limit_config_updated(
        env,
        events::RateLimitConfigUpdated {
            window_size,
            max_operations,
            cooldown_period,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

pub(crate) fn set_rate_limit_exempt(env: &Env, address: Address, exempt: bool) -> Result<(), Error> {
    require_admin(env)?;
    let key = DataKey::RateLimitExempt(address);
    if exempt {
        env.storage().instance().set(&key, &true);
    } else {
        env.storage().instance().remove(&key);
    }
    Ok(())
}

pub(crate) fn is_rate_limit_exempt(env: &Env, address: &Address) -> bool {
    env.storage()
        .instance()
        .has(&DataKey::RateLimitExempt(address.clone()))
}

/// Records one operation for `address`, failing when it falls inside the
/// cooldown or exceeds the per-window quota. No config means no limit.
pub(crate) fn check_rate_limit(env: &Env, address: &Address) -> Result<(), Error> {
    let config = match rate_limit_config(env) {
        Some(config) => config,
        None => return Ok(()),
    };
    if is_rate_limit_exempt(env, address) {
        return Ok(());
    }

    let now = env.ledger().timestamp();
    let key = DataKey::RateLimitState(address.clone());
    let previous: Option<RateLimitState> = env.storage().persistent().get(&key);

    let state = match previous {
        Some(mut state) => {
            if now < state
                .last_operation_timestamp
                .saturating_add(config.cooldown_period)
            {
                log!(env, "lock rejected: cooldown", address.clone(), now);
                return Err(Error::CooldownActive);
            }
            if now >= state.window_start_timestamp.saturating_add(config.window_size) {
                state.window_start_timestamp = now;
                state.operation_count = 1;
            } else {
                if state.operation_count >= config.max_operations {
                    log!(env, "lock rejected: rate limit", address.clone(), now);
                    return Err(Error::RateLimitExceeded);
                }
                state.operation_count += 1;
            }
            state.last_operation_timestamp = now;
            state
        }
        None => RateLimitState {
            last_operation_timestamp: now,
            window_start_timestamp: now,
            operation_count: 1,
        },
    };

    env.storage().persistent().set(&key, &state);
    env.storage().persistent().extend_ttl(
        &key,
        storage::DAY_IN_LEDGERS,
        storage::DAY_IN_LEDGERS,
    );
    Ok(())
}
