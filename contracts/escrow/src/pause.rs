//! Pause controller: three independent kill switches plus the pause-gated
//! emergency drain.

use crate::{
    admin, events, ledger,
    storage::{self, DataKey},
    Error,
};
use soroban_sdk::{contracttype, log, symbol_short, Address, Env, Symbol};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseFlags {
    pub lock_paused: bool,
    pub release_paused: bool,
    pub refund_paused: bool,
    pub pause_reason: Option<soroban_sdk::String>,
    pub paused_at: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Operation {
    Lock,
    Release,
    Refund,
}

impl Operation {
    fn symbol(self) -> Symbol {
        match self {
            Operation::Lock => symbol_short!("lock"),
            Operation::Release => symbol_short!("release"),
            Operation::Refund => symbol_short!("refund"),
        }
    }

    fn is_paused(self, flags: &PauseFlags) -> bool {
        match self {
            Operation::Lock => flags.lock_paused,
            Operation::Release => flags.release_paused,
            Operation::Refund => flags.refund_paused,
        }
    }
}

pub(crate) fn pause_flags(env: &Env) -> PauseFlags {
    env.storage()
        .instance()
        .get(&DataKey::PauseFlags)
        .unwrap_or(PauseFlags {
            lock_paused: false,
            release_paused: false,
            refund_paused: false,
            pause_reason: None,
            paused_at: 0,
        })
}

pub(crate) fn ensure_not_paused(env: &Env, operation: Operation) -> Result<(), Error> {
    if operation.is_paused(&pause_flags(env)) {
        log!(env, "operation paused", operation.symbol());
        return Err(Error::FundsPaused);
    }
    Ok(())
}

pub(crate) fn set_paused(
    env: &Env,
    lock: Option<bool>,
    release: Option<bool>,
    refund: Option<bool>,
    reason: Option<soroban_sdk::String>,
) -> Result<(), Error> {
    let admin = admin::require_admin(env)?;

    let mut flags = pause_flags(env);
    let timestamp = env.ledger().timestamp();

    if reason.is_some() {
        flags.pause_reason = reason.clone();
    }

    let updates = [
        (Operation::Lock, lock),
        (Operation::Release, release),
        (Operation::Refund, refund),
    ];
    for (operation, requested) in updates {
        let Some(paused) = requested else {
            continue;
        };
        match operation {
            Operation::Lock => flags.lock_paused = paused,
            Operation::Release => flags.release_paused = paused,
            Operation::Refund => flags.refund_paused = paused,
        }
        events::emit_pause_state_changed(
            env,
            events::PauseStateChanged {
                operation: operation.symbol(),
                paused,
                admin: admin.clone(),
                reason: reason.clone(),
                timestamp,
            },
        );
    }

    let any_paused = flags.lock_paused || flags.release_paused || flags.refund_paused;
    if any_paused {
        if flags.paused_at == 0 {
            flags.paused_at = timestamp;
        }
    } else {
        flags.pause_reason = None;
        flags.paused_at = 0;
    }

    env.storage().instance().set(&DataKey::PauseFlags, &flags);
    Ok(())
}

/// Drains the contract's whole token balance to `target`.
///
/// Admin only, and only while `lock_paused` is set. Open escrow records are
/// written off so their accounting matches the empty balance. A second call
/// on a drained contract transfers nothing and still succeeds. Pause flags are
/// left as they are; resuming requires an explicit `set_paused`.
pub(crate) fn emergency_withdraw(env: &Env, target: Address) -> Result<i128, Error> {
    let admin = admin::require_admin(env)?;

    if !pause_flags(env).lock_paused {
        return Err(Error::NotPaused);
    }

    let token_client = ledger::token_client(env)?;
    let contract_address = env.current_contract_address();
    let balance = token_client.balance(&contract_address);

    ledger::write_off_open_escrows(env, &admin);
    storage::bump_instance(env);

    if balance > 0 {
        token_client.transfer(&contract_address, &target, &balance);
    }

    events::emit_emergency_withdraw(
        env,
        events::EmergencyWithdrawEvent {
            admin,
            target,
            amount: balance,
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(balance)
}
