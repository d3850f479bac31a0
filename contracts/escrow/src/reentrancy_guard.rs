//! Cross-function reentrancy guard for fund-moving entrypoints.
//!
//! A flag in instance storage is held for the duration of a guarded call. A
//! token callback that re-enters any guarded entrypoint finds the flag set and
//! aborts. Soroban reverts every write of a failed invocation, so an early
//! `Err` return can never leave the flag stuck.

use crate::{storage::DataKey, Error};
use soroban_sdk::Env;

/// # Panics
/// Panics with `"Reentrancy detected"` if the guard is already held.
pub fn acquire(env: &Env) {
    if env.storage().instance().has(&DataKey::ReentrancyGuard) {
        panic!("Reentrancy detected");
    }
    env.storage()
        .instance()
        .set(&DataKey::ReentrancyGuard, &true);
}

pub fn release(env: &Env) {
    env.storage().instance().remove(&DataKey::ReentrancyGuard);
}

/// Runs `op` with the guard held.
pub fn guarded<T>(env: &Env, op: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    acquire(env);
    let result = op();
    release(env);
    result
}

#[cfg(test)]
pub fn is_active(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::ReentrancyGuard)
}
