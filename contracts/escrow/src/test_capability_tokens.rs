#![cfg(test)]

use crate::{
    BountyEscrowContract, BountyEscrowContractClient, CapabilityAction, DisputeOutcome,
    DisputeReason, Error, EscrowStatus,
};
use soroban_sdk::{
    testutils::{Address as _, Events, Ledger},
    token, Address, Env, Symbol, TryFromVal,
};

struct CapabilitySetup {
    env: Env,
    client: BountyEscrowContractClient<'static>,
    token_client: token::Client<'static>,
    admin: Address,
    depositor: Address,
    contributor: Address,
    delegate: Address,
    recipient: Address,
}

impl CapabilitySetup {
    fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();

        let admin = Address::generate(&env);
        let depositor = Address::generate(&env);
        let contributor = Address::generate(&env);
        let delegate = Address::generate(&env);
        let recipient = Address::generate(&env);

        let token_admin_addr = Address::generate(&env);
        let token_address = env
            .register_stellar_asset_contract_v2(token_admin_addr.clone())
            .address();
        let token_client = token::Client::new(&env, &token_address);
        let token_admin = token::StellarAssetClient::new(&env, &token_address);

        let contract_id = env.register_contract(None, BountyEscrowContract);
        let client = BountyEscrowContractClient::new(&env, &contract_id);

        client.init(&admin, &token_address, &crate::AdminPolicy::Rotatable);
        token_admin.mint(&depositor, &100_000);

        Self {
            env,
            client,
            token_client,
            admin,
            depositor,
            contributor,
            delegate,
            recipient,
        }
    }

    fn lock(&self, bounty_id: u64, amount: i128) {
        let deadline = self.env.ledger().timestamp() + 10_000;
        self.client
            .lock_funds(&self.depositor, &bounty_id, &amount, &deadline);
    }

    fn expiry(&self) -> u64 {
        self.env.ledger().timestamp() + 300
    }

    fn issue_release(&self, bounty_id: u64, amount_limit: i128, max_uses: u32) -> u64 {
        self.client.issue_capability(
            &self.admin,
            &self.delegate,
            &CapabilityAction::Release,
            &bounty_id,
            &amount_limit,
            &self.expiry(),
            &max_uses,
        )
    }
}

fn has_event_topic(env: &Env, topic_name: &str) -> bool {
    let expected = Symbol::new(env, topic_name);
    let events = env.events().all();
    for (_contract, topics, _data) in events.iter() {
        if topics.len() == 0 {
            continue;
        }
        let first = topics.get(0).unwrap();
        if let Ok(sym) = Symbol::try_from_val(env, &first) {
            if sym == expected {
                return true;
            }
        }
    }
    false
}

#[test]
fn test_release_capability_amount_and_use_limits() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);

    let capability_id = setup.issue_release(1, 600, 2);
    assert!(has_event_topic(&setup.env, "cap_new"));

    let issued = setup.client.get_capability(&capability_id);
    assert_eq!(issued.id, capability_id);
    assert_eq!(issued.owner, setup.admin);
    assert_eq!(issued.holder, setup.delegate);
    assert_eq!(issued.remaining_amount, 600);
    assert_eq!(issued.max_uses, 2);
    assert_eq!(issued.remaining_uses, 2);
    assert!(!issued.revoked);

    setup.client.release_with_capability(
        &1,
        &setup.contributor,
        &400,
        &setup.delegate,
        &capability_id,
    );
    assert!(has_event_topic(&setup.env, "cap_use"));

    let after_first = setup.client.get_capability(&capability_id);
    assert_eq!(after_first.remaining_amount, 200);
    assert_eq!(after_first.remaining_uses, 1);

    let too_large = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &250,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(
        too_large.unwrap_err().unwrap(),
        Error::CapabilityAmountExceeded
    );
    assert_eq!(setup.client.get_capability(&capability_id), after_first);

    setup.client.release_with_capability(
        &1,
        &setup.contributor,
        &200,
        &setup.delegate,
        &capability_id,
    );
    let exhausted = setup.client.get_capability(&capability_id);
    assert_eq!(exhausted.remaining_amount, 0);
    assert_eq!(exhausted.remaining_uses, 0);

    let further = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &1,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(
        further.unwrap_err().unwrap(),
        Error::CapabilityUsesExhausted
    );

    let escrow = setup.client.get_escrow_info(&1);
    assert_eq!(escrow.status, EscrowStatus::Locked);
    assert_eq!(escrow.released_amount, 600);
    assert_eq!(setup.token_client.balance(&setup.contributor), 600);
}

#[test]
fn test_release_capability_rejected_after_admin_rotation() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 500, 3);

    let new_admin = Address::generate(&setup.env);
    setup.client.set_admin(&new_admin);
    assert_eq!(setup.client.get_admin(), new_admin);

    let before = setup.client.get_capability(&capability_id);
    let result = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::Unauthorized);

    assert_eq!(setup.client.get_capability(&capability_id), before);
    assert_eq!(setup.client.get_escrow_info(&1).released_amount, 0);
}

#[test]
fn test_issue_requires_current_authority() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let expiry = setup.expiry();

    let not_admin = setup.client.try_issue_capability(
        &setup.depositor,
        &setup.delegate,
        &CapabilityAction::Refund,
        &1,
        &100,
        &expiry,
        &1,
    );
    assert_eq!(not_admin.unwrap_err().unwrap(), Error::Unauthorized);

    let over_balance = setup.client.try_issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Release,
        &1,
        &1_001,
        &expiry,
        &1,
    );
    assert_eq!(
        over_balance.unwrap_err().unwrap(),
        Error::CapabilityExceedsAuthority
    );

    // No claim recipient has been designated yet.
    let no_claim = setup.client.try_issue_capability(
        &setup.recipient,
        &setup.delegate,
        &CapabilityAction::Claim,
        &1,
        &100,
        &expiry,
        &1,
    );
    assert_eq!(no_claim.unwrap_err().unwrap(), Error::ClaimNotFound);
}

#[test]
fn test_issue_validates_parameters() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let expiry = setup.expiry();

    let zero_uses = setup.client.try_issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Release,
        &1,
        &100,
        &expiry,
        &0,
    );
    assert_eq!(zero_uses.unwrap_err().unwrap(), Error::InvalidAmount);

    let zero_amount = setup.client.try_issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Release,
        &1,
        &0,
        &expiry,
        &1,
    );
    assert_eq!(zero_amount.unwrap_err().unwrap(), Error::InvalidAmount);

    let now = setup.env.ledger().timestamp();
    let stale = setup.client.try_issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Release,
        &1,
        &100,
        &now,
        &1,
    );
    assert_eq!(stale.unwrap_err().unwrap(), Error::InvalidDeadline);

    let missing_bounty = setup.client.try_issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Release,
        &9,
        &100,
        &expiry,
        &1,
    );
    assert_eq!(missing_bounty.unwrap_err().unwrap(), Error::BountyNotFound);
}

#[test]
fn test_claim_capability() {
    let setup = CapabilitySetup::new();
    setup.lock(2, 2_000);
    setup.client.set_claim_window(&1_000);
    setup
        .client
        .authorize_claim(&2, &setup.recipient, &1_500, &DisputeReason::Other);

    let capability_id = setup.client.issue_capability(
        &setup.recipient,
        &setup.delegate,
        &CapabilityAction::Claim,
        &2,
        &1_500,
        &setup.expiry(),
        &1,
    );

    setup
        .client
        .claim_with_capability(&2, &setup.delegate, &capability_id);

    assert_eq!(setup.token_client.balance(&setup.recipient), 1_500);
    assert_eq!(setup.token_client.balance(&setup.delegate), 0);
    assert!(setup.client.get_pending_claim(&2).claimed);

    let escrow = setup.client.get_escrow_info(&2);
    assert_eq!(escrow.released_amount, 1_500);
    assert_eq!(escrow.contributor, Some(setup.recipient.clone()));

    let used = setup.client.get_capability(&capability_id);
    assert_eq!(used.remaining_amount, 0);
    assert_eq!(used.remaining_uses, 0);
}

#[test]
fn test_claim_capability_rejected_after_claim_cancelled() {
    let setup = CapabilitySetup::new();
    setup.lock(2, 2_000);
    setup.client.set_claim_window(&1_000);
    setup
        .client
        .authorize_claim(&2, &setup.recipient, &500, &DisputeReason::Other);
    let capability_id = setup.client.issue_capability(
        &setup.recipient,
        &setup.delegate,
        &CapabilityAction::Claim,
        &2,
        &500,
        &setup.expiry(),
        &1,
    );

    setup
        .client
        .cancel_pending_claim(&2, &DisputeOutcome::CancelledByAdmin);
    setup
        .client
        .authorize_claim(&2, &setup.contributor, &500, &DisputeReason::Other);

    let result = setup
        .client
        .try_claim_with_capability(&2, &setup.delegate, &capability_id);
    assert_eq!(result.unwrap_err().unwrap(), Error::Unauthorized);
    assert_eq!(setup.token_client.balance(&setup.recipient), 0);
}

#[test]
fn test_refund_capability() {
    let setup = CapabilitySetup::new();
    setup.lock(3, 1_000);

    let capability_id = setup.client.issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Refund,
        &3,
        &1_000,
        &setup.expiry(),
        &2,
    );

    setup
        .client
        .refund_with_capability(&3, &400, &setup.delegate, &capability_id);
    let escrow = setup.client.get_escrow_info(&3);
    assert_eq!(escrow.status, EscrowStatus::PartiallyRefunded);

    setup
        .client
        .refund_with_capability(&3, &600, &setup.delegate, &capability_id);
    let escrow = setup.client.get_escrow_info(&3);
    assert_eq!(escrow.status, EscrowStatus::Refunded);
    assert_eq!(setup.token_client.balance(&setup.depositor), 100_000);
}

#[test]
fn test_capability_scoped_to_action_and_bounty() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    setup.lock(2, 1_000);
    let capability_id = setup.issue_release(1, 500, 2);

    let wrong_action = setup
        .client
        .try_refund_with_capability(&1, &100, &setup.delegate, &capability_id);
    assert_eq!(
        wrong_action.unwrap_err().unwrap(),
        Error::CapabilityActionMismatch
    );

    let wrong_bounty = setup.client.try_release_with_capability(
        &2,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(
        wrong_bounty.unwrap_err().unwrap(),
        Error::CapabilityActionMismatch
    );

    let wrong_holder = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.contributor,
        &capability_id,
    );
    assert_eq!(wrong_holder.unwrap_err().unwrap(), Error::Unauthorized);

    let missing = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &77,
    );
    assert_eq!(missing.unwrap_err().unwrap(), Error::CapabilityNotFound);
}

#[test]
fn test_expired_capability_rejected() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 500, 2);

    let expiry = setup.client.get_capability(&capability_id).expiry;
    setup.env.ledger().set_timestamp(expiry + 1);

    let result = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::CapabilityExpired);
}

#[test]
fn test_use_beyond_current_balance_exceeds_authority() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 800, 2);

    // The admin pays out most of the bounty directly; the ceiling shrinks with it.
    setup.client.release_funds(&1, &setup.contributor, &700);

    let result = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &400,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(
        result.unwrap_err().unwrap(),
        Error::CapabilityExceedsAuthority
    );
    assert_eq!(setup.client.get_capability(&capability_id).remaining_uses, 2);
}

#[test]
fn test_revoke_capability() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 500, 2);

    let not_owner = setup
        .client
        .try_revoke_capability(&setup.delegate, &capability_id);
    assert_eq!(not_owner.unwrap_err().unwrap(), Error::Unauthorized);

    setup.client.revoke_capability(&setup.admin, &capability_id);
    assert!(has_event_topic(&setup.env, "cap_rev"));
    assert!(setup.client.get_capability(&capability_id).revoked);

    let result = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::CapabilityRevoked);

    // Revoking again is a no-op.
    setup.client.revoke_capability(&setup.admin, &capability_id);
    let revoked = setup.client.get_capability(&capability_id);
    assert!(revoked.revoked);
    assert_eq!(revoked.remaining_amount, 500);
}

#[test]
fn test_revoke_exhausted_capability_is_noop() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 300, 1);
    setup.client.release_with_capability(
        &1,
        &setup.contributor,
        &300,
        &setup.delegate,
        &capability_id,
    );

    setup.client.revoke_capability(&setup.admin, &capability_id);
    let capability = setup.client.get_capability(&capability_id);
    assert!(!capability.revoked);
    assert_eq!(capability.remaining_uses, 0);
}

#[test]
fn test_capability_release_blocked_by_pause() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 500, 1);
    setup.client.set_paused(&None, &Some(true), &None, &None);

    let result = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
    assert_eq!(result.unwrap_err().unwrap(), Error::FundsPaused);
    assert_eq!(setup.client.get_capability(&capability_id).remaining_uses, 1);
}

#[test]
#[should_panic]
fn test_capability_use_requires_holder_signature() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let capability_id = setup.issue_release(1, 500, 1);

    setup.env.mock_auths(&[]);
    setup.client.release_with_capability(
        &1,
        &setup.contributor,
        &100,
        &setup.delegate,
        &capability_id,
    );
}

#[test]
fn test_pending_claim_blocks_capability_refund_and_release() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let release_id = setup.issue_release(1, 600, 2);
    let refund_id = setup.client.issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Refund,
        &1,
        &1_000,
        &setup.expiry(),
        &2,
    );
    let release_before = setup.client.get_capability(&release_id);
    let refund_before = setup.client.get_capability(&refund_id);

    setup.client.set_claim_window(&1_000);
    setup
        .client
        .authorize_claim(&1, &setup.recipient, &300, &DisputeReason::Other);

    let refund = setup
        .client
        .try_refund_with_capability(&1, &400, &setup.delegate, &refund_id);
    assert_eq!(refund.unwrap_err().unwrap(), Error::ClaimPending);

    let release = setup.client.try_release_with_capability(
        &1,
        &setup.contributor,
        &400,
        &setup.delegate,
        &release_id,
    );
    assert_eq!(release.unwrap_err().unwrap(), Error::ClaimPending);

    assert_eq!(setup.client.get_capability(&refund_id), refund_before);
    assert_eq!(setup.client.get_capability(&release_id), release_before);
    let escrow = setup.client.get_escrow_info(&1);
    assert_eq!(escrow.status, EscrowStatus::Locked);
    assert_eq!(escrow.released_amount, 0);
    assert_eq!(escrow.refunded_amount, 0);
    assert_eq!(setup.token_client.balance(&setup.depositor), 99_000);
}

#[test]
fn test_capability_refund_reports_pending_claim_before_pause() {
    let setup = CapabilitySetup::new();
    setup.lock(1, 1_000);
    let refund_id = setup.client.issue_capability(
        &setup.admin,
        &setup.delegate,
        &CapabilityAction::Refund,
        &1,
        &1_000,
        &setup.expiry(),
        &1,
    );
    setup.client.set_claim_window(&1_000);
    setup
        .client
        .authorize_claim(&1, &setup.recipient, &300, &DisputeReason::Other);
    setup.client.set_paused(&None, &None, &Some(true), &None);

    // An over-large amount is not reported either; the claim guard comes first.
    let refund = setup
        .client
        .try_refund_with_capability(&1, &5_000, &setup.delegate, &refund_id);
    assert_eq!(refund.unwrap_err().unwrap(), Error::ClaimPending);

    let capability = setup.client.get_capability(&refund_id);
    assert_eq!(capability.remaining_uses, 1);
    assert_eq!(capability.remaining_amount, 1_000);

    // Once the claim is withdrawn only the pause remains in the way.
    setup
        .client
        .cancel_pending_claim(&1, &DisputeOutcome::CancelledByAdmin);
    let refund = setup
        .client
        .try_refund_with_capability(&1, &400, &setup.delegate, &refund_id);
    assert_eq!(refund.unwrap_err().unwrap(), Error::FundsPaused);
}
