//! End-to-end tests for the token workflow.
//!
//! A token is created through the factory, located from its creation logs,
//! used, and then submitted for explorer verification with the constructor
//! arguments read back off the ledger. The explorer is an in-process double,
//! and tokio's paused clock stands in for the real polling delays.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use tokenforge_contracts::events::token_address_from_logs;
use tokenforge_contracts::{FactoryError, LedgerError, TokenFactory};
use tokenforge_protocol::config::{ExplorerConfig, STATUS_PENDING, STATUS_VERIFIED};
use tokenforge_protocol::types::{Address, U256};
use tokenforge_protocol::verification::{
    ExplorerResponse, StatusQuery, VerificationError, VerificationOrchestrator,
    VerificationStatus, VerifierApi, VerifySourceForm,
};
use tokenforge_protocol::TokenParams;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Explorer double: accepts every submission and replays scripted status
/// answers, remembering what it was sent.
struct ScriptedExplorer {
    forms: Mutex<Vec<VerifySourceForm>>,
    statuses: Mutex<VecDeque<&'static str>>,
}

impl ScriptedExplorer {
    fn answering(statuses: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            forms: Mutex::new(Vec::new()),
            statuses: Mutex::new(statuses.iter().copied().collect()),
        })
    }
}

#[async_trait]
impl VerifierApi for ScriptedExplorer {
    async fn submit(&self, form: &VerifySourceForm) -> Result<ExplorerResponse, VerificationError> {
        self.forms.lock().push(form.clone());
        Ok(ExplorerResponse {
            status: "1".into(),
            message: "OK".into(),
            result: "guid-e2e".into(),
        })
    }

    async fn check_status(
        &self,
        _query: &StatusQuery,
    ) -> Result<ExplorerResponse, VerificationError> {
        let result = self.statuses.lock().pop_front().unwrap_or(STATUS_PENDING);
        Ok(ExplorerResponse {
            status: if result == STATUS_VERIFIED { "1" } else { "0" }.into(),
            message: "OK".into(),
            result: result.into(),
        })
    }
}

fn addr(n: u64) -> Address {
    Address::left_padding_from(&n.to_be_bytes())
}

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

fn test_token(owner: Address) -> TokenParams {
    TokenParams {
        name: "Test Token".into(),
        symbol: "TTK".into(),
        decimals: 18,
        initial_supply: tokens(1000),
        owner,
        is_mintable: true,
        is_burnable: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn create_use_and_verify_token() {
    let owner = addr(0x0a);
    let alice = addr(0xa1);
    let mut factory = TokenFactory::new(addr(0xf0));
    let predicted = factory.next_address();

    // --- Creation ---
    let created = factory.create_token(test_token(owner)).unwrap();
    let token = token_address_from_logs(&created.logs).expect("creation log present");
    assert_eq!(token, predicted);
    assert_eq!(token, created.ledger.address());
    assert_eq!(created.event.owner, owner);

    // --- Usage ---
    let mut ledger = created.ledger;
    ledger.mint(owner, alice, tokens(100)).unwrap();
    ledger.burn(owner, alice, tokens(50)).unwrap();
    ledger.transfer(alice, owner, tokens(10)).unwrap();
    assert_eq!(ledger.balance_of(&alice), tokens(40));
    assert_eq!(ledger.balance_of(&owner), tokens(1010));
    assert_eq!(ledger.total_supply(), tokens(1050));

    // --- Verification ---
    let explorer = ScriptedExplorer::answering(&[STATUS_PENDING, STATUS_VERIFIED]);
    let config = ExplorerConfig::for_chain(97, Some("bsc-key"), None).unwrap();
    let orchestrator = VerificationOrchestrator::new(explorer.clone(), config);
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let job = orchestrator
        .verify(token, ledger.params().clone(), cancel_rx)
        .await
        .unwrap();

    assert_eq!(job.status, VerificationStatus::Verified);
    assert_eq!(job.status_checks, 2);
    assert_eq!(job.tracking_id.as_deref(), Some("guid-e2e"));

    let forms = explorer.forms.lock();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].contract_address, token.to_checksum(None));
    assert_eq!(
        forms[0].constructor_arguments,
        test_token(owner).constructor_args_hex(),
        "verification must use the arguments the token was created with"
    );
}

#[tokio::test(start_paused = true)]
async fn stuck_verification_leaves_ledger_untouched() {
    let owner = addr(0x0a);
    let mut factory = TokenFactory::new(addr(0xf0));
    let ledger = factory.create_token(test_token(owner)).unwrap().ledger;
    let before = ledger.summary();

    let explorer = ScriptedExplorer::answering(&[]);
    let config = ExplorerConfig::for_chain(97, Some("bsc-key"), None).unwrap();
    let orchestrator = VerificationOrchestrator::new(explorer, config);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let _ = cancel_tx.send(true);
    });

    let err = orchestrator
        .verify(ledger.address(), ledger.params().clone(), cancel_rx)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err, VerificationError::Cancelled);
    assert_eq!(ledger.summary(), before);
}

#[test]
fn tokens_from_one_factory_are_independent() {
    let mut factory = TokenFactory::new(addr(0xf0));
    let mut first = factory.create_token(test_token(addr(1))).unwrap().ledger;
    let second = factory.create_token(test_token(addr(2))).unwrap().ledger;

    assert_ne!(first.address(), second.address());
    assert_eq!(factory.nonce(), 2);

    first.transfer(addr(1), addr(2), tokens(1)).unwrap();
    assert_eq!(first.balance_of(&addr(2)), tokens(1));
    assert_eq!(second.balance_of(&addr(2)), tokens(1000));
    assert_eq!(second.balance_of(&addr(1)), U256::ZERO);
}

#[test]
fn failed_creation_does_not_consume_an_address() {
    let mut factory = TokenFactory::new(addr(0xf0));
    let predicted = factory.next_address();

    let err = factory.create_token(test_token(Address::ZERO)).unwrap_err();
    assert!(matches!(
        err,
        FactoryError::Ledger(LedgerError::InvalidOperation(_))
    ));
    assert_eq!(factory.nonce(), 0);

    let created = factory.create_token(test_token(addr(1))).unwrap();
    assert_eq!(created.ledger.address(), predicted);
}
