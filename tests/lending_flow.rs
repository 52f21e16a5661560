use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use reputation_lending::{
    dao::{MemoryOutbox, OutboxStore},
    error::Error,
    protocol::{
        types::DAY, Address, CallContext, EscrowState, OraclePolicy,
        ProtocolError, ProtocolParameters, Runtime, UnixTime,
    },
    provider::{
        LedgerClient, LocalChain, QueuePublisher, Relay, RelaySettings,
        ScoringOracle,
    },
    types::QueueMessage,
};

const LENDER: &str = "0xlender";
const BORROWER: &str = "0xborrower";
const ORACLE: &str = "0xoracle";
const MINER: &str = "f01234";

struct FixedOracle(u32);

impl ScoringOracle for FixedOracle {
    async fn get_score(&self, _address: &str) -> Result<u32, Error> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingQueue(Mutex<Vec<QueueMessage>>);

impl QueuePublisher for RecordingQueue {
    async fn publish(&self, message: &QueueMessage) -> Result<(), Error> {
        self.0.lock().await.push(message.clone());
        Ok(())
    }
}

fn chain() -> LocalChain {
    let mut runtime = Runtime::new(
        Address::from("0xmanager"),
        OraclePolicy::single(Address::from(ORACLE)),
        ProtocolParameters::default(),
    );
    runtime.mint(&Address::from(LENDER), 1_000_000);
    runtime.mint(&Address::from(BORROWER), 500_000);
    LocalChain::new(runtime)
}

fn relay(
    chain: &LocalChain,
    score: u32,
) -> Relay<MemoryOutbox, LocalChain, FixedOracle, RecordingQueue> {
    Relay::new(
        MemoryOutbox::new(),
        chain.clone(),
        FixedOracle(score),
        RecordingQueue::default(),
        RelaySettings {
            oracle_account: String::from(ORACLE),
            ..RelaySettings::default()
        },
    )
}

async fn relay_score(chain: &LocalChain, score: u32) -> u64 {
    let id = chain.check_reputation(BORROWER, MINER).await.unwrap();
    let relay = relay(chain, score);
    let t0 = Utc::now();

    relay.tick(t0).await.unwrap();
    relay.tick(t0 + Duration::seconds(5)).await.unwrap();

    let row = relay
        .store()
        .get(i64::try_from(id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "forwarded");
    assert_eq!(
        *relay.queue().0.lock().await,
        vec![QueueMessage {
            id,
            address: String::from(MINER),
            response: score,
        }]
    );

    id
}

fn now() -> UnixTime {
    Utc::now().timestamp()
}

#[tokio::test]
async fn relayed_reputation_unlocks_a_loan_that_is_repaid() {
    let chain = chain();
    let runtime = chain.runtime();
    let start = now();
    let end = start + 90 * DAY;

    let key = runtime
        .lock()
        .await
        .create_lending_position(
            &CallContext::new(LENDER, start).with_value(500_000),
            end,
            10,
        )
        .unwrap();

    let borrower = CallContext::new(BORROWER, start);
    let miner = Address::from(MINER);
    assert_eq!(
        runtime
            .lock()
            .await
            .create_borrow(&borrower, &key, 200_000, miner.clone()),
        Err(ProtocolError::Reputation_Not_Received)
    );

    relay_score(&chain, 80).await;

    let mut runtime = runtime.lock().await;
    let escrow = runtime
        .create_borrow(&borrower, &key, 200_000, miner.clone())
        .unwrap();
    assert_eq!(runtime.balance_of(&escrow), 200_000);
    assert_eq!(
        runtime.manager().positions(&key).unwrap().available_amount,
        300_000
    );

    runtime.start_loan(&borrower, &escrow).unwrap();
    runtime
        .transfer_to_miner_actor(&borrower, &escrow, 200_000)
        .unwrap();
    assert_eq!(runtime.balance_of(&miner), 200_000);

    let funding = CallContext::new(BORROWER, start).with_value(220_000);
    runtime.fund_repayment(&funding, &escrow).unwrap();

    assert_eq!(
        runtime.repay(&CallContext::new(LENDER, start), &escrow),
        Err(ProtocolError::Not_Due)
    );

    let installments: Vec<u128> = (1..=3)
        .map(|period| {
            let ctx = CallContext::new(LENDER, start + period * 30 * DAY);
            runtime.repay(&ctx, &escrow).unwrap()
        })
        .collect();
    assert_eq!(installments.iter().sum::<u128>(), 220_000);
    assert_eq!(
        runtime.repay(&CallContext::new(LENDER, end + 30 * DAY), &escrow),
        Err(ProtocolError::Nothing_To_Repay)
    );

    let early = CallContext::new(LENDER, end - 1);
    assert_eq!(
        runtime.close_loan(&early, &escrow),
        Err(ProtocolError::Loan_Not_Expired)
    );

    runtime
        .close_loan(&CallContext::new(LENDER, end), &escrow)
        .unwrap();
    assert_eq!(runtime.escrow(&escrow).unwrap().state, EscrowState::Closed);
    assert_eq!(runtime.balance_of(&Address::from(LENDER)), 720_000);
}

#[tokio::test]
async fn low_reputation_keeps_capital_in_the_pool() {
    let chain = chain();
    let start = now();

    let key = chain
        .runtime()
        .lock()
        .await
        .create_lending_position(
            &CallContext::new(LENDER, start).with_value(100_000),
            start + 30 * DAY,
            5,
        )
        .unwrap();

    relay_score(&chain, 0).await;

    let runtime = chain.runtime();
    let mut runtime = runtime.lock().await;
    assert_eq!(
        runtime.create_borrow(
            &CallContext::new(BORROWER, start),
            &key,
            10_000,
            Address::from(MINER),
        ),
        Err(ProtocolError::Reputation_Too_Low)
    );
    assert_eq!(
        runtime.manager().positions(&key).unwrap().available_amount,
        100_000
    );
}

#[tokio::test]
async fn lender_reclaims_an_unstarted_escrow() {
    let chain = chain();
    let start = now();

    let key = chain
        .runtime()
        .lock()
        .await
        .create_lending_position(
            &CallContext::new(LENDER, start).with_value(100_000),
            start + 30 * DAY,
            5,
        )
        .unwrap();

    relay_score(&chain, 10).await;

    let runtime = chain.runtime();
    let mut runtime = runtime.lock().await;
    let borrower = CallContext::new(BORROWER, start);
    let escrow = runtime
        .create_borrow(&borrower, &key, 40_000, Address::from(MINER))
        .unwrap();

    assert_eq!(
        runtime.withdraw_before_loan_starts(&borrower, &escrow),
        Err(ProtocolError::Not_The_Lender)
    );

    let lender = CallContext::new(LENDER, start);
    assert_eq!(
        runtime.withdraw_before_loan_starts(&lender, &escrow),
        Ok(40_000)
    );
    assert_eq!(
        runtime.start_loan(&borrower, &escrow),
        Err(ProtocolError::Loan_Closed)
    );
    assert_eq!(runtime.balance_of(&Address::from(LENDER)), 940_000);
}
