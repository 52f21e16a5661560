use std::collections::BTreeMap;

use tracing::debug;

use super::{
    authorization::OraclePolicy,
    bank::Bank,
    error::ProtocolError,
    escrow::Escrow,
    events::{EventLog, EventRecord},
    lender_manager::LenderManager,
    parameters::ProtocolParameters,
    types::{
        Address, Amount, CallContext, InterestRate, LoanKey, RequestId, Score,
        UnixTime,
    },
};

/// Complete contract state. Cloned before every call so a failing call can
/// be discarded wholesale.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub bank: Bank,
    pub manager: LenderManager,
    pub escrows: BTreeMap<Address, Escrow>,
    pub log: EventLog,
}

impl Ledger {
    fn escrow_mut(&mut self, address: &Address) -> Result<&mut Escrow, ProtocolError> {
        self.escrows
            .get_mut(address)
            .ok_or(ProtocolError::Unknown_Escrow)
    }
}

/// Single-writer host for the lending contracts. Calls run one at a time and
/// either commit every effect or none.
#[derive(Debug, Clone)]
pub struct Runtime {
    ledger: Ledger,
}

impl Runtime {
    pub fn new(
        manager_address: Address,
        oracle: OraclePolicy,
        parameters: ProtocolParameters,
    ) -> Self {
        Runtime {
            ledger: Ledger {
                bank: Bank::new(),
                manager: LenderManager::new(manager_address, oracle, parameters),
                escrows: BTreeMap::new(),
                log: EventLog::new(),
            },
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn manager(&self) -> &LenderManager {
        &self.ledger.manager
    }

    pub fn escrow(&self, address: &Address) -> Option<&Escrow> {
        self.ledger.escrows.get(address)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.bank.balance_of(account)
    }

    /// Credits `account` out of thin air. Test and bootstrap helper.
    pub fn mint(&mut self, account: &Address, amount: Amount) {
        self.ledger.bank.mint(account, amount);
    }

    pub fn events_since(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        self.ledger.log.since(cursor, limit).to_vec()
    }

    pub fn last_sequence(&self) -> u64 {
        self.ledger.log.last_sequence()
    }

    /// Runs `call` against a copy of the ledger and keeps the copy only when
    /// the call succeeds.
    pub fn transact<F, R>(&mut self, name: &str, call: F) -> Result<R, ProtocolError>
    where
        F: FnOnce(&mut Ledger) -> Result<R, ProtocolError>,
    {
        let mut snapshot = self.ledger.clone();

        match call(&mut snapshot) {
            Ok(result) => {
                self.ledger = snapshot;
                Ok(result)
            },
            Err(error) => {
                debug!("{} reverted: {}", name, error);
                Err(error)
            },
        }
    }

    pub fn create_lending_position(
        &mut self,
        ctx: &CallContext,
        end_timestamp: UnixTime,
        interest_rate: InterestRate,
    ) -> Result<LoanKey, ProtocolError> {
        self.transact("createLendingPosition", |ledger| {
            ledger.manager.create_lending_position(
                ctx,
                end_timestamp,
                interest_rate,
                &mut ledger.bank,
            )
        })
    }

    pub fn check_reputation(
        &mut self,
        ctx: &CallContext,
        target: Address,
    ) -> Result<RequestId, ProtocolError> {
        self.transact("checkReputation", |ledger| {
            Ok(ledger.manager.check_reputation(ctx, target, &mut ledger.log))
        })
    }

    pub fn receive_reputation_score(
        &mut self,
        ctx: &CallContext,
        id: RequestId,
        score: Score,
    ) -> Result<(), ProtocolError> {
        self.transact("receiveReputationScore", |ledger| {
            ledger
                .manager
                .receive_reputation_score(ctx, id, score, &mut ledger.log)
        })
    }

    /// Returns the address of the new escrow.
    pub fn create_borrow(
        &mut self,
        ctx: &CallContext,
        loan_key: &LoanKey,
        amount: Amount,
        target: Address,
    ) -> Result<Address, ProtocolError> {
        self.transact("createBorrow", |ledger| {
            let escrow = ledger.manager.create_borrow(
                ctx,
                loan_key,
                amount,
                target,
                &mut ledger.bank,
            )?;
            let address = escrow.address.clone();
            ledger.escrows.insert(address.clone(), escrow);
            Ok(address)
        })
    }

    pub fn calculate_interest(
        &self,
        principal: Amount,
        rate: InterestRate,
    ) -> Result<(Amount, Amount), ProtocolError> {
        self.ledger.manager.calculate_interest(principal, rate)
    }

    pub fn start_loan(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
    ) -> Result<(), ProtocolError> {
        self.transact("startLoan", |ledger| {
            ledger.escrow_mut(escrow)?.start_loan(ctx)
        })
    }

    pub fn withdraw_before_loan_starts(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
    ) -> Result<Amount, ProtocolError> {
        self.transact("withdrawBeforLoanStarts", |ledger| {
            let Ledger {
                bank, escrows, log, ..
            } = ledger;
            let escrow = escrows.get_mut(escrow).ok_or(ProtocolError::Unknown_Escrow)?;
            escrow.withdraw_before_loan_starts(ctx, bank, log)
        })
    }

    pub fn transfer_to_miner_actor(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
        amount: Amount,
    ) -> Result<(), ProtocolError> {
        self.transact("transferToMinerActor", |ledger| {
            let Ledger { bank, escrows, .. } = ledger;
            let escrow = escrows.get_mut(escrow).ok_or(ProtocolError::Unknown_Escrow)?;
            escrow.transfer_to_miner_actor(ctx, amount, bank)
        })
    }

    pub fn fund_repayment(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
    ) -> Result<(), ProtocolError> {
        self.transact("fundRepayment", |ledger| {
            let Ledger { bank, escrows, .. } = ledger;
            let escrow = escrows.get_mut(escrow).ok_or(ProtocolError::Unknown_Escrow)?;
            escrow.fund_repayment(ctx, bank)
        })
    }

    pub fn repay(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
    ) -> Result<Amount, ProtocolError> {
        self.transact("repay", |ledger| {
            let Ledger { bank, escrows, .. } = ledger;
            let escrow = escrows.get_mut(escrow).ok_or(ProtocolError::Unknown_Escrow)?;
            escrow.repay(ctx, bank)
        })
    }

    pub fn close_loan(
        &mut self,
        ctx: &CallContext,
        escrow: &Address,
    ) -> Result<Amount, ProtocolError> {
        self.transact("closeLoan", |ledger| {
            let Ledger {
                bank, escrows, log, ..
            } = ledger;
            let escrow = escrows.get_mut(escrow).ok_or(ProtocolError::Unknown_Escrow)?;
            escrow.close_loan(ctx, bank, log)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{events::ProtocolEvent, types::DAY};

    const NOW: UnixTime = 1_700_000_000;

    fn runtime() -> Runtime {
        let mut runtime = Runtime::new(
            Address::from("0xmanager"),
            OraclePolicy::single(Address::from("0xoracle")),
            ProtocolParameters::default(),
        );
        runtime.mint(&Address::from("0xlender"), 1_000_000);
        runtime.mint(&Address::from("0xborrower"), 1_000_000);
        runtime
    }

    fn borrowed(runtime: &mut Runtime) -> Address {
        let lender = CallContext::new("0xlender", NOW).with_value(100_000);
        let key = runtime
            .create_lending_position(&lender, NOW + 60 * DAY, 10)
            .unwrap();

        let borrower = CallContext::new("0xborrower", NOW);
        let miner = Address::from("f01234");
        let id = runtime.check_reputation(&borrower, miner.clone()).unwrap();
        runtime
            .receive_reputation_score(&CallContext::new("0xoracle", NOW), id, 3)
            .unwrap();

        runtime.create_borrow(&borrower, &key, 50_000, miner).unwrap()
    }

    #[test]
    fn failed_call_leaves_state_untouched() {
        let mut runtime = runtime();
        let escrow = borrowed(&mut runtime);
        let before_events = runtime.last_sequence();
        let before = runtime.balance_of(&escrow);

        let stranger = CallContext::new("0xstranger", NOW);
        assert_eq!(
            runtime.transfer_to_miner_actor(&stranger, &escrow, 10),
            Err(ProtocolError::Not_The_Borrower)
        );
        assert_eq!(runtime.balance_of(&escrow), before);
        assert_eq!(runtime.last_sequence(), before_events);
    }

    #[test]
    fn partial_effects_are_rolled_back() {
        let mut runtime = runtime();
        let result: Result<(), ProtocolError> = runtime.transact("test", |ledger| {
            ledger.bank.mint(&Address::from("0xghost"), 10);
            Err(ProtocolError::Arithmetic_Overflow)
        });

        assert!(result.is_err());
        assert_eq!(runtime.balance_of(&Address::from("0xghost")), 0);
    }

    #[test]
    fn unknown_escrow_is_rejected() {
        let mut runtime = runtime();
        let ctx = CallContext::new("0xlender", NOW);
        assert_eq!(
            runtime.start_loan(&ctx, &Address::from("0xnothing")),
            Err(ProtocolError::Unknown_Escrow)
        );
    }

    #[test]
    fn full_loan_lifecycle() {
        let mut runtime = runtime();
        let escrow = borrowed(&mut runtime);
        let borrower = CallContext::new("0xborrower", NOW);

        runtime.start_loan(&borrower, &escrow).unwrap();
        runtime
            .transfer_to_miner_actor(&borrower, &escrow, 50_000)
            .unwrap();
        assert_eq!(runtime.balance_of(&Address::from("f01234")), 50_000);

        let funding = CallContext::new("0xborrower", NOW + DAY).with_value(55_000);
        runtime.fund_repayment(&funding, &escrow).unwrap();

        let early = CallContext::new("0xlender", NOW + DAY);
        assert_eq!(runtime.repay(&early, &escrow), Err(ProtocolError::Not_Due));

        let first = runtime
            .repay(&CallContext::new("0xlender", NOW + 30 * DAY), &escrow)
            .unwrap();
        let second = runtime
            .repay(&CallContext::new("0xlender", NOW + 60 * DAY), &escrow)
            .unwrap();
        assert_eq!(first + second, 55_000);
        assert_eq!(
            runtime.repay(&CallContext::new("0xlender", NOW + 90 * DAY), &escrow),
            Err(ProtocolError::Nothing_To_Repay)
        );

        let closing = CallContext::new("0xlender", NOW + 60 * DAY);
        runtime.close_loan(&closing, &escrow).unwrap();
        assert_eq!(runtime.balance_of(&Address::from("0xlender")), 955_000);

        let last = runtime.events_since(0, 10).pop().unwrap();
        assert_eq!(last.event, ProtocolEvent::ClosedLoan);
        assert_eq!(last.emitter, escrow);
    }
}
