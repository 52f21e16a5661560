use serde::Serialize;

use super::{
    bank::Bank,
    error::ProtocolError,
    events::{EventLog, ProtocolEvent},
    types::{Address, Amount, CallContext, Duration, UnixTime},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscrowState {
    Unstarted,
    Started,
    Closed,
}

/// Terms an escrow is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowTerms {
    pub lender: Address,
    pub borrower: Address,
    pub miner_actor: Address,
    pub loan_amount: Amount,
    pub rate_amount: Amount,
    pub withdraw_interval: Duration,
    pub end: UnixTime,
}

/// Custody and repayment lifecycle of one borrow order. The escrow's funds
/// live in the bank under `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Escrow {
    pub address: Address,
    pub lender: Address,
    pub borrower: Address,
    pub miner_actor: Address,
    pub loan_amount: Amount,
    pub rate_amount: Amount,
    pub total_due: Amount,
    pub withdraw_interval: Duration,
    pub end: UnixTime,
    pub state: EscrowState,
    pub next_withdraw: UnixTime,
    pub installments: u64,
    pub paid_installments: u64,
    pub disbursed: Amount,
    pub repaid: Amount,
}

impl Escrow {
    pub fn new(
        address: Address,
        terms: EscrowTerms,
        now: UnixTime,
    ) -> Result<Self, ProtocolError> {
        let total_due = terms
            .loan_amount
            .checked_add(terms.rate_amount)
            .ok_or(ProtocolError::Arithmetic_Overflow)?;

        Ok(Escrow {
            address,
            lender: terms.lender,
            borrower: terms.borrower,
            miner_actor: terms.miner_actor,
            loan_amount: terms.loan_amount,
            rate_amount: terms.rate_amount,
            total_due,
            withdraw_interval: terms.withdraw_interval,
            end: terms.end,
            state: EscrowState::Unstarted,
            next_withdraw: now.saturating_add(terms.withdraw_interval),
            installments: installment_count(now, terms.end, terms.withdraw_interval),
            paid_installments: 0,
            disbursed: 0,
            repaid: 0,
        })
    }

    pub fn started(&self) -> bool {
        self.state == EscrowState::Started
    }

    pub fn outstanding(&self) -> Amount {
        self.total_due.saturating_sub(self.repaid)
    }

    /// Principal the borrower may still send to the miner actor.
    pub fn disbursable(&self, bank: &Bank) -> Amount {
        self.loan_amount
            .saturating_sub(self.disbursed)
            .min(bank.balance_of(&self.address))
    }

    pub fn start_loan(
        &mut self,
        ctx: &CallContext,
    ) -> Result<(), ProtocolError> {
        match self.state {
            EscrowState::Unstarted => {},
            EscrowState::Started => return Err(ProtocolError::Already_Started),
            EscrowState::Closed => return Err(ProtocolError::Loan_Closed),
        }

        self.state = EscrowState::Started;
        self.next_withdraw = ctx.now.saturating_add(self.withdraw_interval);
        self.installments =
            installment_count(ctx.now, self.end, self.withdraw_interval);

        Ok(())
    }

    pub fn withdraw_before_loan_starts(
        &mut self,
        ctx: &CallContext,
        bank: &mut Bank,
        log: &mut EventLog,
    ) -> Result<Amount, ProtocolError> {
        if ctx.caller != self.lender {
            return Err(ProtocolError::Not_The_Lender);
        }

        if self.state != EscrowState::Unstarted {
            return Err(ProtocolError::Already_Started);
        }

        let remaining = bank.balance_of(&self.address);
        bank.transfer(&self.address, &self.lender, remaining)?;

        self.state = EscrowState::Closed;
        log.emit(&self.address, ProtocolEvent::ClosedLoan);

        Ok(remaining)
    }

    pub fn transfer_to_miner_actor(
        &mut self,
        ctx: &CallContext,
        amount: Amount,
        bank: &mut Bank,
    ) -> Result<(), ProtocolError> {
        if ctx.caller != self.borrower {
            return Err(ProtocolError::Not_The_Borrower);
        }

        if self.state == EscrowState::Closed {
            return Err(ProtocolError::Loan_Closed);
        }

        if amount > self.disbursable(bank) {
            return Err(ProtocolError::Not_Enough_Balance);
        }

        bank.transfer(&self.address, &self.miner_actor, amount)?;
        self.disbursed += amount;

        Ok(())
    }

    /// Moves the attached call value into the escrow to cover repayments.
    pub fn fund_repayment(
        &mut self,
        ctx: &CallContext,
        bank: &mut Bank,
    ) -> Result<(), ProtocolError> {
        if ctx.value == 0 {
            return Err(ProtocolError::Empty_Amount);
        }

        match self.state {
            EscrowState::Started => {},
            EscrowState::Unstarted => return Err(ProtocolError::Loan_Not_Started),
            EscrowState::Closed => return Err(ProtocolError::Loan_Closed),
        }

        bank.transfer(&ctx.caller, &self.address, ctx.value)
    }

    /// Custody beyond the principal still owed to the miner actor.
    pub fn repayment_funds(&self, bank: &Bank) -> Amount {
        let undisbursed = self.loan_amount.saturating_sub(self.disbursed);
        bank.balance_of(&self.address).saturating_sub(undisbursed)
    }

    /// Pays the installment due at the current checkpoint to the lender and
    /// moves the checkpoint forward by one interval. Undisbursed principal
    /// never counts towards an installment.
    pub fn repay(
        &mut self,
        ctx: &CallContext,
        bank: &mut Bank,
    ) -> Result<Amount, ProtocolError> {
        if self.state != EscrowState::Started {
            return Err(ProtocolError::Loan_Not_Started);
        }

        let due = self.installment_due();
        if due == 0 {
            return Err(ProtocolError::Nothing_To_Repay);
        }

        if ctx.now < self.next_withdraw {
            return Err(ProtocolError::Not_Due);
        }

        if self.repayment_funds(bank) < due {
            return Err(ProtocolError::Not_Enough_Balance);
        }

        bank.transfer(&self.address, &self.lender, due)?;
        self.repaid += due;
        self.paid_installments += 1;
        self.next_withdraw =
            self.next_withdraw.saturating_add(self.withdraw_interval);

        Ok(due)
    }

    pub fn close_loan(
        &mut self,
        ctx: &CallContext,
        bank: &mut Bank,
        log: &mut EventLog,
    ) -> Result<Amount, ProtocolError> {
        if self.state == EscrowState::Closed {
            return Err(ProtocolError::Loan_Closed);
        }

        if ctx.now < self.end {
            return Err(ProtocolError::Loan_Not_Expired);
        }

        let custody = bank.balance_of(&self.address);
        let to_lender = custody.min(self.outstanding());
        let to_borrower = custody - to_lender;

        bank.transfer(&self.address, &self.lender, to_lender)?;
        bank.transfer(&self.address, &self.borrower, to_borrower)?;

        self.repaid += to_lender;
        self.state = EscrowState::Closed;
        log.emit(&self.address, ProtocolEvent::ClosedLoan);

        Ok(to_lender)
    }

    fn installment_due(&self) -> Amount {
        let outstanding = self.outstanding();
        let remaining_installments =
            self.installments.saturating_sub(self.paid_installments);

        if remaining_installments <= 1 {
            return outstanding;
        }

        (self.total_due / u128::from(self.installments)).min(outstanding)
    }
}

fn installment_count(from: UnixTime, end: UnixTime, interval: Duration) -> u64 {
    if interval <= 0 || end <= from {
        return 1;
    }

    let span = end - from;
    let count = span / interval + i64::from(span % interval != 0);
    u64::try_from(count).unwrap_or(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::DAY;

    const LENDER: &str = "0xlender";
    const BORROWER: &str = "0xborrower";
    const MINER: &str = "f01000";

    fn escrow_with_custody(now: UnixTime, end: UnixTime) -> (Escrow, Bank) {
        let address = Address::from("0xescrow");
        let escrow = Escrow::new(
            address.clone(),
            EscrowTerms {
                lender: Address::from(LENDER),
                borrower: Address::from(BORROWER),
                miner_actor: Address::from(MINER),
                loan_amount: 1_000,
                rate_amount: 100,
                withdraw_interval: 30 * DAY,
                end,
            },
            now,
        )
        .unwrap();

        let mut bank = Bank::new();
        bank.mint(&address, 1_000);

        (escrow, bank)
    }

    fn ctx(caller: &str, now: UnixTime) -> CallContext {
        CallContext::new(caller, now)
    }

    #[test]
    fn repay_before_start_fails() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);

        assert_eq!(
            escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank),
            Err(ProtocolError::Loan_Not_Started)
        );
    }

    #[test]
    fn withdraw_requires_lender_and_unstarted_loan() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        let mut log = EventLog::new();

        assert_eq!(
            escrow.withdraw_before_loan_starts(
                &ctx(BORROWER, 1),
                &mut bank,
                &mut log
            ),
            Err(ProtocolError::Not_The_Lender)
        );

        escrow.start_loan(&ctx(BORROWER, 1)).unwrap();
        assert_eq!(
            escrow.withdraw_before_loan_starts(
                &ctx(LENDER, 2),
                &mut bank,
                &mut log
            ),
            Err(ProtocolError::Already_Started)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn withdraw_refunds_lender_and_closes() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        let mut log = EventLog::new();

        let refunded = escrow
            .withdraw_before_loan_starts(&ctx(LENDER, 1), &mut bank, &mut log)
            .unwrap();

        assert_eq!(refunded, 1_000);
        assert_eq!(bank.balance_of(&Address::from(LENDER)), 1_000);
        assert_eq!(escrow.state, EscrowState::Closed);
        assert_eq!(log.records()[0].event, ProtocolEvent::ClosedLoan);
        assert_eq!(
            escrow.start_loan(&ctx(BORROWER, 2)),
            Err(ProtocolError::Loan_Closed)
        );
    }

    #[test]
    fn start_twice_fails() {
        let (mut escrow, _) = escrow_with_custody(0, 90 * DAY);

        escrow.start_loan(&ctx(BORROWER, 1)).unwrap();
        assert!(escrow.started());
        assert_eq!(
            escrow.start_loan(&ctx(BORROWER, 2)),
            Err(ProtocolError::Already_Started)
        );
    }

    #[test]
    fn transfer_to_miner_checks_caller_and_balance() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);

        assert_eq!(
            escrow.transfer_to_miner_actor(&ctx(LENDER, 1), 10, &mut bank),
            Err(ProtocolError::Not_The_Borrower)
        );
        assert_eq!(
            escrow.transfer_to_miner_actor(&ctx(BORROWER, 1), 1_001, &mut bank),
            Err(ProtocolError::Not_Enough_Balance)
        );

        escrow
            .transfer_to_miner_actor(&ctx(BORROWER, 1), 400, &mut bank)
            .unwrap();
        assert_eq!(bank.balance_of(&Address::from(MINER)), 400);
        assert_eq!(escrow.disbursable(&bank), 600);
        assert_eq!(escrow.state, EscrowState::Unstarted);

        assert_eq!(
            escrow.transfer_to_miner_actor(&ctx(BORROWER, 1), 601, &mut bank),
            Err(ProtocolError::Not_Enough_Balance)
        );
    }

    /// Disburses the whole principal and puts `amount` back into custody
    /// from the miner actor.
    fn disbursed_and_funded(
        escrow: &mut Escrow,
        bank: &mut Bank,
        amount: Amount,
    ) {
        escrow
            .transfer_to_miner_actor(&ctx(BORROWER, 1), 1_000, bank)
            .unwrap();
        let miner = Address::from(MINER);
        bank.mint(&miner, amount.saturating_sub(1_000));
        escrow
            .fund_repayment(&ctx(MINER, 1).with_value(amount), bank)
            .unwrap();
    }

    #[test]
    fn repay_walks_installments_and_checkpoints() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        escrow.start_loan(&ctx(BORROWER, 0)).unwrap();
        assert_eq!(escrow.installments, 3);
        assert_eq!(escrow.next_withdraw, 30 * DAY);
        disbursed_and_funded(&mut escrow, &mut bank, 1_100);

        assert_eq!(escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank), Ok(366));
        assert_eq!(escrow.next_withdraw, 60 * DAY);
        assert_eq!(escrow.repay(&ctx(LENDER, 60 * DAY), &mut bank), Ok(366));
        assert_eq!(escrow.repay(&ctx(LENDER, 90 * DAY), &mut bank), Ok(368));
        assert_eq!(escrow.next_withdraw, 120 * DAY);
        assert_eq!(escrow.outstanding(), 0);
        assert_eq!(bank.balance_of(&Address::from(LENDER)), 1_100);
        assert_eq!(
            escrow.repay(&ctx(LENDER, 120 * DAY), &mut bank),
            Err(ProtocolError::Nothing_To_Repay)
        );
    }

    #[test]
    fn repay_waits_for_the_checkpoint() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        escrow.start_loan(&ctx("0xstranger", 0)).unwrap();
        disbursed_and_funded(&mut escrow, &mut bank, 1_100);

        assert_eq!(
            escrow.repay(&ctx("0xstranger", 0), &mut bank),
            Err(ProtocolError::Not_Due)
        );
        assert_eq!(
            escrow.repay(&ctx(LENDER, 30 * DAY - 1), &mut bank),
            Err(ProtocolError::Not_Due)
        );

        assert_eq!(escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank), Ok(366));
        assert_eq!(
            escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank),
            Err(ProtocolError::Not_Due)
        );
        assert_eq!(escrow.repaid, 366);
        assert_eq!(escrow.next_withdraw, 60 * DAY);
    }

    #[test]
    fn undisbursed_principal_is_not_repayment() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        escrow.start_loan(&ctx("0xstranger", 0)).unwrap();

        assert_eq!(escrow.repayment_funds(&bank), 0);
        assert_eq!(
            escrow.repay(&ctx("0xstranger", 30 * DAY), &mut bank),
            Err(ProtocolError::Not_Enough_Balance)
        );
        assert_eq!(bank.balance_of(&Address::from(LENDER)), 0);
        assert_eq!(escrow.disbursable(&bank), 1_000);
        assert_eq!(escrow.next_withdraw, 30 * DAY);

        escrow
            .transfer_to_miner_actor(&ctx(BORROWER, 1), 400, &mut bank)
            .unwrap();
        assert_eq!(escrow.repayment_funds(&bank), 0);
        assert_eq!(
            escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank),
            Err(ProtocolError::Not_Enough_Balance)
        );
        assert_eq!(escrow.disbursable(&bank), 600);
    }

    #[test]
    fn repay_without_custody_fails() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 30 * DAY);
        escrow.start_loan(&ctx(BORROWER, 0)).unwrap();
        escrow
            .transfer_to_miner_actor(&ctx(BORROWER, 1), 1_000, &mut bank)
            .unwrap();

        assert_eq!(
            escrow.repay(&ctx(LENDER, 30 * DAY), &mut bank),
            Err(ProtocolError::Not_Enough_Balance)
        );
        assert_eq!(escrow.next_withdraw, 30 * DAY);
    }

    #[test]
    fn funding_requires_a_started_loan() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        let mut log = EventLog::new();
        let borrower = Address::from(BORROWER);
        bank.mint(&borrower, 500);

        assert_eq!(
            escrow.fund_repayment(&ctx(BORROWER, 1).with_value(500), &mut bank),
            Err(ProtocolError::Loan_Not_Started)
        );

        let refunded = escrow
            .withdraw_before_loan_starts(&ctx(LENDER, 2), &mut bank, &mut log)
            .unwrap();
        assert_eq!(refunded, 1_000);
        assert_eq!(bank.balance_of(&Address::from(LENDER)), 1_000);
        assert_eq!(bank.balance_of(&borrower), 500);

        assert_eq!(
            escrow.fund_repayment(&ctx(BORROWER, 3).with_value(500), &mut bank),
            Err(ProtocolError::Loan_Closed)
        );
    }

    #[test]
    fn close_requires_expiry_and_settles() {
        let (mut escrow, mut bank) = escrow_with_custody(0, 90 * DAY);
        let mut log = EventLog::new();

        assert_eq!(
            escrow.close_loan(&ctx(LENDER, 90 * DAY - 1), &mut bank, &mut log),
            Err(ProtocolError::Loan_Not_Expired)
        );

        escrow.start_loan(&ctx(BORROWER, 1)).unwrap();
        let borrower = Address::from(BORROWER);
        bank.mint(&borrower, 500);
        escrow
            .fund_repayment(&ctx(BORROWER, 1).with_value(500), &mut bank)
            .unwrap();

        let settled = escrow
            .close_loan(&ctx(LENDER, 90 * DAY), &mut bank, &mut log)
            .unwrap();

        assert_eq!(settled, 1_100);
        assert_eq!(bank.balance_of(&Address::from(LENDER)), 1_100);
        assert_eq!(bank.balance_of(&borrower), 400);
        assert_eq!(bank.balance_of(&escrow.address), 0);
        assert_eq!(escrow.state, EscrowState::Closed);
        assert_eq!(log.len(), 1);
        assert_eq!(
            escrow.close_loan(&ctx(LENDER, 91 * DAY), &mut bank, &mut log),
            Err(ProtocolError::Loan_Closed)
        );
    }

    #[test]
    fn installment_count_rounds_up() {
        assert_eq!(installment_count(0, 90 * DAY, 30 * DAY), 3);
        assert_eq!(installment_count(0, 91 * DAY, 30 * DAY), 4);
        assert_eq!(installment_count(10, 5, 30 * DAY), 1);
    }
}
