use tracing::debug;

use super::{
    authorization::OraclePolicy,
    bank::Bank,
    error::ProtocolError,
    escrow::{Escrow, EscrowTerms},
    events::{EventLog, ProtocolEvent},
    interest::calculate_interest,
    parameters::ProtocolParameters,
    position::{BorrowOrder, LendingPosition, PositionRegistry},
    reputation::{ReputationBook, ReputationRequest},
    types::{
        Address, Amount, CallContext, InterestRate, LoanKey, RequestId, Score,
        UnixTime,
    },
};

/// Protocol controller. Holds lender deposits in custody under its own
/// address until they are drawn into escrows.
#[derive(Debug, Clone)]
pub struct LenderManager {
    address: Address,
    parameters: ProtocolParameters,
    oracle: OraclePolicy,
    registry: PositionRegistry,
    reputation: ReputationBook,
    key_nonce: u64,
}

impl LenderManager {
    pub fn new(
        address: Address,
        oracle: OraclePolicy,
        parameters: ProtocolParameters,
    ) -> Self {
        LenderManager {
            address,
            parameters,
            oracle,
            registry: PositionRegistry::new(),
            reputation: ReputationBook::new(),
            key_nonce: 0,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn parameters(&self) -> &ProtocolParameters {
        &self.parameters
    }

    pub fn oracle(&self) -> &OraclePolicy {
        &self.oracle
    }

    pub fn current_id(&self) -> RequestId {
        self.reputation.current_id()
    }

    pub fn loan_keys(&self, index: usize) -> Option<&LoanKey> {
        self.registry.loan_key(index)
    }

    pub fn all_loan_keys(&self) -> &[LoanKey] {
        self.registry.loan_keys()
    }

    pub fn positions(&self, key: &LoanKey) -> Option<&LendingPosition> {
        self.registry.get(key)
    }

    pub fn orders_for_lending(
        &self,
        key: &LoanKey,
        index: usize,
    ) -> Option<&BorrowOrder> {
        self.registry.orders(key).get(index)
    }

    pub fn escrow_contracts(
        &self,
        key: &LoanKey,
        index: usize,
    ) -> Option<&Address> {
        self.registry.escrows(key).get(index)
    }

    pub fn original_deposit(&self, key: &LoanKey) -> Option<Amount> {
        self.registry.original_deposit(key)
    }

    pub fn registry(&self) -> &PositionRegistry {
        &self.registry
    }

    pub fn reputation_request(&self, id: RequestId) -> Option<&ReputationRequest> {
        self.reputation.get(id)
    }

    pub fn latest_request_for(
        &self,
        target: &Address,
    ) -> Option<&ReputationRequest> {
        self.reputation.latest_for(target)
    }

    pub fn calculate_interest(
        &self,
        principal: Amount,
        rate: InterestRate,
    ) -> Result<(Amount, Amount), ProtocolError> {
        calculate_interest(principal, rate, self.parameters.max_interest_rate)
    }

    pub fn create_lending_position(
        &mut self,
        ctx: &CallContext,
        end_timestamp: UnixTime,
        interest_rate: InterestRate,
        bank: &mut Bank,
    ) -> Result<LoanKey, ProtocolError> {
        if ctx.value == 0 {
            return Err(ProtocolError::Empty_Amount);
        }

        if end_timestamp <= ctx.now {
            return Err(ProtocolError::Loan_Period_Excedeed);
        }

        if interest_rate > self.parameters.max_interest_rate {
            return Err(ProtocolError::InterestRate_Too_High);
        }

        bank.transfer(&ctx.caller, &self.address, ctx.value)?;

        let loan_key = self.next_loan_key(&ctx.caller, end_timestamp, ctx.now);
        self.registry.insert(LendingPosition {
            lender: ctx.caller.clone(),
            available_amount: ctx.value,
            end_timestamp,
            interest_rate,
            loan_key: loan_key.clone(),
        });

        debug!(
            "Lending position {} opened by {} with {}",
            loan_key, ctx.caller, ctx.value
        );

        Ok(loan_key)
    }

    pub fn check_reputation(
        &mut self,
        ctx: &CallContext,
        target: Address,
        log: &mut EventLog,
    ) -> RequestId {
        let id = self.reputation.open(target.clone(), ctx.now);
        log.emit(&self.address, ProtocolEvent::CheckReputation { id, target });
        id
    }

    pub fn receive_reputation_score(
        &mut self,
        ctx: &CallContext,
        id: RequestId,
        score: Score,
        log: &mut EventLog,
    ) -> Result<(), ProtocolError> {
        if !self.oracle.is_authorized(&ctx.caller) {
            return Err(ProtocolError::Not_Authorized);
        }

        let request = self.reputation.answer(
            id,
            score,
            ctx.now,
            self.parameters.request_ttl,
        )?;
        let target = request.target.clone();

        log.emit(
            &self.address,
            ProtocolEvent::ReputationReceived { id, score, target },
        );

        Ok(())
    }

    /// Draws `amount` from the position into a new escrow for `target`.
    /// Returns the escrow, which the caller stores under its address.
    pub fn create_borrow(
        &mut self,
        ctx: &CallContext,
        loan_key: &LoanKey,
        amount: Amount,
        target: Address,
        bank: &mut Bank,
    ) -> Result<Escrow, ProtocolError> {
        if amount == 0 {
            return Err(ProtocolError::Empty_Amount);
        }

        let position = self
            .registry
            .get(loan_key)
            .ok_or(ProtocolError::Empty_Lender)?;

        if ctx.caller == position.lender {
            return Err(ProtocolError::Impossible_Borrower);
        }

        if amount > position.available_amount || position.is_expired(ctx.now) {
            return Err(ProtocolError::Loan_No_More_Available);
        }

        self.check_borrowable_reputation(&target, ctx.now)?;

        let (rate_amount, _) = self.calculate_interest(amount, position.interest_rate)?;
        let index = self.registry.escrows(loan_key).len();
        let escrow_address =
            Address::derive(&self.address, &format!("{}:{}", loan_key, index));

        let escrow = Escrow::new(
            escrow_address.clone(),
            EscrowTerms {
                lender: position.lender.clone(),
                borrower: ctx.caller.clone(),
                miner_actor: target.clone(),
                loan_amount: amount,
                rate_amount,
                withdraw_interval: self.parameters.withdraw_interval,
                end: position.end_timestamp,
            },
            ctx.now,
        )?;

        bank.transfer(&self.address, &escrow_address, amount)?;
        self.registry.record_borrow(
            BorrowOrder {
                borrower: ctx.caller.clone(),
                loan_amount: amount,
                miner_actor: target,
                loan_key: loan_key.clone(),
            },
            escrow_address.clone(),
        )?;

        debug!(
            "Borrow of {} against {} placed in escrow {}",
            amount, loan_key, escrow_address
        );

        Ok(escrow)
    }

    fn check_borrowable_reputation(
        &self,
        target: &Address,
        now: UnixTime,
    ) -> Result<(), ProtocolError> {
        let request = self
            .reputation
            .latest_for(target)
            .ok_or(ProtocolError::Reputation_Not_Received)?;

        if request.is_expired(now, self.parameters.request_ttl) {
            return Err(ProtocolError::Reputation_Not_Received);
        }

        let score = self
            .reputation
            .received_score(target)
            .ok_or(ProtocolError::Reputation_Not_Received)?;

        if score < self.parameters.min_reputation_score {
            return Err(ProtocolError::Reputation_Too_Low);
        }

        Ok(())
    }

    fn next_loan_key(
        &mut self,
        lender: &Address,
        end_timestamp: UnixTime,
        now: UnixTime,
    ) -> LoanKey {
        let key = LoanKey::generate(lender, self.key_nonce, end_timestamp, now);
        self.key_nonce += 1;
        key
    }
}
