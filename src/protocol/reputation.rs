use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{
    error::ProtocolError,
    types::{Address, Duration, RequestId, Score, UnixTime},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Pending,
    Received,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReputationRequest {
    pub id: RequestId,
    pub target: Address,
    pub status: RequestStatus,
    pub score: Option<Score>,
    pub requested_at: UnixTime,
}

impl ReputationRequest {
    pub fn is_expired(&self, now: UnixTime, ttl: Duration) -> bool {
        self.status == RequestStatus::Pending
            && now.saturating_sub(self.requested_at) > ttl
    }
}

/// Outstanding and answered reputation requests, indexed by id and by target.
#[derive(Debug, Clone, Default)]
pub struct ReputationBook {
    current_id: RequestId,
    requests: BTreeMap<RequestId, ReputationRequest>,
    latest: HashMap<Address, RequestId>,
}

impl ReputationBook {
    pub fn new() -> Self {
        ReputationBook::default()
    }

    /// The id the next request will receive.
    pub fn current_id(&self) -> RequestId {
        self.current_id
    }

    pub fn open(&mut self, target: Address, now: UnixTime) -> RequestId {
        let id = self.current_id;
        self.current_id += 1;

        self.latest.insert(target.clone(), id);
        self.requests.insert(
            id,
            ReputationRequest {
                id,
                target,
                status: RequestStatus::Pending,
                score: None,
                requested_at: now,
            },
        );

        id
    }

    pub fn answer(
        &mut self,
        id: RequestId,
        score: Score,
        now: UnixTime,
        ttl: Duration,
    ) -> Result<&ReputationRequest, ProtocolError> {
        let request = self
            .requests
            .get_mut(&id)
            .ok_or(ProtocolError::Unknown_Request)?;

        if request.status == RequestStatus::Received {
            return Err(ProtocolError::Already_Received);
        }

        if request.is_expired(now, ttl) {
            return Err(ProtocolError::Request_Expired);
        }

        request.status = RequestStatus::Received;
        request.score = Some(score);

        Ok(request)
    }

    pub fn get(&self, id: RequestId) -> Option<&ReputationRequest> {
        self.requests.get(&id)
    }

    pub fn latest_for(&self, target: &Address) -> Option<&ReputationRequest> {
        self.latest.get(target).and_then(|id| self.requests.get(id))
    }

    /// Score of the most recent request for `target`, if it has been answered.
    pub fn received_score(&self, target: &Address) -> Option<Score> {
        self.latest_for(target)
            .filter(|r| r.status == RequestStatus::Received)
            .and_then(|r| r.score)
    }
}
