pub use self::{
    api::{
        CheckReputationRequest, CheckReputationResponse, RelayStatus,
        StatusCount,
    },
    chain_event::{Attributes, ChainEvent},
    json_rpc::{RpcError, RpcRequest, RpcResponse},
    miners_response::{Miner, MinersResponse, ScoreValue, REACHABLE},
    queue_message::QueueMessage,
    reputation_types::{CheckReputation_Type, ReputationReceived_Type},
};

mod api;
mod chain_event;
mod json_rpc;
mod miners_response;
mod queue_message;
mod reputation_types;
