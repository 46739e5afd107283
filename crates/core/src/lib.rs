//! Interview screener core: the topic sequencer, the completion generator,
//! and the storage-side clients (tokens, quota guard, transcript upload).

pub mod interview;
pub mod llm_client;
pub mod quota;
pub mod storage;
pub mod token;
pub mod topic;
pub mod transcript;
