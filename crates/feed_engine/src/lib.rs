//! Feed engine: token lifecycle, polling, and the ingestion pipeline into storage.
mod channel;
mod decode;
mod engine;
mod fetch;
mod persist;
mod poller;
mod sink;
mod store;
mod token;
mod types;

pub use channel::{ingestion_channel, DispatchReport, DispatchStatus, IngestReceiver, IngestSender};
pub use decode::{decode_listing, DecodeError};
pub use engine::{EngineConfig, EngineHandle};
pub use fetch::{
    read_rate_limit, FeedClient, FeedPage, FetchSettings, ReqwestFeedClient, RATELIMIT_REMAINING,
    RATELIMIT_RESET, RATELIMIT_USED,
};
pub use persist::{ensure_store_dir, PersistError};
pub use poller::{CycleReport, PollExit, PollSettings, Poller};
pub use sink::{SinkReport, SinkWorker};
pub use store::{FileItemStore, ItemStore, MemoryItemStore, ITEMS_FILENAME};
pub use token::{
    ClientCredentialsProvider, EndpointTokenProvider, Token, TokenManager, TokenProvider,
};
pub use types::{AuthError, EngineError, ErrorClass, FailureKind, FetchError};
