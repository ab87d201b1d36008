pub mod address;
pub mod bind_history;
pub mod config;
pub mod errors;
pub mod events;
pub mod policy;
pub mod resolver;
pub mod source;
pub mod storage;
pub mod store;

pub use address::{parse_ip, trim_port};
pub use bind_history::{BindHistory, BindRecord};
pub use config::{DnsRuntimeConfig, PolicyConfig, SourceStoreConfig};
pub use errors::{BindHistoryError, SourceStoreError};
pub use policy::{
    AvoidPolicy, BlockPolicy, Policy, PolicyKind, PolicyRef, ReservedPolicy, StickyPolicy,
    STICK_POLICY_ID,
};
pub use resolver::{Resolver, SystemResolver};
pub use source::{NamedSource, Source, SourceRef, SourceSnapshot};
pub use storage::{ProtectedStorage, RoundRobinStorage};
pub use store::{Acquisition, SourceStore};
