//! Provider configuration: types, client selection, and static/core merging.

mod merge;
mod resolve;
mod types;

pub use merge::{merge_config, merge_static_and_core};
pub use resolve::select_client;
pub use types::{
    ClientConfig, FakeEmailGenerator, IdTokenPayload, IdTokenPayloadValidator,
    ProviderClientConfig, ProviderConfig, UserInfoMap, UserInfoMapFields,
};

pub(crate) use types::set_if_empty;
