//! CLI command implementations

pub mod compile;
pub mod config;
pub mod effective;
pub mod formats;
pub mod remove;
pub mod send;
pub mod source;
pub mod unlink;
pub mod url;

pub use compile::execute as compile;
pub use config::execute as config;
pub use effective::execute as effective;
pub use formats::execute as formats;
pub use remove::execute as remove;
pub use send::execute as send;
pub use source::execute as source;
pub use unlink::execute as unlink;
pub use url::execute as url;
