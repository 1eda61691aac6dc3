//! Routerscope warehouse access
//! Filter resolution, SQL compilation and read-only `ClickHouse` queries

pub mod allowlist;
pub mod connection;
pub mod error;
pub mod params;
pub mod query;
pub mod reader;
pub mod view;

pub use allowlist::{AllowList, ROUTER_ADDRESSES};
pub use connection::{
    ConnectionProvider, EnvSecretStore, SecretStore, Session, WarehouseSecrets,
    private_key_pem, public_key_fingerprint,
};
pub use error::WarehouseError;
pub use params::{Granularity, ParamsError, QueryParams};
pub use query::{BindParam, CompiledQuery, EventSource, QuerySpec};
pub use reader::{RawRow, WarehouseReader};
pub use view::{ColumnKind, ColumnSpec, MetricView};
