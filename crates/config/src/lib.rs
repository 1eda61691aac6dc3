//! Routerscope configuration
use clap::Parser;
use url::Url;

/// Origins allowed by CORS in addition to local development hosts
pub const DEFAULT_ALLOWED_ORIGINS: &str =
    "https://routerscope.xyz,https://www.routerscope.xyz,https://staging.routerscope.xyz";

/// Warehouse connection options. Credentials are read from the secret store.
#[derive(Debug, Clone, Parser)]
pub struct WarehouseOpts {
    /// Warehouse HTTP endpoint
    #[clap(long = "warehouse-url", env = "WAREHOUSE_URL")]
    pub url: Url,
}

/// API server options
#[derive(Debug, Clone, Parser)]
pub struct ApiOpts {
    /// Host to bind the API server to
    #[clap(long = "api-host", env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Port to bind the API server to
    #[clap(long = "api-port", env = "API_PORT", default_value = "3000")]
    pub port: u16,
    /// Comma separated list of origins allowed by CORS
    #[clap(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,
}

/// Hosted query API options
#[derive(Debug, Clone, Parser)]
pub struct FeedOpts {
    /// API key for the hosted query API
    #[clap(long = "dune-api-key", env = "DUNE_API_KEY")]
    pub api_key: String,
    /// Base URL of the hosted query API
    #[clap(long = "dune-base-url", env = "DUNE_BASE_URL", default_value = "https://api.dune.com/api/v1")]
    pub base_url: Url,
}

/// CLI options for the Routerscope API server
#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// Warehouse connection
    #[clap(flatten)]
    pub warehouse: WarehouseOpts,

    /// API server configuration
    #[clap(flatten)]
    pub api: ApiOpts,

    /// Hosted query API configuration
    #[clap(flatten)]
    pub feed: FeedOpts,
}
