//! Client for the hosted query API serving the NFT campaign metrics

pub mod client;
pub mod nft;

pub use client::{FeedClient, FeedError, FeedResult, FeedRow};
pub use nft::{DailyPoint, DualSeries, FeedTable, NFT_CUTOFF_DATE, NftMetrics, NftQuery, TableRow};
