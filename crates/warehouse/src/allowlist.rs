//! Router contract addresses that scope every event query

use crate::query::Binds;

/// Contract addresses of the monitored router application
pub const ROUTER_ADDRESSES: [&str; 5] = [
    "0xce16F69375520ab01377ce7B88f5BA8C48F8D666",
    "0x492751eC3c57141deb205eC2da8bFcb410738630",
    "0xDC3D8e1Abe590BCa428a8a2FC4CfDbD1AcF57Bd9",
    "0xdf4fFDa22270c12d0b5b3788F1669D709476111E",
    "0xe6B3949F9bBF168f4E3EFc82bc8FD849868CC6d8",
];

/// Address allowlist applied at the source of every event relation.
///
/// Membership is a case-insensitive substring test against the raw address
/// field, so a field that merely contains one of the addresses also matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllowList {
    addresses: Vec<String>,
}

impl AllowList {
    /// Build an allowlist from arbitrary addresses.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { addresses: addresses.into_iter().map(Into::into).collect() }
    }

    /// The five router contracts.
    pub fn router() -> Self {
        Self::new(ROUTER_ADDRESSES)
    }

    /// Configured addresses in declaration order.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// SQL predicate over `expr`, one bound parameter per address.
    pub(crate) fn predicate(&self, expr: &str, binds: &mut Binds) -> String {
        if self.addresses.is_empty() {
            return "0".to_owned();
        }
        let terms: Vec<String> = self
            .addresses
            .iter()
            .enumerate()
            .map(|(i, addr)| {
                let placeholder = binds.bind(&format!("allow_{i}"), "String", addr.clone());
                format!("positionCaseInsensitive({expr}, {placeholder}) > 0")
            })
            .collect();
        format!("({})", terms.join(" OR "))
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::router()
    }
}
