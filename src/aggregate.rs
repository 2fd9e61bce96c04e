//! CIDR aggregation.

use ipnet::IpNet;

use crate::{Error, Result};

/// Reduces a list of networks to the minimal set of CIDRs covering the
/// same addresses.
pub trait Aggregator {
    fn aggregate(&self, ranges: &[IpNet]) -> Result<Vec<IpNet>>;
}

/// Aggregator backed by [`IpNet::aggregate`].
///
/// Adjacent and contained networks are combined. The output is sorted, with
/// IPv4 networks before IPv6 ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct CidrMerger;

impl Aggregator for CidrMerger {
    fn aggregate(&self, ranges: &[IpNet]) -> Result<Vec<IpNet>> {
        if let Some(bad) = ranges.iter().find(|net| net.trunc() != **net) {
            return Err(Error::Aggregate(format!("{} has host bits set", bad)));
        }
        Ok(IpNet::aggregate(&ranges.to_vec()))
    }
}
