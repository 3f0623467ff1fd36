// crates/almoner-economics/src/conversion.rs
//
// Asset-identity guards for treasury conversions.
//
// The treasury may convert any surplus asset into one of its two canonical
// assets, never out of them:
//   - path[0] must be neither the reward asset nor the settlement asset
//   - path[last] must be the requested canonical asset
// Checks run in that order, so a path starting at a canonical asset reports
// the source violation even if its destination is also wrong.

use serde::{Deserialize, Serialize};

use almoner_core::error::AlmonerError;
use almoner_core::identity::AssetId;

/// The canonical asset a conversion must end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionTarget {
    /// The asset proposals are paid out in.
    SettlementAsset,
    /// The staking and reward asset.
    RewardAsset,
}

impl ConversionTarget {
    /// Resolve the target to a concrete asset.
    pub fn asset(&self, settlement: &AssetId, reward: &AssetId) -> AssetId {
        match self {
            ConversionTarget::SettlementAsset => *settlement,
            ConversionTarget::RewardAsset => *reward,
        }
    }
}

/// Validate a router path for a conversion into `target`.
///
/// Returns the (source, destination) pair on success.
pub fn validate_path(
    path: &[AssetId],
    target: ConversionTarget,
    settlement: &AssetId,
    reward: &AssetId,
) -> Result<(AssetId, AssetId), AlmonerError> {
    let (source, destination) = match (path.first(), path.last()) {
        (Some(first), Some(last)) if path.len() >= 2 => (*first, *last),
        _ => return Err(AlmonerError::InvalidPath { len: path.len() }),
    };
    if source == *reward {
        return Err(AlmonerError::SourceIsRewardAsset);
    }
    if source == *settlement {
        return Err(AlmonerError::SourceIsSettlementAsset);
    }
    let expected = target.asset(settlement, reward);
    if destination != expected {
        return Err(AlmonerError::DestinationMismatch {
            expected,
            found: destination,
        });
    }
    Ok((source, destination))
}
