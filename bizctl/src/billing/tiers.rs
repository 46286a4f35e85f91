//! Model tiers, purchase options, and their rate tables.
//!
//! Inference costs and purchase grants are two independent scales that share a single credit
//! balance: buying `model1` grants 30 credits, while one `model1` prediction consumes 1.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Credits charged per successful prediction, indexed by [`ModelTier::index`].
const INFERENCE_COST: [i64; ModelTier::COUNT] = [1, 2, 3];

/// One of the three selectable prediction models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Model1,
    Model2,
    Model3,
}

impl ModelTier {
    pub const COUNT: usize = 3;
    pub const ALL: [ModelTier; ModelTier::COUNT] = [ModelTier::Model1, ModelTier::Model2, ModelTier::Model3];

    /// Position of this tier in per-tier tables and flag arrays.
    pub const fn index(self) -> usize {
        match self {
            ModelTier::Model1 => 0,
            ModelTier::Model2 => 1,
            ModelTier::Model3 => 2,
        }
    }

    /// Credits consumed by one successful prediction.
    pub const fn inference_cost(self) -> i64 {
        INFERENCE_COST[self.index()]
    }

    /// Wire name, also used as the ledger column and the model artifact stem.
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelTier::Model1 => "model1",
            ModelTier::Model2 => "model2",
            ModelTier::Model3 => "model3",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment names no known tier or option.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised value '{0}'")]
pub struct UnknownTier(pub String);

impl FromStr for ModelTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// What a purchase unlocks and how many credits it grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseTerms {
    pub unlocks: &'static [ModelTier],
    pub credits_granted: i64,
}

/// Something a user can buy: a single tier, or the bundle of all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOption {
    Model1,
    Model2,
    Model3,
    All,
}

/// Terms of each purchase option, indexed by [`PurchaseOption::index`].
const PURCHASE_TERMS: [PurchaseTerms; PurchaseOption::COUNT] = [
    PurchaseTerms {
        unlocks: &[ModelTier::Model1],
        credits_granted: 30,
    },
    PurchaseTerms {
        unlocks: &[ModelTier::Model2],
        credits_granted: 60,
    },
    PurchaseTerms {
        unlocks: &[ModelTier::Model3],
        credits_granted: 90,
    },
    PurchaseTerms {
        unlocks: &ModelTier::ALL,
        credits_granted: 100,
    },
];

impl PurchaseOption {
    pub const COUNT: usize = 4;
    pub const ALL: [PurchaseOption; PurchaseOption::COUNT] = [
        PurchaseOption::Model1,
        PurchaseOption::Model2,
        PurchaseOption::Model3,
        PurchaseOption::All,
    ];

    /// Position of this option in per-option tables.
    pub const fn index(self) -> usize {
        match self {
            PurchaseOption::Model1 => 0,
            PurchaseOption::Model2 => 1,
            PurchaseOption::Model3 => 2,
            PurchaseOption::All => 3,
        }
    }

    pub const fn terms(self) -> PurchaseTerms {
        PURCHASE_TERMS[self.index()]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PurchaseOption::Model1 => "model1",
            PurchaseOption::Model2 => "model2",
            PurchaseOption::Model3 => "model3",
            PurchaseOption::All => "all",
        }
    }
}

impl fmt::Display for PurchaseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOption {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PurchaseOption::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}
