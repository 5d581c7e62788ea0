//! Position sizing.
//!
//! Pure functions of (balance, confidence, config): no randomness, no
//! clock, no store access. Identical inputs always produce identical
//! output, and the reasoning trace records every step that shaped the
//! final amount.

use rust_decimal::Decimal;

use crate::config::SizingConfig;
use crate::domain::SizeModel;

pub const BELOW_MINIMUM_REASON: &str = "below minimum trade size";

/// Confidence tier, classified by inclusive lower bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn classify(confidence: u8, config: &SizingConfig) -> Self {
        if confidence >= config.high_confidence {
            ConfidenceTier::High
        } else if confidence >= config.medium_confidence {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    fn pct(self, config: &SizingConfig) -> Decimal {
        match self {
            ConfidenceTier::High => config.high_pct,
            ConfidenceTier::Medium => config.medium_pct,
            ConfidenceTier::Low => config.low_pct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::Low => "LOW",
        }
    }
}

/// Sizing result; `amount == 0` means "do not trade", never an error
#[derive(Debug, Clone, PartialEq)]
pub struct Sizing {
    pub amount: Decimal,
    pub tier: ConfidenceTier,
    pub reasoning: Vec<String>,
}

impl Sizing {
    pub fn is_tradable(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

/// Confidence-weighted sizing:
/// `available = balance * (1 - reserve_pct)`, tier pct applied, then
/// clamped into `[min_trade_usd, max_trade_usd]`. Anything that cannot
/// reach the minimum becomes amount=0 with a "below minimum" reason.
pub fn size(balance: Decimal, confidence: u8, config: &SizingConfig) -> Sizing {
    let tier = ConfidenceTier::classify(confidence, config);
    let available = balance * (Decimal::ONE - config.reserve_pct);

    let mut reasoning = vec![
        format!("balance ${balance}, reserve {}%", config.reserve_pct * Decimal::ONE_HUNDRED),
        format!("available ${available}"),
        format!("confidence {confidence} -> {} tier", tier.as_str()),
    ];

    if available < config.min_trade_usd {
        reasoning.push(format!(
            "available ${available} < min ${}: {BELOW_MINIMUM_REASON}",
            config.min_trade_usd
        ));
        return Sizing {
            amount: Decimal::ZERO,
            tier,
            reasoning,
        };
    }

    let raw = available * tier.pct(config);
    reasoning.push(format!(
        "raw ${raw} at {}% of available",
        tier.pct(config) * Decimal::ONE_HUNDRED
    ));

    clamp_amount(raw, available, tier, config, reasoning)
}

/// Sizing for an explicit size model. FixedUsd and BalancePercentage
/// route through the same clamp so every path honors the bounds.
pub fn size_for_model(
    balance: Decimal,
    confidence: u8,
    model: &SizeModel,
    config: &SizingConfig,
) -> Sizing {
    match model {
        SizeModel::ConfidenceWeighted => size(balance, confidence, config),
        SizeModel::FixedUsd { amount } => {
            let tier = ConfidenceTier::classify(confidence, config);
            let available = balance * (Decimal::ONE - config.reserve_pct);
            let reasoning = vec![
                format!("fixed size ${amount}"),
                format!("available ${available}"),
            ];
            if available < config.min_trade_usd {
                return Sizing {
                    amount: Decimal::ZERO,
                    tier,
                    reasoning: with_reason(
                        reasoning,
                        format!("available ${available}: {BELOW_MINIMUM_REASON}"),
                    ),
                };
            }
            clamp_amount((*amount).min(available), available, tier, config, reasoning)
        }
        SizeModel::BalancePercentage { pct } => {
            let tier = ConfidenceTier::classify(confidence, config);
            let available = balance * (Decimal::ONE - config.reserve_pct);
            let raw = available * *pct;
            let reasoning = vec![
                format!("{}% of available balance", *pct * Decimal::ONE_HUNDRED),
                format!("available ${available}, raw ${raw}"),
            ];
            if available < config.min_trade_usd {
                return Sizing {
                    amount: Decimal::ZERO,
                    tier,
                    reasoning: with_reason(
                        reasoning,
                        format!("available ${available}: {BELOW_MINIMUM_REASON}"),
                    ),
                };
            }
            clamp_amount(raw, available, tier, config, reasoning)
        }
    }
}

fn with_reason(mut reasoning: Vec<String>, reason: String) -> Vec<String> {
    reasoning.push(reason);
    reasoning
}

fn clamp_amount(
    raw: Decimal,
    available: Decimal,
    tier: ConfidenceTier,
    config: &SizingConfig,
    mut reasoning: Vec<String>,
) -> Sizing {
    if raw < config.min_trade_usd {
        reasoning.push(format!(
            "${raw} < min ${}: {BELOW_MINIMUM_REASON}",
            config.min_trade_usd
        ));
        return Sizing {
            amount: Decimal::ZERO,
            tier,
            reasoning,
        };
    }

    let mut amount = raw;
    if amount > config.max_trade_usd {
        reasoning.push(format!("clamped to max ${}", config.max_trade_usd));
        amount = config.max_trade_usd;
    }
    if amount > available {
        reasoning.push(format!("clamped to available ${available}"));
        amount = available;
    }

    Sizing {
        amount,
        tier,
        reasoning,
    }
}
