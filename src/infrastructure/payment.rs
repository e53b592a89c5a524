use crate::domain::invoice::Invoice;
use crate::domain::ports::PaymentProvider;
use crate::error::ChargeError;
use async_trait::async_trait;
use rand::Rng;

/// How the simulated provider decides a charge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeMode {
    /// Every charge succeeds.
    Accept,
    /// Every charge is declined for insufficient funds.
    Decline,
    /// Outcomes are drawn at random with the given rates.
    Random {
        decline_rate: f64,
        network_failure_rate: f64,
    },
}

/// Stand-in for a real payment gateway.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentProvider {
    mode: ChargeMode,
}

impl SimulatedPaymentProvider {
    pub fn new(mode: ChargeMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl PaymentProvider for SimulatedPaymentProvider {
    async fn charge(&self, _invoice: &Invoice) -> Result<bool, ChargeError> {
        match self.mode {
            ChargeMode::Accept => Ok(true),
            ChargeMode::Decline => Ok(false),
            ChargeMode::Random {
                decline_rate,
                network_failure_rate,
            } => {
                let mut rng = rand::thread_rng();
                if rng.gen_bool(probability(network_failure_rate)) {
                    Err(ChargeError::Network)
                } else {
                    Ok(!rng.gen_bool(probability(decline_rate)))
                }
            }
        }
    }
}

/// `gen_bool` panics outside `0..=1`; NaN counts as never.
fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}
