//! The paygate decision for one request.

use std::sync::Arc;

use super::challenge::{PaymentChallenge, PaymentConfig};
use super::ledger::NonceLedger;
use super::price::Pricing;
use super::types::{PaymentAuthorization, PaymentRequiredInfo, SettlementAck};
use super::verifier::PaymentVerifier;
use crate::amount::TokenAmount;
use crate::error::PaymentVerificationError;
use crate::timestamp::UnixTimestamp;

/// What the gate decided for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Payment accepted; the request may proceed.
    Paid(SettlementAck),
    /// No usable authorization; answer with this challenge.
    PaymentRequired(Box<PaymentRequiredInfo>),
    /// An authorization was supplied and refused.
    Rejected(PaymentVerificationError),
}

/// Challenge builder and verifier sharing one payee, price table and
/// nonce ledger.
#[derive(Debug, Clone)]
pub struct PaymentGate {
    challenge: PaymentChallenge,
    verifier: PaymentVerifier,
}

impl PaymentGate {
    /// A gate with a fresh nonce ledger.
    #[must_use]
    pub fn new(config: PaymentConfig, pricing: Pricing) -> Self {
        Self::with_ledger(config, pricing, NonceLedger::new())
    }

    /// A gate recording into `ledger`.
    #[must_use]
    pub fn with_ledger(config: PaymentConfig, pricing: Pricing, ledger: NonceLedger) -> Self {
        let verifier = PaymentVerifier::new(config.pay_to, pricing.clone(), ledger);
        Self {
            challenge: PaymentChallenge::new(config, pricing),
            verifier,
        }
    }

    /// Wraps the gate for sharing across services.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The challenge builder.
    #[must_use]
    pub const fn challenge(&self) -> &PaymentChallenge {
        &self.challenge
    }

    /// The verifier.
    #[must_use]
    pub const fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    /// Decides one request for `endpoint_id`.
    ///
    /// `authorization` is `None` when the caller sent no payment header or
    /// one that did not decode. The price is resolved once and used for both
    /// the challenge and the verification.
    pub async fn evaluate(
        &self,
        authorization: Option<&PaymentAuthorization>,
        endpoint_id: &str,
        price_override: Option<TokenAmount>,
    ) -> GateOutcome {
        self.evaluate_at(authorization, endpoint_id, price_override, UnixTimestamp::now())
            .await
    }

    /// [`Self::evaluate`] with an explicit clock.
    pub async fn evaluate_at(
        &self,
        authorization: Option<&PaymentAuthorization>,
        endpoint_id: &str,
        price_override: Option<TokenAmount>,
        now: UnixTimestamp,
    ) -> GateOutcome {
        let Some(authorization) = authorization else {
            let info = self.challenge.build(endpoint_id, price_override).await;
            #[cfg(feature = "telemetry")]
            tracing::debug!(endpoint_id, amount = %info.amount, "payment required");
            return GateOutcome::PaymentRequired(Box::new(info));
        };
        if self.verifier.ledger().contains(&authorization.nonce) {
            return GateOutcome::Rejected(PaymentVerificationError::Replay);
        }
        let required = self.challenge.price_for(endpoint_id, price_override).await;
        match self.verifier.verify_against(authorization, required, now) {
            Ok(()) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(endpoint_id, payer = %authorization.from, amount = %authorization.value, "payment accepted");
                GateOutcome::Paid(SettlementAck::accepted(authorization, endpoint_id))
            }
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::debug!(endpoint_id, reason = err.reason(), "payment rejected");
                GateOutcome::Rejected(err)
            }
        }
    }
}
