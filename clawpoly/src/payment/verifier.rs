//! Replay-safe payment verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the nonce has not been accepted before
//! 2. the recipient is the configured payee
//! 3. the value covers the price
//! 4. the current time lies inside `[validAfter, validBefore]`
//!
//! Only a fully valid authorization records its nonce. The signature is not
//! checked here; settlement is assumed to reject forged authorizations.

use alloy_primitives::Address;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use super::ledger::NonceLedger;
use super::price::Pricing;
use super::types::PaymentAuthorization;
use crate::amount::TokenAmount;
use crate::error::PaymentVerificationError;
use crate::timestamp::UnixTimestamp;

/// Checks that the authorization window contains `now`, bounds inclusive.
///
/// # Errors
///
/// [`PaymentVerificationError::Expired`] when `valid_before < now`,
/// [`PaymentVerificationError::NotYetValid`] when `valid_after > now`.
pub fn assert_time(
    valid_after: UnixTimestamp,
    valid_before: UnixTimestamp,
    now: UnixTimestamp,
) -> Result<(), PaymentVerificationError> {
    if valid_before < now {
        return Err(PaymentVerificationError::Expired);
    }
    if valid_after > now {
        return Err(PaymentVerificationError::NotYetValid);
    }
    Ok(())
}

/// Validates authorizations against the payee, the price table and the
/// nonce ledger.
#[derive(Debug, Clone)]
pub struct PaymentVerifier {
    pay_to: Address,
    pricing: Pricing,
    ledger: NonceLedger,
}

impl PaymentVerifier {
    /// Creates a verifier paying `pay_to`.
    #[must_use]
    pub const fn new(pay_to: Address, pricing: Pricing, ledger: NonceLedger) -> Self {
        Self {
            pay_to,
            pricing,
            ledger,
        }
    }

    /// The nonce ledger this verifier records into.
    #[must_use]
    pub const fn ledger(&self) -> &NonceLedger {
        &self.ledger
    }

    /// Verifies `authorization` for `endpoint_id` at the current time.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a [`PaymentVerificationError`].
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(endpoint_id = %endpoint_id, payer = %authorization.from)))]
    pub async fn verify(
        &self,
        authorization: &PaymentAuthorization,
        endpoint_id: &str,
    ) -> Result<(), PaymentVerificationError> {
        if self.ledger.contains(&authorization.nonce) {
            return Err(PaymentVerificationError::Replay);
        }
        let required = self.pricing.resolve(endpoint_id).await;
        self.verify_against(authorization, required, UnixTimestamp::now())
    }

    /// Verifies against an already resolved price and an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a [`PaymentVerificationError`].
    pub fn verify_against(
        &self,
        authorization: &PaymentAuthorization,
        required: TokenAmount,
        now: UnixTimestamp,
    ) -> Result<(), PaymentVerificationError> {
        if self.ledger.contains(&authorization.nonce) {
            return Err(PaymentVerificationError::Replay);
        }
        // Address equality is byte equality, so checksum casing never matters.
        if authorization.to != self.pay_to {
            return Err(PaymentVerificationError::WrongRecipient);
        }
        if authorization.value < required {
            return Err(PaymentVerificationError::InsufficientAmount {
                required,
                received: authorization.value,
            });
        }
        assert_time(authorization.valid_after, authorization.valid_before, now)?;

        if !self.ledger.accept(authorization.nonce) {
            return Err(PaymentVerificationError::Replay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, Bytes, address};

    const PAYEE: Address = address!("00000000000000000000000000000000000000aa");
    const NOW: u64 = 1_700_000_000;

    fn verifier() -> PaymentVerifier {
        PaymentVerifier::new(PAYEE, Pricing::default(), NonceLedger::new())
    }

    fn authorization(nonce: u8) -> PaymentAuthorization {
        PaymentAuthorization {
            from: address!("1111111111111111111111111111111111111111"),
            to: PAYEE,
            value: TokenAmount::from_units(1000),
            valid_after: UnixTimestamp::from_secs(NOW - 60),
            valid_before: UnixTimestamp::from_secs(NOW + 60),
            nonce: B256::repeat_byte(nonce),
            signature: Bytes::new(),
        }
    }

    fn check(v: &PaymentVerifier, auth: &PaymentAuthorization, price: u64) -> Result<(), PaymentVerificationError> {
        v.verify_against(auth, TokenAmount::from_units(price), UnixTimestamp::from_secs(NOW))
    }

    #[test]
    fn test_valid_then_replay() {
        let v = verifier();
        let auth = authorization(1);
        assert_eq!(check(&v, &auth, 1000), Ok(()));
        assert_eq!(check(&v, &auth, 1000), Err(PaymentVerificationError::Replay));
    }

    #[test]
    fn test_replay_checked_before_recipient() {
        let v = verifier();
        let auth = authorization(2);
        check(&v, &auth, 1000).unwrap();
        let mut again = auth;
        again.to = address!("00000000000000000000000000000000000000bb");
        assert_eq!(check(&v, &again, 1000), Err(PaymentVerificationError::Replay));
    }

    #[test]
    fn test_recipient_must_match_regardless_of_case() {
        let v = verifier();
        let mut auth: PaymentAuthorization = serde_json::from_value(serde_json::json!({
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x00000000000000000000000000000000000000AA",
            "value": "1000",
            "validAfter": "0",
            "validBefore": "1900000000",
            "nonce": B256::repeat_byte(3),
        }))
        .unwrap();
        assert_eq!(check(&v, &auth, 1000), Ok(()));

        auth.nonce = B256::repeat_byte(4);
        auth.to = address!("00000000000000000000000000000000000000bb");
        assert_eq!(check(&v, &auth, 1000), Err(PaymentVerificationError::WrongRecipient));
    }

    #[test]
    fn test_price_floor() {
        let v = verifier();
        assert_eq!(
            check(&v, &authorization(5), 1001),
            Err(PaymentVerificationError::InsufficientAmount {
                required: TokenAmount::from_units(1001),
                received: TokenAmount::from_units(1000),
            })
        );
        assert_eq!(check(&v, &authorization(6), 999), Ok(()));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let v = verifier();
        let mut at_edges = authorization(7);
        at_edges.valid_after = UnixTimestamp::from_secs(NOW);
        at_edges.valid_before = UnixTimestamp::from_secs(NOW);
        assert_eq!(check(&v, &at_edges, 1000), Ok(()));

        let mut expired = authorization(8);
        expired.valid_before = UnixTimestamp::from_secs(NOW - 1);
        assert_eq!(check(&v, &expired, 1000), Err(PaymentVerificationError::Expired));

        let mut early = authorization(9);
        early.valid_after = UnixTimestamp::from_secs(NOW + 1);
        assert_eq!(check(&v, &early, 1000), Err(PaymentVerificationError::NotYetValid));
    }

    #[test]
    fn test_failed_verification_keeps_nonce_unused() {
        let v = verifier();
        let mut auth = authorization(10);
        auth.value = TokenAmount::from_units(1);
        assert!(check(&v, &auth, 1000).is_err());
        assert!(!v.ledger().contains(&auth.nonce));

        auth.value = TokenAmount::from_units(1000);
        assert_eq!(check(&v, &auth, 1000), Ok(()));
    }

    #[tokio::test]
    async fn test_verify_uses_endpoint_price() {
        let v = verifier();
        let mut auth = authorization(11);
        auth.valid_after = UnixTimestamp::from_secs(0);
        auth.valid_before = UnixTimestamp::now() + 600;
        assert!(matches!(
            v.verify(&auth, "search/address").await,
            Err(PaymentVerificationError::InsufficientAmount { .. })
        ));
        assert_eq!(v.verify(&auth, "search/tx").await, Ok(()));
    }
}
