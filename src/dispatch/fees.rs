use crate::config::DispatchPolicy;
use crate::domain::payment::ValidatedPayment;
use crate::providers::Provider;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFee {
    pub amount: Decimal,
    pub rate: Decimal,
    pub currency: String,
}

/// Fee charged by the gateway itself. Only wallet contributions to a pool
/// carry one today.
pub fn gateway_fee(payment: &ValidatedPayment, policy: &DispatchPolicy) -> Option<GatewayFee> {
    if payment.provider != Provider::Wallet || !payment.request.is_context(&policy.pool_context) {
        return None;
    }
    let amount = (payment.amount * policy.pool_fee_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Some(GatewayFee {
        amount,
        rate: policy.pool_fee_rate,
        currency: payment.currency.code.clone(),
    })
}

pub fn with_fee(raw: &Value, fee: Option<&GatewayFee>) -> Value {
    let mut body = raw.clone();
    if let (Some(fee), Some(obj)) = (fee, body.as_object_mut()) {
        obj.insert("gatewayFee".to_string(), number(fee.amount));
        obj.insert("gatewayFeeRate".to_string(), number(fee.rate));
        obj.insert("gatewayFeeCurrency".to_string(), Value::String(fee.currency.clone()));
    }
    body
}

fn number(d: Decimal) -> Value {
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::resolve;
    use crate::domain::payment::PaymentRequest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn payment(provider: Provider, amount: Decimal, context: Option<&str>) -> ValidatedPayment {
        let request = PaymentRequest {
            context: context.map(str::to_string),
            ..Default::default()
        };
        ValidatedPayment {
            raw: json!({"provider": provider.key(), "amount": 1000, "context": context}),
            destination: None,
            request,
            provider,
            amount,
            currency: resolve(None, Some("EUR"), None).unwrap(),
        }
    }

    #[test]
    fn wallet_pool_contribution_pays_half_a_percent() {
        let p = payment(Provider::Wallet, dec!(1000), Some("cagnotte"));
        let fee = gateway_fee(&p, &DispatchPolicy::default()).unwrap();
        assert_eq!(fee.amount, dec!(5.00));

        let body = with_fee(&p.raw, Some(&fee));
        assert_eq!(body["gatewayFee"].as_f64(), Some(5.0));
        assert_eq!(body["gatewayFeeRate"].as_f64(), Some(0.005));
        assert_eq!(body["gatewayFeeCurrency"], "EUR");
        assert_eq!(body["amount"], 1000);
    }

    #[test]
    fn fee_rounds_to_cents() {
        let p = payment(Provider::Wallet, dec!(333.33), Some("cagnotte"));
        assert_eq!(gateway_fee(&p, &DispatchPolicy::default()).unwrap().amount, dec!(1.67));
    }

    #[test]
    fn no_fee_outside_wallet_pool_flow() {
        let policy = DispatchPolicy::default();
        assert!(gateway_fee(&payment(Provider::Stripe, dec!(1000), Some("cagnotte")), &policy).is_none());
        assert!(gateway_fee(&payment(Provider::Wallet, dec!(1000), None), &policy).is_none());

        let raw = json!({"amount": 10});
        assert_eq!(with_fee(&raw, None), raw);
    }
}
