//! Uniswap v2/v3 swaps through the Universal Router, paid with a Permit2
//! signature.

use alloy_primitives::aliases::{U160, U48};
use alloy_primitives::{address, Address, Bytes, U256};
use alloy_sol_types::{eip712_domain, SolCall, SolStruct, SolValue};
use chrono::Utc;
use tracing::debug;

use super::contracts::{IPermit2, IUniswapV3Pool, IUniversalRouter, PermitDetails, PermitSingle};
use super::submit::Submitted;
use super::TradeExecutor;
use crate::domain::pair::Pair;
use crate::domain::trade::TradePayload;
use crate::error::{Error, Result};

/// Universal Router command bytes.
mod command {
    pub const V3_SWAP_EXACT_IN: u8 = 0x00;
    pub const V2_SWAP_EXACT_IN: u8 = 0x08;
    pub const PERMIT2_PERMIT: u8 = 0x0a;
}

/// The router's alias for "the caller".
const MSG_SENDER: Address = address!("0000000000000000000000000000000000000001");

const PERMIT_EXPIRATION_SECS: i64 = 30 * 24 * 60 * 60;
const SIGNATURE_DEADLINE_SECS: i64 = 180;

impl TradeExecutor {
    /// Signs a permit for the router and sends `PERMIT2_PERMIT` followed by
    /// an exact-in swap. The Permit2 approval must already be mined.
    pub(super) async fn uniswap_swap(
        &self,
        pair: &Pair,
        payload: &TradePayload,
        v3: bool,
    ) -> Result<Submitted> {
        let now = Utc::now().timestamp();
        let deadline = U256::from(now + SIGNATURE_DEADLINE_SECS);
        let router = self.contracts.universal_router;

        let permit = self.permit_single(payload, router, now, deadline).await?;
        let signature = self.sign_permit(&permit)?;
        let permit_input = (permit, signature).abi_encode_params();

        let (swap_command, swap_input) = if v3 {
            let fee = self.pool_fee(pair.address).await?;
            let path = v3_path(payload.token_in, fee, payload.token_out);
            debug!(pair = %pair.address, fee, "Routing through v3 pool");
            (
                command::V3_SWAP_EXACT_IN,
                (
                    MSG_SENDER,
                    payload.amount_in,
                    payload.min_amount_out,
                    path,
                    true,
                )
                    .abi_encode_params(),
            )
        } else {
            (
                command::V2_SWAP_EXACT_IN,
                (
                    MSG_SENDER,
                    payload.amount_in,
                    payload.min_amount_out,
                    vec![payload.token_in, payload.token_out],
                    true,
                )
                    .abi_encode_params(),
            )
        };

        let data = IUniversalRouter::executeCall {
            commands: Bytes::from(vec![command::PERMIT2_PERMIT, swap_command]),
            inputs: vec![Bytes::from(permit_input), Bytes::from(swap_input)],
            deadline,
        }
        .abi_encode();

        let details = format!("{} swapped for {}", payload.symbol_in, payload.symbol_out);
        self.swap(router, data, details).await
    }

    async fn permit_single(
        &self,
        payload: &TradePayload,
        spender: Address,
        now: i64,
        sig_deadline: U256,
    ) -> Result<PermitSingle> {
        let wallet = self.chain.wallet();
        let call = IPermit2::allowanceCall {
            user: wallet,
            token: payload.token_in,
            spender,
        };
        let raw = self
            .chain
            .call(self.contracts.permit2, call.abi_encode().into())
            .await?;
        let current = IPermit2::allowanceCall::abi_decode_returns(&raw)
            .map_err(|e| Error::Parse(format!("permit2 allowance: {e}")))?;

        let expiration = u64::try_from(now + PERMIT_EXPIRATION_SECS).unwrap_or_default();
        Ok(PermitSingle {
            details: PermitDetails {
                token: payload.token_in,
                amount: U160::saturating_from(payload.amount_in),
                expiration: U48::saturating_from(expiration),
                nonce: current.nonce,
            },
            spender,
            sigDeadline: sig_deadline,
        })
    }

    fn sign_permit(&self, permit: &PermitSingle) -> Result<Bytes> {
        let domain = eip712_domain! {
            name: "Permit2",
            chain_id: self.chain.chain_id(),
            verifying_contract: self.contracts.permit2,
        };
        self.chain.sign_hash(permit.eip712_signing_hash(&domain))
    }

    async fn pool_fee(&self, pool: Address) -> Result<u32> {
        let raw = self
            .chain
            .call(pool, IUniswapV3Pool::feeCall {}.abi_encode().into())
            .await?;
        let fee = IUniswapV3Pool::feeCall::abi_decode_returns(&raw)
            .map_err(|e| Error::Parse(format!("pool fee: {e}")))?;
        Ok(fee.to::<u32>())
    }
}

/// Packed v3 path: `token_in | fee (3 bytes) | token_out`.
fn v3_path(token_in: Address, fee: u32, token_out: Address) -> Bytes {
    let mut path = Vec::with_capacity(43);
    path.extend_from_slice(token_in.as_slice());
    path.extend_from_slice(&fee.to_be_bytes()[1..]);
    path.extend_from_slice(token_out.as_slice());
    Bytes::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_path_packs_fee_in_three_bytes() {
        let token_in = Address::repeat_byte(0x11);
        let token_out = Address::repeat_byte(0x22);
        let path = v3_path(token_in, 3000, token_out);

        assert_eq!(path.len(), 43);
        assert_eq!(&path[..20], token_in.as_slice());
        assert_eq!(&path[20..23], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&path[23..], token_out.as_slice());
    }

    #[test]
    fn permit_hash_depends_on_nonce() {
        let domain = eip712_domain! {
            name: "Permit2",
            chain_id: 8453,
            verifying_contract: address!("000000000022D473030F116dDEE9F6B43aC78BA3"),
        };
        let permit = |nonce: u64| PermitSingle {
            details: PermitDetails {
                token: Address::repeat_byte(1),
                amount: U160::from(1_000u64),
                expiration: U48::from(1_700_000_000u64),
                nonce: U48::from(nonce),
            },
            spender: Address::repeat_byte(2),
            sigDeadline: U256::from(1_700_000_180u64),
        };

        assert_ne!(
            permit(0).eip712_signing_hash(&domain),
            permit(1).eip712_signing_hash(&domain)
        );
    }
}
