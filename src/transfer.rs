use alloy::{
    consensus::{SignableTransaction, Signed, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    primitives::{Address, Bytes, TxHash, TxKind, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to sign the transaction")]
    Signing(#[from] alloy::signers::Error),
}

/// Fixed parameters shared by every transfer in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTerms {
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

/// An unsigned native-token transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub nonce: u64,
    pub to: Address,
    pub terms: TransferTerms,
}

impl TransferIntent {
    pub fn new(nonce: u64, to: Address, terms: TransferTerms) -> Self {
        Self { nonce, to, terms }
    }

    fn unsigned(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.terms.chain_id),
            nonce: self.nonce,
            gas_price: self.terms.gas_price,
            gas_limit: self.terms.gas_limit,
            to: TxKind::Call(self.to),
            value: self.terms.value,
            input: Bytes::new(),
        }
    }

    /// Signs with EIP-155 replay protection. Consumes the intent.
    pub fn sign(self, signer: &PrivateKeySigner) -> Result<SignedTransfer, TransferError> {
        let tx = self.unsigned();
        let signature = signer.sign_hash_sync(&tx.signature_hash())?;
        Ok(SignedTransfer {
            intent: self,
            signed: tx.into_signed(signature),
        })
    }
}

/// A signed transfer ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransfer {
    pub intent: TransferIntent,
    signed: Signed<TxLegacy>,
}

impl SignedTransfer {
    pub fn hash(&self) -> TxHash {
        *self.signed.hash()
    }

    pub fn nonce(&self) -> u64 {
        self.intent.nonce
    }

    pub fn to(&self) -> Address {
        self.intent.to
    }

    /// EIP-2718 encoding of the signed transaction.
    pub fn encoded(&self) -> Vec<u8> {
        TxEnvelope::from(self.signed.clone()).encoded_2718()
    }

    pub fn signed(&self) -> &Signed<TxLegacy> {
        &self.signed
    }
}

pub fn build(
    nonce: u64,
    to: Address,
    terms: TransferTerms,
    signer: &PrivateKeySigner,
) -> Result<SignedTransfer, TransferError> {
    TransferIntent::new(nonce, to, terms).sign(signer)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy::eips::eip2718::Decodable2718;

    use super::*;

    const KEY_0: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn terms() -> TransferTerms {
        TransferTerms {
            value: U256::from(427_596u64),
            gas_limit: 22_000,
            gas_price: 900_000,
            chain_id: 88_817,
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = PrivateKeySigner::from_str(KEY_0).unwrap();
        let to = Address::repeat_byte(0x11);
        let a = build(7, to, terms(), &signer).unwrap();
        let b = build(7, to, terms(), &signer).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.encoded(), b.encoded());

        let c = build(8, to, terms(), &signer).unwrap();
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn signature_recovers_sender_and_binds_chain() {
        let signer = PrivateKeySigner::from_str(KEY_0).unwrap();
        let transfer = build(0, Address::repeat_byte(0x22), terms(), &signer).unwrap();

        let signed = transfer.signed();
        assert_eq!(signed.tx().chain_id, Some(88_817));
        let recovered = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn encoding_decodes_back_to_same_hash() {
        let signer = PrivateKeySigner::from_str(KEY_0).unwrap();
        let transfer = build(3, Address::repeat_byte(0x33), terms(), &signer).unwrap();
        let decoded = TxEnvelope::decode_2718(&mut transfer.encoded().as_slice()).unwrap();
        assert_eq!(*decoded.tx_hash(), transfer.hash());
    }
}
