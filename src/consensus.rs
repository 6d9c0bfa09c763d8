//! Calldata for the consensus contract.
//!
//! Two versions of `addTransaction` are deployed in the wild: the older one
//! takes five arguments, the newer one adds a `_validUntil` expiry. The
//! deployed ABI (when known) decides which one is tried first, and the other
//! one is kept as a fallback for nodes whose contract turns out to be the
//! other version.

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, Bytes, B256, U256},
    sol,
    sol_types::SolCall,
};
use core::future::Future;

sol! {
    #[allow(missing_docs)]
    interface IConsensusMainV5 {
        function addTransaction(
            address _sender,
            address _recipient,
            uint256 _numOfInitialValidators,
            uint256 _maxRotations,
            bytes _txData
        ) external;
    }

    #[allow(missing_docs)]
    interface IConsensusMainV6 {
        function addTransaction(
            address _sender,
            address _recipient,
            uint256 _numOfInitialValidators,
            uint256 _maxRotations,
            bytes _txData,
            uint256 _validUntil
        ) external;

        function submitAppeal(bytes32 _txId) external;
    }
}

/// Inputs of the newer `addTransaction`.
const V6_INPUTS: usize = 6;

/// Error messages that indicate the node's contract expected the other
/// `addTransaction` layout.
const ABI_MISMATCH_MESSAGES: &[&str] = &[
    "invalid pointer in tuple",
    "invalid pointer",
    "could not decode",
    "invalid arrayify value",
    "types/value length mismatch",
];

/// The `addTransaction` layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddTransactionAbi {
    /// Five arguments, no expiry.
    V5,
    /// Six arguments, ending with `_validUntil`.
    V6,
}

impl AddTransactionAbi {
    /// Pick the layout from the deployed contract's ABI. Without an ABI, or
    /// with an `addTransaction` of fewer than six inputs, this is
    /// [`AddTransactionAbi::V5`].
    pub fn from_abi(abi: Option<&JsonAbi>) -> Self {
        let inputs = abi
            .and_then(|abi| abi.function("addTransaction"))
            .and_then(|overloads| overloads.first())
            .map_or(0, |f| f.inputs.len());
        if inputs >= V6_INPUTS {
            Self::V6
        } else {
            Self::V5
        }
    }

    /// The other layout.
    pub const fn other(self) -> Self {
        match self {
            Self::V5 => Self::V6,
            Self::V6 => Self::V5,
        }
    }
}

/// Arguments of `addTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTransaction {
    /// The submitting account.
    pub sender: Address,
    /// The target contract, or the zero address for a deployment.
    pub recipient: Address,
    /// Validators in the first round.
    pub num_of_initial_validators: U256,
    /// Leader rotations allowed.
    pub max_rotations: U256,
    /// The RLP envelope.
    pub tx_data: Bytes,
    /// Expiry timestamp. Zero means no expiry. Ignored by the older layout.
    pub valid_until: U256,
}

impl AddTransaction {
    /// ABI-encode the call for the given layout.
    pub fn encode(&self, abi: AddTransactionAbi) -> Bytes {
        match abi {
            AddTransactionAbi::V5 => IConsensusMainV5::addTransactionCall {
                _sender: self.sender,
                _recipient: self.recipient,
                _numOfInitialValidators: self.num_of_initial_validators,
                _maxRotations: self.max_rotations,
                _txData: self.tx_data.clone(),
            }
            .abi_encode(),
            AddTransactionAbi::V6 => IConsensusMainV6::addTransactionCall {
                _sender: self.sender,
                _recipient: self.recipient,
                _numOfInitialValidators: self.num_of_initial_validators,
                _maxRotations: self.max_rotations,
                _txData: self.tx_data.clone(),
                _validUntil: self.valid_until,
            }
            .abi_encode(),
        }
        .into()
    }

    /// Encode both layouts, the one matching `deployed` first.
    pub fn plan(&self, deployed: Option<&JsonAbi>) -> SubmissionPlan {
        let primary_abi = AddTransactionAbi::from_abi(deployed);
        SubmissionPlan {
            primary_abi,
            primary: self.encode(primary_abi),
            fallback: self.encode(primary_abi.other()),
        }
    }
}

/// Encode `submitAppeal(txId)`.
pub fn encode_submit_appeal(tx_id: B256) -> Bytes {
    IConsensusMainV6::submitAppealCall { _txId: tx_id }.abi_encode().into()
}

/// Encoded `addTransaction` calldata for both layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPlan {
    /// The layout tried first.
    pub primary_abi: AddTransactionAbi,
    /// Calldata tried first.
    pub primary: Bytes,
    /// Calldata tried when the first attempt fails with an ABI mismatch.
    pub fallback: Bytes,
}

/// Classification of submission errors.
pub trait SubmitError {
    /// True if the error means the contract expected the other
    /// `addTransaction` layout.
    fn is_abi_mismatch(&self) -> bool;
}

/// True if an error message looks like an `addTransaction` layout mismatch.
///
/// Transports that only surface error text can use this to implement
/// [`SubmitError`].
pub fn is_abi_mismatch_message(message: &str) -> bool {
    let message = message.to_lowercase();
    ABI_MISMATCH_MESSAGES.iter().any(|pattern| message.contains(pattern))
}

#[derive(Debug)]
enum Attempt {
    Primary,
    Fallback,
}

/// Send the primary calldata, and on an ABI mismatch send the fallback.
///
/// Any other error from the primary attempt, and any error from the fallback
/// attempt, is returned as-is.
pub async fn submit_with_fallback<F, Fut, T, E>(plan: SubmissionPlan, mut send: F) -> Result<T, E>
where
    F: FnMut(Bytes) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: SubmitError + core::fmt::Display,
{
    let SubmissionPlan { primary_abi, primary, fallback } = plan;
    let mut attempt = Attempt::Primary;

    loop {
        attempt = match attempt {
            Attempt::Primary => match send(primary.clone()).await {
                Err(error) if error.is_abi_mismatch() => {
                    tracing::warn!(
                        %error,
                        rejected = ?primary_abi,
                        retry = ?primary_abi.other(),
                        "addTransaction layout rejected, retrying with the other layout"
                    );
                    Attempt::Fallback
                }
                result => return result,
            },
            Attempt::Fallback => return send(fallback).await,
        };
    }
}
