use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Name reported for codes missing from a table.
pub const UNKNOWN: &str = "UNKNOWN";

macro_rules! named_code_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $table:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $str:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $str)]
                $variant = $code,
            )*
        }

        const $table: &[$name] = &[$($name::$variant),*];

        impl $name {
            /// The numeric code.
            pub const fn code(self) -> u8 {
                self as u8
            }

            /// The canonical name.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)*
                }
            }

            /// Look up a variant by its canonical name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($str => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownCode;

            /// Parse either a numeric code or a canonical name.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Some(v) = Self::from_name(s) {
                    return Ok(v);
                }
                s.parse::<u8>()
                    .ok()
                    .and_then(|code| $table.get(code as usize).copied())
                    .ok_or_else(|| UnknownCode(s.to_owned()))
            }
        }
    };
}

/// A status code or name that is not in the table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown code: {0}")]
pub struct UnknownCode(pub String);

named_code_enum! {
    /// Lifecycle status of a transaction.
    TransactionStatus, STATUS_TABLE_V1 {
        /// Not yet initialized.
        Uninitialized = 0 => "UNINITIALIZED",
        /// Queued, waiting for activation.
        Pending = 1 => "PENDING",
        /// The leader is proposing a result.
        Proposing = 2 => "PROPOSING",
        /// Validators are committing votes.
        Committing = 3 => "COMMITTING",
        /// Validators are revealing votes.
        Revealing = 4 => "REVEALING",
        /// Consensus accepted the result.
        Accepted = 5 => "ACCEPTED",
        /// Consensus could not decide.
        Undetermined = 6 => "UNDETERMINED",
        /// The result is final.
        Finalized = 7 => "FINALIZED",
        /// The transaction was canceled.
        Canceled = 8 => "CANCELED",
        /// Appeal validators are revealing votes.
        AppealRevealing = 9 => "APPEAL_REVEALING",
        /// Appeal validators are committing votes.
        AppealCommitting = 10 => "APPEAL_COMMITTING",
        /// Ready to be finalized.
        ReadyToFinalize = 11 => "READY_TO_FINALIZE",
        /// Validators timed out.
        ValidatorsTimeout = 12 => "VALIDATORS_TIMEOUT",
        /// The leader timed out.
        LeaderTimeout = 13 => "LEADER_TIMEOUT",
    }
}

named_code_enum! {
    /// Outcome of a consensus round.
    TransactionResult, RESULT_TABLE_V1 {
        /// No outcome yet.
        Idle = 0 => "IDLE",
        /// Validators agreed.
        Agree = 1 => "AGREE",
        /// Validators disagreed.
        Disagree = 2 => "DISAGREE",
        /// The round timed out.
        Timeout = 3 => "TIMEOUT",
        /// Execution was not deterministic.
        DeterministicViolation = 4 => "DETERMINISTIC_VIOLATION",
        /// No majority was reached.
        NoMajority = 5 => "NO_MAJORITY",
        /// A majority agreed.
        MajorityAgree = 6 => "MAJORITY_AGREE",
        /// A majority disagreed.
        MajorityDisagree = 7 => "MAJORITY_DISAGREE",
    }
}

named_code_enum! {
    /// A single validator's vote.
    VoteType, VOTE_TABLE_V1 {
        /// No vote cast.
        NotVoted = 0 => "NOT_VOTED",
        /// Agreed with the leader.
        Agree = 1 => "AGREE",
        /// Disagreed with the leader.
        Disagree = 2 => "DISAGREE",
        /// Timed out.
        Timeout = 3 => "TIMEOUT",
        /// Saw a determinism violation.
        DeterministicViolation = 4 => "DETERMINISTIC_VIOLATION",
    }
}

impl TransactionStatus {
    /// Statuses after which consensus no longer changes the outcome of the
    /// current round.
    pub const DECIDED: [Self; 6] = [
        Self::Accepted,
        Self::Undetermined,
        Self::LeaderTimeout,
        Self::ValidatorsTimeout,
        Self::Canceled,
        Self::Finalized,
    ];

    /// True if the status is a decided state.
    pub const fn is_decided(self) -> bool {
        matches!(
            self,
            Self::Accepted
                | Self::Undetermined
                | Self::LeaderTimeout
                | Self::ValidatorsTimeout
                | Self::Canceled
                | Self::Finalized
        )
    }

    /// True if a transaction in this status satisfies a wait for `target`.
    /// Waiting for [`Accepted`] is satisfied by any decided state.
    ///
    /// [`Accepted`]: TransactionStatus::Accepted
    pub const fn satisfies(self, target: Self) -> bool {
        self as u8 == target as u8 || (matches!(target, Self::Accepted) && self.is_decided())
    }
}

/// True if the given code (numeric, or a numeric string) or canonical name is
/// a decided state. Anything unrecognized is not decided.
pub fn is_decided_state(status: impl fmt::Display) -> bool {
    status.to_string().parse::<TransactionStatus>().is_ok_and(TransactionStatus::is_decided)
}

/// Which code tables to use when naming numeric fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConsensusVersion {
    /// The current consensus contracts.
    #[default]
    V1,
}

impl ConsensusVersion {
    /// Look up a status by code.
    pub fn status(self, code: u8) -> Option<TransactionStatus> {
        match self {
            Self::V1 => STATUS_TABLE_V1.get(code as usize).copied(),
        }
    }

    /// Look up a round result by code.
    pub fn result(self, code: u8) -> Option<TransactionResult> {
        match self {
            Self::V1 => RESULT_TABLE_V1.get(code as usize).copied(),
        }
    }

    /// Look up a vote by code.
    pub fn vote(self, code: u8) -> Option<VoteType> {
        match self {
            Self::V1 => VOTE_TABLE_V1.get(code as usize).copied(),
        }
    }

    /// Name a status code, or [`UNKNOWN`].
    pub fn status_name(self, code: u8) -> &'static str {
        self.status(code).map_or(UNKNOWN, TransactionStatus::as_str)
    }

    /// Name a round result code, or [`UNKNOWN`].
    pub fn result_name(self, code: u8) -> &'static str {
        self.result(code).map_or(UNKNOWN, TransactionResult::as_str)
    }

    /// Name a vote code, or [`UNKNOWN`].
    pub fn vote_name(self, code: u8) -> &'static str {
        self.vote(code).map_or(UNKNOWN, VoteType::as_str)
    }
}

/// Which hash to report for a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionHashVariant {
    /// The hash of the latest finalized transaction.
    #[default]
    #[serde(rename = "latest-final")]
    LatestFinal,
    /// The hash of the latest transaction, final or not.
    #[serde(rename = "latest-nonfinal")]
    LatestNonfinal,
}

impl TransactionHashVariant {
    /// The name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LatestFinal => "latest-final",
            Self::LatestNonfinal => "latest-nonfinal",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tables_are_indexed_by_code() {
        for (i, status) in STATUS_TABLE_V1.iter().enumerate() {
            assert_eq!(status.code() as usize, i);
        }
        for (i, result) in RESULT_TABLE_V1.iter().enumerate() {
            assert_eq!(result.code() as usize, i);
        }
        for (i, vote) in VOTE_TABLE_V1.iter().enumerate() {
            assert_eq!(vote.code() as usize, i);
        }
    }

    #[test]
    fn decided_states() {
        let decided: Vec<u8> = (0..=20).filter(|c| is_decided_state(c)).collect();
        assert_eq!(decided, vec![5, 6, 7, 8, 12, 13]);

        assert!(is_decided_state("5"));
        assert!(is_decided_state("FINALIZED"));
        assert!(!is_decided_state("PENDING"));
        assert!(!is_decided_state("abc"));
        assert!(!is_decided_state(""));
        assert!(!is_decided_state(-1));

        for status in TransactionStatus::DECIDED {
            assert!(status.is_decided());
        }
    }

    #[test]
    fn accepted_target_takes_any_decided_state() {
        use TransactionStatus::*;
        assert!(Finalized.satisfies(Accepted));
        assert!(LeaderTimeout.satisfies(Accepted));
        assert!(!Pending.satisfies(Accepted));
        assert!(!Accepted.satisfies(Finalized));
        assert!(Pending.satisfies(Pending));
    }

    #[test]
    fn names() {
        let v = ConsensusVersion::default();
        assert_eq!(v.status_name(5), "ACCEPTED");
        assert_eq!(v.status_name(14), UNKNOWN);
        assert_eq!(v.result_name(6), "MAJORITY_AGREE");
        assert_eq!(v.result_name(8), UNKNOWN);
        assert_eq!(v.vote_name(4), "DETERMINISTIC_VIOLATION");
        assert_eq!(v.vote_name(5), UNKNOWN);

        assert_eq!("ACCEPTED".parse(), Ok(TransactionStatus::Accepted));
        assert_eq!("11".parse(), Ok(TransactionStatus::ReadyToFinalize));
        assert!("ACTIVATED".parse::<TransactionStatus>().is_err());
        assert_eq!(
            serde_json::to_value(TransactionStatus::AppealRevealing).unwrap(),
            "APPEAL_REVEALING"
        );
        assert_eq!(TransactionHashVariant::LatestNonfinal.as_str(), "latest-nonfinal");
    }
}
