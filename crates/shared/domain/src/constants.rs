//! Domain-level constants.
//!
//! These constants define business rules and defaults of the marketplace.

use uuid::Uuid;

// =============================================================================
// Accounts
// =============================================================================

/// Starting wallet balance granted to a newly registered company
pub const COMPANY_STARTING_BALANCE: u64 = 5_000;

/// Starting wallet balance granted to a newly registered engineer
pub const ENGINEER_STARTING_BALANCE: u64 = 0;

/// Rating shown for accounts that have not been reviewed yet
pub const DEFAULT_RATING: f64 = 5.0;

/// Specialties assigned to an engineer at registration
pub const DEFAULT_ENGINEER_SPECIALTIES: &[&str] =
    &["CNC Machine", "Hydraulic Press", "Robotic Arm", "Manufacturing"];

/// Minimum length for a privileged credential password
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Requests & Contracts
// =============================================================================

/// Budget attached to requests raised automatically from a failed diagnosis
pub const AUTOMATED_REQUEST_BUDGET: u64 = 500;

/// Issue prefix for requests raised automatically from a failed diagnosis
pub const AUTOMATED_ISSUE_PREFIX: &str = "[AI DETECTED FAILURE]";

/// Closing paragraph appended to every drafted contract
pub const CONTRACT_STANDARD_TERMS: &str = "Standard terms apply. Payment held in escrow.";

/// Namespace for contract ids derived from their offer id.
///
/// One offer maps to exactly one contract id, so a second draft for the
/// same offer collides on insert.
pub const CONTRACT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93d5_4b07_8e21_c0a9_5d3f_7b18);

/// Namespace for email claim ids derived from the lowercased address.
///
/// Registration inserts the claim alongside the profile, so two accounts
/// cannot commit the same email.
pub const EMAIL_CLAIM_NAMESPACE: Uuid = Uuid::from_u128(0x9d40_3be7_15a2_4f8c_b6e9_27d1_4c08_e53a);

/// Namespace for review ids derived from their contract id
pub const REVIEW_ID_NAMESPACE: Uuid = Uuid::from_u128(0x2b8e_71f0_4c6a_4d19_a5e3_9f02_d64c_1a77);

// =============================================================================
// Reviews
// =============================================================================

/// Lowest accepted star rating
pub const MIN_RATING: u8 = 1;

/// Highest accepted star rating
pub const MAX_RATING: u8 = 5;
