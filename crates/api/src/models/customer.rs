//! Customer domain type.

use chrono::{DateTime, Utc};

use sugarloaf_core::{CustomerId, Email, Gender};

/// A customer record.
///
/// The password hash deliberately lives outside this type; it is only
/// reachable through [`crate::db::customers::CustomerRepository::get_password_hash`]
/// and never serialized into a response.
#[derive(Debug, Clone)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// Customer's email address (unique, stored case-sensitively).
    pub email: Email,
    /// Full name, populated by the setup step after verification.
    pub full_name: Option<String>,
    /// Gender, populated by the setup step after verification.
    pub gender: Option<Gender>,
    /// Phone number, populated by the setup step after verification.
    pub phone: Option<String>,
    /// Media reference for the profile photo (e.g. `/media/customers/<name>.jpg`).
    pub photo: Option<String>,
    /// Whether the signup OTP challenge has been completed.
    pub email_verified: bool,
    /// Soft-delete flag; inactive rows are retained but invisible to lookups.
    pub is_active: bool,
    /// When the customer was created.
    pub created_at: DateTime<Utc>,
    /// When the customer was last updated.
    pub updated_at: DateTime<Utc>,
}
