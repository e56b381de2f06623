//! Business services.

pub mod auth;
pub mod email;
pub mod media;
pub mod orders;
pub mod otp;

pub use auth::{AuthError, AuthOutcome, AuthService};
pub use email::{Mailer, MailerError};
pub use media::{MediaError, MediaStore};
pub use orders::{OrderError, OrderService};
pub use otp::{OtpStore, ResetGrantStore};
