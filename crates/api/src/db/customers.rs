//! Customer repository for database operations.
//!
//! All lookups exclude soft-deleted rows (`is_active = FALSE`); deactivated
//! customers keep their row but disappear from every query here.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sugarloaf_core::{CustomerId, Email, Gender};

use super::RepositoryError;
use crate::models::Customer;

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    email: String,
    full_name: Option<String>,
    gender: Option<Gender>,
    phone: Option<String>,
    photo: Option<String>,
    email_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = RepositoryError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            full_name: row.full_name,
            gender: row.gender,
            phone: row.phone,
            photo: row.photo,
            email_verified: row.email_verified,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Profile fields applied by the setup step.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub gender: Gender,
    pub phone: String,
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            SELECT id, email, full_name, gender, phone, photo,
                   email_verified, is_active, created_at, updated_at
            FROM customers
            WHERE email = $1 AND is_active
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Get a customer by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            SELECT id, email, full_name, gender, phone, photo,
                   email_verified, is_active, created_at, updated_at
            FROM customers
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    /// Create a new customer with email and password hash.
    ///
    /// The unique index on `email` is the authority for duplicate signups;
    /// two concurrent creations for the same email resolve here, not in any
    /// pre-check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        let row: CustomerRow = sqlx::query_as(
            r"
            INSERT INTO customers (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, full_name, gender, phone, photo,
                      email_verified, is_active, created_at, updated_at
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Customer::try_from(row)
    }

    /// Get a customer together with their password hash, by email.
    ///
    /// Returns `None` if no active customer exists under the email. This is
    /// the only way the hash leaves the database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Customer, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            password_hash: String,
            #[sqlx(flatten)]
            customer: CustomerRow,
        }

        let row: Option<Row> = sqlx::query_as(
            r"
            SELECT password_hash, id, email, full_name, gender, phone, photo,
                   email_verified, is_active, created_at, updated_at
            FROM customers
            WHERE email = $1 AND is_active
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some((Customer::try_from(r.customer)?, r.password_hash)))
    }

    /// Mark a customer's email as verified.
    ///
    /// The only place the durable verification flag transitions true.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_email_verified(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET email_verified = TRUE, updated_at = now()
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Apply the setup-step profile fields in a single statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: CustomerId,
        profile: &ProfileUpdate,
    ) -> Result<Customer, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            UPDATE customers
            SET full_name = $2, gender = $3, phone = $4, updated_at = now()
            WHERE id = $1 AND is_active
            RETURNING id, email, full_name, gender, phone, photo,
                      email_verified, is_active, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(&profile.full_name)
        .bind(profile.gender)
        .bind(&profile.phone)
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Customer::try_from)
    }

    /// Replace the stored photo reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_photo(
        &self,
        id: CustomerId,
        photo: Option<&str>,
    ) -> Result<Customer, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r"
            UPDATE customers
            SET photo = $2, updated_at = now()
            WHERE id = $1 AND is_active
            RETURNING id, email, full_name, gender, phone, photo,
                      email_verified, is_active, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(photo)
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Customer::try_from)
    }

    /// Replace the password hash (reset-password completion).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_password_hash(
        &self,
        id: CustomerId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET password_hash = $2, updated_at = now()
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id.as_i32())
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Soft-delete a customer. The row is retained.
    ///
    /// # Returns
    ///
    /// Returns `true` if the customer was deactivated, `false` if it was
    /// already inactive or missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate(&self, id: CustomerId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET is_active = FALSE, updated_at = now()
            WHERE id = $1 AND is_active
            ",
        )
        .bind(id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
