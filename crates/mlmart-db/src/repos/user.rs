//! User repository

use async_trait::async_trait;
use uuid::Uuid;

use super::PgUnitOfWork;
use crate::{DbError, DbResult, DbUser, NewUser, UserRepository};

const USER_COLUMNS: &str =
    "id, full_name, phone, referral_code, sponsor_id, seller_recruiter_id, created_at";

#[async_trait]
impl UserRepository for PgUnitOfWork {
    async fn insert_user(&mut self, user: &NewUser) -> DbResult<DbUser> {
        let sql = format!(
            r#"
            INSERT INTO users (full_name, phone, referral_code, sponsor_id, seller_recruiter_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, DbUser>(&sql)
            .bind(&user.full_name)
            .bind(&user.phone)
            .bind(&user.referral_code)
            .bind(user.sponsor_id)
            .bind(user.seller_recruiter_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    match db_err.constraint() {
                        Some("users_phone_key") => {
                            return DbError::Duplicate(format!(
                                "Phone {} already registered",
                                user.phone.as_deref().unwrap_or_default()
                            ));
                        }
                        Some("users_referral_code_key") => {
                            return DbError::Duplicate(format!(
                                "Referral code {} already taken",
                                user.referral_code
                            ));
                        }
                        _ => {}
                    }
                }
                DbError::Query(e)
            })?;

        Ok(created)
    }

    async fn find_user(&mut self, id: Uuid) -> DbResult<Option<DbUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn find_user_by_referral_code(&mut self, code: &str) -> DbResult<Option<DbUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1");
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn find_user_by_phone(&mut self, phone: &str) -> DbResult<Option<DbUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1");
        let user = sqlx::query_as::<_, DbUser>(&sql)
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(user)
    }

    async fn sponsor_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>> {
        let sponsor = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT sponsor_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sponsor.flatten())
    }

    async fn seller_recruiter_of(&mut self, user_id: Uuid) -> DbResult<Option<Uuid>> {
        let recruiter = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT seller_recruiter_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(recruiter.flatten())
    }
}
