//! Member registration
//!
//! A user and its wallet are created together in one unit of work. Sponsor and
//! recruiter links are resolved from referral codes here and never change
//! afterwards, which keeps the sponsorship tree acyclic.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mlmart_db::{DbError, DbUser, DbWallet, NewUser, UnitOfWork};

use crate::{LedgerError, LedgerResult};

/// Prefix of generated referral codes
pub const REFERRAL_CODE_PREFIX: &str = "REF-";

const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterMember {
    pub full_name: String,
    pub phone: Option<String>,
    /// Referral code of the sponsoring member
    pub sponsor_code: Option<String>,
    /// Referral code of the member who recruited this seller
    pub recruiter_code: Option<String>,
}

/// A registered member and the wallet created with it
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredMember {
    pub user: DbUser,
    pub wallet: DbWallet,
}

/// Register a member inside the caller's unit of work.
///
/// Unknown sponsor or recruiter codes are ignored.
pub async fn register_member<U: UnitOfWork>(
    uow: &mut U,
    request: &RegisterMember,
) -> LedgerResult<RegisteredMember> {
    let full_name = request.full_name.trim();
    if full_name.is_empty() {
        return Err(LedgerError::InvalidInput("full_name is required".to_string()));
    }

    let phone = non_blank(request.phone.as_deref());
    if let Some(phone) = &phone {
        if uow.find_user_by_phone(phone).await?.is_some() {
            return Err(LedgerError::Duplicate(format!("Phone {} already registered", phone)));
        }
    }

    let sponsor_id = resolve_code(uow, request.sponsor_code.as_deref()).await?;
    let seller_recruiter_id = resolve_code(uow, request.recruiter_code.as_deref()).await?;
    let referral_code = unique_referral_code(uow).await?;

    let user = uow
        .insert_user(&NewUser {
            full_name: full_name.to_string(),
            phone,
            referral_code,
            sponsor_id,
            seller_recruiter_id,
        })
        .await
        .map_err(|e| match e {
            DbError::Duplicate(msg) => LedgerError::Duplicate(msg),
            other => LedgerError::Storage(other),
        })?;
    let wallet = uow.insert_wallet(user.id).await?;

    info!(
        user_id = %user.id,
        referral_code = %user.referral_code,
        sponsored = sponsor_id.is_some(),
        recruited = seller_recruiter_id.is_some(),
        "Member registered"
    );

    Ok(RegisteredMember { user, wallet })
}

/// `REF-` followed by eight upper-case hex digits
pub fn generate_referral_code() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", REFERRAL_CODE_PREFIX, hex::encode_upper(bytes))
}

async fn unique_referral_code<U: UnitOfWork>(uow: &mut U) -> LedgerResult<String> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = generate_referral_code();
        if uow.find_user_by_referral_code(&code).await?.is_none() {
            return Ok(code);
        }
        debug!(%code, "Referral code collision, regenerating");
    }
    Err(LedgerError::Duplicate(
        "Could not allocate a unique referral code".to_string(),
    ))
}

async fn resolve_code<U: UnitOfWork>(
    uow: &mut U,
    code: Option<&str>,
) -> LedgerResult<Option<uuid::Uuid>> {
    let Some(code) = non_blank(code) else {
        return Ok(None);
    };
    let found = uow.find_user_by_referral_code(&code).await?;
    if found.is_none() {
        debug!(%code, "Unknown referral code ignored");
    }
    Ok(found.map(|u| u.id))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlmart_db::memory::MemoryStore;
    use mlmart_db::{LedgerStore, WalletRepository};

    fn request(name: &str, phone: &str) -> RegisterMember {
        RegisterMember {
            full_name: name.to_string(),
            phone: Some(phone.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_referral_code_format() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("REF-"));
        assert!(code[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test]
    async fn test_register_creates_wallet_and_links() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let sponsor = register_member(&mut uow, &request("Awa", "+221700000001"))
            .await
            .unwrap();
        let member = register_member(
            &mut uow,
            &RegisterMember {
                sponsor_code: Some(sponsor.user.referral_code.clone()),
                recruiter_code: Some("REF-UNKNOWN".to_string()),
                ..request("Moussa", "+221700000002")
            },
        )
        .await
        .unwrap();

        assert_eq!(member.user.sponsor_id, Some(sponsor.user.id));
        assert_eq!(member.user.seller_recruiter_id, None);
        assert_eq!(member.wallet.user_id, member.user.id);
        assert!(uow.find_wallet_by_user(member.user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        register_member(&mut uow, &request("Awa", "+221700000001"))
            .await
            .unwrap();
        let err = register_member(&mut uow, &request("Other", " +221700000001 "))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = register_member(&mut uow, &request("   ", "+1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
    }
}
