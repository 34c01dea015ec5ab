//! Referral resolver
//!
//! The sponsorship tree is stored as `sponsor_id` back-references on users.
//! Each hop is one indexed lookup; the tree is never loaded as a graph.

use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use mlmart_db::UserRepository;
use mlmart_types::{ReferralChain, MAX_REFERRAL_DEPTH};

use crate::LedgerResult;

/// Walks sponsorship links upward from a buyer
#[derive(Debug, Clone, Copy)]
pub struct ReferralResolver {
    max_depth: usize,
}

impl ReferralResolver {
    pub fn new() -> Self {
        Self {
            max_depth: MAX_REFERRAL_DEPTH,
        }
    }

    /// Upline of a member, nearest sponsor first, at most three levels.
    ///
    /// Stops at the first missing link.
    pub async fn upline<R>(&self, repo: &mut R, member_id: Uuid) -> LedgerResult<ReferralChain>
    where
        R: UserRepository + ?Sized,
    {
        let mut levels = Vec::with_capacity(self.max_depth);
        let mut current = member_id;

        while levels.len() < self.max_depth {
            let Some(sponsor) = repo.sponsor_of(current).await? else {
                break;
            };
            if sponsor == member_id || levels.contains(&sponsor) {
                warn!(%member_id, %sponsor, "Sponsorship cycle detected, truncating upline");
                break;
            }
            levels.push(sponsor);
            current = sponsor;
        }

        Ok(ReferralChain::from_levels(levels))
    }

    /// Recruiter of a seller, one hop
    pub async fn seller_recruiter<R>(
        &self,
        repo: &mut R,
        seller_id: Uuid,
    ) -> LedgerResult<Option<Uuid>>
    where
        R: UserRepository + ?Sized,
    {
        Ok(repo.seller_recruiter_of(seller_id).await?)
    }

    /// Recruiters of several sellers, keyed by seller. Sellers without a recruiter are absent.
    pub async fn seller_recruiters<R, I>(
        &self,
        repo: &mut R,
        sellers: I,
    ) -> LedgerResult<HashMap<Uuid, Uuid>>
    where
        R: UserRepository + ?Sized,
        I: IntoIterator<Item = Uuid> + Send,
        I::IntoIter: Send,
    {
        let mut recruiters = HashMap::new();
        for seller_id in sellers {
            if recruiters.contains_key(&seller_id) {
                continue;
            }
            if let Some(recruiter) = self.seller_recruiter(repo, seller_id).await? {
                recruiters.insert(seller_id, recruiter);
            }
        }
        Ok(recruiters)
    }
}

impl Default for ReferralResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{member, member_with};
    use mlmart_db::memory::MemoryStore;
    use mlmart_db::LedgerStore;

    #[tokio::test]
    async fn test_upline_capped_at_three_levels() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let s4 = member(&mut uow, "S4").await;
        let s3 = member_with(&mut uow, "S3", Some(s4), None).await;
        let s2 = member_with(&mut uow, "S2", Some(s3), None).await;
        let s1 = member_with(&mut uow, "S1", Some(s2), None).await;
        let buyer = member_with(&mut uow, "B", Some(s1), None).await;

        let chain = ReferralResolver::new().upline(&mut uow, buyer).await.unwrap();
        assert_eq!(chain.levels(), &[s1, s2, s3]);
    }

    #[tokio::test]
    async fn test_upline_stops_at_missing_link() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let s2 = member(&mut uow, "S2").await;
        let s1 = member_with(&mut uow, "S1", Some(s2), None).await;
        let buyer = member_with(&mut uow, "B", Some(s1), None).await;
        let orphan = member(&mut uow, "O").await;

        let resolver = ReferralResolver::new();
        assert_eq!(resolver.upline(&mut uow, buyer).await.unwrap().levels(), &[s1, s2]);
        assert!(resolver.upline(&mut uow, orphan).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seller_recruiters_skip_unrecruited() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let recruiter = member(&mut uow, "R").await;
        let recruited = member_with(&mut uow, "V1", None, Some(recruiter)).await;
        let independent = member(&mut uow, "V2").await;

        let map = ReferralResolver::new()
            .seller_recruiters(&mut uow, vec![recruited, independent, recruited])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&recruited), Some(&recruiter));
    }
}
