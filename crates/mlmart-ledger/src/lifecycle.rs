//! Order lifecycle gate
//!
//! Order state machine: `pending → confirmed → completed`, with `cancelled`
//! reachable from `pending` and `confirmed`. Entering `completed` is a
//! conditional update, so only the first delivery confirmation takes the
//! transition and distributes commissions; later calls see zero affected rows
//! and report [`DeliveryOutcome::AlreadyCompleted`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use mlmart_db::{DbOrder, DbOrderItem, DbWalletTransaction, UnitOfWork};
use mlmart_types::{ItemStatus, OrderStatus};

use crate::{
    CommissionPolicy, LedgerError, LedgerResult, OrderLine, PayoutEngine, PayoutOutcome,
    ReferralResolver,
};

/// What a delivery confirmation did
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The order moved to `completed` and its commissions were recorded
    Distributed(DeliveryReceipt),
    /// The order was already completed; nothing was written. Carries the
    /// credits recorded by the first confirmation.
    AlreadyCompleted {
        order_id: Uuid,
        credits: Vec<DbWalletTransaction>,
    },
}

impl DeliveryOutcome {
    pub fn is_distributed(&self) -> bool {
        matches!(self, Self::Distributed(_))
    }
}

/// Commission set recorded for one delivered order
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub order_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub credits: Vec<DbWalletTransaction>,
    /// Instructions dropped by the payout engine
    pub skipped: usize,
}

/// Drives order and item status changes, and runs commission distribution on delivery
#[derive(Debug, Clone)]
pub struct OrderLifecycleGate {
    resolver: ReferralResolver,
    policy: CommissionPolicy,
    payout: PayoutEngine,
}

impl OrderLifecycleGate {
    pub fn new(policy: CommissionPolicy) -> Self {
        Self {
            resolver: ReferralResolver::new(),
            policy,
            payout: PayoutEngine::new(),
        }
    }

    pub fn policy(&self) -> &CommissionPolicy {
        &self.policy
    }

    /// Complete an order and record its commissions in the caller's unit of work.
    pub async fn confirm_delivery<U: UnitOfWork>(
        &self,
        uow: &mut U,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> LedgerResult<DeliveryOutcome> {
        let transitioned = uow
            .transition_order(order_id, OrderStatus::completable_from(), OrderStatus::Completed)
            .await?;

        let Some(order) = transitioned else {
            let order = uow
                .find_order(order_id)
                .await?
                .ok_or(LedgerError::OrderNotFound(order_id))?;
            return match order.status()? {
                OrderStatus::Completed => {
                    info!(%order_id, "Delivery already confirmed, nothing to do");
                    let credits = uow.list_order_transactions(order_id).await?;
                    Ok(DeliveryOutcome::AlreadyCompleted { order_id, credits })
                }
                other => Err(LedgerError::invalid_transition(
                    "order",
                    order_id,
                    other,
                    OrderStatus::Completed,
                )),
            };
        };

        uow.set_order_items_status(order_id, ItemStatus::Delivered).await?;
        let items = uow.order_items(order_id).await?;

        let chain = self.resolver.upline(uow, order.buyer_id).await?;
        let sellers: BTreeSet<Uuid> = items.iter().map(|i| i.seller_id).collect();
        let recruiters = self.resolver.seller_recruiters(uow, sellers).await?;

        let lines: Vec<OrderLine> = items.iter().map(OrderLine::from).collect();
        let instructions = self
            .policy
            .compute(order.id, order.buyer_id, &lines, &chain, &recruiters);

        let mut credits = Vec::with_capacity(instructions.len());
        let mut skipped = 0;
        for instruction in &instructions {
            match self
                .payout
                .apply_credit(uow, instruction, Some(order.id), now)
                .await?
            {
                PayoutOutcome::Applied(tx) => credits.push(tx),
                PayoutOutcome::Skipped(_) => skipped += 1,
            }
        }

        info!(
            %order_id,
            buyer_id = %order.buyer_id,
            upline_levels = chain.len(),
            credits = credits.len(),
            skipped,
            "Order completed, commissions recorded"
        );

        Ok(DeliveryOutcome::Distributed(DeliveryReceipt {
            order_id,
            completed_at: order.commissions_distributed_at,
            credits,
            skipped,
        }))
    }

    /// Shipping fee paid: `pending → confirmed`, items wait for seller drop-off.
    pub async fn pay_shipping<U: UnitOfWork>(
        &self,
        uow: &mut U,
        order_id: Uuid,
    ) -> LedgerResult<DbOrder> {
        self.transition(uow, order_id, &[OrderStatus::Pending], OrderStatus::Confirmed)
            .await?;
        uow.mark_shipping_paid(order_id).await?;
        uow.set_order_items_status(order_id, ItemStatus::WaitingDropoff)
            .await?;

        info!(%order_id, "Shipping paid, order confirmed");
        uow.find_order(order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))
    }

    /// Cancel an order that has not been completed.
    pub async fn cancel_order<U: UnitOfWork>(
        &self,
        uow: &mut U,
        order_id: Uuid,
    ) -> LedgerResult<DbOrder> {
        let order = self
            .transition(uow, order_id, OrderStatus::cancellable_from(), OrderStatus::Cancelled)
            .await?;
        uow.set_order_items_status(order_id, ItemStatus::Cancelled)
            .await?;

        info!(%order_id, "Order cancelled");
        Ok(order)
    }

    /// Seller dropped an item at the warehouse.
    pub async fn check_in_item<U: UnitOfWork>(
        &self,
        uow: &mut U,
        item_id: Uuid,
    ) -> LedgerResult<DbOrderItem> {
        let moved = uow
            .transition_item(item_id, ItemStatus::WaitingDropoff, ItemStatus::ReceivedWarehouse)
            .await?;
        let item = uow
            .find_order_item(item_id)
            .await?
            .ok_or(LedgerError::OrderItemNotFound(item_id))?;

        if !moved {
            return Err(LedgerError::invalid_transition(
                "order item",
                item_id,
                &item.item_status,
                ItemStatus::ReceivedWarehouse,
            ));
        }

        info!(%item_id, order_id = %item.order_id, "Item received at warehouse");
        Ok(item)
    }

    /// Items a seller still has to drop off.
    pub async fn pending_dropoffs<U: UnitOfWork>(
        &self,
        uow: &mut U,
        seller_id: Uuid,
    ) -> LedgerResult<Vec<DbOrderItem>> {
        Ok(uow
            .items_by_seller_and_status(seller_id, ItemStatus::WaitingDropoff)
            .await?)
    }

    async fn transition<U: UnitOfWork>(
        &self,
        uow: &mut U,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> LedgerResult<DbOrder> {
        if let Some(order) = uow.transition_order(order_id, from, to).await? {
            return Ok(order);
        }
        let order = uow
            .find_order(order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))?;
        Err(LedgerError::invalid_transition(
            "order",
            order_id,
            &order.global_status,
            to,
        ))
    }
}

impl Default for OrderLifecycleGate {
    fn default() -> Self {
        Self::new(CommissionPolicy::default())
    }
}
