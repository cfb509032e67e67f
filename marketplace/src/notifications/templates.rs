//! Notification texts.
//!
//! Every notification the marketplace sends is built here so titles and
//! wording stay in one place.

use super::model::{NotificationDraft, NotificationKind, SnapshotStatus};
use crate::aggregates::bid::{Bid, Offer, OfferStatus};
use crate::aggregates::order::Order;
use crate::types::Role;

fn to_buyer(order: &Order, title: &str, message: String) -> NotificationDraft {
    NotificationDraft {
        recipient: order.buyer.clone(),
        recipient_role: Role::Buyer,
        title: title.to_string(),
        message,
        kind: NotificationKind::OrderUpdate,
        order_ref: Some(*order.id.as_uuid()),
        order_status: None,
        image_url: None,
    }
}

fn weeks(order: &Order) -> u32 {
    order.rental.as_ref().map_or(0, |terms| terms.duration_weeks)
}

/// Request to the seller or lender for a new order
#[must_use]
pub fn order_requested(order: &Order) -> NotificationDraft {
    let (title, message) = if order.is_rental() {
        (
            "New Rental Request",
            format!(
                "A rental order arrived for \"{}\" for {} weeks.",
                order.title,
                weeks(order)
            ),
        )
    } else {
        (
            "New Order Received",
            format!("New order for \"{}\". Amount: {}", order.title, order.amount),
        )
    };

    NotificationDraft {
        recipient: order.counterparty.clone(),
        recipient_role: order.counterparty_role,
        title: title.to_string(),
        message,
        kind: NotificationKind::OrderRequest,
        order_ref: Some(*order.id.as_uuid()),
        order_status: Some(SnapshotStatus::Order(order.status)),
        image_url: None,
    }
}

/// Receipt to the buyer for a placed rental
#[must_use]
pub fn rental_placed(order: &Order) -> NotificationDraft {
    to_buyer(
        order,
        "Rental Order Placed",
        format!(
            "Your rental order for \"{}\" has been confirmed!",
            order.title
        ),
    )
}

/// Buyer's order was accepted
#[must_use]
pub fn order_confirmed(order: &Order) -> NotificationDraft {
    to_buyer(
        order,
        "Order Confirmed",
        format!("Your order for \"{}\" has been confirmed!", order.title),
    )
}

/// Buyer's order was declined
#[must_use]
pub fn order_cancelled(order: &Order) -> NotificationDraft {
    to_buyer(
        order,
        "Order Cancelled",
        format!(
            "Your order for \"{}\" was cancelled by the {}.",
            order.title, order.counterparty_role
        ),
    )
}

/// Payment captured, to the seller or lender
#[must_use]
pub fn payment_received(order: &Order) -> NotificationDraft {
    NotificationDraft {
        recipient: order.counterparty.clone(),
        recipient_role: order.counterparty_role,
        title: "Payment Received".to_string(),
        message: format!("Payment of {} received for \"{}\".", order.amount, order.title),
        kind: NotificationKind::Payment,
        order_ref: Some(*order.id.as_uuid()),
        order_status: None,
        image_url: None,
    }
}

/// Order left the seller or lender
#[must_use]
pub fn out_for_delivery(order: &Order) -> NotificationDraft {
    to_buyer(
        order,
        "Order Update",
        format!("Your order for \"{}\" is out for delivery!", order.title),
    )
}

/// Order arrived
#[must_use]
pub fn delivered(order: &Order) -> NotificationDraft {
    if order.is_rental() {
        to_buyer(
            order,
            "Delivery Completed",
            format!("Your book \"{}\" has been delivered. Enjoy reading!", order.title),
        )
    } else {
        to_buyer(
            order,
            "Order Delivered",
            format!("Your book \"{}\" has been delivered.", order.title),
        )
    }
}

/// Lender got the rental back
#[must_use]
pub fn returned(order: &Order) -> NotificationDraft {
    to_buyer(
        order,
        "Rental Returned",
        format!("Your rental of \"{}\" has been marked as returned.", order.title),
    )
}

/// New offer on the buyer's bid
#[must_use]
pub fn offer_received(offer: &Offer, bid: &Bid) -> NotificationDraft {
    NotificationDraft {
        recipient: bid.buyer.clone(),
        recipient_role: Role::Buyer,
        title: "New Offer Received!".to_string(),
        message: format!(
            "A seller offered \"{}\" for {}. Click to view details.",
            bid.book_name, offer.price
        ),
        kind: NotificationKind::OrderRequest,
        order_ref: Some(*offer.id.as_uuid()),
        order_status: Some(SnapshotStatus::Offer(OfferStatus::Pending)),
        image_url: Some(offer.image_url.clone()),
    }
}

/// Buyer answered the seller's offer
#[must_use]
pub fn offer_answered(offer: &Offer, bid: &Bid) -> NotificationDraft {
    let title = match offer.status {
        OfferStatus::Accepted => "Offer Accepted",
        OfferStatus::Declined => "Offer Declined",
        OfferStatus::Pending => "Offer Pending",
    };

    NotificationDraft {
        recipient: offer.seller.clone(),
        recipient_role: Role::Seller,
        title: title.to_string(),
        message: format!(
            "Your offer for \"{}\" has been {}.",
            bid.book_name, offer.status
        ),
        kind: NotificationKind::OrderUpdate,
        order_ref: Some(*offer.id.as_uuid()),
        order_status: None,
        image_url: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::aggregates::listing::{Book, LendBook};
    use crate::types::{AccountId, BookId, LendBookId, Money, OrderStatus};
    use librix_core::environment::Clock;
    use librix_testing::test_clock;

    #[test]
    fn test_purchase_request_text() {
        let book = Book {
            id: BookId::new(),
            title: "Dune".into(),
            seller: AccountId::new("s1"),
            price: Money::from_rupees(300),
        };
        let order = Order::purchase(&book, AccountId::new("b1"), test_clock().now());

        let draft = order_requested(&order);
        assert_eq!(draft.title, "New Order Received");
        assert_eq!(draft.message, "New order for \"Dune\". Amount: ₹300");
        assert_eq!(draft.recipient, AccountId::new("s1"));
        assert_eq!(draft.recipient_role, Role::Seller);
        assert_eq!(draft.order_status, Some(SnapshotStatus::Order(OrderStatus::Pending)));
    }

    #[test]
    fn test_rental_texts_mention_weeks() {
        let book = LendBook {
            id: LendBookId::new(),
            title: "Emma".into(),
            lender: AccountId::new("l1"),
            rent_price_per_week: Money::from_rupees(40),
        };
        let order = Order::rental(&book, AccountId::new("b1"), 4, test_clock().now()).unwrap();

        assert_eq!(
            order_requested(&order).message,
            "A rental order arrived for \"Emma\" for 4 weeks."
        );
        assert_eq!(order_requested(&order).recipient_role, Role::Lender);
        assert_eq!(
            order_requested(&order).order_status,
            Some(SnapshotStatus::Order(OrderStatus::Accepted))
        );
        assert_eq!(rental_placed(&order).recipient, AccountId::new("b1"));
        assert_eq!(
            rental_placed(&order).message,
            "Your rental order for \"Emma\" has been confirmed!"
        );
        assert_eq!(
            order_cancelled(&order).message,
            "Your order for \"Emma\" was cancelled by the lender."
        );
        assert_eq!(delivered(&order).title, "Delivery Completed");
        assert_eq!(payment_received(&order).message, "Payment of ₹160 received for \"Emma\".");
    }
}
