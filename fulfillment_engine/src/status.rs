//! Status normalization.
//!
//! Each provider reports order state in its own vocabulary. This module maps both into the shared
//! [`OrderLifecycleStatus`] and combines the two views with a fixed precedence rule. Everything
//! here is a pure function of its inputs: no I/O, no clock, no side effects.

use crate::db_types::OrderLifecycleStatus;

/// Map a raw print-provider status (e.g. "IN_PRODUCTION") into the shared lifecycle.
/// Unrecognized input maps to `Unknown`; this function never fails.
pub fn normalize_print_status(raw: &str) -> OrderLifecycleStatus {
    use OrderLifecycleStatus::*;
    match raw.trim().to_ascii_lowercase().as_str() {
        "created" | "unpaid" | "payment_in_progress" => Created,
        "production_ready" | "production_delayed" | "in_production" => InProduction,
        "shipped" | "in_transit" => Shipped,
        "delivered" => Delivered,
        "cancelled" | "canceled" => Cancelled,
        "rejected" | "error" => Rejected,
        _ => Unknown,
    }
}

/// Map a raw commerce status into the shared lifecycle. The commerce platform splits state over
/// `financial_status` and `fulfillment_status`; callers pass whichever single string best
/// summarises the order (see the provider adapter), and this table accepts values from both
/// vocabularies. Unrecognized input maps to `Unknown`; this function never fails.
pub fn normalize_commerce_status(raw: &str) -> OrderLifecycleStatus {
    use OrderLifecycleStatus::*;
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" | "authorized" | "open" | "unfulfilled" | "created" => Created,
        "paid" | "partially_paid" => InProduction,
        "fulfilled" | "partial" | "partially_fulfilled" => Shipped,
        "cancelled" | "canceled" | "refunded" | "voided" => Cancelled,
        _ => Unknown,
    }
}

/// Combine the two providers' views into one overall status.
///
/// Precedence, highest first:
/// 1. `cancelled` from either source,
/// 2. `rejected` from either source,
/// 3. `delivered`, only when the print provider says so,
/// 4. `shipped`, only when the print provider says so — the print side is the source of truth for
///    physical shipment, so a commerce order marked fulfilled ahead of the printer counts as
///    still in production,
/// 5. `in_production` from either source,
/// 6. `created` from either source,
/// 7. `unknown`.
pub fn combine(
    commerce: Option<OrderLifecycleStatus>,
    print: Option<OrderLifecycleStatus>,
) -> OrderLifecycleStatus {
    use OrderLifecycleStatus::*;
    if commerce == Some(Cancelled) || print == Some(Cancelled) {
        return Cancelled;
    }
    if commerce == Some(Rejected) || print == Some(Rejected) {
        return Rejected;
    }
    if print == Some(Delivered) {
        return Delivered;
    }
    if print == Some(Shipped) {
        return Shipped;
    }
    if print == Some(InProduction) || matches!(commerce, Some(InProduction) | Some(Shipped) | Some(Delivered)) {
        return InProduction;
    }
    if print == Some(Created) || commerce == Some(Created) {
        return Created;
    }
    Unknown
}

/// Normalize the raw status strings from both providers into one overall status. Total over all
/// inputs, including `None` and unrecognized strings.
pub fn normalize(commerce_status: Option<&str>, print_status: Option<&str>) -> OrderLifecycleStatus {
    let commerce = commerce_status.map(normalize_commerce_status);
    let print = print_status.map(normalize_print_status);
    combine(commerce, print)
}

/// The fixed human-facing message for each lifecycle status, shown on the customer dashboard.
pub fn status_message(status: OrderLifecycleStatus) -> &'static str {
    use OrderLifecycleStatus::*;
    match status {
        Created => "Your order has been received and is being prepared.",
        InProduction => "Your book is being printed!",
        Shipped => "Your book is on its way!",
        Delivered => "Your book has been delivered. Enjoy!",
        Cancelled => "This order has been cancelled.",
        Rejected => "There was a problem with this order. Please contact support.",
        Unknown => "We're working out the latest status of your order.",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderLifecycleStatus::*;

    const WEIRD_INPUTS: [&str; 8] =
        ["", " ", "SHIPPED!!", "n/a", "🚚", "DELIVERED_MAYBE", "null", "production_readyy"];

    #[test]
    fn normalization_is_total() {
        // Any string in, a valid lifecycle value out. Never a panic.
        for input in WEIRD_INPUTS {
            let s = normalize(Some(input), Some(input));
            assert!(OrderLifecycleStatus::ALL.contains(&s));
        }
        assert_eq!(normalize(None, None), Unknown);
        assert_eq!(normalize(Some("garbage"), None), Unknown);
        assert_eq!(normalize(None, Some("garbage")), Unknown);
    }

    #[test]
    fn cancellation_dominates_everything() {
        for other in OrderLifecycleStatus::ALL {
            assert_eq!(combine(Some(Cancelled), Some(other)), Cancelled, "commerce cancelled vs {other}");
            if other != Cancelled {
                assert_eq!(combine(Some(other), Some(Cancelled)), Cancelled, "print cancelled vs {other}");
            }
        }
        assert_eq!(normalize(Some("cancelled"), Some("SHIPPED")), Cancelled);
        assert_eq!(normalize(Some("fulfilled"), Some("CANCELED")), Cancelled);
    }

    #[test]
    fn rejection_dominates_all_but_cancellation() {
        for other in [Created, InProduction, Shipped, Delivered, Unknown] {
            assert_eq!(combine(Some(other), Some(Rejected)), Rejected);
            assert_eq!(combine(Some(Rejected), Some(other)), Rejected);
        }
        assert_eq!(combine(Some(Cancelled), Some(Rejected)), Cancelled);
    }

    #[test]
    fn delivery_requires_the_print_provider() {
        assert_eq!(normalize(Some("fulfilled"), Some("DELIVERED")), Delivered);
        // A fulfilled commerce order alone is not proof of delivery, or even of shipment.
        assert_eq!(normalize(Some("fulfilled"), Some("IN_PRODUCTION")), InProduction);
        assert_eq!(normalize(Some("fulfilled"), None), InProduction);
    }

    #[test]
    fn shipment_follows_the_print_provider() {
        assert_eq!(normalize(Some("pending"), Some("SHIPPED")), Shipped);
        assert_eq!(normalize(None, Some("SHIPPED")), Shipped);
        assert_eq!(normalize(Some("paid"), Some("shipped")), Shipped);
    }

    #[test]
    fn provider_vocabularies() {
        assert_eq!(normalize_print_status("PRODUCTION_DELAYED"), InProduction);
        assert_eq!(normalize_print_status("UNPAID"), Created);
        assert_eq!(normalize_print_status("REJECTED"), Rejected);
        assert_eq!(normalize_print_status("ERROR"), Rejected);
        assert_eq!(normalize_commerce_status("authorized"), Created);
        assert_eq!(normalize_commerce_status("partially_paid"), InProduction);
        assert_eq!(normalize_commerce_status("refunded"), Cancelled);
        assert_eq!(normalize_commerce_status("voided"), Cancelled);
    }

    #[test]
    fn messages_cover_every_status() {
        for status in OrderLifecycleStatus::ALL {
            assert!(!status_message(status).is_empty());
        }
        assert_eq!(status_message(Shipped), "Your book is on its way!");
    }
}
