//! Base cost to marketplace listing price

/// Per-order payment processing fee
pub const TRANSACTION_FEE: f64 = 0.30;
/// Orders below this total carry the shipping surcharge
pub const FREE_SHIPPING_THRESHOLD: f64 = 75.0;
pub const SHIPPING_SURCHARGE: f64 = 7.0;
/// Share of the sale price kept after marketplace fees
pub const BUYER_FEE_FACTOR: f64 = 0.88;
/// Listing prices snap to multiples of this step
pub const PRICE_STEP: f64 = 5.0;
/// Taken off the snapped price so listings end in .98
pub const PRICE_ENDING_OFFSET: f64 = 0.02;

/// Compute the price to publish for a part with the given base cost.
///
/// Bracket bounds are inclusive on the upper end: a total of exactly 50
/// still gets the flat +10 margin.
pub fn listing_price(base_cost: f64) -> f64 {
    let mut total = base_cost + TRANSACTION_FEE;
    if total < FREE_SHIPPING_THRESHOLD {
        total += SHIPPING_SURCHARGE;
    }

    let marked_up = if total < 25.0 {
        total + 5.0
    } else if total <= 50.0 {
        total + 10.0
    } else if total <= 100.0 {
        total * 1.30
    } else if total <= 200.0 {
        total * 1.35
    } else {
        total * 1.40
    };

    round_cents(snap_to_step(marked_up / BUYER_FEE_FACTOR) - PRICE_ENDING_OFFSET)
}

/// Nearest multiple of `PRICE_STEP`, halves going to the even multiple
fn snap_to_step(value: f64) -> f64 {
    (value / PRICE_STEP).round_ties_even() * PRICE_STEP
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Whether a published price differs from the computed one by a cent or more
pub fn needs_revision(published: f64, computed: f64) -> bool {
    (round_cents(published) - round_cents(computed)).abs() >= 0.005
}
