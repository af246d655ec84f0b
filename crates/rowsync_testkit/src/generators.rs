//! Property-based test generators.

use proptest::prelude::*;
use rowsync_core::{Row, RowState};

use crate::fixtures::product_row;

/// Any row state.
pub fn arb_row_state() -> impl Strategy<Value = RowState> {
    prop_oneof![
        Just(RowState::Added),
        Just(RowState::Modified),
        Just(RowState::Deleted),
    ]
}

/// A product row whose price fits `decimal(10,2)`.
pub fn arb_product_row() -> impl Strategy<Value = Row> {
    (any::<i32>(), -99_999_999i64..=99_999_999, arb_row_state()).prop_map(
        |(id, cents, state)| {
            let sign = if cents < 0 { "-" } else { "" };
            let abs = cents.unsigned_abs();
            let price = format!("{sign}{}.{:02}", abs / 100, abs % 100);
            product_row(i64::from(id), &price, state)
        },
    )
}

/// A batch of 1 to `max` product rows.
pub fn arb_product_batch(max: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(arb_product_row(), 1..=max)
}
