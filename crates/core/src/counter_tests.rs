// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn increment_returns_value_then_advances() {
    let counter = Counter::new(3);
    assert_eq!(counter.increment(), 3);
    assert_eq!(counter.increment(), 4);
    assert_eq!(counter.increment(), 5);
    assert_eq!(counter.current(), 6);
}

#[test]
fn default_starts_at_user_step_order() {
    let counter = Counter::default();
    assert_eq!(counter.increment(), 3);
}
