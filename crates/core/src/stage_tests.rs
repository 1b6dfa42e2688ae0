// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn policy(base_ms: u64, factor: f64) -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(base_ms),
        backoff_factor: factor,
    }
}

#[test]
fn first_attempt_has_zero_delay() {
    let p = policy(100, 2.0);
    assert_eq!(p.delay_for_attempt(0, Duration::from_secs(60)), Duration::ZERO);
}

#[test]
fn delay_grows_by_backoff_factor() {
    let p = policy(10, 2.0);
    assert_eq!(p.delay_for_attempt(1, Duration::from_secs(60)), Duration::from_millis(10));
    assert_eq!(p.delay_for_attempt(2, Duration::from_secs(60)), Duration::from_millis(20));
    assert_eq!(p.delay_for_attempt(3, Duration::from_secs(60)), Duration::from_millis(40));
}

#[test]
fn delay_is_capped_by_stage_timeout() {
    let p = policy(1000, 10.0);
    let cap = Duration::from_millis(500);
    assert_eq!(p.delay_for_attempt(3, cap), cap);
}

#[test]
fn stage_kind_display_matches_serde_tag() {
    assert_eq!(StageKind::Input.to_string(), "input");
    assert_eq!(StageKind::Output.to_string(), "output");
}
