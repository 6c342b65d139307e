// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use opentelemetry::{
    Value,
    trace::{Status, TracerProvider as _},
};
use pretty_assertions::assert_eq;
use std::{io::Cursor, time::Duration};
use testspan_runner::{
    replay::{EventReplayer, ReplaySummary, replay_reader},
    reporter::OtelReporter,
};

const PAY: &str = "[chromium] › tests/checkout.spec.ts:12:5 › checkout › pays with card @smoke";
const REFUND: &str = "[chromium] › tests/checkout.spec.ts:40:5 › refunds › refunds order";

#[test]
fn replay_checkout_run() -> Result<()> {
    let telemetry = InMemoryTelemetry::new();
    let mut replayer = EventReplayer::new(OtelReporter::new(telemetry.provider.tracer("replay")));
    let summary = replay_reader(&mut replayer, Cursor::new(CHECKOUT_RUN), "checkout-run.jsonl")?;

    assert_eq!(
        summary,
        ReplaySummary {
            dispatched: 16,
            skipped: 0,
        }
    );
    let reporter = replayer.into_reporter();
    assert_eq!(reporter.open_test_spans(), 0);
    assert_eq!(reporter.open_step_spans(), 0);

    let spans = telemetry.finished_spans();
    assert_eq!(spans.len(), 7, "3 test spans and 4 step spans");

    // Two executions of the payment test, in the order they ended.
    let pay = spans_named(&spans, PAY);
    ensure!(pay.len() == 2, "expected 2 payment spans, found {}", pay.len());
    let (first, retry) = (pay[0], pay[1]);
    assert_eq!(first.status, Status::error("locator timed out"));
    assert_eq!(attribute(first, "test.outcome"), Some(Value::from("unexpected")));
    assert_eq!(attribute(first, "test.retry"), Some(Value::I64(0)));
    assert_eq!(retry.status, Status::Unset);
    assert_eq!(attribute(retry, "test.outcome"), Some(Value::from("flaky")));
    assert_eq!(attribute(retry, "team"), Some(Value::from("payments")));
    assert_eq!(attribute(retry, "issue"), None);
    assert_eq!(
        retry.end_time.duration_since(retry.start_time)?,
        Duration::from_millis(300)
    );

    let refund = spans_named(&spans, REFUND);
    ensure!(refund.len() == 1, "expected 1 refund span, found {}", refund.len());
    let refund = refund[0];
    assert_eq!(
        attribute(refund, "test.case.result.status"),
        Some(Value::from("pass"))
    );
    assert_eq!(attribute(refund, "test.worker_index"), Some(Value::I64(1)));

    // Each "fill card" step belongs to its own execution.
    let fill_card = spans_named(&spans, "Step: fill card");
    ensure!(fill_card.len() == 2, "expected 2 fill card spans, found {}", fill_card.len());
    ensure!(is_child_of(fill_card[0], first), "first fill card is under the first attempt");
    ensure!(is_child_of(fill_card[1], retry), "second fill card is under the retry");
    assert_eq!(
        fill_card[0].end_time.duration_since(fill_card[0].start_time)?,
        Duration::from_millis(90)
    );

    let type_number = spans_named(&spans, "Step: type number");
    ensure!(type_number.len() == 1, "expected 1 type number span");
    let type_number = type_number[0];
    ensure!(
        is_child_of(type_number, fill_card[0]),
        "nested step is under its parent step"
    );
    assert_eq!(type_number.status, Status::error("locator timed out"));
    assert_eq!(
        attribute(type_number, "test.step.category"),
        Some(Value::from("pw:api"))
    );
    assert_eq!(
        attribute(type_number, "code.file.path"),
        Some(Value::from("tests/pages/card.ts"))
    );

    let open_order = spans_named(&spans, "Step: open order");
    ensure!(open_order.len() == 1, "expected 1 open order span");
    ensure!(
        is_child_of(open_order[0], refund),
        "interleaved step is under its own test"
    );

    Ok(())
}

#[test]
fn root_dir_override_changes_titles() -> Result<()> {
    let telemetry = InMemoryTelemetry::new();
    let mut replayer = EventReplayer::new(OtelReporter::new(telemetry.provider.tracer("replay")))
        .with_root_dir(Some("/repo/tests".into()));
    replay_reader(&mut replayer, Cursor::new(CHECKOUT_RUN), "checkout-run.jsonl")?;

    let spans = telemetry.finished_spans();
    let refund = spans_named(
        &spans,
        "[chromium] › checkout.spec.ts:40:5 › refunds › refunds order",
    );
    ensure!(refund.len() == 1, "expected the refund span with a shorter path");
    Ok(())
}
