use crate::rdt::{AckOutcome, RdtConfig, RdtError, Segment, Sender};
use crate::sim::Tick;

fn sender(data_length: usize, window: usize, data: &str) -> Sender {
    let mut s = Sender::new(&RdtConfig::new(data_length, window, 8)).expect("valid cfg");
    s.load_data(data);
    s
}

#[test]
fn emits_up_to_window_then_slides_on_ack() {
    let mut s = sender(4, 8, "HelloWorld");

    let first = s.emit_ready(Tick(1));
    assert_eq!(first, vec![Segment::data(0, "Hell"), Segment::data(4, "oWor")]);
    assert_eq!(s.outstanding(), 8);
    assert!(s.emit_ready(Tick(2)).is_empty(), "window is full");

    assert_eq!(s.on_ack(8), AckOutcome::Advanced { from: 0, to: 8 });
    assert_eq!(s.base_seq(), 8);

    let second = s.emit_ready(Tick(3));
    assert_eq!(second, vec![Segment::data(8, "ld")]);
    assert!(!s.is_complete());

    assert_eq!(s.on_ack(10), AckOutcome::Advanced { from: 8, to: 10 });
    assert!(s.is_complete());
    assert_eq!(s.in_flight_segments(), 0);
}

#[test]
fn last_segment_is_clamped_to_window_budget() {
    // 15 is not a multiple of 4: the fourth segment only gets 3 chars.
    let mut s = sender(4, 15, "abcdefghijklmnopqrst");
    let segs = s.emit_ready(Tick(1));
    let lens: Vec<u64> = segs.iter().map(|s| s.payload_len()).collect();
    assert_eq!(lens, vec![4, 4, 4, 3]);
    assert_eq!(s.next_seq(), 15);
    assert_eq!(s.outstanding(), 15);

    assert!(matches!(s.on_ack(4), AckOutcome::Advanced { .. }));
    let segs = s.emit_ready(Tick(2));
    assert_eq!(segs, vec![Segment::data(15, "pqrs")]);
    assert!(s.outstanding() <= 15);
}

#[test]
fn window_smaller_than_segment_still_progresses() {
    let mut s = sender(4, 3, "abcdefg");
    assert_eq!(s.emit_ready(Tick(1)), vec![Segment::data(0, "abc")]);
    assert!(matches!(s.on_ack(3), AckOutcome::Advanced { .. }));
    assert_eq!(s.emit_ready(Tick(2)), vec![Segment::data(3, "def")]);
}

#[test]
fn duplicate_and_stale_acks_do_not_regress_base() {
    let mut s = sender(4, 8, "HelloWorld");
    s.emit_ready(Tick(1));

    assert_eq!(s.on_ack(0), AckOutcome::Duplicate);
    assert_eq!(s.on_ack(4), AckOutcome::Advanced { from: 0, to: 4 });
    assert_eq!(s.on_ack(4), AckOutcome::Duplicate);
    assert_eq!(s.on_ack(0), AckOutcome::Duplicate);
    assert_eq!(s.base_seq(), 4);
    assert_eq!(s.in_flight_segments(), 1);
}

#[test]
fn ack_beyond_next_seq_is_ignored() {
    let mut s = sender(4, 8, "HelloWorld");
    s.emit_ready(Tick(1));
    assert_eq!(s.on_ack(9), AckOutcome::Invalid);
    assert_eq!(s.base_seq(), 0);
    assert_eq!(s.in_flight_segments(), 2);
}

#[test]
fn timeouts_resend_original_segments_and_reset_timer() {
    let mut s = sender(4, 8, "HelloWorld");
    let sent = s.emit_ready(Tick(1));

    assert!(s.check_timeouts(Tick(8), 8).is_empty());
    let resent = s.check_timeouts(Tick(9), 8);
    assert_eq!(resent, sent, "retransmission must not re-slice");
    assert_eq!(s.timed_out_segments(), 2);

    // Timer restarted at tick 9.
    assert!(s.check_timeouts(Tick(9), 8).is_empty());
    assert!(s.check_timeouts(Tick(16), 8).is_empty());
    assert_eq!(s.check_timeouts(Tick(17), 8).len(), 2);

    // Acked segments never time out again.
    s.on_ack(4);
    assert_eq!(s.check_timeouts(Tick(25), 8), vec![Segment::data(4, "oWor")]);
}

#[test]
fn empty_data_is_immediately_complete() {
    let mut s = sender(4, 8, "");
    assert!(s.is_complete());
    assert!(s.emit_ready(Tick(1)).is_empty());
    assert!(s.check_timeouts(Tick(100), 8).is_empty());
}

#[test]
fn load_data_resets_window() {
    let mut s = sender(4, 8, "HelloWorld");
    s.emit_ready(Tick(1));
    s.load_data("abc");
    assert_eq!(s.base_seq(), 0);
    assert_eq!(s.next_seq(), 0);
    assert_eq!(s.in_flight_segments(), 0);
    assert_eq!(s.emit_ready(Tick(2)), vec![Segment::data(0, "abc")]);
}

#[test]
fn burst_limit_caps_new_segments_per_call() {
    let cfg = RdtConfig {
        max_segments_per_tick: Some(1),
        ..RdtConfig::new(4, 8, 8)
    };
    let mut s = Sender::new(&cfg).expect("valid cfg");
    s.load_data("HelloWorld");
    assert_eq!(s.emit_ready(Tick(1)).len(), 1);
    assert_eq!(s.emit_ready(Tick(2)), vec![Segment::data(4, "oWor")]);
    assert!(s.emit_ready(Tick(3)).is_empty());
}

#[test]
fn offsets_are_counted_in_chars() {
    let mut s = sender(4, 8, "héllo wörld");
    let segs = s.emit_ready(Tick(1));
    assert_eq!(segs, vec![Segment::data(0, "héll"), Segment::data(4, "o wö")]);
}

#[test]
fn zero_data_length_is_rejected_before_slicing() {
    let cfg = RdtConfig {
        max_segments_per_tick: Some(3),
        ..RdtConfig::new(0, 8, 8)
    };
    match Sender::new(&cfg) {
        Err(RdtError::InvalidConfig(msg)) => assert!(msg.contains("data_length"), "{msg}"),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
    assert!(Sender::new(&RdtConfig::new(4, 0, 8)).is_err());
}
