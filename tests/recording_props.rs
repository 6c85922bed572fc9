//! Property-Based Tests for the camflow recording path
//!
//! These tests verify invariants of the record queue, the display slot, the
//! rate estimator and the raw recorder using proptest for input generation
//! and shrinking.
//!
//! Run with: cargo test --test recording_props

use camflow::pipeline::{DisplaySlot, RecordQueue};
use camflow::recording::{RawRecorder, RecorderRequest};
use camflow::timing::{format_day_number, RATE_WINDOW};
use camflow::types::{DisplaySample, RecordEntry};
use camflow::{ColorMode, Frame, Recorder, Resolution, RollingRateEstimator};
use chrono::{Local, TimeZone, Utc};
use proptest::prelude::*;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn tagged_frame(tag: u8) -> Frame {
    let mut frame = Frame::blank(2, 2, ColorMode::Grayscale);
    if let camflow::types::FramePixels::Gray(img) = &mut frame.pixels {
        img.put_pixel(0, 0, image::Luma([tag]));
    }
    frame
}

fn frame_tag(frame: &Frame) -> u8 {
    frame.as_bytes()[0]
}

proptest! {
    /// INVARIANT: the record queue hands frames out in exactly the order they went in
    #[test]
    fn record_queue_preserves_order(tags in prop::collection::vec(any::<u8>(), 0..200)) {
        let mut queue = RecordQueue::new();
        for (i, tag) in tags.iter().enumerate() {
            queue.enqueue(RecordEntry {
                frame: tagged_frame(*tag),
                timestamp: format!("{}\n", i),
            });
        }
        prop_assert_eq!(queue.depth(), tags.len());

        for (i, tag) in tags.iter().enumerate() {
            let entry = queue.dequeue().expect("entry present");
            prop_assert_eq!(frame_tag(&entry.frame), *tag);
            prop_assert_eq!(entry.timestamp, format!("{}\n", i));
        }
        prop_assert!(queue.dequeue().is_none());
    }

    /// INVARIANT: interleaved enqueue/dequeue still yields FIFO order
    #[test]
    fn record_queue_interleaved_fifo(ops in prop::collection::vec(any::<bool>(), 1..300)) {
        let mut queue = RecordQueue::new();
        let mut next_in = 0u64;
        let mut next_out = 0u64;
        for enqueue in ops {
            if enqueue {
                queue.enqueue(RecordEntry {
                    frame: tagged_frame(0),
                    timestamp: next_in.to_string(),
                });
                next_in += 1;
            } else if let Some(entry) = queue.dequeue() {
                prop_assert_eq!(entry.timestamp, next_out.to_string());
                next_out += 1;
            }
        }
        prop_assert_eq!(queue.depth() as u64, next_in - next_out);
    }

    /// INVARIANT: the display slot holds at most one value, the newest
    #[test]
    fn display_slot_keeps_latest(rates in prop::collection::vec(0.0f64..240.0, 1..50)) {
        let mut slot = DisplaySlot::new();
        for rate in &rates {
            slot.publish(DisplaySample {
                frame: tagged_frame(0),
                timestamp: Local::now(),
                rate: *rate,
            });
        }
        let taken = slot.take().expect("sample present");
        prop_assert_eq!(taken.rate, *rates.last().expect("non-empty"));
        prop_assert!(slot.take().is_none());
    }

    /// INVARIANT: evenly spaced arrivals give exactly the arrival rate, whatever the history length
    #[test]
    fn estimator_matches_even_cadence(
        count in 2usize..300,
        interval_ms in 1u64..200,
    ) {
        let mut estimator = RollingRateEstimator::new();
        let start = Instant::now();
        for i in 0..count as u64 {
            estimator.record(start + Duration::from_millis(i * interval_ms));
        }
        prop_assert!(estimator.len() <= RATE_WINDOW);
        let expected = 1000.0 / interval_ms as f64;
        prop_assert!((estimator.current_rate() - expected).abs() < 1e-6 * expected.max(1.0));
    }

    /// INVARIANT: the rate is never negative and zero below two samples
    #[test]
    fn estimator_non_negative(gaps in prop::collection::vec(0u64..500, 0..150)) {
        let mut estimator = RollingRateEstimator::new();
        let mut t = Instant::now();
        for gap in &gaps {
            t += Duration::from_millis(*gap);
            estimator.record(t);
        }
        let rate = estimator.current_rate();
        prop_assert!(rate >= 0.0);
        prop_assert!(rate.is_finite());
        if gaps.len() < 2 {
            prop_assert_eq!(rate, 0.0);
        }
    }

    /// INVARIANT: day-number timestamps are 10-decimal, newline-terminated and monotone
    #[test]
    fn day_number_format_is_fixed(secs in 0i64..4_000_000_000, extra_ms in 1i64..100_000) {
        let a = Utc.timestamp_opt(secs, 0).single().expect("valid");
        let b = a + chrono::Duration::milliseconds(extra_ms);
        let fa = format_day_number(&a);
        let fb = format_day_number(&b);

        prop_assert!(fa.ends_with('\n'));
        let digits = fa.trim_end().split('.').nth(1).expect("decimal point");
        prop_assert_eq!(digits.len(), 10);

        let va: f64 = fa.trim_end().parse().expect("number");
        let vb: f64 = fb.trim_end().parse().expect("number");
        prop_assert!(vb > va);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// INVARIANT: the raw recorder writes one sidecar line and one frame buffer per accepted frame
    #[test]
    fn raw_recorder_counts_match_files(frames in 0usize..20) {
        let dir = tempdir().expect("tempdir");
        let request = RecorderRequest {
            owner: "prop".to_string(),
            save_dir: dir.path().to_path_buf(),
            name: "prop".to_string(),
            file_index: 3,
            resolution: Resolution::new(4, 2),
            rate: 30.0,
            color_mode: ColorMode::Color,
        };
        let recorder = RawRecorder::new(&request).expect("open");
        for i in 0..frames {
            let frame = Frame::blank(4, 2, ColorMode::Color);
            recorder.write(&frame, &format!("{:.10}\n", i as f64)).expect("write");
        }
        prop_assert_eq!(recorder.write_count(), frames as u64);
        recorder.close().expect("close");

        let raw = std::fs::read(dir.path().join("prop_003.raw")).expect("raw file");
        prop_assert_eq!(raw.len(), frames * 4 * 2 * 3);
        let dat = std::fs::read_to_string(dir.path().join("prop_003.dat")).expect("dat file");
        prop_assert_eq!(dat.lines().count(), frames);
    }
}
