//! Audio exchange integration tests
//!
//! Caller buffers in, plugin channels out, and the buffer's lifetime across
//! block size changes.

use crate::helpers::mock_plugin::{passthrough, PROCESS};
use crate::helpers::*;
use vsthost::abi::opcode;
use vsthost::LifecycleState;

#[test]
fn test_passthrough_copies_each_channel() {
    let (session, _mock) = host(MockSpec {
        output: passthrough,
        ..MockSpec::default()
    });
    let left = constant(0.3, TEST_BLOCK_SIZE);
    let right = constant(-0.6, TEST_BLOCK_SIZE);
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    session.process_replacing(
        Some(&[&left[..], &right[..]][..]),
        &mut as_channels(&mut outputs),
        TEST_BLOCK_SIZE,
    );

    assert_signals_eq(&outputs[0], &left, FLOAT_EPSILON);
    assert_signals_eq(&outputs[1], &right, FLOAT_EPSILON);
}

#[test]
fn test_missing_inputs_feed_silence() {
    let (session, mock) = host(MockSpec::default());
    let loud = constant(0.8, TEST_BLOCK_SIZE);
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    session.process_replacing(
        Some(&[&loud[..], &loud[..]][..]),
        &mut as_channels(&mut outputs),
        0,
    );
    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    let state = mock.state();
    assert_eq!(state.process_calls.len(), 2);
    assert!(state.process_calls[0].inputs.iter().all(|ch| ch.iter().all(|&s| s == 0.8)));
    assert!(state.process_calls[1].inputs.iter().all(|ch| is_silent(ch)));
}

#[test]
fn test_short_and_absent_input_channels_are_zero_filled() {
    let (session, mock) = host(MockSpec::default());
    let short = constant(0.5, 10);
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    session.process_replacing(Some(&[&short[..]][..]), &mut as_channels(&mut outputs), 0);

    let state = mock.state();
    let seen = &state.process_calls[0].inputs;
    assert!(seen[0][..10].iter().all(|&s| s == 0.5));
    assert!(is_silent(&seen[0][10..]));
    assert!(is_silent(&seen[1]));
}

#[test]
fn test_single_buffer_receives_stereo_downmix() {
    let (session, _mock) = host(MockSpec::default());
    let mut outputs = output_buffers(1, TEST_BLOCK_SIZE);

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    // Channels 0 and 1 carry 0.25 and 0.5.
    assert_signals_eq(
        &outputs[0],
        &constant(0.375, TEST_BLOCK_SIZE),
        FLOAT_EPSILON,
    );
}

#[test]
fn test_extra_buffers_duplicate_or_clear() {
    let (session, _mock) = host(MockSpec {
        inputs: 0,
        outputs: 1,
        ..MockSpec::default()
    });
    let mut outputs = vec![constant(9.0, TEST_BLOCK_SIZE); 3];

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    assert_signals_eq(&outputs[0], &constant(0.25, TEST_BLOCK_SIZE), FLOAT_EPSILON);
    assert_signals_eq(&outputs[1], &outputs[0], FLOAT_EPSILON);
    assert!(is_silent(&outputs[2]));
}

#[test]
fn test_duplicate_leaves_longer_tail_untouched() {
    let (session, _mock) = host(MockSpec {
        outputs: 1,
        ..MockSpec::default()
    });
    let mut outputs = vec![
        constant(9.0, TEST_BLOCK_SIZE),
        constant(9.0, TEST_BLOCK_SIZE + 16),
    ];

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    assert!(outputs[1][..TEST_BLOCK_SIZE].iter().all(|&s| s == 0.25));
    assert!(outputs[1][TEST_BLOCK_SIZE..].iter().all(|&s| s == 9.0));
}

#[test]
fn test_surplus_plugin_outputs_are_dropped() {
    let (session, _mock) = host(MockSpec {
        outputs: 4,
        ..MockSpec::default()
    });
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    assert!(outputs[0].iter().all(|&s| s == 0.25));
    assert!(outputs[1].iter().all(|&s| s == 0.5));
}

#[test]
fn test_frame_count_is_clamped_to_block() {
    let (session, mock) = host(MockSpec::default());
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    for frames in [0, 16, TEST_BLOCK_SIZE, 10 * TEST_BLOCK_SIZE] {
        session.process_replacing(None, &mut as_channels(&mut outputs), frames);
    }

    let frames: Vec<usize> = mock.state().process_calls.iter().map(|c| c.frames).collect();
    assert_eq!(frames, [TEST_BLOCK_SIZE, 16, TEST_BLOCK_SIZE, TEST_BLOCK_SIZE]);
}

/// Runs a 16-frame block. The plugin writes only those frames, so the rest
/// of the returned block is whatever the exchange buffer already held.
fn short_block(session: &vsthost::Session, outputs: &mut [Vec<f32>]) {
    for channel in outputs.iter_mut() {
        channel.fill(0.0);
    }
    session.process_replacing(None, &mut as_channels(outputs), 16);
}

#[test]
fn test_buffer_is_rebuilt_only_when_block_size_changes() {
    let (session, mock) = host(MockSpec::default());
    let mut outputs = output_buffers(2, 2 * TEST_BLOCK_SIZE);

    // Fill the whole block once; later short blocks show whether it survived.
    session.process_replacing(None, &mut as_channels(&mut outputs), 0);
    short_block(&session, &mut outputs);
    assert!(outputs[0][16..TEST_BLOCK_SIZE].iter().all(|&s| s == 0.25));

    session.set_block_size(TEST_BLOCK_SIZE);
    short_block(&session, &mut outputs);
    assert!(outputs[0][16..TEST_BLOCK_SIZE].iter().all(|&s| s == 0.25));

    session.set_block_size(2 * TEST_BLOCK_SIZE);
    short_block(&session, &mut outputs);
    assert!(outputs[0][..16].iter().all(|&s| s == 0.25));
    assert!(is_silent(&outputs[0][16..]));
    assert_eq!(session.block_size(), 2 * TEST_BLOCK_SIZE);

    // The plugin hears about every call, changed or not.
    assert_eq!(mock.count(opcode::SET_BLOCK_SIZE), 2);
    assert_eq!(mock.state().block_size, 2 * TEST_BLOCK_SIZE as isize);
}

#[test]
fn test_block_size_change_discards_previous_samples() {
    let (session, _mock) = host(MockSpec::default());
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);
    session.set_block_size(32);
    session.set_block_size(TEST_BLOCK_SIZE);
    short_block(&session, &mut outputs);

    assert!(outputs[1][..16].iter().all(|&s| s == 0.5));
    assert!(is_silent(&outputs[1][16..]));
}

#[test]
fn test_zero_block_size_becomes_one_frame() {
    let (session, mock) = host(MockSpec::default());
    session.set_block_size(0);
    assert_eq!(session.block_size(), 1);
    assert_eq!(mock.state().block_size, 1);
}

#[test]
fn test_first_block_starts_processing() {
    let (session, mock) = host(MockSpec::default());
    let mut outputs = output_buffers(2, TEST_BLOCK_SIZE);
    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    assert_eq!(session.state(), LifecycleState::Processing);
    let opcodes = mock.opcodes();
    let start = opcodes.iter().position(|&op| op == opcode::START_PROCESS);
    let process = opcodes.iter().position(|&op| op == PROCESS);
    assert!(start.is_some());
    assert!(start < process);
}

#[test]
fn test_plugin_without_replacing_is_left_alone() {
    let (session, mock) = host(MockSpec {
        process_replacing: false,
        ..MockSpec::default()
    });
    let mut outputs = vec![constant(7.0, TEST_BLOCK_SIZE); 2];

    session.process_replacing(None, &mut as_channels(&mut outputs), 0);

    assert!(outputs.iter().flatten().all(|&s| s == 7.0));
    assert_eq!(mock.count(opcode::START_PROCESS), 0);
    assert!(mock.state().process_calls.is_empty());
}
