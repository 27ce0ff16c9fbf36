use i2csniff_decode::{
    decode_all, BusScript, DecoderOptions, EdgeEvent, FrameState, I2cDecoder, Level, Line,
    Token, Transaction,
};

fn plain(events: &[EdgeEvent]) -> Vec<String> {
    decode_all(DecoderOptions::plain(), events)
        .iter()
        .map(Transaction::text)
        .collect()
}

#[test]
fn test_register_write() {
    let script = BusScript::default()
        .start()
        .byte(0xA6, true)
        .byte(0x32, true)
        .stop();
    assert_eq!(plain(script.events()), vec!["[A6+32+]"]);
}

#[test]
fn test_register_read_with_restart() {
    let script = BusScript::default()
        .start()
        .byte(0xA6, true)
        .byte(0x32, true)
        .stop()
        .idle(200)
        .start()
        .bytes(&[
            (0xA7, true),
            (0x01, true),
            (0xFF, true),
            (0xF2, true),
            (0xFF, true),
            (0x06, true),
            (0x00, false),
        ])
        .stop();
    assert_eq!(
        plain(script.events()),
        vec!["[A6+32+]", "[A7+01+FF+F2+FF+06+00-]"]
    );

    let restart = BusScript::default()
        .start()
        .byte(0xA6, true)
        .byte(0x32, true)
        .repeated_start()
        .byte(0xA7, true)
        .byte(0x99, false)
        .stop();
    assert_eq!(plain(restart.events()), vec!["[A6+32+[A7+99-]"]);
}

#[test]
fn test_round_trip_pairs() {
    let pairs: Vec<(u8, bool)> = (0..=255u8)
        .step_by(7)
        .enumerate()
        .map(|(i, b)| (b, i % 3 != 0))
        .collect();
    let script = BusScript::new(4, 17).start().bytes(&pairs).stop();
    let decoded = decode_all(DecoderOptions::plain(), script.events());
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].bytes(), pairs);
    assert!(decoded[0].is_clean());
}

#[test]
fn test_timestamp_and_baud_from_ticks() {
    let script = BusScript::new(5, 1_000_000)
        .start()
        .byte(0xA6, true)
        .byte(0x32, true)
        .stop();
    let events = script.events();
    let start = events[0].tick;
    let stop = events[events.len() - 1].tick;
    let scl_edges = events.iter().filter(|e| e.line == Line::Scl).count() as u64;
    let expected = 1_000_000 * (scl_edges / 2) / (u64::from(stop - start) + 1);

    let decoded = decode_all(DecoderOptions::default(), events);
    assert_eq!(decoded[0].start_tick, Some(start));
    assert_eq!(decoded[0].baud(), Some(expected));
    assert_eq!(
        decoded[0].text(),
        format!("  1.000: [A6+32+] baud={expected}")
    );
}

#[test]
fn test_gap_mid_byte_times_out() {
    let script = BusScript::default()
        .start()
        .bits(true, 1)
        .bits(false, 1)
        .bits(true, 1)
        .idle(5000)
        .stop();
    let decoded = decode_all(DecoderOptions::plain(), script.events());
    // the STOP's leading SDA edge trips the timeout; its rising edge then
    // lands on an idle bus as a stray STOP
    assert_eq!(decoded[0].text(), "[A0 !to");
    assert_eq!(decoded[0].tokens.last(), Some(&Token::Timeout));
    assert_eq!(decoded[1].text(), "]");
}

#[test]
fn test_scl_low_sda_noise() {
    let mut decoder = I2cDecoder::new(DecoderOptions::plain());
    let mut out = Vec::new();
    decoder.process(&EdgeEvent::new(Line::Scl, Level::Low, 0), &mut out);
    for i in 1..200u32 {
        let level = if i % 2 == 0 { Level::High } else { Level::Low };
        decoder.process(&EdgeEvent::new(Line::Sda, level, i * 37), &mut out);
    }
    assert!(out.is_empty());
    assert_eq!(decoder.state(), FrameState::Idle);
}

/// Deterministic xorshift so the sweep needs no extra crates.
struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}

#[test]
fn test_reachable_states_hold_invariants() {
    let mut rng = XorShift(0x1234_5678);
    let mut decoder = I2cDecoder::new(DecoderOptions::default());
    let mut out = Vec::new();
    let mut tick = 0u32;

    for _ in 0..200_000 {
        let r = rng.next();
        let line = if r & 1 == 0 { Line::Scl } else { Line::Sda };
        let level = match (r >> 1) % 9 {
            0 => Level::Invalid,
            n if n % 2 == 0 => Level::High,
            _ => Level::Low,
        };
        tick = tick.wrapping_add(match (r >> 8) % 100 {
            0 => 5000,
            n => n,
        });
        decoder.process(&EdgeEvent::new(line, level, tick), &mut out);

        let state = decoder.state();
        if let FrameState::Byte { bits, .. } = state {
            assert!(bits < 8);
        }
        if state.in_ack() {
            assert_eq!(state.bit_count(), 0);
        }
        assert_eq!(decoder.has_pending(), state.in_data());
    }

    assert!(!out.is_empty());
    for txn in &out {
        assert!(!txn.tokens.is_empty());
    }
}
