#![forbid(unsafe_code)]

//! Cross-module properties of the engines and their helpers.

use std::time::Duration;

use idlefx_core::config::{Config, CurveColorMode, RainColor};
use idlefx_core::rng::RngSeed;
use idlefx_fx::drift::drift_position;
use idlefx_fx::{
    AnimationEngine, CurveParams, CurveSimulation, FxContext, RainParams, RainSimulation,
    effective_cap,
};
use idlefx_render::Canvas;
use proptest::prelude::*;

fn customized() -> Config {
    Config {
        color: RainColor::Cyan,
        speed: 40,
        rainbow: true,
        use_katakana: false,
        mystify_shapes: 5,
        mystify_complexity: 10,
        mystify_trail_length: 120,
        mystify_color_mode: CurveColorMode::Duo,
        mystify_fill: true,
        ..Config::default()
    }
}

#[test]
fn params_survive_settings_round_trip() {
    let config = customized();
    let text = config.to_json().unwrap();
    let loaded = Config::from_json(&text);
    assert_eq!(loaded, config);
    assert_eq!(RainParams::from_config(&loaded), RainParams::from_config(&config));
    assert_eq!(CurveParams::from_config(&loaded), CurveParams::from_config(&config));
    assert_eq!(CurveParams::from_config(&loaded).control_points(), 5);
}

#[test]
fn same_seed_same_frames() {
    let render = || {
        let mut sim = CurveSimulation::new(
            CurveParams::from_config(&customized()),
            30,
            10,
            RngSeed::Fixed(77).into_rng(),
        );
        let mut ctx = FxContext::first(0.05);
        for _ in 0..40 {
            sim.advance(&ctx).unwrap();
            ctx = ctx.next(0.05, 1.0);
        }
        let mut canvas = Canvas::new(30, 10);
        sim.render(&ctx, &mut canvas);
        let mut frame = idlefx_render::Frame::new(30, 10);
        canvas.compose_into(&mut frame);
        (0..10).map(|y| frame.row_text(y)).collect::<Vec<_>>()
    };
    assert_eq!(render(), render());
}

#[test]
fn rain_columns_never_lost_at_low_quality() {
    let mut sim = RainSimulation::new(
        RainParams::default(),
        50,
        20,
        RngSeed::Fixed(5).into_rng(),
    );
    let before = sim.columns().len();
    let mut ctx = FxContext::first(0.1);
    for _ in 0..200 {
        sim.advance(&ctx).unwrap();
        ctx = ctx.next(0.1, 0.1);
    }
    assert_eq!(sim.columns().len(), before);
}

proptest! {
    #[test]
    fn cap_has_floor_and_tracks_quality(length in 10usize..=200, q in 0.0f32..=1.0) {
        let cap = effective_cap(length, q);
        prop_assert!(cap >= 5);
        prop_assert!(cap >= length / 4);
        prop_assert!(cap <= length.max(5));
        prop_assert!(cap >= (length as f64 * f64::from(q)).floor() as usize);
    }

    #[test]
    fn cap_is_monotonic_in_quality(length in 10usize..=200, a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(effective_cap(length, lo) <= effective_cap(length, hi));
    }

    #[test]
    fn drift_cycle_closes(
        w in 1u16..300, h in 1u16..100,
        margin in 0u16..4,
        cycle in 1u64..1000,
    ) {
        let cycle = Duration::from_secs(cycle);
        let screen = (w, h);
        let block = (20, 3);
        prop_assert_eq!(
            drift_position(Duration::ZERO, cycle, screen, margin, block),
            drift_position(cycle, cycle, screen, margin, block)
        );
    }

    #[test]
    fn drift_quarter_midpoints_on_edges(w in 40u16..300, h in 10u16..100, margin in 0u16..4) {
        let cycle = Duration::from_secs(480);
        let block = (20u16, 3u16);
        let min = f32::from(margin);
        let max_x = f32::from(w) - 20.0 - min;
        let max_y = f32::from(h) - 3.0 - min;
        let at = |secs| drift_position(Duration::from_secs(secs), cycle, (w, h), margin, block);

        let (_, top) = at(60);
        let (right, _) = at(180);
        let (_, bottom) = at(300);
        let (left, _) = at(420);
        prop_assert!((top - min).abs() < 1e-4);
        prop_assert!((right - max_x.max(min)).abs() < 1e-4);
        prop_assert!((bottom - max_y.max(min)).abs() < 1e-4);
        prop_assert!((left - min).abs() < 1e-4);
    }

    #[test]
    fn curve_points_stay_on_screen(seed in any::<u64>(), q in 0.0f32..=1.0) {
        let mut sim = CurveSimulation::new(
            CurveParams { speed: 10.0, ..CurveParams::default() },
            20,
            8,
            RngSeed::Fixed(seed).into_rng(),
        );
        let mut ctx = FxContext::first(0.2);
        for _ in 0..50 {
            sim.advance(&ctx).unwrap();
            ctx = ctx.next(0.2, q);
        }
        for shape in sim.shapes() {
            prop_assert_eq!(shape.points.len(), shape.velocities.len());
            for p in &shape.points {
                prop_assert!((0.0..=40.0).contains(&p.x));
                prop_assert!((0.0..=32.0).contains(&p.y));
            }
        }
    }
}
