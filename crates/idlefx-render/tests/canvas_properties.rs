#![forbid(unsafe_code)]

//! Property tests for canvas composition and presentation.

use idlefx_render::diff::FrameDiff;
use idlefx_render::{Canvas, Frame, Presenter, Rgba, Surface};
use proptest::prelude::*;

proptest! {
    #[test]
    fn every_lit_dot_shows_in_its_cell(
        w in 1u16..20,
        h in 1u16..10,
        dots in proptest::collection::vec((0i32..40, 0i32..40), 1..50),
    ) {
        let mut canvas = Canvas::new(w, h);
        let (dw, dh) = canvas.dot_size();
        for &(x, y) in &dots {
            canvas.put_dot(x, y, Rgba::WHITE);
        }
        let mut frame = Frame::new(w, h);
        canvas.compose_into(&mut frame);

        for &(x, y) in &dots {
            if x < dw && y < dh {
                let cell = frame.get((x / 2) as u16, (y / 4) as u16);
                prop_assert!(cell.is_some_and(|c| !c.is_empty()));
            }
        }
    }

    #[test]
    fn lines_stay_inside_canvas(
        x0 in -50i32..50, y0 in -50i32..50,
        x1 in -50i32..50, y1 in -50i32..50,
    ) {
        let mut canvas = Canvas::new(8, 4);
        canvas.line(x0, y0, x1, y1, Rgba::WHITE);
        let mut frame = Frame::new(8, 4);
        canvas.compose_into(&mut frame);
        prop_assert_eq!((frame.width(), frame.height()), (8, 4));
    }

    #[test]
    fn presenting_twice_writes_nothing_new(text in "[a-z]{0,12}") {
        let mut canvas = Canvas::new(12, 2);
        canvas.put_text(0, 0, &text, Rgba::rgb(0, 255, 0), Default::default());
        let mut frame = Frame::new(12, 2);
        canvas.compose_into(&mut frame);

        let mut presenter = Presenter::new(Vec::new()).without_sync();
        presenter.present(&frame).unwrap();
        prop_assert_eq!(presenter.present(&frame).unwrap().cells, 0);
        prop_assert!(FrameDiff::compute(&frame, &frame.clone()).is_empty());
    }
}
