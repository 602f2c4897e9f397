//! Lifecycle callback, drop and sanity tests.

use std::sync::{Arc, Mutex};

use lazy_image_io::{
    copy, open, progress_enabled, registry, sanity, set_progress, BandFormat, Header, ImageError,
};

fn filled(name: &str) -> Arc<lazy_image_io::Image> {
    let image = open(name, "t").unwrap();
    image
        .set_pixels(Header::new(8, 40, 1, BandFormat::UChar), vec![3; 8 * 40])
        .unwrap();
    image
}

#[test]
fn test_eval_callbacks_fire_around_evaluation() {
    let input = filled("eval-input");
    let output = open("eval-output", "t").unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = |tag: &'static str| {
        let events = events.clone();
        move |_: &lazy_image_io::Image,
              status: &lazy_image_io::EvalStatus|
              -> Result<(), ImageError> {
            events.lock().unwrap().push((tag, status.percent));
            Ok(())
        }
    };
    output.add_evalstart_callback(log("start"));
    output.add_eval_callback(log("eval"));
    output.add_evalend_callback(log("end"));

    copy(&input, &output).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&("start", 0)));
    assert_eq!(events.last(), Some(&("end", 100)));
    assert_eq!(events.iter().filter(|(t, _)| *t == "start").count(), 1);
    assert_eq!(events.iter().filter(|(t, _)| *t == "end").count(), 1);
    assert!(events.iter().any(|(t, _)| *t == "eval"));
}

#[test]
fn test_close_runs_preclose_then_close_and_returns_first_error() {
    let image = open("close-order", "p").unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = order.clone();
    image.add_close_callback(move |_| {
        o.lock().unwrap().push("close-1");
        Err(ImageError::InvalidArgument("first".to_string()))
    });
    let o = order.clone();
    image.add_close_callback(move |_| {
        o.lock().unwrap().push("close-2");
        Err(ImageError::InvalidArgument("second".to_string()))
    });
    let o = order.clone();
    image.add_preclose_callback(move |image| {
        assert!(!image.is_closed());
        o.lock().unwrap().push("preclose");
        Ok(())
    });

    let err = image.close().unwrap_err();
    assert_eq!(err.to_string(), "first");
    assert_eq!(*order.lock().unwrap(), vec!["preclose", "close-1", "close-2"]);

    // Already closed: nothing fires again
    assert!(image.close().is_ok());
    assert_eq!(order.lock().unwrap().len(), 3);
}

#[test]
fn test_drop_closes_the_handle() {
    let fired = Arc::new(Mutex::new(false));
    let image = open("dropped", "p").unwrap();
    let id = image.id();
    let f = fired.clone();
    image.add_close_callback(move |_| {
        *f.lock().unwrap() = true;
        Ok(())
    });

    assert!(registry::is_open(id));
    drop(image);
    assert!(!registry::is_open(id));
    assert!(*fired.lock().unwrap());
}

#[test]
fn test_sanity_follows_the_lifecycle() {
    let image = filled("sanity-lifecycle");
    assert_eq!(sanity::check(Some(&image)), None);
    image.close().unwrap();
    assert_eq!(sanity::check(Some(&image)), Some("not on open image list"));
    assert_eq!(sanity::check(None), Some("NULL descriptor"));
}

#[test]
fn test_progress_flag() {
    let before = progress_enabled();
    set_progress(true);
    assert!(progress_enabled());
    set_progress(before);
}
