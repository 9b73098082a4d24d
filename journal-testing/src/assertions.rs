// Assertions over recorded events

use crate::RecordingListener;

/// Assert that `listener` handled exactly `expected`, in order
pub fn assert_received(listener: &RecordingListener, expected: &[&str]) {
    let actual = listener.contents();
    assert_eq!(
        actual, expected,
        "Expected listener to receive {:?}, got {:?}",
        expected, actual
    );
}

/// Assert that `listener` handled nothing
pub fn assert_not_received(listener: &RecordingListener) {
    let actual = listener.contents();
    assert!(
        actual.is_empty(),
        "Expected listener to receive nothing, got {:?}",
        actual
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_events::{Attributes, Event, Listener};

    #[test]
    fn test_assert_received() {
        let recorder = RecordingListener::new("/");
        assert_not_received(&recorder);

        let event = Event::new("/x", "g", "hello", Attributes::new());
        tokio_test::block_on(recorder.handle(&event)).unwrap();
        assert_received(&recorder, &["hello"]);
    }

    #[test]
    #[should_panic(expected = "Expected listener to receive nothing")]
    fn test_assert_not_received_panics() {
        let recorder = RecordingListener::new("/");
        let event = Event::new("/x", "g", "hello", Attributes::new());
        tokio_test::block_on(recorder.handle(&event)).unwrap();
        assert_not_received(&recorder);
    }
}
