//! Property-based tests: error classification consistency.

use murmur_types::*;
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #[test]
    fn http_retryable_iff_throttled_or_server_error(status in 100u16..600, body in ".*") {
        let err = ChatError::Http { status, body: body.clone() };
        let expected = status == 429 || (500..=599).contains(&status);
        prop_assert_eq!(err.is_retryable(), expected);
        prop_assert_eq!(err.status(), Some(status));
        let display = err.to_string();
        prop_assert!(display.contains(&status.to_string()));
        prop_assert!(display.contains(body.as_str()));
    }

    #[test]
    fn stream_error_retryability_survives_conversion(millis in 0u64..60_000, msg in ".*") {
        for err in [
            StreamError::transport(msg.clone()),
            StreamError::timeout(Duration::from_millis(millis)),
            StreamError::cancelled(),
        ] {
            let retryable = err.is_retryable();
            let chat: ChatError = err.into();
            prop_assert_eq!(chat.is_retryable(), retryable);
        }
    }
}
