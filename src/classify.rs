//! Maps transport-level failures onto the crate's error taxonomy.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use crate::errors::{BoxError, Error};

const DNS_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
];

/// Classifies a failure reported by a transport.
///
/// `timeout` is the budget the request ran under, if any; it is reported back
/// when the transport itself gave up on time.
pub fn classify(err: BoxError, timeout: Option<Duration>) -> Error {
    if is_timeout(&*err) {
        return Error::Timeout(timeout);
    }
    if is_network_unavailable(&*err) {
        return Error::NetworkUnavailable(err);
    }
    Error::Transport(err)
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    chain(err).any(|e| {
        e.downcast_ref::<reqwest::Error>()
            .is_some_and(reqwest::Error::is_timeout)
            || e.is::<tokio::time::error::Elapsed>()
            || e
                .downcast_ref::<io::Error>()
                .is_some_and(|io| io.kind() == io::ErrorKind::TimedOut)
    })
}

fn is_network_unavailable(err: &(dyn StdError + 'static)) -> bool {
    chain(err).any(|e| {
        if e.downcast_ref::<reqwest::Error>()
            .is_some_and(reqwest::Error::is_connect)
        {
            return true;
        }
        if let Some(io) = e.downcast_ref::<io::Error>()
            && matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::HostUnreachable
            )
        {
            return true;
        }
        let text = e.to_string().to_ascii_lowercase();
        DNS_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "client failure")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn connection_refused_is_network_unavailable() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let classified = classify(Box::new(err), Some(Duration::from_secs(1)));
        assert!(matches!(classified, Error::NetworkUnavailable(_)));
    }

    #[test]
    fn nested_dns_failure_is_network_unavailable() {
        let err = Wrapped(io::Error::other("dns error: failed to lookup address information"));
        let classified = classify(Box::new(err), Some(Duration::from_secs(1)));
        assert!(matches!(classified, Error::NetworkUnavailable(_)));
    }

    #[test]
    fn timed_out_io_error_is_timeout() {
        let err = Wrapped(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        match classify(Box::new(err), Some(Duration::from_millis(250))) {
            Error::Timeout(after) => assert_eq!(after, Some(Duration::from_millis(250))),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn transport_timeout_without_a_budget_reports_none() {
        let err = Wrapped(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        let classified = classify(Box::new(err), None);
        assert!(matches!(classified, Error::Timeout(None)));
        assert_eq!(classified.to_string(), "request timed out");
        assert_eq!(
            Error::Timeout(Some(Duration::from_millis(250))).to_string(),
            "request timed out after 250ms"
        );
    }

    #[test]
    fn other_failures_keep_their_cause() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "garbled frame");
        let classified = classify(Box::new(err), Some(Duration::from_secs(1)));
        match &classified {
            Error::Transport(cause) => {
                let io = cause
                    .downcast_ref::<io::Error>()
                    .expect("original error retained");
                assert_eq!(io.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        assert!(StdError::source(&classified).is_some());
    }
}
