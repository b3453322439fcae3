//! End-to-end behaviour of the public API over a scripted transport.

use std::sync::{Arc, Once};

use ds9_xpa::{Error, GetOutcome, SetOutcome, StubTransport, Xpa};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn connector() -> (Arc<StubTransport>, Xpa<Arc<StubTransport>>) {
    init_tracing();
    let stub = Arc::new(StubTransport::new());
    (Arc::clone(&stub), Xpa::with_transport(stub))
}

#[test]
fn frame_query_returns_payload() -> anyhow::Result<()> {
    let (stub, xpa) = connector();
    stub.push_get(GetOutcome::payload("1"));

    assert_eq!(xpa.get(None, "ds9", "frame 1", "")?, "1");
    assert_eq!(stub.open_count(), 1);
    Ok(())
}

#[test]
fn reset_without_acquire_is_noop() {
    let (stub, xpa) = connector();
    xpa.reset();

    assert_eq!(stub.open_count(), 0);
    assert_eq!(stub.close_count(), 0);
}

#[test]
fn acquire_is_stable_until_reset() -> anyhow::Result<()> {
    let (stub, xpa) = connector();

    let first = xpa.acquire()?;
    assert_eq!(xpa.acquire()?, first);

    xpa.reset();
    let second = xpa.acquire()?;
    assert_ne!(second, first);
    assert!(!stub.is_live(first));

    xpa.reset();
    let third = xpa.acquire()?;
    assert!(![first, second].contains(&third));
    Ok(())
}

#[test]
fn outcomes_map_to_contract() {
    let (stub, xpa) = connector();
    stub.push_get(GetOutcome::no_match());
    stub.push_get(GetOutcome::error("XPA$ERROR unknown command"));
    stub.push_get(GetOutcome::empty());
    stub.push_set(SetOutcome::ok());
    stub.push_set(SetOutcome::error("XPA$ERROR bad zoom"));
    stub.push_set(SetOutcome::no_match());

    assert!(matches!(
        xpa.get(None, "ds9", "frame", ""),
        Err(Error::NoResponse { .. })
    ));
    assert_eq!(
        xpa.get(None, "ds9", "frob", "").unwrap(),
        "XPA$ERROR unknown command"
    );
    assert!(matches!(
        xpa.get(None, "ds9", "frame", ""),
        Err(Error::EmptyResponse { .. })
    ));

    assert_eq!(xpa.set(None, "ds9", "zoom to 2", "", b"", None).unwrap(), "");
    assert_eq!(
        xpa.set(None, "ds9", "zoom to x", "", b"", None).unwrap(),
        "XPA$ERROR bad zoom"
    );
    let err = xpa.set(None, "ds9", "zoom to 2", "", b"", None).unwrap_err();
    assert!(err.is_transport_error());

    // One shared handle served every request.
    assert_eq!(stub.open_count(), 1);
}

#[test]
fn dropping_connector_closes_shared_handle_once() -> anyhow::Result<()> {
    let (stub, xpa) = connector();
    let handle = xpa.acquire()?;
    drop(xpa);

    assert_eq!(stub.closed(), vec![handle]);
    Ok(())
}
