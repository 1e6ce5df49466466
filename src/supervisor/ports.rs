use std::{io, net::TcpListener};

/// Pick the port the server will be told to bind.
///
/// Probe-binds `preferred` on localhost and releases it immediately;
/// if that port is taken, asks the OS for an ephemeral one instead.
/// Another process may grab the port between release and the server's
/// own bind; the readiness probe surfaces that loss rather than this
/// function trying to hold the socket open.
pub(crate) fn allocate_port(preferred: u16) -> io::Result<u16> {
    match TcpListener::bind(("127.0.0.1", preferred)) {
        Ok(listener) => {
            drop(listener);
            Ok(preferred)
        }
        Err(_) => {
            let listener = TcpListener::bind(("127.0.0.1", 0))?;
            let port = listener.local_addr()?.port();
            drop(listener);
            Ok(port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_preferred_port_is_returned_as_is() -> io::Result<()> {
        // Grab an ephemeral port, release it, then ask for it as preferred.
        let probe = TcpListener::bind(("127.0.0.1", 0))?;
        let free_port = probe.local_addr()?.port();
        drop(probe);

        assert_eq!(allocate_port(free_port)?, free_port);
        Ok(())
    }

    #[test]
    fn bound_preferred_port_falls_back_to_another() -> io::Result<()> {
        let occupied = TcpListener::bind(("127.0.0.1", 0))?;
        let taken_port = occupied.local_addr()?.port();

        let allocated = allocate_port(taken_port)?;
        assert_ne!(allocated, taken_port);
        Ok(())
    }
}
