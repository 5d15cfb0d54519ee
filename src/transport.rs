use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::Error;

/// Abstract duplex byte transport the engine drives for every command. Generic rather
/// than trait-object based, so a test double costs nothing in the production path.
pub trait Transport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Error>;
    fn send(&mut self, buf: &[u8]) -> Result<usize, Error>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
    fn set_timeout(&mut self, millis: u64) -> Result<(), Error>;
    /// Forcibly tears down the connection without attempting a graceful shutdown.
    /// Called on every client-side fault.
    fn abort(&mut self);
    fn close(&mut self) -> Result<(), Error>;
}

/// The default transport: a plain blocking `TcpStream`.
pub struct TcpTransport {
    stream: Option<TcpStream>,
    timeout_millis: u64,
}

impl TcpTransport {
    pub fn new() -> Self {
        TcpTransport {
            stream: None,
            timeout_millis: 0,
        }
    }

    fn apply_timeout(&self, stream: &TcpStream) -> Result<(), Error> {
        let duration = if self.timeout_millis > 0 {
            Some(Duration::from_millis(self.timeout_millis))
        } else {
            None
        };
        stream.set_read_timeout(duration).map_err(|_| Error::SetoptError)?;
        stream.set_write_timeout(duration).map_err(|_| Error::SetoptError)?;
        Ok(())
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Error> {
        let mut addrs = (host, port).to_socket_addrs().map_err(|_| Error::BadAddress)?;
        let addr = addrs.next().ok_or(Error::BadAddress)?;

        let stream = if self.timeout_millis > 0 {
            TcpStream::connect_timeout(&addr, Duration::from_millis(self.timeout_millis))?
        } else {
            TcpStream::connect(addr)?
        };

        self.apply_timeout(&stream)?;
        let _ = stream.set_nodelay(true);

        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        Ok(stream.write(buf)?)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        Ok(stream.read(buf)?)
    }

    fn set_timeout(&mut self, millis: u64) -> Result<(), Error> {
        self.timeout_millis = millis;
        if let Some(stream) = &self.stream {
            self.apply_timeout(stream)?;
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    fn close(&mut self) -> Result<(), Error> {
        match self.stream.take() {
            Some(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                Ok(())
            }
            None => Err(Error::NotConnected),
        }
    }
}
