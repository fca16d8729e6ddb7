//! DCC SEND: file transfer with ACK-paced upload and resumable download.

use std::io::SeekFrom;
use std::net::Ipv4Addr;

use ircproto::User;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::dcc::{DccBase, DccError, DccKind};
use crate::id::DccId;

const SPEED_SAMPLES: usize = 10;

/// The three roles a `DccSend` can play (spec.md §4.5): `Listen` is the
/// advertising half of an upload before a peer connects, `Upload` is us
/// sending, `Download` is us receiving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendType {
    Listen,
    Upload,
    Download,
}

/// The `DCC RESUME`/`DCC ACCEPT` handshake state for a download that asked
/// to resume a partial local file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumeData {
    pub address: Ipv4Addr,
    pub port: u16,
    pub file_name: String,
    pub resume_file_size: u64,
}

/// A DCC SEND connection: either side of a file transfer.
pub struct DccSend {
    pub base: DccBase,
    pub send_type: SendType,
    pub file_path: String,
    pub file_size: u64,
    pub bytes_transferred: u64,
    /// The last 4-byte big-endian ACK value received (cumulative bytes), and
    /// how many ACK packets have arrived since the last send — mirrors
    /// `original_source/client/dcc_send_connection.hpp`'s `iAck`/`iAckReceived`.
    last_ack: u32,
    acks_pending: usize,
    speed_samples: [u64; SPEED_SAMPLES],
    speed_counter: usize,
    last_bytes_transferred: u64,
    pub resume_data: Option<ResumeData>,
    stream: Option<TcpStream>,
    listener: Option<TcpListener>,
    file: Option<File>,
}

impl DccSend {
    pub fn new(
        id: DccId,
        send_type: SendType,
        name: String,
        local_user: User,
        remote_user: User,
        file_path: String,
        file_size: u64,
    ) -> DccSend {
        DccSend {
            base: DccBase::new(id, DccKind::Send, name, local_user, remote_user),
            send_type,
            file_path,
            file_size,
            bytes_transferred: 0,
            last_ack: 0,
            acks_pending: 0,
            speed_samples: [0; SPEED_SAMPLES],
            speed_counter: 0,
            last_bytes_transferred: 0,
            resume_data: None,
            stream: None,
            listener: None,
            file: None,
        }
    }

    /// Opens a listener on the first free port in `base..=base + span`,
    /// returning the port chosen so the caller can advertise it in the CTCP
    /// `DCC SEND` offer.
    pub async fn listen(&mut self, bind_addr: Ipv4Addr, base_port: u16, span: u16) -> Result<u16, DccError> {
        for port in base_port..=base_port.saturating_add(span) {
            let addr = std::net::SocketAddr::from((bind_addr, port));
            if let Ok(listener) = TcpListener::bind(addr).await {
                self.listener = Some(listener);
                return Ok(port);
            }
        }
        Err(DccError::ConnectFailed(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "no free DCC port in configured range",
        )))
    }

    /// Accepts the peer connection on our listener (Upload/Listen role).
    pub async fn accept(&mut self) -> Result<(), DccError> {
        let listener = self.listener.as_ref().ok_or_else(|| {
            DccError::ConnectFailed(std::io::Error::new(std::io::ErrorKind::NotConnected, "no listener"))
        })?;
        let (stream, _) = listener.accept().await.map_err(DccError::ConnectFailed)?;
        self.stream = Some(stream);
        self.base.ready = true;
        Ok(())
    }

    /// Connects out to a peer's offer (Download role).
    pub async fn connect(&mut self, addr: Ipv4Addr, port: u16) -> Result<(), DccError> {
        let stream = TcpStream::connect((addr, port)).await.map_err(DccError::ConnectFailed)?;
        self.stream = Some(stream);
        self.base.ready = true;
        Ok(())
    }

    /// Opens the local file for this transfer: read-only for an upload,
    /// create/append for a download depending on whether a resume offset was
    /// negotiated.
    pub async fn open_file(&mut self) -> Result<(), DccError> {
        let file = match self.send_type {
            SendType::Upload | SendType::Listen => {
                tokio::fs::File::open(&self.file_path).await.map_err(DccError::FileIo)?
            }
            SendType::Download => {
                let mut options = tokio::fs::OpenOptions::new();
                options.write(true).create(true);
                if self.resume_data.is_some() {
                    options.append(true);
                } else {
                    options.truncate(true);
                }
                let mut file = options.open(&self.file_path).await.map_err(DccError::FileIo)?;
                if let Some(resume) = &self.resume_data {
                    file.seek(SeekFrom::Start(resume.resume_file_size))
                        .await
                        .map_err(DccError::FileIo)?;
                    self.bytes_transferred = resume.resume_file_size;
                    self.last_bytes_transferred = resume.resume_file_size;
                }
                file
            }
        };
        self.file = Some(file);
        Ok(())
    }

    /// Sends the next packet in the upload, waiting for the prior packet's
    /// ACK first unless fast-send (stream-pipelining) is requested.
    pub async fn send_next_packet(&mut self, packet_size: usize, fast_send: bool) -> Result<usize, DccError> {
        if !fast_send {
            self.wait_for_ack().await?;
        }
        let remaining = self.file_size - self.bytes_transferred;
        let to_read = remaining.min(packet_size as u64) as usize;
        if to_read == 0 {
            return Ok(0);
        }
        let mut buf = vec![0u8; to_read];
        let file = self.file.as_mut().ok_or_else(|| {
            DccError::FileIo(std::io::Error::new(std::io::ErrorKind::NotFound, "file not open"))
        })?;
        file.read_exact(&mut buf).await.map_err(DccError::FileIo)?;
        let stream = self.stream.as_mut().ok_or_else(|| {
            DccError::ConnectFailed(std::io::Error::new(std::io::ErrorKind::NotConnected, "no stream"))
        })?;
        stream.write_all(&buf).await.map_err(DccError::ConnectFailed)?;
        self.bytes_transferred += to_read as u64;
        self.acks_pending += 1;
        Ok(to_read)
    }

    async fn wait_for_ack(&mut self) -> Result<(), DccError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            DccError::ConnectFailed(std::io::Error::new(std::io::ErrorKind::NotConnected, "no stream"))
        })?;
        let mut ack_buf = [0u8; 4];
        stream.read_exact(&mut ack_buf).await.map_err(DccError::ConnectFailed)?;
        self.record_ack(u32::from_be_bytes(ack_buf));
        Ok(())
    }

    /// Records an ACK value received from the peer (4-byte big-endian
    /// cumulative byte count, per spec.md §6).
    pub fn record_ack(&mut self, ack: u32) {
        self.last_ack = ack;
        self.acks_pending = self.acks_pending.saturating_sub(1);
    }

    /// Receives one packet during a download, writing it to disk and sending
    /// our own cumulative-byte ACK back.
    pub async fn receive_packet(&mut self, packet_size: usize) -> Result<usize, DccError> {
        let remaining = self.file_size.saturating_sub(self.bytes_transferred);
        let to_read = remaining.min(packet_size as u64) as usize;
        if to_read == 0 {
            return Ok(0);
        }
        let mut buf = vec![0u8; to_read];
        let stream = self.stream.as_mut().ok_or_else(|| {
            DccError::ConnectFailed(std::io::Error::new(std::io::ErrorKind::NotConnected, "no stream"))
        })?;
        stream.read_exact(&mut buf).await.map_err(DccError::ConnectFailed)?;
        let file = self.file.as_mut().ok_or_else(|| {
            DccError::FileIo(std::io::Error::new(std::io::ErrorKind::NotFound, "file not open"))
        })?;
        file.write_all(&buf).await.map_err(DccError::FileIo)?;
        self.bytes_transferred += to_read as u64;

        let ack = (self.bytes_transferred as u32).to_be_bytes();
        stream.write_all(&ack).await.map_err(DccError::ConnectFailed)?;
        Ok(to_read)
    }

    /// Samples current throughput: called once a second by the owning
    /// connection manager's speed-gun timer (`original_source`'s
    /// `speed_gun`, firing every 1000ms).
    pub fn tick_speed_sample(&mut self) {
        let delta = self.bytes_transferred - self.last_bytes_transferred;
        if self.speed_counter == 0 {
            self.speed_samples = [delta; SPEED_SAMPLES];
        } else {
            self.speed_samples[self.speed_counter % SPEED_SAMPLES] = delta;
        }
        self.speed_counter += 1;
        self.last_bytes_transferred = self.bytes_transferred;
    }

    /// Current or average transfer speed in bytes/sec, over the last
    /// [`SPEED_SAMPLES`] one-second samples.
    pub fn speed(&self, average: bool) -> u64 {
        if self.speed_counter == 0 {
            return 0;
        }
        if !average {
            return self.speed_samples[(self.speed_counter - 1) % SPEED_SAMPLES];
        }
        let total: u64 = self.speed_samples.iter().sum();
        total / SPEED_SAMPLES as u64
    }

    /// Whether the transfer has finished: every byte has been moved, and for
    /// an upload the peer's final ACK has confirmed receipt of all of it.
    pub fn complete(&self) -> bool {
        self.bytes_transferred == self.file_size
            && (self.send_type != SendType::Upload || (self.acks_pending == 0 && self.last_ack as u64 == self.bytes_transferred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_stub(send_type: SendType, file_size: u64) -> DccSend {
        DccSend::new(
            DccId(1),
            send_type,
            "foo.bin".into(),
            User::new("me", "m", "h", Default::default()),
            User::new("peer", "p", "h", Default::default()),
            "foo.bin".into(),
            file_size,
        )
    }

    #[test]
    fn upload_incomplete_until_final_ack_matches() {
        let mut dcc = send_stub(SendType::Upload, 1000);
        dcc.bytes_transferred = 1000;
        dcc.acks_pending = 1;
        assert!(!dcc.complete());
        dcc.record_ack(1000);
        assert!(dcc.complete());
    }

    #[test]
    fn download_completes_on_bytes_alone() {
        let mut dcc = send_stub(SendType::Download, 1000);
        dcc.bytes_transferred = 1000;
        assert!(dcc.complete());
    }

    #[test]
    fn speed_sample_first_tick_fills_ring() {
        let mut dcc = send_stub(SendType::Upload, 10_000);
        dcc.bytes_transferred = 500;
        dcc.tick_speed_sample();
        assert_eq!(dcc.speed(false), 500);
        assert_eq!(dcc.speed(true), 500);
    }

    #[test]
    fn speed_sample_average_mixes_recent_and_old() {
        let mut dcc = send_stub(SendType::Upload, 10_000);
        for delta in [100, 200, 300] {
            dcc.bytes_transferred += delta;
            dcc.tick_speed_sample();
        }
        assert_eq!(dcc.speed(false), 300);
        assert!(dcc.speed(true) > 0);
    }
}
