//! Line pump between the terminal and the server connection

use log::{debug, info};
use shared::{is_shutdown_sentinel, Keyword, EXIT_KEYWORD};
use std::io;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Why [`Client::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The server announced it is closing
    ServerClosed,
    /// The connection dropped without notice
    Disconnected,
    /// The user typed `exit`
    UserExit,
    /// Local input reached end of file
    InputClosed,
}

/// Text client connected to a game server.
pub struct Client<R, W> {
    server: Lines<BufReader<R>>,
    writer: W,
}

impl Client<OwnedReadHalf, OwnedWriteHalf> {
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", stream.peer_addr()?);

        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer))
    }
}

impl<R, W> Client<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            server: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        self.writer.flush().await
    }

    /// Prints every server line to `output` and forwards every `input` line
    /// to the server until one side ends.
    pub async fn run<I, O>(&mut self, input: I, mut output: O) -> io::Result<Exit>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut input = input.lines();

        loop {
            tokio::select! {
                line = self.server.next_line() => {
                    let Some(line) = line? else {
                        info!("Server closed the connection");
                        return Ok(Exit::Disconnected);
                    };
                    output.write_all(format!("{}\n", line).as_bytes()).await?;
                    output.flush().await?;
                    if is_shutdown_sentinel(&line) {
                        return Ok(Exit::ServerClosed);
                    }
                }
                line = input.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed, leaving");
                        self.send(EXIT_KEYWORD).await?;
                        return Ok(Exit::InputClosed);
                    };
                    self.send(&line).await?;
                    if Keyword::parse(&line) == Some(Keyword::Exit) {
                        return Ok(Exit::UserExit);
                    }
                }
            }
        }
    }

    /// Tells the server this client is leaving.
    pub async fn leave(&mut self) -> io::Result<()> {
        self.send(EXIT_KEYWORD).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, sink};
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_prints_until_sentinel() {
        let server = Builder::new()
            .read(b"Votre nom ?\n")
            .read(b"Le serveur va close\n")
            .build();
        let (_keep_open, input) = duplex(64);
        let mut output = Vec::new();

        let mut client = Client::new(server, sink());
        let exit = client.run(BufReader::new(input), &mut output).await.unwrap();

        assert_eq!(exit, Exit::ServerClosed);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Votre nom ?\nLe serveur va close\n"
        );
    }

    #[tokio::test]
    async fn test_forwards_input_until_exit() {
        let (_keep_open, server) = duplex(64);
        let writer = Builder::new().write(b"alice\n").write(b"EXIT\n").build();
        let input = Builder::new().read(b"alice\nEXIT\n").build();

        let mut client = Client::new(server, writer);
        let exit = client.run(BufReader::new(input), sink()).await.unwrap();
        assert_eq!(exit, Exit::UserExit);
    }

    #[tokio::test]
    async fn test_server_eof() {
        let server = Builder::new().read(b"Bienvenue bob !\n").build();
        let (_keep_open, input) = duplex(64);
        let mut output = Vec::new();

        let mut client = Client::new(server, sink());
        let exit = client.run(BufReader::new(input), &mut output).await.unwrap();

        assert_eq!(exit, Exit::Disconnected);
        assert_eq!(output, b"Bienvenue bob !\n");
    }

    #[tokio::test]
    async fn test_input_eof_sends_exit() {
        let (_keep_open, server) = duplex(64);
        let writer = Builder::new().write(b"exit\n").build();
        let input = Builder::new().build();

        let mut client = Client::new(server, writer);
        let exit = client.run(BufReader::new(input), sink()).await.unwrap();
        assert_eq!(exit, Exit::InputClosed);
    }
}
