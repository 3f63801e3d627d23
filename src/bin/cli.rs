//! respkv command-line client.
//!
//! Sets a key (unless `--get-only`) and reads it back, logging each reply.
//!
//! ```text
//! respkv-cli --key-val name:Ariz
//! respkv-cli --key-val name --get-only
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use respkv::config::{log_filter, ClientConfig};
use respkv::protocol::{Decoder, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info};

const DEFAULT_KEY: &str = "key";
const DEFAULT_VALUE: &str = "my_super_long_value";

/// Splits `key:val` at the first colon. Both sides must be non-empty.
fn split_key_val(key_val: &str) -> Option<(&str, &str)> {
    match key_val.split_once(':') {
        Some((key, val)) if !key.is_empty() && !val.is_empty() => Some((key, val)),
        _ => None,
    }
}

fn encode_command(parts: &[&str]) -> Vec<u8> {
    Value::Array(
        parts
            .iter()
            .map(|part| Value::bulk_string(part.to_string()))
            .collect(),
    )
    .serialize()
}

struct Client {
    decoder: Decoder<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .with_context(|| format!("failed to connect to {}", address))?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            decoder: Decoder::new(reader),
            writer,
        })
    }

    async fn call(&mut self, parts: &[&str]) -> anyhow::Result<Value> {
        self.writer.write_all(&encode_command(parts)).await?;
        match self.decoder.decode_next().await? {
            Some(Value::Error(message)) => bail!("server error: {}", message),
            Some(reply) => Ok(reply),
            None => bail!("server closed the connection"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.log_level))
        .with_target(false)
        .init();

    let mut client = Client::connect(&config.bind_address()).await?;

    let key = if config.get_only {
        config.key_val.clone().unwrap_or_default()
    } else {
        let (key, val) = config
            .key_val
            .as_deref()
            .and_then(split_key_val)
            .unwrap_or((DEFAULT_KEY, DEFAULT_VALUE));

        debug!("SET: {}:{}", key, val);
        client.call(&["SET", key, val]).await?;
        key.to_string()
    };

    let reply = client.call(&["GET", &key]).await?;
    info!("RESPONSE: {}", reply);
    println!("{}", reply);

    client.call(&["QUIT"]).await?;
    Ok(())
}
