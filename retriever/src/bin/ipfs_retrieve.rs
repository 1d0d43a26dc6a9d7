use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use cid_codec::{ContentCodec, ContentIdentifier, NativeAddress, decode, encode, encode_v1};
use clap::{Args, Parser, Subcommand};
use document::Schema;
use retriever::Retriever;
use retriever::logging::init_logging;
use retriever_config::{ApiFlavor, RetrieverConfig};
use serde_json::json;

#[derive(Parser)]
#[clap(name = "ipfs-retrieve", version, about = "Retrieve JSON documents from content-addressed storage")]
struct RetrieveCommand {
    #[clap(flatten)]
    overrides: CliOverrides,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CliOverrides {
    /// Storage network endpoint; `local://<path>` reads a directory store.
    #[clap(long, global = true)]
    endpoint: Option<String>, // if not specified we use env:IPFS_RETRIEVER_CLIENT_ENDPOINT
    /// HTTP interface of the endpoint: "gateway" or "rpc".
    #[clap(long, global = true)]
    api: Option<ApiFlavor>,
    /// Retries after the first attempt on transient failures.
    #[clap(long, global = true)]
    max_retries: Option<usize>,
    /// Timeout for a single attempt, e.g. "5s" or "500ms".
    #[clap(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
    /// Deadline for the whole retrieval across all attempts.
    #[clap(long, global = true, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,
}

impl CliOverrides {
    fn apply(self, config: &mut RetrieverConfig) {
        if let Some(endpoint) = self.endpoint {
            config.client.endpoint = endpoint;
        }
        if let Some(api) = self.api {
            config.client.api = api;
        }
        if let Some(max_retries) = self.max_retries {
            config.client.max_retries = max_retries;
        }
        if let Some(timeout) = self.timeout {
            config.client.attempt_timeout = timeout;
        }
        if let Some(deadline) = self.deadline {
            config.client.retrieval_deadline = deadline;
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the native address of an identifier.
    Encode(EncodeArg),
    /// Print the identifier behind a native address.
    Decode(DecodeArg),
    /// Retrieve, validate and print a document.
    Get(GetArg),
}

#[derive(Args)]
struct EncodeArg {
    /// 32 byte identifier as hex, with or without 0x.
    identifier: String,
    /// Also print the CIDv1 forms.
    #[clap(long)]
    v1: bool,
}

#[derive(Args)]
struct DecodeArg {
    /// CIDv0 or CIDv1 address.
    address: String,
}

#[derive(Args)]
struct GetArg {
    /// Hex identifier or CID address of the document.
    target: String,
    /// JSON schema description the document must satisfy; any JSON object is accepted without one.
    #[clap(short, long)]
    schema: Option<PathBuf>,
    /// Pretty-print the output.
    #[clap(short, long)]
    pretty: bool,
}

impl Command {
    async fn run(self, config: RetrieverConfig) -> Result<()> {
        match self {
            Command::Encode(arg) => {
                let id: ContentIdentifier = arg.identifier.parse()?;
                let mut out = json!({
                    "identifier": id,
                    "address": encode(&id)?,
                });
                if arg.v1 {
                    out["dag_pb"] = json!(encode_v1(&id, ContentCodec::DagPb)?);
                    out["raw"] = json!(encode_v1(&id, ContentCodec::Raw)?);
                }
                print_json(&out, true)
            },
            Command::Decode(arg) => {
                let id = decode(&arg.address)?;
                print_json(&json!({ "address": arg.address.trim(), "identifier": id }), true)
            },
            Command::Get(arg) => {
                let schema = match &arg.schema {
                    Some(path) => {
                        let description =
                            std::fs::read(path).with_context(|| format!("reading schema {path:?}"))?;
                        Schema::from_json(&description).with_context(|| format!("parsing schema {path:?}"))?
                    },
                    None => Schema::new(),
                };

                let retriever = Retriever::from_config(&config)?;
                let doc = match parse_target(&arg.target)? {
                    Target::Identifier(id) => retriever.retrieve(&id, &schema).await,
                    Target::Address(address) => retriever.retrieve_address(&address.to_string(), &schema).await,
                };

                match doc {
                    Ok(doc) => print_json(&doc, arg.pretty),
                    Err(e) => {
                        print_json(&json!({ "error": e.kind(), "message": e.to_string() }), arg.pretty)?;
                        Err(e.into())
                    },
                }
            },
        }
    }
}

#[derive(Debug)]
enum Target {
    Identifier(ContentIdentifier),
    Address(NativeAddress),
}

fn parse_target(target: &str) -> Result<Target> {
    let target = target.trim();
    let looks_hex = target.starts_with("0x") || (target.len() == 64 && target.chars().all(|c| c.is_ascii_hexdigit()));

    if looks_hex {
        Ok(Target::Identifier(target.parse()?))
    } else {
        Ok(Target::Address(target.parse()?))
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RetrieveCommand::parse();

    let mut config = RetrieverConfig::new();
    cli.overrides.apply(&mut config);
    init_logging(&config.log)?;

    cli.command.run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "9d6c2be50f706953479ab9df2ce3edca90b68053c00b3004b7f0accbe1e8eedf";

    fn known_id() -> ContentIdentifier {
        ContentIdentifier::from_hex(HEX).unwrap()
    }

    #[test]
    fn test_parse_target_identifiers() {
        for input in [format!("0x{HEX}"), HEX.to_string(), format!("  {}  ", HEX.to_uppercase())] {
            match parse_target(&input).unwrap() {
                Target::Identifier(id) => assert_eq!(id, known_id(), "{input}"),
                other => panic!("{input} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_target_addresses() {
        for input in [
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            "bafybeie5nqv6kd3qnfjupgvz34woh3oksc3iau6abmyajn7qvtf6d2ho34",
            "/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
        ] {
            match parse_target(input).unwrap() {
                Target::Address(address) => assert_eq!(decode(&address.to_string()).unwrap(), known_id()),
                other => panic!("{input} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_target_rejects_garbage() {
        // Short hex with a prefix is an identifier of the wrong length, not an address.
        assert!(parse_target("0x1234").is_err());
        assert!(parse_target("not-a-cid").is_err());
        assert!(parse_target(&HEX[..63]).is_err());
    }

    #[test]
    fn test_global_overrides_apply() {
        let cli = RetrieveCommand::try_parse_from([
            "ipfs-retrieve",
            "decode",
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
            "--endpoint",
            "http://node:5001",
            "--api",
            "rpc",
            "--max-retries",
            "2",
            "--timeout",
            "500ms",
        ])
        .unwrap();

        let mut config = RetrieverConfig::default();
        cli.overrides.apply(&mut config);
        assert_eq!(config.client.endpoint, "http://node:5001");
        assert_eq!(config.client.api, ApiFlavor::Rpc);
        assert_eq!(config.client.max_retries, 2);
        assert_eq!(config.client.attempt_timeout, Duration::from_millis(500));
    }
}
