use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "objstore",
    about = "Bucket-scoped, content-addressable object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage root holding one directory per bucket. Overrides the config file.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML file with store settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, inspect, list, or delete buckets
    #[command(subcommand)]
    Bucket(BucketCommand),
    /// Store, fetch, inspect, list, or delete objects
    #[command(subcommand)]
    Object(ObjectCommand),
}

#[derive(Subcommand)]
pub enum BucketCommand {
    /// Create a bucket
    Create(BucketCreateArgs),
    /// List every bucket with its metadata
    List,
    /// Show one bucket's metadata
    Show { name: String },
    /// Merge metadata into an existing bucket
    Set(BucketSetArgs),
    /// Delete an empty bucket
    Delete { name: String },
}

#[derive(Args)]
pub struct BucketCreateArgs {
    pub name: String,
    /// Metadata entry as key=value; repeatable
    #[arg(short, long = "meta", value_parser = parse_key_value)]
    pub meta: Vec<(String, String)>,
    /// Key objects by their md5 digest instead of sha1
    #[arg(long)]
    pub md5_keys: bool,
}

#[derive(Args)]
pub struct BucketSetArgs {
    pub name: String,
    #[arg(short, long = "meta", value_parser = parse_key_value, required = true)]
    pub meta: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum ObjectCommand {
    /// Upload a file (or `-` for stdin)
    Put(ObjectPutArgs),
    /// Show an object's record
    Head(ObjectRef),
    /// Write an object's bytes to a file or stdout
    Get(ObjectGetArgs),
    /// Delete an object
    Delete(ObjectRef),
    /// List objects in a bucket
    List {
        bucket: String,
        /// Include each object's record
        #[arg(short, long)]
        long: bool,
    },
}

#[derive(Args)]
pub struct ObjectRef {
    pub bucket: String,
    pub id: String,
}

#[derive(Args)]
pub struct ObjectPutArgs {
    pub bucket: String,
    pub file: PathBuf,
    /// Name recorded as `content-name`; defaults to the file name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub content_type: Option<String>,
    #[arg(long)]
    pub content_length: Option<u64>,
    #[arg(long)]
    pub content_md5: Option<String>,
    #[arg(long)]
    pub content_sha1: Option<String>,
    /// Extra header as key=value; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,
}

#[derive(Args)]
pub struct ObjectGetArgs {
    pub bucket: String,
    pub id: String,
    /// Destination file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}
