use std::fs::File;
use std::io::{self, Write};

use anyhow::Context;
use colored::Colorize;
use objstore_engine::{BucketInfo, BucketManager, StoreConfig, StoreError};
use objstore_types::{
    AttrValue, AttributeMap, DeclaredHeaders, IdentityBasis, ObjectId, ObjectRecord,
    OBJECT_KEY_ATTRIBUTE,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let buckets = BucketManager::open_persistent(config)?;
    let out = Output { format: cli.format };

    match cli.command {
        Command::Bucket(cmd) => run_bucket(&buckets, &out, cmd),
        Command::Object(cmd) => run_object(&buckets, &out, cmd),
    }
}

/// `--config` first, then `--root` on top.
pub fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_toml_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.storage_root = root.clone();
    }
    tracing::debug!(root = %config.storage_root.display(), "configuration loaded");
    Ok(config)
}

fn run_bucket(buckets: &BucketManager, out: &Output, cmd: BucketCommand) -> anyhow::Result<()> {
    match cmd {
        BucketCommand::Create(args) => {
            let mut metadata = to_attributes(args.meta);
            if args.md5_keys {
                metadata.insert(
                    OBJECT_KEY_ATTRIBUTE.into(),
                    IdentityBasis::Md5.attribute_key().into(),
                );
            }
            let info = buckets.create(&args.name, metadata)?;
            out.bucket(&info, Some("Created bucket"));
        }
        BucketCommand::List => {
            let mut listed = buckets.list()?;
            listed.sort_by(|a, b| a.name.cmp(&b.name));
            out.buckets(&listed);
        }
        BucketCommand::Show { name } => {
            let info = buckets.open_bucket(&name)?.info()?;
            out.bucket(&info, None);
        }
        BucketCommand::Set(args) => {
            let info = buckets.set_metadata(&args.name, to_attributes(args.meta))?;
            out.bucket(&info, Some("Updated bucket"));
        }
        BucketCommand::Delete { name } => {
            buckets.delete(&name)?;
            out.done(&format!("Deleted bucket {}", name.yellow()));
        }
    }
    Ok(())
}

fn run_object(buckets: &BucketManager, out: &Output, cmd: ObjectCommand) -> anyhow::Result<()> {
    match cmd {
        ObjectCommand::Put(args) => {
            let bucket = buckets.open_bucket(&args.bucket)?;
            let objects = bucket.objects()?;
            let from_stdin = args.file.as_os_str() == "-";

            let mut declared = DeclaredHeaders::from_headers(args.headers);
            declared.content_length = args.content_length.or(declared.content_length);
            declared.content_md5 = args.content_md5.or(declared.content_md5);
            declared.content_sha1 = args.content_sha1.or(declared.content_sha1);
            declared.content_type = args.content_type.or(declared.content_type);
            declared.content_name = args.name.or_else(|| {
                (!from_stdin)
                    .then(|| args.file.file_name())
                    .flatten()
                    .map(|n| n.to_string_lossy().into_owned())
            });

            let record = if from_stdin {
                objects.store(io::stdin().lock(), declared)?
            } else {
                let file = File::open(&args.file)
                    .with_context(|| format!("cannot open {}", args.file.display()))?;
                objects.store(file, declared)?
            };
            let id = ObjectId::from_digest(record.digest(objects.basis()));
            out.object(&id, &record, Some("Stored object"));
        }
        ObjectCommand::Head(target) => {
            let bucket = buckets.open_bucket(&target.bucket)?;
            let id = parse_id(&target.id)?;
            let record = bucket.objects()?.head(&id)?;
            out.object(&id, &record, None);
        }
        ObjectCommand::Get(args) => {
            let bucket = buckets.open_bucket(&args.bucket)?;
            let id = parse_id(&args.id)?;
            let (mut file, record) = bucket.objects()?.get(&id)?;
            match &args.output {
                Some(path) => {
                    let mut dest = File::create(path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    io::copy(&mut file, &mut dest)?;
                    dest.sync_all()?;
                    out.done(&format!(
                        "Wrote {} bytes to {}",
                        record.content_length,
                        path.display()
                    ));
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    io::copy(&mut file, &mut stdout)?;
                    stdout.flush()?;
                }
            }
        }
        ObjectCommand::Delete(target) => {
            let bucket = buckets.open_bucket(&target.bucket)?;
            let id = parse_id(&target.id)?;
            bucket.objects()?.delete(&id)?;
            out.done(&format!("Deleted object {}", id.to_string().yellow()));
        }
        ObjectCommand::List { bucket, long } => {
            let bucket = buckets.open_bucket(&bucket)?;
            let objects = bucket.objects()?;
            if long {
                out.records(&objects.records()?);
            } else {
                let mut ids = objects.list()?;
                ids.sort();
                out.ids(&ids);
            }
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<ObjectId, StoreError> {
    Ok(ObjectId::from_hex(raw)?)
}

fn to_attributes(pairs: Vec<(String, String)>) -> AttributeMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key, AttrValue::parse(&value)))
        .collect()
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn done(&self, message: &str) {
        if let OutputFormat::Text = self.format {
            println!("{} {message}", "✓".green().bold());
        }
    }

    fn bucket(&self, info: &BucketInfo, headline: Option<&str>) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!(info.attributes)),
            OutputFormat::Text => {
                if let Some(headline) = headline {
                    println!("{} {headline} {}", "✓".green().bold(), info.name.as_str().yellow().bold());
                } else {
                    println!("{}", info.name.as_str().yellow().bold());
                }
                print_attributes(&info.attributes);
            }
        }
    }

    fn buckets(&self, listed: &[BucketInfo]) {
        match self.format {
            OutputFormat::Json => {
                let all: Vec<_> = listed.iter().map(|b| &b.attributes).collect();
                println!("{}", serde_json::json!(all));
            }
            OutputFormat::Text if listed.is_empty() => println!("No buckets."),
            OutputFormat::Text => {
                for info in listed {
                    println!("{}", info.name.as_str().yellow().bold());
                    print_attributes(&info.attributes);
                }
            }
        }
    }

    fn object(&self, id: &ObjectId, record: &ObjectRecord, headline: Option<&str>) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!(record.to_attributes())),
            OutputFormat::Text => {
                if let Some(headline) = headline {
                    println!("{} {headline} {}", "✓".green().bold(), id.to_string().cyan());
                } else {
                    println!("{}", id.to_string().cyan());
                }
                print_attributes(&record.to_attributes());
            }
        }
    }

    fn ids(&self, ids: &[ObjectId]) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!(ids)),
            OutputFormat::Text if ids.is_empty() => println!("No objects."),
            OutputFormat::Text => ids.iter().for_each(|id| println!("{id}")),
        }
    }

    fn records(&self, records: &[(ObjectId, ObjectRecord)]) {
        match self.format {
            OutputFormat::Json => {
                let all: serde_json::Map<String, serde_json::Value> = records
                    .iter()
                    .map(|(id, record)| (id.to_string(), serde_json::json!(record.to_attributes())))
                    .collect();
                println!("{}", serde_json::Value::Object(all));
            }
            OutputFormat::Text if records.is_empty() => println!("No objects."),
            OutputFormat::Text => {
                for (id, record) in records {
                    println!(
                        "{}  {:>10}  {}",
                        id.to_string().cyan(),
                        record.content_length,
                        record.content_name.as_deref().unwrap_or("-").dimmed()
                    );
                }
            }
        }
    }
}

fn print_attributes(attributes: &AttributeMap) {
    for (key, value) in attributes {
        println!("  {}: {value}", key.bold());
    }
}
