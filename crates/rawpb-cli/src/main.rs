//! rawpb - inspect, edit, and fuzz protobuf wire-format messages
//!
//! This tool decodes arbitrary protobuf wire-format data without a schema,
//! renders it in editable textual forms, re-encodes edited text back to
//! bytes, and generates mutated candidate messages for security testing.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rawpb_core::{RecordKind, RecordSequence, Value};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Inspect, edit, and fuzz protobuf wire-format messages without a schema
#[derive(Parser, Debug)]
#[command(name = "rawpb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode wire-format data into a textual representation
    Decode(DecodeArgs),
    /// Re-encode a JSON or YAML record list back to wire bytes
    Encode(EncodeArgs),
    /// Generate mutated candidate messages from a dictionary of values
    Fuzz(FuzzArgs),
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[command(flatten)]
    input: InputMode,

    /// Output representation
    #[arg(long, value_enum, default_value = "pretty")]
    format: TextFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a file holding raw wire-format bytes
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Wire-format bytes as a hex string
    #[arg(short = 'x', long)]
    hex: Option<String>,

    /// Decode every file in a directory (recursive)
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Textual representations of a decoded message
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TextFormat {
    /// Human-readable dump, one line per top-level record
    Pretty,
    /// Editable JSON record list
    Json,
    /// Editable YAML record list
    Yaml,
    /// The wire bytes as a hex string
    Hex,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Path to the JSON or YAML record list ('-' for stdin)
    input: PathBuf,

    /// Input format (inferred from the file extension when omitted)
    #[arg(long, value_enum)]
    from: Option<RecordListFormat>,

    /// Write raw bytes to a file; without this the bytes print as hex
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Record-list input formats for encoding
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RecordListFormat {
    /// JSON record list
    Json,
    /// YAML record list
    Yaml,
}

#[derive(Args, Debug)]
struct FuzzArgs {
    /// Path to a file holding raw wire-format bytes
    input: PathBuf,

    /// Candidate dictionary: one substitution token per line
    #[arg(long)]
    values: PathBuf,

    /// Only fuzz sequences containing this field number
    /// (candidates are still generated for every record)
    #[arg(long)]
    field: Option<u32>,

    /// Output directory for candidate files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Overwrite existing candidate files
    #[arg(long)]
    force: bool,

    /// Dry run - report candidates without writing files
    #[arg(long)]
    dry_run: bool,
}

/// Tracks written fuzz candidates for deduplication
#[derive(Default)]
struct CandidateRegistry {
    /// Content hashes of candidates already seen
    seen: HashSet<String>,
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    generated: usize,
    duplicates_skipped: usize,
    written: usize,
}

impl CandidateRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the candidate (first 8 chars of blake3)
    fn content_hash(candidate: &[u8]) -> String {
        let hash = blake3::hash(candidate);
        hash.to_hex()[..8].to_string()
    }

    /// Register a candidate and return its output path, or None if an
    /// identical candidate was already registered
    fn register(&mut self, candidate: &[u8], output_dir: &Path) -> Option<PathBuf> {
        self.stats.generated += 1;

        let hash = Self::content_hash(candidate);
        if !self.seen.insert(hash.clone()) {
            debug!("Skipping duplicate candidate (hash: {})", hash);
            self.stats.duplicates_skipped += 1;
            return None;
        }

        Some(output_dir.join(format!("candidate~{}.bin", hash)))
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} candidates generated, {} duplicates skipped, {} written",
            self.stats.generated, self.stats.duplicates_skipped, self.stats.written
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match cli.command {
        Command::Decode(args) => run_decode(&args),
        Command::Encode(args) => run_encode(&args),
        Command::Fuzz(args) => run_fuzz(&args),
    }
}

/// Decode one input (or a directory of inputs) and render it
fn run_decode(args: &DecodeArgs) -> Result<()> {
    if let Some(ref directory) = args.input.directory {
        return decode_directory(args, directory);
    }

    let seq = if let Some(ref file) = args.input.file {
        let data = fs::read(file)
            .with_context(|| format!("Failed to read input file: {}", file.display()))?;
        trace!("Read {} bytes from {}", data.len(), file.display());
        RecordSequence::from_bytes(&data)
    } else if let Some(ref hex) = args.input.hex {
        RecordSequence::from_hex(hex)
    } else {
        bail!("Either --file, --hex, or --directory must be specified")
    };

    report_decode_error(&seq, "input");

    let rendered = render(&seq, args.format)?;
    match args.output {
        Some(ref path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}

/// Decode every file under a directory, printing a header per file
fn decode_directory(args: &DecodeArgs, directory: &Path) -> Result<()> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }
    if args.output.is_some() {
        bail!("--output cannot be combined with --directory");
    }

    info!("Decoding directory: {}", directory.display());
    let mut files_processed = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                continue;
            }
        };

        let seq = RecordSequence::from_bytes(&data);
        report_decode_error(&seq, &path.display().to_string());

        println!("=== {} ({} records)", path.display(), seq.len());
        print!("{}", render(&seq, args.format)?);
        files_processed += 1;
    }

    info!("Decoded {} files", files_processed);
    Ok(())
}

/// Render a sequence in the requested representation
fn render(seq: &RecordSequence, format: TextFormat) -> Result<String> {
    Ok(match format {
        TextFormat::Pretty => seq.to_string(),
        TextFormat::Json => {
            let mut json = seq.to_json().context("Failed to serialize records to JSON")?;
            json.push('\n');
            json
        }
        TextFormat::Yaml => seq.to_yaml().context("Failed to serialize records to YAML")?,
        TextFormat::Hex => {
            let mut hex = seq.to_hex();
            hex.push('\n');
            hex
        }
    })
}

/// Re-encode a record list back to wire bytes
fn run_encode(args: &EncodeArgs) -> Result<()> {
    let text = read_text_input(&args.input)?;

    let format = match args.from {
        Some(format) => format,
        None => infer_record_list_format(&args.input)?,
    };

    let seq = match format {
        RecordListFormat::Json => RecordSequence::from_json(&text),
        RecordListFormat::Yaml => RecordSequence::from_yaml(&text),
    };

    if let Some(err) = seq.error() {
        bail!("Failed to parse record list: {}", err);
    }

    let bytes = seq.to_bytes();
    debug!("Encoded {} records into {} bytes", seq.len(), bytes.len());

    match args.output {
        Some(ref path) => fs::write(path, &bytes)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => println!("{}", seq.to_hex()),
    }

    Ok(())
}

/// Read the record-list text from a file or stdin ('-')
fn read_text_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read from stdin")?;
        Ok(text)
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("Failed to read input file: {}", input.display()))
    }
}

/// Infer the record-list format from the input file extension
fn infer_record_list_format(input: &Path) -> Result<RecordListFormat> {
    match input.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(RecordListFormat::Json),
        Some("yaml") | Some("yml") => Ok(RecordListFormat::Yaml),
        _ => bail!(
            "Cannot infer input format from '{}'; pass --from json|yaml",
            input.display()
        ),
    }
}

/// Generate candidate messages and write each unique one to a file
fn run_fuzz(args: &FuzzArgs) -> Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let mut seq = RecordSequence::from_bytes(&data);
    report_decode_error(&seq, &args.input.display().to_string());
    if seq.is_empty() {
        bail!("No records decoded from {}", args.input.display());
    }

    let tokens = read_dictionary(&args.values)?;
    if tokens.is_empty() {
        bail!("Dictionary {} holds no tokens", args.values.display());
    }
    debug!("Loaded {} dictionary token(s)", tokens.len());

    let mut generator = dictionary_generator(&tokens);
    let candidates = match args.field {
        Some(field) => seq.fuzz_index(field, &mut generator),
        None => seq.fuzz_every_index(&mut generator),
    }
    .context("Candidate generation failed")?;

    info!("Generated {} candidate message(s)", candidates.len());

    if !args.dry_run {
        fs::create_dir_all(&args.output).with_context(|| {
            format!("Failed to create output directory: {}", args.output.display())
        })?;
    }

    let mut registry = CandidateRegistry::new();
    for candidate in &candidates {
        let Some(path) = registry.register(candidate, &args.output) else {
            continue;
        };

        if args.dry_run {
            println!("Would write: {} ({} bytes)", path.display(), candidate.len());
            continue;
        }

        if path.exists() && !args.force {
            bail!(
                "File already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        fs::write(&path, candidate)
            .with_context(|| format!("Failed to write candidate: {}", path.display()))?;
        println!("Wrote {}", path.display());
        registry.stats.written += 1;
    }

    registry.print_summary();
    Ok(())
}

/// Load the substitution dictionary: one token per line, blank lines skipped
fn read_dictionary(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dictionary: {}", path.display()))?;

    Ok(text
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Builds a generator substituting every applicable dictionary token.
///
/// Numeric records only receive tokens that parse as base-10 integers, so
/// one mixed dictionary can drive string and numeric fields at once.
fn dictionary_generator(
    tokens: &[String],
) -> impl FnMut(u32, RecordKind, &Value) -> Vec<String> + '_ {
    move |field, kind, _value| {
        let applicable: Vec<String> = tokens
            .iter()
            .filter(|token| match kind {
                RecordKind::Varint | RecordKind::Fixed64 => token.parse::<u64>().is_ok(),
                RecordKind::Fixed32 => token.parse::<u32>().is_ok(),
                RecordKind::Str | RecordKind::Bytes => true,
                RecordKind::GroupStart | RecordKind::GroupEnd => false,
            })
            .cloned()
            .collect();

        trace!(
            "field {} ({}): {} applicable token(s)",
            field,
            kind,
            applicable.len()
        );
        applicable
    }
}

/// Surface a captured decode error without discarding partial records
fn report_decode_error(seq: &RecordSequence, source: &str) {
    if let Some(err) = seq.error() {
        warn!(
            "Decode error in {}: {} ({} records recovered)",
            source,
            err,
            seq.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_registry_deduplication() {
        let mut registry = CandidateRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        let candidate = vec![0x08, 0x01];

        let path1 = registry.register(&candidate, temp_dir.path());
        assert!(path1.is_some());
        let path1 = path1.unwrap();
        let name = path1.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("candidate~"));
        assert!(name.ends_with(".bin"));

        // Identical candidate is skipped
        let path2 = registry.register(&candidate, temp_dir.path());
        assert!(path2.is_none());
        assert_eq!(registry.stats.duplicates_skipped, 1);

        // Different candidate gets a different path
        let path3 = registry.register(&[0x08, 0x02], temp_dir.path());
        assert!(path3.is_some());
        assert_ne!(path3.unwrap(), path1);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let hash1 = CandidateRegistry::content_hash(&[1, 2, 3]);
        let hash2 = CandidateRegistry::content_hash(&[1, 2, 3]);
        let hash3 = CandidateRegistry::content_hash(&[1, 2, 4]);

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 8);
    }

    #[test]
    fn test_dictionary_generator_filters_numeric_tokens() {
        let tokens = vec!["150".to_string(), "hello".to_string(), "-1".to_string()];
        let mut generator = dictionary_generator(&tokens);

        let varint = generator(1, RecordKind::Varint, &Value::Varint(0));
        assert_eq!(varint, vec!["150".to_string()]);

        let string = generator(2, RecordKind::Str, &Value::Str(String::new()));
        assert_eq!(string.len(), 3);

        let group = generator(3, RecordKind::GroupStart, &Value::GroupStart);
        assert!(group.is_empty());
    }

    #[test]
    fn test_render_formats() {
        let seq = RecordSequence::from_hex("089601");

        assert_eq!(render(&seq, TextFormat::Pretty).unwrap(), "1: varint(150)\n");
        assert_eq!(render(&seq, TextFormat::Hex).unwrap(), "089601\n");
        assert!(render(&seq, TextFormat::Json).unwrap().contains("varint"));
        assert!(render(&seq, TextFormat::Yaml).unwrap().contains("varint"));
    }

    #[test]
    fn test_infer_record_list_format() {
        assert!(matches!(
            infer_record_list_format(Path::new("records.json")).unwrap(),
            RecordListFormat::Json
        ));
        assert!(matches!(
            infer_record_list_format(Path::new("records.yml")).unwrap(),
            RecordListFormat::Yaml
        ));
        assert!(infer_record_list_format(Path::new("records.bin")).is_err());
    }

    #[test]
    fn test_read_dictionary_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("values.txt");
        fs::write(&path, "150\n\nhello\n").unwrap();

        let tokens = read_dictionary(&path).unwrap();
        assert_eq!(tokens, vec!["150".to_string(), "hello".to_string()]);
    }

    #[test]
    fn test_fuzz_end_to_end_writes_candidates() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("message.bin");
        let values = temp_dir.path().join("values.txt");
        let output = temp_dir.path().join("out");

        fs::write(&input, [0x08, 0x96, 0x01]).unwrap();
        fs::write(&values, "0\n255\n").unwrap();

        let args = FuzzArgs {
            input,
            values,
            field: None,
            output: output.clone(),
            force: false,
            dry_run: false,
        };
        run_fuzz(&args).unwrap();

        let written: Vec<_> = fs::read_dir(&output).unwrap().collect();
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
