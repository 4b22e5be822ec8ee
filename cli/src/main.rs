//! kurbypdf CLI - JSON to PDF rendering, PDF extraction and watermarking

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use kurbypdf::{
    binding, detect_format_from_bytes, layout_document, to_model_str, ElementKind, EmbedOptions,
    ExtractOptions, JsonFormat, KurbyPdf, PageSelection, WatermarkKeys, WatermarkRequest,
};

#[derive(Parser)]
#[command(name = "kurbypdf")]
#[command(version)]
#[command(about = "Render JSON documents to PDF, extract PDF content, and watermark PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a JSON document description to PDF
    Render {
        /// Input JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file (defaults to the input name with .pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write uncompressed content streams
        #[arg(long)]
        no_compress: bool,
    },

    /// Lay out a JSON document and print its page boxes as JSON
    Layout {
        /// Input JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Extract the structure of a PDF as JSON
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Emit every element with its confidence instead of the document
        #[arg(long)]
        elements: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Process pages one at a time
        #[arg(long)]
        sequential: bool,

        /// Password for encrypted documents
        #[arg(long, env = "KURBYPDF_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Hide signed claims inside an existing PDF
    Watermark {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file (defaults to <input>_wm.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Claim to embed, as key=value (repeatable)
        #[arg(long = "claim", value_name = "KEY=VALUE", required = true)]
        claims: Vec<String>,

        /// Base64 HMAC key
        #[arg(long, env = "KURBYPDF_HMAC_KEY", hide_env_values = true)]
        hmac_key: String,

        /// Base64 AES key (16, 24 or 32 bytes)
        #[arg(long, env = "KURBYPDF_AES_KEY", hide_env_values = true)]
        aes_key: String,

        /// Hidden copies per page
        #[arg(long, default_value = "3")]
        copies: usize,

        /// Seed for reproducible placement
        #[arg(long)]
        seed: Option<u64>,

        /// Protect the output with this user password
        #[arg(long)]
        user_password: Option<String>,

        /// Owner password for protected output (random if omitted)
        #[arg(long, requires = "user_password")]
        owner_password: Option<String>,
    },

    /// Verify the watermark of a PDF
    Verify {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Base64 HMAC key
        #[arg(long, env = "KURBYPDF_HMAC_KEY", hide_env_values = true)]
        hmac_key: String,

        /// Base64 AES key
        #[arg(long, env = "KURBYPDF_AES_KEY", hide_env_values = true)]
        aes_key: String,

        /// Password for protected documents
        #[arg(long, env = "KURBYPDF_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Print the verification result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            input,
            output,
            no_compress,
        } => cmd_render(&input, output.as_deref(), no_compress),
        Commands::Layout { input, compact } => cmd_layout(&input, compact),
        Commands::Extract {
            input,
            output,
            elements,
            pages,
            compact,
            sequential,
            password,
        } => cmd_extract(
            &input,
            output.as_deref(),
            elements,
            pages.as_deref(),
            compact,
            sequential,
            password.as_deref(),
        ),
        Commands::Watermark {
            input,
            output,
            claims,
            hmac_key,
            aes_key,
            copies,
            seed,
            user_password,
            owner_password,
        } => cmd_watermark(
            &input,
            output.as_deref(),
            &claims,
            &hmac_key,
            &aes_key,
            copies,
            seed,
            user_password,
            owner_password,
        ),
        Commands::Verify {
            input,
            hmac_key,
            aes_key,
            password,
            json,
        } => cmd_verify(&input, &hmac_key, &aes_key, password.as_deref(), json),
        Commands::Info { input } => cmd_info(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn write_or_print(output: Option<&Path>, text: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}{}.pdf", stem, suffix))
}

fn cmd_render(input: &Path, output: Option<&Path>, no_compress: bool) -> CliResult {
    log::debug!("Rendering {} (compress: {})", input.display(), !no_compress);
    let json = fs::read_to_string(input)?;
    let pdf = KurbyPdf::new()
        .with_compression(!no_compress)
        .generate(&json)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ""));
    fs::write(&path, &pdf)?;
    println!(
        "{} {} ({} bytes)",
        "Rendered".green(),
        path.display(),
        pdf.len()
    );
    Ok(())
}

fn cmd_layout(input: &Path, compact: bool) -> CliResult {
    let json = fs::read_to_string(input)?;
    let doc = layout_document(&to_model_str(&json)?)?;
    let text = binding::to_json_string(&doc.pages, json_format(compact))?;
    println!("{}", text);
    Ok(())
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    elements: bool,
    pages: Option<&str>,
    compact: bool,
    sequential: bool,
    password: Option<&str>,
) -> CliResult {
    let page_selection = if let Some(p) = pages {
        PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?
    } else {
        PageSelection::All
    };

    let mut options = ExtractOptions::new().with_pages(page_selection);
    if sequential {
        options = options.sequential();
    }
    if let Some(password) = password {
        options = options.with_password(password);
    }

    let data = fs::read(input)?;
    let extraction = KurbyPdf::new()
        .with_extract_options(options)
        .extract(&data)?;
    log::info!(
        "Extracted {} elements from {} pages (mean confidence {:.2})",
        extraction.elements.len(),
        extraction.document.pages.len(),
        extraction.mean_confidence()
    );

    let format = json_format(compact);
    let text = if elements {
        binding::to_json_string(&extraction.elements, format)?
    } else {
        binding::from_model_string(&extraction.document, format)?
    };
    write_or_print(output, &text)
}

fn parse_claims(claims: &[String]) -> Result<BTreeMap<String, String>, String> {
    claims
        .iter()
        .map(|claim| match claim.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(format!("Invalid claim '{}', expected KEY=VALUE", claim)),
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn cmd_watermark(
    input: &Path,
    output: Option<&Path>,
    claims: &[String],
    hmac_key: &str,
    aes_key: &str,
    copies: usize,
    seed: Option<u64>,
    user_password: Option<String>,
    owner_password: Option<String>,
) -> CliResult {
    let keys = WatermarkKeys::from_base64(hmac_key, aes_key)?;
    let mut embed = EmbedOptions::new().with_copies(copies);
    if let Some(seed) = seed {
        embed = embed.with_seed(seed);
    }
    let mut request = WatermarkRequest::new(keys)
        .with_claims(parse_claims(claims)?)
        .with_embed_options(embed);
    request.user_password = user_password;
    request.owner_password = owner_password;

    let data = fs::read(input)?;
    let result = kurbypdf::watermark(&data, &request)?;
    log::debug!("Sealed payload of {} bytes", result.payload_len);

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, "_wm"));
    fs::write(&path, &result.pdf)?;
    println!(
        "{} {} ({} hidden copies, {} claims)",
        "Watermarked".green(),
        path.display(),
        result.copies,
        request.claims.len()
    );
    if let Some(owner) = &result.owner_password {
        println!("{}: {}", "Owner password".bold(), owner);
    }
    Ok(())
}

fn cmd_verify(
    input: &Path,
    hmac_key: &str,
    aes_key: &str,
    password: Option<&str>,
    json: bool,
) -> CliResult {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let hmac = STANDARD
        .decode(hmac_key.trim())
        .map_err(|e| format!("Invalid HMAC key: {}", e))?;
    let aes = STANDARD
        .decode(aes_key.trim())
        .map_err(|e| format!("Invalid AES key: {}", e))?;

    let data = fs::read(input)?;
    let result = kurbypdf::verify_detailed(&data, password, &hmac, &aes);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return if result.valid {
            Ok(())
        } else {
            Err("Verification failed".into())
        };
    }

    if !result.valid {
        let reason = result
            .reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(format!("Verification failed: {}", reason).into());
    }

    println!("{}", "Watermark valid".green().bold());
    println!("{}", "─".repeat(40).dimmed());
    let sealed = chrono::DateTime::from_timestamp_millis(result.timestamp)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| result.timestamp.to_string());
    println!("{}: {}", "Sealed".bold(), sealed);
    if let Some(nonce) = &result.nonce {
        println!("{}: {}", "Nonce".bold(), nonce);
    }
    for (key, value) in &result.claims {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(())
}

fn cmd_info(input: &Path) -> CliResult {
    let data = fs::read(input)?;
    let format = detect_format_from_bytes(&data)?;
    let extraction = kurbypdf::extract(&data)?;
    let doc = &extraction.document;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), format.version);
    println!("{}: {}", "Pages".bold(), doc.pages.len());
    println!(
        "{}: {} x {} pt",
        "Page size".bold(),
        doc.page.size.width,
        doc.page.size.height
    );

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = doc.metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = doc.metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = doc.metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref created) = doc.metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.plain_text();
    let count = |kind: ElementKind| {
        extraction
            .elements
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    };

    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Characters".bold(), text.chars().count());
    println!("{}: {}", "Text blocks".bold(), count(ElementKind::Text));
    println!("{}: {}", "Tables".bold(), count(ElementKind::Table));
    println!("{}: {}", "Images".bold(), count(ElementKind::Image));
    println!(
        "{}: {:.2}",
        "Mean confidence".bold(),
        extraction.mean_confidence()
    );

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "kurbypdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Structured documents to PDF, and back again");
    println!();
    println!("License: MIT");
}
